use crate::error::Result;
use crate::loss::check_labels;
use crate::math::matrix::Matrix;

/// Fraction of rows whose arg-max score equals the label, in [0, 1].
///
/// Ties go to the lowest class index.
pub fn calculate_accuracy(scores: &Matrix, labels: &[usize]) -> Result<f64> {
    check_labels(scores, labels)?;
    let correct = scores.argmax_rows()
        .iter()
        .zip(labels.iter())
        .filter(|(predicted, label)| predicted == label)
        .count();
    Ok(correct as f64 / labels.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use proptest::prelude::*;

    fn one_hot_scores(classes: &[usize], n_classes: usize) -> Matrix {
        Matrix::from_data(classes.iter().map(|&c| {
            let mut row = vec![0.0; n_classes];
            row[c] = 5.0;
            row
        }).collect())
    }

    #[test]
    fn all_correct_is_one_and_none_correct_is_zero() {
        let labels = [0, 3, 9, 1];
        let scores = one_hot_scores(&labels, 10);
        assert_eq!(calculate_accuracy(&scores, &labels).unwrap(), 1.0);

        let wrong: Vec<usize> = labels.iter().map(|l| (l + 1) % 10).collect();
        assert_eq!(calculate_accuracy(&scores, &wrong).unwrap(), 0.0);
    }

    #[test]
    fn partial_match() {
        let scores = one_hot_scores(&[0, 1, 2, 3], 4);
        assert_eq!(calculate_accuracy(&scores, &[0, 1, 0, 0]).unwrap(), 0.5);
    }

    #[test]
    fn empty_batch_is_an_error() {
        assert!(matches!(calculate_accuracy(&Matrix::zeros(0, 10), &[]), Err(Error::EmptyBatch)));
    }

    proptest! {
        #[test]
        fn prop_accuracy_bounded(
            (scores, labels) in (1usize..20).prop_flat_map(|n| (
                prop::collection::vec(prop::collection::vec(-10.0f64..10.0, 5), n),
                prop::collection::vec(0usize..5, n),
            ))
        ) {
            let acc = calculate_accuracy(&Matrix::from_data(scores), &labels).unwrap();
            prop_assert!((0.0..=1.0).contains(&acc));
        }
    }
}
