use crate::error::{Error, Result};
use crate::math::matrix::Matrix;

const MAX_ITERATIONS: usize = 1_000;
const TOLERANCE: f64 = 1e-12;

/// Principal components found by power iteration on the covariance matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Pca {
    /// Column means of the fitted data, 1×features.
    pub mean: Matrix,
    /// One unit-length component per row, strongest first. The largest
    /// absolute loading of each component is positive.
    pub components: Matrix,
    /// Variance captured by each component.
    pub explained_variance: Vec<f64>,
}

impl Pca {
    pub fn fit(data: &Matrix, n_components: usize) -> Result<Pca> {
        if data.rows == 0 {
            return Err(Error::EmptyBatch);
        }
        if n_components == 0 || n_components > data.cols {
            return Err(Error::InvalidConfig(format!(
                "n_components must be in 1..={}, got {}",
                data.cols, n_components
            )));
        }

        let mean = data.mean_rows();
        let centered = center(data, &mean);
        let denom = (data.rows.max(2) - 1) as f64;
        let mut cov = (&centered.transpose() * &centered).scale(1.0 / denom);

        let mut components: Vec<Vec<f64>> = Vec::with_capacity(n_components);
        let mut explained_variance = Vec::with_capacity(n_components);

        for _ in 0..n_components {
            let (value, vector) = dominant_eigenpair(&cov, &components);
            // Deflate so the next iteration finds the following component.
            for (i, row) in cov.data.iter_mut().enumerate() {
                for (j, c) in row.iter_mut().enumerate() {
                    *c -= value * vector[i] * vector[j];
                }
            }
            explained_variance.push(value);
            components.push(vector);
        }

        Ok(Pca {
            mean,
            components: Matrix::from_data(components),
            explained_variance,
        })
    }

    /// Projects `data` onto the fitted components.
    pub fn transform(&self, data: &Matrix) -> Result<Matrix> {
        if data.cols != self.mean.cols {
            return Err(Error::ShapeMismatch {
                op: "Pca::transform",
                expected: (data.rows, self.mean.cols),
                actual: data.shape(),
            });
        }
        Ok(&center(data, &self.mean) * &self.components.transpose())
    }
}

/// Fits `n_components` principal components and projects `data` onto them.
pub fn pca(data: &Matrix, n_components: usize) -> Result<Matrix> {
    Pca::fit(data, n_components)?.transform(data)
}

fn center(data: &Matrix, mean: &Matrix) -> Matrix {
    data.add_row(&mean.scale(-1.0))
}

/// Largest eigenpair of the symmetric matrix `cov`, restricted to the
/// complement of `previous`.
fn dominant_eigenpair(cov: &Matrix, previous: &[Vec<f64>]) -> (f64, Vec<f64>) {
    let d = cov.rows;
    // Uneven start so it is unlikely to be orthogonal to the target.
    let mut v: Vec<f64> = (0..d).map(|i| 1.0 + i as f64 / d as f64).collect();
    orthogonalize(&mut v, previous);
    if normalize(&mut v) == 0.0 {
        return (0.0, vec![0.0; d]);
    }

    let mut value = 0.0;
    for _ in 0..MAX_ITERATIONS {
        let mut w: Vec<f64> = cov.data.iter()
            .map(|row| row.iter().zip(v.iter()).map(|(c, x)| c * x).sum())
            .collect();
        orthogonalize(&mut w, previous);
        let norm = normalize(&mut w);
        if norm < TOLERANCE {
            // Remaining variance is zero.
            return (0.0, fix_sign(v));
        }
        let delta: f64 = w.iter().zip(v.iter()).map(|(a, b)| (a - b).abs()).sum();
        v = w;
        value = norm;
        if delta < 1e-10 {
            break;
        }
    }
    (value, fix_sign(v))
}

fn orthogonalize(v: &mut [f64], basis: &[Vec<f64>]) {
    for b in basis {
        let dot: f64 = v.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        for (x, y) in v.iter_mut().zip(b.iter()) {
            *x -= dot * y;
        }
    }
}

/// Scales `v` to unit length in place and returns its former norm.
fn normalize(v: &mut [f64]) -> f64 {
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
    norm
}

fn fix_sign(mut v: Vec<f64>) -> Vec<f64> {
    let pivot = v.iter()
        .cloned()
        .fold(0.0_f64, |best, x| if x.abs() > best.abs() { x } else { best });
    if pivot < 0.0 {
        v.iter_mut().for_each(|x| *x = -*x);
    }
    v
}
