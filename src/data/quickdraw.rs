use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::data::loader::Dataset;
use crate::data::npy::{parse_npy_u8, NpyMatrix};
use crate::error::{Error, Result};
use crate::math::matrix::Matrix;

/// The ten doodle classes, in label order.
pub const CLASS_NAMES: [&str; 10] = [
    "cloud", "sun", "pants", "umbrella", "table",
    "ladder", "eyeglasses", "clock", "scissors", "cup",
];

/// Doodles are square bitmaps of this side length.
pub const IMAGE_SIDE: usize = 28;
pub const PIXELS: usize = IMAGE_SIDE * IMAGE_SIDE;

const BASE_URL: &str = "https://storage.googleapis.com/quickdraw_dataset/full/numpy_bitmap/";

/// Where the `numpy_bitmap` file for `class` is published.
pub fn class_url(class: &str) -> String {
    format!("{}{}.npy", BASE_URL, class)
}

/// How class files are cut into train/valid/test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Fraction of the training pool held out for validation, in [0, 1).
    pub valid_split: f64,
    /// Rows taken from the start of each class file for train + valid.
    pub max_items_per_class: usize,
    /// Rows taken right after those for the test set.
    pub test_items_per_class: usize,
    /// Seed for the shuffles of the training pool and of the test set.
    pub seed: u64,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            valid_split: 0.2,
            max_items_per_class: 70_000,
            test_items_per_class: 10_000,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSplits {
    pub train: Dataset,
    pub valid: Dataset,
    pub test: Dataset,
    pub class_names: Vec<String>,
}

/// Loads the ten QuickDraw classes from `<root>/<class>.npy`.
pub fn load(root: &Path, options: &LoadOptions) -> Result<DatasetSplits> {
    load_classes(root, &CLASS_NAMES, options)
}

/// Loads `classes` from `<root>/<class>.npy`; class `i` gets label `i`.
///
/// Per class, rows `[0, max_items_per_class)` join the training pool and the
/// following `test_items_per_class` rows join the test set (files shorter than
/// that contribute what they have). Both pools are shuffled, then the first
/// `floor(len · valid_split)` rows of the training pool become the validation
/// set. Pixels are scaled from [0, 255] to [0, 1].
pub fn load_classes(root: &Path, classes: &[&str], options: &LoadOptions) -> Result<DatasetSplits> {
    check_options(options)?;
    info!(classes = classes.len(), root = %root.display(), "loading doodle data");

    let mut pool = Vec::new();
    let mut pool_labels = Vec::new();
    let mut test = Vec::new();
    let mut test_labels = Vec::new();

    for (label, class) in classes.iter().enumerate() {
        let bytes = read_class(root, class)?;
        let array = parse_class(&bytes, root, class)?;
        let (train_end, test_end) = class_ranges(array.rows, options, class);

        for i in 0..train_end {
            pool.push(scale_pixels(array.row(i)));
            pool_labels.push(label);
        }
        for i in train_end..test_end {
            test.push(scale_pixels(array.row(i)));
            test_labels.push(label);
        }
        debug!(class, train = train_end, test = test_end - train_end, "class loaded");
    }

    let mut rng = StdRng::seed_from_u64(options.seed);
    let pool = shuffle_into(pool, pool_labels, &mut rng)?;
    let test = shuffle_into(test, test_labels, &mut rng)?;

    let valid_size = (pool.len() as f64 * options.valid_split).floor() as usize;
    let valid_idx: Vec<usize> = (0..valid_size).collect();
    let train_idx: Vec<usize> = (valid_size..pool.len()).collect();
    let splits = DatasetSplits {
        valid: pool.select(&valid_idx),
        train: pool.select(&train_idx),
        test,
        class_names: classes.iter().map(|c| c.to_string()).collect(),
    };

    info!(
        train = splits.train.len(),
        valid = splits.valid.len(),
        test = splits.test.len(),
        "doodle data loaded"
    );
    Ok(splits)
}

/// Test split of the ten QuickDraw classes.
pub fn load_test(root: &Path, options: &LoadOptions) -> Result<Dataset> {
    load_test_classes(root, &CLASS_NAMES, options)
}

/// The test set `load_classes` would produce, in the same order, without
/// materializing the training pool.
pub fn load_test_classes(root: &Path, classes: &[&str], options: &LoadOptions) -> Result<Dataset> {
    check_options(options)?;
    info!(classes = classes.len(), root = %root.display(), "loading doodle test split");

    let mut pool_len = 0;
    let mut test = Vec::new();
    let mut test_labels = Vec::new();

    for (label, class) in classes.iter().enumerate() {
        let bytes = read_class(root, class)?;
        let array = parse_class(&bytes, root, class)?;
        let (train_end, test_end) = class_ranges(array.rows, options, class);
        pool_len += train_end;
        for i in train_end..test_end {
            test.push(scale_pixels(array.row(i)));
            test_labels.push(label);
        }
    }

    // Replay the training-pool shuffle so the generator reaches the same state.
    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut pool_order: Vec<usize> = (0..pool_len).collect();
    pool_order.shuffle(&mut rng);
    let test = shuffle_into(test, test_labels, &mut rng)?;

    info!(test = test.len(), "doodle test split loaded");
    Ok(test)
}

fn check_options(options: &LoadOptions) -> Result<()> {
    if !(0.0..1.0).contains(&options.valid_split) {
        return Err(Error::InvalidConfig(format!(
            "valid_split must be in [0, 1), got {}",
            options.valid_split
        )));
    }
    Ok(())
}

fn read_class(root: &Path, class: &str) -> Result<Vec<u8>> {
    let path = root.join(format!("{}.npy", class));
    match std::fs::read(&path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(Error::MissingClassFile { path, url: class_url(class) })
        }
        Err(e) => Err(e.into()),
    }
}

fn parse_class<'b>(bytes: &'b [u8], root: &Path, class: &str) -> Result<NpyMatrix<'b>> {
    let array = parse_npy_u8(bytes)?;
    if array.cols != PIXELS {
        return Err(Error::InvalidNpy(format!(
            "{}: expected {} pixels per doodle, got {}",
            root.join(format!("{}.npy", class)).display(), PIXELS, array.cols
        )));
    }
    Ok(array)
}

/// End of the training rows and end of the test rows within one class file.
fn class_ranges(rows: usize, options: &LoadOptions, class: &str) -> (usize, usize) {
    let train_end = options.max_items_per_class.min(rows);
    let test_end = options.max_items_per_class
        .saturating_add(options.test_items_per_class)
        .min(rows);
    if test_end == train_end && options.test_items_per_class > 0 {
        warn!(class, rows, "class file has no rows left for the test set");
    }
    (train_end, test_end)
}

fn scale_pixels(row: &[u8]) -> Vec<f64> {
    row.iter().map(|&px| px as f64 / 255.0).collect()
}

fn shuffle_into(rows: Vec<Vec<f64>>, labels: Vec<usize>, rng: &mut StdRng) -> Result<Dataset> {
    let mut order: Vec<usize> = (0..labels.len()).collect();
    order.shuffle(rng);
    let mut rows: Vec<Option<Vec<f64>>> = rows.into_iter().map(Some).collect();
    let shuffled: Vec<Vec<f64>> = order.iter().filter_map(|&i| rows[i].take()).collect();
    let labels = order.iter().map(|&i| labels[i]).collect();
    let inputs = if shuffled.is_empty() {
        Matrix::zeros(0, PIXELS)
    } else {
        Matrix::from_rows(shuffled)?
    };
    Dataset::new(inputs, labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::npy::encode_npy_u8;

    fn write_class(dir: &Path, name: &str, rows: usize, fill: u8) {
        let bytes = encode_npy_u8(rows, PIXELS, &vec![fill; rows * PIXELS]).unwrap();
        std::fs::write(dir.join(format!("{}.npy", name)), bytes).unwrap();
    }

    #[test]
    fn splits_follow_the_per_class_rule() {
        let dir = tempfile::tempdir().unwrap();
        write_class(dir.path(), "a", 15, 0);
        write_class(dir.path(), "b", 15, 255);
        let opts = LoadOptions { valid_split: 0.25, max_items_per_class: 10, test_items_per_class: 3, seed: 1 };

        let splits = load_classes(dir.path(), &["a", "b"], &opts).unwrap();
        assert_eq!(splits.valid.len(), 5);
        assert_eq!(splits.train.len(), 15);
        assert_eq!(splits.test.len(), 6);
        assert_eq!(splits.class_names, vec!["a", "b"]);

        // Labels survive the shuffle together with their pixels.
        for (row, &label) in splits.train.inputs.data.iter().zip(splits.train.labels.iter()) {
            assert_eq!(row[0], if label == 0 { 0.0 } else { 1.0 });
        }
    }

    #[test]
    fn missing_file_names_the_download_url() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_classes(dir.path(), &["sun"], &LoadOptions::default()).unwrap_err();
        match err {
            Error::MissingClassFile { url, .. } => assert_eq!(url, class_url("sun")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_only_loader_matches_the_full_split() {
        let dir = tempfile::tempdir().unwrap();
        write_class(dir.path(), "a", 12, 0);
        write_class(dir.path(), "b", 9, 255);
        let opts = LoadOptions { valid_split: 0.2, max_items_per_class: 6, test_items_per_class: 4, seed: 3 };

        let full = load_classes(dir.path(), &["a", "b"], &opts).unwrap();
        let test = load_test_classes(dir.path(), &["a", "b"], &opts).unwrap();
        assert_eq!(test.len(), 7);
        assert_eq!(test, full.test);
    }

    #[test]
    fn huge_item_limits_take_the_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        write_class(dir.path(), "a", 4, 10);
        let opts = LoadOptions {
            valid_split: 0.0,
            max_items_per_class: usize::MAX,
            test_items_per_class: 1,
            seed: 0,
        };
        let splits = load_classes(dir.path(), &["a"], &opts).unwrap();
        assert_eq!(splits.train.len(), 4);
        assert!(splits.test.is_empty());
    }

    #[test]
    fn rejects_out_of_range_split() {
        let dir = tempfile::tempdir().unwrap();
        let opts = LoadOptions { valid_split: 1.0, ..LoadOptions::default() };
        assert!(matches!(load_classes(dir.path(), &["a"], &opts), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn rejects_wrong_bitmap_size() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = encode_npy_u8(2, 10, &[0; 20]).unwrap();
        std::fs::write(dir.path().join("a.npy"), bytes).unwrap();
        assert!(matches!(load_classes(dir.path(), &["a"], &LoadOptions::default()), Err(Error::InvalidNpy(_))));
    }
}
