pub mod loader;
pub mod npy;
pub mod quickdraw;

pub use loader::{Batch, Batches, DataLoader, Dataset};
pub use quickdraw::{load, load_test, DatasetSplits, LoadOptions, CLASS_NAMES};
