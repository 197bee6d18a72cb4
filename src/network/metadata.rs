use serde::{Deserialize, Serialize};

use crate::data::quickdraw::{LoadOptions, CLASS_NAMES};

/// Optional annotations attached to a saved Network.
/// All fields are Option<> so models saved without metadata still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ModelMetadata {
    pub description: Option<String>,
    /// Class label for each output score, in score order.
    pub class_names: Option<Vec<String>>,
    /// How the class files were split into train/valid/test for training.
    #[serde(default)]
    pub split: Option<LoadOptions>,
}

impl ModelMetadata {
    /// Metadata for a classifier over the QuickDraw doodle classes.
    pub fn quickdraw() -> ModelMetadata {
        ModelMetadata {
            description: Some("QuickDraw doodle classifier".to_owned()),
            class_names: Some(CLASS_NAMES.iter().map(|s| s.to_string()).collect()),
            split: None,
        }
    }

    pub fn with_split(mut self, split: LoadOptions) -> ModelMetadata {
        self.split = Some(split);
        self
    }

    /// Name for class `index`, falling back to the index itself.
    pub fn class_name(&self, index: usize) -> String {
        self.class_names
            .as_ref()
            .and_then(|names| names.get(index).cloned())
            .unwrap_or_else(|| index.to_string())
    }
}
