pub mod metadata;
pub mod model;
pub mod network;
pub mod spec;

pub use metadata::ModelMetadata;
pub use model::Model;
pub use network::Network;
pub use spec::{NetworkSpec, LayerSpec};
