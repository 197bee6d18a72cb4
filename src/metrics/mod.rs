pub mod accuracy;
pub mod params;
pub mod timing;

pub use accuracy::calculate_accuracy;
pub use params::count_trainable_parameters;
pub use timing::epoch_duration;
