// Recorder configuration: JSON file types and the on-disk store.

pub mod store;
pub mod types;

pub use store::{ConfigStore, DEFAULT_CONFIG_FILE};
pub use types::{DepthLayout, DisplayConfig, RecorderConfig, SessionConfig, SourceConfig};
