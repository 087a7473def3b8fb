// Sensor domain: frame pairs and where they come from.

pub mod dummy;
pub mod polling;
pub mod publisher;
pub mod source;
pub mod types;
