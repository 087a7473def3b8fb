// Output side: numbered snapshot trees and the image encoders they use.

pub mod encode;
pub mod error;
pub mod frame_store;

pub use frame_store::{FrameStore, IdPolicy, SnapshotRecord, StoreLayout};
