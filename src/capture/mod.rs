// Capture pipeline: rolling depth window, per-sensor sessions, and
// the sync group that drives several sessions from one trigger.

pub mod buffer;
pub mod error;
pub mod session;
pub mod sync;

pub use buffer::{DepthSnapshot, RollingDepthBuffer, DEFAULT_CAPACITY};
pub use error::{BufferError, SessionError};
pub use session::{CaptureSession, FrameFeed, SessionStatus};
pub use sync::{MemberOutcome, SyncGroup};
