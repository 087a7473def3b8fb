//! `FrameSource` trait: the single capability a capture session needs.
//!
//! A live sensor binding and the directory-polling proxy both implement
//! this trait, so the session is chosen once at construction and never
//! branches on a mode flag.

use super::types::Frame;

/// Something that can be asked for the current frame pair.
///
/// `None` is a transient miss (sensor not ready, producer mid-write) and
/// must never end the caller's loop. Implementations keep no internal
/// queue: each call reflects the external state at that moment.
pub trait FrameSource: Send {
    /// Short human-readable description used in logs.
    fn describe(&self) -> String;

    /// Try to obtain one frame pair.
    fn capture(&mut self) -> Option<Frame>;
}

/// Abstraction over a hardware RGB-D driver.
///
/// Mirrors the usual SDK call shape: one blocking capture call that may
/// return nothing when the device has no fresh frame yet.
pub trait RgbdSensor: Send {
    /// Device description (model, serial, index).
    fn name(&self) -> String;

    /// Capture one frame pair, optionally with depth re-projected into the
    /// color camera's frame.
    fn capture_frame(&mut self, align_depth_to_color: bool) -> Option<Frame>;
}

/// Adapts an [`RgbdSensor`] to [`FrameSource`].
pub struct LiveSource<S: RgbdSensor> {
    sensor: S,
    align_depth_to_color: bool,
}

impl<S: RgbdSensor> LiveSource<S> {
    /// Wrap a sensor. Depth is aligned to color unless disabled.
    pub fn new(sensor: S) -> Self {
        Self {
            sensor,
            align_depth_to_color: true,
        }
    }

    pub fn with_alignment(mut self, align_depth_to_color: bool) -> Self {
        self.align_depth_to_color = align_depth_to_color;
        self
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }
}

impl<S: RgbdSensor> FrameSource for LiveSource<S> {
    fn describe(&self) -> String {
        format!("live:{}", self.sensor.name())
    }

    fn capture(&mut self) -> Option<Frame> {
        self.sensor.capture_frame(self.align_depth_to_color)
    }
}
