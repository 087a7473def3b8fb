use std::sync::Arc;

use image::{ImageBuffer, Luma, RgbImage};
use thiserror::Error;

/// Single-channel 16-bit depth map. Sample units are whatever the sensor
/// reports (millimetres for the Azure Kinect family).
pub type DepthImage = ImageBuffer<Luma<u16>, Vec<u16>>;

/// Errors raised while assembling a frame pair.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("color is {color_width}x{color_height} but depth is {depth_width}x{depth_height}")]
    DimensionMismatch {
        color_width: u32,
        color_height: u32,
        depth_width: u32,
        depth_height: u32,
    },

    #[error("buffer of {len} samples does not match {width}x{height}x{channels}")]
    BufferLength {
        len: usize,
        width: u32,
        height: u32,
        channels: u32,
    },
}

/// A spatially aligned color + depth pair.
///
/// Alignment is the producer's job; construction only checks that both
/// images share the same dimensions. Both halves are reference-counted, so
/// cloning a frame or handing its depth to the rolling buffer never copies
/// pixel data.
#[derive(Debug, Clone)]
pub struct Frame {
    color: Arc<RgbImage>,
    depth: Arc<DepthImage>,
    /// Capture timestamp in microseconds, relative to the producer's clock.
    pub timestamp_us: u64,
}

impl Frame {
    /// Pair a color image with its depth map.
    pub fn new(color: RgbImage, depth: DepthImage, timestamp_us: u64) -> Result<Self, FrameError> {
        if color.dimensions() != depth.dimensions() {
            return Err(FrameError::DimensionMismatch {
                color_width: color.width(),
                color_height: color.height(),
                depth_width: depth.width(),
                depth_height: depth.height(),
            });
        }
        Ok(Self {
            color: Arc::new(color),
            depth: Arc::new(depth),
            timestamp_us,
        })
    }

    /// Build a frame from raw interleaved RGB bytes and row-major depth samples.
    pub fn from_raw(
        width: u32,
        height: u32,
        rgb: Vec<u8>,
        depth: Vec<u16>,
        timestamp_us: u64,
    ) -> Result<Self, FrameError> {
        let rgb_len = rgb.len();
        let color = RgbImage::from_raw(width, height, rgb).ok_or(FrameError::BufferLength {
            len: rgb_len,
            width,
            height,
            channels: 3,
        })?;
        let depth_len = depth.len();
        let depth = DepthImage::from_raw(width, height, depth).ok_or(FrameError::BufferLength {
            len: depth_len,
            width,
            height,
            channels: 1,
        })?;
        Self::new(color, depth, timestamp_us)
    }

    pub fn width(&self) -> u32 {
        self.color.width()
    }

    pub fn height(&self) -> u32 {
        self.color.height()
    }

    pub fn color(&self) -> &RgbImage {
        &self.color
    }

    pub fn depth(&self) -> &DepthImage {
        &self.depth
    }

    /// Total payload size in bytes (RGB + 16-bit depth).
    pub fn byte_len(&self) -> usize {
        self.color.as_raw().len() + self.depth.as_raw().len() * 2
    }

    /// Shared handle to the depth half.
    pub fn shared_depth(&self) -> Arc<DepthImage> {
        Arc::clone(&self.depth)
    }
}
