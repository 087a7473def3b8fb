use std::time::{Duration, Instant};

use image::{Luma, Rgb, RgbImage};

use super::source::RgbdSensor;
use super::types::{DepthImage, Frame};

const SYNTHETIC_NAME: &str = "Synthetic RGB-D Sensor";

/// Depth of the ramp's near edge in millimetres.
const NEAR_MM: u16 = 500;
/// Depth span covered by the ramp in millimetres.
const SPAN_MM: u32 = 4000;

/// A fake RGB-D sensor for running without hardware.
///
/// Produces a horizontally scrolling color gradient and a depth ramp from
/// 0.5 m to 4.5 m. Every `miss_every`-th call reports "not ready" so
/// consumers exercise their retry path.
///
/// Enable via `DUMMY_CAMERA=1` environment variable.
pub struct SyntheticSensor {
    width: u32,
    height: u32,
    frame_count: u64,
    miss_every: Option<u64>,
    frame_interval: Option<Duration>,
    last_frame: Option<Instant>,
    started: Instant,
}

impl SyntheticSensor {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame_count: 0,
            miss_every: None,
            frame_interval: None,
            last_frame: None,
            started: Instant::now(),
        }
    }

    /// Report a miss on every `n`-th capture call.
    pub fn with_miss_every(mut self, n: u64) -> Self {
        self.miss_every = (n > 0).then_some(n);
        self
    }

    /// Throttle to at most one frame per `interval`, like real hardware.
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = Some(interval);
        self
    }

    /// Whether the synthetic sensor is enabled via environment variable.
    pub fn is_enabled() -> bool {
        std::env::var("DUMMY_CAMERA").is_ok_and(|v| v == "1" || v == "true")
    }

    pub fn frames_produced(&self) -> u64 {
        self.frame_count
    }

    fn generate(&self) -> Option<Frame> {
        let width = self.width.max(1);
        let shift = (self.frame_count % u64::from(width)) as u32;
        let color = RgbImage::from_fn(self.width, self.height, |x, y| {
            let r = (((x + shift) % width) * 255 / width) as u8;
            let g = (y * 255 / self.height.max(1)) as u8;
            Rgb([r, g, 128])
        });
        let depth = DepthImage::from_fn(self.width, self.height, |x, _| {
            Luma([NEAR_MM + (x * SPAN_MM / width) as u16])
        });
        let timestamp_us = self.started.elapsed().as_micros() as u64;
        Frame::new(color, depth, timestamp_us).ok()
    }
}

impl RgbdSensor for SyntheticSensor {
    fn name(&self) -> String {
        format!("{SYNTHETIC_NAME} {}x{}", self.width, self.height)
    }

    fn capture_frame(&mut self, _align_depth_to_color: bool) -> Option<Frame> {
        if let (Some(interval), Some(last)) = (self.frame_interval, self.last_frame) {
            let elapsed = last.elapsed();
            if elapsed < interval {
                std::thread::sleep(interval - elapsed);
            }
        }
        self.frame_count += 1;
        self.last_frame = Some(Instant::now());
        if self.miss_every.is_some_and(|n| self.frame_count % n == 0) {
            return None;
        }
        self.generate()
    }
}
