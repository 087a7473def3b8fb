//! Directory-polling frame source.
//!
//! An external producer (see [`super::publisher::StreamPublisher`]) keeps
//! overwriting a fixed pair of files in a shared directory. Every call to
//! `capture()` decodes whatever is there right now; a missing, partially
//! written or corrupt file is a miss, never an error.

use std::path::{Path, PathBuf};
use std::time::Instant;

use image::DynamicImage;

use super::source::FrameSource;
use super::types::{DepthImage, Frame};

/// Default color file name written by the streamer.
pub const DEFAULT_COLOR_FILE: &str = "color.jpg";
/// Default depth file name written by the streamer.
pub const DEFAULT_DEPTH_FILE: &str = "depth.png";

/// Polls a transport directory for a `color.*` / `depth.*` pair.
pub struct PollingSource {
    dir: PathBuf,
    color_file: String,
    depth_file: String,
    started: Instant,
}

impl PollingSource {
    /// Poll `dir` for the default `color.jpg` / `depth.png` pair.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_files(dir, DEFAULT_COLOR_FILE, DEFAULT_DEPTH_FILE)
    }

    /// Poll `dir` for a custom pair of file names.
    pub fn with_files(
        dir: impl Into<PathBuf>,
        color_file: impl Into<String>,
        depth_file: impl Into<String>,
    ) -> Self {
        Self {
            dir: dir.into(),
            color_file: color_file.into(),
            depth_file: depth_file.into(),
            started: Instant::now(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read_pair(&self) -> Result<Frame, String> {
        let color_path = self.dir.join(&self.color_file);
        let depth_path = self.dir.join(&self.depth_file);

        let color = image::open(&color_path)
            .map_err(|e| format!("{}: {e}", color_path.display()))?
            .into_rgb8();
        let depth = image::open(&depth_path).map_err(|e| format!("{}: {e}", depth_path.display()))?;
        let depth = decode_depth(depth)
            .ok_or_else(|| format!("{}: not a grayscale depth map", depth_path.display()))?;

        let timestamp_us = self.started.elapsed().as_micros() as u64;
        Frame::new(color, depth, timestamp_us).map_err(|e| e.to_string())
    }
}

impl FrameSource for PollingSource {
    fn describe(&self) -> String {
        format!("polling:{}", self.dir.display())
    }

    fn capture(&mut self) -> Option<Frame> {
        match self.read_pair() {
            Ok(frame) => Some(frame),
            Err(e) => {
                tracing::trace!("polling miss: {e}");
                None
            }
        }
    }
}

/// Interpret a decoded image as raw 16-bit depth samples.
///
/// 16-bit grayscale passes through untouched. 8-bit grayscale is widened
/// value-for-value (no 0..255 → 0..65535 rescaling, which would corrupt
/// metric depth). Anything with color channels is rejected.
pub fn decode_depth(image: DynamicImage) -> Option<DepthImage> {
    match image {
        DynamicImage::ImageLuma16(depth) => Some(depth),
        DynamicImage::ImageLuma8(narrow) => {
            let (width, height) = narrow.dimensions();
            let samples = narrow.into_raw().into_iter().map(u16::from).collect();
            DepthImage::from_raw(width, height, samples)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::publisher::StreamPublisher;
    use image::{GrayImage, RgbImage};
    use tempfile::TempDir;

    fn sample_frame(depth_value: u16) -> Frame {
        Frame::from_raw(8, 6, vec![90; 8 * 6 * 3], vec![depth_value; 8 * 6], 0).unwrap()
    }

    #[test]
    fn missing_files_are_a_miss() {
        let dir = TempDir::new().unwrap();
        let mut source = PollingSource::new(dir.path());
        assert!(source.capture().is_none());
    }

    #[test]
    fn missing_directory_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let mut source = PollingSource::new(dir.path().join("not-there"));
        assert!(source.capture().is_none());
    }

    #[test]
    fn corrupt_color_file_is_a_miss() {
        let dir = TempDir::new().unwrap();
        StreamPublisher::new(dir.path(), 90).publish(&sample_frame(1200)).unwrap();
        // Simulate a producer caught mid-write.
        std::fs::write(dir.path().join(DEFAULT_COLOR_FILE), [0xFF, 0xD8, 0xFF]).unwrap();

        let mut source = PollingSource::new(dir.path());
        assert!(source.capture().is_none());
    }

    #[test]
    fn reads_published_pair_with_exact_depth() {
        let dir = TempDir::new().unwrap();
        StreamPublisher::new(dir.path(), 90).publish(&sample_frame(4321)).unwrap();

        let mut source = PollingSource::new(dir.path());
        let frame = source.capture().expect("frame should decode");
        assert_eq!(frame.width(), 8);
        assert_eq!(frame.height(), 6);
        assert!(frame.depth().pixels().all(|p| p.0[0] == 4321));
    }

    #[test]
    fn mismatched_pair_is_a_miss() {
        let dir = TempDir::new().unwrap();
        RgbImage::new(8, 6).save(dir.path().join("color.png")).unwrap();
        DepthImage::new(4, 4).save(dir.path().join("depth.png")).unwrap();

        let mut source = PollingSource::with_files(dir.path(), "color.png", "depth.png");
        assert!(source.capture().is_none());
    }

    #[test]
    fn decode_depth_widens_eight_bit_without_scaling() {
        let mut narrow = GrayImage::new(2, 1);
        narrow.put_pixel(0, 0, image::Luma([7]));
        narrow.put_pixel(1, 0, image::Luma([255]));

        let depth = decode_depth(DynamicImage::ImageLuma8(narrow)).unwrap();
        assert_eq!(depth.as_raw(), &vec![7u16, 255]);
    }

    #[test]
    fn decode_depth_rejects_color_images() {
        let rgb = DynamicImage::ImageRgb8(RgbImage::new(2, 2));
        assert!(decode_depth(rgb).is_none());
    }

    #[test]
    fn describe_names_directory() {
        let source = PollingSource::new("camera_stream");
        assert_eq!(source.describe(), "polling:camera_stream");
    }
}
