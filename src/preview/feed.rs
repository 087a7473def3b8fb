use base64::Engine;
use image::RgbImage;

use super::compress::{self, PreviewError};
use crate::capture::FrameFeed;
use crate::sensor::types::Frame;

/// JPEG quality used for display frames.
pub const PREVIEW_JPEG_QUALITY: u8 = 85;

/// Display-side view of a session's live frames.
///
/// Wraps the session's watch channel. Only the most recent frame is ever
/// observed; frames published between two reads are skipped.
pub struct PreviewFeed {
    feed: FrameFeed,
    max_width: u32,
    max_height: u32,
}

impl PreviewFeed {
    pub fn new(feed: FrameFeed, max_width: u32, max_height: u32) -> Self {
        Self {
            feed,
            max_width,
            max_height,
        }
    }

    pub fn display_size(&self) -> (u32, u32) {
        (self.max_width, self.max_height)
    }

    /// True when a frame arrived since the last `latest_*` call.
    ///
    /// Returns false once the session has been dropped.
    pub fn has_new_frame(&self) -> bool {
        self.feed.has_changed().unwrap_or(false)
    }

    /// Take the most recent frame and mark it seen.
    pub fn latest(&mut self) -> Option<Frame> {
        self.feed.borrow_and_update().clone()
    }

    /// Latest color image scaled to the display area.
    pub fn latest_scaled(&mut self) -> Result<Option<RgbImage>, PreviewError> {
        let Some(frame) = self.latest() else {
            return Ok(None);
        };
        compress::scale_to_fit(frame.color(), self.max_width, self.max_height).map(Some)
    }

    /// Latest color image as a display-sized JPEG.
    pub fn latest_jpeg(&mut self) -> Result<Option<Vec<u8>>, PreviewError> {
        match self.latest_scaled()? {
            Some(scaled) => compress::compress_jpeg(&scaled, PREVIEW_JPEG_QUALITY).map(Some),
            None => Ok(None),
        }
    }

    /// Latest color image as base64-encoded JPEG.
    pub fn latest_base64(&mut self) -> Result<Option<String>, PreviewError> {
        Ok(self
            .latest_jpeg()?
            .map(|jpeg| base64::engine::general_purpose::STANDARD.encode(jpeg)))
    }

    /// Latest depth map rendered as a grayscale JPEG at the display size.
    pub fn latest_depth_jpeg(&mut self) -> Result<Option<Vec<u8>>, PreviewError> {
        let Some(frame) = self.latest() else {
            return Ok(None);
        };
        let gray = compress::depth_to_gray(frame.depth());
        let rgb = image::DynamicImage::ImageLuma8(gray).into_rgb8();
        let scaled = compress::scale_to_fit(&rgb, self.max_width, self.max_height)?;
        compress::compress_jpeg(&scaled, PREVIEW_JPEG_QUALITY).map(Some)
    }
}
