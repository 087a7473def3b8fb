//! Producer side of the directory transport.
//!
//! Captures from any [`FrameSource`] and keeps overwriting `color.jpg` and
//! `depth.png` in a transport directory. Both files are replaced
//! atomically so a [`super::polling::PollingSource`] on the other end sees
//! either the previous pair member or the new one, never a torn file.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use super::polling::{DEFAULT_COLOR_FILE, DEFAULT_DEPTH_FILE};
use super::source::FrameSource;
use super::types::Frame;
use crate::store::encode::{encode_color_jpeg, encode_depth_png, write_atomic};
use crate::store::error::{Result, StoreError};

/// Writes frame pairs into a shared transport directory.
pub struct StreamPublisher {
    dir: PathBuf,
    jpeg_quality: u8,
}

impl StreamPublisher {
    pub fn new(dir: impl Into<PathBuf>, jpeg_quality: u8) -> Self {
        Self {
            dir: dir.into(),
            jpeg_quality,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the transport directory, reusing it if it already exists.
    pub fn prepare(&self) -> Result<()> {
        if self.dir.is_dir() {
            tracing::info!(
                "stream directory '{}' already exists, continuing there",
                self.dir.display()
            );
            return Ok(());
        }
        std::fs::create_dir_all(&self.dir).map_err(|source| StoreError::CreateDir {
            path: self.dir.clone(),
            source,
        })
    }

    /// Publish one frame pair.
    pub fn publish(&self, frame: &Frame) -> Result<()> {
        let color_path = self.dir.join(DEFAULT_COLOR_FILE);
        let depth_path = self.dir.join(DEFAULT_DEPTH_FILE);

        let color = encode_color_jpeg(frame.color(), self.jpeg_quality).map_err(|source| {
            StoreError::Encode {
                path: color_path.clone(),
                source,
            }
        })?;
        let depth = encode_depth_png(frame.depth()).map_err(|source| StoreError::Encode {
            path: depth_path.clone(),
            source,
        })?;

        write_atomic(&color_path, &color).map_err(|source| StoreError::Write {
            path: color_path,
            source,
        })?;
        write_atomic(&depth_path, &depth).map_err(|source| StoreError::Write {
            path: depth_path,
            source,
        })
    }

    /// Pump frames from `source` until `running` is cleared.
    ///
    /// Misses are retried immediately; write failures are logged and the
    /// loop keeps going. Returns the number of frames published.
    pub fn run<S: FrameSource + ?Sized>(&self, source: &mut S, running: &AtomicBool) -> u64 {
        tracing::info!(
            "streaming {} into {}",
            source.describe(),
            self.dir.display()
        );
        let mut published = 0;
        while running.load(Ordering::Acquire) {
            let Some(frame) = source.capture() else {
                std::thread::yield_now();
                continue;
            };
            match self.publish(&frame) {
                Ok(()) => published += 1,
                Err(e) => tracing::warn!("stream publish failed: {e}"),
            }
        }
        tracing::info!("stream stopped after {published} frames");
        published
    }
}
