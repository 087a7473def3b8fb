use std::collections::VecDeque;
use std::sync::Arc;

use super::error::BufferError;
use crate::sensor::types::DepthImage;

/// Default rolling window: one second of depth at 30 fps.
pub const DEFAULT_CAPACITY: usize = 30;

/// Fixed-capacity FIFO of the most recent depth frames.
///
/// Frames are held as `Arc<DepthImage>` so cloning the buffer is a cheap
/// pointer copy; the session uses that to take a consistent copy under its
/// lock and average outside it. The buffer itself is not synchronised.
#[derive(Debug, Clone)]
pub struct RollingDepthBuffer {
    frames: VecDeque<Arc<DepthImage>>,
    capacity: usize,
}

/// Result of [`RollingDepthBuffer::snapshot`].
#[derive(Debug, Clone)]
pub struct DepthSnapshot {
    /// Most recently appended frame.
    pub raw: Arc<DepthImage>,
    /// Per-pixel integer mean of every buffered frame (truncated).
    pub averaged: DepthImage,
    /// How many frames went into the average.
    pub frame_count: usize,
}

impl RollingDepthBuffer {
    /// Create an empty buffer. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Buffered frames, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<DepthImage>> {
        self.frames.iter()
    }

    /// Append a frame, evicting the oldest first when full.
    ///
    /// A frame whose dimensions differ from the buffered ones empties the
    /// buffer before it is added, since the mean is only defined over
    /// same-sized maps.
    pub fn append(&mut self, depth: Arc<DepthImage>) {
        if let Some(front) = self.frames.front() {
            if front.dimensions() != depth.dimensions() {
                tracing::debug!(
                    "depth resolution changed {:?} -> {:?}, resetting rolling buffer",
                    front.dimensions(),
                    depth.dimensions()
                );
                self.frames.clear();
            }
        }
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(depth);
    }

    /// Drop every buffered frame.
    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Latest frame plus the mean over everything buffered.
    pub fn snapshot(&self) -> Result<DepthSnapshot, BufferError> {
        let raw = self.frames.back().ok_or(BufferError::Empty)?;
        let (width, height) = raw.dimensions();
        let count = self.frames.len() as u64;

        let mut sums = vec![0u64; raw.as_raw().len()];
        for frame in &self.frames {
            for (sum, &sample) in sums.iter_mut().zip(frame.as_raw()) {
                *sum += u64::from(sample);
            }
        }
        // Every buffered frame shares `raw`'s dimensions, see `append`.
        let mut averaged = DepthImage::new(width, height);
        for (out, sum) in averaged.iter_mut().zip(sums) {
            *out = (sum / count) as u16;
        }

        Ok(DepthSnapshot {
            raw: Arc::clone(raw),
            averaged,
            frame_count: self.frames.len(),
        })
    }
}

impl Default for RollingDepthBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
