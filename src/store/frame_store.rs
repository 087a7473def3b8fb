use std::path::{Path, PathBuf};

use image::RgbImage;
use serde::{Deserialize, Serialize};

use super::encode::{encode_color_jpeg, encode_depth_png, write_new};
use super::error::{Result, StoreError};
use crate::sensor::types::DepthImage;

/// Default JPEG quality for persisted color frames.
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Produces the wall-clock part of a timestamp identifier.
pub type StampClock = fn() -> String;

fn local_stamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S_%6f").to_string()
}

/// How snapshot files are named.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdPolicy {
    /// `1.jpg`, `2.jpg`, ... continuing from what is already on disk.
    #[default]
    Sequence,
    /// Local wall-clock time with microseconds, e.g. `20261017_142501_038211.jpg`.
    Timestamp,
}

/// Directory layout of one output tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    pub base_dir: PathBuf,
    pub color_dir: PathBuf,
    pub raw_depth_dir: PathBuf,
    /// `None` when only raw depth is kept.
    pub averaged_depth_dir: Option<PathBuf>,
}

impl StoreLayout {
    /// `color/` + `depth/`, raw depth only.
    pub fn flat(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            color_dir: base_dir.join("color"),
            raw_depth_dir: base_dir.join("depth"),
            averaged_depth_dir: None,
            base_dir,
        }
    }

    /// `color/` + `depth/raw/` + `depth/mean_<window>/`.
    pub fn split(base_dir: impl Into<PathBuf>, window: usize) -> Self {
        let base_dir = base_dir.into();
        let depth_dir = base_dir.join("depth");
        Self {
            color_dir: base_dir.join("color"),
            raw_depth_dir: depth_dir.join("raw"),
            averaged_depth_dir: Some(depth_dir.join(format!("mean_{window}"))),
            base_dir,
        }
    }

    /// Relocate the averaged variant. Relative paths resolve against the
    /// base directory, absolute paths are used as-is.
    pub fn with_averaged_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.averaged_depth_dir = Some(self.base_dir.join(dir));
        self
    }

    fn dirs(&self) -> impl Iterator<Item = &Path> {
        [
            Some(&self.color_dir),
            Some(&self.raw_depth_dir),
            self.averaged_depth_dir.as_ref(),
        ]
        .into_iter()
        .flatten()
        .map(PathBuf::as_path)
    }
}

/// Files written by one successful snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRecord {
    pub sequence: u64,
    pub id: String,
    pub color_path: PathBuf,
    pub raw_depth_path: PathBuf,
    pub averaged_depth_path: Option<PathBuf>,
}

/// Numbered on-disk snapshot store.
///
/// Numbering resumes after the color files already present (their count,
/// or the highest numbered file if a failed snapshot left a gap), so
/// restarting against a populated directory appends instead of
/// overwriting. A sequence number is consumed before the writes happen
/// and is never handed out twice, even if those writes fail. Identifiers
/// already taken on disk are skipped and files are never replaced.
#[derive(Debug)]
pub struct FrameStore {
    layout: StoreLayout,
    id_policy: IdPolicy,
    jpeg_quality: u8,
    next_sequence: u64,
    last_stamp: Option<String>,
    clock: StampClock,
    setup_errors: Vec<StoreError>,
}

impl FrameStore {
    /// Create or reuse `layout` on disk and work out the next sequence.
    ///
    /// Never fails: permission problems or creation races are logged and
    /// kept in [`FrameStore::setup_errors`]; numbering falls back to 1 when
    /// the color directory cannot be listed.
    pub fn prepare(layout: StoreLayout, id_policy: IdPolicy, jpeg_quality: u8) -> Self {
        let mut setup_errors = Vec::new();

        if layout.dirs().all(Path::is_dir) {
            tracing::info!(
                "output directory '{}' already exists, continuing recording there",
                layout.base_dir.display()
            );
        } else {
            for dir in layout.dirs() {
                if let Err(source) = std::fs::create_dir_all(dir) {
                    tracing::warn!("unable to create {}: {source}", dir.display());
                    setup_errors.push(StoreError::CreateDir {
                        path: dir.to_path_buf(),
                        source,
                    });
                }
            }
        }

        let existing = match scan_color_dir(&layout.color_dir) {
            Ok((count, highest)) => count.max(highest),
            Err(source) => {
                tracing::warn!(
                    "unable to list {}, numbering restarts at 1: {source}",
                    layout.color_dir.display()
                );
                setup_errors.push(StoreError::ReadDir {
                    path: layout.color_dir.clone(),
                    source,
                });
                0
            }
        };

        Self {
            layout,
            id_policy,
            jpeg_quality,
            next_sequence: existing + 1,
            last_stamp: None,
            clock: local_stamp,
            setup_errors,
        }
    }

    /// Replace the local-time clock used for timestamp identifiers.
    pub fn with_clock(mut self, clock: StampClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    pub fn id_policy(&self) -> IdPolicy {
        self.id_policy
    }

    /// Sequence number the next `persist` call will use.
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Problems met while preparing the layout, if any.
    pub fn setup_errors(&self) -> &[StoreError] {
        &self.setup_errors
    }

    /// Write one snapshot: color as JPEG, raw and averaged depth as 16-bit PNG.
    ///
    /// All files share one identifier. The averaged map is dropped when the
    /// layout keeps raw depth only.
    pub fn persist(
        &mut self,
        color: &RgbImage,
        raw_depth: &DepthImage,
        averaged_depth: &DepthImage,
    ) -> Result<SnapshotRecord> {
        let (sequence, id) = self.claim_id();
        let (color_path, raw_depth_path, averaged_depth_path) = self.paths(&id);

        let color_bytes = encode_color_jpeg(color, self.jpeg_quality).map_err(|source| {
            StoreError::Encode {
                path: color_path.clone(),
                source,
            }
        })?;
        write_file(&color_path, &color_bytes)?;

        let raw_bytes = encode_depth_png(raw_depth).map_err(|source| StoreError::Encode {
            path: raw_depth_path.clone(),
            source,
        })?;
        write_file(&raw_depth_path, &raw_bytes)?;

        if let Some(path) = &averaged_depth_path {
            let averaged_bytes =
                encode_depth_png(averaged_depth).map_err(|source| StoreError::Encode {
                    path: path.clone(),
                    source,
                })?;
            write_file(path, &averaged_bytes)?;
        }

        Ok(SnapshotRecord {
            sequence,
            id,
            color_path,
            raw_depth_path,
            averaged_depth_path,
        })
    }

    fn paths(&self, id: &str) -> (PathBuf, PathBuf, Option<PathBuf>) {
        (
            self.layout.color_dir.join(format!("{id}.jpg")),
            self.layout.raw_depth_dir.join(format!("{id}.png")),
            self.layout
                .averaged_depth_dir
                .as_ref()
                .map(|dir| dir.join(format!("{id}.png"))),
        )
    }

    fn is_taken(&self, id: &str) -> bool {
        let (color, raw, averaged) = self.paths(id);
        color.exists() || raw.exists() || averaged.is_some_and(|p| p.exists())
    }

    /// Consume sequence numbers until one yields an identifier with no
    /// files on disk yet.
    fn claim_id(&mut self) -> (u64, String) {
        loop {
            let sequence = self.next_sequence;
            self.next_sequence += 1;
            let id = match self.id_policy {
                IdPolicy::Sequence => sequence.to_string(),
                IdPolicy::Timestamp => {
                    let stamp = (self.clock)();
                    let repeated = self.last_stamp.as_deref() == Some(stamp.as_str());
                    let id = if repeated || self.is_taken(&stamp) {
                        format!("{stamp}_{sequence}")
                    } else {
                        stamp.clone()
                    };
                    self.last_stamp = Some(stamp);
                    id
                }
            };
            if !self.is_taken(&id) {
                return (sequence, id);
            }
            tracing::warn!("snapshot id {id} already exists on disk, skipping");
        }
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    write_new(path, bytes).map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Count regular files in `dir`, ignoring leftover `.tmp` files, and find
/// the highest numeric file stem among them.
fn scan_color_dir(dir: &Path) -> std::io::Result<(u64, u64)> {
    let mut count = 0;
    let mut highest = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_tmp = path.extension().is_some_and(|ext| ext == "tmp");
        if !entry.file_type()?.is_file() || is_tmp {
            continue;
        }
        count += 1;
        if let Some(n) = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(|stem| stem.parse::<u64>().ok())
        {
            highest = highest.max(n);
        }
    }
    Ok((count, highest))
}
