use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::capture::DEFAULT_CAPACITY;
use crate::sensor::polling::{DEFAULT_COLOR_FILE, DEFAULT_DEPTH_FILE};
use crate::store::frame_store::DEFAULT_JPEG_QUALITY;
use crate::store::{IdPolicy, StoreLayout};

/// Where a session's frames come from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    /// Poll a transport directory written by a streamer.
    #[serde(rename_all = "camelCase")]
    Polling {
        dir: PathBuf,
        #[serde(default = "default_color_file")]
        color_file: String,
        #[serde(default = "default_depth_file")]
        depth_file: String,
    },
    /// Synthetic sensor, no hardware needed.
    Dummy {
        #[serde(default = "default_dummy_width")]
        width: u32,
        #[serde(default = "default_dummy_height")]
        height: u32,
    },
}

impl SourceConfig {
    pub fn polling(dir: impl Into<PathBuf>) -> Self {
        Self::Polling {
            dir: dir.into(),
            color_file: default_color_file(),
            depth_file: default_depth_file(),
        }
    }
}

/// On-disk arrangement of a session's output tree.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DepthLayout {
    /// `color/` + `depth/`, raw depth only.
    Flat,
    /// `color/` + `depth/raw/` + `depth/mean_<capacity>/`.
    #[default]
    Split,
}

/// One capture session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    pub name: String,
    pub source: SourceConfig,
    pub output: PathBuf,
    #[serde(default)]
    pub depth_layout: DepthLayout,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub averaged_dir: Option<PathBuf>,
}

impl SessionConfig {
    /// Resolve the output directory tree for a window of `capacity` frames.
    pub fn layout(&self, capacity: usize) -> StoreLayout {
        let layout = match self.depth_layout {
            DepthLayout::Flat => StoreLayout::flat(&self.output),
            DepthLayout::Split => StoreLayout::split(&self.output, capacity),
        };
        match &self.averaged_dir {
            Some(dir) => layout.with_averaged_dir(dir),
            None => layout,
        }
    }
}

/// Size of the live display area.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
        }
    }
}

/// Top-level config file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecorderConfig {
    #[serde(default = "default_capacity")]
    pub buffer_capacity: usize,
    #[serde(default)]
    pub identifier: IdPolicy,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default = "default_sessions")]
    pub sessions: Vec<SessionConfig>,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_CAPACITY,
            identifier: IdPolicy::default(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            display: DisplayConfig::default(),
            sessions: default_sessions(),
        }
    }
}

impl RecorderConfig {
    /// Two sessions, master and subordinate, each with its own transport
    /// and output directory.
    pub fn sync_preset() -> Self {
        Self {
            sessions: vec![
                SessionConfig {
                    name: "master".to_string(),
                    source: SourceConfig::polling("camera_stream_master"),
                    output: PathBuf::from("frames_master"),
                    depth_layout: DepthLayout::Split,
                    averaged_dir: None,
                },
                SessionConfig {
                    name: "sub".to_string(),
                    source: SourceConfig::polling("camera_stream_sub"),
                    output: PathBuf::from("frames_sub"),
                    depth_layout: DepthLayout::Split,
                    averaged_dir: None,
                },
            ],
            ..Self::default()
        }
    }

    /// Check values serde cannot express. Returns the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.buffer_capacity == 0 {
            return Err("bufferCapacity must be at least 1".to_string());
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(format!(
                "jpegQuality must be between 1 and 100, got {}",
                self.jpeg_quality
            ));
        }
        if self.sessions.is_empty() {
            return Err("at least one session must be configured".to_string());
        }
        let mut seen = HashSet::new();
        for session in &self.sessions {
            if session.name.trim().is_empty() {
                return Err("session name must not be empty".to_string());
            }
            if !seen.insert(session.name.as_str()) {
                return Err(format!("duplicate session name '{}'", session.name));
            }
        }
        Ok(())
    }
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_jpeg_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}

fn default_color_file() -> String {
    DEFAULT_COLOR_FILE.to_string()
}

fn default_depth_file() -> String {
    DEFAULT_DEPTH_FILE.to_string()
}

fn default_dummy_width() -> u32 {
    1280
}

fn default_dummy_height() -> u32 {
    720
}

fn default_sessions() -> Vec<SessionConfig> {
    vec![SessionConfig {
        name: "camera".to_string(),
        source: SourceConfig::polling("camera_stream"),
        output: PathBuf::from("frames"),
        depth_layout: DepthLayout::Split,
        averaged_dir: None,
    }]
}
