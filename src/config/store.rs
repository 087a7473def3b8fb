use std::path::{Path, PathBuf};

use crate::config::types::RecorderConfig;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "rgbd-recorder.json";

/// JSON-backed recorder configuration.
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load and validate the config, returning defaults when the file is missing.
    pub fn load(&self) -> Result<RecorderConfig, String> {
        if !self.path.exists() {
            tracing::info!(
                "No config at {}, using defaults",
                self.path.display()
            );
            return Ok(RecorderConfig::default());
        }
        let contents = std::fs::read_to_string(&self.path)
            .map_err(|e| format!("{}: {e}", self.path.display()))?;
        let config: RecorderConfig = serde_json::from_str(&contents)
            .map_err(|e| format!("{}: {e}", self.path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save the config atomically (write .tmp then rename).
    pub fn save(&self, config: &RecorderConfig) -> Result<(), String> {
        let json = serde_json::to_string_pretty(config).map_err(|e| e.to_string())?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &json).map_err(|e| e.to_string())?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| e.to_string())?;

        Ok(())
    }
}
