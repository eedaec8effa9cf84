//! Configuration file support.
//!
//! Loads engine-tunable defaults from an optional `smartcut.toml`, following
//! the same on-disk-shape-to-in-memory-options conversion as the rest of the
//! pack: a serde-derived [`ConfigFile`] that converts into a [`JobOptions`]
//! via [`ConfigFile::into_job_options`], falling back to defaults on error.

use crate::types::JobOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// On-disk configuration format for `smartcut.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    pub engine: EngineSettings,
    pub logging: Option<LoggingSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Resource cap on frames a single re-encode window may decode
    pub max_gop_frames: Option<u32>,
    /// Preserve the input's timestamp epoch instead of rebasing to 0
    pub preserve_timestamps: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl ConfigFile {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: ConfigFile = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self {
            engine: EngineSettings {
                max_gop_frames: Some(1200),
                preserve_timestamps: Some(false),
            },
            logging: Some(LoggingSettings {
                level: "info".to_string(),
            }),
        }
    }

    /// Convert to [`JobOptions`], filling anything absent with defaults.
    pub fn into_job_options(self) -> JobOptions {
        let defaults = JobOptions::default();
        JobOptions {
            max_gop_frames: self.engine.max_gop_frames.unwrap_or(defaults.max_gop_frames),
            preserve_timestamps: self
                .engine
                .preserve_timestamps
                .unwrap_or(defaults.preserve_timestamps),
            dry_run: defaults.dry_run,
        }
    }

    pub fn log_level(&self) -> Option<&str> {
        self.logging.as_ref().map(|l| l.level.as_str())
    }
}

/// Load `smartcut.toml` from `path`, falling back to [`JobOptions::default`]
/// with a warning if the file is absent or malformed.
pub fn load_job_options<P: AsRef<Path>>(path: Option<P>) -> JobOptions {
    let Some(path) = path else {
        return JobOptions::default();
    };
    match ConfigFile::from_file(path.as_ref()) {
        Ok(cfg) => cfg.into_job_options(),
        Err(e) => {
            tracing::warn!(
                "could not load config from {:?}, using defaults: {}",
                path.as_ref(),
                e
            );
            JobOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = ConfigFile::default_config();
        assert_eq!(config.engine.max_gop_frames, Some(1200));
    }

    #[test]
    fn test_config_file_roundtrip() {
        let config = ConfigFile::default_config();
        let mut temp_file = NamedTempFile::new().unwrap();
        let content = toml::to_string_pretty(&config).unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        let loaded = ConfigFile::from_file(temp_file.path()).unwrap();
        assert_eq!(
            loaded.engine.max_gop_frames,
            config.engine.max_gop_frames
        );
    }

    #[test]
    fn test_into_job_options() {
        let opts = ConfigFile::default_config().into_job_options();
        assert_eq!(opts.max_gop_frames, 1200);
        assert!(!opts.preserve_timestamps);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let opts = load_job_options(Some("/nonexistent/smartcut.toml"));
        assert_eq!(opts.max_gop_frames, JobOptions::default().max_gop_frames);
    }
}
