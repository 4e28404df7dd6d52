use crate::error::{Result, SpotterError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Main configuration structure
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub detection: DetectionDefaults,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct ModelConfig {
    /// Variant loaded at startup and persisted on every switch
    #[serde(default = "default_variant")]
    pub variant: String,
    /// Base URL of the artifact release; the per-variant file name is appended
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Artifacts at or above this size download on a background worker
    #[serde(default = "default_background_threshold_mb")]
    pub background_threshold_mb: u64,
    /// Foreground progress poll interval
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct DetectionDefaults {
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
    #[serde(default = "default_max_objects")]
    pub max_objects: usize,
    #[serde(default = "default_true")]
    pub color_analysis: bool,
}

// Default value functions
fn default_variant() -> String {
    "nano".to_string()
}
fn default_base_url() -> String {
    "https://github.com/ultralytics/assets/releases/download/v0.0.0".to_string()
}
fn default_background_threshold_mb() -> u64 {
    40
}
fn default_poll_interval_secs() -> u64 {
    5
}
fn default_confidence_threshold() -> f32 {
    0.5
}
fn default_max_objects() -> usize {
    20
}
fn default_true() -> bool {
    true
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            variant: default_variant(),
            base_url: default_base_url(),
            background_threshold_mb: default_background_threshold_mb(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

impl Default for DetectionDefaults {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            max_objects: default_max_objects(),
            color_analysis: default_true(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            detection: DetectionDefaults::default(),
        }
    }
}

/// Resolve the config file path under XDG config dir
pub fn config_path() -> Result<PathBuf> {
    let base = if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config)
    } else {
        let home = std::env::var("HOME")
            .map_err(|_| SpotterError::Other("HOME env var not set".to_string()))?;
        PathBuf::from(home).join(".config")
    };
    Ok(base.join("spotter").join("config.toml"))
}

impl Config {
    /// Load config from disk, falling back to defaults if the file is missing
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    pub fn load_from(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| SpotterError::Other(format!("Failed to parse config: {e}")))
    }

    /// Save config atomically (tmp + rename)
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml_str = toml::to_string_pretty(self)
            .map_err(|e| SpotterError::Other(format!("Failed to serialize config: {e}")))?;

        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, toml_str)?;
        fs::rename(&tmp_path, path)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.model.variant, "nano");
        assert_eq!(config.model.background_threshold_mb, 40);
        assert_eq!(config.model.poll_interval_secs, 5);
        assert!((config.detection.confidence_threshold - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.detection.max_objects, 20);
        assert!(config.detection.color_analysis);
    }

    #[test]
    fn test_partial_config_merges_defaults() {
        let config: Config = toml::from_str("[model]\nvariant = \"small\"\n").unwrap();
        assert_eq!(config.model.variant, "small");
        assert_eq!(config.detection.max_objects, 20);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.model.variant = "medium".to_string();
        config.save_to(&path).unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.model.variant, "medium");
        // No leftover tmp file after the atomic rename
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope.toml");
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.model.variant, "nano");
    }
}
