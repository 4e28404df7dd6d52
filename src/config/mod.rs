//! Configuration module for spotter
//!
//! Two layers: the TOML file under `$XDG_CONFIG_HOME/spotter/config.toml`
//! (see [`schema`]) holding startup defaults plus the persisted current
//! variant, and the live [`DetectionConfig`] that commands mutate one field
//! at a time. Only the variant switch writes back to disk; detection tuning
//! is in-memory for the life of the process.

pub mod schema;

pub use schema::Config;

use crate::error::ConfigError;
use schema::DetectionDefaults;

/// Truthy strings accepted for boolean config fields
const TRUTHY: &[&str] = &["true", "yes", "1", "on"];
const FALSY: &[&str] = &["false", "no", "0", "off"];

/// Live detection tuning, updated field-by-field from commands
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionConfig {
    /// Minimum confidence for a detection to be reported, in [0, 1]
    pub confidence_threshold: f32,
    /// Cap on the per-object detail list in a report, at least 1
    pub max_objects: usize,
    /// Whether reports include a dominant-color section
    pub color_analysis: bool,
}

impl From<&DetectionDefaults> for DetectionConfig {
    fn from(defaults: &DetectionDefaults) -> Self {
        Self {
            confidence_threshold: defaults.confidence_threshold,
            max_objects: defaults.max_objects,
            color_analysis: defaults.color_analysis,
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self::from(&DetectionDefaults::default())
    }
}

impl DetectionConfig {
    /// Validate and apply a single raw field update.
    ///
    /// On any error the stored value is left unchanged.
    pub fn apply_field(&mut self, field: &str, raw: &str) -> Result<(), ConfigError> {
        match field {
            "confidence_threshold" => {
                let value: f32 = raw.parse().map_err(|_| ConfigError::Unparsable {
                    field: "confidence_threshold",
                    value: raw.to_string(),
                    expected: "float",
                })?;
                if !(0.0..=1.0).contains(&value) {
                    return Err(ConfigError::OutOfRange {
                        field: "confidence_threshold",
                        value: raw.to_string(),
                        requirement: "must be between 0 and 1",
                    });
                }
                self.confidence_threshold = value;
            }
            "max_objects" => {
                let value: usize = raw.parse().map_err(|_| ConfigError::Unparsable {
                    field: "max_objects",
                    value: raw.to_string(),
                    expected: "integer",
                })?;
                if value < 1 {
                    return Err(ConfigError::OutOfRange {
                        field: "max_objects",
                        value: raw.to_string(),
                        requirement: "must be at least 1",
                    });
                }
                self.max_objects = value;
            }
            "color_analysis" => {
                let lower = raw.to_lowercase();
                if TRUTHY.contains(&lower.as_str()) {
                    self.color_analysis = true;
                } else if FALSY.contains(&lower.as_str()) {
                    self.color_analysis = false;
                } else {
                    return Err(ConfigError::Unparsable {
                        field: "color_analysis",
                        value: raw.to_string(),
                        expected: "boolean (true/false/yes/no/1/0/on/off)",
                    });
                }
            }
            other => return Err(ConfigError::UnknownField(other.to_string())),
        }
        Ok(())
    }
}
