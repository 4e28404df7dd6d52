use crate::error::LifecycleError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Size/quality tier of the detection model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelVariant {
    Nano,
    Small,
    Medium,
    Large,
    Xlarge,
}

/// Static metadata for a model variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantInfo {
    pub variant: ModelVariant,
    pub letter: &'static str,
    pub name: &'static str,
    pub size_mb: u64,
    pub description: &'static str,
}

/// Registry of available model variants, ordered fastest to most accurate
pub const VARIANTS: &[VariantInfo] = &[
    VariantInfo {
        variant: ModelVariant::Nano,
        letter: "n",
        name: "nano",
        size_mb: 6,
        description: "Fastest, lowest accuracy",
    },
    VariantInfo {
        variant: ModelVariant::Small,
        letter: "s",
        name: "small",
        size_mb: 22,
        description: "Good balance of speed and accuracy",
    },
    VariantInfo {
        variant: ModelVariant::Medium,
        letter: "m",
        name: "medium",
        size_mb: 50,
        description: "Mid-size, more accurate",
    },
    VariantInfo {
        variant: ModelVariant::Large,
        letter: "l",
        name: "large",
        size_mb: 90,
        description: "Large, high accuracy",
    },
    VariantInfo {
        variant: ModelVariant::Xlarge,
        letter: "x",
        name: "xlarge",
        size_mb: 670,
        description: "Very large, best accuracy, slowest",
    },
];

impl ModelVariant {
    /// Static metadata for this variant
    #[must_use]
    pub fn info(self) -> &'static VariantInfo {
        // VARIANTS covers every enum value
        VARIANTS.iter().find(|v| v.variant == self).unwrap()
    }

    /// Single-letter code used in artifact URLs
    #[must_use]
    pub fn letter(self) -> &'static str {
        self.info().letter
    }

    /// Full variant name
    #[must_use]
    pub fn name(self) -> &'static str {
        self.info().name
    }

    /// Approximate artifact size in megabytes
    #[must_use]
    pub fn size_mb(self) -> u64 {
        self.info().size_mb
    }

    /// Large variants require an explicit confirmation before downloading
    #[must_use]
    pub fn requires_confirmation(self) -> bool {
        matches!(self, Self::Large | Self::Xlarge)
    }

    /// All variants in speed order
    #[must_use]
    pub fn all() -> impl Iterator<Item = ModelVariant> {
        VARIANTS.iter().map(|v| v.variant)
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelVariant {
    type Err = LifecycleError;

    /// Accepts both the letter code ("s") and the full name ("small")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        VARIANTS
            .iter()
            .find(|v| v.letter == lower || v.name == lower)
            .map(|v| v.variant)
            .ok_or_else(|| LifecycleError::UnknownVariant(s.to_string()))
    }
}
