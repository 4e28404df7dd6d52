use thiserror::Error;

/// Main error type for Spotter
#[derive(Error, Debug)]
pub enum SpotterError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Detection error: {0}")]
    Detection(#[from] DetectionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Artifact transfer errors
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Network error: {0}\n\nTroubleshooting:\n- Check internet connection\n- Verify the artifact host is reachable\n- Retry; partial downloads are overwritten safely")]
    Network(String),

    #[error("Disk error while writing artifact: {0}")]
    Disk(String),
}

/// Model deserialization errors
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Artifact rejected by strict deserialization: {0}")]
    StrictRejected(String),

    #[error("Corrupt or incompatible artifact: {0}\n\nTroubleshooting:\n- Delete the artifact file and re-download\n- Try a smaller variant (nano or small)")]
    Incompatible(String),
}

/// Model lifecycle transition errors
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("Model download failed: {0}")]
    DownloadFailed(String),

    #[error("Model load failed: {0}")]
    LoadFailed(String),

    #[error("Variant '{0}' is large; the switch must be confirmed first")]
    ConfirmationRequired(String),

    #[error("Unknown model variant: '{0}'. Valid variants: n, s, m, l, x")]
    UnknownVariant(String),
}

/// Configuration update errors; the stored value is left unchanged
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown config field: '{0}'. Available fields: confidence_threshold, max_objects, color_analysis")]
    UnknownField(String),

    #[error("Value '{value}' out of range for {field}: {requirement}")]
    OutOfRange {
        field: &'static str,
        value: String,
        requirement: &'static str,
    },

    #[error("Cannot parse '{value}' as a {expected} for {field}")]
    Unparsable {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("Failed to persist config: {0}")]
    Persist(String),
}

/// Detection request errors
#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("No model is loaded yet. Switch to a variant first")]
    NoActiveModel,

    #[error("Invalid or unsupported image: {0}")]
    InvalidImage(String),

    #[error("Inference failed: {0}")]
    Inference(String),
}

pub type Result<T> = std::result::Result<T, SpotterError>;
