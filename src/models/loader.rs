use crate::detect::RawDetection;
use crate::error::{DetectionError, LoadError};
use image::DynamicImage;
use std::path::Path;

/// Opaque inference handle: image in, detections out.
///
/// The actual engine lives outside this crate; the lifecycle manager only
/// cares that a handle can be built from an artifact file and invoked.
pub trait Detector: Send + Sync {
    fn detect(
        &self,
        image: &DynamicImage,
        confidence_threshold: f32,
    ) -> Result<Vec<RawDetection>, DetectionError>;
}

impl std::fmt::Debug for dyn Detector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn Detector")
    }
}

/// Deserialization strictness for artifact loading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Default safety policy of the runtime
    Strict,
    /// Explicit opt-out used for exactly one retry after a strict rejection
    Relaxed,
}

/// Builds a [`Detector`] from a downloaded artifact file
pub trait ModelLoader: Send + Sync {
    fn load(&self, path: &Path, mode: LoadMode) -> Result<Box<dyn Detector>, LoadError>;
}

/// Strict-mode load with a single documented relaxed retry.
///
/// Only a strict-policy rejection triggers the retry; a corrupt or
/// incompatible artifact fails immediately. The relaxed mode is passed as an
/// explicit parameter to the same call, never by mutating runtime globals.
pub fn load_with_fallback(
    loader: &dyn ModelLoader,
    path: &Path,
) -> Result<Box<dyn Detector>, LoadError> {
    match loader.load(path, LoadMode::Strict) {
        Ok(detector) => Ok(detector),
        Err(LoadError::StrictRejected(reason)) => {
            tracing::warn!(
                "Strict load of {} rejected ({reason}), retrying in relaxed mode",
                path.display()
            );
            loader.load(path, LoadMode::Relaxed)
        }
        Err(other) => Err(other),
    }
}
