use crate::config::DetectionConfig;
use crate::detect::{aggregate, dominant_colors, DetectionReport};
use crate::error::{ConfigError, DetectionError, LifecycleError};
use crate::models::lifecycle::ModelLifecycle;
use crate::models::progress::{ArtifactState, ProgressRegistry};
use crate::models::variants::ModelVariant;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::mpsc;

/// Buckets reported in the dominant-color section
const DOMINANT_COLOR_COUNT: usize = 5;

/// Summary of the model a successful switch produced
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveModelInfo {
    pub variant: ModelVariant,
    pub confidence_threshold: f32,
}

/// Snapshot returned by [`DetectService::query_status`]
#[derive(Debug, Clone)]
pub struct ServiceStatus {
    pub active_variant: Option<ModelVariant>,
    pub config: DetectionConfig,
    pub artifacts: Vec<(ModelVariant, ArtifactState)>,
}

/// Facade the command surface talks to.
///
/// Owns the shared detection config; model state lives in the lifecycle
/// manager and download state in the progress registry.
pub struct DetectService {
    lifecycle: Arc<ModelLifecycle>,
    config: Arc<RwLock<DetectionConfig>>,
    registry: ProgressRegistry,
}

impl DetectService {
    pub fn new(
        lifecycle: Arc<ModelLifecycle>,
        config: DetectionConfig,
        registry: ProgressRegistry,
    ) -> Self {
        Self {
            lifecycle,
            config: Arc::new(RwLock::new(config)),
            registry,
        }
    }

    /// Switch the active model to `variant`.
    ///
    /// Large variants are refused until the command surface has run its
    /// two-step confirmation and passes `confirmed`, so a typo never starts
    /// a multi-hundred-megabyte transfer.
    pub async fn ensure_active(
        &self,
        variant: ModelVariant,
        confirmed: bool,
        sink: Option<mpsc::Sender<u8>>,
        max_wait: Option<Duration>,
    ) -> Result<ActiveModelInfo, LifecycleError> {
        if variant.requires_confirmation() && !confirmed {
            return Err(LifecycleError::ConfirmationRequired(
                variant.name().to_string(),
            ));
        }

        let model = self.lifecycle.ensure_active(variant, sink, max_wait).await?;
        Ok(ActiveModelInfo {
            variant: model.variant,
            confidence_threshold: self.config_snapshot().confidence_threshold,
        })
    }

    /// Validate and apply one config field; errors leave the value unchanged
    pub fn update_config(&self, field: &str, raw: &str) -> Result<(), ConfigError> {
        let mut config = self.config.write().unwrap_or_else(|e| e.into_inner());
        config.apply_field(field, raw)?;
        tracing::info!("Config updated: {field} = {raw}");
        Ok(())
    }

    #[must_use]
    pub fn config_snapshot(&self) -> DetectionConfig {
        self.config
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Run one detection pass over an uploaded image.
    ///
    /// The model handle current at call time is used for the whole pass even
    /// if a swap lands mid-detection. Inference failure surfaces as an error
    /// with no partial report.
    pub async fn run_detection(&self, image_bytes: &[u8]) -> Result<DetectionReport, DetectionError> {
        let model = self
            .lifecycle
            .active()
            .ok_or(DetectionError::NoActiveModel)?;
        let image = image::load_from_memory(image_bytes)
            .map_err(|e| DetectionError::InvalidImage(e.to_string()))?;
        let config = self.config_snapshot();

        let raw = model.detector.detect(&image, config.confidence_threshold)?;
        tracing::info!(
            "Detected {} objects with {} model",
            raw.len(),
            model.variant
        );

        let mut report = aggregate(&raw, image.width(), image.height(), &config);
        report.variant = Some(model.variant);
        if config.color_analysis {
            report.colors = Some(dominant_colors(&image, DOMINANT_COLOR_COUNT));
        }
        Ok(report)
    }

    #[must_use]
    pub fn query_status(&self) -> ServiceStatus {
        ServiceStatus {
            active_variant: self.lifecycle.active_variant(),
            config: self.config_snapshot(),
            artifacts: self.registry.snapshot(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{BoundingBox, RawDetection};
    use crate::error::{FetchError, LoadError};
    use crate::models::fetch::ArtifactSource;
    use crate::models::lifecycle::LifecycleSettings;
    use crate::models::loader::{Detector, LoadMode, ModelLoader};
    use async_trait::async_trait;
    use image::DynamicImage;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    struct InstantSource {
        dir: PathBuf,
        registry: ProgressRegistry,
    }

    #[async_trait]
    impl ArtifactSource for InstantSource {
        fn artifact_path(&self, variant: ModelVariant) -> PathBuf {
            self.dir.join(format!("model-{variant}.pt"))
        }

        async fn fetch(&self, variant: ModelVariant) -> Result<PathBuf, FetchError> {
            let path = self.artifact_path(variant);
            std::fs::write(&path, b"weights").map_err(|e| FetchError::Disk(e.to_string()))?;
            self.registry.set(variant, ArtifactState::Completed);
            Ok(path)
        }
    }

    struct FixedDetector(Vec<RawDetection>);

    impl Detector for FixedDetector {
        fn detect(
            &self,
            _image: &DynamicImage,
            confidence_threshold: f32,
        ) -> Result<Vec<RawDetection>, DetectionError> {
            Ok(self
                .0
                .iter()
                .filter(|d| d.confidence >= confidence_threshold)
                .cloned()
                .collect())
        }
    }

    struct FixedLoader(Vec<RawDetection>);

    impl ModelLoader for FixedLoader {
        fn load(&self, _path: &Path, _mode: LoadMode) -> Result<Box<dyn Detector>, LoadError> {
            Ok(Box::new(FixedDetector(self.0.clone())))
        }
    }

    fn sample_detections() -> Vec<RawDetection> {
        vec![
            RawDetection {
                class_id: 0,
                label: "person".to_string(),
                confidence: 0.9,
                bbox: BoundingBox {
                    x1: 0.0,
                    y1: 0.0,
                    x2: 20.0,
                    y2: 30.0,
                },
            },
            RawDetection {
                class_id: 1,
                label: "bicycle".to_string(),
                confidence: 0.4,
                bbox: BoundingBox {
                    x1: 5.0,
                    y1: 5.0,
                    x2: 15.0,
                    y2: 15.0,
                },
            },
        ]
    }

    fn service(dir: &TempDir, detections: Vec<RawDetection>) -> DetectService {
        let registry = ProgressRegistry::new();
        let lifecycle = Arc::new(ModelLifecycle::new(
            Arc::new(InstantSource {
                dir: dir.path().to_path_buf(),
                registry: registry.clone(),
            }),
            Arc::new(FixedLoader(detections)),
            registry.clone(),
            LifecycleSettings {
                background_threshold_mb: 40,
                poll_interval: Duration::from_millis(10),
                config_path: None,
            },
        ));
        DetectService::new(lifecycle, DetectionConfig::default(), registry)
    }

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(64, 48, image::Rgb([30, 60, 90]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageFormat::Png,
            )
            .unwrap();
        bytes
    }

    #[tokio::test]
    async fn test_large_variant_needs_confirmation() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir, Vec::new());

        let err = service
            .ensure_active(ModelVariant::Xlarge, false, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::ConfirmationRequired(_)));

        // Confirmed path goes through
        let info = service
            .ensure_active(ModelVariant::Xlarge, true, None, None)
            .await
            .unwrap();
        assert_eq!(info.variant, ModelVariant::Xlarge);
    }

    #[tokio::test]
    async fn test_detection_without_model() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir, Vec::new());
        let err = service.run_detection(&png_bytes()).await.unwrap_err();
        assert!(matches!(err, DetectionError::NoActiveModel));
    }

    #[tokio::test]
    async fn test_invalid_image_rejected() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir, Vec::new());
        service
            .ensure_active(ModelVariant::Nano, false, None, None)
            .await
            .unwrap();

        let err = service.run_detection(b"not an image").await.unwrap_err();
        assert!(matches!(err, DetectionError::InvalidImage(_)));
    }

    #[tokio::test]
    async fn test_detection_report_with_colors() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir, sample_detections());
        service
            .ensure_active(ModelVariant::Nano, false, None, None)
            .await
            .unwrap();

        let report = service.run_detection(&png_bytes()).await.unwrap();
        assert_eq!(report.variant, Some(ModelVariant::Nano));
        // Default threshold 0.5 filters out the 0.4 bicycle
        assert_eq!(report.stats.total_objects, 1);
        assert_eq!(report.objects[0].class_name, "person");
        let colors = report.colors.as_ref().unwrap();
        assert!(!colors.is_empty());
    }

    #[tokio::test]
    async fn test_color_section_toggle() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir, sample_detections());
        service
            .ensure_active(ModelVariant::Nano, false, None, None)
            .await
            .unwrap();
        service.update_config("color_analysis", "false").unwrap();

        let report = service.run_detection(&png_bytes()).await.unwrap();
        assert!(report.colors.is_none());
        assert_eq!(report.stats.total_objects, 1);
    }

    #[tokio::test]
    async fn test_config_round_trip_via_status() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir, Vec::new());

        service
            .update_config("confidence_threshold", "0.3")
            .unwrap();
        let status = service.query_status();
        assert!((status.config.confidence_threshold - 0.3).abs() < f32::EPSILON);

        assert!(service.update_config("confidence_threshold", "1.5").is_err());
        let status = service.query_status();
        assert!((status.config.confidence_threshold - 0.3).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_status_reflects_artifact_states() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir, Vec::new());

        let status = service.query_status();
        assert!(status.active_variant.is_none());
        assert!(status.artifacts.is_empty());

        service
            .ensure_active(ModelVariant::Small, false, None, None)
            .await
            .unwrap();
        let status = service.query_status();
        assert_eq!(status.active_variant, Some(ModelVariant::Small));
        assert_eq!(
            status.artifacts,
            vec![(ModelVariant::Small, ArtifactState::Completed)]
        );
    }
}
