use crate::config::schema::{config_path, Config};
use crate::error::LifecycleError;
use crate::models::fetch::{artifact_present, ArtifactSource};
use crate::models::loader::{load_with_fallback, Detector, ModelLoader};
use crate::models::progress::{ArtifactState, ProgressRegistry};
use crate::models::variants::ModelVariant;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// The currently loaded, ready-to-invoke detection handle.
///
/// Readers clone the `Arc` and keep using whatever model was current at call
/// time; a swap never tears down a handle mid-detection.
pub struct ActiveModel {
    pub variant: ModelVariant,
    pub detector: Box<dyn Detector>,
}

impl std::fmt::Debug for ActiveModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveModel")
            .field("variant", &self.variant)
            .finish_non_exhaustive()
    }
}

/// Lifecycle tuning, normally derived from the config file
#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    /// Artifacts at or above this size fetch on a background worker
    pub background_threshold_mb: u64,
    /// Foreground progress poll interval
    pub poll_interval: Duration,
    /// Config file receiving the persisted current variant, if any
    pub config_path: Option<PathBuf>,
}

impl LifecycleSettings {
    pub fn from_config(config: &Config) -> crate::error::Result<Self> {
        Ok(Self {
            background_threshold_mb: config.model.background_threshold_mb,
            poll_interval: Duration::from_secs(config.model.poll_interval_secs),
            config_path: Some(config_path()?),
        })
    }
}

/// Orchestrates "ensure artifact present, load, swap into the active slot".
///
/// The artifact source and loader are injected so the whole flow is testable
/// without a network or an inference runtime.
pub struct ModelLifecycle {
    source: Arc<dyn ArtifactSource>,
    loader: Arc<dyn ModelLoader>,
    registry: ProgressRegistry,
    active: RwLock<Option<Arc<ActiveModel>>>,
    // Serializes the fetch phase so concurrent requests for the same
    // not-yet-present variant share one transfer
    fetch_lock: tokio::sync::Mutex<()>,
    settings: LifecycleSettings,
}

impl ModelLifecycle {
    pub fn new(
        source: Arc<dyn ArtifactSource>,
        loader: Arc<dyn ModelLoader>,
        registry: ProgressRegistry,
        settings: LifecycleSettings,
    ) -> Self {
        Self {
            source,
            loader,
            registry,
            active: RwLock::new(None),
            fetch_lock: tokio::sync::Mutex::new(()),
            settings,
        }
    }

    /// Current active model, if one has been loaded
    #[must_use]
    pub fn active(&self) -> Option<Arc<ActiveModel>> {
        self.active
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    #[must_use]
    pub fn active_variant(&self) -> Option<ModelVariant> {
        self.active().map(|m| m.variant)
    }

    /// Ensure `variant` is downloaded and loaded, then make it the active
    /// model.
    ///
    /// Percent deltas are forwarded into `sink` while a background transfer
    /// runs; `max_wait` bounds only that notification window, never the
    /// transfer itself. Idempotent once the artifact is on disk: no transfer
    /// happens on a repeat call.
    pub async fn ensure_active(
        &self,
        variant: ModelVariant,
        sink: Option<mpsc::Sender<u8>>,
        max_wait: Option<Duration>,
    ) -> Result<Arc<ActiveModel>, LifecycleError> {
        let path = self.source.artifact_path(variant);

        if !artifact_present(&path) {
            let _guard = self.fetch_lock.lock().await;
            // A caller we queued behind may have finished this transfer
            if !artifact_present(&path) {
                if variant.size_mb() >= self.settings.background_threshold_mb {
                    self.fetch_in_background(variant, sink, max_wait).await?;
                } else {
                    self.source
                        .fetch(variant)
                        .await
                        .map_err(|e| LifecycleError::DownloadFailed(e.to_string()))?;
                }
            }
        }

        tracing::info!("Loading {} model from {}", variant, path.display());
        let detector = load_with_fallback(self.loader.as_ref(), &path)
            .map_err(|e| LifecycleError::LoadFailed(e.to_string()))?;

        let model = Arc::new(ActiveModel { variant, detector });
        // Single-writer atomic swap; in-flight detections keep their old Arc
        *self.active.write().unwrap_or_else(|e| e.into_inner()) = Some(Arc::clone(&model));

        self.persist_variant(variant);
        tracing::info!("Active model is now {}", variant);
        Ok(model)
    }

    /// Run the transfer on a worker task while this caller polls the
    /// registry, so a multi-minute download never stalls the command loop.
    async fn fetch_in_background(
        &self,
        variant: ModelVariant,
        sink: Option<mpsc::Sender<u8>>,
        max_wait: Option<Duration>,
    ) -> Result<(), LifecycleError> {
        let source = Arc::clone(&self.source);
        let handle = tokio::spawn(async move { source.fetch(variant).await });

        if let Some(sink) = sink {
            let deadline = max_wait.map(|d| Instant::now() + d);
            let mut interval = tokio::time::interval(self.settings.poll_interval);
            let mut last_sent: Option<u8> = None;

            loop {
                interval.tick().await;
                // The worker writes a terminal state before returning, so a
                // finished handle with a non-terminal state means it panicked
                let finished = handle.is_finished();
                match self.registry.get(variant) {
                    ArtifactState::Downloading(percent) => {
                        if last_sent != Some(percent) {
                            let _ = sink.send(percent).await;
                            last_sent = Some(percent);
                        }
                        if finished {
                            break;
                        }
                    }
                    ArtifactState::Completed => {
                        if last_sent != Some(100) {
                            let _ = sink.send(100).await;
                        }
                        break;
                    }
                    ArtifactState::Failed(_) => break,
                    // Worker may not have started the transfer yet
                    ArtifactState::Absent => {
                        if finished {
                            break;
                        }
                    }
                }
                if let Some(deadline) = deadline {
                    if Instant::now() >= deadline {
                        tracing::debug!(
                            "Progress notification window for {} elapsed, waiting silently",
                            variant
                        );
                        break;
                    }
                }
            }
        }

        // Join-equivalent: reap the worker's own completion signal. The
        // transfer keeps running to completion or failure regardless of how
        // long anyone watched it.
        match handle.await {
            Ok(Ok(_path)) => Ok(()),
            Ok(Err(e)) => Err(LifecycleError::DownloadFailed(e.to_string())),
            Err(join_err) => Err(LifecycleError::DownloadFailed(format!(
                "fetch worker panicked: {join_err}"
            ))),
        }
    }

    /// Persist the current variant so the next start loads the same model.
    /// The swap already happened, so a write failure only warns.
    fn persist_variant(&self, variant: ModelVariant) {
        let Some(path) = self.settings.config_path.as_ref() else {
            return;
        };
        let result = Config::load_from(path).and_then(|mut config| {
            config.model.variant = variant.name().to_string();
            config.save_to(path)
        });
        if let Err(e) = result {
            tracing::warn!("Failed to persist current variant: {e}");
        }
    }
}
