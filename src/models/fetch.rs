use crate::error::FetchError;
use crate::models::progress::{ArtifactState, ProgressRegistry};
use crate::models::variants::ModelVariant;
use async_trait::async_trait;
use futures_util::StreamExt;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Where model artifacts come from and where they land on disk.
///
/// The lifecycle manager only talks to this trait, so tests can script
/// transfers without a network.
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Deterministic local path for a variant's artifact
    fn artifact_path(&self, variant: ModelVariant) -> PathBuf;

    /// Transfer the artifact to its local path, reporting progress into the
    /// registry. Returns the final path on success.
    async fn fetch(&self, variant: ModelVariant) -> Result<PathBuf, FetchError>;
}

/// HTTPS artifact downloader with coarse progress reporting
pub struct ArtifactFetcher {
    client: reqwest::Client,
    artifacts_dir: PathBuf,
    base_url: String,
    registry: ProgressRegistry,
}

impl ArtifactFetcher {
    pub fn new(
        artifacts_dir: impl Into<PathBuf>,
        base_url: impl Into<String>,
        registry: ProgressRegistry,
    ) -> Result<Self, FetchError> {
        let artifacts_dir = artifacts_dir.into();
        fs::create_dir_all(&artifacts_dir)
            .map_err(|e| FetchError::Disk(format!("cannot create artifacts dir: {e}")))?;

        Ok(Self {
            client: reqwest::Client::new(),
            artifacts_dir,
            base_url: base_url.into(),
            registry,
        })
    }

    /// Source URL for a variant, built from the release base URL
    #[must_use]
    pub fn artifact_url(&self, variant: ModelVariant) -> String {
        format!(
            "{}/yolov8{}.pt",
            self.base_url.trim_end_matches('/'),
            variant.letter()
        )
    }

    async fn transfer(&self, variant: ModelVariant) -> Result<PathBuf, FetchError> {
        let url = self.artifact_url(variant);
        tracing::info!(
            "Downloading {} model ({} MB) from {url}",
            variant,
            variant.size_mb()
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?
            .error_for_status()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let total_bytes = response.content_length().filter(|t| *t > 0);
        let final_path = self.artifact_path(variant);
        // Fresh create truncates any partial file a failed attempt left behind
        let tmp_path = final_path.with_extension("part");
        let mut file = tokio::fs::File::create(&tmp_path)
            .await
            .map_err(|e| FetchError::Disk(e.to_string()))?;

        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;
        let mut last_bucket: u8 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| FetchError::Network(e.to_string()))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| FetchError::Disk(e.to_string()))?;
            downloaded += chunk.len() as u64;

            // Write the registry on 10% boundaries only, not per chunk
            if let Some(total) = total_bytes {
                let percent = ((downloaded * 100) / total).min(100) as u8;
                let bucket = percent / 10 * 10;
                if bucket > last_bucket {
                    self.registry
                        .set(variant, ArtifactState::Downloading(bucket));
                    last_bucket = bucket;
                }
            }
        }

        file.flush()
            .await
            .map_err(|e| FetchError::Disk(e.to_string()))?;
        drop(file);

        tokio::fs::rename(&tmp_path, &final_path)
            .await
            .map_err(|e| FetchError::Disk(e.to_string()))?;

        tracing::info!(
            "Downloaded {} model successfully ({} bytes)",
            variant,
            downloaded
        );
        Ok(final_path)
    }
}

#[async_trait]
impl ArtifactSource for ArtifactFetcher {
    fn artifact_path(&self, variant: ModelVariant) -> PathBuf {
        self.artifacts_dir.join(format!("model-{variant}.pt"))
    }

    async fn fetch(&self, variant: ModelVariant) -> Result<PathBuf, FetchError> {
        self.registry.set(variant, ArtifactState::Downloading(0));

        match self.transfer(variant).await {
            Ok(path) => {
                self.registry.set(variant, ArtifactState::Completed);
                Ok(path)
            }
            Err(e) => {
                tracing::error!("Download of {} model failed: {e}", variant);
                self.registry
                    .set(variant, ArtifactState::Failed(e.to_string()));
                Err(e)
            }
        }
    }
}

/// Resolve the default artifacts directory under the user data dir
pub fn artifacts_data_dir() -> Result<PathBuf, FetchError> {
    let dir = dirs::data_dir()
        .ok_or_else(|| FetchError::Disk("cannot determine data directory".to_string()))?
        .join("spotter")
        .join("models");
    Ok(dir)
}

/// Existence check only; the release host publishes no content hashes
#[must_use]
pub fn artifact_present(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_artifact_url_per_variant() {
        let dir = TempDir::new().unwrap();
        let fetcher = ArtifactFetcher::new(
            dir.path(),
            "https://example.com/releases/v1/",
            ProgressRegistry::new(),
        )
        .unwrap();

        assert_eq!(
            fetcher.artifact_url(ModelVariant::Nano),
            "https://example.com/releases/v1/yolov8n.pt"
        );
        assert_eq!(
            fetcher.artifact_url(ModelVariant::Xlarge),
            "https://example.com/releases/v1/yolov8x.pt"
        );
    }

    #[test]
    fn test_artifact_path_is_deterministic() {
        let dir = TempDir::new().unwrap();
        let fetcher = ArtifactFetcher::new(
            dir.path(),
            "https://example.com",
            ProgressRegistry::new(),
        )
        .unwrap();

        let path = fetcher.artifact_path(ModelVariant::Small);
        assert_eq!(path, dir.path().join("model-small.pt"));
        assert!(!artifact_present(&path));

        std::fs::write(&path, b"weights").unwrap();
        assert!(artifact_present(&path));
    }

    #[test]
    fn test_new_creates_artifacts_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("deep").join("models");
        let _fetcher =
            ArtifactFetcher::new(&nested, "https://example.com", ProgressRegistry::new()).unwrap();
        assert!(nested.is_dir());
    }
}
