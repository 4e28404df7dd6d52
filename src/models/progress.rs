use crate::models::variants::ModelVariant;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Download state of a model artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactState {
    /// Never fetched (or no entry yet)
    Absent,
    /// Transfer in progress, percent in 0..=100
    Downloading(u8),
    Completed,
    Failed(String),
}

/// Process-wide map from variant to download state.
///
/// Written by background fetch workers, read by foreground pollers. Writes
/// are last-writer-wins; exactly one fetcher owns a variant's entry during
/// its transfer, so no compare-and-swap is needed. Critical sections are a
/// single map operation, so a plain mutex is fine on both sides.
#[derive(Debug, Clone, Default)]
pub struct ProgressRegistry {
    inner: Arc<Mutex<HashMap<ModelVariant, ArtifactState>>>,
}

impl ProgressRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the state for a variant unconditionally
    pub fn set(&self, variant: ModelVariant, state: ArtifactState) {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.insert(variant, state);
    }

    /// Latest state for a variant, `Absent` if never fetched
    #[must_use]
    pub fn get(&self, variant: ModelVariant) -> ArtifactState {
        let map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.get(&variant).cloned().unwrap_or(ArtifactState::Absent)
    }

    /// Snapshot of every known entry, in variant order
    #[must_use]
    pub fn snapshot(&self) -> Vec<(ModelVariant, ArtifactState)> {
        let map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries: Vec<_> = map.iter().map(|(v, s)| (*v, s.clone())).collect();
        entries.sort_by_key(|(v, _)| *v);
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_by_default() {
        let registry = ProgressRegistry::new();
        assert_eq!(registry.get(ModelVariant::Nano), ArtifactState::Absent);
        assert!(registry.snapshot().is_empty());
    }

    #[test]
    fn test_last_writer_wins() {
        let registry = ProgressRegistry::new();
        registry.set(ModelVariant::Small, ArtifactState::Downloading(10));
        registry.set(ModelVariant::Small, ArtifactState::Downloading(40));
        registry.set(ModelVariant::Small, ArtifactState::Completed);
        assert_eq!(registry.get(ModelVariant::Small), ArtifactState::Completed);
    }

    #[test]
    fn test_entries_are_per_variant() {
        let registry = ProgressRegistry::new();
        registry.set(ModelVariant::Small, ArtifactState::Completed);
        registry.set(
            ModelVariant::Large,
            ArtifactState::Failed("timeout".to_string()),
        );
        assert_eq!(registry.get(ModelVariant::Small), ArtifactState::Completed);
        assert_eq!(
            registry.get(ModelVariant::Large),
            ArtifactState::Failed("timeout".to_string())
        );
        assert_eq!(registry.get(ModelVariant::Nano), ArtifactState::Absent);
        assert_eq!(registry.snapshot().len(), 2);
    }

    #[test]
    fn test_shared_across_clones() {
        let registry = ProgressRegistry::new();
        let clone = registry.clone();
        clone.set(ModelVariant::Medium, ArtifactState::Downloading(70));
        assert_eq!(
            registry.get(ModelVariant::Medium),
            ArtifactState::Downloading(70)
        );
    }
}
