pub mod fetch;
pub mod lifecycle;
pub mod loader;
pub mod progress;
pub mod variants;

pub use fetch::{ArtifactFetcher, ArtifactSource};
pub use lifecycle::{ActiveModel, LifecycleSettings, ModelLifecycle};
pub use loader::{Detector, LoadMode, ModelLoader};
pub use progress::{ArtifactState, ProgressRegistry};
pub use variants::{ModelVariant, VariantInfo, VARIANTS};
