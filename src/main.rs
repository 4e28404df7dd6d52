use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use spotter::config::{Config, DetectionConfig};
use spotter::error::{DetectionError, LifecycleError, LoadError, Result, SpotterError};
use spotter::models::fetch::artifacts_data_dir;
use spotter::models::loader::{Detector, LoadMode, ModelLoader};
use spotter::models::{
    ArtifactFetcher, ArtifactState, LifecycleSettings, ModelLifecycle, ModelVariant,
    ProgressRegistry, VARIANTS,
};
use spotter::service::DetectService;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "spotter")]
#[command(about = "Object-detection bot core: manage models and detection settings", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show available variants or switch the active model
    Model {
        /// Variant to switch to (n/s/m/l/x or full name)
        variant: Option<String>,
        /// Confirm a large-variant download
        #[arg(long)]
        yes: bool,
    },
    /// Run object detection on an image file and print the report
    Detect {
        /// Path to the image to analyze
        image: PathBuf,
    },
    /// Show or change detection settings
    Config {
        field: Option<String>,
        value: Option<String>,
    },
    /// Show active model, settings, and download states
    Status,
}

/// Validates the artifact container before handing it to the (external)
/// inference engine. Checkpoint files are zip archives, so strict mode
/// requires the zip magic; relaxed mode accepts any non-empty file.
struct WeightsLoader;

impl ModelLoader for WeightsLoader {
    fn load(
        &self,
        path: &Path,
        mode: LoadMode,
    ) -> std::result::Result<Box<dyn Detector>, LoadError> {
        let mut magic = [0u8; 4];
        let read = std::fs::File::open(path)
            .and_then(|mut f| f.read(&mut magic))
            .map_err(|e| LoadError::Incompatible(format!("cannot read artifact: {e}")))?;

        if read == 0 {
            return Err(LoadError::Incompatible("artifact file is empty".to_string()));
        }
        if mode == LoadMode::Strict && &magic != b"PK\x03\x04" {
            return Err(LoadError::StrictRejected(
                "unrecognized checkpoint container".to_string(),
            ));
        }
        Ok(Box::new(PendingDetector))
    }
}

/// Placeholder handle for builds without an inference engine linked in
struct PendingDetector;

impl Detector for PendingDetector {
    fn detect(
        &self,
        _image: &image::DynamicImage,
        _confidence_threshold: f32,
    ) -> std::result::Result<Vec<spotter::detect::RawDetection>, DetectionError> {
        Err(DetectionError::Inference(
            "no inference engine is linked into this binary; embed spotter as a library and \
             supply a Detector implementation"
                .to_string(),
        ))
    }
}

fn build_service(config: &Config) -> Result<DetectService> {
    let registry = ProgressRegistry::new();
    let fetcher = ArtifactFetcher::new(
        artifacts_data_dir()?,
        config.model.base_url.clone(),
        registry.clone(),
    )?;
    let lifecycle = Arc::new(ModelLifecycle::new(
        Arc::new(fetcher),
        Arc::new(WeightsLoader),
        registry.clone(),
        LifecycleSettings::from_config(config)?,
    ));
    Ok(DetectService::new(
        lifecycle,
        DetectionConfig::from(&config.detection),
        registry,
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let service = build_service(&config)?;

    match cli.command {
        Commands::Model { variant: None, .. } => {
            println!("Current variant: {}", config.model.variant);
            println!("\nAvailable variants:");
            for info in VARIANTS {
                println!(
                    "  {} ({}) - {} MB, {}",
                    info.letter, info.name, info.size_mb, info.description
                );
            }
            Ok(())
        }
        Commands::Model {
            variant: Some(raw),
            yes,
        } => {
            let variant: ModelVariant = raw.parse().map_err(SpotterError::Lifecycle)?;
            switch_model(&service, variant, yes).await
        }
        Commands::Detect { image } => {
            // Load the persisted variant first; it was confirmed when it
            // was switched to, so no second confirmation is needed here
            let variant: ModelVariant = config
                .model
                .variant
                .parse()
                .map_err(SpotterError::Lifecycle)?;
            service.ensure_active(variant, true, None, None).await?;

            let bytes = std::fs::read(&image)?;
            let report = service.run_detection(&bytes).await?;
            println!("{report}");
            Ok(())
        }
        Commands::Config { field: None, .. } => {
            print_config(&service.config_snapshot());
            Ok(())
        }
        Commands::Config {
            field: Some(field),
            value: None,
        } => {
            let config = service.config_snapshot();
            match field.as_str() {
                "confidence_threshold" => println!("{}", config.confidence_threshold),
                "max_objects" => println!("{}", config.max_objects),
                "color_analysis" => println!("{}", config.color_analysis),
                other => {
                    return Err(SpotterError::Config(
                        spotter::error::ConfigError::UnknownField(other.to_string()),
                    ))
                }
            }
            Ok(())
        }
        Commands::Config {
            field: Some(field),
            value: Some(value),
        } => {
            service.update_config(&field, &value)?;
            println!("{field} updated to {value}");
            Ok(())
        }
        Commands::Status => {
            print_status(&service);
            Ok(())
        }
    }
}

async fn switch_model(service: &DetectService, variant: ModelVariant, yes: bool) -> Result<()> {
    println!(
        "Switching to {} model ({} MB)...",
        variant,
        variant.size_mb()
    );

    let (tx, mut rx) = mpsc::channel::<u8>(16);
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{bar:20} {pos}%")
            .map_err(|e| SpotterError::Other(e.to_string()))?,
    );
    let bar_task = tokio::spawn(async move {
        while let Some(percent) = rx.recv().await {
            bar.set_position(u64::from(percent));
        }
        bar.finish_and_clear();
    });

    let result = service.ensure_active(variant, yes, Some(tx), None).await;
    bar_task
        .await
        .map_err(|e| SpotterError::Other(e.to_string()))?;

    match result {
        Ok(info) => {
            println!(
                "Active model is now {} (confidence threshold {})",
                info.variant, info.confidence_threshold
            );
            Ok(())
        }
        Err(LifecycleError::ConfirmationRequired(name)) => {
            println!(
                "The {name} model is a large download. Re-run with --yes to confirm:\n  spotter model {name} --yes"
            );
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn print_config(config: &DetectionConfig) {
    println!("confidence_threshold = {}", config.confidence_threshold);
    println!("max_objects = {}", config.max_objects);
    println!("color_analysis = {}", config.color_analysis);
}

fn print_status(service: &DetectService) {
    let status = service.query_status();
    match status.active_variant {
        Some(variant) => println!("Active model: {variant}"),
        None => println!("Active model: none loaded"),
    }
    println!();
    print_config(&status.config);

    if !status.artifacts.is_empty() {
        println!("\nDownloads:");
        for (variant, state) in status.artifacts {
            match state {
                ArtifactState::Absent => println!("  {variant}: absent"),
                ArtifactState::Downloading(p) => {
                    let filled = usize::from(p / 10);
                    println!("  {variant}: {p}% {}{}", "#".repeat(filled), "-".repeat(10 - filled));
                }
                ArtifactState::Completed => println!("  {variant}: completed"),
                ArtifactState::Failed(reason) => println!("  {variant}: failed ({reason})"),
            }
        }
    }
}
