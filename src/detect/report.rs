use crate::detect::aggregate::DetectedObject;
use crate::detect::color::ColorBucket;
use crate::models::variants::ModelVariant;
use chrono::{DateTime, Local};
use std::fmt;

/// Per-class rollup covering every detection, unaffected by the detail cap
#[derive(Debug, Clone, PartialEq)]
pub struct ClassSummary {
    pub class_name: String,
    pub count: usize,
    pub avg_confidence: f32,
}

/// Cross-object statistics
#[derive(Debug, Clone, PartialEq)]
pub struct ReportStats {
    pub total_objects: usize,
    pub distinct_classes: usize,
    pub top_confidence: Option<DetectedObject>,
    pub largest: Option<DetectedObject>,
}

/// Structured result of one detection pass, handed to the command surface
/// for delivery. Immutable once built; `Display` renders the chat text.
#[derive(Debug, Clone)]
pub struct DetectionReport {
    pub variant: Option<ModelVariant>,
    pub confidence_threshold: f32,
    pub classes: Vec<ClassSummary>,
    pub objects: Vec<DetectedObject>,
    pub stats: ReportStats,
    pub colors: Option<Vec<ColorBucket>>,
    pub generated_at: DateTime<Local>,
}

impl fmt::Display for DetectionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.variant {
            Some(variant) => writeln!(
                f,
                "**Analysis with yolov8{} (conf: {}):**",
                variant.letter(),
                self.confidence_threshold
            )?,
            None => writeln!(f, "**Analysis (conf: {}):**", self.confidence_threshold)?,
        }

        writeln!(f, "\n**Detected Objects:**")?;
        if self.classes.is_empty() {
            writeln!(f, "- none")?;
        }
        for class in &self.classes {
            writeln!(
                f,
                "- {}: {} (average confidence: {:.2}%)",
                class.class_name,
                class.count,
                class.avg_confidence * 100.0
            )?;
        }

        if !self.objects.is_empty() {
            writeln!(f, "\n**Object Details:**")?;
            for (i, obj) in self.objects.iter().enumerate() {
                writeln!(
                    f,
                    "{}. {}: confidence {:.2}%, size {:.1}x{:.1} px, {}",
                    i + 1,
                    obj.class_name,
                    obj.confidence * 100.0,
                    obj.width,
                    obj.height,
                    obj.region
                )?;
            }
        }

        writeln!(f, "\n**Statistics:**")?;
        writeln!(f, "- Total objects: {}", self.stats.total_objects)?;
        writeln!(f, "- Distinct classes: {}", self.stats.distinct_classes)?;
        if let Some(top) = &self.stats.top_confidence {
            writeln!(
                f,
                "- Highest confidence: {} ({:.2}%)",
                top.class_name,
                top.confidence * 100.0
            )?;
        }
        if let Some(largest) = &self.stats.largest {
            writeln!(
                f,
                "- Largest object: {} ({:.1}x{:.1} px)",
                largest.class_name, largest.width, largest.height
            )?;
        }

        if let Some(colors) = &self.colors {
            writeln!(f, "\n**Dominant Colors:**")?;
            for (i, color) in colors.iter().enumerate() {
                writeln!(f, "{}. {} ({:.1}%)", i + 1, color.hex, color.percentage)?;
            }
        }

        write!(
            f,
            "\n*Processed at: {}*",
            self.generated_at.format("%Y-%m-%d %H:%M:%S")
        )
    }
}
