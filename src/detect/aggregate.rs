use crate::config::DetectionConfig;
use crate::detect::report::{ClassSummary, DetectionReport, ReportStats};
use crate::detect::{BoundingBox, RawDetection};

/// One detection with its derived metrics
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedObject {
    pub class_name: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
    pub width: f32,
    pub height: f32,
    pub area: f32,
    pub region: String,
}

impl DetectedObject {
    fn from_raw(raw: &RawDetection, img_width: u32, img_height: u32) -> Self {
        let width = raw.bbox.width();
        let height = raw.bbox.height();
        let (cx, cy) = raw.bbox.center();
        Self {
            class_name: raw.label.clone(),
            confidence: raw.confidence,
            bbox: raw.bbox,
            width,
            height,
            area: raw.bbox.area(),
            region: region_label(
                cx / img_width as f32,
                cy / img_height as f32,
            ),
        }
    }
}

/// Coarse 3x3 grid label for a detection center given as image fractions.
///
/// Boundaries are strict: exactly 0.33 or 0.66 falls into the middle band.
fn region_label(x_frac: f32, y_frac: f32) -> String {
    let vertical = if y_frac < 0.33 {
        "top"
    } else if y_frac > 0.66 {
        "bottom"
    } else {
        "middle"
    };
    let horizontal = if x_frac < 0.33 {
        "left"
    } else if x_frac > 0.66 {
        "right"
    } else {
        "center"
    };
    format!("{vertical} {horizontal}")
}

/// Turn raw detections into a structured report.
///
/// The detail list is sorted by area descending (stable, so equal areas keep
/// their original detection order) and truncated to `config.max_objects`;
/// the class summary and statistics always cover every detection.
#[must_use]
pub fn aggregate(
    raw: &[RawDetection],
    img_width: u32,
    img_height: u32,
    config: &DetectionConfig,
) -> DetectionReport {
    let objects: Vec<DetectedObject> = raw
        .iter()
        .map(|r| DetectedObject::from_raw(r, img_width, img_height))
        .collect();

    // Class summary in first-appearance order
    let mut classes: Vec<ClassSummary> = Vec::new();
    for obj in &objects {
        match classes.iter_mut().find(|c| c.class_name == obj.class_name) {
            Some(entry) => {
                entry.count += 1;
                entry.avg_confidence += obj.confidence;
            }
            None => classes.push(ClassSummary {
                class_name: obj.class_name.clone(),
                count: 1,
                avg_confidence: obj.confidence,
            }),
        }
    }
    for entry in &mut classes {
        entry.avg_confidence /= entry.count as f32;
    }

    // First-encountered wins ties for both superlatives
    let top_confidence = objects
        .iter()
        .enumerate()
        .max_by(|(ia, a), (ib, b)| {
            a.confidence
                .total_cmp(&b.confidence)
                .then(ib.cmp(ia))
        })
        .map(|(_, obj)| obj.clone());
    let largest = objects
        .iter()
        .enumerate()
        .max_by(|(ia, a), (ib, b)| a.area.total_cmp(&b.area).then(ib.cmp(ia)))
        .map(|(_, obj)| obj.clone());

    let stats = ReportStats {
        total_objects: objects.len(),
        distinct_classes: classes.len(),
        top_confidence,
        largest,
    };

    let mut ranked = objects;
    ranked.sort_by(|a, b| b.area.total_cmp(&a.area));
    ranked.truncate(config.max_objects);

    DetectionReport {
        variant: None,
        confidence_threshold: config.confidence_threshold,
        classes,
        objects: ranked,
        stats,
        colors: None,
        generated_at: chrono::Local::now(),
    }
}
