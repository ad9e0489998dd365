use crate::config::AnalysisConfig;
use crate::layout::{cluster_lines, segment_intervals, Interval, IntervalSource};
use crate::metrics::{compute_metrics, MetricsResult};
use crate::normalize::NormalizedImage;
use crate::region::{locate_region, validate_region, Region, ValidationReport};
use crate::strokes::{detect_strokes, Mark, Provenance, Stroke};

use super::DetectionSet;

/// Full record of one sheet analysis.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SheetAnalysis {
    /// Normalized page dimensions `[width, height]`.
    pub image_size: [u32; 2],
    pub region: Region,
    /// Diagnostic re-score of the region, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationReport>,
    pub strokes: Vec<Stroke>,
    pub marks: Vec<Mark>,
    pub line_count: usize,
    pub interval_source: IntervalSource,
    pub provenance: Provenance,
    pub metrics: MetricsResult,
    /// Physical scale supplied with the sheet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_mm_per_px: Option<f64>,
}

impl SheetAnalysis {
    /// Editable detections for manual correction and overlay rendering.
    pub fn detection_set(&self) -> DetectionSet {
        DetectionSet {
            image_size: self.image_size,
            region: self.region.clone(),
            strokes: self.strokes.clone(),
            marks: self.marks.clone(),
            scale_mm_per_px: self.scale_mm_per_px,
            provenance: self.provenance.clone(),
        }
    }
}

/// Output of the stages that run after detection.
pub(super) struct Aggregation {
    pub line_count: usize,
    pub interval_source: IntervalSource,
    pub metrics: MetricsResult,
}

/// Cluster, segment and score a stroke/mark set.
pub(super) fn aggregate(
    strokes: &[Stroke],
    marks: &[Mark],
    page_height: u32,
    confidence: f64,
    provenance: &Provenance,
    scale_mm_per_px: Option<f64>,
    cfg: &AnalysisConfig,
) -> Aggregation {
    let lines = cluster_lines(strokes, page_height, &cfg.lines);
    let intervals = segment_intervals(&lines, marks, &cfg.intervals);
    debug_assert_eq!(intervals.iter().map(Interval::len).sum::<usize>(), strokes.len());

    let scale = scale_mm_per_px.unwrap_or(cfg.metrics.default_mm_per_px);
    let metrics = compute_metrics(&intervals, confidence, provenance, Some(scale), &cfg.metrics);
    Aggregation {
        line_count: lines.len(),
        interval_source: IntervalSource::for_marks(marks),
        metrics,
    }
}

/// Run region location, stroke detection and aggregation on a normalized page.
pub fn analyze_normalized(
    image: &NormalizedImage,
    scale_mm_per_px: Option<f64>,
    cfg: &AnalysisConfig,
) -> SheetAnalysis {
    let region = locate_region(image, &cfg.region);
    let validation = cfg
        .run_validator
        .then(|| validate_region(&image.gray, &region, &cfg.validator));
    let detection = detect_strokes(&image.mask, &image.gray, &region, cfg.relaxed, &cfg.strokes);
    let agg = aggregate(
        &detection.strokes,
        &detection.marks,
        image.height(),
        region.confidence,
        &detection.provenance,
        scale_mm_per_px,
        cfg,
    );
    SheetAnalysis {
        image_size: [image.width(), image.height()],
        region,
        validation,
        strokes: detection.strokes,
        marks: detection.marks,
        line_count: agg.line_count,
        interval_source: agg.interval_source,
        provenance: detection.provenance,
        metrics: agg.metrics,
        scale_mm_per_px,
    }
}
