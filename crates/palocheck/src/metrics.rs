//! Rhythm and variability statistics behind a hard confidence gate.
//!
//! No numeric field of a [`MetricsResult`] is populated unless the region
//! confidence passes the gate and the interval structure is intact. `None`
//! is the not-available value and serializes as `null`.

use crate::error::FinalizeError;
use crate::layout::{Interval, INTERVAL_COUNT};
use crate::strokes::{Provenance, Stroke};

/// Gate and reporting thresholds.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Region confidence below this sends the run to review.
    pub min_confidence: f64,
    /// Last count above `first * trend_up` is ascending.
    pub trend_up: f64,
    /// Last count below `first * trend_down` is descending.
    pub trend_down: f64,
    /// Confidence above this is reported as high.
    pub high_confidence: f64,
    /// Scale assumed when none was recorded (300 DPI).
    pub default_mm_per_px: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.7,
            trend_up: 1.1,
            trend_down: 0.9,
            high_confidence: 0.75,
            default_mm_per_px: 25.4 / 300.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricsStatus {
    Success,
    NeedsReview,
}

/// Why a run was sent to review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    LowConfidenceRoi,
    SegmentationFailure,
}

impl ReasonCode {
    pub const fn code(self) -> &'static str {
        match self {
            Self::LowConfidenceRoi => "LOW_CONFIDENCE_ROI",
            Self::SegmentationFailure => "SEGMENTATION_FAILURE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Ascending,
    Descending,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    High,
    Low,
}

/// Mean per-stroke features over every retained stroke.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StrokeStats {
    pub mean_pressure: f64,
    pub mean_slant_deg: f64,
    pub mean_height_px: f64,
    pub mean_height_mm: Option<f64>,
}

/// Gated metrics record for one sheet.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MetricsResult {
    pub status: MetricsStatus,
    pub reason_code: Option<ReasonCode>,
    /// Region confidence the gate was evaluated on.
    pub confidence_score: f64,
    pub confidence_level: ConfidenceLevel,
    pub total: Option<usize>,
    pub interval_counts: Option<Vec<usize>>,
    /// Mean count per interval.
    pub mean: Option<f64>,
    /// Rhythm-oscillation index: `100 * sum |c[i+1] - c[i]| / total`.
    pub nor: Option<f64>,
    /// Coefficient of variation of the counts, in percent.
    pub cv: Option<f64>,
    pub trend: Option<Trend>,
    pub stroke_stats: Option<StrokeStats>,
    pub provenance: Provenance,
}

impl MetricsResult {
    pub fn is_success(&self) -> bool {
        self.status == MetricsStatus::Success
    }

    fn needs_review(reason: ReasonCode, confidence: f64, provenance: &Provenance) -> Self {
        Self {
            status: MetricsStatus::NeedsReview,
            reason_code: Some(reason),
            confidence_score: confidence,
            confidence_level: ConfidenceLevel::Low,
            total: None,
            interval_counts: None,
            mean: None,
            nor: None,
            cv: None,
            trend: None,
            stroke_stats: None,
            provenance: provenance.clone(),
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Rhythm-oscillation index of interval counts (0 for an empty sheet).
pub fn nor(counts: &[usize]) -> f64 {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let diffs: usize = counts.windows(2).map(|w| w[0].abs_diff(w[1])).sum();
    100.0 * diffs as f64 / total as f64
}

/// Population coefficient of variation in percent (0 when the mean is 0).
pub fn coefficient_of_variation(counts: &[usize]) -> f64 {
    if counts.is_empty() {
        return 0.0;
    }
    let n = counts.len() as f64;
    let mean = counts.iter().sum::<usize>() as f64 / n;
    if mean <= 0.0 {
        return 0.0;
    }
    let var = counts
        .iter()
        .map(|&c| (c as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    100.0 * var.sqrt() / mean
}

pub fn trend(counts: &[usize], cfg: &MetricsConfig) -> Trend {
    let (Some(&first), Some(&last)) = (counts.first(), counts.last()) else {
        return Trend::Stable;
    };
    let (first, last) = (first as f64, last as f64);
    if last > first * cfg.trend_up {
        Trend::Ascending
    } else if last < first * cfg.trend_down {
        Trend::Descending
    } else {
        Trend::Stable
    }
}

fn mean_of(strokes: &[&Stroke], f: impl Fn(&Stroke) -> f64) -> f64 {
    strokes.iter().map(|s| f(*s)).sum::<f64>() / strokes.len() as f64
}

fn stroke_stats(intervals: &[Interval], scale_mm_per_px: Option<f64>) -> Option<StrokeStats> {
    let strokes: Vec<_> = intervals.iter().flat_map(|i| i.strokes.iter()).collect();
    if strokes.is_empty() {
        return None;
    }
    let mean_height_px = mean_of(&strokes, |s| s.height);
    Some(StrokeStats {
        mean_pressure: round2(mean_of(&strokes, |s| s.pressure)),
        mean_slant_deg: (mean_of(&strokes, |s| s.angle_deg) * 10.0).round() / 10.0,
        mean_height_px: round2(mean_height_px),
        mean_height_mm: scale_mm_per_px.map(|k| round2(mean_height_px * k)),
    })
}

/// Apply the confidence gate, then aggregate interval counts.
pub fn compute_metrics(
    intervals: &[Interval],
    confidence: f64,
    provenance: &Provenance,
    scale_mm_per_px: Option<f64>,
    cfg: &MetricsConfig,
) -> MetricsResult {
    if confidence < cfg.min_confidence {
        tracing::warn!(confidence, "region confidence below gate; results need review");
        return MetricsResult::needs_review(ReasonCode::LowConfidenceRoi, confidence, provenance);
    }
    if intervals.len() != INTERVAL_COUNT {
        tracing::warn!(intervals = intervals.len(), "interval structure is malformed");
        return MetricsResult::needs_review(
            ReasonCode::SegmentationFailure,
            confidence,
            provenance,
        );
    }

    let counts: Vec<usize> = intervals.iter().map(Interval::len).collect();
    let total: usize = counts.iter().sum();
    let mean = total as f64 / counts.len() as f64;
    let result = MetricsResult {
        status: MetricsStatus::Success,
        reason_code: None,
        confidence_score: confidence,
        confidence_level: if confidence > cfg.high_confidence {
            ConfidenceLevel::High
        } else {
            ConfidenceLevel::Low
        },
        total: Some(total),
        mean: Some(round2(mean)),
        nor: Some(round2(nor(&counts))),
        cv: Some(round2(coefficient_of_variation(&counts))),
        trend: Some(trend(&counts, cfg)),
        stroke_stats: stroke_stats(intervals, scale_mm_per_px),
        interval_counts: Some(counts),
        provenance: provenance.clone(),
    };
    tracing::info!(
        total,
        nor = result.nor,
        cv = result.cv,
        trend = ?result.trend,
        "metrics computed"
    );
    result
}

/// Reject report finalization unless the metrics are usable and reviewed.
pub fn ensure_finalizable(metrics: &MetricsResult, reviewed: bool) -> Result<(), FinalizeError> {
    if metrics.status == MetricsStatus::NeedsReview {
        return Err(FinalizeError::NeedsReview {
            reason: metrics.reason_code,
        });
    }
    if metrics.total.is_none() {
        return Err(FinalizeError::MetricsUnavailable);
    }
    if !reviewed {
        return Err(FinalizeError::NotReviewed);
    }
    Ok(())
}
