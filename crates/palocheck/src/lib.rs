//! palocheck: stroke-rhythm metrics from scanned palographic test sheets.
//!
//! A test sheet holds five timed rows of short vertical strokes ("palos"),
//! optionally separated by delimiter marks. The pipeline stages are:
//!
//! 1. **Normalize** – page flattening, luminance balancing, binary ink mask.
//! 2. **Region** – work-area location below the ruled separator, with a
//!    confidence score; an independent validator re-scores it for audits.
//! 3. **Strokes** – blob extraction inside the region, stroke/mark
//!    classification and per-stroke features.
//! 4. **Layout** – greedy line clustering and segmentation into five
//!    intervals.
//! 5. **Metrics** – rhythm statistics behind a hard confidence gate.
//!
//! # Public API
//! - [`Analyzer`] as the primary entry point
//! - [`AnalysisConfig`] for tuning every threshold
//! - [`SheetAnalysis`] and [`DetectionSet`] as run outputs; the latter can
//!   be edited and recomputed without the image
//! - the stage functions ([`normalize()`], [`locate_region`],
//!   [`validate_region`], [`detect_strokes`], [`cluster_lines`],
//!   [`segment_intervals`], [`compute_metrics`]) for callers that drive the
//!   stages themselves

mod api;
mod config;
mod error;
mod imaging;
pub mod layout;
pub mod metrics;
pub mod normalize;
mod pipeline;
pub mod region;
pub mod strokes;

#[cfg(test)]
pub(crate) mod test_utils;

pub use api::Analyzer;
pub use config::AnalysisConfig;
pub use error::{AnalysisError, FinalizeError, ImageDecodeError};
pub use imaging::{ClaheParams, RectKernel};
pub use layout::{
    cluster_lines, segment_intervals, Interval, IntervalConfig, IntervalSource, Line,
    LineClusterConfig, INTERVAL_COUNT,
};
pub use metrics::{
    compute_metrics, ensure_finalizable, ConfidenceLevel, MetricsConfig, MetricsResult,
    MetricsStatus, ReasonCode, StrokeStats, Trend,
};
pub use normalize::{normalize, normalize_image, NormalizeConfig, NormalizedImage};
pub use pipeline::{analyze_normalized, DetectionSet, SheetAnalysis};
pub use region::{
    locate_region, validate_region, Region, RegionConfig, RegionSource, SeparatorConfig,
    ValidationReport, ValidatorConfig,
};
pub use strokes::{
    detect_strokes, BBox, DiscardReason, HookSide, Hooks, Mark, Provenance, Stroke, StrokeConfig,
    StrokeDetection,
};
