//! Sheet analysis pipeline.
//!
//! This module is the glue layer that wires the stages together:
//! normalize -> locate region -> (validate) -> detect strokes -> cluster
//! lines -> segment intervals -> gated metrics.
//!
//! Algorithmic stages live in `crate::normalize`, `crate::region`,
//! `crate::strokes`, `crate::layout` and `crate::metrics`. Every run owns its
//! buffers and counters; nothing is cached between calls.
//!
//! Entry points:
//! - `analyze_normalized`: full run over an already normalized page
//! - `DetectionSet::recompute`: re-run of the aggregation stages on an
//!   edited stroke/mark set (never re-normalizes)

mod detections;
mod run;

pub use detections::DetectionSet;
pub use run::{analyze_normalized, SheetAnalysis};
