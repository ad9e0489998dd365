//! Stroke layout: grouping into writing lines and partitioning into the
//! five timed intervals.

mod intervals;
mod lines;

pub use intervals::{segment_intervals, Interval, IntervalConfig, IntervalSource, INTERVAL_COUNT};
pub use lines::{cluster_lines, Line, LineClusterConfig};
