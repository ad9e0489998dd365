//! Aggregated analyzer configuration.

use std::path::Path;

use crate::error::AnalysisError;
use crate::layout::{IntervalConfig, LineClusterConfig};
use crate::metrics::MetricsConfig;
use crate::normalize::NormalizeConfig;
use crate::region::{RegionConfig, ValidatorConfig};
use crate::strokes::StrokeConfig;

/// Every tunable threshold of a sheet analysis.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub normalize: NormalizeConfig,
    pub region: RegionConfig,
    pub validator: ValidatorConfig,
    pub strokes: StrokeConfig,
    pub lines: LineClusterConfig,
    pub intervals: IntervalConfig,
    pub metrics: MetricsConfig,
    /// Accept stubbier strokes on degraded scans.
    pub relaxed: bool,
    /// Attach the diagnostic region validation report to each analysis.
    pub run_validator: bool,
}

impl AnalysisConfig {
    /// Load a (possibly partial) configuration from JSON.
    pub fn from_json_file(path: &Path) -> Result<Self, AnalysisError> {
        let data = std::fs::read_to_string(path).map_err(|source| AnalysisError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&data)?)
    }

    pub fn to_json_string(&self) -> Result<String, AnalysisError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
