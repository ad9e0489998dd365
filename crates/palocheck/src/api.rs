//! High-level analysis API.
//!
//! [`Analyzer`] is the primary entry point for scoring test sheets.
//! It wraps an [`AnalysisConfig`] and provides convenience methods for
//! common inputs (encoded bytes, a file path, a decoded image, an edited
//! detection set).

use image::DynamicImage;
use std::path::Path;

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, ImageDecodeError};
use crate::normalize::{normalize, normalize_image};
use crate::pipeline::{self, DetectionSet, SheetAnalysis};

/// Primary analysis interface.
///
/// Holds configuration only. Create once, analyze many sheets; runs share
/// no state and may happen concurrently.
///
/// # Examples
///
/// ```no_run
/// use palocheck::Analyzer;
/// use std::path::Path;
///
/// let analyzer = Analyzer::new();
/// let analysis = analyzer.analyze_path(Path::new("sheet.png"), None).unwrap();
/// println!("status {:?}, total {:?}", analysis.metrics.status, analysis.metrics.total);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    config: AnalysisConfig,
}

impl Analyzer {
    /// Create an analyzer with default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with full config control.
    pub fn with_config(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Access the current configuration.
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Mutable access to configuration for post-construction tuning.
    pub fn config_mut(&mut self) -> &mut AnalysisConfig {
        &mut self.config
    }

    /// Decode and analyze an encoded image buffer.
    ///
    /// `scale_mm_per_px` is the physical scale of the scan, when known.
    pub fn analyze_bytes(
        &self,
        bytes: &[u8],
        scale_mm_per_px: Option<f64>,
    ) -> Result<SheetAnalysis, ImageDecodeError> {
        let image = normalize(bytes, &self.config.normalize)?;
        Ok(pipeline::analyze_normalized(&image, scale_mm_per_px, &self.config))
    }

    /// Read and analyze an image file.
    pub fn analyze_path(
        &self,
        path: &Path,
        scale_mm_per_px: Option<f64>,
    ) -> Result<SheetAnalysis, AnalysisError> {
        let bytes = std::fs::read(path).map_err(|source| AnalysisError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "image read");
        Ok(self.analyze_bytes(&bytes, scale_mm_per_px)?)
    }

    /// Analyze an already decoded image.
    pub fn analyze_image(
        &self,
        image: &DynamicImage,
        scale_mm_per_px: Option<f64>,
    ) -> Result<SheetAnalysis, ImageDecodeError> {
        let image = normalize_image(image, &self.config.normalize)?;
        Ok(pipeline::analyze_normalized(&image, scale_mm_per_px, &self.config))
    }

    /// Re-aggregate a manually corrected detection set.
    pub fn recompute(&self, detections: &DetectionSet) -> SheetAnalysis {
        detections.recompute(&self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsStatus;
    use crate::test_utils::{encode_png, SheetFixture};

    #[test]
    fn analyzer_config_mut() {
        let mut analyzer = Analyzer::new();
        analyzer.config_mut().relaxed = true;
        assert!(analyzer.config().relaxed);
    }

    #[test]
    fn empty_image_is_rejected() {
        let err = Analyzer::new()
            .analyze_image(&DynamicImage::new_rgb8(0, 10), None)
            .expect_err("must fail");
        assert_eq!(err, ImageDecodeError::EmptyImage { width: 0, height: 10 });
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = Analyzer::new()
            .analyze_path(Path::new("/nonexistent/sheet.png"), None)
            .expect_err("must fail");
        assert!(matches!(err, AnalysisError::Io { .. }));
    }

    #[test]
    fn bytes_and_decoded_image_agree() {
        let sheet = SheetFixture::default().render();
        let analyzer = Analyzer::new();
        let from_bytes = analyzer
            .analyze_bytes(&encode_png(&sheet), Some(0.1))
            .expect("bytes");
        let from_image = analyzer
            .analyze_image(&DynamicImage::ImageRgb8(sheet), Some(0.1))
            .expect("image");
        assert_eq!(from_bytes, from_image);
        assert_eq!(from_bytes.metrics.status, MetricsStatus::Success);
    }

    #[test]
    fn unedited_detections_recompute_to_the_same_metrics() {
        let analyzer = Analyzer::new();
        let analysis = analyzer
            .analyze_bytes(&encode_png(&SheetFixture::default().render()), None)
            .expect("analysis");
        let again = analyzer.recompute(&analysis.detection_set());
        assert_eq!(again.metrics, analysis.metrics);
        assert_eq!(again.line_count, analysis.line_count);
    }
}
