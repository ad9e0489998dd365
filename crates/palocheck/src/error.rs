//! Error types surfaced by the analyzer.
//!
//! Only image decoding is fatal inside the pipeline. Low confidence and
//! degraded fallbacks are reported through [`crate::MetricsResult`] and
//! [`crate::Provenance`] instead.

use std::path::PathBuf;

use crate::metrics::ReasonCode;

/// The input buffer could not be turned into a raster image.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageDecodeError {
    /// The decoder rejected the bytes.
    Undecodable(String),
    /// The buffer decoded to an image with a zero dimension.
    EmptyImage { width: u32, height: u32 },
}

impl std::fmt::Display for ImageDecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Undecodable(msg) => write!(f, "image could not be decoded: {}", msg),
            Self::EmptyImage { width, height } => {
                write!(f, "decoded image is empty ({}x{})", width, height)
            }
        }
    }
}

impl std::error::Error for ImageDecodeError {}

impl From<image::ImageError> for ImageDecodeError {
    fn from(e: image::ImageError) -> Self {
        Self::Undecodable(e.to_string())
    }
}

/// Failure of a full analyzer run or of loading its inputs.
#[derive(Debug)]
pub enum AnalysisError {
    /// Fatal decode failure of the sheet image.
    Decode(ImageDecodeError),
    /// The image or config file could not be read.
    Io { path: PathBuf, source: std::io::Error },
    /// A JSON config or detection set was malformed.
    Json(serde_json::Error),
}

impl std::fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Decode(e) => write!(f, "{}", e),
            Self::Io { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            Self::Json(e) => write!(f, "invalid JSON: {}", e),
        }
    }
}

impl std::error::Error for AnalysisError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Decode(e) => Some(e),
            Self::Io { source, .. } => Some(source),
            Self::Json(e) => Some(e),
        }
    }
}

impl From<ImageDecodeError> for AnalysisError {
    fn from(e: ImageDecodeError) -> Self {
        Self::Decode(e)
    }
}

impl From<serde_json::Error> for AnalysisError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

/// A report may not be finalized from these metrics.
#[derive(Debug, Clone, PartialEq)]
pub enum FinalizeError {
    /// The confidence gate flagged the run.
    NeedsReview { reason: Option<ReasonCode> },
    /// Totals are not available.
    MetricsUnavailable,
    /// A reviewer has not confirmed the results.
    NotReviewed,
}

impl std::fmt::Display for FinalizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NeedsReview { reason } => {
                let code = reason.map(ReasonCode::code).unwrap_or("NEEDS_REVIEW");
                write!(
                    f,
                    "results need review ({}); correct the work area manually before finalizing",
                    code
                )
            }
            Self::MetricsUnavailable => write!(
                f,
                "metrics are not available; correct the work area manually before finalizing"
            ),
            Self::NotReviewed => write!(f, "results must be reviewed before finalizing"),
        }
    }
}

impl std::error::Error for FinalizeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_message_names_dimensions() {
        let e = ImageDecodeError::EmptyImage {
            width: 0,
            height: 12,
        };
        assert_eq!(e.to_string(), "decoded image is empty (0x12)");
    }

    #[test]
    fn analysis_error_exposes_decode_source() {
        use std::error::Error;
        let e = AnalysisError::from(ImageDecodeError::Undecodable("bad magic".into()));
        assert!(e.source().is_some());
        assert!(e.to_string().contains("bad magic"));
    }

    #[test]
    fn finalize_error_asks_for_manual_correction() {
        let e = FinalizeError::NeedsReview {
            reason: Some(ReasonCode::LowConfidenceRoi),
        };
        let msg = e.to_string();
        assert!(msg.contains("LOW_CONFIDENCE_ROI"));
        assert!(msg.contains("manually"));
    }
}
