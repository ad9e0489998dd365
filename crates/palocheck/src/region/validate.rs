//! Independent diagnostic re-scoring of a candidate work area.
//!
//! Never gates the pipeline; the report is carried along for audit.

use image::GrayImage;

use super::Region;
use crate::imaging::{ink_below, ink_fraction, mask_to_window, open, row_ink_counts, RectKernel, Window};

/// Validator weights and thresholds. Densities are ink fractions.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Gray levels below this count as ink.
    pub ink_level: u8,
    /// Vertical opening used for the structural echo check.
    pub structure_kernel_height: u32,
    /// Fraction of region height scanned for the structural echo.
    pub structure_top_frac: f64,
    /// Peak row density required in the top band.
    pub structure_min_density: f64,
    /// Vertical opening used for the content check.
    pub content_kernel_height: u32,
    /// Number of horizontal bands the region is split into.
    pub content_bands: usize,
    /// Minimum mean row density of every band.
    pub content_min_density: f64,
    /// Margin width (fraction of region width) on each side.
    pub margin_frac: f64,
    /// Maximum ink fraction inside each margin.
    pub margin_max_density: f64,
    /// Plausible mean content density range (exclusive).
    pub density_range: [f64; 2],
    pub structure_weight: f64,
    pub content_weight: f64,
    pub margin_weight: f64,
    pub density_weight: f64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            ink_level: 128,
            structure_kernel_height: 20,
            structure_top_frac: 0.05,
            structure_min_density: 0.02,
            content_kernel_height: 25,
            content_bands: 5,
            content_min_density: 0.01,
            margin_frac: 0.05,
            margin_max_density: 0.05,
            density_range: [0.02, 0.15],
            structure_weight: 0.3,
            content_weight: 0.3,
            margin_weight: 0.2,
            density_weight: 0.2,
        }
    }
}

/// Outcome of the three validation checks plus the density bonus.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ValidationReport {
    /// Weighted score in [0, 1].
    pub confidence: f64,
    pub has_structure: bool,
    pub has_content: bool,
    pub margins_clean: bool,
    /// Peak row density in the top band.
    pub structure_density: f64,
    /// Mean row density of each band, top to bottom.
    pub band_densities: Vec<f64>,
    pub mean_density: f64,
    pub left_margin_density: f64,
    pub right_margin_density: f64,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Per-row densities (ink count / region width) of the vertical opening.
fn vertical_row_densities(ink: &GrayImage, win: Window, kernel_height: u32) -> Vec<f64> {
    let local = mask_to_window(ink, win);
    let vertical = open(&local, RectKernel::vertical(kernel_height));
    let width = win.width.max(1) as f64;
    row_ink_counts(&vertical, win)
        .into_iter()
        .map(|c| c as f64 / width)
        .collect()
}

/// Re-score `region` on `gray` with structural, content and margin checks.
pub fn validate_region(gray: &GrayImage, region: &Region, cfg: &ValidatorConfig) -> ValidationReport {
    let win = region.window().clipped(gray.width(), gray.height());
    let ink = ink_below(gray, cfg.ink_level);

    let structure_rows = vertical_row_densities(&ink, win, cfg.structure_kernel_height);
    let top_rows = ((win.height as f64 * cfg.structure_top_frac) as usize).max(1);
    let structure_density = structure_rows
        .iter()
        .take(top_rows)
        .copied()
        .fold(0.0, f64::max);
    let has_structure = structure_density > cfg.structure_min_density;

    let content_rows = vertical_row_densities(&ink, win, cfg.content_kernel_height);
    let bands = cfg.content_bands.max(1);
    let band_h = content_rows.len() / bands;
    let band_densities: Vec<f64> = (0..bands)
        .map(|i| {
            let start = i * band_h;
            let end = if i + 1 < bands {
                (i + 1) * band_h
            } else {
                content_rows.len()
            };
            mean(&content_rows[start..end])
        })
        .collect();
    let has_content = band_densities.iter().all(|&d| d > cfg.content_min_density);
    let mean_density = mean(&band_densities);

    let margin_w = (win.width as f64 * cfg.margin_frac) as u32;
    let (left_margin_density, right_margin_density) = if margin_w == 0 {
        (0.0, 0.0)
    } else {
        (
            ink_fraction(&ink, Window::new(win.x, win.y, margin_w, win.height)),
            ink_fraction(
                &ink,
                Window::new(win.x + win.width - margin_w, win.y, margin_w, win.height),
            ),
        )
    };
    let margins_clean = left_margin_density < cfg.margin_max_density
        && right_margin_density < cfg.margin_max_density;

    let mut confidence = 0.0;
    if has_structure {
        confidence += cfg.structure_weight;
    }
    if has_content {
        confidence += cfg.content_weight;
    }
    if margins_clean {
        confidence += cfg.margin_weight;
    }
    if mean_density > cfg.density_range[0] && mean_density < cfg.density_range[1] {
        confidence += cfg.density_weight;
    }
    let confidence = (confidence.clamp(0.0, 1.0) * 100.0).round() / 100.0;

    tracing::debug!(
        confidence,
        has_structure,
        has_content,
        margins_clean,
        mean_density,
        "region validated"
    );
    ValidationReport {
        confidence,
        has_structure,
        has_content,
        margins_clean,
        structure_density,
        band_densities,
        mean_density,
        left_margin_density,
        right_margin_density,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::RegionSource;
    use image::Luma;

    fn region(x: u32, y: u32, width: u32, height: u32) -> Region {
        Region {
            x,
            y,
            width,
            height,
            confidence: 1.0,
            source: RegionSource::Structural,
            separator_found: true,
            separator_y: None,
            adaptive_cutoff: None,
        }
    }

    fn stroke(gray: &mut GrayImage, x: u32, y: u32, h: u32) {
        for yy in y..y + h {
            for xx in x..x + 3 {
                gray.put_pixel(xx, yy, Luma([10]));
            }
        }
    }

    #[test]
    fn well_filled_region_scores_full() {
        let mut gray = GrayImage::from_pixel(400, 500, Luma([250]));
        // Strokes from the very top of the region through all five bands.
        for r in 0..5u32 {
            for c in 0..12u32 {
                stroke(&mut gray, 60 + c * 25, 100 + r * 80, 40);
            }
        }
        let report = validate_region(&gray, &region(20, 100, 360, 400), &ValidatorConfig::default());
        assert!(report.has_structure);
        assert!(report.has_content, "{:?}", report.band_densities);
        assert!(report.margins_clean);
        assert!(report.mean_density > 0.02 && report.mean_density < 0.15);
        assert_eq!(report.confidence, 1.0);
    }

    #[test]
    fn empty_band_and_dirty_margin_lower_the_score() {
        let mut gray = GrayImage::from_pixel(400, 500, Luma([250]));
        for c in 0..12u32 {
            stroke(&mut gray, 60 + c * 25, 300, 40);
        }
        // Ink bleeding into the left margin.
        for y in (100..500).step_by(3) {
            for x in 20..30 {
                gray.put_pixel(x, y, Luma([0]));
            }
        }
        let report = validate_region(&gray, &region(20, 100, 360, 400), &ValidatorConfig::default());
        assert!(!report.has_content);
        assert!(!report.margins_clean);
        assert_eq!(report.band_densities.len(), 5);
        assert!(!report.has_structure);
        assert_eq!(report.confidence, 0.0);
    }
}
