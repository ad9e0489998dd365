//! Work-area (region of interest) location.
//!
//! The region top is driven by two signals with fixed priority: the ruled
//! separator line when one is found, else the first band of consistent
//! vertical ink density. A fixed floor bounds both. Sides and footer are
//! inset by constant fractions of the page size.

mod separator;
mod validate;

pub use separator::{find_separator, SeparatorConfig, SeparatorLine};
pub use validate::{validate_region, ValidationReport, ValidatorConfig};

use image::GrayImage;

use crate::imaging::{open, row_ink_counts, RectKernel, Window};
use crate::normalize::NormalizedImage;

/// How the region top was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionSource {
    /// Ruled separator line.
    Structural,
    /// Vertical ink density or the fixed floor.
    AdaptiveDensity,
}

/// Rectangular work area with its reliability score.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Reliability score in [0, 1].
    pub confidence: f64,
    pub source: RegionSource,
    pub separator_found: bool,
    /// Separator position, when one was found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator_y: Option<u32>,
    /// First row of consistent vertical ink density, when one was found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adaptive_cutoff: Option<u32>,
}

impl Region {
    /// Whole-image region, used when no location is available.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
            confidence: 0.0,
            source: RegionSource::AdaptiveDensity,
            separator_found: false,
            separator_y: None,
            adaptive_cutoff: None,
        }
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Boundary-inclusive containment of a point.
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x as f64
            && px <= self.right() as f64
            && py >= self.y as f64
            && py <= self.bottom() as f64
    }

    pub fn window(&self) -> Window {
        Window::new(self.x, self.y, self.width, self.height)
    }
}

/// Region location parameters.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    pub separator: SeparatorConfig,
    /// Buffer (pixels) between the separator and the region top.
    pub separator_buffer_px: u32,
    /// Vertical opening height isolating stroke-like ink for the density scan.
    pub density_kernel_height: u32,
    /// Density scan start (fraction of page height).
    pub density_start_frac: f64,
    /// Density scan end (fraction of page height).
    pub density_end_frac: f64,
    /// Row ink count threshold (fraction of page width).
    pub density_threshold_frac: f64,
    /// Rows averaged when confirming a density hit.
    pub density_window_rows: u32,
    /// Pixels subtracted from the density cutoff.
    pub density_back_off_px: u32,
    /// The region top is never above this (fraction of page height).
    pub fixed_floor_frac: f64,
    /// Left/right inset (fraction of page width).
    pub side_margin_frac: f64,
    /// Bottom inset (fraction of page height).
    pub footer_margin_frac: f64,
    pub base_confidence: f64,
    pub separator_bonus: f64,
    /// Bonus when the density cutoff agrees with the chosen top.
    pub agreement_bonus: f64,
    /// Agreement tolerance (pixels).
    pub agreement_px: u32,
    /// Regions shorter than this fraction of page height are penalized.
    pub min_height_frac: f64,
    pub small_region_penalty: f64,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            separator: SeparatorConfig::default(),
            separator_buffer_px: 10,
            density_kernel_height: 25,
            density_start_frac: 0.15,
            density_end_frac: 0.50,
            density_threshold_frac: 0.04,
            density_window_rows: 40,
            density_back_off_px: 10,
            fixed_floor_frac: 0.20,
            side_margin_frac: 0.04,
            footer_margin_frac: 0.04,
            base_confidence: 0.4,
            separator_bonus: 0.4,
            agreement_bonus: 0.2,
            agreement_px: 100,
            min_height_frac: 0.30,
            small_region_penalty: 0.3,
        }
    }
}

/// First row where vertical-stroke density exceeds the threshold and stays
/// above it on average over the following window.
pub fn adaptive_density_cutoff(mask: &GrayImage, cfg: &RegionConfig) -> Option<u32> {
    let (w, h) = mask.dimensions();
    let vertical = open(mask, RectKernel::vertical(cfg.density_kernel_height));
    let rows = row_ink_counts(&vertical, Window::new(0, 0, w, h));
    let threshold = w as f64 * cfg.density_threshold_frac;

    let start = (h as f64 * cfg.density_start_frac) as usize;
    let end = ((h as f64 * cfg.density_end_frac) as usize).min(rows.len());
    (start..end)
        .find(|&y| {
            if (rows[y] as f64) <= threshold {
                return false;
            }
            let window = &rows[y..(y + cfg.density_window_rows as usize).min(rows.len())];
            let mean = window.iter().map(|&c| c as f64).sum::<f64>() / window.len() as f64;
            mean > threshold
        })
        .map(|y| y as u32)
}

/// Locate the work area of a normalized page.
pub fn locate_region(image: &NormalizedImage, cfg: &RegionConfig) -> Region {
    locate_region_in_mask(&image.mask, cfg)
}

/// Locate the work area from the binary ink mask alone.
pub fn locate_region_in_mask(mask: &GrayImage, cfg: &RegionConfig) -> Region {
    let (w, h) = mask.dimensions();
    let separator = find_separator(mask, &cfg.separator);
    let adaptive = adaptive_density_cutoff(mask, cfg);
    let fixed = (h as f64 * cfg.fixed_floor_frac) as u32;

    let separator_y = separator.map(|s| s.y.round().max(0.0) as u32);
    let split = match separator_y {
        Some(y) => y + cfg.separator_buffer_px,
        None => {
            tracing::warn!("separator line not found; falling back to ink density");
            let from_density = adaptive
                .map(|y| y.saturating_sub(cfg.density_back_off_px))
                .unwrap_or(0);
            fixed.max(from_density)
        }
    };
    let footer = (h as f64 * cfg.footer_margin_frac) as u32;
    // Leave at least one row for the region.
    let top = split.max(fixed).min(h.saturating_sub(footer + 1));

    let side = (w as f64 * cfg.side_margin_frac) as u32;
    let width = w.saturating_sub(2 * side).max(1);
    let height = h.saturating_sub(top + footer).max(1);

    let mut confidence = cfg.base_confidence;
    if separator.is_some() {
        confidence += cfg.separator_bonus;
    }
    if adaptive.is_some_and(|a| a.abs_diff(top) < cfg.agreement_px) {
        confidence += cfg.agreement_bonus;
    }
    if (height as f64) < h as f64 * cfg.min_height_frac {
        confidence -= cfg.small_region_penalty;
    }
    let confidence = (confidence.clamp(0.0, 1.0) * 100.0).round() / 100.0;

    let region = Region {
        x: side,
        y: top,
        width,
        height,
        confidence,
        source: if separator.is_some() {
            RegionSource::Structural
        } else {
            RegionSource::AdaptiveDensity
        },
        separator_found: separator.is_some(),
        separator_y,
        adaptive_cutoff: adaptive,
    };
    tracing::info!(
        x = region.x,
        y = region.y,
        width = region.width,
        height = region.height,
        confidence = region.confidence,
        source = ?region.source,
        "work area located"
    );
    region
}
