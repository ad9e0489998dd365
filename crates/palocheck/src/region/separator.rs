//! Detector for the long, nearly horizontal ruled line separating the sheet
//! header from the work area.
//!
//! Candidate lines are traced across the ink mask at a handful of small tilts.
//! Along each trace, ink runs are merged across short gaps into segments; a
//! segment qualifies when it is long, densely inked and isolated (the traces a
//! fixed offset above and below it are mostly paper).

use image::GrayImage;

use crate::imaging::INK;

/// Separator search parameters.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SeparatorConfig {
    /// Search band start (fraction of page height).
    pub band_start_frac: f64,
    /// Search band end (fraction of page height).
    pub band_end_frac: f64,
    /// Segments must be tilted strictly less than this (degrees).
    pub max_angle_deg: f64,
    /// Tilt sampling step (degrees).
    pub angle_step_deg: f64,
    /// Minimum segment length (fraction of page width).
    pub min_length_frac: f64,
    /// Largest paper gap bridged inside a segment (fraction of page width).
    pub max_gap_frac: f64,
    /// Minimum fraction of inked samples along a segment.
    pub min_fill: f64,
    /// Offset (pixels) of the parallel traces used for the isolation check.
    pub isolation_offset_px: u32,
    /// Maximum ink fraction allowed on the parallel traces.
    pub max_isolation_fill: f64,
}

impl Default for SeparatorConfig {
    fn default() -> Self {
        Self {
            band_start_frac: 0.10,
            band_end_frac: 0.60,
            max_angle_deg: 3.0,
            angle_step_deg: 0.5,
            min_length_frac: 0.40,
            max_gap_frac: 0.02,
            min_fill: 0.80,
            isolation_offset_px: 12,
            max_isolation_fill: 0.30,
        }
    }
}

/// A qualifying separator segment.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SeparatorLine {
    /// Vertical position of the segment midpoint.
    pub y: f64,
    /// Horizontal extent `[x0, x1]` (inclusive).
    pub x0: u32,
    pub x1: u32,
    /// Tilt in degrees (positive = descending to the right).
    pub angle_deg: f64,
}

impl SeparatorLine {
    pub fn length(&self) -> u32 {
        self.x1 - self.x0 + 1
    }
}

struct Trace<'a> {
    mask: &'a GrayImage,
    y0: f64,
    slope: f64,
}

impl Trace<'_> {
    fn y_at(&self, x: u32, offset: f64) -> f64 {
        self.y0 + offset + self.slope * x as f64
    }

    fn is_ink(&self, x: u32, offset: f64) -> bool {
        let y = self.y_at(x, offset).round();
        if y < 0.0 || y >= self.mask.height() as f64 {
            return false;
        }
        self.mask.get_pixel(x, y as u32)[0] == INK
    }

    fn fill(&self, x0: u32, x1: u32, offset: f64) -> f64 {
        let ink = (x0..=x1).filter(|&x| self.is_ink(x, offset)).count();
        ink as f64 / (x1 - x0 + 1) as f64
    }

    /// Ink segments along the trace, merging gaps up to `max_gap` pixels.
    fn segments(&self, max_gap: u32) -> Vec<(u32, u32)> {
        let mut out = Vec::new();
        let mut current: Option<(u32, u32)> = None;
        for x in 0..self.mask.width() {
            if !self.is_ink(x, 0.0) {
                continue;
            }
            current = match current {
                Some((s, e)) if x - e - 1 <= max_gap => Some((s, x)),
                Some(seg) => {
                    out.push(seg);
                    Some((x, x))
                }
                None => Some((x, x)),
            };
        }
        out.extend(current);
        out
    }
}

fn tilt_angles(cfg: &SeparatorConfig) -> Vec<f64> {
    let step = cfg.angle_step_deg.max(0.05);
    let mut angles = vec![0.0];
    let mut k = 1.0;
    while k * step < cfg.max_angle_deg {
        angles.push(k * step);
        angles.push(-k * step);
        k += 1.0;
    }
    angles
}

/// Find the lowest qualifying separator inside the search band, if any.
pub fn find_separator(mask: &GrayImage, cfg: &SeparatorConfig) -> Option<SeparatorLine> {
    let (w, h) = mask.dimensions();
    if w == 0 || h == 0 {
        return None;
    }
    let band_start = (h as f64 * cfg.band_start_frac) as u32;
    let band_end = ((h as f64 * cfg.band_end_frac) as u32).min(h);
    let min_len = (w as f64 * cfg.min_length_frac).ceil() as u32;
    let max_gap = (w as f64 * cfg.max_gap_frac) as u32;
    let iso = cfg.isolation_offset_px as f64;

    let mut best: Option<SeparatorLine> = None;
    for angle in tilt_angles(cfg) {
        let slope = angle.to_radians().tan();
        for y0 in band_start..band_end {
            let trace = Trace {
                mask,
                y0: y0 as f64,
                slope,
            };
            for (x0, x1) in trace.segments(max_gap) {
                if x1 - x0 + 1 < min_len {
                    continue;
                }
                let mid_y = trace.y_at((x0 + x1) / 2, 0.0);
                if mid_y < band_start as f64 || mid_y >= band_end as f64 {
                    continue;
                }
                if best.is_some_and(|b| mid_y <= b.y) {
                    continue;
                }
                if trace.fill(x0, x1, 0.0) < cfg.min_fill {
                    continue;
                }
                let above = trace.fill(x0, x1, -iso);
                let below = trace.fill(x0, x1, iso);
                if above > cfg.max_isolation_fill || below > cfg.max_isolation_fill {
                    tracing::debug!(y = mid_y, above, below, "separator candidate not isolated");
                    continue;
                }
                best = Some(SeparatorLine {
                    y: mid_y,
                    x0,
                    x1,
                    angle_deg: angle,
                });
            }
        }
    }
    best
}
