//! Stroke ("palo") and delimiter-mark extraction inside the work area.
//!
//! Blobs are the external contours of the ink mask restricted to the region.
//! Each blob is either discarded with a reason, classified as a delimiter
//! mark, or accepted as a stroke and measured.

mod features;

use std::collections::BTreeMap;

use image::GrayImage;
use imageproc::contours::find_contours;
use imageproc::point::Point;

use crate::imaging::{mask_to_window, polygon_area};
use crate::region::Region;

/// Axis-aligned bounding box in page pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> [f64; 2] {
        [
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        ]
    }

    /// Height over width (0 for a zero-width box).
    pub fn aspect(&self) -> f64 {
        if self.width == 0 {
            0.0
        } else {
            self.height as f64 / self.width as f64
        }
    }

    fn of_points(points: &[Point<i32>]) -> Option<Self> {
        let min_x = points.iter().map(|p| p.x).min()?;
        let max_x = points.iter().map(|p| p.x).max()?;
        let min_y = points.iter().map(|p| p.y).min()?;
        let max_y = points.iter().map(|p| p.y).max()?;
        Some(Self::new(
            min_x.max(0) as u32,
            min_y.max(0) as u32,
            (max_x - min_x + 1) as u32,
            (max_y - min_y + 1) as u32,
        ))
    }
}

/// Direction of a hook at one end of a stroke.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookSide {
    #[default]
    None,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Hooks {
    pub top: HookSide,
    pub bottom: HookSide,
}

/// One vertical stroke.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Stroke {
    pub id: usize,
    /// Bounding-box center `[x, y]`.
    pub center: [f64; 2],
    pub bbox: BBox,
    pub height: f64,
    pub width: f64,
    /// Slant in degrees from vertical (positive = top leans right).
    pub angle_deg: f64,
    /// Contour length over twice the end-to-end span (>= 1).
    pub tortuosity: f64,
    /// `255 - mean gray` under the bounding box.
    pub pressure: f64,
    #[serde(default)]
    pub hooks: Hooks,
}

impl Stroke {
    /// A stroke with only its box known, e.g. one added by hand.
    pub fn from_bbox(id: usize, bbox: BBox) -> Self {
        Self {
            id,
            center: bbox.center(),
            bbox,
            height: bbox.height as f64,
            width: bbox.width as f64,
            angle_deg: 0.0,
            tortuosity: 1.0,
            pressure: 0.0,
            hooks: Hooks::default(),
        }
    }
}

/// Interval delimiter mark.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Mark {
    pub id: usize,
    pub center: [f64; 2],
    pub bbox: BBox,
}

impl Mark {
    pub fn from_bbox(id: usize, bbox: BBox) -> Self {
        Self {
            id,
            center: bbox.center(),
            bbox,
        }
    }
}

/// Why a blob was not kept as a stroke or mark.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscardReason {
    /// Center above the region, or a header fragment hugging its top.
    OutsideRoiTopzone,
    /// Center outside the region elsewhere.
    OutsideRoiOther,
    /// Contour area below the noise floor.
    BelowMinArea,
    /// Wider than the merged-blob limit.
    TooWide,
    /// Neither mark- nor stroke-shaped.
    ShapeRejected,
}

impl DiscardReason {
    pub const fn code(self) -> &'static str {
        match self {
            Self::OutsideRoiTopzone => "OUTSIDE_ROI_TOPZONE",
            Self::OutsideRoiOther => "OUTSIDE_ROI_OTHER",
            Self::BelowMinArea => "BELOW_MIN_AREA",
            Self::TooWide => "TOO_WIDE",
            Self::ShapeRejected => "SHAPE_REJECTED",
        }
    }

    /// Whether the blob counts as discarded for being outside the region.
    pub const fn is_outside(self) -> bool {
        matches!(self, Self::OutsideRoiTopzone | Self::OutsideRoiOther)
    }
}

/// Per-run detection counters.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Provenance {
    /// Blobs examined.
    pub raw_detected: usize,
    /// Strokes kept inside the region.
    pub kept_in_region: usize,
    /// Delimiter marks kept.
    pub marks_detected: usize,
    /// Blobs discarded as outside the region (including header fragments).
    pub discarded_outside: usize,
    /// Histogram of every discard reason.
    pub discard_reasons: BTreeMap<DiscardReason, usize>,
}

impl Provenance {
    fn discard(&mut self, reason: DiscardReason) {
        if reason.is_outside() {
            self.discarded_outside += 1;
        }
        *self.discard_reasons.entry(reason).or_insert(0) += 1;
    }

    pub fn discarded(&self, reason: DiscardReason) -> usize {
        self.discard_reasons.get(&reason).copied().unwrap_or(0)
    }
}

/// Stroke/mark classification thresholds.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct StrokeConfig {
    /// Minimum contour area (pixels).
    pub min_area: f64,
    /// Maximum blob width (fraction of page width).
    pub max_width_frac: f64,
    /// Mark aspect range (height / width, exclusive).
    pub mark_aspect: [f64; 2],
    /// Mark width lower bound (pixels, exclusive).
    pub mark_min_width_px: u32,
    /// Mark width upper bound (fraction of page width, exclusive).
    pub mark_max_width_frac: f64,
    pub mark_min_height_px: u32,
    /// Marks must be centered inside this band of region height (exclusive).
    pub mark_band: [f64; 2],
    /// Minimum stroke aspect (exclusive).
    pub min_aspect: f64,
    /// Minimum stroke aspect in relaxed mode (exclusive).
    pub relaxed_min_aspect: f64,
    /// Maximum stroke aspect (exclusive).
    pub max_aspect: f64,
    /// Stroke height range (fractions of page height, exclusive).
    pub min_height_frac: f64,
    pub max_height_frac: f64,
    /// Strokes whose top lies in this top fraction of the region are header fragments.
    pub header_zone_frac: f64,
    /// Hooks are only measured on strokes taller than this.
    pub hook_min_height_px: u32,
    /// Each hook zone is `height / hook_part_divisor` rows.
    pub hook_part_divisor: u32,
    pub hook_min_offset_px: f64,
    /// Centroid offset (fraction of stroke width) that counts as a hook.
    pub hook_offset_frac: f64,
}

impl Default for StrokeConfig {
    fn default() -> Self {
        Self {
            min_area: 15.0,
            max_width_frac: 0.20,
            mark_aspect: [0.05, 0.3],
            mark_min_width_px: 15,
            mark_max_width_frac: 0.12,
            mark_min_height_px: 4,
            mark_band: [0.05, 0.95],
            min_aspect: 1.8,
            relaxed_min_aspect: 1.1,
            max_aspect: 70.0,
            min_height_frac: 0.005,
            max_height_frac: 0.4,
            header_zone_frac: 0.02,
            hook_min_height_px: 20,
            hook_part_divisor: 5,
            hook_min_offset_px: 3.0,
            hook_offset_frac: 0.35,
        }
    }
}

/// Output of one stroke-detection run.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StrokeDetection {
    pub strokes: Vec<Stroke>,
    pub marks: Vec<Mark>,
    pub provenance: Provenance,
}

enum Class {
    Stroke,
    Mark,
    Discard(DiscardReason),
}

fn classify(
    bbox: &BBox,
    area: f64,
    region: &Region,
    page: (u32, u32),
    relaxed: bool,
    cfg: &StrokeConfig,
) -> Class {
    let (page_w, page_h) = (page.0 as f64, page.1 as f64);
    let [cx, cy] = bbox.center();
    if !region.contains(cx, cy) {
        return Class::Discard(if cy < region.y as f64 {
            DiscardReason::OutsideRoiTopzone
        } else {
            DiscardReason::OutsideRoiOther
        });
    }
    if area < cfg.min_area {
        return Class::Discard(DiscardReason::BelowMinArea);
    }
    let w = bbox.width as f64;
    let h = bbox.height as f64;
    if w > page_w * cfg.max_width_frac {
        return Class::Discard(DiscardReason::TooWide);
    }

    let aspect = bbox.aspect();
    let mark_shaped = aspect > cfg.mark_aspect[0]
        && aspect < cfg.mark_aspect[1]
        && bbox.width > cfg.mark_min_width_px
        && w < page_w * cfg.mark_max_width_frac
        && bbox.height >= cfg.mark_min_height_px;
    if mark_shaped {
        let ry = region.y as f64;
        let rh = region.height as f64;
        let inside_band = cy > ry + rh * cfg.mark_band[0] && cy < ry + rh * cfg.mark_band[1];
        return if inside_band {
            Class::Mark
        } else {
            Class::Discard(DiscardReason::ShapeRejected)
        };
    }

    let min_aspect = if relaxed {
        cfg.relaxed_min_aspect
    } else {
        cfg.min_aspect
    };
    let stroke_shaped = aspect > min_aspect
        && aspect < cfg.max_aspect
        && h > page_h * cfg.min_height_frac
        && h < page_h * cfg.max_height_frac;
    if !stroke_shaped {
        return Class::Discard(DiscardReason::ShapeRejected);
    }
    if (bbox.y as f64) < region.y as f64 + region.height as f64 * cfg.header_zone_frac {
        return Class::Discard(DiscardReason::OutsideRoiTopzone);
    }
    Class::Stroke
}

/// Extract and classify blobs of `mask` inside `region`.
///
/// `gray` is sampled for pressure and hooks. `relaxed` lowers the minimum
/// stroke aspect for degraded scans.
pub fn detect_strokes(
    mask: &GrayImage,
    gray: &GrayImage,
    region: &Region,
    relaxed: bool,
    cfg: &StrokeConfig,
) -> StrokeDetection {
    let page = mask.dimensions();
    let working = mask_to_window(mask, region.window());
    let mut out = StrokeDetection::default();

    for contour in find_contours::<i32>(&working) {
        if contour.parent.is_some() {
            continue;
        }
        let Some(bbox) = BBox::of_points(&contour.points) else {
            continue;
        };
        out.provenance.raw_detected += 1;
        let area = polygon_area(&contour.points);
        match classify(&bbox, area, region, page, relaxed, cfg) {
            Class::Discard(reason) => {
                tracing::trace!(?bbox, reason = reason.code(), "blob discarded");
                out.provenance.discard(reason);
            }
            Class::Mark => {
                let id = out.marks.len() + 1;
                out.marks.push(Mark::from_bbox(id, bbox));
            }
            Class::Stroke => {
                let id = out.strokes.len() + 1;
                out.strokes.push(Stroke {
                    id,
                    center: bbox.center(),
                    bbox,
                    height: bbox.height as f64,
                    width: bbox.width as f64,
                    angle_deg: features::slant_degrees(&contour.points),
                    tortuosity: features::tortuosity(&contour.points),
                    pressure: features::pressure(gray, &bbox),
                    hooks: features::hooks(gray, &bbox, cfg),
                });
            }
        }
    }

    out.provenance.kept_in_region = out.strokes.len();
    out.provenance.marks_detected = out.marks.len();
    tracing::info!(
        strokes = out.strokes.len(),
        marks = out.marks.len(),
        raw = out.provenance.raw_detected,
        discarded_outside = out.provenance.discarded_outside,
        "strokes detected"
    );
    out
}
