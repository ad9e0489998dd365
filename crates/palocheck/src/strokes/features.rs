//! Per-stroke geometric and photometric features.

use image::GrayImage;
use imageproc::point::Point;

use super::{BBox, HookSide, Hooks, StrokeConfig};

/// Slant of the blob's minimum-area rectangle, in degrees from vertical.
///
/// The long side is used regardless of how the rectangle is reported.
/// Positive values lean the top of the stroke to the right.
pub(crate) fn slant_degrees(points: &[Point<i32>]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let rect = imageproc::geometry::min_area_rect(points);
    let e1 = ((rect[1].x - rect[0].x) as f64, (rect[1].y - rect[0].y) as f64);
    let e2 = ((rect[2].x - rect[1].x) as f64, (rect[2].y - rect[1].y) as f64);
    let (mut dx, mut dy) = if e1.0.hypot(e1.1) >= e2.0.hypot(e2.1) {
        e1
    } else {
        e2
    };
    if dy < 0.0 || (dy == 0.0 && dx > 0.0) {
        dx = -dx;
        dy = -dy;
    }
    if dx == 0.0 && dy == 0.0 {
        return 0.0;
    }
    // Walking down the stroke, a top-right lean moves left.
    (-dx).atan2(dy).to_degrees()
}

/// Contour length over twice the top-to-bottom span, floored at 1.
pub(crate) fn tortuosity(points: &[Point<i32>]) -> f64 {
    let (Some(top), Some(bottom)) = (
        points.iter().min_by_key(|p| p.y),
        points.iter().max_by_key(|p| p.y),
    ) else {
        return 1.0;
    };
    let span = ((bottom.x - top.x) as f64).hypot((bottom.y - top.y) as f64);
    if span <= 0.0 {
        return 1.0;
    }
    let length = imageproc::geometry::arc_length(points, true);
    (length / (2.0 * span)).max(1.0)
}

/// Ink darkness under the bounding box: `255 - mean gray`.
pub(crate) fn pressure(gray: &GrayImage, bbox: &BBox) -> f64 {
    let mut sum = 0u64;
    let mut n = 0u64;
    for y in bbox.y..(bbox.y + bbox.height).min(gray.height()) {
        for x in bbox.x..(bbox.x + bbox.width).min(gray.width()) {
            sum += gray.get_pixel(x, y)[0] as u64;
            n += 1;
        }
    }
    if n == 0 {
        return 0.0;
    }
    255.0 - sum as f64 / n as f64
}

/// Side to which the ink mass of rows `[y0, y1)` inside `bbox` leans.
fn hook_side(gray: &GrayImage, bbox: &BBox, y0: u32, y1: u32, cfg: &StrokeConfig) -> HookSide {
    let mut m00 = 0.0;
    let mut m10 = 0.0;
    for y in y0..y1.min(gray.height()) {
        for lx in 0..bbox.width {
            let x = bbox.x + lx;
            if x >= gray.width() {
                break;
            }
            let mass = (255 - gray.get_pixel(x, y)[0]) as f64;
            m00 += mass;
            m10 += mass * lx as f64;
        }
    }
    if m00 <= 0.0 {
        return HookSide::None;
    }
    let cx = m10 / m00;
    let center = bbox.width as f64 / 2.0;
    let thr = cfg
        .hook_min_offset_px
        .max(bbox.width as f64 * cfg.hook_offset_frac);
    if cx < center - thr {
        HookSide::Left
    } else if cx > center + thr {
        HookSide::Right
    } else {
        HookSide::None
    }
}

/// Hook flags for the top and bottom fifths of a tall enough stroke.
pub(crate) fn hooks(gray: &GrayImage, bbox: &BBox, cfg: &StrokeConfig) -> Hooks {
    if bbox.height <= cfg.hook_min_height_px || bbox.width == 0 {
        return Hooks::default();
    }
    let part = (bbox.height / cfg.hook_part_divisor.max(1)).max(1);
    Hooks {
        top: hook_side(gray, bbox, bbox.y, bbox.y + part, cfg),
        bottom: hook_side(gray, bbox, bbox.y + bbox.height - part, bbox.y + bbox.height, cfg),
    }
}
