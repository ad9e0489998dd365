//! Page boundary search and perspective flattening.

use image::{GrayImage, Rgb, RgbImage};
use imageproc::contours::find_contours;
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point;

use super::NormalizeConfig;
use crate::imaging::{
    dilate_iter, equalize_local, median_intensity, otsu_binarize, polygon_area,
};

/// Page corners ordered top-left, top-right, bottom-right, bottom-left.
pub(crate) type Quad = [[f64; 2]; 4];

/// Simplify a closed contour to a polygon without a repeated closing vertex.
///
/// The contour is split at its first point and at the vertex farthest from
/// it; each half is simplified as an open curve.
pub(crate) fn approximate_closed_polygon(pts: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    if pts.len() < 3 || epsilon <= 0.0 {
        return pts.to_vec();
    }
    let anchor = pts[0];
    let far = pts
        .iter()
        .enumerate()
        .max_by(|(_, p), (_, q)| {
            let dp = ((p.x - anchor.x) as f64).hypot((p.y - anchor.y) as f64);
            let dq = ((q.x - anchor.x) as f64).hypot((q.y - anchor.y) as f64);
            dp.total_cmp(&dq)
        })
        .map(|(i, _)| i)
        .unwrap_or(0);
    if far == 0 {
        return vec![anchor];
    }

    let mut back: Vec<Point<i32>> = pts[far..].to_vec();
    back.push(anchor);
    let mut out = approximate_polygon_dp(&pts[..=far], epsilon, false);
    out.pop();
    let mut tail = approximate_polygon_dp(&back, epsilon, false);
    tail.pop();
    out.append(&mut tail);
    out
}

/// Order polygon vertices into TL, TR, BR, BL by coordinate sum and difference.
pub(crate) fn order_corners(pts: &[Point<i32>]) -> Option<Quad> {
    let key = |f: fn(&Point<i32>) -> i64| {
        let min = pts.iter().min_by_key(|p| f(p))?;
        let max = pts.iter().max_by_key(|p| f(p))?;
        Some((*min, *max))
    };
    let (tl, br) = key(|p| p.x as i64 + p.y as i64)?;
    let (tr, bl) = key(|p| p.y as i64 - p.x as i64)?;
    let f = |p: Point<i32>| [p.x as f64, p.y as f64];
    Some([f(tl), f(tr), f(br), f(bl)])
}

fn quad_area(q: &Quad) -> f64 {
    let mut twice = 0.0;
    for i in 0..4 {
        let (a, b) = (q[i], q[(i + 1) % 4]);
        twice += a[0] * b[1] - b[0] * a[1];
    }
    twice.abs() / 2.0
}

fn side(a: [f64; 2], b: [f64; 2]) -> f64 {
    (b[0] - a[0]).hypot(b[1] - a[1])
}

/// Output size of the flattened page: the longer of each pair of opposite sides.
pub(crate) fn rectified_size(q: &Quad) -> (u32, u32) {
    let [tl, tr, br, bl] = *q;
    let w = side(bl, br).max(side(tl, tr));
    let h = side(tr, br).max(side(tl, bl));
    (w as u32, h as u32)
}

/// Largest external contour of `binary` passing the area and vertex-count gates.
fn search_quad(
    binary: &GrayImage,
    min_area_frac: f64,
    epsilon_frac: f64,
    vertex_ok: impl Fn(usize) -> bool,
) -> Option<Quad> {
    let frame = binary.width() as f64 * binary.height() as f64;
    let mut candidates: Vec<(f64, Vec<Point<i32>>)> = find_contours::<i32>(binary)
        .into_iter()
        .filter(|c| c.parent.is_none())
        .map(|c| (polygon_area(&c.points), c.points))
        .filter(|(area, _)| *area >= frame * min_area_frac)
        .collect();
    candidates.sort_by(|a, b| b.0.total_cmp(&a.0));

    for (area, points) in candidates {
        let perimeter = arc_length(&points, true);
        let approx = approximate_closed_polygon(&points, epsilon_frac * perimeter);
        tracing::debug!(
            area,
            vertices = approx.len(),
            "page contour candidate"
        );
        if vertex_ok(approx.len()) {
            return order_corners(&approx);
        }
    }
    None
}

/// Find the page quadrilateral: edge pass first, Otsu fallback second.
pub(crate) fn find_page_quad(gray: &GrayImage, cfg: &NormalizeConfig) -> Option<Quad> {
    let enhanced = equalize_local(gray, cfg.page_clahe);
    let blurred = imageproc::filter::median_filter(&enhanced, cfg.median_radius, cfg.median_radius);

    let v = median_intensity(&blurred) as f32;
    let low = ((1.0 - cfg.canny_sigma) * v).max(0.0);
    let high = ((1.0 + cfg.canny_sigma) * v).min(255.0);
    let edges = imageproc::edges::canny(&blurred, low, high);
    if let Some(q) = search_quad(&edges, cfg.edge_min_area_frac, cfg.polygon_epsilon_frac, |n| {
        n == 4
    }) {
        return Some(q);
    }

    let isolated = dilate_iter(
        &otsu_binarize(&enhanced),
        cfg.fallback_dilate,
        cfg.fallback_dilate_iterations,
    );
    search_quad(
        &isolated,
        cfg.fallback_min_area_frac,
        cfg.polygon_epsilon_frac,
        |n| (4..=8).contains(&n),
    )
}

/// Map `quad` onto a `w` x `h` rectangle; pixels outside the source are white.
pub(crate) fn warp_page(rgb: &RgbImage, quad: &Quad, w: u32, h: u32) -> Option<RgbImage> {
    let corner = |p: [f64; 2]| (p[0] as f32, p[1] as f32);
    let from = [corner(quad[0]), corner(quad[1]), corner(quad[2]), corner(quad[3])];
    let (wf, hf) = (w as f32, h as f32);
    let to = [(0.0, 0.0), (wf, 0.0), (wf, hf), (0.0, hf)];
    let projection = Projection::from_control_points(from, to)?;
    let mut out = RgbImage::new(w, h);
    warp_into(rgb, &projection, Interpolation::Bilinear, Rgb([255, 255, 255]), &mut out);
    Some(out)
}

/// Flatten the page if a quad was found that does not already fill the frame.
pub(crate) fn rectify(rgb: &RgbImage, gray: &GrayImage, cfg: &NormalizeConfig) -> Option<RgbImage> {
    let Some(quad) = find_page_quad(gray, cfg) else {
        tracing::warn!("page boundary not found; using the image unwarped");
        return None;
    };
    let frame = rgb.width() as f64 * rgb.height() as f64;
    if quad_area(&quad) >= cfg.full_frame_ratio * frame {
        tracing::debug!("page already fills the frame; skipping warp");
        return None;
    }
    let (w, h) = rectified_size(&quad);
    if w < 2 || h < 2 {
        return None;
    }
    match warp_page(rgb, &quad, w, h) {
        Some(warped) => {
            tracing::info!(width = w, height = h, "page rectified");
            Some(warped)
        }
        None => {
            tracing::warn!("page corners are degenerate; using the image unwarped");
            None
        }
    }
}
