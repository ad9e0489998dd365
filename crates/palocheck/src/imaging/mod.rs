//! Raster primitives shared by the pipeline stages.
//!
//! Binary masks are `GrayImage`s holding only `0` (paper) and `255` (ink).

mod clahe;
mod morphology;
mod threshold;

pub use clahe::{equalize_local, ClaheParams};
pub use morphology::{close, dilate_iter, open, RectKernel};
pub use threshold::{adaptive_threshold_inv, otsu_binarize};

use image::GrayImage;
use imageproc::point::Point;

/// Value stored for ink pixels in binary masks.
pub const INK: u8 = 255;

/// Axis-aligned pixel window `[x, x + width) × [y, y + height)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Window {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Clip the window to an image of the given size.
    pub fn clipped(self, img_w: u32, img_h: u32) -> Self {
        let x = self.x.min(img_w);
        let y = self.y.min(img_h);
        let width = self.width.min(img_w - x);
        let height = self.height.min(img_h - y);
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Per-row ink counts of `mask` inside `win`, one entry per window row.
pub fn row_ink_counts(mask: &GrayImage, win: Window) -> Vec<u32> {
    let win = win.clipped(mask.width(), mask.height());
    (win.y..win.y + win.height)
        .map(|y| {
            (win.x..win.x + win.width)
                .filter(|&x| mask.get_pixel(x, y)[0] == INK)
                .count() as u32
        })
        .collect()
}

/// Fraction of ink pixels of `mask` inside `win` (0 for an empty window).
pub fn ink_fraction(mask: &GrayImage, win: Window) -> f64 {
    let win = win.clipped(mask.width(), mask.height());
    if win.area() == 0 {
        return 0.0;
    }
    let ink: u64 = row_ink_counts(mask, win).iter().map(|&c| c as u64).sum();
    ink as f64 / win.area() as f64
}

/// Keep only the pixels of `mask` inside `win`; everything else becomes paper.
pub fn mask_to_window(mask: &GrayImage, win: Window) -> GrayImage {
    let win = win.clipped(mask.width(), mask.height());
    let mut out = GrayImage::new(mask.width(), mask.height());
    for y in win.y..win.y + win.height {
        for x in win.x..win.x + win.width {
            out.put_pixel(x, y, *mask.get_pixel(x, y));
        }
    }
    out
}

/// Shoelace area of a closed polygon given by its vertices.
pub fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice = 0i64;
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        twice += p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64;
    }
    twice.abs() as f64 / 2.0
}

/// Median intensity of a grayscale image (upper median for even counts).
pub fn median_intensity(gray: &GrayImage) -> u8 {
    let mut hist = [0u64; 256];
    for p in gray.pixels() {
        hist[p[0] as usize] += 1;
    }
    let half = (gray.width() as u64 * gray.height() as u64) / 2;
    let mut acc = 0u64;
    for (v, &count) in hist.iter().enumerate() {
        acc += count;
        if acc > half {
            return v as u8;
        }
    }
    255
}

/// Mark pixels darker than `level` as ink.
pub fn ink_below(gray: &GrayImage, level: u8) -> GrayImage {
    let mut out = GrayImage::new(gray.width(), gray.height());
    for (dst, src) in out.pixels_mut().zip(gray.pixels()) {
        if src[0] < level {
            dst[0] = INK;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn window_clipping_stays_inside_image() {
        let w = Window::new(8, 5, 10, 10).clipped(12, 9);
        assert_eq!(w, Window::new(8, 5, 4, 4));
        let outside = Window::new(20, 20, 3, 3).clipped(12, 9);
        assert_eq!(outside.area(), 0);
    }

    #[test]
    fn ink_fraction_counts_only_window() {
        let mut mask = GrayImage::new(10, 10);
        for x in 0..10 {
            mask.put_pixel(x, 0, Luma([INK]));
        }
        assert!((ink_fraction(&mask, Window::new(0, 0, 10, 2)) - 0.5).abs() < 1e-12);
        assert_eq!(ink_fraction(&mask, Window::new(0, 1, 10, 9)), 0.0);
        assert_eq!(row_ink_counts(&mask, Window::new(2, 0, 3, 2)), vec![3, 0]);
    }

    #[test]
    fn polygon_area_of_rectangle() {
        let pts = [
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(10, 4),
            Point::new(0, 4),
        ];
        assert_eq!(polygon_area(&pts), 40.0);
        assert_eq!(polygon_area(&pts[..2]), 0.0);
    }

    #[test]
    fn median_of_mostly_white_image_is_white() {
        let mut gray = GrayImage::from_pixel(10, 10, Luma([250]));
        for x in 0..10 {
            gray.put_pixel(x, 0, Luma([3]));
        }
        assert_eq!(median_intensity(&gray), 250);
    }

    #[test]
    fn masking_to_window_clears_outside() {
        let mut mask = GrayImage::new(6, 6);
        mask.put_pixel(0, 0, Luma([INK]));
        mask.put_pixel(3, 3, Luma([INK]));
        let out = mask_to_window(&mask, Window::new(2, 2, 3, 3));
        assert_eq!(out.get_pixel(0, 0)[0], 0);
        assert_eq!(out.get_pixel(3, 3)[0], INK);
    }
}
