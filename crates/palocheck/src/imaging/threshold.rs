use image::GrayImage;

use super::INK;

/// Summed-area table with a zero guard row/column: `(w + 1) * (h + 1)` entries.
fn integral(gray: &GrayImage) -> Vec<u64> {
    let (w, h) = gray.dimensions();
    let stride = w as usize + 1;
    let mut sat = vec![0u64; stride * (h as usize + 1)];
    for y in 0..h as usize {
        let mut row_acc = 0u64;
        for x in 0..w as usize {
            row_acc += gray.get_pixel(x as u32, y as u32)[0] as u64;
            sat[(y + 1) * stride + x + 1] = sat[y * stride + x + 1] + row_acc;
        }
    }
    sat
}

/// Inverted adaptive threshold against the local mean.
///
/// A pixel becomes ink when it is at most `mean - c`, where `mean` is taken
/// over the `block_size × block_size` neighbourhood clipped to the image.
/// `block_size` is forced odd.
pub fn adaptive_threshold_inv(gray: &GrayImage, block_size: u32, c: f32) -> GrayImage {
    let (w, h) = gray.dimensions();
    let mut out = GrayImage::new(w, h);
    if w == 0 || h == 0 {
        return out;
    }
    let r = (block_size.max(3) | 1) as i64 / 2;
    let sat = integral(gray);
    let stride = w as usize + 1;

    for y in 0..h as i64 {
        let y0 = (y - r).max(0) as usize;
        let y1 = (y + r).min(h as i64 - 1) as usize + 1;
        for x in 0..w as i64 {
            let x0 = (x - r).max(0) as usize;
            let x1 = (x + r).min(w as i64 - 1) as usize + 1;
            let sum = sat[y1 * stride + x1] + sat[y0 * stride + x0]
                - sat[y0 * stride + x1]
                - sat[y1 * stride + x0];
            let n = ((y1 - y0) * (x1 - x0)) as f32;
            let mean = sum as f32 / n;
            let v = gray.get_pixel(x as u32, y as u32)[0] as f32;
            if v <= mean - c {
                out.put_pixel(x as u32, y as u32, image::Luma([INK]));
            }
        }
    }
    out
}

/// Global Otsu binarization; pixels brighter than the Otsu level become `255`.
pub fn otsu_binarize(gray: &GrayImage) -> GrayImage {
    let level = imageproc::contrast::otsu_level(gray);
    let mut out = GrayImage::new(gray.width(), gray.height());
    for (dst, src) in out.pixels_mut().zip(gray.pixels()) {
        if src[0] > level {
            dst[0] = 255;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn dark_line_on_paper_becomes_ink() {
        let mut gray = GrayImage::from_pixel(60, 60, Luma([240]));
        for y in 10..50 {
            for x in 30..33 {
                gray.put_pixel(x, y, Luma([20]));
            }
        }
        let mask = adaptive_threshold_inv(&gray, 21, 8.0);
        assert_eq!(mask.get_pixel(31, 30)[0], INK);
        assert_eq!(mask.get_pixel(5, 5)[0], 0);
        assert_eq!(mask.get_pixel(34, 30)[0], 0);
    }

    #[test]
    fn flat_image_has_no_ink() {
        let gray = GrayImage::from_pixel(30, 30, Luma([128]));
        let mask = adaptive_threshold_inv(&gray, 21, 8.0);
        assert!(mask.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn integral_matches_brute_force_sum() {
        let mut gray = GrayImage::new(5, 4);
        for (i, p) in gray.pixels_mut().enumerate() {
            p[0] = (i * 7 % 251) as u8;
        }
        let sat = integral(&gray);
        let total: u64 = gray.pixels().map(|p| p[0] as u64).sum();
        assert_eq!(sat[4 * 6 + 5], total);
    }

    #[test]
    fn otsu_separates_bimodal_image() {
        let mut gray = GrayImage::from_pixel(20, 20, Luma([230]));
        for y in 0..10 {
            for x in 0..20 {
                gray.put_pixel(x, y, Luma([25]));
            }
        }
        let bin = otsu_binarize(&gray);
        assert_eq!(bin.get_pixel(0, 0)[0], 0);
        assert_eq!(bin.get_pixel(0, 19)[0], 255);
    }
}
