//! Contrast-limited adaptive histogram equalization (CLAHE).

use image::GrayImage;

/// Tile grid and clip limit for local equalization.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClaheParams {
    /// Histogram clip limit, relative to a uniform histogram.
    pub clip_limit: f32,
    /// Number of tiles along x.
    pub tiles_x: u32,
    /// Number of tiles along y.
    pub tiles_y: u32,
}

impl ClaheParams {
    pub const fn new(clip_limit: f32, tiles_x: u32, tiles_y: u32) -> Self {
        Self {
            clip_limit,
            tiles_x,
            tiles_y,
        }
    }
}

impl Default for ClaheParams {
    fn default() -> Self {
        Self::new(2.0, 8, 8)
    }
}

fn tile_lut(gray: &GrayImage, x0: u32, y0: u32, x1: u32, y1: u32, clip_limit: f32) -> [u8; 256] {
    let mut hist = [0f32; 256];
    for y in y0..y1 {
        for x in x0..x1 {
            hist[gray.get_pixel(x, y)[0] as usize] += 1.0;
        }
    }
    let n = ((x1 - x0) * (y1 - y0)) as f32;
    let mut lut = [0u8; 256];
    if n <= 0.0 {
        for (v, slot) in lut.iter_mut().enumerate() {
            *slot = v as u8;
        }
        return lut;
    }

    let clip = (clip_limit * n / 256.0).max(1.0);
    let mut excess = 0.0f32;
    for bin in hist.iter_mut() {
        if *bin > clip {
            excess += *bin - clip;
            *bin = clip;
        }
    }
    let bonus = excess / 256.0;

    let mut cdf = 0.0f32;
    for (v, slot) in lut.iter_mut().enumerate() {
        cdf += hist[v] + bonus;
        *slot = (cdf * 255.0 / n).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Equalize `gray` per tile and blend neighbouring tile mappings bilinearly.
pub fn equalize_local(gray: &GrayImage, params: ClaheParams) -> GrayImage {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return gray.clone();
    }
    let tx = params.tiles_x.clamp(1, w);
    let ty = params.tiles_y.clamp(1, h);
    let tile_w = w.div_ceil(tx);
    let tile_h = h.div_ceil(ty);

    let mut luts = Vec::with_capacity((tx * ty) as usize);
    for j in 0..ty {
        for i in 0..tx {
            let x0 = (i * tile_w).min(w);
            let y0 = (j * tile_h).min(h);
            let x1 = ((i + 1) * tile_w).min(w);
            let y1 = ((j + 1) * tile_h).min(h);
            luts.push(tile_lut(gray, x0, y0, x1, y1, params.clip_limit));
        }
    }

    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        let fy = (y as f32 + 0.5) / tile_h as f32 - 0.5;
        let j0 = fy.floor().clamp(0.0, (ty - 1) as f32) as u32;
        let j1 = (j0 + 1).min(ty - 1);
        let wy = (fy - j0 as f32).clamp(0.0, 1.0);
        for x in 0..w {
            let fx = (x as f32 + 0.5) / tile_w as f32 - 0.5;
            let i0 = fx.floor().clamp(0.0, (tx - 1) as f32) as u32;
            let i1 = (i0 + 1).min(tx - 1);
            let wx = (fx - i0 as f32).clamp(0.0, 1.0);

            let v = gray.get_pixel(x, y)[0] as usize;
            let at = |i: u32, j: u32| luts[(j * tx + i) as usize][v] as f32;
            let top = at(i0, j0) * (1.0 - wx) + at(i1, j0) * wx;
            let bottom = at(i0, j1) * (1.0 - wx) + at(i1, j1) * wx;
            let value = top * (1.0 - wy) + bottom * wy;
            out.put_pixel(x, y, image::Luma([value.round().clamp(0.0, 255.0) as u8]));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn white_paper_stays_white() {
        let mut gray = GrayImage::from_pixel(64, 64, Luma([255]));
        for y in 20..40 {
            gray.put_pixel(30, y, Luma([0]));
        }
        let out = equalize_local(&gray, ClaheParams::default());
        assert_eq!(out.get_pixel(5, 5)[0], 255);
        assert!(out.get_pixel(30, 30)[0] < 40);
    }

    #[test]
    fn low_contrast_gradient_is_stretched() {
        let mut gray = GrayImage::new(64, 64);
        for y in 0..64 {
            for x in 0..64 {
                gray.put_pixel(x, y, Luma([100 + (x / 8) as u8]));
            }
        }
        let out = equalize_local(&gray, ClaheParams::new(40.0, 1, 1));
        let lo = out.get_pixel(0, 0)[0];
        let hi = out.get_pixel(63, 0)[0];
        assert!(hi as i32 - lo as i32 > 100, "lo={} hi={}", lo, hi);
    }
}
