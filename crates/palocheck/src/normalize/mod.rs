//! Image normalization: page flattening, luminance balancing and the binary
//! ink mask consumed by every later stage.

mod page;

use image::{DynamicImage, GrayImage, RgbImage};

use crate::error::ImageDecodeError;
use crate::imaging::{
    adaptive_threshold_inv, close, dilate_iter, equalize_local, open, ClaheParams, RectKernel,
};

/// Page-rectification and ink-mask parameters.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Search for the page boundary and flatten it.
    pub rectify: bool,
    /// Local equalization applied before the page boundary search.
    pub page_clahe: ClaheParams,
    /// Median blur radius (pixels) before edge detection.
    pub median_radius: u32,
    /// Relative spread of the Canny thresholds around the image median.
    pub canny_sigma: f32,
    /// Minimum page contour area (fraction of frame) in the edge pass.
    pub edge_min_area_frac: f64,
    /// Minimum page contour area (fraction of frame) in the Otsu fallback pass.
    pub fallback_min_area_frac: f64,
    /// Dilation kernel used to merge the paper region in the fallback pass.
    pub fallback_dilate: RectKernel,
    pub fallback_dilate_iterations: u32,
    /// Polygon approximation tolerance as a fraction of contour perimeter.
    pub polygon_epsilon_frac: f64,
    /// Quads covering at least this fraction of the frame are not warped.
    pub full_frame_ratio: f64,
    /// Local equalization producing the balanced grayscale view.
    pub mask_clahe: ClaheParams,
    /// Adaptive threshold block size (odd, pixels).
    pub threshold_block: u32,
    /// Offset below the local mean for a pixel to count as ink.
    pub threshold_c: f32,
    /// Speckle removal.
    pub open_kernel: RectKernel,
    /// Gap healing.
    pub close_kernel: RectKernel,
    /// Vertical bridging of fragmented strokes.
    pub bridge_kernel: RectKernel,
    pub bridge_iterations: u32,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            rectify: true,
            page_clahe: ClaheParams::new(3.0, 10, 10),
            median_radius: 2,
            canny_sigma: 0.33,
            edge_min_area_frac: 0.10,
            fallback_min_area_frac: 0.15,
            fallback_dilate: RectKernel::square(5),
            fallback_dilate_iterations: 2,
            polygon_epsilon_frac: 0.02,
            full_frame_ratio: 0.98,
            mask_clahe: ClaheParams::new(2.0, 8, 8),
            threshold_block: 21,
            threshold_c: 8.0,
            open_kernel: RectKernel::square(2),
            close_kernel: RectKernel::square(3),
            bridge_kernel: RectKernel::vertical(3),
            bridge_iterations: 2,
        }
    }
}

/// Three pixel-aligned views of the flattened page.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    /// Flattened color page.
    pub rectified: RgbImage,
    /// Luminance-balanced grayscale of `rectified`.
    pub gray: GrayImage,
    /// Binary ink mask (`255` = ink).
    pub mask: GrayImage,
}

impl NormalizedImage {
    pub fn width(&self) -> u32 {
        self.gray.width()
    }

    pub fn height(&self) -> u32 {
        self.gray.height()
    }
}

/// Decode `bytes` and normalize the resulting page.
pub fn normalize(bytes: &[u8], cfg: &NormalizeConfig) -> Result<NormalizedImage, ImageDecodeError> {
    let img = image::load_from_memory(bytes)?;
    normalize_image(&img, cfg)
}

/// Normalize an already decoded page.
pub fn normalize_image(
    img: &DynamicImage,
    cfg: &NormalizeConfig,
) -> Result<NormalizedImage, ImageDecodeError> {
    let (width, height) = (img.width(), img.height());
    if width == 0 || height == 0 {
        return Err(ImageDecodeError::EmptyImage { width, height });
    }

    let rgb = img.to_rgb8();
    let rectified = if cfg.rectify {
        let raw_gray = image::imageops::grayscale(&rgb);
        page::rectify(&rgb, &raw_gray, cfg).unwrap_or(rgb)
    } else {
        rgb
    };

    let gray = equalize_local(&image::imageops::grayscale(&rectified), cfg.mask_clahe);
    let mask = build_ink_mask(&gray, cfg);
    tracing::info!(
        width = gray.width(),
        height = gray.height(),
        "page normalized"
    );
    Ok(NormalizedImage {
        rectified,
        gray,
        mask,
    })
}

/// Adaptive inverted threshold, then open, close and vertical bridging.
pub fn build_ink_mask(gray: &GrayImage, cfg: &NormalizeConfig) -> GrayImage {
    let thresh = adaptive_threshold_inv(gray, cfg.threshold_block, cfg.threshold_c);
    let cleaned = close(&open(&thresh, cfg.open_kernel), cfg.close_kernel);
    dilate_iter(&cleaned, cfg.bridge_kernel, cfg.bridge_iterations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::INK;
    use crate::test_utils::{encode_png, SheetFixture};

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = normalize(b"definitely not an image", &NormalizeConfig::default())
            .expect_err("must fail");
        assert!(matches!(err, ImageDecodeError::Undecodable(_)));
    }

    #[test]
    fn full_frame_sheet_keeps_its_geometry() {
        let sheet = SheetFixture::default().render();
        let bytes = encode_png(&sheet);
        let n = normalize(&bytes, &NormalizeConfig::default()).expect("normalize");
        assert_eq!((n.width(), n.height()), sheet.dimensions());
        assert_eq!(n.rectified.dimensions(), sheet.dimensions());

        // First stroke column, middle of the first row.
        let fixture = SheetFixture::default();
        let (x, y) = fixture.stroke_center(0, 0);
        assert_eq!(n.mask.get_pixel(x, y)[0], INK);
        assert_eq!(n.mask.get_pixel(x + 10, y)[0], 0);
    }

    #[test]
    fn mask_bridges_short_vertical_gaps() {
        let mut gray = GrayImage::from_pixel(60, 80, image::Luma([240]));
        for y in (10..30).chain(33..60) {
            for x in 28..31 {
                gray.put_pixel(x, y, image::Luma([15]));
            }
        }
        let mask = build_ink_mask(&gray, &NormalizeConfig::default());
        assert!((30..33).all(|y| mask.get_pixel(29, y)[0] == INK));
    }
}
