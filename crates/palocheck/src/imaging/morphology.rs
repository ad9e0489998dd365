//! Rectangular structuring elements over `imageproc::morphology`.
//!
//! Binary masks only hold `0` and `255`, so grayscale min/max morphology is
//! exact binary morphology. Pixels outside the image are ignored, so borders
//! neither erode nor grow blobs.

use image::GrayImage;
use imageproc::morphology::{grayscale_dilate, grayscale_erode, Mask};

use super::INK;

/// Side length limit of `imageproc` masks.
const MAX_SIDE: u32 = 511;

/// Rectangular structuring element, anchored at `(width / 2, height / 2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RectKernel {
    pub width: u32,
    pub height: u32,
}

impl RectKernel {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn square(size: u32) -> Self {
        Self::new(size, size)
    }

    /// One pixel wide, `height` tall.
    pub const fn vertical(height: u32) -> Self {
        Self::new(1, height)
    }

    fn sides(self) -> (u32, u32) {
        (
            self.width.clamp(1, MAX_SIDE),
            self.height.clamp(1, MAX_SIDE),
        )
    }

    /// Mask for erosion, anchored at the kernel center.
    fn erosion_mask(self) -> Mask {
        let (w, h) = self.sides();
        Mask::from_image(
            &GrayImage::from_pixel(w, h, image::Luma([INK])),
            (w / 2) as u8,
            (h / 2) as u8,
        )
    }

    /// Reflected mask for dilation, so `open`/`close` do not shift blobs for
    /// even kernel sizes.
    fn dilation_mask(self) -> Mask {
        let (w, h) = self.sides();
        Mask::from_image(
            &GrayImage::from_pixel(w, h, image::Luma([INK])),
            (w - 1 - w / 2) as u8,
            (h - 1 - h / 2) as u8,
        )
    }
}

fn is_empty(img: &GrayImage) -> bool {
    img.width() == 0 || img.height() == 0
}

pub fn erode(img: &GrayImage, k: RectKernel) -> GrayImage {
    if is_empty(img) {
        return img.clone();
    }
    grayscale_erode(img, &k.erosion_mask())
}

pub fn dilate(img: &GrayImage, k: RectKernel) -> GrayImage {
    if is_empty(img) {
        return img.clone();
    }
    grayscale_dilate(img, &k.dilation_mask())
}

/// Repeated dilation (`iterations == 0` returns a copy).
pub fn dilate_iter(img: &GrayImage, k: RectKernel, iterations: u32) -> GrayImage {
    if is_empty(img) || iterations == 0 {
        return img.clone();
    }
    let mask = k.dilation_mask();
    let mut out = grayscale_dilate(img, &mask);
    for _ in 1..iterations {
        out = grayscale_dilate(&out, &mask);
    }
    out
}

/// Erosion followed by dilation: removes features smaller than the kernel.
pub fn open(img: &GrayImage, k: RectKernel) -> GrayImage {
    dilate(&erode(img, k), k)
}

/// Dilation followed by erosion: heals gaps smaller than the kernel.
pub fn close(img: &GrayImage, k: RectKernel) -> GrayImage {
    erode(&dilate(img, k), k)
}
