//! Synthetic test sheets for pipeline-level unit tests.
//!
//! A sheet is a white page with an optional ruled separator, a grid of
//! vertical strokes and optional delimiter marks, header scribbles or
//! extra ink. Everything random is seeded.

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub(crate) const PAPER: Rgb<u8> = Rgb([250, 250, 248]);
pub(crate) const PEN: Rgb<u8> = Rgb([25, 25, 40]);

/// Layout of a synthetic test sheet.
#[derive(Debug, Clone)]
pub(crate) struct SheetFixture {
    pub width: u32,
    pub height: u32,
    /// Top row of a 3 px ruled separator spanning 90% of the width.
    pub separator_y: Option<u32>,
    pub rows: u32,
    pub cols: u32,
    pub stroke_width: u32,
    pub stroke_height: u32,
    pub first_x: u32,
    pub pitch_x: u32,
    pub first_row_center: u32,
    pub row_pitch: u32,
    /// Draw a delimiter mark after the last stroke of every row but the last.
    pub marks: bool,
    /// Number of random scribbles in the header band (y 90..170).
    pub scribbles: usize,
    pub seed: u64,
    /// Extra filled rectangles `[x, y, w, h]`.
    pub extra_ink: Vec<[u32; 4]>,
}

impl Default for SheetFixture {
    fn default() -> Self {
        Self {
            width: 700,
            height: 990,
            separator_y: Some(209),
            rows: 5,
            cols: 20,
            stroke_width: 3,
            stroke_height: 42,
            first_x: 70,
            pitch_x: 28,
            first_row_center: 280,
            row_pitch: 105,
            marks: false,
            scribbles: 0,
            seed: 1,
            extra_ink: Vec::new(),
        }
    }
}

fn fill(img: &mut RgbImage, x: u32, y: u32, w: u32, h: u32) {
    draw_filled_rect_mut(img, Rect::at(x as i32, y as i32).of_size(w, h), PEN);
}

impl SheetFixture {
    /// Pixel at the middle of stroke `(row, col)`.
    pub fn stroke_center(&self, row: u32, col: u32) -> (u32, u32) {
        (
            self.first_x + col * self.pitch_x + self.stroke_width / 2,
            self.first_row_center + row * self.row_pitch,
        )
    }

    /// Bounding box `[x, y, w, h]` of the delimiter mark closing `row`.
    pub fn mark_rect(&self, row: u32) -> [u32; 4] {
        let last = self.first_x + self.cols.saturating_sub(1) * self.pitch_x;
        let x = last + self.stroke_width + 8;
        let y = self.first_row_center + row * self.row_pitch - 3;
        [x, y, 45, 6]
    }

    pub fn render(&self) -> RgbImage {
        let mut img = RgbImage::from_pixel(self.width, self.height, PAPER);
        if let Some(y) = self.separator_y {
            let x0 = self.width / 20;
            fill(&mut img, x0, y, self.width - 2 * x0, 3);
        }
        for r in 0..self.rows {
            for c in 0..self.cols {
                let (cx, cy) = self.stroke_center(r, c);
                fill(
                    &mut img,
                    cx - self.stroke_width / 2,
                    cy - self.stroke_height / 2,
                    self.stroke_width,
                    self.stroke_height,
                );
            }
        }
        if self.marks {
            for r in 0..self.rows.saturating_sub(1) {
                let [x, y, w, h] = self.mark_rect(r);
                fill(&mut img, x, y, w, h);
            }
        }
        let mut rng = StdRng::seed_from_u64(self.seed);
        for _ in 0..self.scribbles {
            draw_scribble(&mut img, &mut rng);
        }
        for &[x, y, w, h] in &self.extra_ink {
            fill(&mut img, x, y, w, h);
        }
        img
    }
}

/// A short zig-zag, under 100 px wide, thickened to 3 px.
fn draw_scribble(img: &mut RgbImage, rng: &mut StdRng) {
    let x0 = rng.gen_range(60.0f32..560.0);
    let mut p = (x0, rng.gen_range(95.0f32..165.0));
    for _ in 0..4 {
        let q = (
            rng.gen_range(x0..x0 + 90.0),
            rng.gen_range(90.0f32..170.0),
        );
        for dx in 0..3 {
            let o = dx as f32;
            draw_line_segment_mut(img, (p.0 + o, p.1), (q.0 + o, q.1), PEN);
        }
        p = q;
    }
}

/// Uniform per-pixel noise.
pub(crate) fn noise_image(width: u32, height: u32, seed: u64) -> RgbImage {
    let mut rng = StdRng::seed_from_u64(seed);
    RgbImage::from_fn(width, height, |_, _| {
        let v: u8 = rng.gen();
        Rgb([v, v, v])
    })
}

pub(crate) fn encode_png(img: &RgbImage) -> Vec<u8> {
    let mut buf = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img.clone())
        .write_to(&mut buf, image::ImageFormat::Png)
        .expect("png encode");
    buf.into_inner()
}
