use image::{Rgba, RgbaImage};
use imageproc::drawing::{BresenhamLineIter, draw_filled_circle_mut, draw_line_segment_mut};

use crate::{
    error::Result,
    io::{PNG_MIME, encode_png, to_data_url},
    types::{Brush, ImageDimensions, Point},
};

/// Destination-out with an opaque source leaves nothing behind
pub const ERASED: Rgba<u8> = Rgba([0, 0, 0, 0]);
pub const OPAQUE: Rgba<u8> = Rgba([0, 0, 0, 255]);

const CHECKER_TILE: u32 = 8;
const CHECKER_LIGHT: Rgba<u8> = Rgba([255, 255, 255, 255]);
const CHECKER_DARK: Rgba<u8> = Rgba([204, 204, 204, 255]);

/// Pixel buffer laid over a normalized image.
///
/// Starts fully opaque; strokes punch transparent holes into it. Pixels outside
/// the buffer are clipped.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskOverlay {
    pixels: RgbaImage,
}

impl MaskOverlay {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::from_pixel(width, height, OPAQUE),
        }
    }

    pub fn dimensions(&self) -> ImageDimensions {
        ImageDimensions {
            width: self.pixels.width(),
            height: self.pixels.height(),
        }
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Alpha at `(x, y)`, or `None` outside the buffer
    pub fn alpha_at(&self, x: u32, y: u32) -> Option<u8> {
        self.pixels.get_pixel_checked(x, y).map(|pixel| pixel[3])
    }

    /// Erase along the segment `from` -> `to` with the given brush.
    ///
    /// The segment is clipped to the buffer grown by the brush radius before it
    /// is rasterized. Non-finite points paint nothing.
    pub fn erase_segment(&mut self, from: Point, to: Point, brush: &Brush) {
        let radius = brush.radius();
        let pad = f64::from(radius) + 1.0;
        let min = (-pad, -pad);
        let max = (
            f64::from(self.pixels.width()) - 1.0 + pad,
            f64::from(self.pixels.height()) - 1.0 + pad,
        );
        let Some((from, to)) = clip_segment(from, to, min, max) else {
            return;
        };

        if radius == 0 {
            draw_line_segment_mut(&mut self.pixels, from.as_tuple(), to.as_tuple(), ERASED);
            return;
        }

        for (x, y) in BresenhamLineIter::new(from.as_tuple(), to.as_tuple()) {
            draw_filled_circle_mut(&mut self.pixels, (x, y), radius, ERASED);
        }
    }

    pub fn erased_pixel_count(&self) -> usize {
        self.pixels.pixels().filter(|pixel| pixel[3] == 0).count()
    }

    /// True while no stroke has touched a pixel
    pub fn is_untouched(&self) -> bool {
        self.pixels.pixels().all(|pixel| pixel[3] == 255)
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        encode_png(&self.pixels)
    }

    pub fn to_data_url(&self) -> Result<String> {
        Ok(to_data_url(&self.encode_png()?, PNG_MIME))
    }

    /// Copy of `image` carrying the overlay's alpha channel.
    ///
    /// Transparent pixels mark the region the edit endpoint may repaint.
    pub fn apply_to(&self, image: &RgbaImage) -> RgbaImage {
        let mut masked = image.clone();
        for (x, y, pixel) in masked.enumerate_pixels_mut() {
            if let Some(alpha) = self.alpha_at(x, y) {
                pixel[3] = pixel[3].min(alpha);
            }
        }
        masked
    }

    /// Render `image` with erased pixels showing a checkerboard beneath
    pub fn preview(&self, image: &RgbaImage) -> RgbaImage {
        RgbaImage::from_fn(image.width(), image.height(), |x, y| {
            let checker = if ((x / CHECKER_TILE) + (y / CHECKER_TILE)) % 2 == 0 {
                CHECKER_LIGHT
            } else {
                CHECKER_DARK
            };
            let alpha = self.alpha_at(x, y).unwrap_or(255) as u32;
            let source = image.get_pixel(x, y);
            let mut out = checker;
            for channel in 0..3 {
                out[channel] = ((source[channel] as u32 * alpha
                    + checker[channel] as u32 * (255 - alpha))
                    / 255) as u8;
            }
            out
        })
    }
}

/// Liang-Barsky clip of `from` -> `to` against the box `min..=max`.
///
/// Returns `None` when the segment misses the box or an endpoint is not finite.
/// Endpoints already inside the box are returned untouched.
fn clip_segment(from: Point, to: Point, min: (f64, f64), max: (f64, f64)) -> Option<(Point, Point)> {
    if !from.is_finite() || !to.is_finite() {
        return None;
    }

    let (x0, y0) = (f64::from(from.x), f64::from(from.y));
    let (dx, dy) = (f64::from(to.x) - x0, f64::from(to.y) - y0);
    let (mut enter, mut exit) = (0.0_f64, 1.0_f64);

    for (p, q) in [(-dx, x0 - min.0), (dx, max.0 - x0), (-dy, y0 - min.1), (dy, max.1 - y0)] {
        if p == 0.0 {
            // Parallel to this edge and outside it
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            if t > exit {
                return None;
            }
            enter = enter.max(t);
        } else {
            if t < enter {
                return None;
            }
            exit = exit.min(t);
        }
    }

    let at = |t: f64| {
        Point::new(
            (x0 + t * dx).clamp(min.0, max.0) as f32,
            (y0 + t * dy).clamp(min.1, max.1) as f32,
        )
    };
    let start = if enter > 0.0 { at(enter) } else { from };
    let end = if exit < 1.0 { at(exit) } else { to };
    Some((start, end))
}
