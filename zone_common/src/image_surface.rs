//! Raster overlay backend: paints zones over a still frame with `imageproc`.

use ab_glyph::{FontArc, PxScale};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut, text_size};

use crate::geometry::Rect;
use crate::overlay::{parse_color, OverlaySurface, LABEL_FONT_PX};

/// Overlay surface backed by a copy of the media frame. `clear` restores the frame.
pub struct ImageSurface {
    base: RgbaImage,
    canvas: RgbaImage,
    font: Option<FontArc>,
}

impl ImageSurface {
    pub fn new(frame: RgbaImage) -> Self {
        Self {
            canvas: frame.clone(),
            base: frame,
            font: None,
        }
    }

    /// Labels are only drawn when a font is available.
    pub fn with_font(mut self, font: FontArc) -> Self {
        self.font = Some(font);
        self
    }

    pub fn image(&self) -> &RgbaImage {
        &self.canvas
    }

    pub fn into_image(self) -> RgbaImage {
        self.canvas
    }

    /// Integer pixel span of `rect`, clipped to the canvas.
    fn clip(&self, rect: Rect) -> Option<(u32, u32, u32, u32)> {
        let (w, h) = self.canvas.dimensions();
        let x0 = rect.x.floor().max(0.0) as u32;
        let y0 = rect.y.floor().max(0.0) as u32;
        let x1 = ((rect.x + rect.width).ceil().max(0.0) as u32).min(w);
        let y1 = ((rect.y + rect.height).ceil().max(0.0) as u32).min(h);
        (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
    }
}

fn blend(dst: &mut Rgba<u8>, src: [u8; 4]) {
    let a = src[3] as u32;
    for i in 0..3 {
        dst.0[i] = ((src[i] as u32 * a + dst.0[i] as u32 * (255 - a)) / 255) as u8;
    }
}

impl OverlaySurface for ImageSurface {
    fn clear(&mut self) {
        self.canvas.clone_from(&self.base);
    }

    fn fill_rect(&mut self, rect: Rect, color: &str) {
        let Some(rgba) = parse_color(color) else {
            tracing::debug!(color, "unsupported fill color");
            return;
        };
        let Some((x0, y0, x1, y1)) = self.clip(rect) else {
            return;
        };
        for y in y0..y1 {
            for x in x0..x1 {
                blend(self.canvas.get_pixel_mut(x, y), rgba);
            }
        }
    }

    fn stroke_rect(&mut self, rect: Rect, color: &str, thickness: u32) {
        let Some(rgba) = parse_color(color) else {
            tracing::debug!(color, "unsupported stroke color");
            return;
        };
        // Stroke is centered on the rectangle edge.
        let half = thickness as i32 / 2;
        for t in 0..thickness.max(1) as i32 {
            let inset = t - half;
            let w = rect.width.round() as i32 - 2 * inset;
            let h = rect.height.round() as i32 - 2 * inset;
            if w <= 0 || h <= 0 {
                break;
            }
            let r = imageproc::rect::Rect::at(rect.x.round() as i32 + inset, rect.y.round() as i32 + inset)
                .of_size(w as u32, h as u32);
            draw_hollow_rect_mut(&mut self.canvas, r, Rgba(rgba));
        }
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64, color: &str) {
        let (Some(font), Some(rgba)) = (self.font.as_ref(), parse_color(color)) else {
            return;
        };
        let scale = PxScale::from(LABEL_FONT_PX);
        let (_, text_h) = text_size(scale, font, text);
        let top = y.round() as i32 - text_h as i32;
        draw_text_mut(&mut self.canvas, Rgba(rgba), x.round() as i32, top, scale, font, text);
    }
}
