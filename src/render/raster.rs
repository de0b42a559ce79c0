//! Software surface backed by an RGBA image.
//!
//! Shapes are anti-aliased by pixel coverage against the analytic circle
//! edge and composited source-over in straight (non-premultiplied) alpha.

use glam::Vec2;
use image::{Rgba, RgbaImage};

use super::surface::{GradientStop, Surface, sample_gradient};
use crate::theme::Color;

pub struct RasterSurface {
    image: RgbaImage,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Raw RGBA bytes, row-major.
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        (x < self.width() && y < self.height()).then(|| self.image.get_pixel(x, y).0)
    }

    /// Resize, discarding contents.
    pub fn resize(&mut self, width: u32, height: u32) {
        if (width, height) != (self.width(), self.height()) {
            self.image = RgbaImage::new(width, height);
        }
    }

    /// Composite `color` at `coverage` onto one pixel.
    fn blend(&mut self, x: u32, y: u32, color: Color, coverage: f32) {
        let src_a = (color.a * coverage).clamp(0.0, 1.0);
        if src_a <= 0.0 {
            return;
        }
        let pixel = self.image.get_pixel_mut(x, y);
        let [dr, dg, db, da] = pixel.0.map(|channel| channel as f32 / 255.0);

        let out_a = src_a + da * (1.0 - src_a);
        let mix = |src: f32, dst: f32| {
            if out_a <= 0.0 {
                0.0
            } else {
                (src * src_a + dst * da * (1.0 - src_a)) / out_a
            }
        };

        let blended = Color::rgba(mix(color.r, dr), mix(color.g, dg), mix(color.b, db), out_a);
        *pixel = Rgba(blended.to_rgba8());
    }

    /// Visit pixels inside the bounding square of a circle of `reach` around
    /// `center`, passing the distance from the pixel center.
    fn for_each_in_reach<F>(&mut self, center: Vec2, reach: f32, mut shade: F)
    where
        F: FnMut(&mut Self, u32, u32, f32),
    {
        if reach <= 0.0 || !reach.is_finite() || !center.is_finite() {
            return;
        }
        let (width, height) = (self.width() as i64, self.height() as i64);
        let min_x = ((center.x - reach).floor() as i64).max(0);
        let max_x = ((center.x + reach).ceil() as i64).min(width - 1);
        let min_y = ((center.y - reach).floor() as i64).max(0);
        let max_y = ((center.y + reach).ceil() as i64).min(height - 1);

        for py in min_y..=max_y {
            for px in min_x..=max_x {
                let dx = px as f32 + 0.5 - center.x;
                let dy = py as f32 + 0.5 - center.y;
                let distance = (dx * dx + dy * dy).sqrt();
                shade(self, px as u32, py as u32, distance);
            }
        }
    }
}

impl Surface for RasterSurface {
    fn size(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    fn clear(&mut self, color: Color) {
        let value = Rgba(color.to_rgba8());
        for pixel in self.image.pixels_mut() {
            *pixel = value;
        }
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color) {
        self.for_each_in_reach(center, radius + 1.0, |surface, x, y, distance| {
            let coverage = (radius + 0.5 - distance).clamp(0.0, 1.0);
            if coverage > 0.0 {
                surface.blend(x, y, color, coverage);
            }
        });
    }

    fn stroke_circle(&mut self, center: Vec2, radius: f32, width: f32, color: Color) {
        let half = width.max(0.0) * 0.5;
        self.for_each_in_reach(center, radius + half + 1.0, |surface, x, y, distance| {
            let coverage = (half + 0.5 - (distance - radius).abs()).clamp(0.0, 1.0);
            if coverage > 0.0 {
                surface.blend(x, y, color, coverage);
            }
        });
    }

    fn fill_radial_gradient(&mut self, center: Vec2, radius: f32, stops: &[GradientStop]) {
        if stops.is_empty() {
            return;
        }
        self.for_each_in_reach(center, radius + 1.0, |surface, x, y, distance| {
            let coverage = (radius + 0.5 - distance).clamp(0.0, 1.0);
            if coverage > 0.0 {
                let color = sample_gradient(stops, distance / radius.max(f32::EPSILON));
                surface.blend(x, y, color, coverage);
            }
        });
    }
}
