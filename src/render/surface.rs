//! Drawing surface abstraction.
//!
//! The host supplies anything that can fill and stroke circles and fill
//! radial gradients with source-over alpha compositing.

use glam::Vec2;

use crate::theme::Color;

/// One color stop of a radial gradient. `offset` runs from 0.0 at the
/// center to 1.0 at the rim.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    pub offset: f32,
    pub color: Color,
}

impl GradientStop {
    pub const fn new(offset: f32, color: Color) -> Self {
        Self { offset, color }
    }
}

/// Color of a gradient at `t` (0.0..=1.0), interpolating between the
/// surrounding stops. Stops must be sorted by offset.
pub fn sample_gradient(stops: &[GradientStop], t: f32) -> Color {
    let Some(first) = stops.first() else {
        return Color::TRANSPARENT;
    };
    if t <= first.offset {
        return first.color;
    }
    for pair in stops.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t <= b.offset {
            let span = (b.offset - a.offset).max(f32::EPSILON);
            return a.color.lerp(b.color, (t - a.offset) / span);
        }
    }
    stops[stops.len() - 1].color
}

/// 2D rasterizing target.
pub trait Surface {
    /// Width and height in pixels.
    fn size(&self) -> (u32, u32);

    /// Replace every pixel with `color`.
    fn clear(&mut self, color: Color);

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color);

    /// Stroke a circle outline of the given line width, centered on `radius`.
    fn stroke_circle(&mut self, center: Vec2, radius: f32, width: f32, color: Color);

    fn fill_radial_gradient(&mut self, center: Vec2, radius: f32, stops: &[GradientStop]);
}
