//! Visual themes for bubbles and pop particles.
//!
//! A theme is a palette plus exactly one decoration effect. The effect set is
//! closed so the renderer can match on it exhaustively.

use serde::{Deserialize, Serialize};

/// Linear RGBA color with components in 0.0..=1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Build from 8-bit sRGB-ish components (no gamma conversion).
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self {
            a: a.clamp(0.0, 1.0),
            ..self
        }
    }

    /// Linear interpolation, `t` clamped to 0..=1.
    pub fn lerp(self, other: Color, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        Self {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
            a: self.a + (other.a - self.a) * t,
        }
    }

    /// Rotate hue by `degrees`, keeping saturation, value and alpha.
    pub fn hue_shifted(self, degrees: f32) -> Self {
        let (h, s, v) = rgb_to_hsv(self.r, self.g, self.b);
        let (r, g, b) = hsv_to_rgb((h + degrees).rem_euclid(360.0), s, v);
        Self { r, g, b, a: self.a }
    }

    pub fn to_rgba8(self) -> [u8; 4] {
        [
            (self.r.clamp(0.0, 1.0) * 255.0).round() as u8,
            (self.g.clamp(0.0, 1.0) * 255.0).round() as u8,
            (self.b.clamp(0.0, 1.0) * 255.0).round() as u8,
            (self.a.clamp(0.0, 1.0) * 255.0).round() as u8,
        ]
    }
}

fn rgb_to_hsv(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let h = if delta <= f32::EPSILON {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let s = if max <= f32::EPSILON { 0.0 } else { delta / max };
    (h, s, max)
}

fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0).rem_euclid(2.0) - 1.0).abs());
    let m = v - c;
    let (r, g, b) = match (h / 60.0) as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    (r + m, g + m, b + m)
}

/// Decoration drawn on top of the base bubble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeEffect {
    /// Gradient and highlight only
    #[default]
    Plain,
    /// Slow hue oscillation of the film color
    Shimmer,
    /// Pulsing glints around the rim
    Sparkle,
    /// Twinkling star speckles inside the disc
    StarField,
}

impl ThemeEffect {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Plain => "Plain",
            Self::Shimmer => "Shimmer",
            Self::Sparkle => "Sparkle",
            Self::StarField => "Star Field",
        }
    }
}

/// Palette, decoration and pop sound for one visual theme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    pub palette: Vec<Color>,
    #[serde(default)]
    pub effect: ThemeEffect,
    /// Sound asset stem looked up in the audio asset directory
    #[serde(default = "default_sound")]
    pub sound: String,
}

fn default_sound() -> String {
    "pop".to_string()
}

impl Default for Theme {
    fn default() -> Self {
        Self::classic()
    }
}

impl Theme {
    pub fn classic() -> Self {
        Self {
            name: "classic".to_string(),
            palette: vec![
                Color::from_rgb8(140, 200, 255),
                Color::from_rgb8(190, 150, 255),
                Color::from_rgb8(150, 255, 220),
            ],
            effect: ThemeEffect::Plain,
            sound: "pop".to_string(),
        }
    }

    pub fn pearl() -> Self {
        Self {
            name: "pearl".to_string(),
            palette: vec![
                Color::from_rgb8(255, 235, 245),
                Color::from_rgb8(220, 235, 255),
                Color::from_rgb8(240, 255, 235),
            ],
            effect: ThemeEffect::Shimmer,
            sound: "pearl".to_string(),
        }
    }

    pub fn crystal() -> Self {
        Self {
            name: "crystal".to_string(),
            palette: vec![
                Color::from_rgb8(170, 240, 255),
                Color::from_rgb8(120, 200, 255),
                Color::from_rgb8(210, 250, 255),
            ],
            effect: ThemeEffect::Sparkle,
            sound: "crystal".to_string(),
        }
    }

    pub fn galaxy() -> Self {
        Self {
            name: "galaxy".to_string(),
            palette: vec![
                Color::from_rgb8(60, 30, 120),
                Color::from_rgb8(120, 50, 170),
                Color::from_rgb8(40, 70, 160),
            ],
            effect: ThemeEffect::StarField,
            sound: "galaxy".to_string(),
        }
    }

    pub fn sunset() -> Self {
        Self {
            name: "sunset".to_string(),
            palette: vec![
                Color::from_rgb8(255, 170, 90),
                Color::from_rgb8(255, 110, 130),
                Color::from_rgb8(255, 210, 120),
            ],
            effect: ThemeEffect::Plain,
            sound: "pop".to_string(),
        }
    }

    pub fn presets() -> Vec<Theme> {
        vec![
            Self::classic(),
            Self::pearl(),
            Self::crystal(),
            Self::galaxy(),
            Self::sunset(),
        ]
    }

    /// Look up a built-in preset by case-insensitive name.
    pub fn by_name(name: &str) -> Option<Theme> {
        Self::presets()
            .into_iter()
            .find(|theme| theme.name.eq_ignore_ascii_case(name))
    }

    /// Color at a cyclic position along the palette (wraps every 1.0).
    pub fn palette_color(&self, phase: f32) -> Color {
        match self.palette.len() {
            0 => Color::WHITE,
            1 => self.palette[0],
            len => {
                let scaled = phase.rem_euclid(1.0) * len as f32;
                let index = (scaled.floor() as usize).min(len - 1);
                let next = (index + 1) % len;
                self.palette[index].lerp(self.palette[next], scaled - index as f32)
            }
        }
    }
}
