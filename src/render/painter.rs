//! Bubble and particle painter.
//!
//! Bubbles draw first, largest to smallest, so small bubbles read as nearer.
//! Particles draw afterwards in their own pass.

use std::f32::consts::TAU;

use glam::Vec2;

use super::surface::{GradientStop, Surface};
use crate::physics::bubble::{Bubble, BubbleManager};
use crate::physics::particles::{ParticleKind, ParticleSystem};
use crate::physics::pool::PoolHandle;
use crate::theme::{Color, ThemeEffect};

/// Glints drawn around the rim of sparkle bubbles.
const SPARKLE_GLINTS: u32 = 4;
/// Stars drawn inside star-field bubbles.
const STAR_COUNT: u32 = 7;

/// Cheap integer hash to a value in 0.0..1.0, stable per (seed, index).
fn hash01(seed: u32, index: u32) -> f32 {
    let mut x = seed ^ index.wrapping_mul(0x9E37_79B9);
    x ^= x >> 16;
    x = x.wrapping_mul(0x7FEB_352D);
    x ^= x >> 15;
    x = x.wrapping_mul(0x846C_A68B);
    x ^= x >> 16;
    (x >> 8) as f32 / (1u32 << 24) as f32
}

pub struct Renderer {
    /// Clear color for each frame
    pub background: Color,
    /// Scratch draw order, reused across frames
    order: Vec<(f32, PoolHandle)>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            background: Color::from_rgb8(14, 20, 38),
            order: Vec::new(),
        }
    }

    /// Clear and draw a complete frame.
    pub fn draw_frame(
        &mut self,
        surface: &mut dyn Surface,
        bubbles: &BubbleManager,
        particles: &ParticleSystem,
    ) {
        surface.clear(self.background);
        self.draw_bubbles(surface, bubbles);
        self.draw_particles(surface, particles);
    }

    /// Handles of the active bubbles in paint order.
    pub fn paint_order(&mut self, bubbles: &BubbleManager) -> &[(f32, PoolHandle)] {
        self.order.clear();
        self.order
            .extend(bubbles.iter().map(|(handle, bubble)| (bubble.size, handle)));
        // Stable sort keeps spawn order among equal sizes
        self.order.sort_by(|a, b| b.0.total_cmp(&a.0));
        &self.order
    }

    pub fn draw_bubbles(&mut self, surface: &mut dyn Surface, bubbles: &BubbleManager) {
        self.paint_order(bubbles);
        for &(_, handle) in &self.order {
            if let Some(bubble) = bubbles.get(handle) {
                draw_bubble(surface, bubble);
            }
        }
    }

    pub fn draw_particles(&self, surface: &mut dyn Surface, particles: &ParticleSystem) {
        for (_, particle) in particles.iter() {
            if particle.opacity <= 0.0 {
                continue;
            }
            match particle.kind {
                ParticleKind::Droplet => {
                    surface.fill_circle(
                        particle.position,
                        particle.size,
                        particle.color.with_alpha(particle.opacity * 0.85),
                    );
                }
                ParticleKind::BurstRing { .. } => {
                    surface.stroke_circle(
                        particle.position,
                        particle.size,
                        0.5 + 2.5 * particle.opacity,
                        particle.color.lerp(Color::WHITE, 0.4).with_alpha(particle.opacity * 0.6),
                    );
                }
            }
        }
    }
}

fn draw_bubble(surface: &mut dyn Surface, bubble: &Bubble) {
    let alpha = bubble.opacity.clamp(0.0, 1.0);
    if alpha <= 0.0 || bubble.size <= 0.0 {
        return;
    }
    let radius = bubble.radius();
    let center = bubble.position;

    let mut film = bubble.color();
    if bubble.theme.effect == ThemeEffect::Shimmer {
        film = film.hue_shifted((bubble.effect_phase * TAU).sin() * 30.0);
    }

    let stops = [
        GradientStop::new(0.0, film.with_alpha(0.04 * alpha)),
        GradientStop::new(0.65, film.with_alpha(0.14 * alpha)),
        GradientStop::new(0.9, film.lerp(Color::WHITE, 0.25).with_alpha(0.42 * alpha)),
        GradientStop::new(1.0, film.with_alpha(0.1 * alpha)),
    ];
    surface.fill_radial_gradient(center, radius, &stops);
    surface.stroke_circle(
        center,
        radius * 0.97,
        (radius * 0.035).max(1.0),
        film.lerp(Color::WHITE, 0.5).with_alpha(0.5 * alpha),
    );

    let highlight = [
        GradientStop::new(0.0, Color::WHITE.with_alpha(0.75 * alpha)),
        GradientStop::new(1.0, Color::WHITE.with_alpha(0.0)),
    ];
    surface.fill_radial_gradient(center + Vec2::splat(-0.35 * radius), radius * 0.28, &highlight);

    match bubble.theme.effect {
        ThemeEffect::Plain => {}
        ThemeEffect::Shimmer => {
            let band = film.hue_shifted(120.0).with_alpha(0.22 * alpha);
            surface.stroke_circle(center, radius * 0.82, (radius * 0.02).max(1.0), band);
        }
        ThemeEffect::Sparkle => draw_sparkles(surface, bubble, center, radius, alpha),
        ThemeEffect::StarField => draw_stars(surface, bubble, center, radius, alpha),
    }
}

fn draw_sparkles(
    surface: &mut dyn Surface,
    bubble: &Bubble,
    center: Vec2,
    radius: f32,
    alpha: f32,
) {
    for i in 0..SPARKLE_GLINTS {
        let base_angle = hash01(bubble.decor_seed, i) * TAU;
        let angle = base_angle + bubble.effect_phase * 0.3;
        let pulse = 0.5 + 0.5 * (bubble.effect_phase * TAU + i as f32 * 1.7).sin();
        let position = center + Vec2::from_angle(angle) * radius * 0.9;
        let glint = Color::WHITE.with_alpha(pulse * 0.9 * alpha);
        surface.fill_circle(position, (radius * 0.05).max(1.0) * (0.6 + 0.4 * pulse), glint);
    }
}

fn draw_stars(
    surface: &mut dyn Surface,
    bubble: &Bubble,
    center: Vec2,
    radius: f32,
    alpha: f32,
) {
    for i in 0..STAR_COUNT {
        // sqrt keeps stars evenly spread over the disc area
        let distance = hash01(bubble.decor_seed, i * 2).sqrt() * radius * 0.75;
        let angle = hash01(bubble.decor_seed, i * 2 + 1) * TAU;
        let twinkle = 0.4 + 0.6 * (bubble.effect_phase * TAU + i as f32 * 2.3).sin().abs();
        let position = center + Vec2::from_angle(angle) * distance;
        let star = Color::rgb(1.0, 0.97, 0.85).with_alpha(twinkle * alpha);
        surface.fill_circle(position, (radius * 0.025).max(0.8), star);
    }
}
