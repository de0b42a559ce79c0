//! Pop particles: scattered droplets plus one expanding burst ring per pop.
//!
//! Particles live in their own pool, independent of bubbles, and are updated
//! and drawn in a separate pass.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;

use super::pool::{Pool, PoolHandle};
use super::{Viewport, ticks};
use crate::config::ParticleParameters;
use crate::theme::Color;

/// Popped diameter that yields exactly `base_count` droplets.
pub const REFERENCE_SIZE: f32 = 150.0;
/// Droplets smaller than this radius (px) are removed.
pub const VISIBILITY_FLOOR: f32 = 0.4;
/// Distance past the viewport at which droplets are removed.
pub const BOUNDS_MARGIN: f32 = 100.0;
/// Ring radius at its maximum, relative to the popped diameter.
pub const RING_SCALE: f32 = 1.3;
/// Ring radius at birth (px).
const RING_START_RADIUS: f32 = 1.0;
/// Fraction of droplet life spent growing before shrinking.
const GROWTH_PHASE: f32 = 0.2;
/// Size multiplier reached at the end of the growth phase.
const GROWTH_PEAK: f32 = 1.15;
/// Largest angular jitter per droplet, as a fraction of the even spacing.
const ANGLE_JITTER: f32 = 0.35;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ParticleKind {
    #[default]
    Droplet,
    BurstRing {
        max_radius: f32,
    },
}

#[derive(Debug, Clone, Default)]
pub struct Particle {
    pub position: Vec2,
    /// Velocity in px per tick
    pub velocity: Vec2,
    /// Current radius (px)
    pub size: f32,
    /// Radius at birth
    pub base_size: f32,
    pub opacity: f32,
    pub color: Color,
    pub age_ms: f32,
    pub lifetime_ms: f32,
    pub kind: ParticleKind,
}

impl Particle {
    pub fn is_ring(&self) -> bool {
        matches!(self.kind, ParticleKind::BurstRing { .. })
    }

    fn life_ratio(&self) -> f32 {
        if self.lifetime_ms <= 0.0 {
            1.0
        } else {
            (self.age_ms / self.lifetime_ms).clamp(0.0, 1.0)
        }
    }
}

/// What one `burst` call produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BurstReport {
    /// Droplets the size and quality asked for
    pub requested: usize,
    /// Droplets actually emitted
    pub droplets: usize,
    /// Whether the ring was emitted
    pub ring: bool,
}

/// Droplet count for a popped diameter:
/// `round(base · clamp(size/150, 0.5, 3.0) · quality)`.
pub fn droplet_count(source_size: f32, base_count: u32, quality: f32) -> usize {
    let ratio = (source_size / REFERENCE_SIZE).clamp(0.5, 3.0);
    (base_count as f32 * ratio * quality.max(0.0)).round() as usize
}

/// Opacity of a droplet: solid until the final `fade_fraction` of life, then
/// linear to zero.
pub fn droplet_opacity(life_ratio: f32, fade_fraction: f32) -> f32 {
    let fade_start = 1.0 - fade_fraction;
    if life_ratio <= fade_start {
        1.0
    } else {
        ((1.0 - life_ratio) / fade_fraction).clamp(0.0, 1.0)
    }
}

fn droplet_scale(life_ratio: f32) -> f32 {
    if life_ratio < GROWTH_PHASE {
        1.0 + (GROWTH_PEAK - 1.0) * life_ratio / GROWTH_PHASE
    } else {
        GROWTH_PEAK * (1.0 - (life_ratio - GROWTH_PHASE) / (1.0 - GROWTH_PHASE))
    }
}

/// Pooled pop particle system.
#[derive(Debug)]
pub struct ParticleSystem {
    pool: Pool<Particle>,
    params: ParticleParameters,
    bounds: Viewport,
}

impl ParticleSystem {
    pub fn new(
        capacity: usize,
        limit: usize,
        params: ParticleParameters,
        bounds: Viewport,
    ) -> Self {
        let mut pool = Pool::new(capacity);
        pool.set_limit(limit);
        Self {
            pool,
            params,
            bounds,
        }
    }

    pub fn set_params(&mut self, params: ParticleParameters) {
        self.params = params;
    }

    pub fn set_limit(&mut self, limit: usize) {
        self.pool.set_limit(limit);
    }

    pub fn set_bounds(&mut self, bounds: Viewport) {
        self.bounds = bounds;
    }

    pub fn len(&self) -> usize {
        self.pool.active_count()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    pub fn free_count(&self) -> usize {
        self.pool.free_count()
    }

    pub fn available(&self) -> usize {
        self.pool.available()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PoolHandle, &Particle)> + '_ {
        self.pool.iter()
    }

    pub fn clear(&mut self) {
        self.pool.clear();
    }

    /// Emit one burst ring and up to `droplet_count` droplets at `origin`.
    ///
    /// The ring is taken from the pool first, so a nearly full pool still
    /// marks the pop; droplets are then capped by what remains.
    /// The ring counts against the available slots: droplets are
    /// `min(available - 1, requested)`.
    pub fn burst<R: Rng + ?Sized>(
        &mut self,
        origin: Vec2,
        source_size: f32,
        color: Color,
        quality: f32,
        rng: &mut R,
    ) -> BurstReport {
        let requested = droplet_count(source_size, self.params.base_count, quality);
        let mut report = BurstReport {
            requested,
            ..BurstReport::default()
        };

        let ring_duration = self.params.ring_duration_ms;
        if let Some((_, ring)) = self.pool.acquire() {
            *ring = Particle {
                position: origin,
                velocity: Vec2::ZERO,
                size: RING_START_RADIUS,
                base_size: RING_START_RADIUS,
                opacity: 1.0,
                color,
                age_ms: 0.0,
                lifetime_ms: ring_duration,
                kind: ParticleKind::BurstRing {
                    max_radius: RING_SCALE * source_size,
                },
            };
            report.ring = true;
        } else {
            log::debug!("Particle pool exhausted, pop at {:?} has no effect", origin);
            return report;
        }

        let count = requested.min(self.pool.available());
        let spacing = if count > 0 { TAU / count as f32 } else { 0.0 };
        let size_scale = (source_size / 100.0).clamp(0.5, 2.0);
        let source_radius = source_size * 0.5;

        for i in 0..count {
            let jitter = rng.gen_range(-ANGLE_JITTER..=ANGLE_JITTER) * spacing;
            let angle = i as f32 * spacing + jitter;
            let direction = Vec2::new(angle.cos(), angle.sin());
            let speed = rng.gen_range(1.5..3.0) * size_scale;
            let radius = rng.gen_range(2.0..4.5) * size_scale;
            let lifetime = rng.gen_range(600.0..1000.0);
            let tint = color.lerp(Color::WHITE, rng.gen_range(0.0..0.35));

            let Some((_, droplet)) = self.pool.acquire() else {
                break;
            };
            *droplet = Particle {
                position: origin + direction * source_radius * 0.6,
                velocity: direction * speed + Vec2::new(0.0, -0.6),
                size: radius,
                base_size: radius,
                opacity: 1.0,
                color: tint,
                age_ms: 0.0,
                lifetime_ms: lifetime,
                kind: ParticleKind::Droplet,
            };
            report.droplets += 1;
        }

        if report.droplets < requested {
            log::debug!(
                "Burst capped by pool: {} of {} droplets",
                report.droplets,
                requested
            );
        }
        report
    }

    /// Advance all particles by `dt_ms`. Returns the number removed.
    pub fn update(&mut self, dt_ms: f32) -> usize {
        let Self {
            pool,
            params,
            bounds,
        } = self;
        let dt = ticks(dt_ms);
        let gravity = params.gravity;
        let drag = params.drag.powf(dt);
        let fade_fraction = params.fade_fraction;
        let bounds = *bounds;

        pool.retain(|particle| {
            particle.age_ms += dt_ms;
            if particle.age_ms >= particle.lifetime_ms {
                return false;
            }
            let t = particle.life_ratio();

            match particle.kind {
                ParticleKind::BurstRing { max_radius } => {
                    particle.size =
                        RING_START_RADIUS + (max_radius - RING_START_RADIUS).max(0.0) * t;
                    particle.opacity = 1.0 - t;
                    true
                }
                ParticleKind::Droplet => {
                    particle.velocity.y += gravity * dt;
                    particle.velocity *= drag;
                    particle.position += particle.velocity * dt;
                    particle.size = particle.base_size * droplet_scale(t);
                    particle.opacity = droplet_opacity(t, fade_fraction);

                    particle.size >= VISIBILITY_FLOOR
                        && bounds.contains_with_margin(particle.position, BOUNDS_MARGIN)
                }
            }
        })
    }
}
