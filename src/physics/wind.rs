//! Global wind and localized breeze zones.
//!
//! The global wind drifts toward a target vector that is re-rolled on a fixed
//! interval. Breeze zones are pulsing circular force fields scattered over the
//! viewport; overlapping zones are averaged by weight so stacking them never
//! amplifies the force.

use glam::Vec2;
use rand::Rng;
use std::f32::consts::TAU;

use super::Viewport;
use crate::config::WindParameters;

/// Global wind state.
#[derive(Debug, Clone)]
pub struct WindField {
    /// Live wind acceleration (px/tick^2)
    pub current: Vec2,
    /// Vector the live wind is approaching
    pub target: Vec2,
    /// Time since the last target roll (ms)
    elapsed_ms: f32,
    params: WindParameters,
}

impl WindField {
    pub fn new(params: WindParameters) -> Self {
        Self {
            current: Vec2::ZERO,
            target: Vec2::ZERO,
            elapsed_ms: 0.0,
            params,
        }
    }

    /// Still air; nothing moves until the first roll.
    pub fn calm() -> Self {
        Self::new(WindParameters::default())
    }

    pub fn set_params(&mut self, params: WindParameters) {
        self.params = params;
    }

    /// Roll a new target: random direction, magnitude in the configured range,
    /// occasionally amplified into a gust.
    pub fn roll_target<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let angle = rng.gen_range(0.0..TAU);
        let (low, high) = (self.params.min_strength, self.params.max_strength);
        let mut magnitude = if high > low {
            rng.gen_range(low..high)
        } else {
            low
        };
        if rng.gen_bool(self.params.gust_probability.clamp(0.0, 1.0) as f64) {
            magnitude *= self.params.gust_multiplier;
            log::debug!("Wind gust rolled: {:.4} px/tick^2", magnitude);
        }
        self.target = Vec2::new(angle.cos(), angle.sin()) * magnitude;
    }

    /// Advance the wind by one frame.
    pub fn update<R: Rng + ?Sized>(&mut self, dt_ms: f32, rng: &mut R) {
        self.elapsed_ms += dt_ms;
        if self.elapsed_ms >= self.params.change_interval_ms {
            self.elapsed_ms = 0.0;
            self.roll_target(rng);
        }

        let ticks = (dt_ms / super::TICK_MS).min(self.params.dt_cap);
        let blend = (self.params.smoothing * ticks).clamp(0.0, 1.0);
        self.current += (self.target - self.current) * blend;
    }

    /// Force wind to a fixed vector (current and target).
    pub fn set(&mut self, wind: Vec2) {
        self.current = wind;
        self.target = wind;
    }
}

/// A pulsing circular force field.
#[derive(Debug, Clone)]
pub struct BreezeZone {
    pub center: Vec2,
    pub radius: f32,
    /// Peak acceleration (px/tick^2)
    pub strength: f32,
    /// Unit direction of the push
    pub direction: Vec2,
    /// Pulse angular frequency (rad/s)
    pub pulse_frequency: f32,
    pub pulse_phase: f32,
    /// Relative pulse depth (0.0 to 1.0)
    pub pulse_amplitude: f32,
    /// Removal time for injected turbulence (ms on the field clock)
    pub expires_at_ms: Option<f64>,
    /// Turbulence swirls around its center instead of pushing one way
    pub swirl: bool,
}

impl BreezeZone {
    /// Falloff weight at `point`: 1 at the center, 0 at the radius edge.
    pub fn weight(&self, point: Vec2) -> f32 {
        if self.radius <= 0.0 {
            return 0.0;
        }
        let ratio = point.distance(self.center) / self.radius;
        if ratio >= 1.0 {
            0.0
        } else {
            (1.0 - ratio) * (1.0 - ratio)
        }
    }

    /// Force vector at `point` and field time `time_ms`, before weighting.
    pub fn force(&self, point: Vec2, time_ms: f64) -> Vec2 {
        let seconds = (time_ms / 1000.0) as f32;
        let pulse = 1.0
            + self.pulse_amplitude * (seconds * self.pulse_frequency + self.pulse_phase).sin();
        let direction = if self.swirl {
            // Tangent to the circle around the center; zero at the exact center
            let offset = point - self.center;
            offset.perp().normalize_or_zero()
        } else {
            self.direction
        };
        direction * self.strength * pulse
    }
}

/// The set of breeze zones covering the viewport.
#[derive(Debug, Clone, Default)]
pub struct BreezeField {
    zones: Vec<BreezeZone>,
    strength: f32,
    turbulence_duration_ms: f32,
}

impl BreezeField {
    pub fn new(params: &WindParameters) -> Self {
        Self {
            zones: Vec::new(),
            strength: params.breeze_strength,
            turbulence_duration_ms: params.turbulence_duration_ms,
        }
    }

    pub fn set_params(&mut self, params: &WindParameters) {
        self.strength = params.breeze_strength;
        self.turbulence_duration_ms = params.turbulence_duration_ms;
    }

    pub fn zones(&self) -> &[BreezeZone] {
        &self.zones
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Replace all ambient zones with 4-6 new ones spread over `viewport`.
    /// Active turbulence survives the regeneration.
    pub fn regenerate<R: Rng + ?Sized>(&mut self, viewport: Viewport, rng: &mut R) {
        self.zones.retain(|zone| zone.expires_at_ms.is_some());

        let count = rng.gen_range(4..=6);
        let min_side = viewport.width.min(viewport.height).max(1.0);
        for _ in 0..count {
            let angle = rng.gen_range(0.0..TAU);
            self.zones.push(BreezeZone {
                center: Vec2::new(
                    rng.gen_range(0.0..=viewport.width.max(1.0)),
                    rng.gen_range(0.0..=viewport.height.max(1.0)),
                ),
                radius: rng.gen_range(0.2..0.45) * min_side,
                strength: rng.gen_range(0.5..1.0) * self.strength,
                direction: Vec2::new(angle.cos(), angle.sin()),
                pulse_frequency: rng.gen_range(0.3..1.2),
                pulse_phase: rng.gen_range(0.0..TAU),
                pulse_amplitude: rng.gen_range(0.2..0.6),
                expires_at_ms: None,
                swirl: false,
            });
        }
        log::debug!(
            "Regenerated {} breeze zones for {}x{} viewport",
            count,
            viewport.width,
            viewport.height
        );
    }

    /// Inject a swirling turbulence zone that removes itself after the
    /// configured duration.
    pub fn add_turbulence(&mut self, center: Vec2, radius: f32, strength: f32, now_ms: f64) {
        self.zones.push(BreezeZone {
            center,
            radius,
            strength,
            direction: Vec2::ZERO,
            pulse_frequency: 6.0,
            pulse_phase: 0.0,
            pulse_amplitude: 0.5,
            expires_at_ms: Some(now_ms + self.turbulence_duration_ms as f64),
            swirl: true,
        });
    }

    /// Drop turbulence zones whose time is up.
    pub fn expire(&mut self, now_ms: f64) {
        self.zones
            .retain(|zone| zone.expires_at_ms.is_none_or(|expires| now_ms < expires));
    }

    /// Weighted-average force of every zone covering `point`.
    pub fn sample(&self, point: Vec2, time_ms: f64) -> Vec2 {
        let mut sum = Vec2::ZERO;
        let mut total_weight = 0.0;
        for zone in &self.zones {
            let weight = zone.weight(point);
            if weight > 0.0 {
                sum += zone.force(point, time_ms) * weight;
                total_weight += weight;
            }
        }
        if total_weight > 0.0 {
            sum / total_weight.max(1.0)
        } else {
            Vec2::ZERO
        }
    }
}
