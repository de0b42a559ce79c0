//! Force model for a single bubble.
//!
//! `ForceModel::step` is stateless per call: it reads one bubble plus the
//! ambient conditions and returns the velocity change for this frame. All
//! per-tick constants assume a 60 Hz tick; `dt` is measured in ticks.
//!
//! Terms, in application order:
//! 1. Buoyancy, scaled by `1 + size/100`
//! 2. Wobble, phase-shifted sine/cosine of age (off under reduced quality)
//! 3. Wind coupling: ambient term shrinking with size, plus a separate
//!    size-proportional resistance term (both additive)
//! 4. Spawn momentum bias while the grace period lasts
//! 5. Soft side/top boundary repulsion
//! 6. Size effects: horizontal damping for large bubbles, jitter for small ones
//! 7. Drag `drag^dt` followed by the terminal velocity clamp `0.8 + size/200`
//!
//! During the grace period terms 5-7 are multiplied by the grace factor.

use glam::Vec2;
use rand::Rng;

use super::Viewport;
use super::bubble::Bubble;
use crate::config::PhysicsParameters;

/// Diameter that maps to a normalized size of 1.0.
pub const SIZE_REFERENCE: f32 = 200.0;
/// Normalized size above which horizontal motion is damped.
pub const LARGE_THRESHOLD: f32 = 0.6;
/// Normalized size below which horizontal jitter is added.
pub const SMALL_THRESHOLD: f32 = 0.25;
/// Per-tick horizontal retention for large bubbles.
const LARGE_HORIZONTAL_RETENTION: f32 = 0.95;
/// Jitter amplitude for small bubbles (px/tick^2).
const SMALL_JITTER: f32 = 0.05;
/// Penetration depths beyond this many margins stop increasing the push.
const MAX_PENETRATION: f32 = 3.0;

/// Wind acting on one bubble: the global vector and the local breeze sample.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindSample {
    pub global: Vec2,
    pub local: Vec2,
}

/// Terminal speed for a bubble of the given diameter (px/tick).
pub fn terminal_velocity(size: f32) -> f32 {
    0.8 + size / 200.0
}

/// Stateless force model configured from the physics parameters.
#[derive(Debug, Clone)]
pub struct ForceModel {
    params: PhysicsParameters,
    reduced_quality: bool,
}

impl ForceModel {
    pub fn new(params: PhysicsParameters, reduced_quality: bool) -> Self {
        Self {
            params,
            reduced_quality,
        }
    }

    pub fn params(&self) -> &PhysicsParameters {
        &self.params
    }

    pub fn set_params(&mut self, params: PhysicsParameters, reduced_quality: bool) {
        self.params = params;
        self.reduced_quality = reduced_quality;
    }

    /// Grace factor for a bubble: reduced until it is either old enough or
    /// has been seen on screen, 1.0 afterwards.
    pub fn grace_factor(&self, bubble: &Bubble) -> f32 {
        if bubble.age_ms < self.params.grace_period_ms && !bubble.entered_view {
            self.params.grace_factor
        } else {
            1.0
        }
    }

    /// Velocity change for one frame of `dt` ticks.
    pub fn step<R: Rng + ?Sized>(
        &self,
        bubble: &Bubble,
        dt: f32,
        wind: WindSample,
        grace: f32,
        viewport: Viewport,
        rng: &mut R,
    ) -> Vec2 {
        let p = &self.params;
        let size = bubble.size.max(1.0);
        let mut velocity = bubble.velocity;

        // Buoyancy keeps at least half strength through the grace period
        let buoyancy_grace = 0.5 + 0.5 * grace;
        velocity.y -= p.buoyancy * (1.0 + size / 100.0) * buoyancy_grace * dt;

        if !self.reduced_quality {
            velocity += self.wobble(bubble, size) * dt;
        }

        // Ambient coupling shrinks with size; resistance grows with it
        let responsiveness = 1.0 / (1.0 + size / 100.0);
        velocity += (wind.global + wind.local) * p.wind_coupling * responsiveness * dt;
        velocity += wind.global * (size / 300.0) * p.wind_resistance * dt;

        if grace < 1.0 {
            velocity += bubble.spawn_bias * dt;
        }

        velocity += self.boundary_force(bubble.position, viewport) * grace * dt;

        let normalized = size / SIZE_REFERENCE;
        if normalized > LARGE_THRESHOLD {
            velocity.x *= LARGE_HORIZONTAL_RETENTION.powf(dt * grace);
        } else if normalized < SMALL_THRESHOLD {
            velocity.x += rng.gen_range(-0.5..0.5) * SMALL_JITTER * dt * grace;
        }

        velocity *= p.drag_coefficient.powf(dt * grace);

        let terminal = terminal_velocity(size);
        let speed = velocity.length();
        if speed > terminal {
            let clamped = velocity * (terminal / speed);
            velocity = velocity.lerp(clamped, grace);
        }

        velocity - bubble.velocity
    }

    /// Wobble acceleration at the bubble's current age.
    fn wobble(&self, bubble: &Bubble, size: f32) -> Vec2 {
        let seconds = bubble.age_ms / 1000.0;
        let size_modifier = (60.0 / size).clamp(0.5, 1.5);
        let amplitude = self.params.wobble_strength * size_modifier;
        let angle = seconds * bubble.wobble_frequency + bubble.wobble_phase;
        Vec2::new(
            angle.sin() * amplitude,
            (angle * 0.8 + 1.3).cos() * amplitude * 0.5,
        )
    }

    /// Linear restoring force inside the side and top margins. The bottom has
    /// none, and once a bubble is past the top edge it is left alone to exit.
    pub fn boundary_force(&self, position: Vec2, viewport: Viewport) -> Vec2 {
        let margin = self.params.boundary_margin.max(1.0);
        let mut force = Vec2::ZERO;

        let left = margin - position.x;
        if left > 0.0 {
            force.x += self.params.boundary_stiffness * (left / margin).min(MAX_PENETRATION);
        }

        let right = position.x - (viewport.width - margin);
        if right > 0.0 {
            force.x -= self.params.boundary_stiffness * (right / margin).min(MAX_PENETRATION);
        }

        if position.y > 0.0 && position.y < margin {
            force.y += self.params.top_stiffness * (margin - position.y) / margin;
        }

        force
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn model() -> ForceModel {
        ForceModel::new(PhysicsParameters::default(), false)
    }

    fn still_bubble(size: f32) -> Bubble {
        Bubble {
            position: Vec2::new(500.0, 400.0),
            velocity: Vec2::ZERO,
            size,
            lifetime_ms: 10_000.0,
            entered_view: true,
            ..Bubble::default()
        }
    }

    const VIEW: Viewport = Viewport::new(1000.0, 800.0);

    #[test]
    fn test_buoyancy_points_up() {
        let mut rng = SmallRng::seed_from_u64(1);
        let bubble = still_bubble(100.0);
        let model = ForceModel::new(PhysicsParameters::default(), true);
        let dv = model.step(&bubble, 1.0, WindSample::default(), 1.0, VIEW, &mut rng);
        assert!(dv.y < 0.0);
        assert!(dv.x.abs() < 1e-6);
    }

    #[test]
    fn test_buoyancy_scales_with_size() {
        let mut rng = SmallRng::seed_from_u64(1);
        let model = ForceModel::new(PhysicsParameters::default(), true);
        let calm = WindSample::default();
        let small = model.step(&still_bubble(60.0), 1.0, calm, 1.0, VIEW, &mut rng);
        let large = model.step(&still_bubble(140.0), 1.0, calm, 1.0, VIEW, &mut rng);
        assert!(large.y < small.y);
    }

    #[test]
    fn test_terminal_velocity_clamp() {
        let mut rng = SmallRng::seed_from_u64(2);
        let mut bubble = still_bubble(100.0);
        bubble.velocity = Vec2::new(0.0, -20.0);
        let dv = model().step(&bubble, 1.0, WindSample::default(), 1.0, VIEW, &mut rng);
        let speed = (bubble.velocity + dv).length();
        assert!(speed <= terminal_velocity(100.0) + 1e-4);
    }

    #[test]
    fn test_grace_softens_clamp() {
        let mut rng = SmallRng::seed_from_u64(3);
        let mut bubble = still_bubble(100.0);
        bubble.velocity = Vec2::new(0.0, -20.0);
        let dv = model().step(&bubble, 1.0, WindSample::default(), 0.1, VIEW, &mut rng);
        let speed = (bubble.velocity + dv).length();
        assert!(speed > terminal_velocity(100.0) * 2.0, "grace must avoid a snap");
    }

    #[test]
    fn test_grace_factor_rules() {
        let model = model();
        let mut bubble = still_bubble(80.0);
        bubble.entered_view = false;
        bubble.age_ms = 0.0;
        assert!((model.grace_factor(&bubble) - 0.1).abs() < 1e-6);

        bubble.age_ms = 2000.0;
        assert_eq!(model.grace_factor(&bubble), 1.0);

        bubble.age_ms = 10.0;
        bubble.entered_view = true;
        assert_eq!(model.grace_factor(&bubble), 1.0);
    }

    #[test]
    fn test_wind_terms_are_additive() {
        let mut rng = SmallRng::seed_from_u64(4);
        let model = ForceModel::new(PhysicsParameters::default(), true);
        let wind = WindSample {
            global: Vec2::new(0.05, 0.0),
            local: Vec2::ZERO,
        };
        let bubble = still_bubble(150.0);
        let calm = model.step(&bubble, 1.0, WindSample::default(), 1.0, VIEW, &mut rng);
        let windy = model.step(&bubble, 1.0, wind, 1.0, VIEW, &mut rng);

        let p = PhysicsParameters::default();
        let ambient = 0.05 * p.wind_coupling / 2.5;
        let resistance = 0.05 * 0.5 * p.wind_resistance;
        let drag = p.drag_coefficient;
        let expected = (ambient + resistance) * drag * LARGE_HORIZONTAL_RETENTION;
        assert!(((windy.x - calm.x) - expected).abs() < 1e-5);
    }

    #[test]
    fn test_side_boundary_pushes_inward() {
        let model = model();
        let left = model.boundary_force(Vec2::new(10.0, 400.0), VIEW);
        let right = model.boundary_force(Vec2::new(990.0, 400.0), VIEW);
        let centre = model.boundary_force(Vec2::new(500.0, 400.0), VIEW);
        assert!(left.x > 0.0);
        assert!(right.x < 0.0);
        assert_eq!(centre, Vec2::ZERO);
    }

    #[test]
    fn test_boundary_proportional_to_depth() {
        let model = model();
        let shallow = model.boundary_force(Vec2::new(50.0, 400.0), VIEW);
        let deep = model.boundary_force(Vec2::new(20.0, 400.0), VIEW);
        let ratio = deep.x / shallow.x;
        assert!((ratio - 4.0).abs() < 1e-4);
    }

    #[test]
    fn test_no_bottom_or_exit_repulsion() {
        let model = model();
        assert_eq!(model.boundary_force(Vec2::new(500.0, 790.0), VIEW), Vec2::ZERO);
        assert_eq!(model.boundary_force(Vec2::new(500.0, -5.0), VIEW), Vec2::ZERO);
        assert!(model.boundary_force(Vec2::new(500.0, 10.0), VIEW).y > 0.0);
    }

    #[test]
    fn test_large_bubble_loses_horizontal_speed() {
        let mut rng = SmallRng::seed_from_u64(5);
        let model = ForceModel::new(PhysicsParameters::default(), true);
        let mut bubble = still_bubble(180.0);
        bubble.velocity = Vec2::new(1.0, 0.0);
        let dv = model.step(&bubble, 1.0, WindSample::default(), 1.0, VIEW, &mut rng);
        assert!(bubble.velocity.x + dv.x < 0.95);
    }

    #[test]
    fn test_reduced_quality_disables_wobble() {
        let mut rng = SmallRng::seed_from_u64(6);
        let mut bubble = still_bubble(100.0);
        bubble.age_ms = 400.0;
        bubble.wobble_frequency = 2.0;
        let plain = ForceModel::new(PhysicsParameters::default(), true);
        let wobbly = ForceModel::new(PhysicsParameters::default(), false);
        let a = plain.step(&bubble, 1.0, WindSample::default(), 1.0, VIEW, &mut rng);
        let b = wobbly.step(&bubble, 1.0, WindSample::default(), 1.0, VIEW, &mut rng);
        assert!(a.x.abs() < 1e-6);
        assert!(b.x.abs() > 1e-6);
    }
}
