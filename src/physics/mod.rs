//! Physics simulation modules
//!
//! Contains the motion models for the bubble field:
//! - Pool: Fixed-capacity storage shared by bubbles and particles
//! - Forces: Per-bubble force model (buoyancy, wobble, wind, boundaries, drag)
//! - Wind: Smoothed global wind and localized breeze zones
//! - Bubble: Spawning, integration and retirement of bubbles
//! - Particles: Pop droplets and burst rings

pub mod bubble;
pub mod forces;
pub mod particles;
pub mod pool;
pub mod wind;

use glam::Vec2;

pub use bubble::{Bubble, BubbleManager, SpawnEdge};
pub use forces::{ForceModel, WindSample};
pub use particles::{BurstReport, Particle, ParticleKind, ParticleSystem};
pub use pool::{Pool, PoolHandle};
pub use wind::{BreezeField, BreezeZone, WindField};

/// Duration of one nominal 60 Hz tick (ms). Per-tick constants are scaled by
/// `elapsed_ms / TICK_MS`.
pub const TICK_MS: f32 = 16.67;

/// Convert elapsed milliseconds to nominal ticks.
pub fn ticks(elapsed_ms: f32) -> f32 {
    elapsed_ms / TICK_MS
}

/// Visible area in pixels. The origin is the top-left corner and y grows
/// downward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}

impl Viewport {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width * 0.5, self.height * 0.5)
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= 0.0 && point.x <= self.width && point.y >= 0.0 && point.y <= self.height
    }

    /// True when `point` lies within the viewport grown by `margin` on every side.
    pub fn contains_with_margin(&self, point: Vec2, margin: f32) -> bool {
        point.x >= -margin
            && point.x <= self.width + margin
            && point.y >= -margin
            && point.y <= self.height + margin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_at_sixty_hz() {
        assert!((ticks(16.67) - 1.0).abs() < 1e-6);
        assert!((ticks(100.0) - 6.0).abs() < 0.01);
    }

    #[test]
    fn test_viewport_contains() {
        let viewport = Viewport::new(100.0, 50.0);
        assert!(viewport.contains(Vec2::new(50.0, 25.0)));
        assert!(!viewport.contains(Vec2::new(-1.0, 25.0)));
        assert!(viewport.contains_with_margin(Vec2::new(-1.0, 25.0), 10.0));
        assert!(!viewport.contains_with_margin(Vec2::new(50.0, 70.0), 10.0));
    }
}
