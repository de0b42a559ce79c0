//! Bubble state and the pooled lifecycle manager.
//!
//! The manager owns every live bubble. Each frame it ages them, applies the
//! force model, integrates position, advances color and decoration phases and
//! releases bubbles that expired or drifted past the off-screen margin.

use std::f32::consts::TAU;
use std::sync::Arc;

use glam::Vec2;
use rand::Rng;

use super::forces::{ForceModel, WindSample};
use super::pool::{Pool, PoolHandle};
use super::wind::{BreezeField, WindField};
use super::{Viewport, ticks};
use crate::theme::{Theme, ThemeEffect};

/// Fraction of lifetime after which opacity starts ramping down.
pub const FADE_START: f32 = 0.92;
/// Base distance beyond the viewport (plus the bubble's diameter) at which a
/// bubble is retired.
pub const OFFSCREEN_MARGIN: f32 = 250.0;
/// Gap between the viewport edge and a freshly spawned bubble's rim.
const SPAWN_OFFSET: f32 = 10.0;

/// Edge a bubble entered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SpawnEdge {
    #[default]
    Bottom,
    Left,
    Right,
}

impl SpawnEdge {
    /// Weighted pick: 80% bottom, 10% left, 10% right.
    pub fn pick<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let roll: f32 = rng.r#gen();
        if roll < 0.8 {
            Self::Bottom
        } else if roll < 0.9 {
            Self::Left
        } else {
            Self::Right
        }
    }

    /// Initial velocity and spawn-momentum bias for this edge.
    fn initial_motion<R: Rng + ?Sized>(self, rng: &mut R) -> (Vec2, Vec2) {
        match self {
            Self::Bottom => (
                Vec2::new(rng.gen_range(-0.3..0.3), -rng.gen_range(0.8..1.3)),
                Vec2::new(0.0, -0.01),
            ),
            Self::Left => (
                Vec2::new(rng.gen_range(1.2..1.8), -rng.gen_range(0.2..0.6)),
                Vec2::new(0.02, -0.004),
            ),
            Self::Right => (
                Vec2::new(-rng.gen_range(1.2..1.8), -rng.gen_range(0.2..0.6)),
                Vec2::new(-0.02, -0.004),
            ),
        }
    }
}

/// A single floating bubble.
#[derive(Debug, Clone, Default)]
pub struct Bubble {
    pub position: Vec2,
    /// Velocity in px per tick
    pub velocity: Vec2,
    /// Diameter (px)
    pub size: f32,
    pub age_ms: f32,
    pub lifetime_ms: f32,
    pub wobble_phase: f32,
    /// Wobble angular frequency (rad/s)
    pub wobble_frequency: f32,
    pub theme: Arc<Theme>,
    pub edge: SpawnEdge,
    /// Per-tick push toward the interior, applied only during grace
    pub spawn_bias: Vec2,
    pub alive: bool,
    /// Set once the center has been inside the viewport
    pub entered_view: bool,
    /// Grace factor used in the most recent update
    pub grace: f32,
    pub opacity: f32,
    /// Palette position, wraps every 1.0
    pub color_phase: f32,
    /// Decoration animation phase (cycles)
    pub effect_phase: f32,
    /// Seed for decoration placement (star/glint positions)
    pub decor_seed: u32,
}

impl Bubble {
    pub fn radius(&self) -> f32 {
        self.size * 0.5
    }

    /// Age as a fraction of lifetime.
    pub fn life_ratio(&self) -> f32 {
        if self.lifetime_ms <= 0.0 {
            1.0
        } else {
            self.age_ms / self.lifetime_ms
        }
    }

    /// Circle containment: distance to center no greater than the radius.
    pub fn contains(&self, point: Vec2) -> bool {
        self.size > 0.0 && self.position.distance(point) <= self.radius()
    }

    /// Current film color from the theme palette.
    pub fn color(&self) -> crate::theme::Color {
        self.theme.palette_color(self.color_phase)
    }
}

/// Opacity for a given life ratio: 1.0 until `FADE_START`, then linear to 0.
pub fn fade_opacity(life_ratio: f32) -> f32 {
    if life_ratio <= FADE_START {
        1.0
    } else {
        (1.0 - (life_ratio - FADE_START) / (1.0 - FADE_START)).clamp(0.0, 1.0)
    }
}

/// Decoration animation speed in cycles per second.
fn effect_rate(effect: ThemeEffect) -> f32 {
    match effect {
        ThemeEffect::Plain => 0.0,
        ThemeEffect::Shimmer => 0.4,
        ThemeEffect::Sparkle => 1.5,
        ThemeEffect::StarField => 0.8,
    }
}

/// Ambient conditions passed to one bubble update pass.
#[derive(Debug, Clone, Copy)]
pub struct Ambient<'a> {
    pub wind: &'a WindField,
    pub breeze: &'a BreezeField,
    /// Simulation clock for breeze pulses (ms)
    pub time_ms: f64,
    pub color_cycle_speed: f32,
}

/// Owns the pooled set of active bubbles.
#[derive(Debug)]
pub struct BubbleManager {
    pool: Pool<Bubble>,
    forces: ForceModel,
    viewport: Viewport,
}

impl BubbleManager {
    pub fn new(capacity: usize, limit: usize, forces: ForceModel, viewport: Viewport) -> Self {
        let mut pool = Pool::new(capacity);
        pool.set_limit(limit);
        Self {
            pool,
            forces,
            viewport,
        }
    }

    pub fn forces(&self) -> &ForceModel {
        &self.forces
    }

    pub fn set_forces(&mut self, forces: ForceModel) {
        self.forces = forces;
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn set_limit(&mut self, limit: usize) {
        self.pool.set_limit(limit);
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

    pub fn get(&self, handle: PoolHandle) -> Option<&Bubble> {
        self.pool.get(handle)
    }

    pub fn get_mut(&mut self, handle: PoolHandle) -> Option<&mut Bubble> {
        self.pool.get_mut(handle)
    }

    /// Active bubbles in spawn order.
    pub fn iter(&self) -> impl Iterator<Item = (PoolHandle, &Bubble)> + '_ {
        self.pool.iter()
    }

    /// Spawn position just outside `edge`.
    pub fn spawn_position<R: Rng + ?Sized>(&self, edge: SpawnEdge, size: f32, rng: &mut R) -> Vec2 {
        let radius = size * 0.5;
        let Viewport { width, height } = self.viewport;
        let span = |low: f32, high: f32, rng: &mut R| {
            if high > low {
                rng.gen_range(low..high)
            } else {
                (low + high) * 0.5
            }
        };

        match edge {
            SpawnEdge::Bottom => Vec2::new(
                span(radius, width - radius, rng),
                height + radius + SPAWN_OFFSET,
            ),
            SpawnEdge::Left => Vec2::new(
                -radius - SPAWN_OFFSET,
                span(height * 0.3, height * 0.9, rng),
            ),
            SpawnEdge::Right => Vec2::new(
                width + radius + SPAWN_OFFSET,
                span(height * 0.3, height * 0.9, rng),
            ),
        }
    }

    /// Spawn a bubble just outside `edge`. Returns `None` when the pool is at
    /// its limit.
    pub fn spawn<R: Rng + ?Sized>(
        &mut self,
        edge: SpawnEdge,
        size: f32,
        lifetime_ms: f32,
        theme: &Arc<Theme>,
        rng: &mut R,
    ) -> Option<PoolHandle> {
        let position = self.spawn_position(edge, size, rng);
        self.spawn_at(edge, position, size, lifetime_ms, theme, rng)
    }

    /// Spawn a bubble at an explicit position with `edge`'s initial motion.
    pub fn spawn_at<R: Rng + ?Sized>(
        &mut self,
        edge: SpawnEdge,
        position: Vec2,
        size: f32,
        lifetime_ms: f32,
        theme: &Arc<Theme>,
        rng: &mut R,
    ) -> Option<PoolHandle> {
        if self.pool.available() == 0 {
            log::trace!("Bubble pool at limit ({}), spawn skipped", self.pool.limit());
            return None;
        }

        let (velocity, spawn_bias) = edge.initial_motion(rng);
        let wobble_phase = rng.gen_range(0.0..TAU);
        let wobble_frequency = rng.gen_range(1.2..2.8);
        let color_phase = rng.r#gen::<f32>();
        let decor_seed = rng.r#gen::<u32>();
        let entered_view = self.viewport.contains(position);

        let (handle, bubble) = self.pool.acquire()?;
        *bubble = Bubble {
            position,
            velocity,
            size: size.max(1.0),
            age_ms: 0.0,
            lifetime_ms: lifetime_ms.max(1.0),
            wobble_phase,
            wobble_frequency,
            theme: Arc::clone(theme),
            edge,
            spawn_bias,
            alive: true,
            entered_view,
            grace: 1.0,
            opacity: 1.0,
            color_phase,
            effect_phase: 0.0,
            decor_seed,
        };
        bubble.grace = self.forces.grace_factor(bubble);
        Some(handle)
    }

    /// Advance every bubble by `dt_ms` and retire the dead ones. Returns the
    /// number retired.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        dt_ms: f32,
        speed_multiplier: f32,
        ambient: Ambient<'_>,
        rng: &mut R,
    ) -> usize {
        let Self {
            pool,
            forces,
            viewport,
        } = self;
        let viewport = *viewport;
        let dt = ticks(dt_ms);
        let seconds = dt_ms / 1000.0;

        let retired = pool.retain(|bubble| {
            if !bubble.alive {
                return false;
            }

            bubble.age_ms += dt_ms;
            if !bubble.entered_view && viewport.contains(bubble.position) {
                bubble.entered_view = true;
            }
            bubble.grace = forces.grace_factor(bubble);

            let wind = WindSample {
                global: ambient.wind.current,
                local: ambient.breeze.sample(bubble.position, ambient.time_ms),
            };
            let delta = forces.step(bubble, dt, wind, bubble.grace, viewport, rng);
            bubble.velocity += delta;
            bubble.position += bubble.velocity * dt * speed_multiplier;

            bubble.color_phase =
                (bubble.color_phase + ambient.color_cycle_speed * seconds).rem_euclid(1.0);
            bubble.effect_phase += effect_rate(bubble.theme.effect) * seconds;
            bubble.opacity = fade_opacity(bubble.life_ratio());

            let expired = bubble.age_ms >= bubble.lifetime_ms;
            let escaped =
                !viewport.contains_with_margin(bubble.position, OFFSCREEN_MARGIN + bubble.size);
            if expired || escaped {
                bubble.alive = false;
            }
            bubble.alive
        });

        if retired > 0 {
            log::trace!("Retired {} bubbles, {} active", retired, pool.active_count());
        }
        retired
    }

    /// First bubble, in spawn order, whose disc contains `point`.
    pub fn hit_test(&self, point: Vec2) -> Option<PoolHandle> {
        self.pool
            .iter()
            .find(|(_, bubble)| bubble.alive && bubble.contains(point))
            .map(|(handle, _)| handle)
    }

    /// Kill a bubble immediately and return its slot to the pool. Returns the
    /// final state, or `None` for a stale handle.
    pub fn retire(&mut self, handle: PoolHandle) -> Option<Bubble> {
        let bubble = self.pool.get_mut(handle)?;
        bubble.alive = false;
        let snapshot = bubble.clone();
        self.pool.release(handle).then_some(snapshot)
    }

    /// Retire every bubble.
    pub fn clear(&mut self) {
        self.pool.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PhysicsParameters;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn manager(capacity: usize) -> BubbleManager {
        BubbleManager::new(
            capacity,
            capacity,
            ForceModel::new(PhysicsParameters::default(), false),
            Viewport::new(1000.0, 800.0),
        )
    }

    fn theme() -> Arc<Theme> {
        Arc::new(Theme::classic())
    }

    fn run(manager: &mut BubbleManager, frames: usize, rng: &mut SmallRng) {
        let wind = WindField::calm();
        let breeze = BreezeField::default();
        for frame in 0..frames {
            let ambient = Ambient {
                wind: &wind,
                breeze: &breeze,
                time_ms: frame as f64 * 16.67,
                color_cycle_speed: 0.05,
            };
            manager.update(16.67, 1.0, ambient, rng);
        }
    }

    /// Upward travel of one seeded bubble over 60 calm frames.
    fn travel_at_speed(speed_multiplier: f32) -> f32 {
        let mut rng = SmallRng::seed_from_u64(21);
        let mut manager = BubbleManager::new(
            1,
            1,
            ForceModel::new(PhysicsParameters::default(), true),
            Viewport::new(1000.0, 800.0),
        );
        let start = Vec2::new(500.0, 600.0);
        let handle = manager
            .spawn_at(SpawnEdge::Bottom, start, 100.0, 60_000.0, &theme(), &mut rng)
            .unwrap();

        let wind = WindField::calm();
        let breeze = BreezeField::default();
        for frame in 0..60 {
            let ambient = Ambient {
                wind: &wind,
                breeze: &breeze,
                time_ms: frame as f64 * 16.67,
                color_cycle_speed: 0.05,
            };
            manager.update(16.67, speed_multiplier, ambient, &mut rng);
        }
        start.y - manager.get(handle).unwrap().position.y
    }

    #[test]
    fn test_speed_multiplier_scales_travel() {
        let slow = travel_at_speed(0.1);
        let normal = travel_at_speed(1.0);
        let fast = travel_at_speed(2.0);

        assert!(normal > 0.0, "bubble should rise, travelled {}", normal);
        assert!((slow / normal - 0.1).abs() < 1e-3, "0.1x travelled {}", slow);
        assert!((fast / normal - 2.0).abs() < 1e-3, "2.0x travelled {}", fast);
    }

    #[test]
    fn test_edge_distribution() {
        let mut rng = SmallRng::seed_from_u64(11);
        let total = 20_000;
        let mut counts = [0usize; 3];
        for _ in 0..total {
            match SpawnEdge::pick(&mut rng) {
                SpawnEdge::Bottom => counts[0] += 1,
                SpawnEdge::Left => counts[1] += 1,
                SpawnEdge::Right => counts[2] += 1,
            }
        }
        let share = |count: usize| count as f32 / total as f32;
        assert!((share(counts[0]) - 0.8).abs() < 0.05);
        assert!((share(counts[1]) - 0.1).abs() < 0.05);
        assert!((share(counts[2]) - 0.1).abs() < 0.05);
    }

    #[test]
    fn test_bottom_spawn_moves_up() {
        let mut rng = SmallRng::seed_from_u64(12);
        let mut manager = manager(4);
        let handle = manager
            .spawn(SpawnEdge::Bottom, 80.0, 10_000.0, &theme(), &mut rng)
            .unwrap();
        let bubble = manager.get(handle).unwrap();
        assert!(bubble.velocity.y < 0.0);
        assert!(bubble.position.y > 800.0, "spawned below the viewport");
        assert!((bubble.grace - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_side_spawns_move_inward() {
        let mut rng = SmallRng::seed_from_u64(13);
        let mut manager = manager(4);
        let left = manager
            .spawn(SpawnEdge::Left, 60.0, 10_000.0, &theme(), &mut rng)
            .unwrap();
        let right = manager
            .spawn(SpawnEdge::Right, 60.0, 10_000.0, &theme(), &mut rng)
            .unwrap();
        assert!(manager.get(left).unwrap().velocity.x > 0.0);
        assert!(manager.get(left).unwrap().position.x < 0.0);
        assert!(manager.get(right).unwrap().velocity.x < 0.0);
        assert!(manager.get(right).unwrap().position.x > 1000.0);
    }

    #[test]
    fn test_spawn_respects_limit() {
        let mut rng = SmallRng::seed_from_u64(14);
        let mut manager = manager(2);
        let theme = theme();
        assert!(manager.spawn(SpawnEdge::Bottom, 50.0, 1000.0, &theme, &mut rng).is_some());
        assert!(manager.spawn(SpawnEdge::Bottom, 50.0, 1000.0, &theme, &mut rng).is_some());
        assert!(manager.spawn(SpawnEdge::Bottom, 50.0, 1000.0, &theme, &mut rng).is_none());
        assert_eq!(manager.len() + manager.free_count(), manager.capacity());
    }

    #[test]
    fn test_hit_test_center_and_edge() {
        let mut rng = SmallRng::seed_from_u64(15);
        let mut manager = manager(4);
        let handle = manager
            .spawn_at(SpawnEdge::Bottom, Vec2::new(300.0, 300.0), 100.0, 5000.0, &theme(), &mut rng)
            .unwrap();
        assert_eq!(manager.hit_test(Vec2::new(300.0, 300.0)), Some(handle));
        assert_eq!(manager.hit_test(Vec2::new(350.0, 300.0)), Some(handle));
        assert_eq!(manager.hit_test(Vec2::new(350.01, 300.0)), None);
    }

    #[test]
    fn test_hit_test_first_match_wins() {
        let mut rng = SmallRng::seed_from_u64(16);
        let mut manager = manager(4);
        let theme = theme();
        let first = manager
            .spawn_at(SpawnEdge::Bottom, Vec2::new(300.0, 300.0), 100.0, 5000.0, &theme, &mut rng)
            .unwrap();
        manager
            .spawn_at(SpawnEdge::Bottom, Vec2::new(310.0, 300.0), 100.0, 5000.0, &theme, &mut rng)
            .unwrap();
        assert_eq!(manager.hit_test(Vec2::new(305.0, 300.0)), Some(first));
    }

    #[test]
    fn test_retire_frees_slot_once() {
        let mut rng = SmallRng::seed_from_u64(17);
        let mut manager = manager(1);
        let theme = theme();
        let handle = manager
            .spawn_at(SpawnEdge::Bottom, Vec2::new(100.0, 100.0), 60.0, 5000.0, &theme, &mut rng)
            .unwrap();
        let retired = manager.retire(handle).unwrap();
        assert!(!retired.alive);
        assert!(manager.retire(handle).is_none());
        assert!(manager.hit_test(Vec2::new(100.0, 100.0)).is_none());
        assert!(manager.spawn(SpawnEdge::Bottom, 60.0, 5000.0, &theme, &mut rng).is_some());
    }

    #[test]
    fn test_lifetime_expiry_retires() {
        let mut rng = SmallRng::seed_from_u64(18);
        let mut manager = manager(2);
        manager
            .spawn_at(SpawnEdge::Bottom, Vec2::new(500.0, 400.0), 60.0, 100.0, &theme(), &mut rng)
            .unwrap();
        run(&mut manager, 7, &mut rng);
        assert!(manager.is_empty());
        assert_eq!(manager.free_count(), 2);
    }

    #[test]
    fn test_offscreen_retires() {
        let mut rng = SmallRng::seed_from_u64(19);
        let mut manager = manager(2);
        let handle = manager
            .spawn_at(
                SpawnEdge::Bottom,
                Vec2::new(500.0, 400.0),
                60.0,
                60_000.0,
                &theme(),
                &mut rng,
            )
            .unwrap();
        manager.get_mut(handle).unwrap().position = Vec2::new(500.0, -400.0);
        run(&mut manager, 1, &mut rng);
        assert!(manager.is_empty());
    }

    #[test]
    fn test_opacity_fades_only_late() {
        assert_eq!(fade_opacity(0.0), 1.0);
        assert_eq!(fade_opacity(0.92), 1.0);
        assert!(fade_opacity(0.95) < 1.0);
        assert!(fade_opacity(0.99) < fade_opacity(0.95));
        assert_eq!(fade_opacity(1.5), 0.0);

        let mut previous = 1.0;
        for step in 0..=200 {
            let ratio = step as f32 / 200.0;
            let opacity = fade_opacity(ratio);
            assert!((0.0..=1.0).contains(&opacity));
            if ratio <= FADE_START {
                assert_eq!(opacity, 1.0);
            } else {
                assert!(opacity < previous);
            }
            previous = opacity;
        }
    }

    #[test]
    fn test_grace_ends_when_on_screen() {
        let mut rng = SmallRng::seed_from_u64(20);
        let mut manager = manager(2);
        let handle = manager
            .spawn(SpawnEdge::Bottom, 100.0, 20_000.0, &theme(), &mut rng)
            .unwrap();
        run(&mut manager, 1, &mut rng);
        assert!((manager.get(handle).unwrap().grace - 0.1).abs() < 1e-6);

        manager.get_mut(handle).unwrap().position = Vec2::new(500.0, 400.0);
        run(&mut manager, 1, &mut rng);
        let bubble = manager.get(handle).unwrap();
        assert!(bubble.entered_view);
        assert_eq!(bubble.grace, 1.0);
    }
}
