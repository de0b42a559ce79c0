//! Simulation orchestrator.
//!
//! Owns one instance of every subsystem and runs them in a fixed order per
//! frame: audio loading poll, wind, bubbles, particles, audio clock, spawn
//! scheduling. Pointer presses go through hit testing into the pop pipeline
//! (burst, sound, retirement). Nothing here is process-global, so several
//! simulations can run side by side.

use std::path::Path;
use std::sync::Arc;

use glam::Vec2;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::audio::{AudioOutput, AudioState, AudioTrigger, SilentOutput, TriggerOutcome};
use crate::config::SimulationConfig;
use crate::physics::Viewport;
use crate::physics::bubble::{Ambient, BubbleManager, SpawnEdge};
use crate::physics::forces::ForceModel;
use crate::physics::particles::{BurstReport, ParticleSystem};
use crate::physics::pool::PoolHandle;
use crate::physics::wind::{BreezeField, WindField};
use crate::render::{Renderer, Surface};
use crate::theme::Theme;

/// Shortest allowed gap between scheduled spawns (ms).
const MIN_SPAWN_DELAY_MS: f32 = 16.0;

/// Everything that happened for one pop.
#[derive(Debug, Clone)]
pub struct PopEvent {
    /// Slot the bubble occupied; already released
    pub handle: PoolHandle,
    pub position: Vec2,
    pub size: f32,
    pub theme: Arc<Theme>,
    pub burst: BurstReport,
    pub sound: TriggerOutcome,
}

/// Counters for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    pub frame: u64,
    pub time_ms: f64,
    pub bubbles: usize,
    pub bubble_limit: usize,
    pub particles: usize,
    pub particle_limit: usize,
    pub active_sounds: usize,
    pub queued_sounds: usize,
    pub audio_state: AudioState,
    pub spawned: u64,
    pub pops: u64,
    pub wind: Vec2,
    pub paused: bool,
}

impl std::fmt::Display for FrameStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "t={:.1}s bubbles={}/{} particles={}/{} sounds={}+{} audio={:?} \
             spawned={} pops={} wind=({:.4}, {:.4})",
            self.time_ms / 1000.0,
            self.bubbles,
            self.bubble_limit,
            self.particles,
            self.particle_limit,
            self.active_sounds,
            self.queued_sounds,
            self.audio_state,
            self.spawned,
            self.pops,
            self.wind.x,
            self.wind.y,
        )
    }
}

pub struct Simulation {
    config: SimulationConfig,
    viewport: Viewport,
    bubbles: BubbleManager,
    particles: ParticleSystem,
    wind: WindField,
    breeze: BreezeField,
    audio: AudioTrigger,
    renderer: Renderer,
    theme: Arc<Theme>,
    rng: SmallRng,
    clock_ms: f64,
    /// Time left until the next scheduled spawn
    spawn_timer_ms: f32,
    paused: bool,
    frame: u64,
    spawned: u64,
    pops: u64,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("viewport", &self.viewport)
            .field("stats", &self.stats())
            .finish()
    }
}

impl Simulation {
    /// Silent simulation seeded from entropy.
    pub fn new(config: SimulationConfig, width: f32, height: f32) -> Self {
        Self::with_parts(
            config,
            width,
            height,
            Box::new(SilentOutput::new()),
            SmallRng::from_entropy(),
        )
    }

    /// Silent simulation with reproducible randomness.
    pub fn with_seed(config: SimulationConfig, width: f32, height: f32, seed: u64) -> Self {
        Self::with_parts(
            config,
            width,
            height,
            Box::new(SilentOutput::new()),
            SmallRng::seed_from_u64(seed),
        )
    }

    /// Simulation playing pop sounds through `output`, seeded when `seed` is
    /// given.
    pub fn with_output(
        config: SimulationConfig,
        width: f32,
        height: f32,
        output: Box<dyn AudioOutput>,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Self::with_parts(config, width, height, output, rng)
    }

    fn with_parts(
        config: SimulationConfig,
        width: f32,
        height: f32,
        output: Box<dyn AudioOutput>,
        mut rng: SmallRng,
    ) -> Self {
        let config = config.sanitized();
        let viewport = Viewport::new(width.max(1.0), height.max(1.0));
        let forces = ForceModel::new(config.physics.clone(), config.visual.reduced_quality);

        let bubbles = BubbleManager::new(
            config.bubble_capacity(),
            config.effective_max_bubbles(),
            forces,
            viewport,
        );
        let particles = ParticleSystem::new(
            config.particle_capacity(),
            config.effective_max_particles(),
            config.particles.clone(),
            viewport,
        );

        let mut wind = WindField::new(config.wind.clone());
        wind.roll_target(&mut rng);
        let mut breeze = BreezeField::new(&config.wind);
        breeze.regenerate(viewport, &mut rng);

        let mut audio = AudioTrigger::new(&config.audio, output).with_seed(rng.r#gen());
        let mut themes = Theme::presets();
        themes.push(config.visual.theme.clone());
        audio.start_loading(config.audio.asset_dir.as_deref().map(Path::new), &themes);

        let theme = Arc::new(config.visual.theme.clone());
        log::info!(
            "Simulation {}x{}: {} bubbles, {} particles, theme '{}'",
            viewport.width,
            viewport.height,
            config.effective_max_bubbles(),
            config.effective_max_particles(),
            theme.name
        );

        let mut simulation = Self {
            config,
            viewport,
            bubbles,
            particles,
            wind,
            breeze,
            audio,
            renderer: Renderer::new(),
            theme,
            rng,
            clock_ms: 0.0,
            spawn_timer_ms: 0.0,
            paused: false,
            frame: 0,
            spawned: 0,
            pops: 0,
        };
        simulation.spawn_timer_ms = simulation.next_spawn_delay();
        simulation
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn bubbles(&self) -> &BubbleManager {
        &self.bubbles
    }

    pub fn bubbles_mut(&mut self) -> &mut BubbleManager {
        &mut self.bubbles
    }

    pub fn particles(&self) -> &ParticleSystem {
        &self.particles
    }

    pub fn wind(&self) -> &WindField {
        &self.wind
    }

    pub fn wind_mut(&mut self) -> &mut WindField {
        &mut self.wind
    }

    pub fn breeze(&self) -> &BreezeField {
        &self.breeze
    }

    pub fn breeze_mut(&mut self) -> &mut BreezeField {
        &mut self.breeze
    }

    pub fn audio(&self) -> &AudioTrigger {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut AudioTrigger {
        &mut self.audio
    }

    pub fn renderer_mut(&mut self) -> &mut Renderer {
        &mut self.renderer
    }

    pub fn theme(&self) -> &Arc<Theme> {
        &self.theme
    }

    /// Simulated time (ms); frozen while paused.
    pub fn clock_ms(&self) -> f64 {
        self.clock_ms
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Paused frames skip every update; elapsed time is not accumulated.
    pub fn set_paused(&mut self, paused: bool) {
        if self.paused != paused {
            log::info!("Simulation {}", if paused { "paused" } else { "resumed" });
        }
        self.paused = paused;
    }

    /// Advance one frame. Returns the clamped step actually simulated (0.0
    /// while paused).
    pub fn frame(&mut self, elapsed_ms: f32) -> f32 {
        let dt = if elapsed_ms.is_finite() {
            elapsed_ms.clamp(0.0, self.config.physics.max_frame_ms)
        } else {
            0.0
        };

        self.audio.poll_loading();
        if self.paused {
            return 0.0;
        }

        self.clock_ms += f64::from(dt);
        self.frame += 1;

        self.wind.update(dt, &mut self.rng);
        self.breeze.expire(self.clock_ms);

        let ambient = Ambient {
            wind: &self.wind,
            breeze: &self.breeze,
            time_ms: self.clock_ms,
            color_cycle_speed: self.config.visual.color_cycle_speed,
        };
        self.bubbles
            .update(dt, self.config.physics.speed_multiplier, ambient, &mut self.rng);
        self.particles.update(dt);
        self.audio.update(dt);

        self.spawn_timer_ms -= dt;
        if self.spawn_timer_ms <= 0.0 {
            self.spawn_random();
            self.spawn_timer_ms = self.next_spawn_delay();
        }
        dt
    }

    /// Delay until the next spawn: the configured interval divided by the
    /// density, with symmetric random variation.
    fn next_spawn_delay(&mut self) -> f32 {
        let spawn = &self.config.spawn;
        let base = spawn.spawn_interval_ms / spawn.density_multiplier.max(0.01);
        let variation = spawn.spawn_variation;
        let jitter = if variation > 0.0 {
            self.rng.gen_range(-variation..=variation)
        } else {
            0.0
        };
        (base * (1.0 + jitter)).max(MIN_SPAWN_DELAY_MS)
    }

    /// Spawn one bubble with random edge, size and lifetime. Skipped when the
    /// pool is at its limit.
    pub fn spawn_random(&mut self) -> Option<PoolHandle> {
        let edge = SpawnEdge::pick(&mut self.rng);
        let spawn = &self.config.spawn;
        let size = if spawn.max_size > spawn.min_size {
            self.rng.gen_range(spawn.min_size..=spawn.max_size)
        } else {
            spawn.min_size
        };
        self.spawn_bubble(edge, size)
    }

    /// Spawn a bubble of `size` just outside `edge`.
    pub fn spawn_bubble(&mut self, edge: SpawnEdge, size: f32) -> Option<PoolHandle> {
        let lifetime = self.roll_lifetime();
        let handle = self
            .bubbles
            .spawn(edge, size, lifetime, &self.theme, &mut self.rng);
        if handle.is_some() {
            self.spawned += 1;
        }
        handle
    }

    /// Spawn a bubble at an explicit position, moving as if it came from `edge`.
    pub fn spawn_bubble_at(
        &mut self,
        edge: SpawnEdge,
        position: Vec2,
        size: f32,
    ) -> Option<PoolHandle> {
        let lifetime = self.roll_lifetime();
        let handle = self
            .bubbles
            .spawn_at(edge, position, size, lifetime, &self.theme, &mut self.rng);
        if handle.is_some() {
            self.spawned += 1;
        }
        handle
    }

    fn roll_lifetime(&mut self) -> f32 {
        let spawn = &self.config.spawn;
        let variation = spawn.lifetime_variation;
        let factor = if variation > 0.0 {
            1.0 + self.rng.gen_range(-variation..=variation)
        } else {
            1.0
        };
        spawn.lifetime_ms * factor
    }

    /// Pointer or touch press at `(x, y)`. Always counts as a user gesture for
    /// audio activation; pops the first bubble under the point, if any.
    pub fn pointer_down(&mut self, x: f32, y: f32) -> Option<PopEvent> {
        self.audio.user_gesture();
        let handle = self.bubbles.hit_test(Vec2::new(x, y))?;
        self.pop(handle)
    }

    /// Gesture that is not a press on the surface (key press, button).
    pub fn user_gesture(&mut self) {
        self.audio.user_gesture();
    }

    /// Pop a bubble: retire it, burst particles and trigger one sound.
    pub fn pop(&mut self, handle: PoolHandle) -> Option<PopEvent> {
        let bubble = self.bubbles.retire(handle)?;
        let quality = self.config.quality_level();

        let burst = self.particles.burst(
            bubble.position,
            bubble.size,
            bubble.color(),
            quality,
            &mut self.rng,
        );
        let sound = self.audio.trigger(bubble.size, &bubble.theme);

        if self.config.wind.pop_turbulence {
            self.breeze.add_turbulence(
                bubble.position,
                bubble.size * 1.5,
                self.config.wind.breeze_strength * 2.0,
                self.clock_ms,
            );
        }

        self.pops += 1;
        log::debug!(
            "Popped {:.0}px bubble at ({:.0}, {:.0}): {} droplets, sound {:?}",
            bubble.size,
            bubble.position.x,
            bubble.position.y,
            burst.droplets,
            sound
        );

        Some(PopEvent {
            handle,
            position: bubble.position,
            size: bubble.size,
            theme: bubble.theme,
            burst,
            sound,
        })
    }

    /// Draw bubbles then particles.
    pub fn render(&mut self, surface: &mut dyn Surface) {
        self.renderer.draw_frame(surface, &self.bubbles, &self.particles);
    }

    /// Change the viewport; breeze zones are regenerated for the new bounds.
    pub fn resize(&mut self, width: f32, height: f32) {
        let viewport = Viewport::new(width.max(1.0), height.max(1.0));
        if viewport == self.viewport {
            return;
        }
        self.viewport = viewport;
        self.bubbles.set_viewport(viewport);
        self.particles.set_bounds(viewport);
        self.breeze.regenerate(viewport, &mut self.rng);
        log::info!(
            "Viewport resized to {}x{}, {} breeze zones",
            viewport.width,
            viewport.height,
            self.breeze.len()
        );
    }

    /// Apply a changed configuration without reallocating pools. Limits
    /// above the allocated capacity are clamped to it.
    pub fn apply_config(&mut self, config: SimulationConfig) {
        let config = config.sanitized();

        self.bubbles.set_limit(config.effective_max_bubbles());
        self.bubbles.set_forces(ForceModel::new(
            config.physics.clone(),
            config.visual.reduced_quality,
        ));
        self.particles.set_limit(config.effective_max_particles());
        self.particles.set_params(config.particles.clone());
        self.wind.set_params(config.wind.clone());
        self.breeze.set_params(&config.wind);
        self.audio.apply_params(&config.audio);

        if config.visual.theme != *self.theme {
            self.theme = Arc::new(config.visual.theme.clone());
        }

        log::info!(
            "Configuration applied: {} bubbles, {} particles, speed {:.1}x, theme '{}'",
            self.bubbles.capacity().min(config.effective_max_bubbles()),
            self.particles.capacity().min(config.effective_max_particles()),
            config.physics.speed_multiplier,
            self.theme.name
        );
        self.config = config;
    }

    /// Theme for bubbles spawned from now on.
    pub fn set_theme(&mut self, theme: Theme) {
        self.config.visual.theme = theme.clone();
        self.theme = Arc::new(theme);
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.config.audio.volume = volume.clamp(0.0, 1.0);
        self.audio.set_volume(volume);
    }

    pub fn stats(&self) -> FrameStats {
        FrameStats {
            frame: self.frame,
            time_ms: self.clock_ms,
            bubbles: self.bubbles.len(),
            bubble_limit: self.config.effective_max_bubbles().min(self.bubbles.capacity()),
            particles: self.particles.len(),
            particle_limit: self.config.effective_max_particles().min(self.particles.capacity()),
            active_sounds: self.audio.active_count(),
            queued_sounds: self.audio.queued_count(),
            audio_state: self.audio.state(),
            spawned: self.spawned,
            pops: self.pops,
            wind: self.wind.current,
            paused: self.paused,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::Strategy;

    fn simulation() -> Simulation {
        Simulation::with_seed(SimulationConfig::default(), 1000.0, 800.0, 42)
    }

    #[test]
    fn test_spawns_over_time() {
        let mut sim = simulation();
        for _ in 0..600 {
            sim.frame(16.67);
        }
        let stats = sim.stats();
        assert!(stats.spawned > 0);
        assert!(stats.bubbles <= stats.bubble_limit);
    }

    #[test]
    fn test_paused_frames_do_nothing() {
        let mut sim = simulation();
        sim.frame(16.67);
        let before = sim.stats();
        sim.set_paused(true);
        for _ in 0..100 {
            assert_eq!(sim.frame(16.67), 0.0);
        }
        let after = sim.stats();
        assert_eq!(before.frame, after.frame);
        assert_eq!(before.time_ms, after.time_ms);

        sim.set_paused(false);
        sim.frame(16.67);
        assert_eq!(sim.stats().frame, before.frame + 1);
    }

    #[test]
    fn test_long_frame_clamped() {
        let mut sim = simulation();
        assert_eq!(sim.frame(5000.0), 100.0);
        assert_eq!(sim.frame(-3.0), 0.0);
        assert_eq!(sim.frame(f32::NAN), 0.0);
        assert!((sim.clock_ms() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_pointer_miss_still_counts_as_gesture() {
        let mut sim = simulation();
        assert_eq!(sim.audio().state(), AudioState::Suspended);
        assert!(sim.pointer_down(5.0, 5.0).is_none());
        assert_eq!(sim.audio().state(), AudioState::Active);
    }

    #[test]
    fn test_pop_pipeline() {
        let mut sim = simulation();
        let handle = sim
            .spawn_bubble_at(SpawnEdge::Bottom, Vec2::new(400.0, 300.0), 150.0)
            .unwrap();
        let event = sim.pointer_down(400.0, 300.0).unwrap();
        assert_eq!(event.handle, handle);
        assert_eq!(event.burst.droplets, 8);
        assert!(event.burst.ring);
        assert!(matches!(event.sound, TriggerOutcome::Played(..)));
        assert!(sim.bubbles().get(handle).is_none());
        assert_eq!(sim.stats().pops, 1);
    }

    #[test]
    fn test_resize_regenerates_breeze() {
        let mut sim = simulation();
        sim.resize(400.0, 300.0);
        assert_eq!(sim.viewport(), Viewport::new(400.0, 300.0));
        assert!((4..=6).contains(&sim.breeze().len()));
        for zone in sim.breeze().zones() {
            assert!(zone.center.x <= 400.0 && zone.center.y <= 300.0);
        }
    }

    #[test]
    fn test_apply_config_rescales_limits() {
        let mut sim = simulation();
        let mut config = SimulationConfig::default();
        config.spawn.density_multiplier = 0.2;
        sim.apply_config(config);
        assert_eq!(sim.stats().bubble_limit, 5);

        for _ in 0..10 {
            sim.spawn_bubble(SpawnEdge::Bottom, 60.0);
        }
        assert_eq!(sim.bubbles().len(), 5);
    }

    #[test]
    fn test_apply_config_theme_and_volume_reach_next_pop() {
        let mut sim = simulation();
        let before = sim
            .spawn_bubble_at(SpawnEdge::Bottom, Vec2::new(200.0, 200.0), 100.0)
            .unwrap();

        let mut config = SimulationConfig::default();
        config.visual.theme = Theme::pearl();
        config.audio.volume = 0.2;
        sim.apply_config(config);

        // Bubbles already in flight keep the theme they spawned with
        assert_eq!(sim.bubbles().get(before).unwrap().theme.name, "classic");

        let handle = sim
            .spawn_bubble_at(SpawnEdge::Bottom, Vec2::new(600.0, 400.0), 120.0)
            .unwrap();
        assert_eq!(sim.bubbles().get(handle).unwrap().theme.name, "pearl");

        let event = sim.pointer_down(600.0, 400.0).unwrap();
        assert_eq!(event.theme.name, "pearl");
        assert!(matches!(event.sound, TriggerOutcome::Played(_, Strategy::Synth)));
        assert!((sim.audio().instances()[0].gain - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_set_theme_and_volume() {
        let mut sim = simulation();
        sim.set_theme(Theme::galaxy());
        sim.set_volume(1.5);
        assert_eq!(sim.config().visual.theme.name, "galaxy");
        assert_eq!(sim.config().audio.volume, 1.0);

        sim.spawn_bubble_at(SpawnEdge::Bottom, Vec2::new(300.0, 300.0), 80.0)
            .unwrap();
        let event = sim.pointer_down(300.0, 300.0).unwrap();
        assert_eq!(event.theme.name, "galaxy");
        assert!((sim.audio().instances()[0].gain - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_pop_turbulence_injects_zone() {
        let mut config = SimulationConfig::default();
        config.wind.pop_turbulence = true;
        let mut sim = Simulation::with_seed(config, 1000.0, 800.0, 7);
        let zones = sim.breeze().len();
        sim.spawn_bubble_at(SpawnEdge::Bottom, Vec2::new(500.0, 400.0), 100.0);
        sim.pointer_down(500.0, 400.0).unwrap();
        assert_eq!(sim.breeze().len(), zones + 1);
    }
}
