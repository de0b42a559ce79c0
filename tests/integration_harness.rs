//! Integration test harness for the bubble pop simulation
//!
//! Drives a seeded `Simulation` through scripted steps and renders into a
//! software surface, so the full frame cycle runs without a display.

use bubble_pop_sim::audio::{AudioState, Strategy, TriggerOutcome};
use bubble_pop_sim::config::SimulationConfig;
use bubble_pop_sim::physics::SpawnEdge;
use bubble_pop_sim::physics::pool::PoolHandle;
use bubble_pop_sim::render::RasterSurface;
use bubble_pop_sim::{PopEvent, Simulation};
use glam::Vec2;

const DT: f32 = 16.67;

/// Test harness for integration testing
pub struct TestHarness {
    sim: Simulation,
    surface: RasterSurface,
    frames: Vec<Vec<u8>>,
    pops: Vec<PopEvent>,
}

/// Steps that can be executed in a test scenario
#[derive(Debug, Clone)]
pub enum TestStep {
    /// Render a frame and capture the pixels
    RenderFrame,
    /// Advance one frame by the given elapsed milliseconds
    Advance(f32),
    /// Advance at 60 Hz until at least this many milliseconds have passed
    AdvanceFor(f32),
    /// Press the surface at (x, y)
    Press(f32, f32),
    /// Spawn a bubble of the given size at (x, y)
    SpawnAt(f32, f32, f32),
    /// Pause or resume
    SetPaused(bool),
    /// Resize the viewport and surface
    Resize(u32, u32),
}

impl TestHarness {
    /// Create a harness with a seeded simulation of the given size
    pub fn new(config: SimulationConfig, width: u32, height: u32, seed: u64) -> Self {
        Self {
            sim: Simulation::with_seed(config, width as f32, height as f32, seed),
            surface: RasterSurface::new(width, height),
            frames: Vec::new(),
            pops: Vec::new(),
        }
    }

    /// Harness with wind, breeze and automatic spawning switched off
    pub fn still(width: u32, height: u32, seed: u64) -> Self {
        Self::new(still_config(), width, height, seed)
    }

    /// Render a frame and return the pixel data
    pub fn render_frame(&mut self) -> &[u8] {
        self.sim.render(&mut self.surface);
        self.frames.push(self.surface.as_raw().to_vec());
        self.frames.last().map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Get the last rendered frame
    pub fn last_frame(&self) -> Option<&[u8]> {
        self.frames.last().map(|v| v.as_slice())
    }

    pub fn sim(&self) -> &Simulation {
        &self.sim
    }

    pub fn sim_mut(&mut self) -> &mut Simulation {
        &mut self.sim
    }

    /// Pops produced by `Press` steps
    pub fn pops(&self) -> &[PopEvent] {
        &self.pops
    }

    pub fn advance_for(&mut self, total_ms: f32) {
        let start = self.sim.clock_ms();
        while self.sim.clock_ms() - start < f64::from(total_ms) {
            self.sim.frame(DT);
        }
    }

    pub fn spawn_at(&mut self, x: f32, y: f32, size: f32) -> Option<PoolHandle> {
        self.sim.spawn_bubble_at(SpawnEdge::Bottom, Vec2::new(x, y), size)
    }

    /// Run a sequence of test steps and return captured frames
    pub fn run_scenario(&mut self, steps: &[TestStep]) -> Vec<Vec<u8>> {
        let mut captured = Vec::new();

        for step in steps {
            match step {
                TestStep::RenderFrame => {
                    let frame = self.render_frame().to_vec();
                    captured.push(frame);
                }
                TestStep::Advance(ms) => {
                    self.sim.frame(*ms);
                }
                TestStep::AdvanceFor(ms) => self.advance_for(*ms),
                TestStep::Press(x, y) => {
                    if let Some(event) = self.sim.pointer_down(*x, *y) {
                        self.pops.push(event);
                    }
                }
                TestStep::SpawnAt(x, y, size) => {
                    self.spawn_at(*x, *y, *size);
                }
                TestStep::SetPaused(paused) => self.sim.set_paused(*paused),
                TestStep::Resize(width, height) => {
                    self.sim.resize(*width as f32, *height as f32);
                    self.surface.resize(*width, *height);
                }
            }
        }

        captured
    }
}

/// Zero wind, zero breeze, spawning effectively disabled
pub fn still_config() -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.wind.min_strength = 0.0;
    config.wind.max_strength = 0.0;
    config.wind.gust_probability = 0.0;
    config.wind.breeze_strength = 0.0;
    config.spawn.spawn_interval_ms = 1.0e9;
    config
}

/// Helper to compute the percentage of pixels that differ
pub fn frame_diff_ratio(a: &[u8], b: &[u8], tolerance: u8) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 1.0;
    }

    let pixel_count = a.len() / 4;
    let diff_count = a
        .chunks_exact(4)
        .zip(b.chunks_exact(4))
        .filter(|(pa, pb)| {
            pa.iter()
                .zip(pb.iter())
                .take(3)
                .any(|(x, y)| (*x as i32 - *y as i32).abs() > tolerance as i32)
        })
        .count();

    diff_count as f64 / pixel_count as f64
}

// ============================================================================
// Integration Tests
// ============================================================================

#[test]
fn test_spawned_bubble_rises_and_leaves_grace() {
    let mut harness = TestHarness::still(1000, 800, 1);
    let handle = harness.spawn_at(500.0, 1000.0, 150.0).unwrap();
    assert!(harness.sim().bubbles().get(handle).unwrap().grace < 1.0);

    harness.advance_for(2050.0);

    let bubble = harness.sim().bubbles().get(handle).unwrap();
    assert!(bubble.position.y < 1000.0, "bubble should move upward, y = {}", bubble.position.y);
    assert_eq!(bubble.grace, 1.0);
}

#[test]
fn test_pop_bursts_sounds_and_frees_slot() {
    let mut harness = TestHarness::still(1000, 800, 2);
    let handle = harness.spawn_at(400.0, 400.0, 200.0).unwrap();

    let event = harness.sim_mut().pointer_down(400.0, 400.0).unwrap();
    let expected = (8.0f32 * (200.0f32 / 150.0).clamp(0.5, 3.0)).round() as usize;
    assert_eq!(event.burst.droplets, expected);
    assert!(event.burst.ring);
    assert_eq!(event.size, 200.0);
    assert_eq!(event.theme.name, harness.sim().theme().name);
    assert!(matches!(event.sound, TriggerOutcome::Played(_, Strategy::Synth)));
    assert_eq!(harness.sim().audio().active_count(), 1);
    assert_eq!(harness.sim().particles().len(), expected + 1);

    let reused = harness.spawn_at(100.0, 100.0, 80.0).unwrap();
    assert_eq!(reused.index(), handle.index());
    assert_ne!(reused, handle);
    assert!(harness.sim().bubbles().get(handle).is_none());
}

#[test]
fn test_pool_invariants_hold_under_load() {
    let mut config = SimulationConfig::default();
    config.spawn.spawn_interval_ms = 50.0;
    let mut harness = TestHarness::new(config, 800, 600, 3);

    for frame in 0..1200 {
        harness.sim_mut().frame(DT);
        if frame % 7 == 0 {
            let targets: Vec<Vec2> = harness
                .sim()
                .bubbles()
                .iter()
                .map(|(_, bubble)| bubble.position)
                .collect();
            for point in targets.into_iter().take(2) {
                harness.sim_mut().pointer_down(point.x, point.y);
            }
        }

        let sim = harness.sim();
        let bubbles = sim.bubbles();
        let particles = sim.particles();
        let stats = sim.stats();
        assert_eq!(bubbles.len() + bubbles.free_count(), bubbles.capacity());
        assert_eq!(particles.len() + particles.free_count(), particles.capacity());
        assert!(stats.bubbles <= stats.bubble_limit);
        assert!(stats.particles <= stats.particle_limit);
        assert!(stats.active_sounds <= 5);
    }
    assert!(harness.sim().stats().pops > 0);
}

#[test]
fn test_opacity_stays_in_range() {
    let mut harness = TestHarness::new(SimulationConfig::default(), 800, 600, 4);
    for _ in 0..900 {
        harness.sim_mut().frame(DT);
        for (_, bubble) in harness.sim().bubbles().iter() {
            assert!((0.0..=1.0).contains(&bubble.opacity));
            if bubble.life_ratio() <= 0.92 {
                assert_eq!(bubble.opacity, 1.0);
            }
        }
    }
}

#[test]
fn test_first_press_activates_audio() {
    let mut harness = TestHarness::still(400, 400, 5);
    assert_eq!(harness.sim().audio().state(), AudioState::Suspended);
    assert!(!harness.sim().audio().is_ready());

    harness.run_scenario(&[TestStep::Press(10.0, 10.0)]);
    assert!(harness.pops().is_empty());
    assert_eq!(harness.sim().audio().state(), AudioState::Active);
    assert!(harness.sim().audio().is_ready());
}

#[test]
fn test_sound_slots_free_after_completion() {
    let mut harness = TestHarness::still(600, 600, 6);
    for i in 0..7 {
        harness.spawn_at(50.0 + i as f32 * 80.0, 300.0, 60.0);
    }
    for i in 0..7 {
        harness.sim_mut().pointer_down(50.0 + i as f32 * 80.0, 300.0);
    }
    assert_eq!(harness.sim().audio().active_count(), 5);
    assert_eq!(harness.sim().audio().queued_count(), 2);

    // Queue entries outlive their ttl before any voice ends
    harness.advance_for(150.0);
    assert_eq!(harness.sim().audio().queued_count(), 0);
    assert_eq!(harness.sim().audio().dropped_count(), 2);

    harness.advance_for(2000.0);
    assert_eq!(harness.sim().audio().active_count(), 0);
    assert_eq!(harness.sim().audio().completed_count(), 5);
}

#[test]
fn test_mute_stops_sounds() {
    let mut harness = TestHarness::still(400, 400, 7);
    harness.spawn_at(200.0, 200.0, 100.0);
    harness.sim_mut().pointer_down(200.0, 200.0);
    assert_eq!(harness.sim().audio().active_count(), 1);

    harness.sim_mut().audio_mut().mute();
    assert_eq!(harness.sim().audio().active_count(), 0);
    assert!(harness.sim().audio().is_muted());

    harness.spawn_at(200.0, 200.0, 100.0);
    let event = harness.sim_mut().pointer_down(200.0, 200.0).unwrap();
    assert!(matches!(event.sound, TriggerOutcome::Ignored(_)));
    assert!(event.burst.ring, "visual burst is unaffected by mute");
}

#[test]
fn test_paused_frames_render_identically() {
    let mut harness = TestHarness::new(SimulationConfig::default(), 320, 240, 8);
    harness.advance_for(6000.0);
    assert!(!harness.sim().bubbles().is_empty());

    let frames = harness.run_scenario(&[
        TestStep::SetPaused(true),
        TestStep::RenderFrame,
        TestStep::Advance(16.67),
        TestStep::Advance(16.67),
        TestStep::RenderFrame,
        TestStep::SetPaused(false),
        TestStep::AdvanceFor(500.0),
        TestStep::RenderFrame,
    ]);

    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0], frames[1], "paused frames should not change");
    assert!(
        frame_diff_ratio(&frames[1], &frames[2], 0) > 0.0,
        "resumed frames should move"
    );
}

#[test]
fn test_seeded_runs_are_deterministic() {
    let scenario = [
        TestStep::AdvanceFor(2000.0),
        TestStep::RenderFrame,
        TestStep::Press(160.0, 120.0),
        TestStep::AdvanceFor(200.0),
        TestStep::RenderFrame,
    ];

    let mut a = TestHarness::new(SimulationConfig::default(), 320, 240, 9);
    let mut b = TestHarness::new(SimulationConfig::default(), 320, 240, 9);
    assert_eq!(a.run_scenario(&scenario), b.run_scenario(&scenario));
}

#[test]
fn test_pop_changes_rendered_frame() {
    let mut harness = TestHarness::still(300, 300, 10);
    let frames = harness.run_scenario(&[
        TestStep::SpawnAt(150.0, 150.0, 120.0),
        TestStep::RenderFrame,
        TestStep::Press(150.0, 150.0),
        TestStep::Advance(16.67),
        TestStep::RenderFrame,
        TestStep::AdvanceFor(2000.0),
        TestStep::RenderFrame,
    ]);

    assert_eq!(harness.pops().len(), 1);
    assert!(frame_diff_ratio(&frames[0], &frames[1], 2) > 0.01);

    // Particles gone, bubble gone: nothing but background
    let background = frames[2][..4].to_vec();
    assert!(frames[2].chunks_exact(4).all(|pixel| pixel == background.as_slice()));
}

#[test]
fn test_resize_scenario() {
    let mut harness = TestHarness::new(SimulationConfig::default(), 320, 240, 11);
    let frames = harness.run_scenario(&[
        TestStep::AdvanceFor(1000.0),
        TestStep::RenderFrame,
        TestStep::Resize(160, 120),
        TestStep::AdvanceFor(1000.0),
        TestStep::RenderFrame,
    ]);
    assert_eq!(frames[0].len(), 320 * 240 * 4);
    assert_eq!(frames[1].len(), 160 * 120 * 4);
    assert_eq!(harness.last_frame().map(|f| f.len()), Some(160 * 120 * 4));
}

#[test]
fn test_frame_diff_utility() {
    let a = vec![255, 0, 0, 255, 0, 255, 0, 255];
    let b = vec![255, 0, 0, 255, 0, 255, 0, 255];
    let c = vec![0, 0, 255, 255, 255, 255, 0, 255];

    assert_eq!(frame_diff_ratio(&a, &b, 0), 0.0, "Identical frames");
    assert_eq!(frame_diff_ratio(&a, &c, 0), 1.0, "Completely different frames");
    assert_eq!(frame_diff_ratio(&a, &[], 0), 1.0, "Mismatched lengths");
}
