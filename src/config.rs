//! Configuration module for the bubble simulation.
//!
//! Every numeric parameter the host's settings surface can change lives here,
//! grouped by the component that consumes it. All fields carry serde defaults
//! so partial JSON files load cleanly.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::theme::Theme;

/// Largest density multiplier the host may request. Pools are allocated for it
/// up front so density changes never reallocate.
pub const MAX_DENSITY: f32 = 6.0;

/// Spawn scheduling and bubble population parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnParameters {
    /// Maximum simultaneous bubbles at density 1.0
    #[serde(default = "default_max_bubbles")]
    pub max_bubbles: u32,

    /// Mean time between spawns (ms) at density 1.0
    #[serde(default = "default_spawn_interval")]
    pub spawn_interval_ms: f32,

    /// Relative random variation of the spawn interval (0.0 to 1.0)
    #[serde(default = "default_variation")]
    pub spawn_variation: f32,

    /// Mean bubble lifetime (ms)
    #[serde(default = "default_lifetime")]
    pub lifetime_ms: f32,

    /// Relative random variation of the lifetime (0.0 to 1.0)
    #[serde(default = "default_lifetime_variation")]
    pub lifetime_variation: f32,

    /// Smallest spawned diameter (px)
    #[serde(default = "default_min_size")]
    pub min_size: f32,

    /// Largest spawned diameter (px)
    #[serde(default = "default_max_size")]
    pub max_size: f32,

    /// Density multiplier (0.2 to 6.0); also rescales max counts
    #[serde(default = "default_one")]
    pub density_multiplier: f32,
}

fn default_max_bubbles() -> u32 {
    25
}

fn default_spawn_interval() -> f32 {
    900.0
}

fn default_variation() -> f32 {
    0.4
}

fn default_lifetime() -> f32 {
    12_000.0
}

fn default_lifetime_variation() -> f32 {
    0.3
}

fn default_min_size() -> f32 {
    40.0
}

fn default_max_size() -> f32 {
    160.0
}

fn default_one() -> f32 {
    1.0
}

impl Default for SpawnParameters {
    fn default() -> Self {
        Self {
            max_bubbles: default_max_bubbles(),
            spawn_interval_ms: default_spawn_interval(),
            spawn_variation: default_variation(),
            lifetime_ms: default_lifetime(),
            lifetime_variation: default_lifetime_variation(),
            min_size: default_min_size(),
            max_size: default_max_size(),
            density_multiplier: default_one(),
        }
    }
}

/// Force model tuning. Per-tick values assume a 60 Hz tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicsParameters {
    /// Global speed multiplier applied at integration (0.1 to 2.0)
    #[serde(default = "default_one")]
    pub speed_multiplier: f32,

    /// Upward acceleration per tick before size scaling (px/tick^2)
    #[serde(default = "default_buoyancy")]
    pub buoyancy: f32,

    /// Wobble acceleration amplitude (px/tick^2)
    #[serde(default = "default_wobble")]
    pub wobble_strength: f32,

    /// Fraction of the ambient wind transferred to a bubble
    #[serde(default = "default_wind_coupling")]
    pub wind_coupling: f32,

    /// Strength of the size-proportional wind resistance term
    #[serde(default = "default_wind_resistance")]
    pub wind_resistance: f32,

    /// Per-tick velocity retention (raised to the power of dt)
    #[serde(default = "default_drag")]
    pub drag_coefficient: f32,

    /// Width of the soft side/top margins (px)
    #[serde(default = "default_boundary_margin")]
    pub boundary_margin: f32,

    /// Side restoring acceleration at full margin penetration (px/tick^2)
    #[serde(default = "default_boundary_stiffness")]
    pub boundary_stiffness: f32,

    /// Top restoring acceleration at full margin penetration (px/tick^2)
    #[serde(default = "default_top_stiffness")]
    pub top_stiffness: f32,

    /// Length of the post-spawn grace period (ms)
    #[serde(default = "default_grace_period")]
    pub grace_period_ms: f32,

    /// Force multiplier applied during the grace period
    #[serde(default = "default_grace_factor")]
    pub grace_factor: f32,

    /// Upper bound for a single frame's elapsed time (ms)
    #[serde(default = "default_max_frame")]
    pub max_frame_ms: f32,
}

fn default_buoyancy() -> f32 {
    0.012
}

fn default_wobble() -> f32 {
    0.02
}

fn default_wind_coupling() -> f32 {
    0.6
}

fn default_wind_resistance() -> f32 {
    0.4
}

fn default_drag() -> f32 {
    0.985
}

fn default_boundary_margin() -> f32 {
    60.0
}

fn default_boundary_stiffness() -> f32 {
    0.04
}

fn default_top_stiffness() -> f32 {
    0.008
}

fn default_grace_period() -> f32 {
    2000.0
}

fn default_grace_factor() -> f32 {
    0.1
}

fn default_max_frame() -> f32 {
    100.0
}

impl Default for PhysicsParameters {
    fn default() -> Self {
        Self {
            speed_multiplier: default_one(),
            buoyancy: default_buoyancy(),
            wobble_strength: default_wobble(),
            wind_coupling: default_wind_coupling(),
            wind_resistance: default_wind_resistance(),
            drag_coefficient: default_drag(),
            boundary_margin: default_boundary_margin(),
            boundary_stiffness: default_boundary_stiffness(),
            top_stiffness: default_top_stiffness(),
            grace_period_ms: default_grace_period(),
            grace_factor: default_grace_factor(),
            max_frame_ms: default_max_frame(),
        }
    }
}

/// Global wind and breeze zone parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindParameters {
    /// Time between target re-rolls (ms)
    #[serde(default = "default_wind_interval")]
    pub change_interval_ms: f32,

    /// Smallest target magnitude (px/tick^2)
    #[serde(default = "default_wind_min")]
    pub min_strength: f32,

    /// Largest non-gust target magnitude (px/tick^2)
    #[serde(default = "default_wind_max")]
    pub max_strength: f32,

    /// Probability that a re-roll is a gust
    #[serde(default = "default_gust_probability")]
    pub gust_probability: f32,

    /// Magnitude multiplier for gusts
    #[serde(default = "default_gust_multiplier")]
    pub gust_multiplier: f32,

    /// Per-tick approach rate toward the target
    #[serde(default = "default_wind_smoothing")]
    pub smoothing: f32,

    /// Largest tick count honoured by one smoothing step
    #[serde(default = "default_wind_dt_cap")]
    pub dt_cap: f32,

    /// Strength range of regenerated breeze zones (px/tick^2)
    #[serde(default = "default_breeze_strength")]
    pub breeze_strength: f32,

    /// Lifetime of an injected turbulence zone (ms)
    #[serde(default = "default_turbulence_duration")]
    pub turbulence_duration_ms: f32,

    /// Inject a turbulence zone where a bubble pops
    #[serde(default)]
    pub pop_turbulence: bool,
}

fn default_wind_interval() -> f32 {
    3000.0
}

fn default_wind_min() -> f32 {
    0.004
}

fn default_wind_max() -> f32 {
    0.015
}

fn default_gust_probability() -> f32 {
    0.12
}

fn default_gust_multiplier() -> f32 {
    2.5
}

fn default_wind_smoothing() -> f32 {
    0.02
}

fn default_wind_dt_cap() -> f32 {
    3.0
}

fn default_breeze_strength() -> f32 {
    0.02
}

fn default_turbulence_duration() -> f32 {
    1500.0
}

impl Default for WindParameters {
    fn default() -> Self {
        Self {
            change_interval_ms: default_wind_interval(),
            min_strength: default_wind_min(),
            max_strength: default_wind_max(),
            gust_probability: default_gust_probability(),
            gust_multiplier: default_gust_multiplier(),
            smoothing: default_wind_smoothing(),
            dt_cap: default_wind_dt_cap(),
            breeze_strength: default_breeze_strength(),
            turbulence_duration_ms: default_turbulence_duration(),
            pop_turbulence: false,
        }
    }
}

/// Pop particle parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticleParameters {
    /// Maximum simultaneous particles at density 1.0
    #[serde(default = "default_max_particles")]
    pub max_particles: u32,

    /// Droplets per burst for a reference-size bubble at full quality
    #[serde(default = "default_base_count")]
    pub base_count: u32,

    /// Downward droplet acceleration (px/tick^2)
    #[serde(default = "default_particle_gravity")]
    pub gravity: f32,

    /// Per-tick droplet velocity retention
    #[serde(default = "default_particle_drag")]
    pub drag: f32,

    /// Final fraction of droplet lifetime spent fading out
    #[serde(default = "default_fade_fraction")]
    pub fade_fraction: f32,

    /// Burst ring expansion time (ms)
    #[serde(default = "default_ring_duration")]
    pub ring_duration_ms: f32,
}

fn default_max_particles() -> u32 {
    200
}

fn default_base_count() -> u32 {
    8
}

fn default_particle_gravity() -> f32 {
    0.12
}

fn default_particle_drag() -> f32 {
    0.97
}

fn default_fade_fraction() -> f32 {
    0.35
}

fn default_ring_duration() -> f32 {
    350.0
}

impl Default for ParticleParameters {
    fn default() -> Self {
        Self {
            max_particles: default_max_particles(),
            base_count: default_base_count(),
            gravity: default_particle_gravity(),
            drag: default_particle_drag(),
            fade_fraction: default_fade_fraction(),
            ring_duration_ms: default_ring_duration(),
        }
    }
}

/// Pop sound parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioParameters {
    /// Enable pop sounds
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Master volume (0.0 to 1.0)
    #[serde(default = "default_volume")]
    pub volume: f32,

    /// Maximum simultaneously playing pop sounds
    #[serde(default = "default_max_sounds")]
    pub max_concurrent: u32,

    /// Age after which a queued trigger is dropped (ms)
    #[serde(default = "default_queue_ttl")]
    pub queue_ttl_ms: f32,

    /// Directory holding per-theme sound files
    #[serde(default)]
    pub asset_dir: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_volume() -> f32 {
    0.7
}

fn default_max_sounds() -> u32 {
    5
}

fn default_queue_ttl() -> f32 {
    100.0
}

impl Default for AudioParameters {
    fn default() -> Self {
        Self {
            enabled: true,
            volume: default_volume(),
            max_concurrent: default_max_sounds(),
            queue_ttl_ms: default_queue_ttl(),
            asset_dir: None,
        }
    }
}

/// Visual appearance parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualParameters {
    /// Selected theme
    #[serde(default)]
    pub theme: Theme,

    /// Drop wobble and halve particle counts
    #[serde(default)]
    pub reduced_quality: bool,

    /// Particle count scalar (0.1 to 1.0)
    #[serde(default = "default_one")]
    pub quality: f32,

    /// Palette cycling speed (cycles per second)
    #[serde(default = "default_color_cycle")]
    pub color_cycle_speed: f32,
}

fn default_color_cycle() -> f32 {
    0.05
}

impl Default for VisualParameters {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            reduced_quality: false,
            quality: default_one(),
            color_cycle_speed: default_color_cycle(),
        }
    }
}

/// Complete simulation configuration combining all parameter groups.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default)]
    pub spawn: SpawnParameters,

    #[serde(default)]
    pub physics: PhysicsParameters,

    #[serde(default)]
    pub wind: WindParameters,

    #[serde(default)]
    pub particles: ParticleParameters,

    #[serde(default)]
    pub audio: AudioParameters,

    #[serde(default)]
    pub visual: VisualParameters,
}

impl SimulationConfig {
    /// Load configuration from a JSON file.
    ///
    /// # Returns
    /// * `Ok(SimulationConfig)` - Parsed configuration (not yet sanitized)
    /// * `Err` - If file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref()).map_err(|error| ConfigError::Io {
            path: path.as_ref().to_path_buf(),
            error,
        })?;
        serde_json::from_str(&contents).map_err(|error| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            error,
        })
    }

    /// Save configuration to a JSON file.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents =
            serde_json::to_string_pretty(self).map_err(|error| ConfigError::Serialize { error })?;
        fs::write(path.as_ref(), contents).map_err(|error| ConfigError::Io {
            path: path.as_ref().to_path_buf(),
            error,
        })
    }

    /// Copy with every host-facing value clamped into its supported range.
    pub fn sanitized(&self) -> Self {
        let mut config = self.clone();

        let spawn = &mut config.spawn;
        spawn.max_bubbles = spawn.max_bubbles.max(1);
        spawn.spawn_interval_ms = spawn.spawn_interval_ms.max(16.0);
        spawn.spawn_variation = spawn.spawn_variation.clamp(0.0, 1.0);
        spawn.lifetime_ms = spawn.lifetime_ms.max(100.0);
        spawn.lifetime_variation = spawn.lifetime_variation.clamp(0.0, 1.0);
        spawn.min_size = spawn.min_size.max(1.0);
        spawn.max_size = spawn.max_size.max(spawn.min_size);
        spawn.density_multiplier = spawn.density_multiplier.clamp(0.2, MAX_DENSITY);

        let physics = &mut config.physics;
        physics.speed_multiplier = physics.speed_multiplier.clamp(0.1, 2.0);
        physics.drag_coefficient = physics.drag_coefficient.clamp(0.5, 1.0);
        physics.grace_factor = physics.grace_factor.clamp(0.0, 1.0);
        physics.boundary_margin = physics.boundary_margin.max(1.0);
        physics.max_frame_ms = physics.max_frame_ms.max(1.0);

        config.wind.gust_probability = config.wind.gust_probability.clamp(0.0, 1.0);
        config.wind.max_strength = config.wind.max_strength.max(config.wind.min_strength);

        let particles = &mut config.particles;
        particles.max_particles = particles.max_particles.max(1);
        particles.fade_fraction = particles.fade_fraction.clamp(0.01, 1.0);
        particles.ring_duration_ms = particles.ring_duration_ms.max(1.0);

        config.audio.volume = config.audio.volume.clamp(0.0, 1.0);
        config.audio.max_concurrent = config.audio.max_concurrent.max(1);
        config.audio.queue_ttl_ms = config.audio.queue_ttl_ms.max(0.0);

        config.visual.quality = config.visual.quality.clamp(0.1, 1.0);

        config
    }

    /// Bubble limit after density scaling.
    pub fn effective_max_bubbles(&self) -> usize {
        scaled_count(self.spawn.max_bubbles, self.spawn.density_multiplier)
    }

    /// Particle limit after density scaling.
    pub fn effective_max_particles(&self) -> usize {
        scaled_count(self.particles.max_particles, self.spawn.density_multiplier)
    }

    /// Bubble pool capacity: enough for the densest setting.
    pub fn bubble_capacity(&self) -> usize {
        scaled_count(self.spawn.max_bubbles, MAX_DENSITY)
    }

    /// Particle pool capacity: enough for the densest setting.
    pub fn particle_capacity(&self) -> usize {
        scaled_count(self.particles.max_particles, MAX_DENSITY)
    }

    /// Particle count scalar, halved under reduced quality.
    pub fn quality_level(&self) -> f32 {
        let quality = self.visual.quality.clamp(0.1, 1.0);
        if self.visual.reduced_quality {
            quality * 0.5
        } else {
            quality
        }
    }
}

fn scaled_count(base: u32, density: f32) -> usize {
    ((base as f32 * density.clamp(0.2, MAX_DENSITY)).round() as usize).max(1)
}

/// Error types for configuration operations.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error when reading or writing configuration files
    Io {
        path: std::path::PathBuf,
        error: std::io::Error,
    },
    /// JSON parsing error
    Parse {
        path: std::path::PathBuf,
        error: serde_json::Error,
    },
    /// JSON serialization error
    Serialize { error: serde_json::Error },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io { path, error } => {
                write!(
                    formatter,
                    "Failed to read/write config file '{}': {}",
                    path.display(),
                    error
                )
            }
            ConfigError::Parse { path, error } => {
                write!(
                    formatter,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    error
                )
            }
            ConfigError::Serialize { error } => {
                write!(formatter, "Failed to serialize config: {}", error)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { error, .. } => Some(error),
            ConfigError::Parse { error, .. } => Some(error),
            ConfigError::Serialize { error } => Some(error),
        }
    }
}
