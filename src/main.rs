//! Bubble Pop Simulation
//!
//! Headless runner: steps the simulation at 60 Hz, optionally pops bubbles
//! with synthetic presses, and writes rendered frames as PNG.

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use bubble_pop_sim::audio::AudioOutput;
use bubble_pop_sim::config::SimulationConfig;
use bubble_pop_sim::export::{FrameSequence, export_surface};
use bubble_pop_sim::render::RasterSurface;
use bubble_pop_sim::{Simulation, Theme};

const FRAME_MS: f32 = 1000.0 / 60.0;

/// Floating bubble simulation with pop particles and sounds
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Surface width in pixels
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Surface height in pixels
    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Simulated duration in seconds
    #[arg(short, long, default_value_t = 10.0)]
    seconds: f32,

    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Theme preset (classic, pearl, crystal, galaxy, sunset)
    #[arg(short, long)]
    theme: Option<String>,

    /// Synthetic presses on random bubbles per second
    #[arg(long, default_value_t = 0.0)]
    pops_per_second: f32,

    /// Write every rendered frame into this directory
    #[arg(long)]
    frames_dir: Option<PathBuf>,

    /// Render every Nth frame into --frames-dir
    #[arg(long, default_value_t = 1)]
    frame_every: u32,

    /// Write the last frame to this PNG
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pace frames against the wall clock
    #[arg(long)]
    realtime: bool,

    /// Disable pop sounds
    #[arg(long)]
    mute: bool,
}

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn load_config(args: &Args) -> SimulationConfig {
    let mut config = if let Some(ref path) = args.config {
        match SimulationConfig::from_file(path) {
            Ok(config) => {
                log::info!("Loaded config from {}", path);
                config
            }
            Err(e) => {
                log::warn!("Failed to load config: {}, using defaults", e);
                SimulationConfig::default()
            }
        }
    } else {
        SimulationConfig::default()
    };

    if let Some(ref name) = args.theme {
        match Theme::by_name(name) {
            Some(theme) => config.visual.theme = theme,
            None => {
                let names: Vec<String> = Theme::presets().into_iter().map(|t| t.name).collect();
                log::warn!("Unknown theme '{}', expected one of: {}", name, names.join(", "));
            }
        }
    }
    if args.mute {
        config.audio.enabled = false;
    }
    config
}

#[cfg(feature = "playback")]
fn audio_output() -> Box<dyn AudioOutput> {
    Box::new(bubble_pop_sim::audio::RodioOutput::new())
}

#[cfg(not(feature = "playback"))]
fn audio_output() -> Box<dyn AudioOutput> {
    Box::new(bubble_pop_sim::audio::SilentOutput::new())
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&args);
    let width = args.width.max(1);
    let height = args.height.max(1);

    let mut sim = Simulation::with_output(
        config,
        width as f32,
        height as f32,
        audio_output(),
        args.seed,
    );
    let mut input_rng = match args.seed {
        Some(seed) => SmallRng::seed_from_u64(seed.wrapping_add(1)),
        None => SmallRng::from_entropy(),
    };

    let mut surface = RasterSurface::new(width, height);
    let mut frames = args.frames_dir.as_ref().map(FrameSequence::new);
    let frame_every = args.frame_every.max(1);
    let total_frames = (args.seconds.max(0.0) * 1000.0 / FRAME_MS).round() as u64;

    log::info!(
        "Running {} frames at {}x{}, theme '{}'",
        total_frames,
        width,
        height,
        sim.theme().name
    );

    let mut pop_budget = 0.0f32;
    let mut last_frame = Instant::now();
    for index in 0..total_frames {
        let elapsed_ms = if args.realtime {
            let target = Duration::from_secs_f32(FRAME_MS / 1000.0);
            let spent = last_frame.elapsed();
            if spent < target {
                thread::sleep(target - spent);
            }
            let now = Instant::now();
            let elapsed = now.duration_since(last_frame).as_secs_f32() * 1000.0;
            last_frame = now;
            elapsed
        } else {
            FRAME_MS
        };

        sim.frame(elapsed_ms);

        pop_budget += args.pops_per_second * elapsed_ms / 1000.0;
        while pop_budget >= 1.0 {
            pop_budget -= 1.0;
            press_random_bubble(&mut sim, &mut input_rng);
        }

        if let Some(ref mut frames) = frames {
            if index % u64::from(frame_every) == 0 {
                sim.render(&mut surface);
                frames.push(&surface)?;
            }
        }

        if (index + 1) % 60 == 0 {
            log::info!("{}", sim.stats());
        }
    }

    if let Some(ref frames) = frames {
        log::info!("Wrote {} frames to {}", frames.len(), frames.dir().display());
    }
    if let Some(ref path) = args.output {
        sim.render(&mut surface);
        export_surface(path, &surface)?;
        log::info!("Saved final frame to {}", path.display());
    }

    let stats = sim.stats();
    log::info!(
        "Finished: {} spawned, {} popped, {} sounds completed",
        stats.spawned,
        stats.pops,
        sim.audio().completed_count()
    );
    Ok(())
}

/// Press the center of a random visible bubble, or an empty spot when none
/// is on screen.
fn press_random_bubble(sim: &mut Simulation, rng: &mut SmallRng) {
    let viewport = sim.viewport();
    let targets: Vec<_> = sim
        .bubbles()
        .iter()
        .map(|(_, bubble)| bubble.position)
        .filter(|position| viewport.contains(*position))
        .collect();

    let point = if targets.is_empty() {
        glam::Vec2::new(
            rng.gen_range(0.0..viewport.width),
            rng.gen_range(0.0..viewport.height),
        )
    } else {
        targets[rng.gen_range(0..targets.len())]
    };
    sim.pointer_down(point.x, point.y);
}
