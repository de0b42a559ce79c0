//! Pop sound subsystem
//!
//! - State: the four-state activation gate (Uninitialized, Loading, Suspended, Active)
//! - Assets: background decoding of per-theme sound files
//! - Synth: procedural pop tone used when no sample is available
//! - Output: the device seam (silent or rodio-backed)
//! - Trigger: maps pops to sound instances under a concurrency limit

pub mod assets;
pub mod output;
pub mod state;
pub mod synth;
pub mod trigger;

use std::path::PathBuf;

pub use assets::{DecodedSound, SoundBank};
#[cfg(feature = "playback")]
pub use output::RodioOutput;
pub use output::{AudioOutput, SilentOutput, Voice};
pub use state::{ActivationGate, AudioEvent, AudioState, GateAction};
pub use synth::{SynthVoice, ToneParams};
pub use trigger::{AudioTrigger, IgnoreReason, SoundInstance, Strategy, TriggerOutcome};

/// Sample rate used for synthesized voices.
pub const SYNTH_SAMPLE_RATE: u32 = 44_100;

/// Error types for audio loading and output.
#[derive(Debug)]
pub enum AudioError {
    /// Sound file could not be opened
    Io {
        path: PathBuf,
        error: std::io::Error,
    },
    /// Container or codec failure while decoding
    Decode { path: PathBuf, message: String },
    /// File contains no decodable audio track
    NoTrack { path: PathBuf },
    /// Output device unavailable or refused a voice
    Device(String),
    /// Procedural voice could not be built
    Synthesis(String),
}

impl std::fmt::Display for AudioError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioError::Io { path, error } => {
                write!(formatter, "Failed to open sound '{}': {}", path.display(), error)
            }
            AudioError::Decode { path, message } => {
                write!(formatter, "Failed to decode sound '{}': {}", path.display(), message)
            }
            AudioError::NoTrack { path } => {
                write!(formatter, "No audio track in '{}'", path.display())
            }
            AudioError::Device(message) => write!(formatter, "Audio device error: {}", message),
            AudioError::Synthesis(message) => write!(formatter, "Synthesis failed: {}", message),
        }
    }
}

impl std::error::Error for AudioError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AudioError::Io { error, .. } => Some(error),
            _ => None,
        }
    }
}
