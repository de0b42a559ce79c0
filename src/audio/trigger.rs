//! Maps pop events to sound instances.
//!
//! At most `max_concurrent` instances play at once. Extra requests wait in a
//! FIFO queue and are dropped once older than the queue TTL; they are never
//! played late. Each instance completes exactly once, either when the device
//! says it finished, when its computed duration elapses, or when it is
//! stopped by a mute. Completion frees the slot and drains the queue.

use std::collections::VecDeque;
use std::path::Path;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::assets::SoundBank;
use super::output::{AudioOutput, SilentOutput, Voice};
use super::state::{ActivationGate, AudioEvent, AudioState, GateAction};
use super::synth::{SynthVoice, ToneParams};
use crate::config::AudioParameters;
use crate::theme::Theme;

/// Playback strategy chosen for one instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Decoded theme sample, pitch-shifted by size
    Sample,
    /// Procedural tone
    Synth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    Disabled,
    Muted,
    /// The activation gate is not open yet
    NotActivated,
}

/// Result of one `trigger` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Played(u64, Strategy),
    Queued,
    Ignored(IgnoreReason),
    /// Every strategy failed; the pop goes on without sound
    Silent,
}

/// Tracking record for a playing sound.
#[derive(Debug, Clone)]
pub struct SoundInstance {
    pub id: u64,
    pub strategy: Strategy,
    pub started_at_ms: f64,
    pub duration_ms: f32,
    pub gain: f32,
    /// Playback speed for samples, 1.0 for synthesis
    pub pitch: f32,
}

#[derive(Debug, Clone)]
struct QueuedTrigger {
    size: f32,
    sound: String,
    queued_at_ms: f64,
}

/// Sample pitch for a bubble: inverse square root of size, 1.0 at 100 px.
pub fn sample_pitch(size: f32) -> f32 {
    (100.0 / size.max(1.0)).sqrt().clamp(0.5, 2.0)
}

/// Sample gain before jitter and master volume.
pub fn sample_gain(size: f32) -> f32 {
    (0.5 + size.max(0.0) / 400.0).min(1.0)
}

pub struct AudioTrigger {
    gate: ActivationGate,
    bank: SoundBank,
    output: Box<dyn AudioOutput>,
    active: Vec<SoundInstance>,
    queue: VecDeque<QueuedTrigger>,
    clock_ms: f64,
    next_id: u64,
    enabled: bool,
    volume: f32,
    max_concurrent: usize,
    queue_ttl_ms: f32,
    completed: u64,
    dropped: u64,
    rng: SmallRng,
}

impl std::fmt::Debug for AudioTrigger {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("AudioTrigger")
            .field("state", &self.gate.state())
            .field("output", &self.output.name())
            .field("active", &self.active.len())
            .field("queued", &self.queue.len())
            .finish()
    }
}

impl AudioTrigger {
    pub fn new(params: &AudioParameters, output: Box<dyn AudioOutput>) -> Self {
        Self {
            gate: ActivationGate::new(),
            bank: SoundBank::new(),
            output,
            active: Vec::new(),
            queue: VecDeque::new(),
            clock_ms: 0.0,
            next_id: 1,
            enabled: params.enabled,
            volume: params.volume.clamp(0.0, 1.0),
            max_concurrent: params.max_concurrent.max(1) as usize,
            queue_ttl_ms: params.queue_ttl_ms.max(0.0),
            completed: 0,
            dropped: 0,
            rng: SmallRng::from_entropy(),
        }
    }

    /// Trigger with no device, for headless hosts and tests.
    pub fn silent(params: &AudioParameters) -> Self {
        Self::new(params, Box::new(SilentOutput::new()))
    }

    /// Reseed the gain jitter.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }

    pub fn apply_params(&mut self, params: &AudioParameters) {
        self.enabled = params.enabled;
        self.set_volume(params.volume);
        self.max_concurrent = params.max_concurrent.max(1) as usize;
        self.queue_ttl_ms = params.queue_ttl_ms.max(0.0);
    }

    pub fn state(&self) -> AudioState {
        self.gate.state()
    }

    /// Readiness flag: pops are audible right now.
    pub fn is_ready(&self) -> bool {
        self.enabled && self.gate.is_active()
    }

    pub fn is_muted(&self) -> bool {
        self.gate.is_muted()
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn queued_count(&self) -> usize {
        self.queue.len()
    }

    /// Instances that have completed so far.
    pub fn completed_count(&self) -> u64 {
        self.completed
    }

    /// Queued triggers dropped for age so far.
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }

    pub fn instances(&self) -> &[SoundInstance] {
        &self.active
    }

    pub fn bank_mut(&mut self) -> &mut SoundBank {
        &mut self.bank
    }

    /// Begin decoding theme sounds. Without a directory there is nothing to
    /// load and the gate moves straight to waiting for a gesture.
    pub fn start_loading(&mut self, asset_dir: Option<&Path>, themes: &[Theme]) {
        self.handle_event(AudioEvent::LoadingStarted);
        match asset_dir {
            Some(dir) => {
                let mut names: Vec<String> =
                    themes.iter().map(|theme| theme.sound.clone()).collect();
                names.sort();
                names.dedup();
                self.bank.start_loading(dir, names);
            }
            None => {
                self.handle_event(AudioEvent::LoadingFinished);
            }
        }
    }

    /// Observe background loading; called once per frame.
    pub fn poll_loading(&mut self) {
        if self.bank.poll_loading() {
            self.handle_event(AudioEvent::LoadingFinished);
        }
    }

    /// Feed a user gesture (pointer press, key press) into the gate.
    pub fn user_gesture(&mut self) {
        self.handle_event(AudioEvent::UserGesture);
    }

    /// Deliver an event, performing any activation the gate asks for.
    pub fn handle_event(&mut self, event: AudioEvent) {
        if self.gate.handle(event) == GateAction::RequestActivation {
            match self.output.request_activation() {
                Ok(()) => {
                    self.gate.handle(AudioEvent::ActivationSucceeded);
                }
                Err(error) => {
                    log::warn!("Audio activation failed: {}", error);
                }
            }
        }
    }

    /// Stop every playing instance and clear the queue.
    pub fn mute(&mut self) {
        self.handle_event(AudioEvent::Mute);
        for instance in self.active.drain(..) {
            self.output.stop(instance.id);
            self.completed += 1;
        }
        self.queue.clear();
        log::debug!("Audio muted");
    }

    pub fn unmute(&mut self) {
        self.handle_event(AudioEvent::Unmute);
    }

    /// Request a pop sound for a bubble of `size` with `theme`.
    pub fn trigger(&mut self, size: f32, theme: &Theme) -> TriggerOutcome {
        if !self.enabled {
            return TriggerOutcome::Ignored(IgnoreReason::Disabled);
        }
        if self.gate.is_muted() {
            return TriggerOutcome::Ignored(IgnoreReason::Muted);
        }
        if !self.gate.is_active() {
            return TriggerOutcome::Ignored(IgnoreReason::NotActivated);
        }

        self.drop_stale();
        if self.active.len() >= self.max_concurrent {
            self.queue.push_back(QueuedTrigger {
                size,
                sound: theme.sound.clone(),
                queued_at_ms: self.clock_ms,
            });
            log::trace!("Pop sound queued ({} waiting)", self.queue.len());
            return TriggerOutcome::Queued;
        }

        self.play_now(size, &theme.sound)
    }

    /// Advance the audio clock: complete finished instances, drop stale
    /// queue entries, then drain the queue into freed slots.
    pub fn update(&mut self, dt_ms: f32) {
        self.clock_ms += f64::from(dt_ms.max(0.0));

        let now = self.clock_ms;
        let output = &self.output;
        let before = self.active.len();
        self.active.retain(|instance| {
            let elapsed = (now - instance.started_at_ms) as f32;
            !(elapsed >= instance.duration_ms || output.is_finished(instance.id))
        });
        self.completed += (before - self.active.len()) as u64;

        self.drop_stale();
        while self.active.len() < self.max_concurrent && self.gate.is_active() {
            let Some(next) = self.queue.pop_front() else {
                break;
            };
            self.play_now(next.size, &next.sound);
        }
    }

    fn drop_stale(&mut self) {
        let now = self.clock_ms;
        let ttl = f64::from(self.queue_ttl_ms);
        let before = self.queue.len();
        self.queue.retain(|entry| now - entry.queued_at_ms <= ttl);
        let dropped = before - self.queue.len();
        if dropped > 0 {
            self.dropped += dropped as u64;
            log::debug!("Dropped {} stale pop sounds", dropped);
        }
    }

    fn play_now(&mut self, size: f32, sound: &str) -> TriggerOutcome {
        if let Some(decoded) = self.bank.get(sound) {
            let pitch = sample_pitch(size);
            let jitter = self.rng.gen_range(0.85..1.15);
            let gain = (self.volume * sample_gain(size) * jitter).min(1.0);
            let voice = Voice::Sample {
                sound: decoded,
                speed: pitch,
                gain,
            };
            match self.start(voice, Strategy::Sample, pitch) {
                Ok(id) => return TriggerOutcome::Played(id, Strategy::Sample),
                Err(error) => log::debug!("Sample playback failed, synthesizing: {}", error),
            }
        }

        let params = ToneParams::for_size(size);
        let result = SynthVoice::new(params).and_then(|voice| {
            let voice = Voice::Synth {
                voice,
                gain: self.volume,
            };
            self.start(voice, Strategy::Synth, 1.0)
        });
        match result {
            Ok(id) => TriggerOutcome::Played(id, Strategy::Synth),
            Err(error) => {
                log::debug!("Pop stays silent: {}", error);
                TriggerOutcome::Silent
            }
        }
    }

    fn start(
        &mut self,
        voice: Voice,
        strategy: Strategy,
        pitch: f32,
    ) -> Result<u64, super::AudioError> {
        let id = self.next_id;
        let duration_ms = voice.duration_ms();
        let gain = voice.gain();
        self.output.play(id, voice)?;
        self.next_id += 1;
        self.active.push(SoundInstance {
            id,
            strategy,
            started_at_ms: self.clock_ms,
            duration_ms,
            gain,
            pitch,
        });
        Ok(id)
    }
}
