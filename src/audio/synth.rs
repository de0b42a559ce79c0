//! Procedural pop tone.
//!
//! A short sine voice with an exponential downward pitch sweep, one harmonic
//! overtone, an ADSR gain envelope and a one-pole lowpass whose cutoff sweeps
//! down over the tone. Every parameter derives from the bubble diameter:
//! larger bubbles pop lower, longer and darker.

use std::f32::consts::TAU;
use std::time::Duration;

use super::{AudioError, SYNTH_SAMPLE_RATE};

/// Parameters of one synthesized pop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneParams {
    pub start_frequency: f32,
    pub end_frequency: f32,
    pub duration_ms: f32,
    pub cutoff_start: f32,
    pub cutoff_end: f32,
    pub attack_ms: f32,
    pub decay_ms: f32,
    /// Sustain level relative to the attack peak
    pub sustain: f32,
    pub release_ms: f32,
    /// Gain of the 2x overtone relative to the fundamental
    pub overtone_gain: f32,
    /// Peak gain before master volume
    pub gain: f32,
}

impl ToneParams {
    pub fn for_size(size: f32) -> Self {
        let size = size.clamp(10.0, 600.0);
        let start_frequency = (900.0 * (100.0 / size).sqrt()).clamp(200.0, 2000.0);
        let duration_ms = (120.0 + size * 0.6).clamp(80.0, 320.0);
        let cutoff_start = (6000.0 - size * 15.0).clamp(1200.0, 6000.0);

        Self {
            start_frequency,
            end_frequency: start_frequency * 0.45,
            duration_ms,
            cutoff_start,
            cutoff_end: cutoff_start * 0.3,
            attack_ms: 3.0,
            decay_ms: 40.0,
            sustain: 0.4,
            release_ms: duration_ms * 0.35,
            overtone_gain: 0.3,
            gain: (0.35 + size / 400.0).min(0.9),
        }
    }

    fn validate(&self) -> Result<(), AudioError> {
        let finite = [
            self.start_frequency,
            self.end_frequency,
            self.duration_ms,
            self.cutoff_start,
            self.cutoff_end,
            self.gain,
        ]
        .iter()
        .all(|value| value.is_finite());

        if !finite || self.start_frequency <= 0.0 || self.end_frequency <= 0.0 {
            return Err(AudioError::Synthesis(format!("invalid tone {:?}", self)));
        }
        if self.duration_ms <= 0.0 {
            return Err(AudioError::Synthesis("tone has no duration".to_string()));
        }
        Ok(())
    }

    /// Envelope gain at `t_ms` into the tone.
    pub fn envelope(&self, t_ms: f32) -> f32 {
        let release_start =
            (self.duration_ms - self.release_ms).max(self.attack_ms + self.decay_ms);
        if t_ms < 0.0 || t_ms >= self.duration_ms {
            0.0
        } else if t_ms < self.attack_ms {
            t_ms / self.attack_ms
        } else if t_ms < self.attack_ms + self.decay_ms {
            let progress = (t_ms - self.attack_ms) / self.decay_ms;
            1.0 - (1.0 - self.sustain) * progress
        } else if t_ms < release_start {
            self.sustain
        } else {
            let span = (self.duration_ms - release_start).max(f32::EPSILON);
            self.sustain * (1.0 - (t_ms - release_start) / span)
        }
    }
}

/// Streaming mono sample source for one tone.
#[derive(Debug, Clone)]
pub struct SynthVoice {
    params: ToneParams,
    sample_rate: u32,
    index: usize,
    total: usize,
    phase: f32,
    overtone_phase: f32,
    filtered: f32,
}

impl SynthVoice {
    pub fn new(params: ToneParams) -> Result<Self, AudioError> {
        Self::with_sample_rate(params, SYNTH_SAMPLE_RATE)
    }

    pub fn with_sample_rate(params: ToneParams, sample_rate: u32) -> Result<Self, AudioError> {
        params.validate()?;
        if sample_rate == 0 {
            return Err(AudioError::Synthesis("zero sample rate".to_string()));
        }
        let total = (params.duration_ms / 1000.0 * sample_rate as f32).ceil() as usize;
        Ok(Self {
            params,
            sample_rate,
            index: 0,
            total,
            phase: 0.0,
            overtone_phase: 0.0,
            filtered: 0.0,
        })
    }

    pub fn params(&self) -> &ToneParams {
        &self.params
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len_samples(&self) -> usize {
        self.total
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f32(self.total as f32 / self.sample_rate as f32)
    }

    /// Render the remaining samples into a buffer.
    pub fn render(self) -> Vec<f32> {
        self.collect()
    }
}

impl Iterator for SynthVoice {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.index >= self.total {
            return None;
        }
        let p = &self.params;
        let rate = self.sample_rate as f32;
        let progress = self.index as f32 / self.total as f32;

        // Exponential sweeps for pitch and cutoff
        let frequency = p.start_frequency * (p.end_frequency / p.start_frequency).powf(progress);
        let cutoff = p.cutoff_start * (p.cutoff_end / p.cutoff_start).powf(progress);

        self.phase = (self.phase + TAU * frequency / rate).rem_euclid(TAU);
        self.overtone_phase = (self.overtone_phase + TAU * frequency * 2.0 / rate).rem_euclid(TAU);
        let raw = self.phase.sin() + p.overtone_gain * self.overtone_phase.sin();

        let alpha = 1.0 - (-TAU * cutoff / rate).exp();
        self.filtered += alpha * (raw - self.filtered);

        let t_ms = self.index as f32 * 1000.0 / rate;
        self.index += 1;
        Some(self.filtered * p.envelope(t_ms) * p.gain / (1.0 + p.overtone_gain))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total - self.index;
        (remaining, Some(remaining))
    }
}

#[cfg(feature = "playback")]
impl rodio::Source for SynthVoice {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.total - self.index)
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(self.duration())
    }
}
