//! Audio output seam.
//!
//! The trigger only talks to `AudioOutput`. `SilentOutput` stands in when no
//! device is wanted; `RodioOutput` (feature `playback`) plays through the
//! default system device and opens it lazily on the first activation request.

use std::sync::Arc;

use super::AudioError;
use super::assets::DecodedSound;
use super::synth::SynthVoice;

/// One sound ready to be played.
#[derive(Debug, Clone)]
pub enum Voice {
    /// Decoded theme sample played at `speed` (pitch and tempo together)
    Sample {
        sound: Arc<DecodedSound>,
        speed: f32,
        gain: f32,
    },
    /// Procedural fallback
    Synth { voice: SynthVoice, gain: f32 },
}

impl Voice {
    /// Audible length in milliseconds.
    pub fn duration_ms(&self) -> f32 {
        match self {
            Voice::Sample { sound, speed, .. } => sound.duration_ms() / speed.max(0.01),
            Voice::Synth { voice, .. } => voice.duration().as_secs_f32() * 1000.0,
        }
    }

    pub fn gain(&self) -> f32 {
        match self {
            Voice::Sample { gain, .. } | Voice::Synth { gain, .. } => *gain,
        }
    }
}

/// Device abstraction used by the audio trigger.
pub trait AudioOutput {
    /// Ask the device to become audible. Called from inside a user gesture.
    fn request_activation(&mut self) -> Result<(), AudioError>;

    /// Start playing `voice` under the caller-chosen `id`.
    fn play(&mut self, id: u64, voice: Voice) -> Result<(), AudioError>;

    /// Stop a voice immediately. Unknown ids are ignored.
    fn stop(&mut self, id: u64);

    /// Whether the device reports the voice as done. Outputs without feedback
    /// return false and the trigger falls back to the computed duration.
    fn is_finished(&self, id: u64) -> bool;

    fn name(&self) -> &'static str;
}

/// Output that accepts everything and produces no sound.
#[derive(Debug, Default)]
pub struct SilentOutput {
    activated: bool,
    played: u64,
}

impl SilentOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_activated(&self) -> bool {
        self.activated
    }

    /// Total voices accepted.
    pub fn played(&self) -> u64 {
        self.played
    }
}

impl AudioOutput for SilentOutput {
    fn request_activation(&mut self) -> Result<(), AudioError> {
        self.activated = true;
        Ok(())
    }

    fn play(&mut self, _id: u64, _voice: Voice) -> Result<(), AudioError> {
        self.played += 1;
        Ok(())
    }

    fn stop(&mut self, _id: u64) {}

    fn is_finished(&self, _id: u64) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "silent"
    }
}

#[cfg(feature = "playback")]
mod device {
    use std::collections::HashMap;

    use rodio::buffer::SamplesBuffer;
    use rodio::{OutputStream, OutputStreamHandle, Sink, Source};

    use super::{AudioError, AudioOutput, Voice};

    /// Output on the default system device via rodio. One sink per voice.
    pub struct RodioOutput {
        stream: Option<(OutputStream, OutputStreamHandle)>,
        sinks: HashMap<u64, Sink>,
    }

    impl Default for RodioOutput {
        fn default() -> Self {
            Self::new()
        }
    }

    impl RodioOutput {
        pub fn new() -> Self {
            Self {
                stream: None,
                sinks: HashMap::new(),
            }
        }

        fn handle(&self) -> Result<&OutputStreamHandle, AudioError> {
            self.stream
                .as_ref()
                .map(|(_, handle)| handle)
                .ok_or_else(|| AudioError::Device("output not activated".to_string()))
        }
    }

    impl AudioOutput for RodioOutput {
        fn request_activation(&mut self) -> Result<(), AudioError> {
            if self.stream.is_none() {
                let stream = OutputStream::try_default()
                    .map_err(|error| AudioError::Device(error.to_string()))?;
                log::info!("Opened default audio output device");
                self.stream = Some(stream);
            }
            Ok(())
        }

        fn play(&mut self, id: u64, voice: Voice) -> Result<(), AudioError> {
            // Finished sinks are dropped lazily here
            self.sinks.retain(|_, sink| !sink.empty());

            let sink = Sink::try_new(self.handle()?)
                .map_err(|error| AudioError::Device(error.to_string()))?;
            match voice {
                Voice::Sample { sound, speed, gain } => {
                    let buffer = SamplesBuffer::new(1, sound.sample_rate, sound.samples.to_vec());
                    sink.append(buffer.speed(speed).amplify(gain));
                }
                Voice::Synth { voice, gain } => {
                    sink.append(voice.amplify(gain));
                }
            }
            self.sinks.insert(id, sink);
            Ok(())
        }

        fn stop(&mut self, id: u64) {
            if let Some(sink) = self.sinks.remove(&id) {
                sink.stop();
            }
        }

        fn is_finished(&self, id: u64) -> bool {
            self.sinks.get(&id).is_none_or(|sink| sink.empty())
        }

        fn name(&self) -> &'static str {
            "rodio"
        }
    }
}

#[cfg(feature = "playback")]
pub use device::RodioOutput;
