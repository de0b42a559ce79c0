//! Theme sound assets.
//!
//! Decoding runs on a background thread so the frame loop never waits on disk
//! or codecs. Results come back over a channel that the owner polls once per
//! frame; a missing or undecodable file just leaves that theme on synthesis.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::AudioError;

/// Extensions tried, in order, for a sound stem.
pub const SOUND_EXTENSIONS: [&str; 4] = ["ogg", "wav", "mp3", "flac"];

/// A fully decoded mono sound.
#[derive(Debug, Clone)]
pub struct DecodedSound {
    pub samples: Arc<[f32]>,
    pub sample_rate: u32,
}

impl DecodedSound {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate: sample_rate.max(1),
        }
    }

    pub fn duration_ms(&self) -> f32 {
        self.samples.len() as f32 * 1000.0 / self.sample_rate as f32
    }
}

/// Decode a sound file to mono f32 samples.
pub fn decode_file(path: &Path) -> Result<DecodedSound, AudioError> {
    let decode_error = |error: SymphoniaError| AudioError::Decode {
        path: path.to_path_buf(),
        message: error.to_string(),
    };

    let file = File::open(path).map_err(|error| AudioError::Io {
        path: path.to_path_buf(),
        error,
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension() {
        hint.with_extension(&extension.to_string_lossy());
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(decode_error)?;
    let mut format = probed.format;

    let track = format.default_track().ok_or_else(|| AudioError::NoTrack {
        path: path.to_path_buf(),
    })?;
    let track_id = track.id;
    let sample_rate = track.codec_params.sample_rate.unwrap_or(44_100);
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(decode_error)?;

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(_)) => break,
            Err(error) => return Err(decode_error(error)),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let channels = spec.channels.count().max(1);
                let mut buffer = SampleBuffer::<f32>::new(decoded.frames() as u64, spec);
                buffer.copy_interleaved_ref(decoded);

                // Mix down to mono
                samples.extend(
                    buffer
                        .samples()
                        .chunks(channels)
                        .map(|frame| frame.iter().sum::<f32>() / channels as f32),
                );
            }
            Err(SymphoniaError::DecodeError(message)) => {
                log::debug!("Skipping bad packet in {}: {}", path.display(), message);
            }
            Err(error) => return Err(decode_error(error)),
        }
    }

    if samples.is_empty() {
        return Err(AudioError::NoTrack {
            path: path.to_path_buf(),
        });
    }
    Ok(DecodedSound::new(samples, sample_rate))
}

/// First existing `<dir>/<stem>.<ext>` among the supported extensions.
pub fn find_asset(dir: &Path, stem: &str) -> Option<PathBuf> {
    SOUND_EXTENSIONS
        .iter()
        .map(|extension| dir.join(format!("{stem}.{extension}")))
        .find(|candidate| candidate.is_file())
}

enum LoadMessage {
    Loaded(String, DecodedSound),
    Missing(String),
    Failed(String, AudioError),
}

/// Decoded sounds keyed by theme sound name.
#[derive(Default)]
pub struct SoundBank {
    sounds: HashMap<String, Arc<DecodedSound>>,
    receiver: Option<Receiver<LoadMessage>>,
}

impl std::fmt::Debug for SoundBank {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SoundBank")
            .field("sounds", &self.sounds.keys().collect::<Vec<_>>())
            .field("loading", &self.is_loading())
            .finish()
    }
}

impl SoundBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loading(&self) -> bool {
        self.receiver.is_some()
    }

    pub fn len(&self) -> usize {
        self.sounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sounds.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<Arc<DecodedSound>> {
        self.sounds.get(name).cloned()
    }

    pub fn insert(&mut self, name: impl Into<String>, sound: DecodedSound) {
        self.sounds.insert(name.into(), Arc::new(sound));
    }

    /// Start decoding `names` from `dir` on a worker thread. Any previous load
    /// still in flight is abandoned.
    pub fn start_loading(&mut self, dir: &Path, names: Vec<String>) {
        let (sender, receiver) = mpsc::channel();
        let dir = dir.to_path_buf();
        log::info!("Loading {} pop sounds from {}", names.len(), dir.display());

        thread::spawn(move || {
            for name in names {
                let message = match find_asset(&dir, &name) {
                    None => LoadMessage::Missing(name),
                    Some(path) => match decode_file(&path) {
                        Ok(sound) => LoadMessage::Loaded(name, sound),
                        Err(error) => LoadMessage::Failed(name, error),
                    },
                };
                if sender.send(message).is_err() {
                    // Receiver dropped; nobody wants the rest
                    return;
                }
            }
        });

        self.receiver = Some(receiver);
    }

    /// Collect finished decodes without blocking. Returns true on the poll
    /// that observes the worker finishing.
    pub fn poll_loading(&mut self) -> bool {
        let Some(receiver) = &self.receiver else {
            return false;
        };

        loop {
            match receiver.try_recv() {
                Ok(LoadMessage::Loaded(name, sound)) => {
                    log::debug!("Decoded '{}' ({:.0} ms)", name, sound.duration_ms());
                    self.sounds.insert(name, Arc::new(sound));
                }
                Ok(LoadMessage::Missing(name)) => {
                    log::debug!("No sound file for '{}', using synthesis", name);
                }
                Ok(LoadMessage::Failed(name, error)) => {
                    log::warn!("Sound '{}' unavailable, using synthesis: {}", name, error);
                }
                Err(TryRecvError::Empty) => return false,
                Err(TryRecvError::Disconnected) => {
                    self.receiver = None;
                    log::info!("Sound loading finished, {} decoded", self.sounds.len());
                    return true;
                }
            }
        }
    }
}
