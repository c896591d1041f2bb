//! Audible scan feedback
//!
//! A short tone marks each scan outcome: a high triangle chirp for a
//! captured record, a low square buzz for a duplicate rejection. Feedback
//! is strictly best-effort: if no output device exists or the stream cannot
//! be built, the failure is logged at debug level and capture continues
//! silently. Audio must never block or break the capture flow.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Tone length. Long enough to register, short enough not to overlap the
/// next scan of a fast operator.
const TONE_LEN: Duration = Duration::from_millis(120);

/// Output gain; scan stations sit next to people.
const GAIN: f32 = 0.05;

/// Success tone: 880 Hz triangle.
const SUCCESS_HZ: f32 = 880.0;

/// Duplicate-rejection tone: 220 Hz square.
const DUPLICATE_HZ: f32 = 220.0;

#[derive(Clone, Copy, Debug)]
enum Wave {
    Triangle,
    Square,
}

/// Errors from tone playback. Internal only; callers swallow these.
#[derive(Debug, Error)]
enum FeedbackError {
    #[error("No default audio output device")]
    NoDevice,

    #[error("Failed to query device config: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),

    #[error("Failed to build output stream: {0}")]
    Build(#[from] cpal::BuildStreamError),

    #[error("Failed to start output stream: {0}")]
    Play(#[from] cpal::PlayStreamError),
}

/// Plays outcome tones, or nothing when disabled.
#[derive(Debug)]
pub struct Chime {
    enabled: bool,
}

impl Chime {
    /// Creates a chime; `enabled = false` makes every call a no-op.
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Whether tones are currently played.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Enables or disables tones at runtime.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Tone for a successfully captured scan.
    pub fn success(&self) {
        self.tone(SUCCESS_HZ, Wave::Triangle);
    }

    /// Tone for a duplicate rejection.
    pub fn duplicate(&self) {
        self.tone(DUPLICATE_HZ, Wave::Square);
    }

    /// Spawns playback on a short-lived thread so the capture loop never
    /// waits on the audio device.
    fn tone(&self, freq: f32, wave: Wave) {
        if !self.enabled {
            return;
        }
        std::thread::spawn(move || {
            if let Err(e) = play_tone(freq, wave) {
                debug!("audio cue skipped: {}", e);
            }
        });
    }
}

/// Opens the default output device and plays one tone synchronously.
fn play_tone(freq: f32, wave: Wave) -> Result<(), FeedbackError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or(FeedbackError::NoDevice)?;

    let supported = device.default_output_config()?;
    if supported.sample_format() != SampleFormat::F32 {
        // Exotic device formats are not worth converting for a beep.
        debug!("audio cue skipped: device format {:?}", supported.sample_format());
        return Ok(());
    }

    let config: StreamConfig = supported.config();
    let sample_rate = config.sample_rate.0 as f32;
    let channels = config.channels as usize;

    let mut phase = 0.0f32;
    let stream = device.build_output_stream(
        &config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            for frame in data.chunks_mut(channels) {
                let sample = match wave {
                    Wave::Triangle => 4.0 * (phase - 0.5).abs() - 1.0,
                    Wave::Square => {
                        if phase < 0.5 {
                            1.0
                        } else {
                            -1.0
                        }
                    }
                };
                for out in frame.iter_mut() {
                    *out = sample * GAIN;
                }
                phase += freq / sample_rate;
                if phase >= 1.0 {
                    phase -= 1.0;
                }
            }
        },
        |err| debug!("audio stream error: {}", err),
        None,
    )?;

    stream.play()?;
    std::thread::sleep(TONE_LEN);
    // Dropping the stream stops playback.
    Ok(())
}
