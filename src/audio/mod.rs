//! Audio output
//!
//! The audio context owns the output clock and mixes every scheduled voice
//! frame by frame. It is rendered either offline (script rendering) or from
//! an output device callback (see [`device`], behind the `live` feature).

#[cfg(feature = "live")]
pub mod device;

use thiserror::Error;
use tracing::debug;

use crate::generator::{GeneratorState, SignalGenerator, ToneVoice};

#[cfg(feature = "live")]
pub use device::SharedContext;

/// Errors raised while creating an audio context
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio output device available")]
    NoDevice,
    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),
    #[error("audio device error: {0}")]
    Device(String),
}

/// What the tone synthesizer needs from an audio output
pub trait AudioOutput {
    /// Current output clock in seconds
    fn current_time(&self) -> f64;

    fn sample_rate(&self) -> u32;

    /// Take ownership of a voice and mix it until it completes
    fn schedule(&mut self, voice: ToneVoice);
}

/// Configuration for an audio context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of samples per frame
    pub frame_size: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            frame_size: 64,
        }
    }
}

/// Output clock plus the set of voices currently sounding
///
/// Voices never steal from each other; overlapping voices are summed and the
/// mix is soft-clipped.
pub struct AudioContext {
    config: ContextConfig,
    /// Samples rendered so far
    clock: u64,
    voices: Vec<ToneVoice>,
    scratch: Vec<f32>,
}

impl AudioContext {
    pub fn new(config: ContextConfig) -> Self {
        debug!(
            sample_rate = config.sample_rate,
            frame_size = config.frame_size,
            "audio context created"
        );
        let scratch = vec![0.0; config.frame_size];
        Self {
            config,
            clock: 0,
            voices: Vec::new(),
            scratch,
        }
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Samples rendered since creation
    pub fn clock(&self) -> u64 {
        self.clock
    }

    pub fn has_active_voices(&self) -> bool {
        !self.voices.is_empty()
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Render the next frame, mixing all active voices into `buffer`
    ///
    /// Completed voices are dropped at the end of the frame.
    pub fn render(&mut self, buffer: &mut [f32]) {
        buffer.fill(0.0);

        if self.scratch.len() < buffer.len() {
            self.scratch.resize(buffer.len(), 0.0);
        }
        let scratch = &mut self.scratch[..buffer.len()];

        self.voices.retain_mut(|voice| {
            let state = voice.process(scratch);
            for (out, &sample) in buffer.iter_mut().zip(scratch.iter()) {
                *out += sample;
            }
            state == GeneratorState::Running
        });

        for sample in buffer.iter_mut() {
            *sample = soft_clip(*sample);
        }

        self.clock += buffer.len() as u64;
    }

    /// Render `samples` samples in frames of the configured size
    pub fn render_samples(&mut self, samples: usize) -> Vec<f32> {
        let mut out = vec![0.0; samples];
        for frame in out.chunks_mut(self.config.frame_size.max(1)) {
            self.render(frame);
        }
        out
    }
}

impl AudioOutput for AudioContext {
    fn current_time(&self) -> f64 {
        self.clock as f64 / self.config.sample_rate as f64
    }

    fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    fn schedule(&mut self, mut voice: ToneVoice) {
        voice.align(self.clock);
        if voice.is_complete() {
            debug!("dropping voice that already ended");
            return;
        }
        self.voices.push(voice);
    }
}

/// Soft clipping to prevent distortion
/// Uses a gentle tanh-like curve for values above threshold
fn soft_clip(sample: f32) -> f32 {
    if sample.abs() <= 1.0 {
        sample
    } else {
        sample.signum() * (1.0 + (sample.abs() - 1.0).tanh() * 0.5)
    }
}
