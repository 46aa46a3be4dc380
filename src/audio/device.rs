//! Real-time output through the default `cpal` device
//!
//! The device callback runs on the audio thread and renders the shared
//! context; the event thread locks it only to read the clock or hand over a
//! new voice.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use tracing::{error, info};

use super::{AudioContext, AudioError, AudioOutput, ContextConfig};
use crate::generator::ToneVoice;

/// An audio context rendered by a running output stream
///
/// Dropping it stops the stream.
pub struct SharedContext {
    context: Arc<Mutex<AudioContext>>,
    _stream: cpal::Stream,
}

impl SharedContext {
    /// Open the default output device and start rendering
    ///
    /// The device's own sample rate wins over `config.sample_rate`.
    pub fn open(config: ContextConfig) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;
        let supported = device
            .default_output_config()
            .map_err(|e| AudioError::Device(e.to_string()))?;
        let sample_format = supported.sample_format();
        let stream_config: cpal::StreamConfig = supported.into();

        info!(
            device = %device.name().unwrap_or_else(|_| "<unknown>".to_string()),
            sample_rate = stream_config.sample_rate.0,
            channels = stream_config.channels,
            format = ?sample_format,
            "opening audio output"
        );

        let context = Arc::new(Mutex::new(AudioContext::new(ContextConfig {
            sample_rate: stream_config.sample_rate.0,
            ..config
        })));

        let stream = match sample_format {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, &context)?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, &context)?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, &context)?,
            other => return Err(AudioError::UnsupportedFormat(format!("{:?}", other))),
        };
        stream
            .play()
            .map_err(|e| AudioError::Device(e.to_string()))?;

        Ok(Self {
            context,
            _stream: stream,
        })
    }

    fn lock(&self) -> MutexGuard<'_, AudioContext> {
        lock(&self.context)
    }
}

impl AudioOutput for SharedContext {
    fn current_time(&self) -> f64 {
        self.lock().current_time()
    }

    fn sample_rate(&self) -> u32 {
        self.lock().sample_rate()
    }

    fn schedule(&mut self, voice: ToneVoice) {
        self.lock().schedule(voice);
    }
}

fn lock(context: &Mutex<AudioContext>) -> MutexGuard<'_, AudioContext> {
    // A panic mid-render leaves the mixer usable
    context.lock().unwrap_or_else(PoisonError::into_inner)
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    context: &Arc<Mutex<AudioContext>>,
) -> Result<cpal::Stream, AudioError>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels.max(1) as usize;
    let context = Arc::clone(context);
    let mut mono: Vec<f32> = Vec::new();

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _info: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels;
                mono.resize(frames, 0.0);
                lock(&context).render(&mut mono);

                for (frame, &value) in data.chunks_mut(channels).zip(mono.iter()) {
                    let value = T::from_sample(value);
                    for sample in frame.iter_mut() {
                        *sample = value;
                    }
                }
            },
            |err| error!(%err, "audio stream error"),
            None,
        )
        .map_err(|e| AudioError::Device(e.to_string()))
}
