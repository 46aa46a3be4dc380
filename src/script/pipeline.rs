//! Offline playback of input scripts
//!
//! Replays timed input events through an input dispatcher into an offline
//! audio context and collects the output. Events are delivered at frame
//! boundaries, so their timing is quantized to the frame size.

use std::path::Path;

use tracing::{debug, info};

use super::parser::TimedEvents;
use super::ScriptError;
use crate::audio::{AudioContext, ContextConfig};
use crate::dispatch::InputDispatcher;
use crate::synth::{ToneShape, ToneSynthesizer};
use crate::visual::KeyboardView;
use crate::wav::write_wav_16bit;

/// Configuration for the offline pipeline
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Sample rate and frame size of the offline context
    pub context: ContextConfig,
    /// Envelope of every tone
    pub shape: ToneShape,
}

pub type OfflineDispatcher = InputDispatcher<ToneSynthesizer<AudioContext>, KeyboardView>;

/// Pipeline for replaying input events and generating audio
pub struct Pipeline {
    config: PipelineConfig,
    dispatcher: OfflineDispatcher,
    events: Vec<TimedEvents>,
    /// Current sample position
    current_sample: usize,
    /// Current event index
    event_index: usize,
    /// Samples until next event
    samples_to_next_event: usize,
    /// Whether there are more events to process
    has_more_events: bool,
}

impl Pipeline {
    /// Create a new pipeline
    ///
    /// # Arguments
    /// * `config` - Pipeline configuration
    /// * `events` - Parsed events in chronological order
    pub fn new(config: PipelineConfig, events: Vec<TimedEvents>) -> Self {
        let context_config = config.context.clone();
        let synth = ToneSynthesizer::with_shape(
            move || Ok(AudioContext::new(context_config.clone())),
            config.shape.clone(),
        );
        let dispatcher = InputDispatcher::new(synth, KeyboardView::new());

        let has_more_events = !events.is_empty();
        let samples_to_next_event = if has_more_events {
            ms_to_samples(events[0].delta_ms, config.context.sample_rate)
        } else {
            0
        };

        Self {
            config,
            dispatcher,
            events,
            current_sample: 0,
            event_index: 0,
            samples_to_next_event,
            has_more_events,
        }
    }

    pub fn dispatcher(&self) -> &OfflineDispatcher {
        &self.dispatcher
    }

    /// Samples produced so far
    pub fn current_sample(&self) -> usize {
        self.current_sample
    }

    fn has_active_voices(&self) -> bool {
        self.dispatcher
            .player()
            .context()
            .is_some_and(AudioContext::has_active_voices)
    }

    /// Check if there are more events or active voices
    pub fn is_active(&self) -> bool {
        self.has_more_events || self.has_active_voices()
    }

    /// Process pending events at the current frame boundary
    fn process_events(&mut self) {
        while self.has_more_events && self.samples_to_next_event == 0 {
            let timed = &self.events[self.event_index];
            for event in &timed.events {
                debug!(sample = self.current_sample, %event, "delivering event");
                event.deliver(&mut self.dispatcher);
            }

            self.event_index += 1;

            if self.event_index >= self.events.len() {
                self.has_more_events = false;
                self.samples_to_next_event = usize::MAX;
            } else {
                self.samples_to_next_event = ms_to_samples(
                    self.events[self.event_index].delta_ms,
                    self.config.context.sample_rate,
                );
            }
        }
    }

    /// Advance time and decrement countdown to next event
    fn advance_time(&mut self, samples: usize) {
        self.current_sample += samples;

        if self.has_more_events && self.samples_to_next_event > 0 {
            self.samples_to_next_event = self.samples_to_next_event.saturating_sub(samples);
        }
    }

    /// Process one frame of audio
    ///
    /// Before the first note the audio context does not exist yet and the
    /// frame is silent.
    pub fn process_frame(&mut self, buffer: &mut [f32]) {
        // Process events at frame boundary (start of frame)
        self.process_events();

        match self.dispatcher.player_mut().context_mut() {
            Some(context) => context.render(buffer),
            None => buffer.fill(0.0),
        }

        self.advance_time(buffer.len());
    }

    /// Run until all events are delivered and every tone has finished
    pub fn generate_samples(&mut self) -> Vec<f32> {
        let frame_size = self.config.context.frame_size.max(1);
        let mut samples = Vec::new();
        let mut frame_buffer = vec![0.0f32; frame_size];

        // Each event may land up to one frame late, so allow a frame per event
        let tail_ms = (self.config.shape.stop * 1000.0).ceil() as u64;
        let total_ms = self
            .events
            .iter()
            .fold(tail_ms, |total, e| total.saturating_add(e.delta_ms));
        let max_iterations = (ms_to_samples(total_ms, self.config.context.sample_rate) / frame_size)
            .saturating_add(self.events.len())
            .saturating_add(16);
        let mut iterations = 0;

        while self.is_active() && iterations < max_iterations {
            self.process_frame(&mut frame_buffer);
            samples.extend_from_slice(&frame_buffer);
            iterations += 1;
        }

        samples
    }

    /// Generate complete audio and write to WAV file
    pub fn generate_wav(&mut self, output_path: impl AsRef<Path>) -> Result<usize, ScriptError> {
        let samples = self.generate_samples();
        info!(
            samples = samples.len(),
            seconds = samples.len() as f64 / self.config.context.sample_rate as f64,
            "rendered script"
        );
        write_wav_16bit(output_path, &samples, self.config.context.sample_rate)?;
        Ok(samples.len())
    }
}

fn ms_to_samples(ms: u64, sample_rate: u32) -> usize {
    let samples = ms.saturating_mul(sample_rate as u64) / 1000;
    usize::try_from(samples).unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes::NoteId;
    use crate::script::parser::parse_script;

    fn config() -> PipelineConfig {
        PipelineConfig {
            context: ContextConfig {
                sample_rate: 8000,
                frame_size: 80,
            },
            ..Default::default()
        }
    }

    fn pipeline(script: &str) -> Pipeline {
        Pipeline::new(config(), parse_script(script).unwrap())
    }

    #[test]
    fn test_event_timing() {
        let mut pipeline = pipeline("+10| key down a\n+20| key up a");

        // 10ms at 8kHz
        assert_eq!(pipeline.samples_to_next_event, 80);

        let mut buffer = vec![0.0f32; 40];
        pipeline.process_frame(&mut buffer);
        assert_eq!(pipeline.samples_to_next_event, 40);
        assert!(pipeline.dispatcher().player().context().is_none());
    }

    #[test]
    fn test_press_and_immediate_release_rings_out() {
        let mut pipeline = pipeline("+0| key down a\n+0| key up a");
        let samples = pipeline.generate_samples();

        let view = pipeline.dispatcher().visuals();
        assert!(!view.is_pressed(NoteId::C4));
        assert!(pipeline.dispatcher().key_state().is_empty());

        // The full 650ms tone, 5200 samples at 8kHz
        assert_eq!(samples.len(), 5200);
        assert!(samples[4000..].iter().any(|&s| s != 0.0));
        assert!(!pipeline.is_active());
    }

    #[test]
    fn test_held_key_repeat_plays_once() {
        let mut pipeline = pipeline("+0| key down a\n+100| key down a\n+100| key up a");
        let samples = pipeline.generate_samples();

        // One tone starting at 0: silence after 650ms would be reached at 5200
        assert_eq!(samples.len(), 5200);
    }

    #[test]
    fn test_pointer_retrigger_overlaps() {
        let mut pipeline = pipeline("+0| mouse down G#4\n+100| mouse down G#4\n+0| mouse up G#4");
        let samples = pipeline.generate_samples();

        // Second tone starts at 100ms and ends at 750ms
        assert_eq!(samples.len(), 6000);
        assert!(!pipeline.dispatcher().visuals().is_pressed(NoteId::GSharp4));
    }

    #[test]
    fn test_unbound_input_stays_silent() {
        let mut pipeline = pipeline("+0| key down z, touch start H4\n+50| key up z");
        let samples = pipeline.generate_samples();

        assert!(samples.iter().all(|&s| s == 0.0));
        assert!(pipeline.dispatcher().player().context().is_none());
        assert!(pipeline.dispatcher().visuals().pressed_notes().is_empty());
    }

    #[test]
    fn test_demo_script_releases_everything() {
        let mut pipeline = pipeline(include_str!("../../demos/scale.txt"));
        let samples = pipeline.generate_samples();

        // The chord starts at 3.1s and rings for 650ms
        assert_eq!(samples.len(), 3750 * 8);
        assert!(pipeline.dispatcher().visuals().pressed_notes().is_empty());
        assert!(pipeline.dispatcher().key_state().is_empty());
    }

    #[test]
    fn test_sub_frame_deltas_ring_out() {
        // 1ms deltas are a tenth of a frame; every line lands one frame late
        let script: String = (0..200)
            .map(|i| if i % 2 == 0 { "+1| key down a\n" } else { "+1| key up a\n" })
            .collect();
        let mut pipeline = pipeline(&script);
        let samples = pipeline.generate_samples();

        // Last press delivered at frame 199, then the full 650ms tone
        assert_eq!(samples.len(), 199 * 80 + 5200);
        assert!(!pipeline.is_active());
        assert!(samples[samples.len() - 800..].iter().any(|&s| s != 0.0));
    }

    #[test]
    fn test_ms_to_samples_saturates() {
        assert_eq!(ms_to_samples(250, 8000), 2000);
        let capped = usize::try_from(u64::MAX / 1000).unwrap_or(usize::MAX);
        assert_eq!(ms_to_samples(u64::MAX, 44100), capped);
    }

    #[test]
    fn test_empty_script() {
        let mut pipeline = Pipeline::new(config(), Vec::new());
        assert!(!pipeline.is_active());
        assert!(pipeline.generate_samples().is_empty());
    }

    #[test]
    fn test_generate_wav() {
        let path = std::env::temp_dir().join("keypiano_pipeline_test.wav");
        let mut pipeline = pipeline("+0| touch start C5\n+30| touch end C5");
        let written = pipeline.generate_wav(&path).unwrap();
        assert_eq!(written, 5200);

        let data = std::fs::read(&path).unwrap();
        assert_eq!(data.len(), 44 + 2 * written);
        std::fs::remove_file(&path).unwrap();
    }
}
