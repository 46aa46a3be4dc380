//! Tone synthesizer
//!
//! Turns a note into one self-terminating voice on the audio context:
//!
//! ```text
//! gain
//! 0.8 |  /\
//!     | /  `-.
//!     |/      `--.___
//! 0.0 +--------------------|-- t
//!     0  30ms        600ms 650ms
//!        attack      decay  stop
//! ```
//!
//! The context is not created until the first note is played. Every call
//! schedules a fresh voice, so quick repeats overlap and ring out on their
//! own.

use tracing::{debug, trace, warn};

use crate::audio::{AudioError, AudioOutput};
use crate::dispatch::NotePlayer;
use crate::generator::{AutomationError, GainParam, Oscillator, ToneVoice, Waveform};
use crate::notes::NoteId;

/// Envelope and waveform of every tone
#[derive(Debug, Clone, PartialEq)]
pub struct ToneShape {
    pub waveform: Waveform,
    /// Gain reached at the end of the attack
    pub peak_gain: f32,
    /// Attack length in seconds (linear)
    pub attack: f64,
    /// Gain the exponential decay ends on; must be non-zero
    pub floor_gain: f32,
    /// Seconds from note start to the end of the decay
    pub decay_end: f64,
    /// Seconds from note start until output stops
    pub stop: f64,
}

impl Default for ToneShape {
    fn default() -> Self {
        Self {
            waveform: Waveform::Sine,
            peak_gain: 0.8,
            attack: 0.03,
            floor_gain: 0.001,
            decay_end: 0.6,
            stop: 0.65,
        }
    }
}

impl ToneShape {
    /// Build the voice for `frequency` starting at `now`
    pub fn voice(&self, frequency: f32, now: f64, sample_rate: u32) -> Result<ToneVoice, AutomationError> {
        let oscillator = Oscillator::new(self.waveform, frequency, sample_rate);

        let mut gain = GainParam::default();
        gain.set_value_at_time(0.0, now)?
            .linear_ramp_to_value_at_time(self.peak_gain, now + self.attack)?
            .exponential_ramp_to_value_at_time(self.floor_gain, now + self.decay_end)?;

        let mut voice = ToneVoice::new(oscillator, gain);
        voice.start(now);
        voice.stop(now + self.stop);
        Ok(voice)
    }
}

type ContextFactory<C> = Box<dyn FnMut() -> Result<C, AudioError>>;

/// Plays notes on a lazily created audio context
///
/// The factory runs on the first `play`. If it fails the note is dropped and
/// the next `play` tries again.
pub struct ToneSynthesizer<C> {
    factory: ContextFactory<C>,
    context: Option<C>,
    shape: ToneShape,
}

impl<C: AudioOutput> ToneSynthesizer<C> {
    pub fn new(factory: impl FnMut() -> Result<C, AudioError> + 'static) -> Self {
        Self::with_shape(factory, ToneShape::default())
    }

    pub fn with_shape(
        factory: impl FnMut() -> Result<C, AudioError> + 'static,
        shape: ToneShape,
    ) -> Self {
        Self {
            factory: Box::new(factory),
            context: None,
            shape,
        }
    }

    pub fn shape(&self) -> &ToneShape {
        &self.shape
    }

    /// The audio context, if a note has been played yet
    pub fn context(&self) -> Option<&C> {
        self.context.as_ref()
    }

    pub fn context_mut(&mut self) -> Option<&mut C> {
        self.context.as_mut()
    }

    fn acquire_context(&mut self) -> Option<&mut C> {
        if self.context.is_none() {
            match (self.factory)() {
                Ok(context) => {
                    debug!("audio context opened");
                    self.context = Some(context);
                }
                Err(err) => {
                    warn!(%err, "could not open audio context");
                    return None;
                }
            }
        }
        self.context.as_mut()
    }

    /// Schedule one tone for `note` starting now
    pub fn play(&mut self, note: NoteId) {
        let shape = self.shape.clone();
        let Some(context) = self.acquire_context() else {
            return;
        };

        let now = context.current_time();
        match shape.voice(note.frequency(), now, context.sample_rate()) {
            Ok(voice) => {
                debug!(%note, frequency = note.frequency(), now, "scheduling tone");
                context.schedule(voice);
            }
            Err(err) => warn!(%err, %note, "invalid tone shape"),
        }
    }

    /// Play by name; names outside the note table make no sound
    pub fn play_named(&mut self, name: &str) {
        match name.parse::<NoteId>() {
            Ok(note) => self.play(note),
            Err(_) => trace!(name, "ignoring unknown note"),
        }
    }
}

impl<C: AudioOutput> NotePlayer for ToneSynthesizer<C> {
    fn play(&mut self, note: NoteId) {
        ToneSynthesizer::play(self, note);
    }
}
