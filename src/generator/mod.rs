//! Frame-based signal generators
//!
//! An oscillator, an automated gain parameter, and the tone voice that
//! multiplies the two between a start and a stop time.

pub mod oscillator;
pub mod param;
pub mod voice;

pub use oscillator::{Oscillator, Waveform};
pub use param::{AutomationError, GainParam};
pub use voice::ToneVoice;

/// Represents the current state of a signal generator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorState {
    /// Generator is still producing samples
    Running,
    /// Generator has completed and will produce no more samples
    Complete,
}

/// Core trait for all signal generators
///
/// Signal generators produce audio samples frame by frame.
/// Each generator is independent of the others; the audio context sums them.
pub trait SignalGenerator {
    /// Process the next frame of samples
    ///
    /// # Arguments
    /// * `buffer` - Mutable slice to write samples into. The length determines frame size.
    ///
    /// # Returns
    /// * `GeneratorState::Running` if the generator is still active
    /// * `GeneratorState::Complete` if the generator has finished
    ///
    /// # Note
    /// Even when Complete is returned, the whole buffer is written (with
    /// silence past the end).
    fn process(&mut self, buffer: &mut [f32]) -> GeneratorState;

    /// Check if this generator has completed
    fn is_complete(&self) -> bool;

    /// Reset the generator to its initial state
    fn reset(&mut self);
}
