//! One-octave virtual piano
//!
//! Thirteen notes from C4 to C5, played from the computer keyboard, a
//! pointer, or touch. Each press sounds a short enveloped sine tone and
//! marks the note's on-screen keys as pressed until it is released.
//!
//! - [`notes`] and [`keymap`]: the static note and key binding tables
//! - [`synth`]: turns a note into a voice on a lazily opened audio context
//! - [`dispatch`]: maps raw input to note presses and releases
//! - [`visual`]: the keyboard view those presses are shown on
//! - [`script`]: offline replay of timed input into a WAV file

pub mod audio;
pub mod dispatch;
pub mod generator;
pub mod keymap;
pub mod notes;
pub mod script;
pub mod synth;
pub mod visual;
pub mod wav;

pub use dispatch::{InputDispatcher, InputSource, KeyVisuals, NotePlayer};
pub use notes::{frequency_of, NoteId};
pub use synth::{ToneShape, ToneSynthesizer};
