//! The note table
//!
//! Thirteen chromatic notes from C4 to C5 inclusive, each with one fixed
//! frequency. Names use sharps only (`C#4`, never `Db4`).

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// One of the thirteen playable pitches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NoteId {
    C4,
    CSharp4,
    D4,
    DSharp4,
    E4,
    F4,
    FSharp4,
    G4,
    GSharp4,
    A4,
    ASharp4,
    B4,
    C5,
}

/// Returned when a name is not one of the thirteen notes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown note: {0:?}")]
pub struct ParseNoteError(pub String);

impl NoteId {
    /// All notes in ascending chromatic order
    pub const ALL: [NoteId; 13] = [
        NoteId::C4,
        NoteId::CSharp4,
        NoteId::D4,
        NoteId::DSharp4,
        NoteId::E4,
        NoteId::F4,
        NoteId::FSharp4,
        NoteId::G4,
        NoteId::GSharp4,
        NoteId::A4,
        NoteId::ASharp4,
        NoteId::B4,
        NoteId::C5,
    ];

    /// Frequency in Hz
    pub fn frequency(self) -> f32 {
        match self {
            NoteId::C4 => 261.63,
            NoteId::CSharp4 => 277.18,
            NoteId::D4 => 293.66,
            NoteId::DSharp4 => 311.13,
            NoteId::E4 => 329.63,
            NoteId::F4 => 349.23,
            NoteId::FSharp4 => 369.99,
            NoteId::G4 => 392.0,
            NoteId::GSharp4 => 415.3,
            NoteId::A4 => 440.0,
            NoteId::ASharp4 => 466.16,
            NoteId::B4 => 493.88,
            NoteId::C5 => 523.25,
        }
    }

    /// Canonical name, e.g. `"G#4"`
    pub fn name(self) -> &'static str {
        match self {
            NoteId::C4 => "C4",
            NoteId::CSharp4 => "C#4",
            NoteId::D4 => "D4",
            NoteId::DSharp4 => "D#4",
            NoteId::E4 => "E4",
            NoteId::F4 => "F4",
            NoteId::FSharp4 => "F#4",
            NoteId::G4 => "G4",
            NoteId::GSharp4 => "G#4",
            NoteId::A4 => "A4",
            NoteId::ASharp4 => "A#4",
            NoteId::B4 => "B4",
            NoteId::C5 => "C5",
        }
    }

    /// Sharps are drawn as black keys
    pub fn is_sharp(self) -> bool {
        matches!(
            self,
            NoteId::CSharp4 | NoteId::DSharp4 | NoteId::FSharp4 | NoteId::GSharp4 | NoteId::ASharp4
        )
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NoteId {
    type Err = ParseNoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NoteId::ALL
            .into_iter()
            .find(|note| note.name() == s)
            .ok_or_else(|| ParseNoteError(s.to_string()))
    }
}

/// Look up a frequency by note name
///
/// Names outside the table give `None`, which callers treat as "no sound".
pub fn frequency_of(name: &str) -> Option<f32> {
    name.parse::<NoteId>().ok().map(NoteId::frequency)
}
