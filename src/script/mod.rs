//! Input scripts
//!
//! Provides offline playback of recorded or hand-written input:
//! - Parser: Parse the timed input event format
//! - Pipeline: Replay events through the dispatcher and render audio

pub mod parser;
pub mod pipeline;

use std::io;

use thiserror::Error;

pub use parser::{parse_script, Action, Device, InputEvent, ParseError, TimedEvents};
pub use pipeline::{Pipeline, PipelineConfig};

/// Errors from loading or rendering a script
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}
