//! Parser for input scripts
//!
//! Format:
//! +<delta_ms>| <event1>, <event2>  # comments
//!
//! A `#` starts a comment only at the start of a line or after whitespace.
//!
//! Events are `<device> <action> <target>`:
//! - `key down a`, `key up a`
//! - `mouse down G#4`, `mouse up G#4`, `mouse leave G#4`
//! - `touch start C4`, `touch end C4`
//!
//! Deltas are capped at one hour.
//!
//! Targets are not checked against the note or key tables; unknown targets
//! are valid input that simply makes no sound.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::dispatch::{InputDispatcher, InputSource, KeyVisuals, NotePlayer};

/// Longest accepted gap between two lines
pub const MAX_DELTA_MS: u64 = 60 * 60 * 1000;

/// Input device an event came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Key,
    Mouse,
    Touch,
}

impl FromStr for Device {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "key" => Ok(Device::Key),
            "mouse" => Ok(Device::Mouse),
            "touch" => Ok(Device::Touch),
            _ => Err(ParseError::InvalidDevice(s.to_string())),
        }
    }
}

/// What happened on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Press,
    Release,
    /// Pointer moved off the key
    Leave,
}

/// A single input event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputEvent {
    pub device: Device,
    pub action: Action,
    /// Key symbol for `Device::Key`, note name otherwise
    pub target: String,
}

impl InputEvent {
    pub fn source(&self) -> InputSource<'_> {
        match self.device {
            Device::Key => InputSource::Key(&self.target),
            Device::Mouse => InputSource::Pointer(&self.target),
            Device::Touch => InputSource::Touch(&self.target),
        }
    }

    /// Hand the event to a dispatcher
    pub fn deliver<P: NotePlayer, V: KeyVisuals>(&self, dispatcher: &mut InputDispatcher<P, V>) {
        match self.action {
            Action::Press => dispatcher.handle_press(self.source()),
            Action::Release => dispatcher.handle_release(self.source()),
            Action::Leave => dispatcher.handle_pointer_leave(&self.target),
        }
    }
}

impl fmt::Display for InputEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (device, action) = match (self.device, self.action) {
            (Device::Key, Action::Press) => ("key", "down"),
            (Device::Key, _) => ("key", "up"),
            (Device::Mouse, Action::Press) => ("mouse", "down"),
            (Device::Mouse, Action::Release) => ("mouse", "up"),
            (Device::Mouse, Action::Leave) => ("mouse", "leave"),
            (Device::Touch, Action::Press) => ("touch", "start"),
            (Device::Touch, _) => ("touch", "end"),
        };
        write!(f, "{} {} {}", device, action, self.target)
    }
}

/// A line from the script with its time delta
#[derive(Debug, Clone, PartialEq)]
pub struct TimedEvents {
    /// Milliseconds since the previous line (since the start for the first)
    pub delta_ms: u64,
    /// Events occurring at this instant, in order
    pub events: Vec<InputEvent>,
}

/// Parse errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid line: {0}")]
    InvalidLine(String),
    #[error("invalid time delta: {0}")]
    InvalidDelta(String),
    #[error("invalid event: {0}")]
    InvalidEvent(String),
    #[error("invalid device: {0}")]
    InvalidDevice(String),
    #[error("invalid action {action:?} for {device:?}")]
    InvalidAction { device: Device, action: String },
    #[error("line {line}: {source}")]
    AtLine {
        line: usize,
        #[source]
        source: Box<ParseError>,
    },
}

fn parse_action(device: Device, s: &str) -> Result<Action, ParseError> {
    match (device, s) {
        (Device::Key, "down") | (Device::Mouse, "down") | (Device::Touch, "start") => {
            Ok(Action::Press)
        }
        (Device::Key, "up") | (Device::Mouse, "up") | (Device::Touch, "end") => Ok(Action::Release),
        (Device::Mouse, "leave") => Ok(Action::Leave),
        _ => Err(ParseError::InvalidAction {
            device,
            action: s.to_string(),
        }),
    }
}

/// Parse a single event string
/// Examples: `key down a`, `mouse leave C#4`
fn parse_event(s: &str) -> Result<InputEvent, ParseError> {
    let parts: Vec<&str> = s.split_whitespace().collect();
    let [device, action, target] = parts[..] else {
        return Err(ParseError::InvalidEvent(s.trim().to_string()));
    };

    let device: Device = device.parse()?;
    let action = parse_action(device, action)?;
    Ok(InputEvent {
        device,
        action,
        target: target.to_string(),
    })
}

/// Parse one non-empty, comment-stripped line
fn parse_line(line: &str) -> Result<TimedEvents, ParseError> {
    let rest = line
        .strip_prefix('+')
        .ok_or_else(|| ParseError::InvalidLine(line.to_string()))?;
    let (delta, events) = rest
        .split_once('|')
        .ok_or_else(|| ParseError::InvalidLine(line.to_string()))?;

    let delta_ms = delta
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|&ms| ms <= MAX_DELTA_MS)
        .ok_or_else(|| ParseError::InvalidDelta(delta.trim().to_string()))?;

    let events = events
        .split(',')
        .filter(|e| !e.trim().is_empty())
        .map(parse_event)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TimedEvents { delta_ms, events })
}

/// Cut a trailing comment
///
/// A comment starts at a `#` at the start of the line or after whitespace,
/// so sharps in note names such as `G#4` are kept.
fn strip_comment(line: &str) -> &str {
    let mut previous = None;
    for (pos, c) in line.char_indices() {
        if c == '#' && previous.map_or(true, char::is_whitespace) {
            return &line[..pos];
        }
        previous = Some(c);
    }
    line
}

/// Parse a whole script
///
/// Blank lines and `#` comments are skipped. Errors carry the 1-based line
/// number.
pub fn parse_script(input: &str) -> Result<Vec<TimedEvents>, ParseError> {
    let mut result = Vec::new();

    for (index, raw) in input.lines().enumerate() {
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }

        let timed = parse_line(line).map_err(|e| ParseError::AtLine {
            line: index + 1,
            source: Box::new(e),
        })?;
        result.push(timed);
    }

    Ok(result)
}
