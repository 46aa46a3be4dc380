//! Keyboard view
//!
//! The visual side of the piano: a row of keys, each showing a note and a
//! pressed state. A note may be drawn more than once; marking it pressed
//! marks every copy.

use std::io::{self, Write};

use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use crossterm::{cursor, queue};

use crate::dispatch::KeyVisuals;
use crate::keymap::KeyBindings;
use crate::notes::NoteId;

/// One drawn key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualKey {
    pub note: NoteId,
    /// Keyboard symbol printed on the key
    pub label: Option<char>,
    pub pressed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyboardView {
    keys: Vec<VisualKey>,
}

impl Default for KeyboardView {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyboardView {
    /// One unlabeled key per note
    pub fn new() -> Self {
        Self {
            keys: NoteId::ALL
                .into_iter()
                .map(|note| VisualKey {
                    note,
                    label: None,
                    pressed: false,
                })
                .collect(),
        }
    }

    /// One key per note, labeled with its keyboard binding
    pub fn with_labels(bindings: &KeyBindings) -> Self {
        let mut view = Self::new();
        for key in &mut view.keys {
            key.label = bindings.key_for_note(key.note);
        }
        view
    }

    /// Append another representation of `note`
    pub fn add_key(&mut self, note: NoteId) {
        self.keys.push(VisualKey {
            note,
            label: None,
            pressed: false,
        });
    }

    pub fn keys(&self) -> &[VisualKey] {
        &self.keys
    }

    pub fn keys_for(&self, note: NoteId) -> impl Iterator<Item = &VisualKey> + '_ {
        self.keys.iter().filter(move |k| k.note == note)
    }

    /// True if any representation of `note` is pressed
    pub fn is_pressed(&self, note: NoteId) -> bool {
        self.keys_for(note).any(|k| k.pressed)
    }

    pub fn pressed_notes(&self) -> Vec<NoteId> {
        let mut notes: Vec<NoteId> = self
            .keys
            .iter()
            .filter(|k| k.pressed)
            .map(|k| k.note)
            .collect();
        notes.sort();
        notes.dedup();
        notes
    }
}

impl KeyVisuals for KeyboardView {
    fn set_pressed(&mut self, note: NoteId, pressed: bool) {
        for key in self.keys.iter_mut().filter(|k| k.note == note) {
            key.pressed = pressed;
        }
    }
}

/// Where and how large the keyboard is drawn in a terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalLayout {
    pub column: u16,
    pub row: u16,
    pub key_width: u16,
    pub key_height: u16,
}

impl Default for TerminalLayout {
    fn default() -> Self {
        Self {
            column: 2,
            row: 2,
            key_width: 5,
            key_height: 4,
        }
    }
}

impl TerminalLayout {
    pub fn width(&self, view: &KeyboardView) -> u16 {
        self.key_width * view.keys.len() as u16
    }

    /// Note of the key drawn at a terminal cell
    pub fn note_at(&self, view: &KeyboardView, column: u16, row: u16) -> Option<NoteId> {
        if row < self.row || row >= self.row + self.key_height || column < self.column {
            return None;
        }
        let index = ((column - self.column) / self.key_width.max(1)) as usize;
        view.keys.get(index).map(|k| k.note)
    }

    /// Queue the drawing commands for every key; the caller flushes
    pub fn draw<W: Write>(&self, view: &KeyboardView, out: &mut W) -> io::Result<()> {
        let width = self.key_width as usize;

        for (i, key) in view.keys.iter().enumerate() {
            let column = self.column + i as u16 * self.key_width;
            let (background, foreground) = match (key.pressed, key.note.is_sharp()) {
                (true, _) => (Color::Yellow, Color::Black),
                (false, true) => (Color::Black, Color::White),
                (false, false) => (Color::White, Color::Black),
            };
            queue!(out, SetBackgroundColor(background), SetForegroundColor(foreground))?;

            for line in 0..self.key_height {
                let text = match line {
                    0 => key.note.name().to_string(),
                    l if l + 1 == self.key_height => {
                        key.label.map(|c| c.to_string()).unwrap_or_default()
                    }
                    _ => String::new(),
                };
                queue!(
                    out,
                    cursor::MoveTo(column, self.row + line),
                    Print(format!("{:^width$}", text, width = width))
                )?;
            }
        }

        queue!(out, ResetColor)?;
        Ok(())
    }
}
