//! Computer keyboard bindings
//!
//! The home row plays the white keys and the row above it the sharps:
//!
//! ```text
//!    w e   t y u
//!   a s d f g h j k
//! ```

use crate::notes::NoteId;

const DEFAULT_BINDINGS: [(char, NoteId); 13] = [
    ('a', NoteId::C4),
    ('w', NoteId::CSharp4),
    ('s', NoteId::D4),
    ('e', NoteId::DSharp4),
    ('d', NoteId::E4),
    ('f', NoteId::F4),
    ('t', NoteId::FSharp4),
    ('g', NoteId::G4),
    ('y', NoteId::GSharp4),
    ('h', NoteId::A4),
    ('u', NoteId::ASharp4),
    ('j', NoteId::B4),
    ('k', NoteId::C5),
];

/// Lowercase a key symbol so `"A"` and `"a"` are the same key
pub fn normalize_key(symbol: &str) -> String {
    symbol.to_lowercase()
}

/// Maps key symbols to notes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBindings {
    bindings: Vec<(char, NoteId)>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            bindings: DEFAULT_BINDINGS.to_vec(),
        }
    }
}

impl KeyBindings {
    /// Build a custom table; symbols are stored lowercased
    pub fn new(bindings: impl IntoIterator<Item = (char, NoteId)>) -> Self {
        Self {
            bindings: bindings
                .into_iter()
                .map(|(c, note)| (lowercase(c), note))
                .collect(),
        }
    }

    /// Resolve a key symbol, ignoring case
    ///
    /// Anything that is not a single bound character (including named keys
    /// such as `"Shift"`) resolves to `None`.
    pub fn note_for_key(&self, symbol: &str) -> Option<NoteId> {
        lookup(&self.bindings, symbol)
    }

    /// First symbol bound to `note`, used for key labels
    pub fn key_for_note(&self, note: NoteId) -> Option<char> {
        self.bindings
            .iter()
            .find(|(_, n)| *n == note)
            .map(|&(c, _)| c)
    }

    pub fn iter(&self) -> impl Iterator<Item = (char, NoteId)> + '_ {
        self.bindings.iter().copied()
    }
}

/// Resolve against the default bindings
pub fn note_for_key(symbol: &str) -> Option<NoteId> {
    lookup(&DEFAULT_BINDINGS, symbol)
}

/// Lowercase one character the way `normalize_key` does, keeping it as is
/// when its lowercase form is longer than one character
fn lowercase(c: char) -> char {
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

fn lookup(bindings: &[(char, NoteId)], symbol: &str) -> Option<NoteId> {
    let normalized = normalize_key(symbol);
    let mut chars = normalized.chars();
    let c = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    bindings
        .iter()
        .find(|&&(bound, _)| lowercase(bound) == c)
        .map(|&(_, note)| note)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bindings() {
        assert_eq!(note_for_key("a"), Some(NoteId::C4));
        assert_eq!(note_for_key("k"), Some(NoteId::C5));
        assert_eq!(note_for_key("y"), Some(NoteId::GSharp4));
        assert_eq!(note_for_key("z"), None);
        assert_eq!(note_for_key(""), None);
        assert_eq!(note_for_key("Shift"), None);
    }

    #[test]
    fn test_case_insensitive() {
        let bindings = KeyBindings::default();
        assert_eq!(bindings.note_for_key("A"), Some(NoteId::C4));
        assert_eq!(bindings.note_for_key("H"), Some(NoteId::A4));
        assert_eq!(note_for_key("J"), Some(NoteId::B4));
    }

    #[test]
    fn test_table_and_free_function_agree() {
        let bindings = KeyBindings::default();
        for c in 'a'..='z' {
            let s = c.to_string();
            assert_eq!(bindings.note_for_key(&s), note_for_key(&s), "{}", c);
        }
    }

    #[test]
    fn test_every_note_is_bound_once() {
        let bindings = KeyBindings::default();
        for note in NoteId::ALL {
            let count = bindings.iter().filter(|&(_, n)| n == note).count();
            assert_eq!(count, 1, "{}", note);
        }
        assert_eq!(bindings.key_for_note(NoteId::FSharp4), Some('t'));
    }

    #[test]
    fn test_custom_bindings() {
        let bindings = KeyBindings::new([('Z', NoteId::C4), ('x', NoteId::D4)]);
        assert_eq!(bindings.note_for_key("z"), Some(NoteId::C4));
        assert_eq!(bindings.note_for_key("a"), None);
    }

    #[test]
    fn test_custom_non_ascii_bindings() {
        let bindings = KeyBindings::new([('Ä', NoteId::E4), ('ö', NoteId::F4)]);
        assert_eq!(bindings.note_for_key("ä"), Some(NoteId::E4));
        assert_eq!(bindings.note_for_key("Ä"), Some(NoteId::E4));
        assert_eq!(bindings.note_for_key("Ö"), Some(NoteId::F4));
        assert_eq!(bindings.key_for_note(NoteId::E4), Some('ä'));
    }
}
