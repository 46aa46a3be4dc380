//! Input dispatch
//!
//! Every input device boils down to two operations on a note: pressed and
//! released. A press marks the note's keys as pressed and plays it; a release
//! only clears the pressed mark, since tones end on their own.
//!
//! Keyboard input is deduplicated: the platform repeats key-down while a key
//! is held, and only the first one plays. Pointer and touch presses are not
//! deduplicated, each one plays.

use std::collections::HashSet;

use tracing::trace;

use crate::keymap::{normalize_key, KeyBindings};
use crate::notes::NoteId;

/// Something that can sound a note
pub trait NotePlayer {
    fn play(&mut self, note: NoteId);
}

/// The on-screen keys of the piano
pub trait KeyVisuals {
    /// Mark every visual key of `note` as pressed or not
    fn set_pressed(&mut self, note: NoteId, pressed: bool);
}

/// Where an input event came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource<'a> {
    /// Mouse or pen on the key bound to this note name
    Pointer(&'a str),
    /// Finger on the key bound to this note name
    Touch(&'a str),
    /// Keyboard key symbol, any case
    Key(&'a str),
}

/// Keys currently held down, by normalized symbol
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyState {
    held: HashSet<String>,
}

impl KeyState {
    pub fn is_held(&self, symbol: &str) -> bool {
        self.held.contains(&normalize_key(symbol))
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    /// Returns false if the key was already held
    fn hold(&mut self, normalized: String) -> bool {
        self.held.insert(normalized)
    }

    fn release(&mut self, normalized: &str) -> bool {
        self.held.remove(normalized)
    }
}

/// Routes press and release events to the player and the visuals
pub struct InputDispatcher<P, V> {
    bindings: KeyBindings,
    keys: KeyState,
    player: P,
    visuals: V,
}

impl<P: NotePlayer, V: KeyVisuals> InputDispatcher<P, V> {
    pub fn new(player: P, visuals: V) -> Self {
        Self::with_bindings(player, visuals, KeyBindings::default())
    }

    pub fn with_bindings(player: P, visuals: V, bindings: KeyBindings) -> Self {
        Self {
            bindings,
            keys: KeyState::default(),
            player,
            visuals,
        }
    }

    /// Pointer down, touch start, or key down
    pub fn handle_press(&mut self, source: InputSource<'_>) {
        match source {
            InputSource::Pointer(name) | InputSource::Touch(name) => {
                if let Some(note) = resolve_name(name) {
                    self.on_note_pressed(note);
                }
            }
            InputSource::Key(symbol) => {
                let normalized = normalize_key(symbol);
                if self.keys.is_held(&normalized) {
                    trace!(key = %normalized, "key repeat suppressed");
                    return;
                }
                let Some(note) = self.bindings.note_for_key(&normalized) else {
                    trace!(key = %normalized, "unbound key");
                    return;
                };
                self.keys.hold(normalized);
                self.on_note_pressed(note);
            }
        }
    }

    /// Pointer up, touch end, or key up
    ///
    /// Safe to call for notes that are not pressed.
    pub fn handle_release(&mut self, source: InputSource<'_>) {
        match source {
            InputSource::Pointer(name) | InputSource::Touch(name) => {
                if let Some(note) = resolve_name(name) {
                    self.on_note_released(note);
                }
            }
            InputSource::Key(symbol) => {
                let normalized = normalize_key(symbol);
                let Some(note) = self.bindings.note_for_key(&normalized) else {
                    trace!(key = %normalized, "unbound key");
                    return;
                };
                self.keys.release(&normalized);
                self.on_note_released(note);
            }
        }
    }

    /// The pointer left a key while it was down
    pub fn handle_pointer_leave(&mut self, name: &str) {
        self.handle_release(InputSource::Pointer(name));
    }

    pub fn on_note_pressed(&mut self, note: NoteId) {
        self.visuals.set_pressed(note, true);
        self.player.play(note);
    }

    pub fn on_note_released(&mut self, note: NoteId) {
        self.visuals.set_pressed(note, false);
    }

    pub fn key_state(&self) -> &KeyState {
        &self.keys
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }

    pub fn visuals(&self) -> &V {
        &self.visuals
    }
}

fn resolve_name(name: &str) -> Option<NoteId> {
    let note = name.parse().ok();
    if note.is_none() {
        trace!(name, "no note bound to element");
    }
    note
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes::frequency_of;
    use crate::visual::KeyboardView;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Call {
        Play(NoteId),
        Pressed(NoteId, bool),
    }

    /// Player and visuals sharing one call log
    struct Log(Rc<RefCell<Vec<Call>>>);

    impl NotePlayer for Log {
        fn play(&mut self, note: NoteId) {
            self.0.borrow_mut().push(Call::Play(note));
        }
    }

    impl KeyVisuals for Log {
        fn set_pressed(&mut self, note: NoteId, pressed: bool) {
            self.0.borrow_mut().push(Call::Pressed(note, pressed));
        }
    }

    fn logged() -> (InputDispatcher<Log, Log>, Rc<RefCell<Vec<Call>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let dispatcher = InputDispatcher::new(
            Log(Rc::clone(&calls)),
            Log(Rc::clone(&calls)),
        );
        (dispatcher, calls)
    }

    /// Counts plays, keeps a real keyboard view
    #[derive(Default)]
    struct Plays(Vec<NoteId>);

    impl NotePlayer for Plays {
        fn play(&mut self, note: NoteId) {
            self.0.push(note);
        }
    }

    #[test]
    fn test_press_marks_then_plays() {
        let (mut dispatcher, calls) = logged();
        dispatcher.handle_press(InputSource::Key("a"));
        assert_eq!(
            *calls.borrow(),
            vec![Call::Pressed(NoteId::C4, true), Call::Play(NoteId::C4)]
        );
    }

    #[test]
    fn test_key_repeat_plays_once() {
        let mut dispatcher = InputDispatcher::new(Plays::default(), KeyboardView::new());

        dispatcher.handle_press(InputSource::Key("a"));
        dispatcher.handle_press(InputSource::Key("a"));
        dispatcher.handle_press(InputSource::Key("A"));
        assert_eq!(dispatcher.player().0, vec![NoteId::C4]);
        assert!(dispatcher.visuals().is_pressed(NoteId::C4));
        assert!(dispatcher.key_state().is_held("a"));

        dispatcher.handle_release(InputSource::Key("a"));
        assert!(!dispatcher.visuals().is_pressed(NoteId::C4));
        assert!(dispatcher.key_state().is_empty());

        // A fresh press after release plays again
        dispatcher.handle_press(InputSource::Key("a"));
        assert_eq!(dispatcher.player().0, vec![NoteId::C4, NoteId::C4]);
    }

    #[test]
    fn test_release_without_press() {
        let (mut dispatcher, calls) = logged();
        dispatcher.handle_release(InputSource::Key("h"));
        dispatcher.handle_release(InputSource::Pointer("A4"));
        dispatcher.handle_pointer_leave("A4");

        assert!(calls.borrow().iter().all(|c| !matches!(c, Call::Play(_))));
        assert_eq!(
            *calls.borrow(),
            vec![Call::Pressed(NoteId::A4, false); 3]
        );
    }

    #[test]
    fn test_unbound_key_has_no_effect() {
        let (mut dispatcher, calls) = logged();
        dispatcher.handle_press(InputSource::Key("z"));
        dispatcher.handle_release(InputSource::Key("z"));
        dispatcher.handle_press(InputSource::Key("Shift"));

        assert!(calls.borrow().is_empty());
        assert!(dispatcher.key_state().is_empty());
    }

    #[test]
    fn test_unknown_element_is_dropped() {
        let (mut dispatcher, calls) = logged();
        dispatcher.handle_press(InputSource::Pointer(""));
        dispatcher.handle_press(InputSource::Touch("D5"));
        dispatcher.handle_release(InputSource::Touch("D5"));
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_pointer_presses_are_not_deduplicated() {
        let mut dispatcher = InputDispatcher::new(Plays::default(), KeyboardView::new());
        dispatcher.handle_press(InputSource::Pointer("E4"));
        dispatcher.handle_press(InputSource::Pointer("E4"));
        dispatcher.handle_press(InputSource::Touch("E4"));
        assert_eq!(dispatcher.player().0, vec![NoteId::E4; 3]);
        assert!(dispatcher.key_state().is_empty());
    }

    #[test]
    fn test_pointer_down_on_g_sharp() {
        let mut dispatcher = InputDispatcher::new(Plays::default(), KeyboardView::new());
        dispatcher.handle_press(InputSource::Pointer("G#4"));

        let played = dispatcher.player().0.clone();
        assert_eq!(played, vec![NoteId::GSharp4]);
        assert_eq!(frequency_of(&played[0].to_string()), Some(415.3));
        assert!(dispatcher.visuals().is_pressed(NoteId::GSharp4));

        dispatcher.handle_pointer_leave("G#4");
        assert!(!dispatcher.visuals().is_pressed(NoteId::GSharp4));
    }

    #[test]
    fn test_key_up_releases_regardless_of_source() {
        // Pressed by pointer, released by the bound key
        let mut dispatcher = InputDispatcher::new(Plays::default(), KeyboardView::new());
        dispatcher.handle_press(InputSource::Pointer("C5"));
        dispatcher.handle_release(InputSource::Key("K"));
        assert!(!dispatcher.visuals().is_pressed(NoteId::C5));
    }

    #[test]
    fn test_every_representation_is_marked() {
        let mut view = KeyboardView::new();
        view.add_key(NoteId::C4);
        let mut dispatcher = InputDispatcher::new(Plays::default(), view);

        dispatcher.handle_press(InputSource::Key("a"));
        let marked: Vec<bool> = dispatcher
            .visuals()
            .keys_for(NoteId::C4)
            .map(|k| k.pressed)
            .collect();
        assert_eq!(marked, vec![true, true]);
    }

    #[test]
    fn test_custom_bindings() {
        let bindings = KeyBindings::new([('q', NoteId::B4)]);
        let mut dispatcher =
            InputDispatcher::with_bindings(Plays::default(), KeyboardView::new(), bindings);
        dispatcher.handle_press(InputSource::Key("a"));
        dispatcher.handle_press(InputSource::Key("Q"));
        assert_eq!(dispatcher.player().0, vec![NoteId::B4]);
    }
}
