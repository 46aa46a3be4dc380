//! Interactive terminal piano
//!
//! Play with the home row (`a s d f g h j k`) and the row above it for the
//! sharps, or click the keys with the mouse. Esc or Ctrl-C quits.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Stdout, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, KeyboardEnhancementFlags, MouseButton, MouseEvent, MouseEventKind,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::style::Print;
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute, queue};
use keypiano::audio::{ContextConfig, SharedContext};
use keypiano::dispatch::{InputDispatcher, InputSource};
use keypiano::generator::Waveform;
use keypiano::keymap::{normalize_key, KeyBindings};
use keypiano::notes::NoteId;
use keypiano::synth::{ToneShape, ToneSynthesizer};
use keypiano::visual::{KeyboardView, TerminalLayout};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const POLL_INTERVAL: Duration = Duration::from_millis(16);

/// One-octave piano in the terminal
#[derive(Parser, Debug)]
#[command(name = "keypiano", version)]
struct Args {
    /// Oscillator waveform: sine, square, sawtooth or triangle
    #[arg(long, default_value_t = Waveform::Sine)]
    waveform: Waveform,

    /// Write logs to this file (the terminal is taken by the keyboard)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log at debug level instead of info
    #[arg(short, long)]
    verbose: bool,
}

type Piano = InputDispatcher<ToneSynthesizer<SharedContext>, KeyboardView>;

/// Restores the terminal however the event loop ends
struct TerminalGuard {
    enhanced: bool,
}

impl TerminalGuard {
    fn enter(out: &mut Stdout) -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        execute!(out, EnterAlternateScreen, EnableMouseCapture, cursor::Hide)?;

        let enhanced = terminal::supports_keyboard_enhancement().unwrap_or(false);
        if enhanced {
            execute!(
                out,
                PushKeyboardEnhancementFlags(
                    KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                        | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                )
            )?;
        }
        Ok(Self { enhanced })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let mut out = io::stdout();
        if self.enhanced {
            let _ = execute!(out, PopKeyboardEnhancementFlags);
        }
        let _ = execute!(out, cursor::Show, DisableMouseCapture, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

/// Terminal-side state around the dispatcher
struct Session {
    piano: Piano,
    layout: TerminalLayout,
    /// Whether the terminal reports key releases
    reports_release: bool,
    /// Without release reports: when each held key was last seen
    last_seen: HashMap<String, Instant>,
    /// Key under the mouse while the left button is down
    pointer: Option<NoteId>,
    hold_timeout: Duration,
}

impl Session {
    /// Returns false when the user asked to quit
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        let quit = key.code == KeyCode::Esc
            || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL));
        if quit {
            return false;
        }

        let KeyCode::Char(c) = key.code else {
            return true;
        };
        let symbol = c.to_string();

        match key.kind {
            KeyEventKind::Press | KeyEventKind::Repeat => {
                self.piano.handle_press(InputSource::Key(&symbol));
                if !self.reports_release && self.piano.key_state().is_held(&symbol) {
                    self.last_seen.insert(normalize_key(&symbol), Instant::now());
                }
            }
            KeyEventKind::Release => self.piano.handle_release(InputSource::Key(&symbol)),
        }
        true
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let under = self
            .layout
            .note_at(self.piano.visuals(), mouse.column, mouse.row);

        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(note) = under {
                    self.piano.handle_press(InputSource::Pointer(note.name()));
                }
                self.pointer = under;
            }
            MouseEventKind::Up(MouseButton::Left) => {
                if let Some(note) = self.pointer.take() {
                    self.piano.handle_release(InputSource::Pointer(note.name()));
                }
            }
            MouseEventKind::Drag(MouseButton::Left) | MouseEventKind::Moved => {
                if let Some(note) = self.pointer {
                    if under != Some(note) {
                        self.piano.handle_pointer_leave(note.name());
                        self.pointer = None;
                    }
                }
            }
            _ => {}
        }
    }

    /// Release keys whose repeats stopped arriving
    fn expire_held_keys(&mut self) {
        if self.reports_release {
            return;
        }
        let now = Instant::now();
        let expired: Vec<String> = self
            .last_seen
            .iter()
            .filter(|(_, seen)| now.duration_since(**seen) >= self.hold_timeout)
            .map(|(symbol, _)| symbol.clone())
            .collect();

        for symbol in expired {
            debug!(key = %symbol, "releasing key without release report");
            self.last_seen.remove(&symbol);
            self.piano.handle_release(InputSource::Key(&symbol));
        }
    }

    fn draw(&self, out: &mut Stdout) -> io::Result<()> {
        queue!(
            out,
            cursor::MoveTo(self.layout.column, 0),
            Clear(ClearType::CurrentLine),
            Print("keypiano: keys a-k play, mouse clicks too, Esc quits")
        )?;
        self.layout.draw(self.piano.visuals(), out)?;

        let pressed: Vec<&str> = self
            .piano
            .visuals()
            .pressed_notes()
            .into_iter()
            .map(NoteId::name)
            .collect();
        queue!(
            out,
            cursor::MoveTo(self.layout.column, self.layout.row + self.layout.key_height + 1),
            Clear(ClearType::CurrentLine),
            Print(format!("pressed: {}", pressed.join(" ")))
        )?;
        out.flush()
    }
}

fn init_logging(args: &Args) -> anyhow::Result<()> {
    let Some(path) = &args.log_file else {
        return Ok(());
    };
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn run(session: &mut Session, out: &mut Stdout) -> anyhow::Result<()> {
    execute!(out, Clear(ClearType::All))?;
    session.draw(out)?;

    loop {
        if event::poll(POLL_INTERVAL)? {
            match event::read()? {
                Event::Key(key) => {
                    if !session.handle_key(key) {
                        return Ok(());
                    }
                }
                Event::Mouse(mouse) => session.handle_mouse(mouse),
                Event::Resize(_, _) => execute!(out, Clear(ClearType::All))?,
                _ => {}
            }
        }
        session.expire_held_keys();
        session.draw(out)?;
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    let shape = ToneShape {
        waveform: args.waveform,
        ..ToneShape::default()
    };
    let hold_timeout = Duration::from_secs_f64(shape.stop);
    let synth = ToneSynthesizer::with_shape(|| SharedContext::open(ContextConfig::default()), shape);
    let bindings = KeyBindings::default();
    let view = KeyboardView::with_labels(&bindings);
    let piano = InputDispatcher::with_bindings(synth, view, bindings);

    let mut out = io::stdout();
    let guard = TerminalGuard::enter(&mut out)?;
    info!(reports_release = guard.enhanced, "terminal ready");

    let mut session = Session {
        piano,
        layout: TerminalLayout::default(),
        reports_release: guard.enhanced,
        last_seen: HashMap::new(),
        pointer: None,
        hold_timeout,
    };
    let result = run(&mut session, &mut out);

    drop(guard);
    result
}
