use crate::console::Console;
use crate::control::ControlState;
use crate::report;
use crate::schedule::SharedStats;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::io;
use std::sync::{Arc, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::warn;

/// Longest wait for a key before the loop rechecks for shutdown.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Interrupt,
}

pub trait KeySource {
    /// Waits at most `wait` for one key.
    fn poll_key(&mut self, wait: Duration) -> io::Result<Option<Key>>;
}

/// Reads keys from the terminal, which must already be in raw mode.
#[derive(Debug, Default)]
pub struct TerminalKeys;

impl KeySource for TerminalKeys {
    fn poll_key(&mut self, wait: Duration) -> io::Result<Option<Key>> {
        if !event::poll(wait)? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(KeyEvent {
                code,
                modifiers,
                kind: KeyEventKind::Press,
                ..
            }) => Ok(map_key(code, modifiers)),
            _ => Ok(None),
        }
    }
}

fn map_key(code: KeyCode, modifiers: KeyModifiers) -> Option<Key> {
    match code {
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => Some(Key::Interrupt),
        KeyCode::Char(c) => Some(Key::Char(c)),
        KeyCode::Enter => Some(Key::Enter),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    ToggleVerbose,
    ToggleDebug,
    ShowStats,
    ToggleLostOnly,
    Pause,
    SetSleep(u32),
    IncreaseSleep,
    DecreaseSleep,
    Help,
}

impl Command {
    pub fn from_key(key: Key) -> Option<Self> {
        let c = match key {
            Key::Interrupt => return Some(Command::Quit),
            Key::Enter => return None,
            Key::Char(c) => c,
        };
        match c {
            'q' | 'Q' => Some(Command::Quit),
            'v' => Some(Command::ToggleVerbose),
            'd' => Some(Command::ToggleDebug),
            's' => Some(Command::ShowStats),
            'l' => Some(Command::ToggleLostOnly),
            'p' => Some(Command::Pause),
            '1'..='9' => c.to_digit(10).map(Command::SetSleep),
            '+' | '=' => Some(Command::IncreaseSleep),
            '-' => Some(Command::DecreaseSleep),
            'h' => Some(Command::Help),
            _ => None,
        }
    }
}

fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

/// Applies operator keys to the shared control state until shutdown.
pub struct CommandLoop<K> {
    keys: K,
    control: Arc<ControlState>,
    stats: SharedStats,
    console: Console,
}

impl<K: KeySource> CommandLoop<K> {
    pub fn new(keys: K, control: Arc<ControlState>, stats: SharedStats, console: Console) -> Self {
        Self {
            keys,
            control,
            stats,
            console,
        }
    }

    pub fn run(mut self) -> io::Result<()> {
        while self.control.running() {
            let Some(key) = self.keys.poll_key(POLL_INTERVAL)? else {
                continue;
            };
            if let Some(command) = Command::from_key(key) {
                self.execute(command)?;
            }
        }
        Ok(())
    }

    fn execute(&mut self, command: Command) -> io::Result<()> {
        let control = &self.control;
        match command {
            Command::Quit => control.stop(),
            Command::ToggleVerbose => {
                let on = control.toggle_verbose();
                self.console.line(format!("Verbose mode: {}", on_off(on)));
            }
            Command::ToggleDebug => {
                let on = control.toggle_debug();
                self.console.line(format!("Debug mode: {}", on_off(on)));
            }
            Command::ToggleLostOnly => {
                if control.toggle_lost_only() {
                    self.console.line("Showing only lost packets");
                } else {
                    self.console.line("Showing all packets");
                }
            }
            Command::ShowStats => {
                let rows = self
                    .stats
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .report();
                self.console.lines(report::stats_table(&rows));
            }
            Command::Pause => self.pause()?,
            Command::SetSleep(secs) => {
                control.set_extra_sleep(secs);
                self.console.line(format!("Sleep time set to: {secs} seconds"));
            }
            Command::IncreaseSleep => {
                let secs = control.increase_extra_sleep();
                self.console
                    .line(format!("Sleep time increased to: {secs} seconds"));
            }
            Command::DecreaseSleep => {
                let secs = control.decrease_extra_sleep();
                self.console
                    .line(format!("Sleep time decreased to: {secs} seconds"));
            }
            Command::Help => self.console.lines(report::help_text()),
        }
        Ok(())
    }

    /// Holds the scheduler until Enter. Quit keys end the session instead.
    fn pause(&mut self) -> io::Result<()> {
        self.control.set_paused(true);
        self.console.line("PAUSED - Press Enter to continue: ");
        while self.control.running() {
            match self.keys.poll_key(POLL_INTERVAL)? {
                Some(Key::Enter) => {
                    self.control.set_paused(false);
                    self.console.line("Resuming...");
                    break;
                }
                Some(Key::Interrupt | Key::Char('q' | 'Q')) => {
                    self.control.stop();
                    break;
                }
                _ => {}
            }
        }
        Ok(())
    }
}

pub fn spawn_terminal_loop(
    control: Arc<ControlState>,
    stats: SharedStats,
    console: Console,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let commands = CommandLoop::new(TerminalKeys, control, stats, console);
        if let Err(err) = commands.run() {
            warn!(error = %err, "keyboard input stopped");
        }
    })
}
