//! Terminal capability interface.
//!
//! The editor talks to its display through this trait; the real
//! crossterm driver and the painter live elsewhere. A scripted
//! implementation is provided here so every crate can drive an
//! `Editor` in tests without a TTY.

use std::collections::VecDeque;
use std::io;

/// One event from the terminal. Resizes arrive in-band so the loops
/// can handle them at a defined point instead of via signal escapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermEvent {
    /// A composite keycode (see `keytab` for the prefix bits).
    Key(u32),
    Resize(u16, u16),
}

pub trait TermDriver {
    fn open(&mut self) -> io::Result<()>;
    fn close(&mut self) -> io::Result<()>;
    /// (rows, cols)
    fn size(&self) -> (usize, usize);
    /// Blocking read of the next event.
    fn read_event(&mut self) -> io::Result<TermEvent>;
    fn move_to(&mut self, row: usize, col: usize);
    fn put_str(&mut self, s: &str);
    fn erase_eol(&mut self);
    fn erase_below(&mut self);
    fn rev(&mut self, on: bool);
    fn beep(&mut self);
    fn flush(&mut self);
    /// Leave/re-enter raw mode around a subshell.
    fn suspend_raw(&mut self) -> io::Result<()> {
        Ok(())
    }
    fn resume_raw(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Scripted driver for tests: events are queued up front; output is
/// captured as a flat transcript.
#[derive(Debug, Default)]
pub struct ScriptedTerm {
    pub events: VecDeque<TermEvent>,
    pub transcript: Vec<String>,
    pub rows: usize,
    pub cols: usize,
    pub beeps: usize,
}

impl ScriptedTerm {
    pub fn new() -> Self {
        ScriptedTerm {
            rows: 24,
            cols: 80,
            ..ScriptedTerm::default()
        }
    }

    pub fn with_keys<I: IntoIterator<Item = u32>>(keys: I) -> Self {
        let mut t = Self::new();
        t.events = keys.into_iter().map(TermEvent::Key).collect();
        t
    }

    pub fn push_key(&mut self, code: u32) {
        self.events.push_back(TermEvent::Key(code));
    }
}

impl TermDriver for ScriptedTerm {
    fn open(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn size(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    fn read_event(&mut self) -> io::Result<TermEvent> {
        self.events
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "script exhausted"))
    }

    fn move_to(&mut self, _row: usize, _col: usize) {}

    fn put_str(&mut self, s: &str) {
        self.transcript.push(s.to_string());
    }

    fn erase_eol(&mut self) {}

    fn erase_below(&mut self) {}

    fn rev(&mut self, _on: bool) {}

    fn beep(&mut self) {
        self.beeps += 1;
    }

    fn flush(&mut self) {}
}
