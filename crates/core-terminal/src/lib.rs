//! Terminal driver over crossterm, plus the screen painter.

pub mod paint;

use std::io::{Stdout, Write, stdout};

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::{cursor, execute, queue, style, terminal};
use tracing::debug;

use core_state::{CONTROL, META, SPEC, TermDriver, TermEvent};

/// The real terminal. Raw mode plus the alternate screen for the
/// session, restored around subshells.
pub struct CrosstermDriver {
    out: Stdout,
    rows: usize,
    cols: usize,
}

impl CrosstermDriver {
    pub fn new() -> std::io::Result<CrosstermDriver> {
        let (cols, rows) = terminal::size()?;
        Ok(CrosstermDriver {
            out: stdout(),
            rows: rows as usize,
            cols: cols as usize,
        })
    }

    fn map_key(key: KeyEvent) -> Option<u32> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let alt = key.modifiers.contains(KeyModifiers::ALT);
        let mut code = match key.code {
            KeyCode::Char(c) => {
                if ctrl {
                    CONTROL | (c.to_ascii_uppercase() as u32)
                } else {
                    c as u32
                }
            }
            KeyCode::Enter => CONTROL | b'M' as u32,
            KeyCode::Tab => CONTROL | b'I' as u32,
            KeyCode::Backspace => 0x7f,
            KeyCode::Esc => CONTROL | b'[' as u32,
            KeyCode::Up => SPEC | b'A' as u32,
            KeyCode::Down => SPEC | b'B' as u32,
            KeyCode::Right => SPEC | b'C' as u32,
            KeyCode::Left => SPEC | b'D' as u32,
            KeyCode::Home => SPEC | b'H' as u32,
            KeyCode::End => SPEC | b'F' as u32,
            KeyCode::PageUp => SPEC | b'5' as u32,
            KeyCode::PageDown => SPEC | b'6' as u32,
            KeyCode::Delete => SPEC | b'3' as u32,
            KeyCode::Insert => SPEC | b'2' as u32,
            KeyCode::F(n) => SPEC | (b'P' as u32 + (n as u32).saturating_sub(1)),
            _ => return None,
        };
        if alt {
            code |= META;
        }
        Some(code)
    }
}

impl TermDriver for CrosstermDriver {
    fn open(&mut self) -> std::io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(self.out, terminal::EnterAlternateScreen, cursor::Show)?;
        debug!(rows = self.rows, cols = self.cols, "terminal opened");
        Ok(())
    }

    fn close(&mut self) -> std::io::Result<()> {
        execute!(self.out, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    fn size(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    fn read_event(&mut self) -> std::io::Result<TermEvent> {
        loop {
            match crossterm::event::read()? {
                Event::Key(key) if key.kind != KeyEventKind::Release => {
                    if let Some(code) = Self::map_key(key) {
                        return Ok(TermEvent::Key(code));
                    }
                }
                Event::Resize(cols, rows) => {
                    self.rows = rows as usize;
                    self.cols = cols as usize;
                    return Ok(TermEvent::Resize(rows, cols));
                }
                _ => {}
            }
        }
    }

    fn move_to(&mut self, row: usize, col: usize) {
        let _ = queue!(self.out, cursor::MoveTo(col as u16, row as u16));
    }

    fn put_str(&mut self, s: &str) {
        let _ = queue!(self.out, style::Print(s));
    }

    fn erase_eol(&mut self) {
        let _ = queue!(
            self.out,
            terminal::Clear(terminal::ClearType::UntilNewLine)
        );
    }

    fn erase_below(&mut self) {
        let _ = queue!(
            self.out,
            terminal::Clear(terminal::ClearType::FromCursorDown)
        );
    }

    fn rev(&mut self, on: bool) {
        let attr = if on {
            style::Attribute::Reverse
        } else {
            style::Attribute::NoReverse
        };
        let _ = queue!(self.out, style::SetAttribute(attr));
    }

    fn beep(&mut self) {
        let _ = write!(self.out, "\x07");
    }

    fn flush(&mut self) {
        let _ = self.out.flush();
    }

    fn suspend_raw(&mut self) -> std::io::Result<()> {
        execute!(self.out, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    fn resume_raw(&mut self) -> std::io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(self.out, terminal::EnterAlternateScreen)
    }
}
