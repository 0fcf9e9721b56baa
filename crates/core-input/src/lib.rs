//! Keyboard plumbing: keystroke fetch with macro record/playback,
//! composite-keycode assembly (prefix composition), and the
//! minibuffer line editor.

pub mod assembler;
pub mod minibuf;

use tracing::trace;

use core_state::{CONTROL, CmdResult, EdError, Editor, KbdMode, SPEC, TermEvent, relayout};

pub use minibuf::{getstring, getstring_hidden};

/// Upper-bound on recorded macro keystrokes.
pub const NKBDM: usize = 256;

fn resize(ed: &mut Editor, rows: u16, cols: u16) {
    trace!(rows, cols, "terminal resized");
    relayout(&mut ed.wins, rows as usize);
    let _ = cols;
    ed.mlerase();
}

/// Fetch one keystroke, resolving keyboard-macro playback and
/// recording, and folding resize events in at a defined point.
pub fn tgetc(ed: &mut Editor) -> CmdResult<u32> {
    if ed.mac.mode == KbdMode::Play {
        if ed.mac.pos < ed.mac.keys.len() {
            let c = ed.mac.keys[ed.mac.pos];
            ed.mac.pos += 1;
            return Ok(c);
        }
        ed.mac.rep -= 1;
        if ed.mac.rep < 1 {
            ed.mac.mode = KbdMode::Stop;
        } else {
            ed.mac.pos = 0;
            let c = ed.mac.keys[ed.mac.pos];
            ed.mac.pos += 1;
            return Ok(c);
        }
    }
    let c = loop {
        match ed.term.read_event().map_err(EdError::Io)? {
            TermEvent::Key(c) => break c,
            TermEvent::Resize(r, cl) => resize(ed, r, cl),
        }
    };
    if ed.mac.mode == KbdMode::Record {
        if ed.mac.keys.len() >= NKBDM {
            ed.mac.mode = KbdMode::Stop;
            ed.term.beep();
        } else {
            ed.mac.keys.push(c);
        }
    }
    Ok(c)
}

/// Get one keystroke; C0 codes come back CONTROL-tagged.
pub fn get1key(ed: &mut Editor) -> CmdResult<u32> {
    let c = tgetc(ed)?;
    if c <= 0x1f {
        return Ok(CONTROL | (c + b'@' as u32));
    }
    Ok(c)
}

/// Collapse the CONTROL and SPEC flags back into a raw character
/// (expanded-character to character).
pub fn ectoc(c: u32) -> u32 {
    if c & CONTROL != 0 {
        return c & !(CONTROL | 0x40);
    }
    if c & SPEC != 0 {
        return c & 255;
    }
    c
}

fn ensure_uppercase(c: u32) -> u32 {
    if c <= 0x7f {
        (c as u8 as char).to_ascii_uppercase() as u32
    } else if c & (SPEC | CONTROL) == 0 {
        match char::from_u32(c) {
            Some(ch) => {
                let mut up = ch.to_uppercase();
                let first = up.next().unwrap_or(ch);
                if up.next().is_some() {
                    c
                } else {
                    first as u32
                }
            }
            None => c,
        }
    } else {
        c
    }
}

fn control_fold(c: u32) -> u32 {
    if c <= 0x1f {
        CONTROL | (c + b'@' as u32)
    } else {
        c
    }
}

/// Assemble one command keycode, composing the META and C-x prefixes.
/// The letter after a prefix is folded to uppercase so bindings are
/// case-stable.
pub fn getcmd(ed: &mut Editor) -> CmdResult<u32> {
    use core_state::{CTLX, META};
    if ed.mac.mode == KbdMode::Record {
        ed.mac.cmd_start = ed.mac.keys.len();
    }
    let c = get1key(ed)?;

    if c == ed.metac {
        let mut c = get1key(ed)?;
        c = control_fold(ensure_uppercase(c));
        return Ok(META | c);
    }
    if c == ed.ctlxc {
        let mut c = get1key(ed)?;
        c = control_fold(ensure_uppercase(c));
        return Ok(CTLX | c);
    }
    Ok(c)
}
