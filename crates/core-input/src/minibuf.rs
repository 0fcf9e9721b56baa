//! The minibuffer: a one-row line editor used by every prompt.
//!
//! Prompts may nest (a prompt issued from inside a prompt); each
//! level keeps its own reply under construction and the depth is
//! tracked so commands marked not-valid-in-minibuffer can refuse.

use tracing::trace;

use core_complete::{Cmplt, complete};
use core_state::{CONTROL, CmdResult, EdError, Editor, KEY_BASE, META, SPEC};

use crate::get1key;

fn draw(ed: &mut Editor, prompt: &str, shown: &str) {
    let (rows, _) = ed.term.size();
    let row = rows.saturating_sub(1);
    ed.term.move_to(row, 0);
    ed.term.put_str(prompt);
    ed.term.put_str(shown);
    ed.term.erase_eol();
    ed.term.flush();
}

fn pop_grapheme(buf: &mut String) {
    let bytes = buf.as_bytes();
    if let Some(prev) = core_text::prev_offset(bytes, bytes.len(), true) {
        buf.truncate(prev);
    }
}

fn run(ed: &mut Editor, prompt: &str, ctx: Cmplt, echo: bool) -> CmdResult<String> {
    let mut buf = String::new();
    let mut info: Option<String> = None;
    loop {
        let shown = match (&info, echo) {
            (Some(line), _) => line.clone(),
            (None, true) => buf.clone(),
            (None, false) => "*".repeat(buf.chars().count()),
        };
        draw(ed, prompt, &shown);
        info = None;
        let c = get1key(ed)?;
        if c == ed.abortc {
            return Err(EdError::Abort);
        }
        match c {
            _ if c == CONTROL | b'M' as u32 || c == CONTROL | b'J' as u32 => {
                trace!(reply = %buf, "minibuffer submit");
                return Ok(buf);
            }
            _ if c == CONTROL | b'H' as u32 || c == 0x7f => pop_grapheme(&mut buf),
            _ if c == CONTROL | b'K' as u32 => buf.clear(),
            _ if c == CONTROL | b'I' as u32 => match ctx {
                Cmplt::SearchRing => {
                    if let Some(pat) = ed.search.rotate_srch(1) {
                        buf = pat.to_string();
                    } else {
                        ed.term.beep();
                    }
                }
                Cmplt::None => buf.push('\t'),
                _ => {
                    let width = ed.term.size().1;
                    match complete(ed, ctx, &buf, width) {
                        None => ed.term.beep(),
                        Some(res) => {
                            buf = res.text;
                            if let Some(choices) = res.choices {
                                info = Some(choices);
                            }
                        }
                    }
                }
            },
            _ if c == CONTROL | b'Q' as u32 => {
                let q = crate::ectoc(get1key(ed)?);
                if let Some(ch) = char::from_u32(q & KEY_BASE) {
                    buf.push(ch);
                }
            }
            _ if c & (META | SPEC | CONTROL) != 0 => ed.term.beep(),
            _ => {
                if let Some(ch) = char::from_u32(c) {
                    buf.push(ch);
                } else {
                    ed.term.beep();
                }
            }
        }
    }
}

/// Prompt for a string with completion. The reply is pushed onto the
/// minibuffer reply ring.
pub fn getstring(ed: &mut Editor, prompt: &str, ctx: Cmplt) -> CmdResult<String> {
    ed.mb_depth += 1;
    let out = run(ed, prompt, ctx, ed.disinp);
    ed.mb_depth -= 1;
    ed.mlerase();
    if let Ok(reply) = &out
        && !reply.is_empty()
    {
        ed.replies.push(reply);
    }
    out
}

/// Prompt without echo and without touching the reply ring (key
/// entry).
pub fn getstring_hidden(ed: &mut Editor, prompt: &str) -> CmdResult<String> {
    ed.mb_depth += 1;
    let out = run(ed, prompt, Cmplt::None, false);
    ed.mb_depth -= 1;
    ed.mlerase();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_state::ScriptedTerm;

    fn keys_for(s: &str) -> Vec<u32> {
        s.chars().map(|c| c as u32).collect()
    }

    fn ed_with(keys: Vec<u32>) -> Editor {
        Editor::new(Box::new(ScriptedTerm::with_keys(keys)))
    }

    #[test]
    fn types_and_submits() {
        let mut keys = keys_for("hi");
        keys.push(CONTROL | b'M' as u32);
        let mut ed = ed_with(keys);
        let reply = getstring(&mut ed, "p: ", Cmplt::None).unwrap();
        assert_eq!(reply, "hi");
        assert_eq!(ed.replies.get(0), Some("hi"));
        assert_eq!(ed.mb_depth, 0);
    }

    #[test]
    fn backspace_removes_grapheme() {
        let mut keys = vec![b'a' as u32, 0xe9, CONTROL | b'H' as u32, CONTROL | b'M' as u32];
        let mut ed = ed_with(keys.drain(..).collect());
        let reply = getstring(&mut ed, "p: ", Cmplt::None).unwrap();
        assert_eq!(reply, "a");
    }

    #[test]
    fn abort_key_aborts() {
        let mut ed = ed_with(vec![b'x' as u32, CONTROL | b'G' as u32]);
        let err = getstring(&mut ed, "p: ", Cmplt::None).unwrap_err();
        assert!(err.is_abort());
    }

    #[test]
    fn tab_completes_buffer_names() {
        let mut ed = ed_with(vec![
            b'm' as u32,
            CONTROL | b'I' as u32,
            CONTROL | b'M' as u32,
        ]);
        let reply = getstring(&mut ed, "buffer: ", Cmplt::Buffer).unwrap();
        assert_eq!(reply, "main");
    }

    #[test]
    fn tab_rotates_search_ring() {
        let mut ed = ed_with(vec![CONTROL | b'I' as u32, CONTROL | b'M' as u32]);
        ed.search.set_pat("older");
        ed.search.set_pat("newer");
        let reply = getstring(&mut ed, "search: ", Cmplt::SearchRing).unwrap();
        assert_eq!(reply, "older");
    }

    #[test]
    fn quote_inserts_raw_control() {
        let mut ed = ed_with(vec![
            CONTROL | b'Q' as u32,
            CONTROL | b'M' as u32,
            CONTROL | b'M' as u32,
        ]);
        let reply = getstring(&mut ed, "p: ", Cmplt::None).unwrap();
        assert_eq!(reply, "\r");
    }

    #[test]
    fn hidden_prompt_skips_ring() {
        let mut keys = keys_for("key");
        keys.push(CONTROL | b'M' as u32);
        let mut ed = ed_with(keys);
        let reply = getstring_hidden(&mut ed, "key: ").unwrap();
        assert_eq!(reply, "key");
        assert!(ed.replies.is_empty());
    }
}
