//! Yank commands over the kill ring and the minibuffer reply ring.

use core_state::{CmdFlags, CmdResult, Editor, failed};

use crate::insert::linstr_opt;

fn insert_stream(ed: &mut Editor, bytes: &[u8]) -> CmdResult {
    // Newlines from killed text always produce real lines, even at
    // the end of the buffer.
    linstr_opt(ed, bytes, true)
}

/// Yank kill-ring slot 0 at dot. Under GNU yank mode a numeric
/// argument rotates the ring by that count and inserts once;
/// otherwise the argument repeats the insertion.
pub fn yank(ed: &mut Editor, f: bool, n: i32) -> CmdResult {
    if n < 0 {
        return failed("Bad repeat count");
    }
    let mut reps = if f { n } else { 1 };
    if f && ed.opts.gnu_yank {
        ed.kill.rotate(n as isize);
        reps = 1;
    }
    let bytes = ed.kill.top().to_vec();
    let mut size = 0usize;
    for _ in 0..reps {
        insert_stream(ed, &bytes)?;
        size += bytes.len();
    }
    ed.last_yank = Some(size);
    ed.thisflag |= CmdFlags::YANK;
    Ok(())
}

/// Step dot back over `n` raw bytes (newlines count one byte).
fn back_bytes(ed: &mut Editor, mut n: usize) {
    let header = ed.header();
    let (mut lp, mut off) = ed.dot();
    while n > 0 {
        if off == 0 {
            let prev = ed.lback(lp);
            if prev == header {
                break;
            }
            lp = prev;
            off = ed.llen(lp);
            n -= 1;
        } else {
            let step = off.min(n);
            off -= step;
            n -= step;
        }
    }
    ed.set_dot(lp, off);
}

/// Yank the most recent minibuffer reply (argument rotates that
/// ring).
pub fn yankmb(ed: &mut Editor, f: bool, n: i32) -> CmdResult {
    if f {
        ed.replies.rotate(n as isize);
    }
    let Some(reply) = ed.replies.get(0).map(str::to_string) else {
        return failed("Nothing to yank");
    };
    insert_stream(ed, reply.as_bytes())?;
    ed.thisflag |= CmdFlags::YANK;
    Ok(())
}

/// Replace the text of the last yank with an adjacent kill-ring slot.
/// Only valid immediately after a yank.
pub fn yank_replace(ed: &mut Editor, f: bool, n: i32) -> CmdResult {
    if !ed.lastflag.contains(CmdFlags::YANK) {
        return failed("Last command was not a yank");
    }
    let Some(size) = ed.last_yank else {
        return failed("Nothing to replace");
    };
    back_bytes(ed, size);
    crate::delete::ldelete(ed, size as u64, false)?;
    ed.kill.rotate(if f { n as isize } else { 1 });
    yank(ed, false, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delete::{kill_begin, ldelete};
    use crate::testing::{contents, editor_with};

    #[test]
    fn kill_then_yank_round_trips() {
        let mut ed = editor_with("hello\nworld");
        kill_begin(&mut ed);
        ldelete(&mut ed, 6, true).unwrap();
        assert_eq!(contents(&ed), "world");
        // Yank it back at the start.
        yank(&mut ed, false, 1).unwrap();
        assert_eq!(contents(&ed), "hello\nworld");
    }

    #[test]
    fn yank_at_end_of_buffer_appends_lines() {
        let mut ed = editor_with("one");
        kill_begin(&mut ed);
        ldelete(&mut ed, 4, true).ok(); // "one" + implicit newline, hits end
        assert_eq!(ed.kill.top().to_vec(), b"one\n");
        // Move to end and yank twice.
        crate::motion::gotoeob(&mut ed, false, 1).unwrap();
        yank(&mut ed, false, 1).unwrap();
        ed.lastflag = ed.thisflag;
        yank(&mut ed, false, 1).unwrap();
        assert_eq!(contents(&ed), "one\none\n");
    }

    #[test]
    fn gnu_yank_rotation() {
        let mut ed = editor_with("");
        ed.kill.top_mut().prepend_chunk(b"old");
        ed.kill.kdelete();
        ed.kill.top_mut().prepend_chunk(b"new");
        // Numeric argument under GNU mode rotates to the older slot.
        yank(&mut ed, true, 1).unwrap();
        assert_eq!(contents(&ed), "old");
    }

    #[test]
    fn yank_replace_swaps_slot() {
        let mut ed = editor_with("");
        ed.kill.top_mut().prepend_chunk(b"first");
        ed.kill.kdelete();
        ed.kill.top_mut().prepend_chunk(b"second");
        yank(&mut ed, false, 1).unwrap();
        assert_eq!(contents(&ed), "second");
        ed.lastflag = ed.thisflag;
        yank_replace(&mut ed, false, 1).unwrap();
        assert_eq!(contents(&ed), "first");
    }

    #[test]
    fn yank_replace_requires_recent_yank() {
        let mut ed = editor_with("x");
        assert!(yank_replace(&mut ed, false, 1).is_err());
    }

    #[test]
    fn reply_ring_yank() {
        let mut ed = editor_with("");
        ed.replies.push("typed before");
        yankmb(&mut ed, false, 1).unwrap();
        assert_eq!(contents(&ed), "typed before");
    }
}
