//! Deletion primitives and the delete commands.

use core_state::{CmdFlags, CmdResult, Editor, WFlags, failed};
use core_text::grapheme::build_grapheme;

use crate::fixup_delete;
use crate::insert::ldelnewline;

/// Start (or continue) a kill: consecutive kill commands accrete into
/// kill-ring slot 0; a fresh chain rotates the ring first.
pub(crate) fn kill_begin(ed: &mut Editor) {
    if !ed.lastflag.contains(CmdFlags::KILL) {
        ed.kill.kdelete();
    }
    ed.thisflag |= CmdFlags::KILL;
}

/// Delete up to `n` bytes forward from dot, merging lines at line
/// boundaries. With `kflag` the removed bytes go to kill-ring slot 0.
/// Fails (after deleting what it could) if the buffer ran out.
pub fn ldelete(ed: &mut Editor, n: u64, kflag: bool) -> CmdResult {
    ed.check_writable()?;
    ed.lchange(WFlags::KILLS);
    let mut n = n;
    while n > 0 {
        let (lp, doto) = ed.dot();
        if lp == ed.header() {
            return failed("");
        }
        let len = ed.llen(lp);
        let chunk = ((len - doto) as u64).min(n) as usize;
        if chunk == 0 {
            // At line end: the next byte is the implicit newline.
            if kflag {
                ed.kill.top_mut().push_byte(b'\n');
            }
            ldelnewline(ed)?;
            n -= 1;
            continue;
        }
        if kflag {
            let bytes = ed.lines.text(lp).bytes()[doto..doto + chunk].to_vec();
            for b in bytes {
                ed.kill.top_mut().push_byte(b);
            }
        }
        ed.lines.text_mut(lp).delete_at(doto, chunk);
        fixup_delete(ed, lp, doto, chunk);
        n -= chunk as u64;
    }
    Ok(())
}

/// Delete `n` graphemes forward (each grapheme's full byte span, or
/// the newline when at line end).
pub fn ldelgrapheme(ed: &mut Editor, n: u64, kflag: bool) -> CmdResult {
    for _ in 0..n {
        let (lp, doto) = ed.dot();
        if lp == ed.header() {
            return failed("");
        }
        let bytes = ed.lbytes(lp);
        let (_, next) = build_grapheme(bytes, doto, bytes.len(), false);
        let span = next.saturating_sub(doto);
        ldelete(ed, span.max(1) as u64, kflag)?;
    }
    Ok(())
}

// ---- commands ----

/// Delete forward; with an argument the bytes are killed.
pub fn forwdel(ed: &mut Editor, f: bool, n: i32) -> CmdResult {
    if n < 0 {
        return backdel(ed, f, -n);
    }
    if f {
        kill_begin(ed);
    }
    ldelgrapheme(ed, n as u64, f)
}

/// Delete backward (rubout); with an argument the bytes are killed.
pub fn backdel(ed: &mut Editor, f: bool, n: i32) -> CmdResult {
    if n < 0 {
        return forwdel(ed, f, -n);
    }
    if f {
        kill_begin(ed);
    }
    for _ in 0..n {
        crate::motion::back_grapheme(ed, 1)?;
        ldelgrapheme(ed, 1, f)?;
    }
    Ok(())
}

/// kill-line: from dot to end of line, or the newline when already at
/// the end; with an argument, that many whole lines forward.
pub fn killtext(ed: &mut Editor, f: bool, n: i32) -> CmdResult {
    kill_begin(ed);
    let (lp, doto) = ed.dot();
    if !f {
        let len = ed.llen(lp);
        let span = if doto == len { 1 } else { (len - doto) as u64 };
        return ldelete(ed, span, true);
    }
    if n < 0 {
        return failed("Bad repeat count");
    }
    // Count bytes over n whole lines from dot.
    let mut bytes = (ed.llen(lp) - doto) as u64 + 1;
    let mut cur = ed.lforw(lp);
    for _ in 1..n {
        if cur == ed.header() {
            break;
        }
        bytes += ed.llen(cur) as u64 + 1;
        cur = ed.lforw(cur);
    }
    if n == 0 {
        bytes = doto as u64;
        crate::motion::gotobol(ed, false, 1)?;
    }
    ldelete(ed, bytes, true)
}

/// delete-blank-lines around dot.
pub fn deblank(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    let header = ed.header();
    let (mut lp, _) = ed.dot();
    if lp == header {
        return failed("");
    }
    // Walk up to the first blank line of the run.
    while ed.llen(lp) == 0 && ed.lback(lp) != header && ed.llen(ed.lback(lp)) == 0 {
        lp = ed.lback(lp);
    }
    if ed.llen(lp) != 0 {
        // Not on a blank line: nothing to do unless the next run is.
        return Ok(());
    }
    let mut count = 0u64;
    let mut cur = lp;
    while cur != header && ed.llen(cur) == 0 {
        count += 1;
        cur = ed.lforw(cur);
    }
    if count <= 1 {
        return Ok(());
    }
    ed.set_dot(lp, 0);
    // Leave one blank line.
    ldelete(ed, count - 1, false)
}
