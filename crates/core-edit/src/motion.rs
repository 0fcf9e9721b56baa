//! Cursor motion. All motions are grapheme wise; line moves keep a
//! goal column measured in display cells.

use core_state::{CmdFlags, CmdResult, Editor, WFlags, failed};
use core_text::utf8::{next_offset, prev_offset};
use core_text::width::{col_to_offset, display_col};

/// Move dot back `n` graphemes, crossing line boundaries. Moves as
/// far as possible and fails if it fell short.
pub fn back_grapheme(ed: &mut Editor, n: usize) -> CmdResult {
    let header = ed.header();
    let (mut lp, mut off) = ed.dot();
    for _ in 0..n {
        if off == 0 {
            let prev = ed.lback(lp);
            if prev == header {
                ed.set_dot(lp, off);
                ed.cur_win_mut().flags |= WFlags::MOVE;
                return failed("");
            }
            lp = prev;
            off = ed.llen(lp);
        } else {
            off = prev_offset(ed.lbytes(lp), off, true).unwrap_or(0);
        }
    }
    ed.set_dot(lp, off);
    ed.cur_win_mut().flags |= WFlags::MOVE;
    Ok(())
}

/// Move dot forward `n` graphemes.
pub fn forw_grapheme(ed: &mut Editor, n: usize) -> CmdResult {
    let header = ed.header();
    let (mut lp, mut off) = ed.dot();
    for _ in 0..n {
        let len = ed.llen(lp);
        if off >= len {
            if lp == header {
                ed.set_dot(lp, off);
                ed.cur_win_mut().flags |= WFlags::MOVE;
                return failed("");
            }
            lp = ed.lforw(lp);
            off = 0;
        } else {
            let bytes = ed.lbytes(lp);
            off = next_offset(bytes, off, len, true);
        }
    }
    ed.set_dot(lp, off);
    ed.cur_win_mut().flags |= WFlags::MOVE;
    Ok(())
}

// ---- commands ----

pub fn backchar(ed: &mut Editor, _f: bool, n: i32) -> CmdResult {
    if n < 0 {
        return forwchar(ed, false, -n);
    }
    back_grapheme(ed, n as usize)
}

pub fn forwchar(ed: &mut Editor, _f: bool, n: i32) -> CmdResult {
    if n < 0 {
        return backchar(ed, false, -n);
    }
    forw_grapheme(ed, n as usize)
}

pub fn gotobol(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    let (lp, _) = ed.dot();
    ed.set_dot(lp, 0);
    Ok(())
}

pub fn gotoeol(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    let (lp, _) = ed.dot();
    let len = ed.llen(lp);
    ed.set_dot(lp, len);
    Ok(())
}

pub fn gotobob(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    let first = ed.lines.forward(ed.header());
    ed.set_dot(first, 0);
    ed.cur_win_mut().flags |= WFlags::HARD;
    Ok(())
}

pub fn gotoeob(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    let header = ed.header();
    ed.set_dot(header, 0);
    ed.cur_win_mut().flags |= WFlags::HARD;
    Ok(())
}

fn update_goal(ed: &mut Editor) {
    if !ed.lastflag.contains(CmdFlags::CPCN) {
        let (lp, off) = ed.dot();
        ed.curgoal = display_col(ed.lbytes(lp), off, ed.tabstop);
    }
    ed.thisflag |= CmdFlags::CPCN;
}

pub fn forwline(ed: &mut Editor, _f: bool, n: i32) -> CmdResult {
    if n < 0 {
        return backline(ed, false, -n);
    }
    update_goal(ed);
    let header = ed.header();
    let (mut lp, _) = ed.dot();
    for _ in 0..n {
        if lp == header {
            ed.set_dot(lp, 0);
            return failed("");
        }
        lp = ed.lforw(lp);
    }
    let off = if lp == header {
        0
    } else {
        col_to_offset(ed.lbytes(lp), ed.curgoal, ed.tabstop)
    };
    ed.set_dot(lp, off);
    ed.cur_win_mut().flags |= WFlags::MOVE;
    Ok(())
}

pub fn backline(ed: &mut Editor, _f: bool, n: i32) -> CmdResult {
    if n < 0 {
        return forwline(ed, false, -n);
    }
    update_goal(ed);
    let header = ed.header();
    let (mut lp, _) = ed.dot();
    for _ in 0..n {
        let prev = ed.lback(lp);
        if prev == header {
            return failed("");
        }
        lp = prev;
    }
    let off = col_to_offset(ed.lbytes(lp), ed.curgoal, ed.tabstop);
    ed.set_dot(lp, off);
    ed.cur_win_mut().flags |= WFlags::MOVE;
    Ok(())
}

/// goto-line: positive counts from the top, negative from the bottom.
pub fn gotoline(ed: &mut Editor, f: bool, n: i32) -> CmdResult {
    let n = if f {
        n
    } else {
        let reply = core_exec::nextarg(ed, "Line to GOTO: ", core_complete::Cmplt::None)?;
        core_exec::atoi(&reply)
    };
    if n == 0 {
        return failed("Bad line number");
    }
    if n > 0 {
        gotobob(ed, false, 1)?;
        forwline(ed, false, n - 1)
    } else {
        gotoeob(ed, false, 1)?;
        backline(ed, false, -n)
    }
}

/// Scroll forward one page (window height less the overlap rows).
pub fn forwpage(ed: &mut Editor, f: bool, n: i32) -> CmdResult {
    let rows = ed.cur_win().ntrows;
    let step = if f {
        n
    } else {
        (rows as i32 - 2).max(1)
    };
    let status = forwline(ed, false, step);
    ed.cur_win_mut().flags |= WFlags::HARD;
    status
}

pub fn backpage(ed: &mut Editor, f: bool, n: i32) -> CmdResult {
    let rows = ed.cur_win().ntrows;
    let step = if f {
        n
    } else {
        (rows as i32 - 2).max(1)
    };
    let status = backline(ed, false, step);
    ed.cur_win_mut().flags |= WFlags::HARD;
    status
}

/// Set the mark at dot.
pub fn setmark(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    let dot = ed.dot();
    ed.set_mark(Some(dot));
    ed.mlwrite("[Mark set]");
    Ok(())
}

/// Exchange dot and mark.
pub fn swapmark(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    let Some(mark) = ed.mark() else {
        return failed("No mark in this window");
    };
    let dot = ed.dot();
    ed.set_dot(mark.0, mark.1);
    ed.set_mark(Some(dot));
    ed.cur_win_mut().flags |= WFlags::MOVE;
    Ok(())
}
