//! Incremental search: the pattern grows and shrinks under the
//! user's fingers, the match chasing along via the ordinary scanners.

use core_input::get1key;
use core_state::{CONTROL, CmdResult, Dir, EdError, Editor, PtPos};

use crate::scanner;

struct IsState {
    pat: String,
    dir: Dir,
    /// (pattern length, dot) snapshots for rubout.
    stack: Vec<(usize, (core_state::LineId, usize))>,
}

fn show(ed: &mut Editor, st: &IsState, found: bool) {
    let dir = match st.dir {
        Dir::Forward => "I-search",
        Dir::Reverse => "I-search backward",
    };
    let miss = if found { "" } else { "Failing " };
    ed.mlforce(format!("{miss}{dir}: {}", st.pat));
}

fn research(ed: &mut Editor, st: &IsState, anchor: (core_state::LineId, usize)) -> bool {
    ed.set_dot(anchor.0, anchor.1);
    if st.pat.is_empty() {
        return true;
    }
    let saved = std::mem::take(&mut ed.search.pat);
    ed.search.pat = st.pat.clone();
    let ptpos = match st.dir {
        Dir::Forward => PtPos::End,
        Dir::Reverse => PtPos::Beg,
    };
    let hit = scanner(ed, st.dir, ptpos).unwrap_or(false);
    if !hit {
        ed.search.pat = saved;
        ed.set_dot(anchor.0, anchor.1);
    }
    hit
}

fn isearch(ed: &mut Editor, dir: Dir) -> CmdResult {
    let origin = ed.dot();
    let mut anchor = origin;
    let mut st = IsState {
        pat: String::new(),
        dir,
        stack: Vec::new(),
    };
    let mut found = true;
    loop {
        show(ed, &st, found);
        let c = get1key(ed)?;
        if c == ed.abortc {
            ed.set_dot(origin.0, origin.1);
            ed.mlforce("[Aborted]");
            return Err(EdError::Abort);
        }
        match c {
            _ if c == CONTROL | b'M' as u32 || c == CONTROL | b'[' as u32 => {
                // Accept: the pattern becomes the search pattern.
                if !st.pat.is_empty() {
                    ed.search.set_pat(&st.pat);
                    ed.search.can_hunt = match dir {
                        Dir::Forward => 1,
                        Dir::Reverse => -1,
                    };
                }
                ed.mlerase();
                return Ok(());
            }
            _ if c == CONTROL | b'S' as u32 => {
                // Next match forward from here.
                st.dir = Dir::Forward;
                st.stack.push((st.pat.len(), anchor));
                anchor = ed.dot();
                found = research(ed, &st, anchor);
            }
            _ if c == CONTROL | b'R' as u32 => {
                st.dir = Dir::Reverse;
                st.stack.push((st.pat.len(), anchor));
                anchor = ed.dot();
                found = research(ed, &st, anchor);
            }
            _ if c == CONTROL | b'H' as u32 || c == 0x7f => {
                match st.stack.pop() {
                    Some((plen, prev_anchor)) => {
                        st.pat.truncate(plen);
                        anchor = prev_anchor;
                    }
                    None => {
                        st.pat.pop();
                    }
                }
                found = research(ed, &st, anchor);
            }
            _ if c & (CONTROL | core_state::META | core_state::SPEC | core_state::CTLX) != 0 => {
                ed.term.beep();
            }
            _ => {
                if let Some(ch) = char::from_u32(c) {
                    st.stack.push((st.pat.len(), anchor));
                    st.pat.push(ch);
                    found = research(ed, &st, anchor);
                } else {
                    ed.term.beep();
                }
            }
        }
    }
}

/// incremental-search (forward).
pub fn fisearch(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    isearch(ed, Dir::Forward)
}

/// reverse-incremental-search.
pub fn risearch(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    isearch(ed, Dir::Reverse)
}
