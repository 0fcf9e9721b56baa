//! Edit primitives: grapheme-aware motion, insertion, deletion, the
//! kill/yank machinery, regions, words, windows, and the phonetic
//! on-type rewrite.
//!
//! Every mutation keeps the position invariants: dot, mark, the
//! system mark and interpreter pins in every window are fixed up
//! whenever bytes move.

pub mod delete;
pub mod insert;
pub mod kill;
pub mod motion;
pub mod phonetic;
pub mod region;
pub mod windows;
pub mod word;

use core_state::{Editor, LineId};

pub use delete::{ldelete, ldelgrapheme};
pub use insert::{linsert_byte, linsert_uc, linstr, lnewline};
pub use kill::{yank, yank_replace};
pub use motion::{back_grapheme, forw_grapheme};

/// Shift positions on `lp` after an insertion of `n` bytes at `doto`.
/// Dot moves when at or past the point; mark and pins only when
/// strictly past it.
pub(crate) fn fixup_insert(ed: &mut Editor, lp: LineId, doto: usize, n: usize) {
    for w in &mut ed.wins {
        if w.dot.0 == lp && w.dot.1 >= doto {
            w.dot.1 += n;
        }
        if let Some(m) = &mut w.mark
            && m.0 == lp
            && m.1 > doto
        {
            m.1 += n;
        }
    }
    if let Some(sm) = &mut ed.sysmark
        && sm.0 == lp
        && sm.1 > doto
    {
        sm.1 += n;
    }
    for p in &mut ed.pins {
        if p.0 == lp && p.1 > doto {
            p.1 += n;
        }
    }
}

/// Shift positions on `lp` after deleting `chunk` bytes at `doto`,
/// clamping positions that sat inside the deleted span.
pub(crate) fn fixup_delete(ed: &mut Editor, lp: LineId, doto: usize, chunk: usize) {
    let adjust = |off: &mut usize| {
        if *off > doto {
            *off = off.saturating_sub(chunk).max(doto);
        }
    };
    for w in &mut ed.wins {
        if w.dot.0 == lp {
            adjust(&mut w.dot.1);
        }
        if let Some(m) = &mut w.mark
            && m.0 == lp
        {
            adjust(&mut m.1);
        }
    }
    if let Some(sm) = &mut ed.sysmark
        && sm.0 == lp
    {
        adjust(&mut sm.1);
    }
    for p in &mut ed.pins {
        if p.0 == lp {
            adjust(&mut p.1);
        }
    }
}

/// Move positions from `from` to `to` (line replacement / join),
/// offsetting by `delta` bytes.
pub(crate) fn fixup_moveline(ed: &mut Editor, from: LineId, to: LineId, delta: usize) {
    for w in &mut ed.wins {
        if w.dot.0 == from {
            w.dot = (to, w.dot.1 + delta);
        }
        if let Some(m) = &mut w.mark
            && m.0 == from
        {
            *m = (to, m.1 + delta);
        }
        if w.top == from {
            w.top = to;
        }
    }
    if let Some(sm) = &mut ed.sysmark
        && sm.0 == from
    {
        *sm = (to, sm.1 + delta);
    }
    for p in &mut ed.pins {
        if p.0 == from {
            *p = (to, p.1 + delta);
        }
    }
}
