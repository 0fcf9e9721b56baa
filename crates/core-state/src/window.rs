//! Windows: ordered viewports over buffers, top to bottom.

use core_text::LineId;

use crate::buffer::{BufId, Locs};
use crate::modes::WFlags;

#[derive(Debug)]
pub struct Window {
    pub buf: BufId,
    /// Top visible line; always a member of the buffer's ring.
    pub top: LineId,
    pub dot: (LineId, usize),
    pub mark: Option<(LineId, usize)>,
    /// First displayed column (horizontal scroll).
    pub fcol: usize,
    /// Origin-0 screen row of the window's first text row.
    pub toprow: usize,
    /// Text rows (excludes the modeline).
    pub ntrows: usize,
    /// Non-zero requests dot be framed at this row on next repaint.
    pub force: i32,
    pub flags: WFlags,
}

impl Window {
    pub fn new(buf: BufId, top: LineId, toprow: usize, ntrows: usize) -> Self {
        Window {
            buf,
            top,
            dot: (top, 0),
            mark: None,
            fcol: 0,
            toprow,
            ntrows,
            force: 0,
            flags: WFlags::MODE | WFlags::HARD,
        }
    }

    pub fn locs(&self) -> Locs {
        Locs {
            dot: self.dot,
            mark: self.mark,
            fcol: self.fcol,
        }
    }

    pub fn set_locs(&mut self, l: Locs) {
        self.dot = l.dot;
        self.mark = l.mark;
        self.fcol = l.fcol;
    }

    pub fn mark_flag(&mut self, f: WFlags) {
        self.flags |= f;
    }
}

/// Recompute window geometry after a resize: windows keep their order
/// and are re-dealt rows proportionally, with a one-row floor. The
/// last screen row is the message line, and each window keeps a
/// modeline row under its text.
pub fn relayout(wins: &mut [Window], rows: usize) {
    if wins.is_empty() || rows < 3 {
        return;
    }
    let usable = rows - 1; // message line
    let nw = wins.len();
    // Each window needs at least 2 rows (1 text + modeline).
    let nw = nw.min(usable / 2);
    let share = usable / nw;
    let mut row = 0;
    for (ix, w) in wins.iter_mut().take(nw).enumerate() {
        let mine = if ix == nw - 1 { usable - row } else { share };
        w.toprow = row;
        w.ntrows = mine - 1;
        w.flags |= WFlags::HARD | WFlags::MODE;
        row += mine;
    }
}
