//! Buffer scanning support: a byte-stream view of the line ring with
//! position mapping, and grapheme reads that treat line ends as `\n`.

use std::collections::HashMap;

use core_state::{Editor, Grapheme, LineId};
use core_text::grapheme::build_grapheme;
use core_text::utf8::NOCHAR;

/// A position inside a buffer during scanning.
pub type Pos = (LineId, usize);

/// Byte-stream snapshot of a buffer: all line bytes joined by `\n`
/// (no trailing newline), with maps between stream indices and
/// (line, offset) positions.
pub struct StreamMap {
    pub bytes: Vec<u8>,
    /// (line, stream index of its first byte), in buffer order.
    lines: Vec<(LineId, usize)>,
    start_of: HashMap<LineId, usize>,
}

impl StreamMap {
    pub fn build(ed: &Editor) -> StreamMap {
        let header = ed.header();
        let mut bytes = Vec::new();
        let mut lines = Vec::new();
        let mut start_of = HashMap::new();
        for lp in ed.lines.ring_iter(header) {
            if !bytes.is_empty() {
                bytes.push(b'\n');
            }
            lines.push((lp, bytes.len()));
            start_of.insert(lp, bytes.len());
            bytes.extend_from_slice(ed.lbytes(lp));
        }
        // The sentinel maps to one-past-the-end.
        lines.push((header, bytes.len() + 1));
        start_of.insert(header, bytes.len() + 1);
        StreamMap {
            bytes,
            lines,
            start_of,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Stream index of a buffer position. The sentinel clamps to just
    /// past the end.
    pub fn index_of(&self, pos: Pos) -> usize {
        match self.start_of.get(&pos.0) {
            Some(&start) => (start + pos.1).min(self.bytes.len()),
            None => self.bytes.len(),
        }
    }

    /// Buffer position of a stream index; an index on a joining `\n`
    /// maps to the end of the line before it.
    pub fn pos_of(&self, ix: usize) -> Pos {
        // Find the last line starting at or before ix.
        let mut lo = 0usize;
        let mut hi = self.lines.len();
        while lo + 1 < hi {
            let mid = (lo + hi) / 2;
            if self.lines[mid].1 <= ix {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        let (lp, start) = self.lines[lo];
        (lp, ix - start)
    }
}

/// Read the grapheme at `pos`, treating the end of each line as a
/// one-byte `\n` and the end of the buffer as `NOCHAR`. Returns the
/// grapheme, the byte span consumed, and the following position.
pub fn grapheme_at(ed: &Editor, pos: Pos) -> (Grapheme, usize, Pos) {
    let header = ed.header();
    let (lp, off) = pos;
    if lp == header {
        return (Grapheme::from_cp(NOCHAR), 0, pos);
    }
    let len = ed.llen(lp);
    if off >= len {
        let next = ed.lforw(lp);
        let npos = if next == header { (header, 0) } else { (next, 0) };
        return (Grapheme::from_cp(b'\n' as u32), 1, npos);
    }
    let bytes = ed.lbytes(lp);
    let (g, end) = build_grapheme(bytes, off, len, true);
    (g, end - off, (lp, end))
}

/// Step one grapheme backwards from `pos`.
pub fn prev_pos(ed: &Editor, pos: Pos) -> Option<Pos> {
    let header = ed.header();
    let (lp, off) = pos;
    if off == 0 {
        let prev = if lp == header {
            ed.lines.back(header)
        } else {
            ed.lback(lp)
        };
        if prev == header {
            return None;
        }
        return Some((prev, ed.llen(prev)));
    }
    let bytes = ed.lbytes(lp);
    core_text::utf8::prev_offset(bytes, off, true).map(|p| (lp, p))
}
