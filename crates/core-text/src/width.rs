//! Display-column measurement over raw line bytes.
//!
//! Columns are terminal cells: tabs expand to the next stop,
//! other control bytes render as `^X` (two cells), zero-width
//! codepoints take no cell, and everything else asks `unicode-width`.

use unicode_width::UnicodeWidthChar;

use crate::grapheme::zerowidth_type;
use crate::utf8::decode;

/// Cell width of one codepoint at column `col`.
pub fn cp_width(uc: u32, col: usize, tabstop: usize) -> usize {
    if uc == b'\t' as u32 {
        let ts = tabstop.max(1);
        return ts - (col % ts);
    }
    if uc < 0x20 || uc == 0x7f {
        return 2; // rendered as ^X
    }
    if zerowidth_type(uc).is_some() {
        return 0;
    }
    match char::from_u32(uc) {
        Some(c) => UnicodeWidthChar::width(c).unwrap_or(1),
        None => 1,
    }
}

/// Column of byte offset `upto` within `line`.
pub fn display_col(line: &[u8], upto: usize, tabstop: usize) -> usize {
    let end = upto.min(line.len());
    let mut col = 0usize;
    let mut offs = 0usize;
    while offs < end {
        let (uc, used) = decode(line, offs, line.len());
        col += cp_width(uc, col, tabstop);
        offs += used;
    }
    col
}

/// Byte offset whose display column is the last one not beyond `goal`.
pub fn col_to_offset(line: &[u8], goal: usize, tabstop: usize) -> usize {
    let mut col = 0usize;
    let mut offs = 0usize;
    while offs < line.len() {
        let next = crate::utf8::next_offset(line, offs, line.len(), true);
        let mut ncol = col;
        let mut o = offs;
        while o < next {
            let (uc, used) = decode(line, o, line.len());
            ncol += cp_width(uc, ncol, tabstop);
            o += used;
        }
        if ncol > goal {
            return offs;
        }
        col = ncol;
        offs = next;
    }
    offs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_columns() {
        assert_eq!(display_col(b"abcd", 3, 8), 3);
    }

    #[test]
    fn tabs_expand() {
        assert_eq!(display_col(b"a\tb", 2, 8), 8);
        assert_eq!(display_col(b"a\tb", 3, 8), 9);
    }

    #[test]
    fn control_bytes_are_two_cells() {
        assert_eq!(display_col(&[0x01, b'x'], 1, 8), 2);
    }

    #[test]
    fn wide_and_zero_width() {
        let s = "漢e\u{0301}".as_bytes();
        assert_eq!(display_col(s, s.len(), 8), 3); // 2 + 1 + 0
    }

    #[test]
    fn goal_column_lookup() {
        let s = "a漢b".as_bytes();
        assert_eq!(col_to_offset(s, 0, 8), 0);
        // goal 2 lands inside the wide char: stay at its start
        assert_eq!(col_to_offset(s, 2, 8), 1);
        assert_eq!(col_to_offset(s, 3, 8), 4);
    }
}
