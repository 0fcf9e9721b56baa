//! Grapheme model: a base codepoint plus its trailing zero-width
//! codepoints, treated as one cursor step.
//!
//! This is deliberately narrower than UAX-29 extended grapheme
//! clusters: the classes below are the ones a terminal editor must
//! refuse to split under the cursor.

use smallvec::SmallVec;

use crate::utf8::{Codepoint, NOCHAR, decode, next_offset};

/// Classification of zero-width codepoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZwClass {
    /// Spacing modifier letters (U+02B0..U+02FF). Only zero-width when
    /// the editor is configured to fold them; off by default.
    SpacingModifier,
    /// Combining diacritical marks, all blocks.
    CombiningDiacritic,
    /// Zero-width space/joiner/non-joiner and friends.
    Joiner,
    /// Directional marks.
    DirectionalMark,
}

// Sorted by range start; binary-search friendly but short enough that a
// linear scan with an early-out is fine.
const ZERO_WIDTH: &[(Codepoint, Codepoint, ZwClass)] = &[
    (0x02B0, 0x02FF, ZwClass::SpacingModifier),
    (0x0300, 0x036F, ZwClass::CombiningDiacritic),
    (0x1AB0, 0x1AFF, ZwClass::CombiningDiacritic),
    (0x1DC0, 0x1DFF, ZwClass::CombiningDiacritic),
    (0x200B, 0x200D, ZwClass::Joiner),
    (0x200E, 0x200F, ZwClass::DirectionalMark),
    (0x202A, 0x202E, ZwClass::DirectionalMark),
    (0x2060, 0x206F, ZwClass::Joiner),
    (0x20D0, 0x20FF, ZwClass::CombiningDiacritic),
    (0xFE20, 0xFE2F, ZwClass::CombiningDiacritic),
];

/// Zero-width classification of a codepoint, `None` for spacing
/// characters. Spacing modifier letters report `None` unless callers
/// opt in via [`zerowidth_type_spmod`].
pub fn zerowidth_type(uc: Codepoint) -> Option<ZwClass> {
    match zerowidth_type_spmod(uc) {
        Some(ZwClass::SpacingModifier) => None,
        other => other,
    }
}

/// As [`zerowidth_type`] but reporting spacing modifier letters too.
pub fn zerowidth_type_spmod(uc: Codepoint) -> Option<ZwClass> {
    for &(start, end, class) in ZERO_WIDTH {
        if uc < start {
            return None;
        }
        if uc <= end {
            return Some(class);
        }
    }
    None
}

/// A grapheme: base codepoint, optional first combining mark, and any
/// further combining marks in the extension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grapheme {
    /// Base codepoint; `NOCHAR` for an empty probe.
    pub uc: Codepoint,
    /// First trailing zero-width codepoint, 0 when absent.
    pub cdm: Codepoint,
    /// Second and subsequent trailing zero-width codepoints.
    pub ex: SmallVec<[Codepoint; 2]>,
}

impl Grapheme {
    pub fn from_cp(uc: Codepoint) -> Self {
        Grapheme {
            uc,
            cdm: 0,
            ex: SmallVec::new(),
        }
    }

    /// True when there is nothing but a base codepoint.
    pub fn is_plain(&self) -> bool {
        self.cdm == 0
    }

    /// Encode the whole grapheme as UTF-8 bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = crate::utf8::encode_vec(self.uc);
        if self.cdm != 0 {
            out.extend_from_slice(&crate::utf8::encode_vec(self.cdm));
            for &x in &self.ex {
                out.extend_from_slice(&crate::utf8::encode_vec(x));
            }
        }
        out
    }

    /// Codepoint count (base + marks).
    pub fn cp_len(&self) -> usize {
        if self.cdm == 0 {
            1
        } else {
            2 + self.ex.len()
        }
    }
}

/// Read the grapheme starting at `offset` (bounded by `end`).
/// Returns the grapheme and the offset just past it. With `want_ex`
/// false the extension list is left empty (byte accounting only);
/// `cdm` is still filled so callers can tell plain from marked.
pub fn build_grapheme(buf: &[u8], offset: usize, end: usize, want_ex: bool) -> (Grapheme, usize) {
    let (uc, used) = decode(buf, offset, end);
    if used == 0 {
        return (Grapheme::from_cp(NOCHAR), offset);
    }
    let mut g = Grapheme::from_cp(uc);
    let mut offs = offset + used;
    loop {
        let (c, n) = decode(buf, offs, end);
        if n == 0 || zerowidth_type(c).is_none() {
            break;
        }
        if g.cdm == 0 {
            g.cdm = c;
        } else if want_ex {
            g.ex.push(c);
        }
        offs += n;
    }
    (g, offs)
}

/// Grapheme count of a byte slice.
pub fn grapheme_count(buf: &[u8]) -> usize {
    let mut n = 0;
    let mut offs = 0;
    while offs < buf.len() {
        n += 1;
        offs = next_offset(buf, offs, buf.len(), true);
    }
    n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_ascii() {
        let (g, next) = build_grapheme(b"ab", 0, 2, true);
        assert_eq!(g.uc, b'a' as u32);
        assert!(g.is_plain());
        assert_eq!(next, 1);
    }

    #[test]
    fn combining_tail_collected() {
        // a + acute + ring
        let s = "a\u{0301}\u{030A}b".as_bytes();
        let (g, next) = build_grapheme(s, 0, s.len(), true);
        assert_eq!(g.uc, b'a' as u32);
        assert_eq!(g.cdm, 0x0301);
        assert_eq!(g.ex.as_slice(), &[0x030A]);
        assert_eq!(next, 5);
        assert_eq!(g.cp_len(), 3);
    }

    #[test]
    fn no_ex_alloc_still_counts_bytes() {
        let s = "a\u{0301}\u{030A}".as_bytes();
        let (g, next) = build_grapheme(s, 0, s.len(), false);
        assert_eq!(g.cdm, 0x0301);
        assert!(g.ex.is_empty());
        assert_eq!(next, s.len());
    }

    #[test]
    fn zero_width_ranges() {
        assert_eq!(zerowidth_type(0x0301), Some(ZwClass::CombiningDiacritic));
        assert_eq!(zerowidth_type(0x200D), Some(ZwClass::Joiner));
        assert_eq!(zerowidth_type(0x200E), Some(ZwClass::DirectionalMark));
        assert_eq!(zerowidth_type(b'a' as u32), None);
        // Spacing modifiers stay spacing by default.
        assert_eq!(zerowidth_type(0x02B0), None);
        assert_eq!(
            zerowidth_type_spmod(0x02B0),
            Some(ZwClass::SpacingModifier)
        );
    }

    #[test]
    fn grapheme_counting() {
        let s = "xe\u{0301}y".as_bytes();
        assert_eq!(grapheme_count(s), 3);
    }

    #[test]
    fn round_trip_bytes() {
        let s = "e\u{0301}\u{030A}".as_bytes();
        let (g, _) = build_grapheme(s, 0, s.len(), true);
        assert_eq!(g.to_bytes(), s);
    }
}
