//! Case mapping over raw byte spans and canonical-equivalence
//! comparison for graphemes.

use unicode_normalization::UnicodeNormalization;

use crate::grapheme::{Grapheme, zerowidth_type};
use crate::utf8::{Codepoint, decode, encode};

/// Requested case transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseWork {
    Upper,
    Lower,
    /// Uppercase the initial codepoint only; the rest pass through.
    Title,
    /// Leave as-is (used by phonetic rules that preserve typed case).
    Keep,
}

/// Result of a recase: new bytes plus the codepoint count seen.
pub struct Recased {
    pub bytes: Vec<u8>,
    pub cp_count: usize,
}

/// Recase a byte span. Zero-width codepoints are copied verbatim so
/// marks survive. Sharp-S uppercases to "SS" (the standard mapping, so
/// upper-then-lower does not round trip - callers must not assume it
/// does).
pub fn recase(want: CaseWork, input: &[u8]) -> Recased {
    let mut out = Vec::with_capacity(input.len() + 1);
    let mut cp_count = 0usize;
    let mut offset = 0usize;
    let mut first = true;
    while offset < input.len() {
        let (uc, used) = decode(input, offset, input.len());
        cp_count += 1;
        let verbatim = &input[offset..offset + used];
        offset += used;
        if zerowidth_type(uc).is_some() {
            out.extend_from_slice(verbatim);
            continue;
        }
        let Some(c) = char::from_u32(uc) else {
            out.extend_from_slice(verbatim);
            continue;
        };
        let mapped: Option<String> = match want {
            CaseWork::Upper => Some(c.to_uppercase().collect()),
            CaseWork::Lower => Some(c.to_lowercase().collect()),
            CaseWork::Title if first => Some(c.to_uppercase().collect()),
            CaseWork::Title | CaseWork::Keep => None,
        };
        first = false;
        match mapped {
            Some(s) if s != c.to_string() => out.extend_from_slice(s.as_bytes()),
            _ => out.extend_from_slice(verbatim),
        }
    }
    Recased {
        bytes: out,
        cp_count,
    }
}

/// Single-codepoint case fold helpers for the scanners.
pub fn cp_upper(uc: Codepoint) -> Codepoint {
    match char::from_u32(uc) {
        Some(c) => {
            let mut it = c.to_uppercase();
            let up = it.next().unwrap_or(c);
            // Multi-char expansions (ß) cannot be represented in one
            // codepoint; fold to the original so comparisons stay sane.
            if it.next().is_some() { uc } else { up as Codepoint }
        }
        None => uc,
    }
}

pub fn cp_lower(uc: Codepoint) -> Codepoint {
    match char::from_u32(uc) {
        Some(c) => {
            let mut it = c.to_lowercase();
            let low = it.next().unwrap_or(c);
            if it.next().is_some() { uc } else { low as Codepoint }
        }
        None => uc,
    }
}

/// Codepoint equality with optional case folding.
pub fn cp_eq(a: Codepoint, b: Codepoint, exact: bool) -> bool {
    if a == b {
        return true;
    }
    if exact {
        return false;
    }
    cp_upper(a) == cp_upper(b)
}

fn grapheme_string(g: &Grapheme) -> String {
    let mut s = String::new();
    let mut push = |cp: Codepoint| {
        let mut tmp = [0u8; 4];
        let n = encode(cp, &mut tmp);
        s.push_str(&String::from_utf8_lossy(&tmp[..n]));
    };
    push(g.uc);
    if g.cdm != 0 {
        push(g.cdm);
        for &x in &g.ex {
            push(x);
        }
    }
    s
}

/// Canonical-equivalence comparison of two graphemes: both sides are
/// run through an NFKC-style normaliser before comparing. Used when
/// Equivalence mode is on.
pub fn equiv_eq(a: &Grapheme, b: &Grapheme) -> bool {
    if a == b {
        return true;
    }
    let na: String = grapheme_string(a).nfkc().collect();
    let nb: String = grapheme_string(b).nfkc().collect();
    na == nb
}
