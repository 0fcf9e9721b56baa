//! The fast scanner: Boyer-Moore-style literal search over the byte
//! stream, selected for pure-ASCII literal patterns. Case folding is
//! handled by doubling the jump-table entries for both cases.

use core_state::Dir;
use core_text::grapheme::zerowidth_type;
use core_text::utf8::decode;

/// Jump tables built from a pattern and its reversal.
pub struct Deltas {
    pub forward: [usize; 256],
    pub backward: [usize; 256],
    patlen: usize,
    fold: bool,
}

fn fold(b: u8, fold_case: bool) -> u8 {
    if fold_case { b.to_ascii_lowercase() } else { b }
}

impl Deltas {
    pub fn build(pat: &[u8], fold_case: bool) -> Deltas {
        let n = pat.len();
        let mut forward = [n; 256];
        let mut backward = [n; 256];
        for (i, &b) in pat.iter().enumerate() {
            let shift = n - 1 - i;
            forward[fold(b, fold_case) as usize] = shift;
            if fold_case && b.is_ascii_alphabetic() {
                forward[(fold(b, fold_case) ^ 0x20) as usize] = shift;
            }
        }
        for (i, &b) in pat.iter().rev().enumerate() {
            let shift = n - 1 - i;
            backward[fold(b, fold_case) as usize] = shift;
            if fold_case && b.is_ascii_alphabetic() {
                backward[(fold(b, fold_case) ^ 0x20) as usize] = shift;
            }
        }
        Deltas {
            forward,
            backward,
            patlen: n,
            fold: fold_case,
        }
    }

    fn byte_eq(&self, a: u8, b: u8) -> bool {
        fold(a, self.fold) == fold(b, self.fold)
    }

    fn verify(&self, hay: &[u8], at: usize, pat: &[u8]) -> bool {
        hay[at..at + pat.len()]
            .iter()
            .zip(pat)
            .all(|(h, p)| self.byte_eq(*h, *p))
    }
}

/// A byte-level match is only reported when it is grapheme aligned:
/// the codepoint just past the match must not be a combining mark
/// (otherwise the match would split a grapheme).
fn grapheme_aligned(hay: &[u8], end: usize) -> bool {
    if end >= hay.len() {
        return true;
    }
    let (uc, used) = decode(hay, end, hay.len());
    used == 0 || zerowidth_type(uc).is_none()
}

/// Scan `hay` for `pat`. Forward: first match starting at or after
/// `from`. Reverse: rightmost match starting before `from`, whose end
/// must not exceed `limit` when given (overlap barrier).
pub fn scan(
    hay: &[u8],
    pat: &[u8],
    fold_case: bool,
    dir: Dir,
    from: usize,
    limit: Option<usize>,
) -> Option<(usize, usize)> {
    if pat.is_empty() || pat.len() > hay.len() {
        return None;
    }
    let d = Deltas::build(pat, fold_case);
    let n = d.patlen;
    match dir {
        Dir::Forward => {
            // Window end walks forward using the last-character jump.
            let mut end = from + n;
            while end <= hay.len() {
                let c = hay[end - 1];
                let jump = d.forward[fold(c, fold_case) as usize];
                if jump == 0 {
                    let start = end - n;
                    if d.verify(hay, start, pat) && grapheme_aligned(hay, end) {
                        return Some((start, end));
                    }
                    end += 1;
                } else {
                    end += jump;
                }
            }
            None
        }
        Dir::Reverse => {
            let max_end = limit.unwrap_or(hay.len()).min(hay.len());
            if from == 0 || max_end < n {
                return None;
            }
            // Window start walks backward over the reversed pattern.
            let mut start = (from - 1).min(max_end - n);
            loop {
                let c = hay[start];
                let jump = d.backward[fold(c, fold_case) as usize];
                if jump == 0
                    && start + n <= max_end
                    && d.verify(hay, start, pat)
                    && grapheme_aligned(hay, start + n)
                {
                    return Some((start, start + n));
                }
                let step = jump.max(1);
                if start < step {
                    return None;
                }
                start -= step;
            }
        }
    }
}
