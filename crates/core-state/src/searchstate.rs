//! Search/replace state: current patterns, the two ten-slot rings,
//! last-match bookkeeping and the repeat-search gate.

use std::collections::VecDeque;

use core_text::LineId;

use crate::buffer::BufId;
use crate::killring::RING_SIZE;

/// Direction of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dir {
    Forward,
    Reverse,
}

/// Where point lands relative to the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PtPos {
    Beg,
    End,
}

/// Tri-state gate for repeat searches: -1 back-valid, 0 invalid,
/// +1 forward-valid.
pub type CanHunt = i8;

/// Location and length of the last match (group 0).
#[derive(Debug, Clone, Copy)]
pub struct MatchLoc {
    pub line: LineId,
    pub off: usize,
    pub len: usize,
}

#[derive(Debug, Default)]
pub struct SearchState {
    /// Current search pattern text.
    pub pat: String,
    /// Current replacement text.
    pub rplc: String,
    srch_ring: VecDeque<String>,
    repl_ring: VecDeque<String>,
    /// Whether successive matches may overlap the previous one.
    pub overlap: bool,
    pub can_hunt: CanHunt,
    /// Last match, group 0. Only meaningful while `match_buf` is the
    /// buffer it was found in and that buffer is unmodified since.
    pub last_match: Option<MatchLoc>,
    pub match_buf: Option<BufId>,
    /// Per-group matched text from the most recent magic search
    /// (index 0 is the whole match).
    pub group_text: Vec<Option<String>>,
}

impl SearchState {
    pub fn new() -> Self {
        SearchState {
            srch_ring: VecDeque::with_capacity(RING_SIZE),
            repl_ring: VecDeque::with_capacity(RING_SIZE),
            ..SearchState::default()
        }
    }

    /// Remember the buffer the group texts refer to; a mutation of
    /// that buffer invalidates them.
    pub fn note_match(&mut self, buf: BufId, loc: MatchLoc) {
        self.match_buf = Some(buf);
        self.last_match = Some(loc);
    }

    pub fn invalidate_match(&mut self) {
        self.match_buf = None;
        self.last_match = None;
        self.group_text.clear();
        self.can_hunt = 0;
    }

    /// Group-0 text of the last match, the `$match` variable.
    pub fn match_text(&self) -> &str {
        self.group_text
            .first()
            .and_then(|g| g.as_deref())
            .unwrap_or("")
    }

    fn push_ring(ring: &mut VecDeque<String>, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(pos) = ring.iter().position(|s| s == text) {
            ring.remove(pos);
        }
        ring.push_front(text.to_string());
        ring.truncate(RING_SIZE);
    }

    /// Install a new search pattern (also pushed onto the ring).
    pub fn set_pat(&mut self, text: &str) {
        Self::push_ring(&mut self.srch_ring, text);
        self.pat = text.to_string();
    }

    pub fn set_rplc(&mut self, text: &str) {
        Self::push_ring(&mut self.repl_ring, text);
        self.rplc = text.to_string();
    }

    /// Rotate the search ring by `n` and install the new head as the
    /// current pattern. Returns the new head for prompt display.
    pub fn rotate_srch(&mut self, n: isize) -> Option<&str> {
        if self.srch_ring.is_empty() {
            return None;
        }
        let len = self.srch_ring.len() as isize;
        self.srch_ring.rotate_left(n.rem_euclid(len) as usize);
        self.pat = self.srch_ring[0].clone();
        Some(&self.srch_ring[0])
    }

    pub fn rotate_repl(&mut self, n: isize) -> Option<&str> {
        if self.repl_ring.is_empty() {
            return None;
        }
        let len = self.repl_ring.len() as isize;
        self.repl_ring.rotate_left(n.rem_euclid(len) as usize);
        self.rplc = self.repl_ring[0].clone();
        Some(&self.repl_ring[0])
    }

    pub fn srch_ring(&self) -> impl Iterator<Item = &str> {
        self.srch_ring.iter().map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_dedupes_and_caps() {
        let mut st = SearchState::new();
        for i in 0..12 {
            st.set_pat(&format!("p{i}"));
        }
        st.set_pat("p5");
        assert_eq!(st.pat, "p5");
        assert_eq!(st.srch_ring().count(), RING_SIZE);
        assert_eq!(st.srch_ring().next(), Some("p5"));
    }

    #[test]
    fn rotation_installs_head() {
        let mut st = SearchState::new();
        st.set_pat("one");
        st.set_pat("two");
        assert_eq!(st.rotate_srch(1), Some("one"));
        assert_eq!(st.pat, "one");
        assert_eq!(st.rotate_srch(-1), Some("two"));
    }

    #[test]
    fn invalidation_clears_gate() {
        let mut st = SearchState::new();
        st.can_hunt = 1;
        st.group_text = vec![Some("abc".into())];
        st.invalidate_match();
        assert_eq!(st.can_hunt, 0);
        assert_eq!(st.match_text(), "");
    }
}
