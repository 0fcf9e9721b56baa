//! The step scanner: NFA-with-backtracking matching of compiled
//! Magic patterns, with group capture and alternation.
//!
//! Matching always runs forward; a reverse search walks candidate
//! start positions backwards. The group control table records, per
//! group, the recursion level at which it opened and closed so that
//! backtracking invalidates exactly the groups it must.

use tracing::trace;

use core_state::{Dir, Editor, Modes};
use core_text::case::{cp_eq, equiv_eq};
use core_text::utf8::NOCHAR;

use crate::pattern::{MagicPat, Node, XProbe};
use crate::scan::{Pos, StreamMap, grapheme_at, prev_pos};

/// Per-group matching state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpState {
    Idle,
    Open,
    Pending,
    Valid,
}

#[derive(Debug, Clone)]
struct GpCtl {
    state: GpState,
    start_level: i32,
    pending_level: i32,
    /// Node index of the next untried alternative's Choice (0 = none).
    next_choice: usize,
}

/// Per-group match record for one search attempt.
#[derive(Debug, Clone, Copy)]
pub struct MatchGroup {
    pub start: Option<Pos>,
    /// Length in bytes.
    pub len: usize,
    /// Bytes matched before the group opened; the backtrack anchor.
    base: usize,
}

pub struct StepScanner<'a> {
    ed: &'a Editor,
    pat: &'a MagicPat,
    exact: bool,
    equiv: bool,
    ctl: Vec<GpCtl>,
    pub groups: Vec<MatchGroup>,
    level: i32,
}

impl<'a> StepScanner<'a> {
    pub fn new(ed: &'a Editor, pat: &'a MagicPat) -> Self {
        let mode = ed.curb().mode;
        let ngroups = pat.groups.len();
        StepScanner {
            ed,
            pat,
            exact: mode.contains(Modes::EXACT),
            equiv: mode.contains(Modes::MAGEQV),
            ctl: vec![
                GpCtl {
                    state: GpState::Idle,
                    start_level: 0,
                    pending_level: 0,
                    next_choice: 0,
                };
                ngroups
            ],
            groups: vec![
                MatchGroup {
                    start: None,
                    len: 0,
                    base: 0,
                };
                ngroups
            ],
            level: 0,
        }
    }

    fn reset(&mut self) {
        for c in &mut self.ctl {
            c.state = GpState::Idle;
            c.start_level = 0;
            c.pending_level = 0;
            c.next_choice = 0;
        }
        for g in &mut self.groups {
            g.start = None;
            g.len = 0;
            g.base = 0;
        }
        self.level = 0;
    }

    /// Groups that captured in the final successful attempt.
    pub fn group_is_valid(&self, g: usize) -> bool {
        self.ctl
            .get(g)
            .is_some_and(|c| matches!(c.state, GpState::Valid))
    }

    /// Does the single (non-positional) element match the grapheme?
    fn gph_eq(&self, g: &core_state::Grapheme, node: &Node) -> bool {
        match node {
            Node::Lit(b) => {
                g.is_plain()
                    && g.uc <= 0x7f
                    && cp_eq(
                        g.uc,
                        *b as u32,
                        self.exact || !(*b as char).is_ascii_alphabetic(),
                    )
            }
            Node::Any => g.uc != b'\n' as u32 && g.uc != NOCHAR,
            Node::AnyGph => g.uc != NOCHAR,
            Node::UcLit(uc) => {
                if g.cdm != 0 {
                    return false;
                }
                if self.equiv {
                    equiv_eq(g, &core_state::Grapheme::from_cp(*uc))
                } else {
                    cp_eq(g.uc, *uc, self.exact)
                }
            }
            Node::UcGraph(pg) => {
                if self.equiv {
                    equiv_eq(g, pg)
                } else {
                    g == pg
                }
            }
            Node::Prop(p) => g.uc != NOCHAR && p.probe(g.uc),
            Node::Kind { kind, negate } => g.uc != NOCHAR && (kind.probe(g.uc) != *negate),
            Node::Ccl(ccl) => {
                if g.uc == NOCHAR {
                    return false;
                }
                let mut res = false;
                if g.is_plain() && g.uc < 0x80 {
                    res = ccl.test_ascii(g.uc as u8);
                    if !res && !self.exact && (g.uc as u8 as char).is_ascii_alphabetic() {
                        res = ccl.test_ascii((g.uc as u8) ^ 0x20);
                    }
                }
                if !res {
                    for probe in &ccl.ext {
                        let hit = match probe {
                            XProbe::Range(lo, hi) => g.is_plain() && g.uc >= *lo && g.uc <= *hi,
                            XProbe::UcLit(uc) => {
                                if self.equiv {
                                    equiv_eq(g, &core_state::Grapheme::from_cp(*uc))
                                } else {
                                    g.is_plain() && cp_eq(g.uc, *uc, self.exact)
                                }
                            }
                            XProbe::UcGraph(pg) => {
                                if self.equiv {
                                    equiv_eq(g, pg)
                                } else {
                                    g == pg
                                }
                            }
                            XProbe::Prop(p) => p.probe(g.uc),
                            XProbe::Kind { kind, negate } => kind.probe(g.uc) != *negate,
                        };
                        if hit {
                            res = true;
                            break;
                        }
                    }
                }
                res != ccl.negate
            }
            Node::Bol
            | Node::Eol
            | Node::Backref(_)
            | Node::Start(_)
            | Node::End(_)
            | Node::Choice(_) => false,
        }
    }

    /// Match the text captured by group `g` again at `pos` (a
    /// backreference). Returns the bytes consumed.
    fn match_backref(&self, g: usize, pos: &mut Pos) -> Option<usize> {
        let start = self.groups.get(g)?.start?;
        let len = self.groups[g].len;
        let mut gp = start;
        let mut remaining = len;
        let mut cur = *pos;
        let mut used_total = 0usize;
        while remaining > 0 {
            let (gg, gused, gnext) = grapheme_at(self.ed, gp);
            let (cg, cused, cnext) = grapheme_at(self.ed, cur);
            if gg.uc == NOCHAR || cg.uc == NOCHAR {
                return None;
            }
            let eq = if self.equiv {
                equiv_eq(&gg, &cg)
            } else if gg == cg {
                true
            } else {
                !self.exact
                    && gg.is_plain()
                    && cg.is_plain()
                    && cp_eq(gg.uc, cg.uc, false)
            };
            if !eq {
                return None;
            }
            gp = gnext;
            cur = cnext;
            used_total += cused;
            remaining = remaining.saturating_sub(gused);
        }
        *pos = cur;
        Some(used_total)
    }

    /// Match one occurrence of the element at `pos`; `Some(bytes)` on
    /// success with the position advanced.
    fn check_next(&self, pos: &mut Pos, node: &Node) -> Option<usize> {
        let (g, used, next) = grapheme_at(self.ed, *pos);
        if g.uc == NOCHAR {
            return None;
        }
        if self.gph_eq(&g, node) {
            *pos = next;
            Some(used)
        } else {
            None
        }
    }

    /// Anchored match of the pattern tail starting at node `mi`.
    /// Returns bytes matched from here to the pattern end, or None.
    /// `pre_match` carries the byte count already matched by the
    /// enclosing calls (it anchors minimal repeats).
    fn amatch(&mut self, start_mi: usize, pos: &mut Pos, pre_match: usize) -> Option<usize> {
        let mut mi = start_mi;
        let mut cur = *pos;
        let mut ambytes = 0usize;
        self.level += 1;

        'try_choice: loop {
            loop {
                let entry = &self.pat.nodes[mi];
                match &entry.node {
                    Node::Choice(g) => {
                        // Reaching a Choice running forward means the
                        // current alternative matched through: skip to
                        // the group end.
                        mi = self.pat.groups[*g].gpend;
                        continue;
                    }
                    Node::Start(g) => {
                        let g = *g;
                        self.groups[g].start = Some(cur);
                        self.groups[g].len = 0;
                        self.groups[g].base = pre_match + ambytes;
                        self.ctl[g].state = GpState::Open;
                        self.ctl[g].start_level = self.level;
                        self.ctl[g].next_choice = entry.next_choice;
                        mi += 1;
                        continue;
                    }
                    Node::End(g) => {
                        let g = *g;
                        self.groups[g].len = pre_match + ambytes - self.groups[g].base;
                        self.ctl[g].state = GpState::Pending;
                        self.ctl[g].pending_level = self.level;
                        if g == 0 {
                            *pos = cur;
                            self.finish_level();
                            self.level -= 1;
                            return Some(ambytes);
                        }
                        mi += 1;
                        continue;
                    }
                    Node::Bol => {
                        if cur.1 == 0 {
                            mi += 1;
                            continue;
                        }
                        break;
                    }
                    Node::Eol => {
                        if cur.1 == self.ed.llen(cur.0) {
                            mi += 1;
                            continue;
                        }
                        break;
                    }
                    Node::Backref(g) => match self.match_backref(*g, &mut cur) {
                        Some(nb) => {
                            ambytes += nb;
                            mi += 1;
                            continue;
                        }
                        None => break,
                    },
                    _ => {}
                }

                if let Some(rep) = entry.rep {
                    let node = entry.node.clone();
                    let mut hi = rep.high;
                    if hi == 0 {
                        mi += 1;
                        continue;
                    }
                    let lo = rep.low;
                    let mut nmatch = 0u32;
                    let mut used_here = 0usize;
                    while nmatch < lo {
                        match self.check_next(&mut cur, &node) {
                            Some(nb) => {
                                used_here += nb;
                                nmatch += 1;
                            }
                            None => break,
                        }
                    }
                    if nmatch < lo {
                        break; // cannot satisfy the minimum
                    }
                    // An unanchored minimal repeat at the very start
                    // takes the shortest match; the outer scan will
                    // advance the start instead.
                    if pre_match == 0 && ambytes == 0 && rep.minimal {
                        hi = lo;
                    }
                    if rep.minimal {
                        loop {
                            let mut tail = cur;
                            if let Some(sub) =
                                self.amatch(mi + 1, &mut tail, pre_match + ambytes + used_here)
                            {
                                *pos = tail;
                                ambytes += used_here + sub;
                                self.finish_level();
                                self.level -= 1;
                                return Some(ambytes);
                            }
                            if nmatch >= hi {
                                break;
                            }
                            match self.check_next(&mut cur, &node) {
                                Some(nb) => {
                                    used_here += nb;
                                    nmatch += 1;
                                }
                                None => break,
                            }
                        }
                        break;
                    }
                    // Greedy: eat as many as possible, then give back
                    // one at a time while retrying the tail.
                    let mut stack: Vec<(Pos, usize)> = vec![(cur, used_here)];
                    while nmatch < hi {
                        match self.check_next(&mut cur, &node) {
                            Some(nb) => {
                                used_here += nb;
                                nmatch += 1;
                                stack.push((cur, used_here));
                            }
                            None => break,
                        }
                    }
                    while let Some(&(at, used)) = stack.last() {
                        let mut tail = at;
                        if let Some(sub) =
                            self.amatch(mi + 1, &mut tail, pre_match + ambytes + used)
                        {
                            *pos = tail;
                            ambytes += used + sub;
                            self.finish_level();
                            self.level -= 1;
                            return Some(ambytes);
                        }
                        stack.pop();
                    }
                    break;
                }

                // Plain single-occurrence element.
                match self.check_next(&mut cur, &entry.node) {
                    Some(nb) => {
                        ambytes += nb;
                        mi += 1;
                    }
                    None => break,
                }
            }

            // Failure: retry the next alternative of the innermost
            // group opened at this level that still has one, rewound
            // to the group's start. Groups opened later are
            // invalidated wholesale.
            let mut nc: Option<usize> = None;
            for g in (0..self.ctl.len()).rev() {
                if self.ctl[g].next_choice != 0
                    && self.ctl[g].start_level == self.level
                    && self.groups[g].start.is_some()
                {
                    nc = Some(g);
                    break;
                }
            }
            let Some(g) = nc else {
                self.level -= 1;
                return None;
            };
            for gg in (g + 1)..self.ctl.len() {
                if self.ctl[gg].start_level >= self.level {
                    self.ctl[gg].state = GpState::Idle;
                }
            }
            let choice_ix = self.ctl[g].next_choice;
            self.ctl[g].next_choice = self.pat.nodes[choice_ix].next_choice;
            self.ctl[g].state = GpState::Open;
            mi = choice_ix + 1; // first node of the alternative
            cur = self.groups[g].start.expect("group has a start");
            ambytes = self.groups[g].base.saturating_sub(pre_match);
            continue 'try_choice;
        }
    }

    /// On success, groups Pending at this level become Valid; groups
    /// still Open at this level fall back to Idle.
    fn finish_level(&mut self) {
        for g in 0..self.ctl.len() {
            if self.ctl[g].state == GpState::Pending && self.ctl[g].pending_level == self.level {
                self.ctl[g].state = GpState::Valid;
            } else if self.ctl[g].state == GpState::Open && self.ctl[g].start_level == self.level {
                self.ctl[g].state = GpState::Idle;
            }
        }
    }

    fn try_at(&mut self, start: Pos) -> Option<(Pos, usize)> {
        self.reset();
        let mut pos = start;
        let len = self.amatch(0, &mut pos, 0)?;
        Some((pos, len))
    }

    /// Scan for the pattern from `from`. Forward scans walk candidate
    /// positions towards the end; reverse scans walk backwards but
    /// always match forwards. `barrier` bounds reverse candidates:
    /// the match must not extend past it (overlap policy).
    pub fn scan(&mut self, from: Pos, dir: Dir, barrier: Option<Pos>) -> Option<(Pos, Pos, usize)> {
        match dir {
            Dir::Forward => {
                let header = self.ed.header();
                let mut start = from;
                loop {
                    if let Some((end, len)) = self.try_at(start) {
                        trace!(len, "step scanner matched");
                        return Some((start, end, len));
                    }
                    if start.0 == header {
                        return None;
                    }
                    let (_, _, next) = grapheme_at(self.ed, start);
                    if next == start {
                        return None;
                    }
                    start = next;
                }
            }
            Dir::Reverse => {
                let sm = StreamMap::build(self.ed);
                let barrier_ix = barrier.map(|b| sm.index_of(b));
                let mut start = prev_pos(self.ed, from)?;
                loop {
                    if let Some((end, len)) = self.try_at(start) {
                        let ok = match barrier_ix {
                            Some(bix) => sm.index_of(end) <= bix,
                            None => true,
                        };
                        if ok {
                            return Some((start, end, len));
                        }
                    }
                    start = prev_pos(self.ed, start)?;
                }
            }
        }
    }
}
