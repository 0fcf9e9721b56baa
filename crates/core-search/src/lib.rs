//! Search engine: scanner selection, the search/hunt commands,
//! incremental search and the replacement engine.
//!
//! Two scanners share the compiled pattern: a Boyer-Moore-style fast
//! scanner for literal ASCII patterns and the backtracking step
//! scanner for everything Magic, non-ASCII case folding, or grapheme
//! equivalence.

pub mod fast;
pub mod pattern;
pub mod replace;
pub mod scan;
pub mod step;

mod isearch;

use tracing::debug;

use core_complete::Cmplt;
use core_state::{CmdResult, Dir, Editor, MatchLoc, Modes, PtPos, WFlags, failed};
use core_text::grapheme::build_grapheme;

pub use isearch::{fisearch, risearch};
pub use replace::{qreplace, sreplace};

use pattern::{MagicNode, MagicPat, Node, has_magic_meta, has_non_ascii, mcstr};
use scan::{Pos, StreamMap, grapheme_at};
use step::StepScanner;

/// Wrap a literal string as a compiled pattern (used when the step
/// scanner must run over a non-Magic pattern for case folding).
fn literal_pat(pat: &str) -> MagicPat {
    let bytes = pat.as_bytes();
    let mut nodes = vec![MagicNode {
        node: Node::Start(0),
        rep: None,
        next_choice: 0,
    }];
    let mut ix = 0;
    while ix < bytes.len() {
        let (g, next) = build_grapheme(bytes, ix, bytes.len(), true);
        ix = next;
        let node = if g.uc <= 0x7f && g.is_plain() {
            Node::Lit(g.uc as u8)
        } else if g.is_plain() {
            Node::UcLit(g.uc)
        } else {
            Node::UcGraph(g)
        };
        nodes.push(MagicNode {
            node,
            rep: None,
            next_choice: 0,
        });
    }
    let gpend = nodes.len();
    nodes.push(MagicNode {
        node: Node::End(0),
        rep: None,
        next_choice: 0,
    });
    MagicPat {
        nodes,
        groups: vec![pattern::GroupInfo {
            parent: 0,
            gpend,
            first_choice: 0,
        }],
    }
}

/// Bytes of the buffer span starting at `pos`, `len` bytes long
/// (newlines between lines count one byte).
pub fn span_text(ed: &Editor, pos: Pos, len: usize) -> String {
    let mut out = Vec::with_capacity(len);
    let (mut lp, mut off) = pos;
    let header = ed.header();
    while out.len() < len && lp != header {
        let line = ed.lbytes(lp);
        while off < line.len() && out.len() < len {
            out.push(line[off]);
            off += 1;
        }
        if out.len() < len {
            out.push(b'\n');
            lp = ed.lforw(lp);
            off = 0;
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn should_step(ed: &Editor, pat: &str) -> bool {
    let mode = ed.curb().mode;
    (mode.contains(Modes::MAGIC) && has_magic_meta(pat))
        || (!mode.contains(Modes::EXACT) && has_non_ascii(pat))
        || mode.contains(Modes::MAGEQV)
}

/// One scan for the current pattern from dot. On success dot moves to
/// the start or end of the match per `ptpos`, the match info and
/// group texts are recorded, and true comes back.
pub fn scanner(ed: &mut Editor, dir: Dir, ptpos: PtPos) -> CmdResult<bool> {
    scanner_with_barrier(ed, dir, ptpos, None, None)
}

fn scanner_with_barrier(
    ed: &mut Editor,
    dir: Dir,
    ptpos: PtPos,
    from_override: Option<Pos>,
    barrier: Option<Pos>,
) -> CmdResult<bool> {
    let pat = ed.search.pat.clone();
    if pat.is_empty() {
        return failed("No pattern set");
    }
    let from = from_override.unwrap_or(ed.dot());
    let magic = ed.curb().mode.contains(Modes::MAGIC) && has_magic_meta(&pat);

    let found = if should_step(ed, &pat) {
        let compiled = if magic { mcstr(&pat)? } else { literal_pat(&pat) };
        let mut sc = StepScanner::new(ed, &compiled);
        let hit = sc.scan(from, dir, barrier);
        match hit {
            None => None,
            Some((start, end, len)) => {
                // Collect group texts before mutating anything.
                let mut groups: Vec<Option<String>> = Vec::new();
                for g in 0..sc.groups.len() {
                    if g == 0 || sc.group_is_valid(g) {
                        let gi = sc.groups[g];
                        groups.push(
                            gi.start.map(|s| span_text(ed, s, gi.len)),
                        );
                    } else {
                        groups.push(None);
                    }
                }
                Some((start, end, len, groups))
            }
        }
    } else {
        let sm = StreamMap::build(ed);
        let from_ix = sm.index_of(from);
        let fold = !ed.curb().mode.contains(Modes::EXACT);
        let limit = barrier.map(|b| sm.index_of(b));
        fast::scan(&sm.bytes, pat.as_bytes(), fold, dir, from_ix, limit).map(|(s, e)| {
            let start = sm.pos_of(s);
            let end = sm.pos_of(e);
            let text = String::from_utf8_lossy(&sm.bytes[s..e]).into_owned();
            (start, end, e - s, vec![Some(text)])
        })
    };

    let Some((start, end, len, groups)) = found else {
        return Ok(false);
    };
    let id = ed.curb_id();
    ed.search.group_text = groups;
    ed.search.note_match(
        id,
        MatchLoc {
            line: start.0,
            off: start.1,
            len,
        },
    );
    let target = match ptpos {
        PtPos::Beg => start,
        PtPos::End => end,
    };
    ed.set_dot(target.0, target.1);
    ed.cur_win_mut().flags |= WFlags::MOVE;
    if magic && ed.curb().mode.contains(Modes::RPTMG) {
        let shown = ed.search.match_text().to_string();
        ed.mlwrite(format!("[Matched: {shown}]"));
    }
    debug!(len, "search matched");
    Ok(true)
}

/// Prompt for (or take as argument) a search or replacement pattern.
/// An empty interactive reply reuses the previous one.
pub fn readpattern(ed: &mut Editor, prompt: &str, is_search: bool) -> CmdResult<String> {
    let reply = if ed.exec.clexec {
        core_exec::nextarg(ed, "", Cmplt::None)?
    } else {
        core_input::getstring(ed, &format!("{prompt} [{}]: ", ed.search.pat), Cmplt::SearchRing)?
    };
    let text = if reply.is_empty() {
        if is_search {
            ed.search.pat.clone()
        } else {
            reply
        }
    } else {
        reply
    };
    if is_search {
        if text.is_empty() {
            return failed("No pattern set");
        }
        ed.search.set_pat(&text);
    } else {
        ed.search.set_rplc(&text);
    }
    Ok(text)
}

// ---- commands ----

/// search-forward: prompt and scan, point after the match.
pub fn forwsearch(ed: &mut Editor, f: bool, n: i32) -> CmdResult {
    if n < 0 {
        return backsearch(ed, f, -n);
    }
    readpattern(ed, "Search", true)?;
    for _ in 0..n.max(1) {
        if !scanner(ed, Dir::Forward, PtPos::End)? {
            ed.search.can_hunt = 0;
            return failed("Not found");
        }
    }
    ed.search.can_hunt = 1;
    Ok(())
}

/// search-reverse: point lands at the start of the match.
pub fn backsearch(ed: &mut Editor, f: bool, n: i32) -> CmdResult {
    if n < 0 {
        return forwsearch(ed, f, -n);
    }
    readpattern(ed, "Reverse search", true)?;
    for _ in 0..n.max(1) {
        if !scanner(ed, Dir::Reverse, PtPos::Beg)? {
            ed.search.can_hunt = 0;
            return failed("Not found");
        }
    }
    ed.search.can_hunt = -1;
    Ok(())
}

/// hunt-forward: repeat the last search without prompting. Under the
/// overlap option the scan restarts one grapheme past the previous
/// match start so overlapping matches surface.
pub fn forwhunt(ed: &mut Editor, _f: bool, n: i32) -> CmdResult {
    if ed.search.pat.is_empty() {
        return failed("No pattern set");
    }
    for _ in 0..n.max(1) {
        let mut from = None;
        if ed.search.overlap
            && ed.search.can_hunt == 1
            && ed.search.match_buf == Some(ed.curb_id())
            && let Some(m) = ed.search.last_match
        {
            let (_, _, next) = grapheme_at(ed, (m.line, m.off));
            from = Some(next);
        }
        if !scanner_with_barrier(ed, Dir::Forward, PtPos::End, from, None)? {
            ed.search.can_hunt = 0;
            return failed("Not found");
        }
    }
    ed.search.can_hunt = 1;
    Ok(())
}

/// hunt-backward. With overlap off an artificial barrier at the
/// previous match start keeps successive matches disjoint; with it
/// on, matches may share up to length-1 bytes.
pub fn backhunt(ed: &mut Editor, _f: bool, n: i32) -> CmdResult {
    if ed.search.pat.is_empty() {
        return failed("No pattern set");
    }
    for _ in 0..n.max(1) {
        let barrier = if ed.search.overlap {
            None
        } else {
            Some(ed.dot())
        };
        if !scanner_with_barrier(ed, Dir::Reverse, PtPos::Beg, None, barrier)? {
            ed.search.can_hunt = 0;
            return failed("Not found");
        }
    }
    ed.search.can_hunt = -1;
    Ok(())
}
