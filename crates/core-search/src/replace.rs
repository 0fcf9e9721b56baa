//! The replacement engine: replace-string and query-replace-string,
//! with variable, group, counter and function-call substitution, and
//! a one-step undo inside query replace.

use tracing::debug;

use core_state::{CmdResult, Dir, EdError, Editor, PtPos, failed};
use core_edit::delete::ldelete;
use core_edit::insert::linstr;
use core_input::get1key;

use crate::pattern::{FcSeg, ReplNode, ReplPat, format_counter, rmcstr};
use crate::readpattern;
use crate::scan::{Pos, StreamMap};

/// Runtime state of one replace run.
struct ReplRun {
    rpat: ReplPat,
    counters: Vec<i64>,
    count: usize,
    /// (position, matched text, replacement length) of the last
    /// replacement for the query-replace undo.
    last: Option<(Pos, Vec<u8>, usize)>,
}

impl ReplRun {
    fn new(rpat: ReplPat) -> Self {
        let counters = rpat.counters.iter().map(|c| c.start).collect();
        ReplRun {
            rpat,
            counters,
            count: 0,
            last: None,
        }
    }

    fn counter_text(&mut self, ix: usize) -> String {
        let val = self.counters[ix];
        self.counters[ix] += self.rpat.counters[ix].incr;
        format_counter(&self.rpat.counters[ix].fmt, val)
    }

    /// Expand the replacement for the current match.
    fn expand(&mut self, ed: &mut Editor) -> CmdResult<Vec<u8>> {
        let mut out: Vec<u8> = Vec::new();
        let nodes = self.rpat.nodes.clone();
        for node in &nodes {
            match node {
                ReplNode::Lit(b) => out.push(*b),
                ReplNode::UcLit(uc) => out.extend_from_slice(&core_text::utf8::encode_vec(*uc)),
                ReplNode::UcGraph(g) => out.extend_from_slice(&g.to_bytes()),
                ReplNode::Var(name) => {
                    let tok = core_exec::token::Token {
                        text: name.clone(),
                        quoted: false,
                    };
                    let val = core_exec::eval::getval(ed, &tok)?;
                    out.extend_from_slice(val.as_bytes());
                }
                ReplNode::Group(n) => {
                    let text = ed
                        .search
                        .group_text
                        .get(*n)
                        .and_then(|g| g.clone())
                        .unwrap_or_default();
                    out.extend_from_slice(text.as_bytes());
                }
                ReplNode::Counter(ix) => {
                    let text = self.counter_text(*ix);
                    out.extend_from_slice(text.as_bytes());
                }
                ReplNode::Func(segs) => {
                    let mut call = String::new();
                    for seg in segs {
                        match seg {
                            FcSeg::Lit(s) => call.push_str(s),
                            FcSeg::Group(n) => {
                                if let Some(Some(g)) = ed.search.group_text.get(*n) {
                                    call.push_str(g);
                                }
                            }
                            FcSeg::Counter(ix) => call.push_str(&self.counter_text(*ix)),
                        }
                    }
                    let val = core_exec::eval_string(ed, &call)?;
                    out.extend_from_slice(val.as_bytes());
                }
            }
        }
        Ok(out)
    }
}

/// Delete the matched span at dot and insert the expansion.
fn delins(ed: &mut Editor, run: &mut ReplRun, match_len: usize) -> CmdResult {
    let start = ed.dot();
    let matched: Vec<u8> = {
        let sm = StreamMap::build(ed);
        let six = sm.index_of(start);
        sm.bytes[six..(six + match_len).min(sm.bytes.len())].to_vec()
    };
    let expansion = run.expand(ed)?;
    ldelete(ed, match_len as u64, false)?;
    linstr(ed, &expansion)?;
    run.last = Some((start, matched, expansion.len()));
    run.count += 1;
    Ok(())
}

/// Undo the most recent replacement (query replace `u`).
fn unreplace(ed: &mut Editor, run: &mut ReplRun) -> CmdResult {
    let Some((start, matched, repl_len)) = run.last.take() else {
        return failed("No previous replacement to undo");
    };
    ed.set_dot(start.0, start.1);
    ldelete(ed, repl_len as u64, false)?;
    linstr(ed, &matched)?;
    ed.set_dot(start.0, start.1);
    run.count -= 1;
    Ok(())
}

fn replaces(ed: &mut Editor, query: bool, _f: bool, n: i32) -> CmdResult {
    ed.check_writable()?;
    let pat = readpattern(ed, "Replace", true)?;
    if pat.is_empty() {
        return failed("Empty pattern");
    }
    let rplc = readpattern(ed, &format!("Replace [{pat}] with"), false)?;
    let rpat = rmcstr(&rplc)?;
    let mut run = ReplRun::new(rpat);
    let mut asked = query;
    let limit = if n > 0 { Some(n as usize) } else { None };

    loop {
        if limit.is_some_and(|l| run.count >= l) {
            break;
        }
        // Search forward from dot, leaving point at the start.
        let found = crate::scanner(ed, Dir::Forward, PtPos::Beg)?;
        if !found {
            break;
        }
        let match_len = ed
            .search
            .last_match
            .map(|m| m.len)
            .ok_or_else(|| EdError::msg("Bug: match info missing"))?;

        if asked {
            loop {
                ed.mlforce(format!(
                    "Replace '{}' with '{}'? (y)es (n)o (!)all (u)ndo (.)stop",
                    ed.search.match_text(),
                    rplc
                ));
                let c = get1key(ed)?;
                if c == ed.abortc {
                    ed.mlforce(format!("[{} substitutions]", run.count));
                    return Err(EdError::Abort);
                }
                match (c & 0xff) as u8 {
                    b'y' | b' ' => {
                        delins(ed, &mut run, match_len)?;
                        break;
                    }
                    b'n' => {
                        // Skip over this match.
                        core_edit::motion::forw_grapheme(ed, 1)?;
                        break;
                    }
                    b'!' => {
                        asked = false;
                        delins(ed, &mut run, match_len)?;
                        break;
                    }
                    b'u' => {
                        // Dot returns to the undone spot; re-scan
                        // from there.
                        unreplace(ed, &mut run)?;
                        break;
                    }
                    b'.' => {
                        ed.mlwrite(format!("[{} substitutions]", run.count));
                        return Ok(());
                    }
                    _ => {
                        ed.term.beep();
                        continue;
                    }
                }
            }
        } else {
            delins(ed, &mut run, match_len)?;
        }
    }
    ed.mlwrite(format!("[{} substitutions]", run.count));
    debug!(count = run.count, "replace finished");
    Ok(())
}

/// replace-string: replace every occurrence from dot forward (or the
/// first `n` with an argument).
pub fn sreplace(ed: &mut Editor, f: bool, n: i32) -> CmdResult {
    replaces(ed, false, f, if f { n } else { 0 })
}

/// query-replace-string.
pub fn qreplace(ed: &mut Editor, f: bool, n: i32) -> CmdResult {
    replaces(ed, true, f, if f { n } else { 0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_state::{CONTROL, Modes, ScriptedTerm};

    fn ed(text: &str) -> Editor {
        let mut e = Editor::new(Box::new(ScriptedTerm::new()));
        let id = e.curb_id();
        core_exec::fill_buffer(&mut e, id, text);
        let first = e.lines.forward(e.header());
        e.set_dot(first, 0);
        e.cur_win_mut().top = first;
        e
    }

    fn contents(e: &Editor) -> String {
        let header = e.header();
        let mut out = Vec::new();
        for lp in e.lines.ring_iter(header) {
            out.push(String::from_utf8_lossy(e.lbytes(lp)).into_owned());
        }
        out.join("\n")
    }

    fn run_replace(e: &mut Editor, pat: &str, rplc: &str) {
        e.exec.clexec = true;
        e.exec.execstr = Some(format!("\"{pat}\" \"{rplc}\""));
        sreplace(e, false, 0).unwrap();
    }

    #[test]
    fn plain_replace_all() {
        let mut e = ed("cat dog cat");
        run_replace(&mut e, "cat", "bird");
        assert_eq!(contents(&e), "bird dog bird");
    }

    #[test]
    fn group_reference_swaps() {
        let mut e = ed("one-two");
        e.curb_mut().mode |= Modes::MAGIC;
        run_replace(&mut e, "([a-z]+)-([a-z]+)", "${2}-${1}");
        assert_eq!(contents(&e), "two-one");
    }

    #[test]
    fn counter_with_format() {
        let mut e = ed("a 1 b 2 c 3");
        e.curb_mut().mode |= Modes::MAGIC;
        run_replace(&mut e, "[0-9]+", "${@:start=10,incr=5,fmt=%03d}");
        assert_eq!(contents(&e), "a 010 b 015 c 020");
    }

    #[test]
    fn variable_substitution() {
        let mut e = ed("marker here");
        e.set_uvar("name", "VALUE");
        run_replace(&mut e, "marker", "${%name}");
        assert_eq!(contents(&e), "VALUE here");
    }

    #[test]
    fn function_call_substitution() {
        let mut e = ed("word x");
        e.curb_mut().mode |= Modes::MAGIC;
        run_replace(&mut e, "([a-z]+) x", "${&upper ${1}}");
        assert_eq!(contents(&e), "WORD");
    }

    #[test]
    fn replacement_longer_and_multiline() {
        let mut e = ed("a|b");
        run_replace(&mut e, "|", "~n");
        assert_eq!(contents(&e), "a\nb");
    }

    #[test]
    fn query_replace_yes_no_stop() {
        let mut e = ed("x x x");
        let keys = vec![b'y' as u32, b'n' as u32, b'y' as u32];
        // Pattern and replacement come from the command line, query
        // answers from the terminal.
        let mut term = ScriptedTerm::new();
        for k in keys {
            term.push_key(k);
        }
        e.term = Box::new(term);
        e.exec.clexec = true;
        e.exec.execstr = Some("\"x\" \"Q\"".to_string());
        qreplace(&mut e, false, 0).unwrap();
        assert_eq!(contents(&e), "Q x Q");
    }

    #[test]
    fn query_replace_undo() {
        let mut e = ed("x x");
        let mut term = ScriptedTerm::new();
        for k in [b'y' as u32, b'u' as u32, b'n' as u32, b'.' as u32] {
            term.push_key(k);
        }
        e.term = Box::new(term);
        e.exec.clexec = true;
        e.exec.execstr = Some("\"x\" \"Z\"".to_string());
        // Replace the first, undo it at the second prompt, skip, stop.
        qreplace(&mut e, false, 0).unwrap();
        assert_eq!(contents(&e), "x x");
    }

    #[test]
    fn query_replace_abort_propagates() {
        let mut e = ed("x");
        let mut term = ScriptedTerm::new();
        term.push_key(CONTROL | b'G' as u32);
        e.term = Box::new(term);
        e.exec.clexec = true;
        e.exec.execstr = Some("\"x\" \"Z\"".to_string());
        assert!(qreplace(&mut e, false, 0).unwrap_err().is_abort());
    }
}
