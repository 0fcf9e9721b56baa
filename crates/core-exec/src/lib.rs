//! The command interpreter: tokenizer, `docmd` dispatch, and the
//! `dobuf` executor for buffers of directives.

pub mod commands;
pub mod eval;
pub mod ptt;
pub mod token;

use tracing::{debug, trace};

use core_state::{
    BufFlags, BufId, BufType, CmdResult, EdError, Editor, Modes, StrBuf, WFlags, failed,
};
use core_text::LineId;

pub use eval::{gtenv, ltos, nextarg, nextarg_raw, stol, svar};
pub use token::{TokType, Token, atoi, gettyp, token};

/// Buffers of directives may nest this deep.
pub const MAX_RECURSE: u32 = 10;

/// Include depth bound for execute-file.
pub const MAX_INCLUDE: u32 = 8;

/// The directive words, matched whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Directive {
    If,
    Else,
    Endif,
    Goto,
    Return,
    Endm,
    While,
    Endwhile,
    Break,
    Force,
    Finish,
}

fn directive_of(word: &str) -> Option<Directive> {
    Some(match word {
        "if" => Directive::If,
        "else" => Directive::Else,
        "endif" => Directive::Endif,
        "goto" => Directive::Goto,
        "return" => Directive::Return,
        "endm" => Directive::Endm,
        "while" => Directive::While,
        "endwhile" => Directive::Endwhile,
        "break" => Directive::Break,
        "force" => Directive::Force,
        "finish" => Directive::Finish,
        _ => return None,
    })
}

/// Execute one command line: optional repeat count, command name,
/// arguments. `reexecute` recurses on the previous line.
pub fn docmd(ed: &mut Editor, cline: &str) -> CmdResult {
    // Scanning a false conditional branch: succeed without running.
    if ed.exec.execlevel > 0 {
        return Ok(());
    }
    let saved_execstr = ed.exec.execstr.take();
    ed.exec.execstr = Some(cline.to_string());
    let this_line = cline.to_string();

    let result = docmd_inner(ed, &this_line);

    ed.exec.execstr = saved_execstr;
    ed.exec.cmdstatus = result.is_ok();
    result
}

fn macarg(ed: &mut Editor) -> CmdResult<String> {
    let savcle = ed.exec.clexec;
    ed.exec.clexec = true;
    let out = nextarg(ed, "", core_complete::Cmplt::None);
    ed.exec.clexec = savcle;
    out
}

fn docmd_inner(ed: &mut Editor, this_line: &str) -> CmdResult {
    ed.lastflag = ed.thisflag;
    ed.thisflag = core_state::CmdFlags::empty();

    let mut f = false;
    let mut n = 1i32;
    let mut tok = macarg(ed)?;
    if tok.is_empty() {
        return Ok(());
    }

    // A first token that is not a command name is the repeat count.
    if gettyp(&tok) != TokType::Cmd {
        f = true;
        n = atoi(&tok);
        tok = macarg(ed)?;
        if tok.is_empty() {
            return Ok(());
        }
    }

    // reexecute recurses with the previous line; the previous-line
    // slot survives the recursion so chains of reexecute work.
    if tok == "reexecute" {
        let Some(prev) = ed.exec.prev_cmdline.clone() else {
            return failed("Nothing to reexecute");
        };
        ed.exec.inreex = true;
        let mut status = Ok(());
        for _ in 0..n.max(1) {
            status = docmd(ed, &prev);
            if status.is_err() {
                break;
            }
        }
        ed.exec.inreex = false;
        ed.exec.prev_cmdline = Some(prev);
        return status;
    }

    let Some(entry) = ed.names.lookup(&tok) else {
        return failed(format!("No such Function: {tok}"));
    };
    let func = entry.func;
    trace!(command = %tok, f, n, "docmd dispatch");

    let oldcle = ed.exec.clexec;
    ed.exec.clexec = true;
    let old_command = ed.exec.current_command.replace(tok.clone());
    let status = func(ed, f, n);
    ed.exec.current_command = old_command;
    ed.exec.clexec = oldcle;
    ed.exec.prev_cmdline = Some(this_line.to_string());
    status
}

struct WhileBlock {
    begin: LineId,
    end: LineId,
    is_break: bool,
}

fn line_string(ed: &Editor, lp: LineId) -> String {
    String::from_utf8_lossy(ed.lbytes(lp)).into_owned()
}

/// Pre-pass: link `!while` / `!endwhile` pairs and `!break`
/// statements. Unmatched constructs fail the buffer.
fn scan_while_blocks(ed: &Editor, bufid: BufId) -> CmdResult<Vec<WhileBlock>> {
    let header = ed.bufs.get(bufid).header;
    let mut done: Vec<WhileBlock> = Vec::new();
    let mut open: Vec<WhileBlock> = Vec::new();
    let mut lp = ed.lines.forward(header);
    while lp != header {
        let text = line_string(ed, lp);
        let t = text.trim_start();
        if t.starts_with("!wh") {
            open.push(WhileBlock {
                begin: lp,
                end: lp,
                is_break: false,
            });
        } else if t.starts_with("!br") {
            if open.is_empty() {
                return failed("!BREAK outside of any !WHILE loop");
            }
            open.push(WhileBlock {
                begin: lp,
                end: lp,
                is_break: true,
            });
        } else if t.starts_with("!endw") {
            if open.is_empty() {
                return failed(format!(
                    "!ENDWHILE with no preceding !WHILE in '{}'",
                    ed.bufs.get(bufid).name
                ));
            }
            // Pop break records and one while record, all closed here.
            loop {
                let mut blk = open.pop().expect("checked non-empty");
                let was_break = blk.is_break;
                blk.end = lp;
                done.push(blk);
                if !was_break {
                    break;
                }
                if open.is_empty() {
                    return failed("!BREAK outside of any !WHILE loop");
                }
            }
        }
        lp = ed.lines.forward(lp);
    }
    if !open.is_empty() {
        return failed(format!(
            "!WHILE with no matching !ENDWHILE in '{}'",
            ed.bufs.get(bufid).name
        ));
    }
    Ok(done)
}

/// Find the `*label` line for a `!goto`.
fn find_label(ed: &Editor, header: LineId, label: &str) -> Option<LineId> {
    let mut lp = ed.lines.forward(header);
    while lp != header {
        let text = line_string(ed, lp);
        if let Some(rest) = text.trim_start().strip_prefix('*')
            && rest.starts_with(label)
        {
            return Some(lp);
        }
        lp = ed.lines.forward(lp);
    }
    None
}

/// Append a stored line to a store-procedure buffer (exact size,
/// spliced before the header).
fn store_line(ed: &mut Editor, target: BufId, text: &str) {
    let header = ed.bufs.get(target).header;
    let lp = ed.lines.alloc(StrBuf::from_bytes(text.as_bytes()));
    ed.lines.link_before(header, lp);
}

/// Execute a buffer of command lines.
///
/// The buffer is forced into View mode for the duration (restored on
/// every exit path), its recursion depth is bounded, and a pre-pass
/// links the while blocks. `!force` makes the following command
/// succeed while `$force_status` records its true status.
pub fn dobuf(ed: &mut Editor, bufid: BufId) -> CmdResult {
    if ed.bufs.get(bufid).exec_level > MAX_RECURSE {
        return failed(format!(
            "%Maximum recursion level, {MAX_RECURSE}, exceeded!"
        ));
    }
    let orig_view = ed.bufs.get(bufid).mode.contains(Modes::VIEW);
    ed.bufs.get_mut(bufid).mode |= Modes::VIEW;
    ed.bufs.get_mut(bufid).exec_level += 1;
    let orig_pause = ed.keys.pause_index_update;
    ed.keys.pause_index_update = true;
    let orig_proc = ed.exec.cur_proc;
    if ed.bufs.get(bufid).btype == BufType::Procedure {
        ed.exec.cur_proc = Some(bufid);
    }

    let status = dobuf_body(ed, bufid);

    ed.exec.cur_proc = orig_proc;
    ed.keys.pause_index_update = orig_pause;
    let b = ed.bufs.get_mut(bufid);
    b.exec_level -= 1;
    if !orig_view {
        b.mode.remove(Modes::VIEW);
    }
    if let Err(e) = &status {
        debug!(buffer = %ed.bufs.get(bufid).name, err = %e, "buffer execution failed");
    }
    status
}

fn dobuf_body(ed: &mut Editor, bufid: BufId) -> CmdResult {
    let whlist = scan_while_blocks(ed, bufid)?;
    ed.exec.execlevel = 0;

    // First command inherits the flags from the last one.
    ed.thisflag = ed.lastflag;

    let header = ed.bufs.get(bufid).header;
    let mut return_ok = true;
    let mut lp = ed.lines.forward(header);
    'lines: while lp != header {
        let raw = line_string(ed, lp);
        let mut eline = raw.trim_start_matches([' ', '\t']);

        // Comments and blank lines cost nothing.
        if eline.is_empty() || eline.starts_with(';') {
            lp = ed.lines.forward(lp);
            continue;
        }

        if ed.exec.macbug {
            let clipped: String = eline.chars().take(80).collect();
            let shown = format!(
                "<<<{}:{}:{}>>>",
                ed.bufs.get(bufid).name,
                ed.exec.execlevel,
                clipped
            );
            ed.mlforce(shown);
            let c = core_input::get1key(ed)?;
            if c == ed.abortc {
                ed.mlforce("[Macro aborted]");
                return Err(EdError::Abort);
            }
            if c == ed.metac {
                ed.exec.macbug = false;
            }
        }

        // Identify a directive up front; !endm is serviced even while
        // storing.
        let mut dir = None;
        if let Some(rest) = eline.strip_prefix('!') {
            let word: String = rest
                .chars()
                .take_while(|c| !c.is_whitespace())
                .collect();
            dir = directive_of(&word);
            if dir.is_none() {
                return failed("%Unknown Directive");
            }
            if dir == Some(Directive::Endm) {
                if ed.exec.ptt_storing {
                    if let Some(store) = ed.exec.mstore {
                        ptt::ptt_compile(ed, store)?;
                    }
                    ed.exec.ptt_storing = false;
                }
                ed.exec.mstore = None;
                lp = ed.lines.forward(lp);
                continue;
            }
        }

        // Store mode: salt the line away verbatim.
        if let Some(target) = ed.exec.mstore {
            store_line(ed, target, eline);
            lp = ed.lines.forward(lp);
            continue;
        }

        // Labels / old-style comments.
        if eline.starts_with('*') {
            lp = ed.lines.forward(lp);
            continue;
        }

        let mut force = false;
        if let Some(d) = dir {
            // Step past the directive word.
            let after = eline[1..]
                .find([' ', '\t'])
                .map(|ix| &eline[1 + ix..])
                .unwrap_or("")
                .trim_start();
            match d {
                Directive::If => {
                    if ed.exec.execlevel == 0 {
                        ed.exec.execstr = Some(after.to_string());
                        let val = macarg(ed)?;
                        if !stol(&val) {
                            ed.exec.execlevel += 1;
                        }
                    } else {
                        ed.exec.execlevel += 1;
                    }
                    lp = ed.lines.forward(lp);
                    continue;
                }
                Directive::While => {
                    if ed.exec.execlevel == 0 {
                        ed.exec.execstr = Some(after.to_string());
                        let val = macarg(ed)?;
                        if stol(&val) {
                            lp = ed.lines.forward(lp);
                            continue;
                        }
                    }
                    // False (or skipping): jump to the endwhile.
                    let Some(blk) = whlist.iter().find(|b| b.begin == lp) else {
                        return failed("%Internal While loop error");
                    };
                    lp = ed.lines.forward(blk.end);
                    continue;
                }
                Directive::Break => {
                    if ed.exec.execlevel == 0 {
                        let Some(blk) = whlist.iter().find(|b| b.begin == lp) else {
                            return failed("%Internal While loop error");
                        };
                        lp = ed.lines.forward(blk.end);
                    } else {
                        lp = ed.lines.forward(lp);
                    }
                    continue;
                }
                Directive::Else => {
                    if ed.exec.execlevel == 1 {
                        ed.exec.execlevel = 0;
                    } else if ed.exec.execlevel == 0 {
                        ed.exec.execlevel = 1;
                    }
                    lp = ed.lines.forward(lp);
                    continue;
                }
                Directive::Endif => {
                    ed.exec.execlevel = ed.exec.execlevel.saturating_sub(1);
                    lp = ed.lines.forward(lp);
                    continue;
                }
                Directive::Goto => {
                    if ed.exec.execlevel == 0 {
                        let (label, _) = token(after);
                        match find_label(ed, header, &label.text) {
                            Some(glp) => {
                                lp = ed.lines.forward(glp);
                                continue 'lines;
                            }
                            None => return failed("%No such label"),
                        }
                    }
                    lp = ed.lines.forward(lp);
                    continue;
                }
                Directive::Return => {
                    if ed.exec.execlevel == 0 {
                        break 'lines;
                    }
                    lp = ed.lines.forward(lp);
                    continue;
                }
                Directive::Endwhile => {
                    if ed.exec.execlevel > 0 {
                        ed.exec.execlevel -= 1;
                        lp = ed.lines.forward(lp);
                        continue;
                    }
                    let Some(blk) = whlist.iter().find(|b| !b.is_break && b.end == lp) else {
                        return failed("%Internal While loop error");
                    };
                    // Back to the while line so its condition re-runs.
                    lp = blk.begin;
                    continue;
                }
                Directive::Force => {
                    force = true;
                    eline = after;
                }
                Directive::Finish => {
                    if ed.exec.execlevel == 0 {
                        return_ok = false;
                        break 'lines;
                    }
                    lp = ed.lines.forward(lp);
                    continue;
                }
                Directive::Endm => unreachable!("serviced above"),
            }
        }

        // Execute the statement.
        let status = docmd(ed, eline);
        match status {
            Err(err) if force => {
                ed.exec.force_status = if err.is_abort() { "ABORTED" } else { "FAILED" };
            }
            Ok(()) if force => ed.exec.force_status = "PASSED",
            Err(err) => {
                // Park dot on the offending line everywhere this
                // buffer shows, then unwind.
                for w in &mut ed.wins {
                    if w.buf == bufid {
                        w.dot = (lp, 0);
                        w.flags |= WFlags::HARD;
                    }
                }
                ed.bufs.get_mut(bufid).b.dot = (lp, 0);
                ed.exec.execlevel = 0;
                return Err(err);
            }
            Ok(()) => {}
        }

        lp = ed.lines.forward(lp);
    }

    ed.exec.execlevel = 0;
    if return_ok {
        Ok(())
    } else {
        Err(EdError::msg("")) // !finish: false return, no diagnostic
    }
}

/// Evaluate the first token of `text` through the variable/function
/// layer (used by replacement `${&...}` calls).
pub fn eval_string(ed: &mut Editor, text: &str) -> CmdResult<String> {
    let saved_cle = ed.exec.clexec;
    let saved_str = ed.exec.execstr.take();
    ed.exec.clexec = true;
    ed.exec.execstr = Some(text.to_string());
    let out = nextarg(ed, "", core_complete::Cmplt::None);
    ed.exec.clexec = saved_cle;
    ed.exec.execstr = saved_str;
    out
}

/// Run a named procedure buffer (`/name`).
pub fn run_proc(ed: &mut Editor, name: &str) -> CmdResult {
    let bufname = format!("/{name}");
    let Some(id) = ed.bufs.find(&bufname) else {
        return failed(format!("No such procedure {bufname}"));
    };
    dobuf(ed, id)
}

/// Run a procedure buffer if it exists; missing hooks are not errors.
pub fn run_hook(ed: &mut Editor, name: &str) -> CmdResult {
    let bufname = format!("/{name}");
    match ed.bufs.find(&bufname) {
        Some(id) => dobuf(ed, id),
        None => Ok(()),
    }
}

/// Create (or recreate, emptied) an invisible buffer for internal use.
pub fn scratch_buffer(ed: &mut Editor, name: &str, btype: BufType) -> CmdResult<BufId> {
    if let Some(id) = ed.bufs.find(name) {
        let header = ed.bufs.get(id).header;
        ed.lines.clear_ring(header);
        let b = ed.bufs.get_mut(id);
        b.btype = btype;
        b.flags |= BufFlags::INVS;
        b.flags.remove(BufFlags::CHG);
        b.b.dot = (header, 0);
        b.b.mark = None;
        return Ok(id);
    }
    let id = ed.bufs.create(
        &mut ed.lines,
        name,
        btype,
        BufFlags::INVS,
        Modes::empty(),
    )?;
    Ok(id)
}

/// Fill a buffer from text, one line per `\n`-separated segment.
pub fn fill_buffer(ed: &mut Editor, id: BufId, text: &str) {
    let header = ed.bufs.get(id).header;
    for seg in text.split('\n') {
        let seg = seg.strip_suffix('\r').unwrap_or(seg);
        let lp = ed.lines.alloc(StrBuf::from_bytes(seg.as_bytes()));
        ed.lines.link_before(header, lp);
    }
    // A trailing newline leaves a spurious empty last line.
    let last = ed.lines.back(header);
    if last != header && ed.lines.len_of(last) == 0 && text.ends_with('\n') {
        ed.lines.remove(last);
    }
    let first = ed.lines.forward(header);
    ed.bufs.get_mut(id).b.dot = (first, 0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_state::{FuncOpts, NameEntry, NameTable, ScriptedTerm};

    fn insert_version(ed: &mut Editor, _f: bool, n: i32) -> CmdResult {
        // Test command: append its repeat count to a user variable.
        let cur = ed.uvar("trace").unwrap_or("").to_string();
        ed.set_uvar("trace", &format!("{cur}{n},"));
        Ok(())
    }

    fn always_fails(_ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
        failed("boom")
    }

    fn ed() -> Editor {
        let mut e = Editor::new(Box::new(ScriptedTerm::new()));
        e.names = NameTable::build(vec![
            NameEntry {
                name: "trace-command",
                func: insert_version,
                opts: FuncOpts::empty(),
            },
            NameEntry {
                name: "failing-command",
                func: always_fails,
                opts: FuncOpts::empty(),
            },
            NameEntry {
                name: "set",
                func: commands::set,
                opts: FuncOpts::empty(),
            },
        ]);
        e
    }

    fn proc_with(ed: &mut Editor, name: &str, lines: &[&str]) -> BufId {
        let id = ed
            .bufs
            .create(
                &mut ed.lines,
                name,
                BufType::Procedure,
                BufFlags::INVS,
                Modes::empty(),
            )
            .unwrap();
        fill_buffer(ed, id, &lines.join("\n"));
        id
    }

    #[test]
    fn docmd_repeat_count() {
        let mut e = ed();
        docmd(&mut e, "3 trace-command").unwrap();
        assert_eq!(e.uvar("trace"), Some("3,"));
    }

    #[test]
    fn docmd_unknown_command() {
        let mut e = ed();
        assert!(docmd(&mut e, "no-such-thing").is_err());
        assert!(!e.exec.cmdstatus);
    }

    #[test]
    fn dobuf_if_else() {
        let mut e = ed();
        let id = proc_with(
            &mut e,
            "/cond",
            &[
                "set %x 1",
                "!if &equ %x 1",
                "  2 trace-command",
                "!else",
                "  3 trace-command",
                "!endif",
            ],
        );
        dobuf(&mut e, id).unwrap();
        assert_eq!(e.uvar("trace"), Some("2,"));
    }

    #[test]
    fn dobuf_while_loop() {
        let mut e = ed();
        let id = proc_with(
            &mut e,
            "/loop",
            &[
                "set %i 0",
                "!while &les %i 3",
                "  1 trace-command",
                "  set %i &add %i 1",
                "!endwhile",
            ],
        );
        dobuf(&mut e, id).unwrap();
        assert_eq!(e.uvar("trace"), Some("1,1,1,"));
    }

    #[test]
    fn dobuf_break_and_goto() {
        let mut e = ed();
        let id = proc_with(
            &mut e,
            "/flow",
            &[
                "set %i 0",
                "!while TRUE",
                "  set %i &add %i 1",
                "  !if &gre %i 2",
                "    !break",
                "  !endif",
                "!endwhile",
                "!goto done",
                "9 trace-command",
                "*done",
                "5 trace-command",
            ],
        );
        dobuf(&mut e, id).unwrap();
        assert_eq!(e.uvar("i"), Some("3"));
        assert_eq!(e.uvar("trace"), Some("5,"));
    }

    #[test]
    fn dobuf_force_records_status() {
        let mut e = ed();
        let id = proc_with(
            &mut e,
            "/forced",
            &["!force failing-command", "1 trace-command"],
        );
        dobuf(&mut e, id).unwrap();
        assert_eq!(e.exec.force_status, "FAILED");
        assert_eq!(e.uvar("trace"), Some("1,"));
    }

    #[test]
    fn dobuf_failure_aborts_buffer() {
        let mut e = ed();
        let id = proc_with(&mut e, "/bad", &["failing-command", "1 trace-command"]);
        assert!(dobuf(&mut e, id).is_err());
        assert_eq!(e.uvar("trace"), None);
        // View bit restored
        assert!(!e.bufs.get(id).mode.contains(Modes::VIEW));
    }

    #[test]
    fn dobuf_finish_is_false_but_quiet() {
        let mut e = ed();
        let id = proc_with(&mut e, "/fin", &["1 trace-command", "!finish", "2 trace-command"]);
        assert!(dobuf(&mut e, id).is_err());
        assert_eq!(e.uvar("trace"), Some("1,"));
    }

    #[test]
    fn dobuf_unmatched_while_fails() {
        let mut e = ed();
        let id = proc_with(&mut e, "/um", &["!while TRUE", "1 trace-command"]);
        assert!(dobuf(&mut e, id).is_err());
    }

    #[test]
    fn dobuf_recursion_bound() {
        let mut e = ed();
        let id = proc_with(&mut e, "/rec", &["execute-procedure rec"]);
        // Wire up execute-procedure for the recursion.
        e.names = NameTable::build(vec![NameEntry {
            name: "execute-procedure",
            func: commands::execproc,
            opts: FuncOpts::empty(),
        }]);
        let err = dobuf(&mut e, id).unwrap_err();
        assert!(err.to_string().contains("recursion"));
    }

    #[test]
    fn reexecute_repeats_previous_line() {
        let mut e = ed();
        docmd(&mut e, "2 trace-command").unwrap();
        docmd(&mut e, "reexecute").unwrap();
        assert_eq!(e.uvar("trace"), Some("2,2,"));
    }
}
