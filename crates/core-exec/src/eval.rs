//! Variable and function evaluation: `$env`, `%user`, `.buffer`
//! variables, `&functions`, and `@"prompt"` interactive arguments.

use tracing::trace;

use core_complete::Cmplt;
use core_input::getstring;
use core_state::{CmdResult, Editor, Modes, failed};
use core_text::width::display_col;

use crate::token::{Token, atoi, token};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PROGNAME: &str = "ferrite";

/// String truth: "TRUE" or any non-zero number.
pub fn stol(s: &str) -> bool {
    s == "TRUE" || atoi(s) != 0
}

pub fn ltos(b: bool) -> &'static str {
    if b { "TRUE" } else { "FALSE" }
}

/// Fetch the next argument: interactively when run from the keyboard,
/// else the next token of the current command line, evaluated.
pub fn nextarg(ed: &mut Editor, prompt: &str, ctx: Cmplt) -> CmdResult<String> {
    if !ed.exec.clexec {
        return getstring(ed, prompt, ctx);
    }
    let src = ed.exec.execstr.take().unwrap_or_default();
    let (tok, rest) = token(&src);
    ed.exec.execstr = Some(rest.to_string());
    getval(ed, &tok)
}

/// As [`nextarg`] but returning the raw token (no evaluation); used
/// where names must not be expanded (labels, variable names).
pub fn nextarg_raw(ed: &mut Editor, prompt: &str, ctx: Cmplt) -> CmdResult<String> {
    if !ed.exec.clexec {
        return getstring(ed, prompt, ctx);
    }
    let src = ed.exec.execstr.take().unwrap_or_default();
    let (tok, rest) = token(&src);
    ed.exec.execstr = Some(rest.to_string());
    Ok(tok.text)
}

/// Evaluate one token to its value.
pub fn getval(ed: &mut Editor, tok: &Token) -> CmdResult<String> {
    if tok.quoted {
        return Ok(tok.text.clone());
    }
    let t = tok.text.as_str();
    match t.as_bytes().first() {
        None => Ok(String::new()),
        Some(b'@') => {
            let reply = getstring(ed, &format!("{} ", &t[1..]), Cmplt::None)?;
            Ok(reply)
        }
        Some(b'$') => gtenv(ed, &t[1..]),
        Some(b'%') => Ok(ed.uvar(&t[1..]).unwrap_or_default().to_string()),
        Some(b'.') => {
            let val = ed
                .exec
                .cur_proc
                .map(|id| ed.bufs.get(id).bvar(&t[1..]).unwrap_or_default().to_string());
            Ok(val.unwrap_or_default())
        }
        Some(b'&') => gtfun(ed, &t[1..]),
        _ => Ok(t.to_string()),
    }
}

fn arg(ed: &mut Editor) -> CmdResult<String> {
    nextarg(ed, "", Cmplt::None)
}

fn argi(ed: &mut Editor) -> CmdResult<i64> {
    Ok(atoi(&arg(ed)?) as i64)
}

/// Evaluate an `&function`. Only the first three letters of the name
/// are significant.
fn gtfun(ed: &mut Editor, name: &str) -> CmdResult<String> {
    let key: String = name.chars().take(3).flat_map(char::to_lowercase).collect();
    let out = match key.as_str() {
        "add" => (argi(ed)? + argi(ed)?).to_string(),
        "sub" => (argi(ed)? - argi(ed)?).to_string(),
        "tim" => (argi(ed)? * argi(ed)?).to_string(),
        "div" => {
            let a = argi(ed)?;
            let b = argi(ed)?;
            if b == 0 {
                return failed("Division by zero");
            }
            (a / b).to_string()
        }
        "mod" => {
            let a = argi(ed)?;
            let b = argi(ed)?;
            if b == 0 {
                return failed("Division by zero");
            }
            (a % b).to_string()
        }
        "neg" => (-argi(ed)?).to_string(),
        "abs" => argi(ed)?.abs().to_string(),
        "cat" => {
            let a = arg(ed)?;
            let b = arg(ed)?;
            format!("{a}{b}")
        }
        "len" => arg(ed)?.chars().count().to_string(),
        "upp" => arg(ed)?.to_uppercase(),
        "low" => arg(ed)?.to_lowercase(),
        "tri" => arg(ed)?.trim().to_string(),
        "asc" => arg(ed)?
            .chars()
            .next()
            .map(|c| c as u32)
            .unwrap_or(0)
            .to_string(),
        "chr" => char::from_u32(argi(ed)? as u32)
            .map(String::from)
            .unwrap_or_default(),
        "lef" => {
            let s = arg(ed)?;
            let n = argi(ed)?.max(0) as usize;
            s.chars().take(n).collect()
        }
        "rig" => {
            let s = arg(ed)?;
            let n = argi(ed)?.max(0) as usize;
            let total = s.chars().count();
            s.chars().skip(total.saturating_sub(n)).collect()
        }
        "mid" => {
            let s = arg(ed)?;
            let pos = (argi(ed)?.max(1) as usize).saturating_sub(1);
            let n = argi(ed)?.max(0) as usize;
            s.chars().skip(pos).take(n).collect()
        }
        "equ" => ltos(argi(ed)? == argi(ed)?).to_string(),
        "les" => ltos(argi(ed)? < argi(ed)?).to_string(),
        "gre" => ltos(argi(ed)? > argi(ed)?).to_string(),
        "seq" => ltos(arg(ed)? == arg(ed)?).to_string(),
        "sle" => ltos(arg(ed)? < arg(ed)?).to_string(),
        "sgr" => ltos(arg(ed)? > arg(ed)?).to_string(),
        "not" => ltos(!stol(&arg(ed)?)).to_string(),
        "and" => {
            let a = stol(&arg(ed)?);
            let b = stol(&arg(ed)?);
            ltos(a && b).to_string()
        }
        "or " | "or" => {
            let a = stol(&arg(ed)?);
            let b = stol(&arg(ed)?);
            ltos(a || b).to_string()
        }
        "rnd" => {
            let n = argi(ed)?.max(1);
            // Linear congruential step on $seed; deterministic and
            // settable, which the command files rely on.
            ed.seed = ed.seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            ((ed.seed >> 16) as i64 % n + 1).to_string()
        }
        "ind" => {
            let v = arg(ed)?;
            let (t, _) = token(&v);
            getval(ed, &t)?
        }
        _ => return failed(format!("Unknown function &{name}")),
    };
    trace!(func = %key, value = %out, "function evaluated");
    Ok(out)
}

/// Line number of dot (origin 1).
fn dot_line_number(ed: &Editor) -> usize {
    let header = ed.header();
    let (dotp, _) = ed.dot();
    let mut n = 0;
    let mut lp = ed.lines.forward(header);
    loop {
        n += 1;
        if lp == dotp || lp == header {
            break;
        }
        lp = ed.lines.forward(lp);
    }
    n
}

/// Environment variable fetch.
pub fn gtenv(ed: &mut Editor, name: &str) -> CmdResult<String> {
    let v = match name {
        "acount" => ed.acount.to_string(),
        "asave" => ed.asave.to_string(),
        "binary_threshold" => ed.binary_threshold.to_string(),
        "cbufname" => ed.curb().name.clone(),
        "cfname" => ed.curb().fname.clone(),
        "cmode" => ed.curb().mode.bits().to_string(),
        "crypt_mode" => ed.crypt.mode.bits().to_string(),
        "curcol" => {
            let (lp, off) = ed.dot();
            display_col(ed.lbytes(lp), off, ed.tabstop).to_string()
        }
        "curline" => dot_line_number(ed).to_string(),
        "curwidth" => ed.term.size().1.to_string(),
        "cwline" => {
            let w = ed.cur_win();
            let mut lp = w.top;
            let mut row = 1;
            while lp != w.dot.0 && lp != ed.bufs.get(w.buf).header && row <= w.ntrows {
                lp = ed.lines.forward(lp);
                row += 1;
            }
            row.to_string()
        }
        "debug" => ltos(ed.exec.macbug).to_string(),
        "discmd" => ltos(ed.discmd).to_string(),
        "disinp" => ltos(ed.disinp).to_string(),
        "fillcol" => ed.fillcol.to_string(),
        "force_status" => ed.exec.force_status.to_string(),
        "gmode" => ed.gmode.bits().to_string(),
        "kill" => String::from_utf8_lossy(&ed.kill.top().to_vec()).into_owned(),
        "line" => {
            let (lp, _) = ed.dot();
            String::from_utf8_lossy(ed.lbytes(lp)).into_owned()
        }
        "lwidth" => ed.llen(ed.dot().0).to_string(),
        "match" => ed.search.match_text().to_string(),
        "overlap" => ltos(ed.search.overlap).to_string(),
        "pagelen" => ed.term.size().0.to_string(),
        "progname" => PROGNAME.to_string(),
        "ptt_mode" => match ed.ptt {
            Some(id) => ed
                .bufs
                .get(id)
                .ptt
                .as_ref()
                .map(|t| t.display_code.clone())
                .unwrap_or_default(),
            None => String::new(),
        },
        "replace" => ed.search.rplc.clone(),
        "rval" => ed.rval.to_string(),
        "search" => ed.search.pat.clone(),
        "seed" => ed.seed.to_string(),
        "srch_can_hunt" => ed.search.can_hunt.to_string(),
        "status" => ltos(ed.exec.cmdstatus).to_string(),
        "tab" => ed.tabstop.to_string(),
        "version" => VERSION.to_string(),
        "yankmode" => if ed.opts.gnu_yank { "gnu" } else { "old" }.to_string(),
        _ => return failed(format!("No such variable: ${name}")),
    };
    Ok(v)
}

/// Store into a variable. Environment variables each have their own
/// parse; read-only ones refuse.
pub fn svar(ed: &mut Editor, name: &str, value: &str) -> CmdResult {
    match name.as_bytes().first() {
        Some(b'%') => {
            ed.set_uvar(&name[1..], value);
            Ok(())
        }
        Some(b'.') => match ed.exec.cur_proc {
            Some(id) => {
                ed.bufs.get_mut(id).set_bvar(&name[1..], value);
                Ok(())
            }
            None => failed("Not in a procedure buffer"),
        },
        Some(b'$') => stenv(ed, &name[1..], value),
        _ => failed(format!("Not a settable variable: {name}")),
    }
}

fn stenv(ed: &mut Editor, name: &str, value: &str) -> CmdResult {
    let n = atoi(value);
    match name {
        "acount" => ed.acount = n,
        "asave" => ed.asave = n,
        "binary_threshold" => ed.binary_threshold = n.clamp(0, 100) as u32,
        "curcol" => {
            let (lp, _) = ed.dot();
            let off = core_text::width::col_to_offset(ed.lbytes(lp), n.max(0) as usize, ed.tabstop);
            ed.set_dot(lp, off);
        }
        "crypt_mode" => ed.crypt.mode = core_state::CryptMode::from_bits_truncate(n as u8),
        "debug" => ed.exec.macbug = stol(value),
        "discmd" => ed.discmd = stol(value),
        "disinp" => ed.disinp = stol(value),
        "fillcol" => ed.fillcol = n.max(0) as usize,
        "gmode" => ed.gmode = Modes::from_bits_truncate(n as u16),
        "cmode" => {
            let m = Modes::from_bits_truncate(n as u16);
            ed.curb_mut().mode = m;
            ed.cur_win_mut().flags |= core_state::WFlags::MODE;
        }
        "overlap" => ed.search.overlap = stol(value),
        "replace" => ed.search.set_rplc(value),
        "rval" => ed.rval = n,
        "search" => {
            ed.search.set_pat(value);
            ed.search.can_hunt = 0;
        }
        "seed" => ed.seed = n as u32,
        "tab" => ed.tabstop = n.clamp(1, 32) as usize,
        "yankmode" => ed.opts.gnu_yank = value == "gnu",
        _ => return failed(format!("Not settable: ${name}")),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_state::ScriptedTerm;

    fn ed() -> Editor {
        let mut e = Editor::new(Box::new(ScriptedTerm::new()));
        e.exec.clexec = true;
        e
    }

    fn eval_line(ed: &mut Editor, line: &str) -> String {
        ed.exec.execstr = Some(line.to_string());
        arg(ed).unwrap()
    }

    #[test]
    fn arithmetic_functions() {
        let mut e = ed();
        assert_eq!(eval_line(&mut e, "&add 2 3"), "5");
        assert_eq!(eval_line(&mut e, "&sub 2 3"), "-1");
        assert_eq!(eval_line(&mut e, "&tim 4 5"), "20");
        assert_eq!(eval_line(&mut e, "&mod 7 3"), "1");
    }

    #[test]
    fn nested_functions() {
        let mut e = ed();
        assert_eq!(eval_line(&mut e, "&add 1 &tim 2 3"), "7");
    }

    #[test]
    fn string_functions() {
        let mut e = ed();
        assert_eq!(eval_line(&mut e, "&cat \"ab\" \"cd\""), "abcd");
        assert_eq!(eval_line(&mut e, "&len \"héllo\""), "5");
        assert_eq!(eval_line(&mut e, "&mid \"abcdef\" 2 3"), "bcd");
        assert_eq!(eval_line(&mut e, "&upper \"ab\""), "AB");
    }

    #[test]
    fn logic_and_comparison() {
        let mut e = ed();
        assert_eq!(eval_line(&mut e, "&equ 3 3"), "TRUE");
        assert_eq!(eval_line(&mut e, "&sgr \"b\" \"a\""), "TRUE");
        assert_eq!(eval_line(&mut e, "&not FALSE"), "TRUE");
        assert_eq!(eval_line(&mut e, "&and TRUE FALSE"), "FALSE");
    }

    #[test]
    fn user_variables_round_trip() {
        let mut e = ed();
        svar(&mut e, "%x", "10").unwrap();
        assert_eq!(eval_line(&mut e, "%x"), "10");
        assert_eq!(eval_line(&mut e, "&add %x 1"), "11");
        // Undefined user variables read as empty.
        assert_eq!(eval_line(&mut e, "%none"), "");
    }

    #[test]
    fn env_variables() {
        let mut e = ed();
        assert_eq!(eval_line(&mut e, "$cbufname"), "main");
        assert_eq!(eval_line(&mut e, "$binary_threshold"), "80");
        svar(&mut e, "$binary_threshold", "65").unwrap();
        assert_eq!(e.binary_threshold, 65);
        assert!(svar(&mut e, "$match", "x").is_err());
        assert!(gtenv(&mut e, "nonsense").is_err());
    }

    #[test]
    fn search_var_updates_ring() {
        let mut e = ed();
        svar(&mut e, "$search", "pat1").unwrap();
        assert_eq!(e.search.pat, "pat1");
        assert_eq!(eval_line(&mut e, "$search"), "pat1");
    }

    #[test]
    fn indirection() {
        let mut e = ed();
        svar(&mut e, "%name", "%other").unwrap();
        svar(&mut e, "%other", "42").unwrap();
        assert_eq!(eval_line(&mut e, "&ind %name"), "42");
    }

    #[test]
    fn quoted_tokens_are_literal() {
        let mut e = ed();
        assert_eq!(eval_line(&mut e, "\"$search\""), "$search");
    }
}
