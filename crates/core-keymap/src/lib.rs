//! Key-binding surface: textual key names, the bind/unbind commands,
//! binding procedure buffers to keys, and the describe listings.

use smallvec::SmallVec;
use tracing::{debug, info};

use core_complete::Cmplt;
use core_exec::{nextarg_raw, scratch_buffer};
use core_input::getcmd;
use core_state::{
    BindTarget, BufType, CONTROL, CTLX, CmdFunc, CmdResult, Editor, META, SPEC, failed,
};

fn fp(f: CmdFunc) -> usize {
    f as usize
}

/// Format a composite keycode as its textual name (`^X^S`, `M-A`,
/// `FN5`, `^Xh`).
pub fn cmdstr(code: u32) -> String {
    let mut out = String::new();
    if code & META != 0 {
        out.push_str("M-");
    }
    if code & CTLX != 0 {
        out.push_str("^X");
    }
    if code & SPEC != 0 {
        out.push_str("FN");
    }
    let base = code & core_state::KEY_BASE;
    if code & CONTROL != 0 {
        out.push('^');
    }
    match char::from_u32(base) {
        Some(c) => out.push(c),
        None => out.push('?'),
    }
    out
}

/// Parse a textual key name back into a keycode. Inverse of
/// [`cmdstr`]; letters after a prefix are folded to uppercase as the
/// dispatcher does.
pub fn strtokey(name: &str) -> Option<u32> {
    let mut code = 0u32;
    let mut rest = name;
    loop {
        if let Some(r) = rest.strip_prefix("M-") {
            code |= META;
            rest = r;
        } else if let Some(r) = rest.strip_prefix("^X").filter(|r| !r.is_empty()) {
            code |= CTLX;
            rest = r;
        } else if let Some(r) = rest.strip_prefix("FN") {
            code |= SPEC;
            rest = r;
        } else {
            break;
        }
    }
    let mut chars: SmallVec<[char; 4]> = rest.chars().collect();
    let control = chars.first() == Some(&'^') && chars.len() > 1;
    if control {
        code |= CONTROL;
        chars.remove(0);
    }
    if chars.len() != 1 {
        return None;
    }
    let mut base = chars[0];
    if code & (META | CTLX | CONTROL) != 0 {
        base = base.to_ascii_uppercase();
    }
    Some(code | base as u32)
}

// ---- prefix and control pseudo-commands ----
//
// These handlers exist so the prefixes are nameable and rebindable;
// the actual composition happens in the key fetch loop, which
// consults the prefix keycode variables.

pub fn metafn(_ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    Ok(())
}

pub fn cex(_ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    Ok(())
}

pub fn unarg(_ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    Ok(())
}

/// abort-command: rings through as the distinct abort status.
pub fn ctrlg(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    ed.term.beep();
    Err(core_state::EdError::Abort)
}

fn is_prefix_func(ed: &Editor, func: CmdFunc) -> bool {
    [metafn as CmdFunc, cex as CmdFunc, unarg as CmdFunc, ctrlg as CmdFunc]
        .iter()
        .any(|p| fp(*p) == fp(func))
        || {
            // Registered under these names in the editor's own table,
            // in case the binary supplies wrappers.
            ["meta-prefix", "cex-prefix", "universal-argument", "abort-command"]
                .iter()
                .filter_map(|n| ed.names.lookup(n))
                .any(|e| fp(e.func) == fp(func))
        }
}

/// Read the key sequence to bind: the raw textual name from command
/// files, or real keystrokes interactively.
fn getckey(ed: &mut Editor, raw: bool) -> CmdResult<u32> {
    if ed.exec.clexec {
        let name = nextarg_raw(ed, "", Cmplt::None)?;
        return strtokey(&name).ok_or_else(|| core_state::EdError::msg("Bad key name"));
    }
    if raw {
        core_input::get1key(ed)
    } else {
        getcmd(ed)
    }
}

/// bind-to-key: attach a named function to a key. Binding a prefix
/// function first removes every key currently bound to that prefix
/// and updates the corresponding prefix keycode.
pub fn bindtokey(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    let name = nextarg_raw(ed, ": bind-to-key ", Cmplt::FuncName)?;
    let Some(entry) = ed.names.lookup(&name) else {
        return failed("[No such function]");
    };
    let func = entry.func;
    let prefix = is_prefix_func(ed, func);
    let code = getckey(ed, prefix)?;

    if prefix {
        // A prefix lives on exactly one key.
        let removed = ed.keys.unbind_func(func);
        if !removed.is_empty() {
            debug!(?removed, "unbound previous prefix keys");
        }
        match name.as_str() {
            "meta-prefix" => ed.metac = code,
            "cex-prefix" => ed.ctlxc = code,
            "universal-argument" => ed.reptc = code,
            "abort-command" => ed.abortc = code,
            _ => {}
        }
    }
    ed.keys.bind(code, BindTarget::Func(func), 1);
    info!(key = %cmdstr(code), func = %name, "bound");
    if !ed.exec.clexec {
        ed.mlwrite(format!("[{} bound to {}]", cmdstr(code), name));
    }
    Ok(())
}

/// unbind-key.
pub fn unbindkey(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    let code = getckey(ed, false)?;
    if !ed.keys.unbind(code) {
        return failed(format!("{} is not bound", cmdstr(code)));
    }
    Ok(())
}

/// buffer-to-key: bind a procedure buffer to a key sequence.
pub fn buffertokey(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    let name = nextarg_raw(ed, ": buffer-to-key ", Cmplt::Proc)?;
    let bufname = format!("/{name}");
    if ed.bufs.find(&bufname).is_none() {
        return failed(format!("No such procedure {bufname}"));
    }
    let code = getckey(ed, false)?;
    ed.keys.bind(code, BindTarget::Proc(name.clone()), 1);
    info!(key = %cmdstr(code), proc = %name, "bound procedure");
    Ok(())
}

/// Name of whatever a binding dispatches to.
fn binding_desc(ed: &Editor, target: &BindTarget) -> String {
    match target {
        BindTarget::Func(f) => ed
            .names
            .name_of(*f)
            .unwrap_or("[unregistered function]")
            .to_string(),
        BindTarget::Proc(name) => format!("/{name}"),
    }
}

/// describe-key: read a keystroke, say what it runs.
pub fn deskey(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    if !ed.exec.clexec {
        ed.mlwrite("describe-key: ");
    }
    let code = getckey(ed, false)?;
    let target = ed.keys.get(code).map(|b| b.target.clone());
    let desc = match target {
        Some(t) => binding_desc(ed, &t),
        None => "Not bound".to_string(),
    };
    ed.mlforce(format!("{} -> {}", cmdstr(code), desc));
    Ok(())
}

fn build_binding_list(ed: &mut Editor, filter: Option<&str>) -> CmdResult {
    // Listing: every named function with the keys it is on.
    let mut lines = Vec::new();
    let entries: Vec<(String, CmdFunc)> = ed
        .names
        .iter_sorted()
        .map(|e| (e.name.to_string(), e.func))
        .collect();
    for (name, func) in entries {
        if let Some(f) = filter
            && !name.contains(f)
        {
            continue;
        }
        let mut keys: Vec<String> = Vec::new();
        let mut cur = ed.keys.get_by_func(func);
        while let Some(ix) = cur {
            let e = ed.keys.entry(ix);
            match &e.target {
                BindTarget::Func(bf) if fp(*bf) == fp(func) => keys.push(cmdstr(e.code)),
                _ => break,
            }
            cur = ed.keys.next_by_func(ix);
        }
        lines.push(format!("{name:<32}{}", keys.join(" ")));
    }
    // Procedure bindings get their own section.
    let procs: Vec<String> = ed
        .keys
        .iter()
        .filter_map(|b| match &b.target {
            BindTarget::Proc(name) => Some(format!("/{name:<31}{}", cmdstr(b.code))),
            _ => None,
        })
        .collect();
    if !procs.is_empty() {
        lines.push(String::new());
        lines.extend(procs);
    }

    let id = scratch_buffer(ed, "[Bindings]", BufType::Special)?;
    core_exec::fill_buffer(ed, id, &lines.join("\n"));
    let wix = ed.curw;
    ed.connect_window(wix, id);
    Ok(())
}

/// describe-bindings: pop up the full binding list.
pub fn desbind(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    build_binding_list(ed, None)
}

/// apropos: the binding list filtered by a substring.
pub fn apro(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    let what = core_exec::nextarg(ed, "Apropos string: ", Cmplt::None)?;
    build_binding_list(ed, Some(&what))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use core_state::{FuncOpts, NameEntry, NameTable, ScriptedTerm};

    fn noop(_: &mut Editor, _: bool, _: i32) -> CmdResult {
        Ok(())
    }

    fn ed() -> Editor {
        let mut e = Editor::new(Box::new(ScriptedTerm::new()));
        e.names = NameTable::build(vec![
            NameEntry {
                name: "forward-character",
                func: noop,
                opts: FuncOpts::empty(),
            },
            NameEntry {
                name: "meta-prefix",
                func: metafn,
                opts: FuncOpts::empty(),
            },
            NameEntry {
                name: "cex-prefix",
                func: cex,
                opts: FuncOpts::empty(),
            },
        ]);
        e.exec.clexec = true;
        e
    }

    #[test]
    fn key_names_round_trip() {
        for code in [
            CONTROL | b'F' as u32,
            META | b'A' as u32,
            CTLX | CONTROL | b'S' as u32,
            CTLX | b'H' as u32,
            SPEC | b'5' as u32,
            META | SPEC | b'C' as u32,
            b'q' as u32,
        ] {
            let name = cmdstr(code);
            assert_eq!(strtokey(&name), Some(code), "round trip of {name}");
        }
    }

    #[test]
    fn strtokey_parses_common_forms() {
        assert_eq!(strtokey("^F"), Some(CONTROL | b'F' as u32));
        assert_eq!(strtokey("^x"), Some(CONTROL | b'X' as u32));
        assert_eq!(strtokey("M-b"), Some(META | b'B' as u32));
        assert_eq!(strtokey("^X^C"), Some(CTLX | CONTROL | b'C' as u32));
        assert_eq!(strtokey("FN5"), Some(SPEC | b'5' as u32));
        assert_eq!(strtokey(""), None);
        assert_eq!(strtokey("M-"), None);
    }

    #[test]
    fn bind_and_unbind_from_command_line() {
        let mut e = ed();
        e.exec.execstr = Some("forward-character ^F".to_string());
        bindtokey(&mut e, false, 1).unwrap();
        assert!(e.keys.get(CONTROL | b'F' as u32).is_some());
        e.exec.execstr = Some("^F".to_string());
        unbindkey(&mut e, false, 1).unwrap();
        assert!(e.keys.get(CONTROL | b'F' as u32).is_none());
    }

    #[test]
    fn rebinding_prefix_sweeps_old_keys() {
        let mut e = ed();
        e.exec.execstr = Some("cex-prefix ^X".to_string());
        bindtokey(&mut e, false, 1).unwrap();
        assert_eq!(e.ctlxc, CONTROL | b'X' as u32);
        // Rebind the prefix elsewhere: the old key must vanish.
        e.exec.execstr = Some("cex-prefix ^C".to_string());
        bindtokey(&mut e, false, 1).unwrap();
        assert_eq!(e.ctlxc, CONTROL | b'C' as u32);
        assert!(e.keys.get(CONTROL | b'X' as u32).is_none());
        assert!(e.keys.get(CONTROL | b'C' as u32).is_some());
    }

    #[test]
    fn buffer_to_key_binds_procedure() {
        let mut e = ed();
        e.bufs
            .create(
                &mut e.lines,
                "/hello",
                BufType::Procedure,
                core_state::BufFlags::INVS,
                core_state::Modes::empty(),
            )
            .unwrap();
        e.exec.execstr = Some("hello ^Xh".to_string());
        buffertokey(&mut e, false, 1).unwrap();
        match &e.keys.get(CTLX | b'H' as u32).unwrap().target {
            BindTarget::Proc(p) => assert_eq!(p, "hello"),
            _ => panic!("expected procedure binding"),
        }
        // Unknown procedures refuse.
        e.exec.execstr = Some("nope ^Xn".to_string());
        assert!(buffertokey(&mut e, false, 1).is_err());
    }

    #[test]
    fn binding_list_popup() {
        let mut e = ed();
        e.exec.execstr = Some("forward-character ^F".to_string());
        bindtokey(&mut e, false, 1).unwrap();
        desbind(&mut e, false, 1).unwrap();
        assert_eq!(e.curb().name, "[Bindings]");
        let header = e.header();
        let joined: Vec<String> = e
            .lines
            .ring_iter(header)
            .map(|lp| String::from_utf8_lossy(e.lbytes(lp)).into_owned())
            .collect();
        let text = joined.join("\n");
        assert!(text.contains("forward-character"));
        assert!(text.contains("^F"));
    }
}
