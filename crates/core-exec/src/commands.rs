//! Interpreter-facing commands: execute-*, store-*, set, reexecute
//! support and the keyboard-macro recorder controls.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use core_complete::Cmplt;
use core_state::{
    BufType, CmdResult, Editor, FuncOpts, KbdMode, RxArgs, failed,
};

use crate::eval::{nextarg, nextarg_raw, svar};
use crate::{dobuf, docmd, fill_buffer, scratch_buffer};

/// `set $var value` / `set %var value`.
pub fn set(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    let var = nextarg_raw(ed, "Variable to set: ", Cmplt::Var)?;
    if var.is_empty() {
        return failed("No variable name");
    }
    let value = nextarg(ed, &format!("Value of {var}: "), Cmplt::None)?;
    svar(ed, &var, &value)?;
    if !ed.exec.clexec {
        ed.mlwrite(format!("[{var} set to {value}]"));
    }
    Ok(())
}

/// Execute a command by name even if unbound.
pub fn namedcmd(ed: &mut Editor, f: bool, n: i32) -> CmdResult {
    let reuse = ed.exec.inreex && ed.exec.rxargs.contains(RxArgs::NAMEDCMD);
    let name = match (reuse, ed.exec.last_named.clone()) {
        (true, Some(prev)) => prev,
        _ => nextarg_raw(ed, "name: ", Cmplt::FuncName)?,
    };
    let Some(entry) = ed.names.lookup(&name) else {
        return failed("[No such function]");
    };
    if ed.mb_depth > 0 && entry.opts.contains(FuncOpts::NOT_MB) {
        return failed(format!("{name} not allowed in the minibuffer"));
    }
    let func = entry.func;
    ed.exec.last_named = Some(name);
    func(ed, f, n)
}

/// Prompt for a command line and run it.
pub fn execcmd(ed: &mut Editor, _f: bool, n: i32) -> CmdResult {
    let reuse = ed.exec.inreex && ed.exec.rxargs.contains(RxArgs::EXECCMD);
    let line = match (reuse, ed.exec.prev_cmdline.clone()) {
        (true, Some(prev)) => prev,
        _ => nextarg_raw(ed, "command: ", Cmplt::None)?,
    };
    ed.exec.execlevel = 0;
    for _ in 0..n.max(1) {
        docmd(ed, &line)?;
    }
    Ok(())
}

/// Re-run the previous command line (handled specially by `docmd`,
/// which recognises the name before dispatch; this body covers the
/// key-bound case).
pub fn reexecute(ed: &mut Editor, _f: bool, n: i32) -> CmdResult {
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
    status
}

/// Execute a buffer of commands by buffer name.
pub fn execbuf(ed: &mut Editor, _f: bool, n: i32) -> CmdResult {
    let name = nextarg_raw(ed, "Execute buffer: ", Cmplt::Buffer)?;
    let Some(id) = ed.bufs.find(&name) else {
        return failed(format!("No such buffer: {name}"));
    };
    for _ in 0..n.max(1) {
        dobuf(ed, id)?;
    }
    Ok(())
}

/// Execute a procedure buffer (`/name`).
pub fn execproc(ed: &mut Editor, _f: bool, n: i32) -> CmdResult {
    let reuse = ed.exec.inreex && ed.exec.rxargs.contains(RxArgs::EXECPROC);
    let name = match (reuse, ed.exec.last_proc.clone()) {
        (true, Some(prev)) => prev,
        _ => nextarg_raw(ed, "Execute procedure: ", Cmplt::Proc)?,
    };
    let bufname = format!("/{name}");
    let Some(id) = ed.bufs.find(&bufname) else {
        return failed(format!("No such procedure {bufname}"));
    };
    if ed.bufs.get(id).btype != BufType::Procedure {
        return failed(format!("Buffer {bufname} is not a procedure"));
    }
    ed.exec.last_proc = Some(name);
    let passes = if ed.bufs.get(id).proc_opts.contains(FuncOpts::ONE_PASS) {
        1
    } else {
        n.max(1)
    };
    for _ in 0..passes {
        dobuf(ed, id)?;
    }
    Ok(())
}

/// Execute a file of command lines.
pub fn execfile(ed: &mut Editor, _f: bool, n: i32) -> CmdResult {
    let reuse = ed.exec.inreex && ed.exec.rxargs.contains(RxArgs::EXECFILE);
    let fname = match (reuse, ed.exec.last_file.clone()) {
        (true, Some(prev)) => prev,
        _ => nextarg(ed, "File to execute: ", Cmplt::File)?,
    };
    if fname.is_empty() {
        return failed("No file name");
    }
    ed.exec.last_file = Some(fname.clone());
    for _ in 0..n.max(1) {
        dofile(ed, Path::new(&fname))?;
    }
    Ok(())
}

/// Read and execute one file of commands.
pub fn dofile(ed: &mut Editor, path: &Path) -> CmdResult {
    if ed.exec.include_level >= crate::MAX_INCLUDE {
        return failed("Maximum include depth exceeded");
    }
    let bytes = std::fs::read(path)
        .map_err(|e| core_state::EdError::msg(format!("Cannot open {}: {e}", path.display())))?;
    let text = String::from_utf8_lossy(&bytes).into_owned();
    let name = format!("[exec{}]", ed.exec.include_level);
    let id = scratch_buffer(ed, &name, BufType::Special)?;
    fill_buffer(ed, id, &text);
    info!(file = %path.display(), "executing command file");
    ed.exec.include_level += 1;
    let status = dobuf(ed, id);
    ed.exec.include_level -= 1;
    let header = ed.bufs.get(id).header;
    ed.lines.clear_ring(header);
    status
}

/// Search the configuration path (then `$PATH`) for a file and
/// execute it. Used for startup files and `-@`.
pub fn startup(ed: &mut Editor, fname: &str) -> CmdResult {
    let Some(path) = flook(ed, fname) else {
        return failed(format!("Cannot find {fname}"));
    };
    dofile(ed, &path)
}

/// File lookup along home, the configured path list, then `$PATH`.
pub fn flook(ed: &Editor, fname: &str) -> Option<PathBuf> {
    let direct = PathBuf::from(fname);
    if fname.contains('/') {
        return direct.is_file().then_some(direct);
    }
    if let Ok(home) = std::env::var("HOME") {
        let p = Path::new(&home).join(fname);
        if p.is_file() {
            return Some(p);
        }
    }
    for dir in &ed.conf_path {
        let p = dir.join(fname);
        if p.is_file() {
            return Some(p);
        }
    }
    if let Ok(path) = std::env::var("PATH") {
        for dir in std::env::split_paths(&path) {
            let p = dir.join(fname);
            if p.is_file() {
                return Some(p);
            }
        }
    }
    None
}

fn begin_store(ed: &mut Editor, name: &str, btype: BufType) -> CmdResult {
    let id = scratch_buffer(ed, name, btype)?;
    ed.exec.mstore = Some(id);
    debug!(buffer = %name, "storing lines");
    Ok(())
}

/// `store-procedure name`: lines up to `!endm` land in `/name`.
pub fn storeproc(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    let name = nextarg_raw(ed, "Procedure name: ", Cmplt::Proc)?;
    if name.is_empty() {
        return failed("No procedure name");
    }
    begin_store(ed, &format!("/{name}"), BufType::Procedure)
}

/// `store-macro n`: numbered macro buffers.
pub fn storemac(ed: &mut Editor, f: bool, n: i32) -> CmdResult {
    if !f || !(1..=40).contains(&n) {
        return failed("Macro number out of range");
    }
    begin_store(ed, &format!("[Macro {n:02}]"), BufType::Procedure)
}

/// `store-pttable name`: a procedure store that compiles into a
/// phonetic table at `!endm`.
pub fn storepttable(ed: &mut Editor, f: bool, n: i32) -> CmdResult {
    storeproc(ed, f, n)?;
    if let Some(id) = ed.exec.mstore {
        ed.bufs.get_mut(id).btype = BufType::PhoneticTable;
    }
    ed.exec.ptt_storing = true;
    Ok(())
}

// ---- keyboard macro recorder ----

/// begin-macro (C-x `(`).
pub fn ctlxlp(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    if ed.mac.mode != KbdMode::Stop {
        return failed("Macro already active");
    }
    ed.mlwrite("[Start macro]");
    ed.mac.keys.clear();
    ed.mac.mode = KbdMode::Record;
    Ok(())
}

/// end-macro (C-x `)`). The keys that invoked this command are
/// trimmed off the recording.
pub fn ctlxrp(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    if ed.mac.mode != KbdMode::Record {
        return failed("Macro not active");
    }
    ed.mac.keys.truncate(ed.mac.cmd_start);
    ed.mac.mode = KbdMode::Stop;
    ed.mlwrite("[End macro]");
    Ok(())
}

/// execute-macro (C-x e), with repeat count.
pub fn ctlxe(ed: &mut Editor, f: bool, n: i32) -> CmdResult {
    if ed.mac.mode != KbdMode::Stop {
        return failed("Macro already active");
    }
    if n <= 0 {
        return Ok(());
    }
    ed.mac.mode = KbdMode::Play;
    ed.mac.pos = 0;
    ed.mac.rep = n;
    ed.mac.saved_arg = (f, n);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_state::{NameEntry, NameTable, ScriptedTerm};

    fn ed() -> Editor {
        let mut e = Editor::new(Box::new(ScriptedTerm::new()));
        e.names = NameTable::build(vec![
            NameEntry {
                name: "set",
                func: set,
                opts: FuncOpts::empty(),
            },
            NameEntry {
                name: "store-procedure",
                func: storeproc,
                opts: FuncOpts::empty(),
            },
            NameEntry {
                name: "execute-procedure",
                func: execproc,
                opts: FuncOpts::empty(),
            },
        ]);
        e
    }

    #[test]
    fn store_and_execute_procedure() {
        let mut e = ed();
        let body = [
            "store-procedure greet",
            "  set %greeting hello",
            "!endm",
            "execute-procedure greet",
        ];
        let id = scratch_buffer(&mut e, "[boot]", BufType::Special).unwrap();
        fill_buffer(&mut e, id, &body.join("\n"));
        dobuf(&mut e, id).unwrap();
        assert_eq!(e.uvar("greeting"), Some("hello"));
        let proc_id = e.bufs.find("/greet").unwrap();
        assert_eq!(e.bufs.get(proc_id).btype, BufType::Procedure);
    }

    #[test]
    fn execfile_runs_lines() {
        let mut e = ed();
        let dir = std::env::temp_dir();
        let path = dir.join("fe-exec-test.cmd");
        std::fs::write(&path, "set %fromfile 9\n").unwrap();
        e.exec.clexec = true;
        e.exec.execstr = Some(format!("{}", path.display()));
        execfile(&mut e, false, 1).unwrap();
        assert_eq!(e.uvar("fromfile"), Some("9"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn macro_record_controls() {
        let mut e = ed();
        ctlxlp(&mut e, false, 1).unwrap();
        assert_eq!(e.mac.mode, KbdMode::Record);
        e.mac.keys = vec![1, 2, 3];
        e.mac.cmd_start = 2; // the keys that triggered end-macro
        ctlxrp(&mut e, false, 1).unwrap();
        assert_eq!(e.mac.keys, vec![1, 2]);
        ctlxe(&mut e, true, 2).unwrap();
        assert_eq!(e.mac.mode, KbdMode::Play);
        assert_eq!(e.mac.rep, 2);
    }

    #[test]
    fn storemac_names_numbered_buffer() {
        let mut e = ed();
        storemac(&mut e, true, 7).unwrap();
        assert!(e.exec.mstore.is_some());
        assert!(e.bufs.find("[Macro 07]").is_some());
        assert!(storemac(&mut e, false, 0).is_err());
    }
}
