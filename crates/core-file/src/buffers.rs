//! Buffer commands that touch the file system: switching with lazy
//! activation and file hooks, the file commands, kill/rename/list.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use core_complete::Cmplt;
use core_exec::{nextarg, nextarg_raw, run_hook, scratch_buffer};
use core_input::get1key;
use core_state::{
    BufFlags, BufId, BufType, CmdResult, EdError, Editor, Modes, WFlags, failed,
};

use crate::fio;

/// Derive a buffer name from a file path, uniquified with a numeric
/// suffix when taken.
fn bname_for(ed: &Editor, path: &str) -> String {
    let base = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "no-name".to_string());
    let mut base = base;
    base.truncate(core_state::buffer::NBUFN.saturating_sub(3));
    if ed.bufs.find(&base).is_none() {
        return base;
    }
    for i in 1..100 {
        let cand = format!("{base}<{i}>");
        if ed.bufs.find(&cand).is_none() {
            return cand;
        }
    }
    base
}

/// Read a buffer's backing file now (the activation step), then run
/// the file hooks and apply forced mode overrides.
pub fn activate(ed: &mut Editor, id: BufId) -> CmdResult {
    if ed.bufs.get(id).active {
        return Ok(());
    }
    let fname = ed.bufs.get(id).fname.clone();
    if !fname.is_empty() {
        let path = PathBuf::from(&fname);
        if ed.opts.file_locks && path.exists() && !crate::lock::lock(ed, &path)? {
            return failed("[Aborted by lock]");
        }
        if path.exists() {
            fio::read_into(ed, id, &path)?;
        } else {
            ed.mlwrite("[New file]");
            ed.bufs.get_mut(id).active = true;
        }
    } else {
        ed.bufs.get_mut(id).active = true;
    }
    // Hooks: the generic one, then the per-suffix one; forced modes
    // land after the hooks so they win.
    run_hook(ed, "file-hooks")?;
    if let Some(ext) = Path::new(&fname)
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
    {
        run_hook(ed, &format!("file-hooks-{ext}"))?;
    }
    let on = ed.force_mode_on;
    let off = ed.force_mode_off;
    let b = ed.bufs.get_mut(id);
    b.mode |= on;
    b.mode.remove(off);
    Ok(())
}

/// Point the current window at a buffer (switch-to-buffer), reading
/// the backing file on first use.
pub fn swbuffer(ed: &mut Editor, id: BufId) -> CmdResult {
    let wix = ed.curw;
    ed.connect_window(wix, id);
    activate(ed, id)?;
    // A freshly activated buffer's saved dot may still be the header;
    // settle it on the first line.
    let header = ed.bufs.get(id).header;
    let first = ed.lines.forward(header);
    let w = ed.cur_win_mut();
    if w.dot.0 == header && first != header {
        w.dot = (first, 0);
        w.top = first;
    }
    Ok(())
}

/// use-buffer: by name, creating it if missing.
pub fn usebuffer(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    let name = nextarg_raw(ed, "Use buffer: ", Cmplt::Buffer)?;
    if name.is_empty() {
        return failed("No buffer name");
    }
    let id = match ed.bufs.find(&name) {
        Some(id) => id,
        None => ed.bufs.create(
            &mut ed.lines,
            &name,
            BufType::Normal,
            BufFlags::empty(),
            ed.gmode,
        )?,
    };
    swbuffer(ed, id)
}

/// next-buffer: cycle in registry order, skipping invisible buffers.
pub fn nextbuffer(ed: &mut Editor, _f: bool, n: i32) -> CmdResult {
    let mut id = ed.curb_id();
    for _ in 0..n.max(1) {
        id = ed
            .bufs
            .next_visible(id)
            .ok_or_else(|| EdError::msg("No other buffer"))?;
    }
    swbuffer(ed, id)
}

/// Clear a buffer back to empty. Prompts about discarding changes on
/// a visible changed buffer unless `force`.
pub fn bclear(ed: &mut Editor, id: BufId, force: bool) -> CmdResult {
    let b = ed.bufs.get(id);
    if b.is_changed() && !b.is_invisible() && !force {
        ed.mlforce("Discard changes? (y/n)");
        let c = get1key(ed)?;
        if c == ed.abortc {
            return Err(EdError::Abort);
        }
        if (c & 0xff) as u8 != b'y' {
            return failed("");
        }
    }
    // Widen first so the saved chains don't leak.
    if let Some(save) = ed.bufs.get_mut(id).narrowed.take() {
        ed.lines.drop_ring(save.top);
        ed.lines.drop_ring(save.bot);
        ed.bufs.get_mut(id).flags.remove(BufFlags::NARROW);
    }
    let header = ed.bufs.get(id).header;
    ed.lines.clear_ring(header);
    let b = ed.bufs.get_mut(id);
    b.flags.remove(BufFlags::CHG | BufFlags::TRUNC);
    b.b.dot = (header, 0);
    b.b.mark = None;
    b.b.fcol = 0;
    b.bvars.clear();
    b.ptt = None;
    for w in &mut ed.wins {
        if w.buf == id {
            w.dot = (header, 0);
            w.mark = None;
            w.top = header;
            w.flags |= WFlags::HARD | WFlags::MODE;
        }
    }
    Ok(())
}

/// kill-buffer: refuses displayed buffers; clears and removes.
pub fn killbuffer(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    let name = nextarg_raw(ed, "Kill buffer: ", Cmplt::Buffer)?;
    let Some(id) = ed.bufs.find(&name) else {
        return failed(format!("No such buffer: {name}"));
    };
    if ed.bufs.get(id).nwnd > 0 {
        return failed("Buffer is being displayed");
    }
    bclear(ed, id, false)?;
    if ed.ptt == Some(id) {
        ed.ptt = None;
    }
    ed.bufs.remove(&mut ed.lines, id);
    debug!(buffer = %name, "killed");
    Ok(())
}

/// name-buffer: rename the current buffer (name must be free).
pub fn namebuffer(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    let name = nextarg_raw(ed, "Change buffer name to: ", Cmplt::None)?;
    if name.is_empty() || name.len() > core_state::buffer::NBUFN {
        return failed("Bad buffer name");
    }
    if ed.bufs.find(&name).is_some() {
        return failed(format!("Buffer {name} already exists"));
    }
    ed.curb_mut().name = name;
    ed.cur_win_mut().flags |= WFlags::MODE;
    Ok(())
}

/// list-buffers: the pop-up table of buffers.
pub fn listbuffers(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    let mut lines = vec![format!("{:<3}{:<12}{:<32}File", "C", "Size", "Buffer")];
    for id in ed.bufs.ordered() {
        let b = ed.bufs.get(id);
        if b.is_invisible() {
            continue;
        }
        let size: usize = ed
            .lines
            .ring_iter(b.header)
            .map(|lp| ed.llen(lp) + 1)
            .sum();
        let chg = if b.is_changed() { "*" } else { " " };
        lines.push(format!("{chg:<3}{size:<12}{:<32}{}", b.name, b.fname));
    }
    let id = scratch_buffer(ed, "[Buffers]", BufType::Special)?;
    core_exec::fill_buffer(ed, id, &lines.join("\n"));
    let wix = ed.curw;
    ed.connect_window(wix, id);
    Ok(())
}

fn getfile(ed: &mut Editor, path: &str, view: bool) -> CmdResult {
    // An existing buffer on this file wins.
    for id in ed.bufs.ordered() {
        if ed.bufs.get(id).fname == path {
            return swbuffer(ed, id);
        }
    }
    let name = bname_for(ed, path);
    let id = ed.bufs.create(
        &mut ed.lines,
        &name,
        BufType::Normal,
        BufFlags::empty(),
        ed.gmode,
    )?;
    {
        let b = ed.bufs.get_mut(id);
        b.fname = path.to_string();
        b.realpath = std::fs::canonicalize(path).ok();
        b.active = false;
    }
    swbuffer(ed, id)?;
    if view {
        ed.bufs.get_mut(id).mode |= Modes::VIEW;
    }
    Ok(())
}

/// find-file.
pub fn filefind(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    let fname = nextarg(ed, "Find file: ", Cmplt::File)?;
    if fname.is_empty() {
        return failed("No file name");
    }
    getfile(ed, &core_complete::tilde_expand(&fname), false)
}

/// view-file: find-file into View mode.
pub fn viewfile(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    let fname = nextarg(ed, "View file: ", Cmplt::File)?;
    if fname.is_empty() {
        return failed("No file name");
    }
    getfile(ed, &core_complete::tilde_expand(&fname), true)
}

/// read-file: replace the current buffer's contents.
pub fn fileread(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    let fname = nextarg(ed, "Read file: ", Cmplt::File)?;
    if fname.is_empty() {
        return failed("No file name");
    }
    let id = ed.curb_id();
    bclear(ed, id, false)?;
    let fname = core_complete::tilde_expand(&fname);
    {
        let b = ed.bufs.get_mut(id);
        b.fname = fname.clone();
        b.realpath = std::fs::canonicalize(&fname).ok();
    }
    let info = fio::read_into(ed, id, &PathBuf::from(&fname))?;
    let header = ed.bufs.get(id).header;
    let first = ed.lines.forward(header);
    let w = ed.cur_win_mut();
    w.dot = (first, 0);
    w.top = first;
    w.flags |= WFlags::HARD | WFlags::MODE;
    ed.mlwrite(format!(
        "[Read {} line{}{}]",
        info.nlines,
        if info.nlines == 1 { "" } else { "s" },
        if info.dos_file { " - from DOS file!" } else { "" }
    ));
    Ok(())
}

/// insert-file at dot.
pub fn insfile(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    ed.check_writable()?;
    let fname = nextarg(ed, "Insert file: ", Cmplt::File)?;
    if fname.is_empty() {
        return failed("No file name");
    }
    let bytes = std::fs::read(core_complete::tilde_expand(&fname)).map_err(EdError::Io)?;
    core_edit::insert::linstr_opt(ed, &bytes, true)?;
    Ok(())
}

fn do_write(ed: &mut Editor, path: &str) -> CmdResult {
    let id = ed.curb_id();
    let n = fio::write_from(ed, id, &PathBuf::from(path))?;
    let b = ed.bufs.get_mut(id);
    b.flags.remove(BufFlags::CHG);
    for w in &mut ed.wins {
        if w.buf == id {
            w.flags |= WFlags::MODE;
        }
    }
    ed.mlwrite(format!("[Wrote {n} line{}]", if n == 1 { "" } else { "s" }));
    Ok(())
}

/// save-file: write back when changed.
pub fn filesave(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    if !ed.curb().is_changed() {
        ed.mlwrite("(No changes to save)");
        return Ok(());
    }
    let fname = ed.curb().fname.clone();
    if fname.is_empty() {
        return failed("No file name");
    }
    do_write(ed, &fname)
}

/// write-file: write to a prompted name and adopt it.
pub fn filewrite(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    let fname = nextarg(ed, "Write file: ", Cmplt::File)?;
    if fname.is_empty() {
        return failed("No file name");
    }
    let fname = core_complete::tilde_expand(&fname);
    do_write(ed, &fname)?;
    let id = ed.curb_id();
    let b = ed.bufs.get_mut(id);
    b.fname = fname.clone();
    b.realpath = std::fs::canonicalize(&fname).ok();
    Ok(())
}

/// change-file-name.
pub fn filename(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    let fname = nextarg(ed, "Name: ", Cmplt::File)?;
    let b = ed.curb_mut();
    b.fname = fname;
    b.realpath = None;
    ed.cur_win_mut().flags |= WFlags::MODE;
    Ok(())
}

/// Autosave tick: called after keystrokes that inserted text.
pub fn autosave_check(ed: &mut Editor) -> CmdResult {
    if ed.acount > 0 || !ed.curb().mode.contains(Modes::ASAVE) {
        return Ok(());
    }
    ed.acount = ed.asave;
    if ed.curb().is_changed() && !ed.curb().fname.is_empty() {
        info!("autosave");
        return filesave(ed, false, 1);
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

    #[test]
    fn find_file_creates_and_lazily_reads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        std::fs::write(&path, "first\nsecond\n").unwrap();
        let mut e = ed();
        e.exec.execstr = Some(format!("\"{}\"", path.display()));
        filefind(&mut e, false, 1).unwrap();
        assert_eq!(e.curb().name, "hello.txt");
        assert!(e.curb().active);
        let first = e.lines.forward(e.header());
        assert_eq!(e.lbytes(first), b"first");
        // Same file again: the existing buffer, not a copy.
        let nbuf = e.bufs.iter_ids().count();
        e.exec.execstr = Some(format!("\"{}\"", path.display()));
        filefind(&mut e, false, 1).unwrap();
        assert_eq!(e.bufs.iter_ids().count(), nbuf);
    }

    #[test]
    fn missing_file_is_new() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fresh.txt");
        let mut e = ed();
        e.exec.execstr = Some(format!("\"{}\"", path.display()));
        filefind(&mut e, false, 1).unwrap();
        assert!(e.curb().active);
        assert!(e.at_eob());
    }

    #[test]
    fn file_hooks_run_on_activation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hooked.rs");
        std::fs::write(&path, "content\n").unwrap();
        let mut e = ed();
        // A hook procedure that records itself in a user variable.
        e.names = core_state::NameTable::build(vec![core_state::NameEntry {
            name: "set",
            func: core_exec::commands::set,
            opts: core_state::FuncOpts::empty(),
        }]);
        let hid = e
            .bufs
            .create(
                &mut e.lines,
                "/file-hooks-rs",
                BufType::Procedure,
                BufFlags::INVS,
                Modes::empty(),
            )
            .unwrap();
        core_exec::fill_buffer(&mut e, hid, "set %hooked yes");
        e.exec.execstr = Some(format!("\"{}\"", path.display()));
        filefind(&mut e, false, 1).unwrap();
        assert_eq!(e.uvar("hooked"), Some("yes"));
    }

    #[test]
    fn forced_modes_apply_after_hooks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forced.txt");
        std::fs::write(&path, "x\n").unwrap();
        let mut e = ed();
        e.force_mode_on = Modes::MAGIC;
        e.exec.execstr = Some(format!("\"{}\"", path.display()));
        filefind(&mut e, false, 1).unwrap();
        assert!(e.curb().mode.contains(Modes::MAGIC));
    }

    #[test]
    fn kill_displayed_buffer_refused() {
        let mut e = ed();
        let name = e.curb().name.clone();
        e.exec.execstr = Some(name);
        assert!(killbuffer(&mut e, false, 1).is_err());
    }

    #[test]
    fn save_reports_no_changes() {
        let mut e = ed();
        filesave(&mut e, false, 1).unwrap();
        assert_eq!(e.msg.text, "(No changes to save)");
    }

    #[test]
    fn write_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let mut e = ed();
        let id = e.curb_id();
        core_exec::fill_buffer(&mut e, id, "alpha\nbeta");
        e.bufs.get_mut(id).flags |= BufFlags::CHG;
        e.exec.execstr = Some(format!("\"{}\"", path.display()));
        filewrite(&mut e, false, 1).unwrap();
        assert!(!e.curb().is_changed());
        assert_eq!(std::fs::read(&path).unwrap(), b"alpha\nbeta\n");
    }

    #[test]
    fn buffer_list_popup() {
        let mut e = ed();
        listbuffers(&mut e, false, 1).unwrap();
        assert_eq!(e.curb().name, "[Buffers]");
    }
}
