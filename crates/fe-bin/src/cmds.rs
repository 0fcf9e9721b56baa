//! Odds-and-ends commands that live at the top: mode toggles, fill
//! column, exits, transposition.

use core_complete::Cmplt;
use core_exec::nextarg_raw;
use core_state::{BufFlags, CmdResult, Editor, Modes, WFlags, failed};

fn mode_arg(ed: &mut Editor, prompt: &str) -> CmdResult<Modes> {
    let name = nextarg_raw(ed, prompt, Cmplt::None)?;
    Modes::by_name(&name).ok_or_else(|| core_state::EdError::msg(format!("No such mode: {name}")))
}

pub fn add_mode(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    let m = mode_arg(ed, "Mode to add: ")?;
    ed.curb_mut().mode |= m;
    ed.cur_win_mut().flags |= WFlags::MODE;
    Ok(())
}

pub fn delete_mode(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    let m = mode_arg(ed, "Mode to delete: ")?;
    ed.curb_mut().mode.remove(m);
    ed.cur_win_mut().flags |= WFlags::MODE;
    Ok(())
}

pub fn add_global_mode(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    let m = mode_arg(ed, "Global mode to add: ")?;
    ed.gmode |= m;
    Ok(())
}

pub fn delete_global_mode(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    let m = mode_arg(ed, "Global mode to delete: ")?;
    ed.gmode.remove(m);
    Ok(())
}

pub fn set_fill_column(ed: &mut Editor, f: bool, n: i32) -> CmdResult {
    if !f || n < 0 {
        return failed("Need a column argument");
    }
    ed.fillcol = n as usize;
    ed.mlwrite(format!("[Fill column is {n}]"));
    Ok(())
}

/// Swap the two graphemes before dot.
pub fn twiddle(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    ed.check_writable()?;
    use core_text::grapheme::build_grapheme;
    let (lp, doto) = ed.dot();
    let bytes = ed.lbytes(lp);
    let p1 = core_text::utf8::prev_offset(bytes, doto, true).ok_or_else(|| {
        core_state::EdError::msg("Nothing to transpose")
    })?;
    let p0 = core_text::utf8::prev_offset(bytes, p1, true)
        .ok_or_else(|| core_state::EdError::msg("Nothing to transpose"))?;
    let (g0, _) = build_grapheme(bytes, p0, bytes.len(), true);
    let (g1, _) = build_grapheme(bytes, p1, bytes.len(), true);
    let mut swapped = g1.to_bytes();
    swapped.extend_from_slice(&g0.to_bytes());
    ed.lchange(WFlags::EDIT);
    let text = ed.lines.text_mut(lp);
    text.delete_at(p0, doto - p0);
    text.insert_at(p0, &swapped);
    Ok(())
}

fn any_changed(ed: &Editor) -> bool {
    ed.bufs.iter_ids().any(|id| {
        let b = ed.bufs.get(id);
        b.is_changed() && !b.is_invisible()
    })
}

/// exit: prompts when changed buffers remain.
pub fn quit(ed: &mut Editor, f: bool, n: i32) -> CmdResult {
    if any_changed(ed) && !f {
        ed.mlforce("Modified buffers exist. Leave anyway? (y/n)");
        let c = core_input::get1key(ed)?;
        if (c & 0xff) as u8 != b'y' {
            ed.mlerase();
            return Ok(());
        }
    }
    ed.quit = Some(if f { n } else { ed.rval });
    Ok(())
}

/// quick-exit: save every changed file-visiting buffer, then leave.
pub fn quickexit(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    let ids: Vec<core_state::BufId> = ed.bufs.iter_ids().collect();
    let cur = ed.curb_id();
    for id in ids {
        let b = ed.bufs.get(id);
        if b.is_changed() && !b.fname.is_empty() && !b.flags.contains(BufFlags::INVS) {
            let wix = ed.curw;
            ed.connect_window(wix, id);
            core_file::filesave(ed, false, 1)?;
        }
    }
    let wix = ed.curw;
    ed.connect_window(wix, cur);
    ed.quit = Some(ed.rval);
    Ok(())
}

pub fn show_version(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    ed.mlwrite(format!("ferrite {}", env!("CARGO_PKG_VERSION")));
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
    fn mode_toggles() {
        let mut e = ed();
        e.exec.execstr = Some("magic".into());
        add_mode(&mut e, false, 1).unwrap();
        assert!(e.curb().mode.contains(Modes::MAGIC));
        e.exec.execstr = Some("magic".into());
        delete_mode(&mut e, false, 1).unwrap();
        assert!(!e.curb().mode.contains(Modes::MAGIC));
        e.exec.execstr = Some("bogus".into());
        assert!(add_mode(&mut e, false, 1).is_err());
    }

    #[test]
    fn global_modes_stamp_new_buffers() {
        let mut e = ed();
        e.exec.execstr = Some("exact".into());
        add_global_mode(&mut e, false, 1).unwrap();
        assert!(e.gmode.contains(Modes::EXACT));
    }

    #[test]
    fn twiddle_swaps_graphemes() {
        let mut e = ed();
        let id = e.curb_id();
        core_exec::fill_buffer(&mut e, id, "ab");
        let first = e.lines.forward(e.header());
        e.set_dot(first, 2);
        twiddle(&mut e, false, 1).unwrap();
        assert_eq!(e.lbytes(first), b"ba");
    }

    #[test]
    fn quit_with_clean_buffers() {
        let mut e = ed();
        quit(&mut e, false, 1).unwrap();
        assert_eq!(e.quit, Some(0));
    }

    #[test]
    fn quit_prompts_on_changes() {
        let mut e = Editor::new(Box::new(ScriptedTerm::with_keys([b'n' as u32])));
        e.curb_mut().flags |= BufFlags::CHG;
        quit(&mut e, false, 1).unwrap();
        assert_eq!(e.quit, None);
    }
}
