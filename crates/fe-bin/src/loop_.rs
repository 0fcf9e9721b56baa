//! The read-dispatch-paint loop.

use tracing::trace;

use core_edit::insert::self_insert;
use core_exec::run_proc;
use core_input::getcmd;
use core_state::{
    BindTarget, CmdFlags, CmdResult, EdError, Editor, KEY_BASE, KbdMode, failed,
};

/// Collect a numeric argument after the universal-argument key.
/// Returns (f, n, command key).
fn numeric_arg(ed: &mut Editor, first_key: u32) -> CmdResult<(bool, i32, u32)> {
    if first_key != ed.reptc {
        return Ok((false, 1, first_key));
    }
    let mut n: i32 = 4;
    let mut neg = false;
    let mut bare = true;
    loop {
        let c = getcmd(ed)?;
        if c == ed.reptc {
            n = n.saturating_mul(4);
            continue;
        }
        let base = c & KEY_BASE;
        if c & !KEY_BASE == 0 && (0x30..=0x39).contains(&base) {
            let d = (base - 0x30) as i32;
            n = if bare { d } else { n.saturating_mul(10).saturating_add(d) };
            bare = false;
            continue;
        }
        if c & !KEY_BASE == 0 && base == b'-' as u32 && bare {
            neg = true;
            continue;
        }
        return Ok((true, if neg { -n } else { n }, c));
    }
}

/// Dispatch one composite keycode.
pub fn execute(ed: &mut Editor, c: u32, f: bool, n: i32) -> CmdResult {
    ed.lastflag = ed.thisflag;
    ed.thisflag = CmdFlags::empty();

    let binding = ed.keys.get(c).map(|b| (b.target.clone(), b.multiplier));
    if let Some((target, mult)) = binding {
        let n = n.saturating_mul(mult.max(1));
        match target {
            BindTarget::Func(func) => {
                // Recorder controls are skipped during playback so a
                // macro does not re-arm itself.
                if ed.mac.mode == KbdMode::Play
                    && ed
                        .names
                        .entry_of(func)
                        .is_some_and(|e| e.opts.contains(core_state::FuncOpts::SKIP_IN_MACRO))
                {
                    return Ok(());
                }
                ed.exec.last_cmd = Some((func, f, n));
                return func(ed, f, n);
            }
            BindTarget::Proc(name) => {
                for _ in 0..n.max(1) {
                    run_proc(ed, &name)?;
                }
                return Ok(());
            }
        }
    }

    // Unbound: printable keys self-insert.
    if c & !KEY_BASE == 0 && (c >= 0x20 || c == b'\t' as u32) {
        return self_insert(ed, c, n);
    }
    ed.term.beep();
    failed(format!("[Key not bound: {}]", core_keymap::cmdstr(c)))
}

/// Run until a command asks to quit; the exit code passes through.
pub fn main_loop(ed: &mut Editor) -> i32 {
    loop {
        core_terminal::paint::update(ed);
        if let Some(code) = ed.quit {
            return code;
        }
        let key = match getcmd(ed) {
            Ok(k) => k,
            Err(EdError::Io(e)) => {
                trace!(err = %e, "input stream closed");
                return ed.quit.unwrap_or(0);
            }
            Err(_) => continue,
        };
        let step = numeric_arg(ed, key).and_then(|(f, n, c)| execute(ed, c, f, n));
        match step {
            Ok(()) => {}
            Err(e) => {
                ed.report(&e);
                if ed.mac.mode == KbdMode::Play {
                    // A failing command stops playback.
                    ed.mac.mode = KbdMode::Stop;
                }
            }
        }
        let _ = core_file::buffers::autosave_check(ed);
    }
}
