//! Shell-outs: run a command, pipe a command's output into a buffer,
//! filter the buffer through a command. Raw mode is dropped around
//! the child and the subshell status lands in `$rval`.

use std::io::Write;
use std::process::{Command, Stdio};

use tracing::info;

use core_complete::Cmplt;
use core_exec::{nextarg, scratch_buffer};
use core_state::{BufType, CmdResult, EdError, Editor, RxArgs, failed};

fn shell() -> String {
    std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string())
}

fn read_command(ed: &mut Editor, prompt: &str) -> CmdResult<String> {
    let reuse = ed.exec.inreex && ed.exec.rxargs.contains(RxArgs::SPAWN);
    if reuse && let Some(prev) = ed.exec.last_spawn.clone() {
        return Ok(prev);
    }
    let line = nextarg(ed, prompt, Cmplt::None)?;
    if line.is_empty() {
        return failed("No command");
    }
    ed.exec.last_spawn = Some(line.clone());
    Ok(line)
}

/// shell-command: run it on the real terminal, remember the status.
pub fn spawn(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    let line = read_command(ed, "!")?;
    ed.term.suspend_raw().map_err(EdError::Io)?;
    let status = Command::new(shell()).arg("-c").arg(&line).status();
    ed.term.resume_raw().map_err(EdError::Io)?;
    let status = status.map_err(EdError::Io)?;
    ed.rval = status.code().unwrap_or(-1);
    info!(cmd = %line, rval = ed.rval, "spawned");
    for w in &mut ed.wins {
        w.flags |= core_state::WFlags::HARD | core_state::WFlags::MODE;
    }
    Ok(())
}

/// pipe-command: capture a command's output into a pop-up buffer.
pub fn pipecmd(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    let line = read_command(ed, "@")?;
    let out = Command::new(shell())
        .arg("-c")
        .arg(&line)
        .stderr(Stdio::piped())
        .output()
        .map_err(EdError::Io)?;
    ed.rval = out.status.code().unwrap_or(-1);
    let mut text = String::from_utf8_lossy(&out.stdout).into_owned();
    if !out.stderr.is_empty() {
        text.push_str(&String::from_utf8_lossy(&out.stderr));
    }
    let id = scratch_buffer(ed, "[Output]", BufType::Special)?;
    core_exec::fill_buffer(ed, id, &text);
    let wix = ed.curw;
    ed.connect_window(wix, id);
    Ok(())
}

/// filter-buffer: the buffer's contents through a command's stdin,
/// replaced by its stdout. The original text survives a failing
/// child.
pub fn filter_buffer(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    ed.check_writable()?;
    let line = read_command(ed, "#")?;
    let id = ed.curb_id();
    let header = ed.bufs.get(id).header;
    let mut input = Vec::new();
    for lp in ed.lines.ring_iter(header) {
        input.extend_from_slice(ed.lbytes(lp));
        input.push(b'\n');
    }

    let mut child = Command::new(shell())
        .arg("-c")
        .arg(&line)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(EdError::Io)?;
    child
        .stdin
        .take()
        .ok_or_else(|| EdError::msg("No child stdin"))?
        .write_all(&input)
        .map_err(EdError::Io)?;
    let out = child.wait_with_output().map_err(EdError::Io)?;
    ed.rval = out.status.code().unwrap_or(-1);
    if !out.status.success() {
        return failed(format!("[Execution failed: status {}]", ed.rval));
    }

    crate::buffers::bclear(ed, id, true)?;
    let text = String::from_utf8_lossy(&out.stdout).into_owned();
    core_exec::fill_buffer(ed, id, &text);
    let first = ed.lines.forward(header);
    let w = ed.cur_win_mut();
    w.dot = (first, 0);
    w.top = first;
    ed.lchange(core_state::WFlags::HARD);
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

    fn contents(e: &Editor) -> String {
        let header = e.header();
        let lines: Vec<String> = e
            .lines
            .ring_iter(header)
            .map(|lp| String::from_utf8_lossy(e.lbytes(lp)).into_owned())
            .collect();
        lines.join("\n")
    }

    #[test]
    fn filter_buffer_through_sort() {
        let mut e = ed();
        let id = e.curb_id();
        core_exec::fill_buffer(&mut e, id, "pear\napple\nmango");
        e.exec.execstr = Some("sort".to_string());
        filter_buffer(&mut e, false, 1).unwrap();
        assert_eq!(contents(&e), "apple\nmango\npear");
        assert_eq!(e.rval, 0);
    }

    #[test]
    fn failing_filter_keeps_text() {
        let mut e = ed();
        let id = e.curb_id();
        core_exec::fill_buffer(&mut e, id, "keep me");
        e.exec.execstr = Some("\"exit 3\"".to_string());
        assert!(filter_buffer(&mut e, false, 1).is_err());
        assert_eq!(contents(&e), "keep me");
        assert_eq!(e.rval, 3);
    }

    #[test]
    fn pipe_command_pops_output() {
        let mut e = ed();
        e.exec.execstr = Some("\"echo hi\"".to_string());
        pipecmd(&mut e, false, 1).unwrap();
        assert_eq!(e.curb().name, "[Output]");
        assert!(contents(&e).contains("hi"));
    }

    #[test]
    fn spawn_records_status() {
        let mut e = ed();
        e.exec.execstr = Some("\"exit 7\"".to_string());
        spawn(&mut e, false, 1).unwrap();
        assert_eq!(e.rval, 7);
    }
}
