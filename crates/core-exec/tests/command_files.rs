//! The command language end to end: stored procedures, control flow,
//! forced status, reexecution.

use core_state::{BufFlags, BufType, Editor, FuncOpts, Modes, NameEntry, NameTable, ScriptedTerm};

fn editor() -> Editor {
    let mut ed = Editor::new(Box::new(ScriptedTerm::new()));
    ed.names = NameTable::build(vec![
        NameEntry {
            name: "set",
            func: core_exec::commands::set,
            opts: FuncOpts::empty(),
        },
        NameEntry {
            name: "store-procedure",
            func: core_exec::commands::storeproc,
            opts: FuncOpts::empty(),
        },
        NameEntry {
            name: "execute-procedure",
            func: core_exec::commands::execproc,
            opts: FuncOpts::empty(),
        },
        NameEntry {
            name: "execute-buffer",
            func: core_exec::commands::execbuf,
            opts: FuncOpts::empty(),
        },
    ]);
    ed
}

fn run_lines(ed: &mut Editor, name: &str, lines: &[&str]) -> core_state::CmdResult {
    let id = ed
        .bufs
        .create(
            &mut ed.lines,
            name,
            BufType::Special,
            BufFlags::INVS,
            Modes::empty(),
        )
        .unwrap();
    core_exec::fill_buffer(ed, id, &lines.join("\n"));
    core_exec::dobuf(ed, id)
}

#[test]
fn procedure_definition_call_and_arguments() {
    let mut ed = editor();
    run_lines(
        &mut ed,
        "[boot]",
        &[
            "store-procedure count-up",
            "  set %n &add %n 1",
            "!endm",
            "set %n 0",
            "3 execute-procedure count-up",
        ],
    )
    .unwrap();
    assert_eq!(ed.uvar("n"), Some("3"));
}

#[test]
fn nested_while_with_break() {
    let mut ed = editor();
    run_lines(
        &mut ed,
        "[loops]",
        &[
            "set %total 0",
            "set %i 0",
            "!while &les %i 3",
            "  set %i &add %i 1",
            "  set %j 0",
            "  !while TRUE",
            "    set %j &add %j 1",
            "    set %total &add %total 1",
            "    !if &gre %j 1",
            "      !break",
            "    !endif",
            "  !endwhile",
            "!endwhile",
        ],
    )
    .unwrap();
    // Inner loop runs twice per outer pass.
    assert_eq!(ed.uvar("total"), Some("6"));
}

#[test]
fn goto_skips_and_labels_resolve() {
    let mut ed = editor();
    run_lines(
        &mut ed,
        "[goto]",
        &[
            "set %seen none",
            "!goto past",
            "set %seen wrong",
            "*past",
            "set %seen right",
        ],
    )
    .unwrap();
    assert_eq!(ed.uvar("seen"), Some("right"));
}

#[test]
fn force_records_true_status_and_continues() {
    let mut ed = editor();
    run_lines(
        &mut ed,
        "[force]",
        &[
            "!force execute-procedure does-not-exist",
            "set %after yes",
        ],
    )
    .unwrap();
    assert_eq!(ed.exec.force_status, "FAILED");
    assert_eq!(ed.uvar("after"), Some("yes"));
}

#[test]
fn return_stops_cleanly_finish_returns_false() {
    let mut ed = editor();
    run_lines(
        &mut ed,
        "[ret]",
        &["set %a 1", "!return", "set %a 2"],
    )
    .unwrap();
    assert_eq!(ed.uvar("a"), Some("1"));

    let status = run_lines(&mut ed, "[fin]", &["set %b 1", "!finish", "set %b 2"]);
    assert!(status.is_err());
    assert_eq!(ed.uvar("b"), Some("1"));
}

#[test]
fn reexecute_through_the_interpreter() {
    let mut ed = editor();
    core_exec::docmd(&mut ed, "set %x 5").unwrap();
    core_exec::docmd(&mut ed, "reexecute").unwrap();
    assert_eq!(ed.uvar("x"), Some("5"));
    // The remembered line survives the recursion: again.
    core_exec::docmd(&mut ed, "reexecute").unwrap();
    assert_eq!(ed.uvar("x"), Some("5"));
}

#[test]
fn interactive_argument_prompts_through_minibuffer() {
    let keys: Vec<u32> = "7\r".chars().map(|c| c as u32).collect();
    let mut ed = Editor::new(Box::new(ScriptedTerm::with_keys(keys)));
    ed.names = NameTable::build(vec![NameEntry {
        name: "set",
        func: core_exec::commands::set,
        opts: FuncOpts::empty(),
    }]);
    core_exec::docmd(&mut ed, "set %answer @\"How many?\"").unwrap();
    assert_eq!(ed.uvar("answer"), Some("7"));
}
