//! Whole-flow editing checks built on the public surface.

use core_edit::delete::ldelete;
use core_edit::insert::{linsert_byte, linstr};
use core_edit::motion::{forw_grapheme, gotobob, setmark};
use core_edit::region::upperregion;
use core_state::{Editor, ScriptedTerm};

fn editor() -> Editor {
    Editor::new(Box::new(ScriptedTerm::new()))
}

fn contents(ed: &Editor) -> String {
    let header = ed.header();
    let lines: Vec<String> = ed
        .lines
        .ring_iter(header)
        .map(|lp| String::from_utf8_lossy(ed.lbytes(lp)).into_owned())
        .collect();
    lines.join("\n")
}

#[test]
fn type_upcase_region_keeps_trailing_newline() {
    // Empty buffer: insert "abc\n", back to the start, uppercase the
    // whole line as a region.
    let mut ed = editor();
    linstr(&mut ed, b"abc\n").unwrap();
    assert!(!contents(&ed).is_empty());
    gotobob(&mut ed, false, 1).unwrap();
    setmark(&mut ed, false, 1).unwrap();
    core_edit::motion::gotoeob(&mut ed, false, 1).unwrap();
    core_edit::motion::swapmark(&mut ed, false, 1).unwrap();
    upperregion(&mut ed, false, 1).unwrap();
    assert_eq!(contents(&ed), "ABC");
    assert!(ed.curb().is_changed());
    // The newline at the end of the buffer stays implicit: one real
    // line, end-of-buffer right after it.
    let header = ed.header();
    assert_eq!(ed.lines.ring_iter(header).count(), 1);
}

#[test]
fn insert_delete_restores_bytes_and_positions() {
    let mut ed = editor();
    linstr(&mut ed, b"stable text").unwrap();
    let (lp, _) = ed.dot();
    ed.set_dot(lp, 4);
    ed.set_mark(Some((lp, 7)));
    ed.sysmark = Some((lp, 2));
    ed.pins.push((lp, 9));
    let before = contents(&ed);

    linsert_byte(&mut ed, 3, b'!').unwrap();
    ed.set_dot(lp, 4);
    ldelete(&mut ed, 3, false).unwrap();

    assert_eq!(contents(&ed), before);
    assert_eq!(ed.dot(), (lp, 4));
    assert_eq!(ed.mark(), Some((lp, 7)));
    assert_eq!(ed.sysmark, Some((lp, 2)));
    assert_eq!(ed.pins[0], (lp, 9));
}

#[test]
fn grapheme_motion_round_trip_matches_reverse_walk() {
    let mut ed = editor();
    linstr(&mut ed, "ae\u{0301}\u{030A}漢x".as_bytes()).unwrap();
    gotobob(&mut ed, false, 1).unwrap();
    let mut forward = vec![ed.dot()];
    while forw_grapheme(&mut ed, 1).is_ok() {
        forward.push(ed.dot());
    }
    let mut backward = vec![ed.dot()];
    while core_edit::motion::back_grapheme(&mut ed, 1).is_ok() {
        backward.push(ed.dot());
    }
    backward.reverse();
    assert_eq!(forward, backward);
}

#[test]
fn kill_accretion_across_commands() {
    let mut ed = editor();
    linstr(&mut ed, b"one two three").unwrap();
    gotobob(&mut ed, false, 1).unwrap();
    // Two consecutive word kills accrete into one slot.
    core_edit::word::delfword(&mut ed, false, 1).unwrap();
    ed.lastflag = ed.thisflag;
    core_edit::word::delfword(&mut ed, false, 1).unwrap();
    assert_eq!(ed.kill.top().to_vec(), b"one two ");
    // A kill after a non-kill command starts a fresh slot.
    ed.lastflag = core_state::CmdFlags::empty();
    core_edit::word::delfword(&mut ed, false, 1).unwrap();
    assert_eq!(ed.kill.top().to_vec(), b"three");
    assert_eq!(ed.kill.slot(1).to_vec(), b"one two ");
}
