//! Cross-scanner and whole-command search checks.

use core_state::{Dir, Editor, Modes, PtPos, ScriptedTerm};

fn editor(text: &str) -> Editor {
    let mut ed = Editor::new(Box::new(ScriptedTerm::new()));
    let id = ed.curb_id();
    core_exec::fill_buffer(&mut ed, id, text);
    let first = ed.lines.forward(ed.header());
    ed.set_dot(first, 0);
    ed.cur_win_mut().top = first;
    ed.exec.clexec = true;
    ed
}

fn dot_ix(ed: &Editor) -> usize {
    core_search::scan::StreamMap::build(ed).index_of(ed.dot())
}

/// Scan with the pattern installed directly, reporting the match
/// start index (or None).
fn one_scan(ed: &mut Editor, pat: &str) -> Option<usize> {
    ed.search.set_pat(pat);
    match core_search::scanner(ed, Dir::Forward, PtPos::Beg) {
        Ok(true) => Some(dot_ix(ed)),
        _ => None,
    }
}

#[test]
fn fast_and_step_scanners_agree_on_literals() {
    let corpus = "The liTeral Needle in a literal haystack\nwith a second literal line";
    for pat in ["literal", "second", "Needle", "line", "zzz"] {
        // Fast path: plain buffer.
        let mut fast_ed = editor(corpus);
        let fast_hit = one_scan(&mut fast_ed, pat);
        // Step path: Equivalence mode forces the step scanner without
        // changing literal semantics.
        let mut step_ed = editor(corpus);
        step_ed.curb_mut().mode |= Modes::MAGIC | Modes::EQUIV;
        let step_hit = one_scan(&mut step_ed, pat);
        assert_eq!(fast_hit, step_hit, "scanner divergence for {pat:?}");
    }
}

#[test]
fn scanners_agree_under_exact_mode() {
    let corpus = "case Case CASE";
    for pat in ["Case", "CASE", "case"] {
        let mut fast_ed = editor(corpus);
        fast_ed.curb_mut().mode |= Modes::EXACT;
        let fast_hit = one_scan(&mut fast_ed, pat);
        let mut step_ed = editor(corpus);
        step_ed.curb_mut().mode |= Modes::EXACT | Modes::MAGIC | Modes::EQUIV;
        let step_hit = one_scan(&mut step_ed, pat);
        assert_eq!(fast_hit, step_hit, "exact-mode divergence for {pat:?}");
    }
}

#[test]
fn forward_hunts_never_overlap_with_option_off() {
    let mut ed = editor("aaaaaaa"); // "aa" fits six times overlapped
    ed.search.overlap = false;
    ed.exec.execstr = Some("\"aa\"".to_string());
    core_search::forwsearch(&mut ed, false, 1).unwrap();
    let mut ends = vec![dot_ix(&ed)];
    while core_search::forwhunt(&mut ed, false, 1).is_ok() {
        ends.push(dot_ix(&ed));
    }
    // Matches at 0..2, 2..4, 4..6: end indices strictly increase by
    // the whole match length.
    assert_eq!(ends, vec![2, 4, 6]);
}

#[test]
fn forward_hunts_overlap_by_up_to_len_minus_one() {
    let mut ed = editor("aaaa");
    ed.search.overlap = true;
    ed.exec.execstr = Some("\"aaa\"".to_string());
    core_search::forwsearch(&mut ed, false, 1).unwrap();
    assert_eq!(dot_ix(&ed), 3);
    // The second match shares two bytes with the first.
    core_search::forwhunt(&mut ed, false, 1).unwrap();
    assert_eq!(dot_ix(&ed), 4);
    let m = ed.search.last_match.unwrap();
    assert_eq!(m.len, 3);
}

#[test]
fn magic_double_word_query_replace() {
    let mut ed = editor("foo foo bar bar baz");
    ed.curb_mut().mode |= Modes::MAGIC;
    ed.exec.execstr = Some("\"([A-Za-z]+)\\s+\\1\" \"${1}\"".to_string());
    core_search::sreplace(&mut ed, false, 0).unwrap();
    let header = ed.header();
    let text: Vec<String> = ed
        .lines
        .ring_iter(header)
        .map(|lp| String::from_utf8_lossy(ed.lbytes(lp)).into_owned())
        .collect();
    assert_eq!(text.join("\n"), "foo bar baz");
}

#[test]
fn group_zero_length_spans_lines() {
    let mut ed = editor("start\nmiddle\nend");
    ed.curb_mut().mode |= Modes::MAGIC;
    ed.search.set_pat("t\\nmiddle\\ne");
    let hit = core_search::scanner(&mut ed, Dir::Forward, PtPos::Beg).unwrap();
    assert!(hit);
    let m = ed.search.last_match.unwrap();
    assert_eq!(m.len, 10);
    assert_eq!(ed.search.match_text(), "t\nmiddle\ne");
}
