//! Word-wise motion, case, and deletion, plus the wrap helper used in
//! Wrap mode.

use unicode_general_category::{GeneralCategory, get_general_category};

use core_state::{CmdResult, Editor, WFlags, failed};
use core_text::case::{CaseWork, recase};
use core_text::grapheme::build_grapheme;
use core_text::utf8::NOCHAR;

use crate::delete::{kill_begin, ldelete, ldelgrapheme};
use crate::motion::{back_grapheme, forw_grapheme};

/// Is this codepoint part of a word (letter, number or underscore)?
pub fn is_word_cp(uc: u32) -> bool {
    if uc == b'_' as u32 {
        return true;
    }
    let Some(c) = char::from_u32(uc) else {
        return false;
    };
    matches!(
        get_general_category(c),
        GeneralCategory::UppercaseLetter
            | GeneralCategory::LowercaseLetter
            | GeneralCategory::TitlecaseLetter
            | GeneralCategory::ModifierLetter
            | GeneralCategory::OtherLetter
            | GeneralCategory::DecimalNumber
            | GeneralCategory::LetterNumber
            | GeneralCategory::OtherNumber
    )
}

/// Is dot inside a word?
pub fn inword(ed: &Editor) -> bool {
    let (lp, off) = ed.dot();
    if lp == ed.header() || off >= ed.llen(lp) {
        return false;
    }
    let bytes = ed.lbytes(lp);
    let (g, _) = build_grapheme(bytes, off, bytes.len(), false);
    g.uc != NOCHAR && is_word_cp(g.uc)
}

/// Move forward `n` words; lands at the start of the next word (or
/// its end when the forward-to-end option is set).
pub fn forwword(ed: &mut Editor, _f: bool, n: i32) -> CmdResult {
    if n < 0 {
        return backword(ed, false, -n);
    }
    for _ in 0..n {
        if ed.opts.forw_word_end {
            // To the start of a word, then over it.
            while !inword(ed) {
                forw_grapheme(ed, 1)?;
            }
            while inword(ed) {
                forw_grapheme(ed, 1)?;
            }
        } else {
            while inword(ed) {
                forw_grapheme(ed, 1)?;
            }
            while !inword(ed) {
                forw_grapheme(ed, 1)?;
            }
        }
    }
    Ok(())
}

/// Move backward `n` words; lands on the first grapheme of the word.
pub fn backword(ed: &mut Editor, _f: bool, n: i32) -> CmdResult {
    if n < 0 {
        return forwword(ed, false, -n);
    }
    for _ in 0..n {
        back_grapheme(ed, 1)?;
        while !inword(ed) {
            back_grapheme(ed, 1)?;
        }
        while inword(ed) {
            if back_grapheme(ed, 1).is_err() {
                return Ok(()); // word starts the buffer
            }
        }
        forw_grapheme(ed, 1)?;
    }
    Ok(())
}

/// Recase the grapheme at dot in place.
pub(crate) fn ensure_case(ed: &mut Editor, want: CaseWork) -> CmdResult {
    ed.check_writable()?;
    let (lp, off) = ed.dot();
    if lp == ed.header() || off >= ed.llen(lp) {
        return Ok(());
    }
    let bytes = ed.lbytes(lp);
    let (_, next) = build_grapheme(bytes, off, bytes.len(), false);
    let src = bytes[off..next].to_vec();
    let out = recase(want, &src);
    if out.bytes != src {
        ed.lchange(WFlags::EDIT);
        let delta = out.bytes.len() as isize - src.len() as isize;
        {
            let text = ed.lines.text_mut(lp);
            text.delete_at(off, src.len());
            text.insert_at(off, &out.bytes);
        }
        if delta != 0 {
            // Later offsets on this line shift with the change.
            crate::region::shift_after(ed, lp, off + src.len(), delta);
        }
    }
    Ok(())
}

fn case_word(ed: &mut Editor, n: i32, first: CaseWork, rest: CaseWork) -> CmdResult {
    if n < 0 {
        return failed("Bad repeat count");
    }
    for _ in 0..n {
        while !inword(ed) {
            forw_grapheme(ed, 1)?;
        }
        ensure_case(ed, first)?;
        forw_grapheme(ed, 1)?;
        while inword(ed) {
            ensure_case(ed, rest)?;
            forw_grapheme(ed, 1)?;
        }
    }
    Ok(())
}

pub fn upperword(ed: &mut Editor, _f: bool, n: i32) -> CmdResult {
    case_word(ed, n, CaseWork::Upper, CaseWork::Upper)
}

pub fn lowerword(ed: &mut Editor, _f: bool, n: i32) -> CmdResult {
    case_word(ed, n, CaseWork::Lower, CaseWork::Lower)
}

pub fn capword(ed: &mut Editor, _f: bool, n: i32) -> CmdResult {
    case_word(ed, n, CaseWork::Upper, CaseWork::Lower)
}

/// Delete `n` words forward, killing the text.
pub fn delfword(ed: &mut Editor, _f: bool, n: i32) -> CmdResult {
    if n < 0 {
        return failed("Bad repeat count");
    }
    kill_begin(ed);
    for _ in 0..n {
        while inword(ed) {
            ldelgrapheme(ed, 1, true)?;
        }
        while !inword(ed) {
            let (lp, off) = ed.dot();
            if lp == ed.header() && off == 0 {
                return Ok(());
            }
            ldelgrapheme(ed, 1, true)?;
        }
    }
    Ok(())
}

/// Byte distance from `from` to `to` walking forward (newlines count
/// one byte each).
fn bytes_between(ed: &Editor, from: (core_state::LineId, usize), to: (core_state::LineId, usize)) -> u64 {
    let header = ed.header();
    let (mut lp, mut off) = from;
    let mut n = 0u64;
    while (lp, off) != to {
        if off >= ed.llen(lp) {
            if lp == header {
                break;
            }
            lp = ed.lforw(lp);
            off = 0;
        } else {
            off += 1;
        }
        n += 1;
    }
    n
}

/// Delete `n` words backward, killing the text (in buffer order).
pub fn delbword(ed: &mut Editor, _f: bool, n: i32) -> CmdResult {
    if n < 0 {
        return failed("Bad repeat count");
    }
    kill_begin(ed);
    let orig = ed.dot();
    for _ in 0..n {
        back_grapheme(ed, 1)?;
        while !inword(ed) {
            back_grapheme(ed, 1)?;
        }
        while inword(ed) {
            if back_grapheme(ed, 1).is_err() {
                break;
            }
        }
        if !inword(ed) {
            forw_grapheme(ed, 1)?;
        }
    }
    let span = bytes_between(ed, ed.dot(), orig);
    ldelete(ed, span, true)
}

/// Wrap the word under construction back to a fresh line. Called when
/// a space is typed past the fill column in Wrap mode.
pub fn wrap_word(ed: &mut Editor) -> CmdResult {
    let (lp, doto) = ed.dot();
    let bytes = ed.lbytes(lp);
    // Find the last space before dot.
    let mut break_at = None;
    for (ix, b) in bytes[..doto].iter().enumerate() {
        if *b == b' ' || *b == b'\t' {
            break_at = Some(ix);
        }
    }
    let Some(break_at) = break_at else {
        return Ok(()); // one unbreakable word
    };
    let saved = ed.dot();
    ed.set_dot(lp, break_at);
    // Replace the space with a line break.
    crate::delete::ldelete(ed, 1, false)?;
    crate::insert::lnewline_opt(ed, true)?;
    // Dot returns to the (shifted) original position.
    let (new_lp, _) = ed.dot();
    let shifted = saved.1 - break_at - 1;
    ed.set_dot(new_lp, shifted.min(ed.llen(new_lp)));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{contents, editor_with};

    #[test]
    fn word_motion() {
        let mut ed = editor_with("one two  three");
        forwword(&mut ed, false, 1).unwrap();
        assert_eq!(ed.dot().1, 4); // start of "two"
        forwword(&mut ed, false, 1).unwrap();
        assert_eq!(ed.dot().1, 9); // start of "three"
        backword(&mut ed, false, 2).unwrap();
        assert_eq!(ed.dot().1, 0);
    }

    #[test]
    fn word_motion_to_end_option() {
        let mut ed = editor_with("one two");
        ed.opts.forw_word_end = true;
        forwword(&mut ed, false, 1).unwrap();
        assert_eq!(ed.dot().1, 3); // end of "one"
    }

    #[test]
    fn case_commands() {
        let mut ed = editor_with("hello world");
        capword(&mut ed, false, 1).unwrap();
        assert_eq!(contents(&ed), "Hello world");
        upperword(&mut ed, false, 1).unwrap();
        assert_eq!(contents(&ed), "Hello WORLD");
    }

    #[test]
    fn unicode_words() {
        let mut ed = editor_with("γειά σου");
        capword(&mut ed, false, 1).unwrap();
        assert_eq!(contents(&ed), "Γειά σου");
    }

    #[test]
    fn delete_word_forward() {
        let mut ed = editor_with("one two three");
        delfword(&mut ed, false, 1).unwrap();
        assert_eq!(contents(&ed), "two three");
        assert_eq!(ed.kill.top().to_vec(), b"one ");
    }

    #[test]
    fn delete_word_backward() {
        let mut ed = editor_with("one two");
        crate::motion::gotoeol(&mut ed, false, 1).unwrap();
        delbword(&mut ed, false, 1).unwrap();
        assert_eq!(contents(&ed), "one ");
    }

    #[test]
    fn wrap_breaks_at_last_space() {
        let mut ed = editor_with("alpha beta gamma");
        let (lp, _) = ed.dot();
        ed.set_dot(lp, 16);
        wrap_word(&mut ed).unwrap();
        assert_eq!(contents(&ed), "alpha beta\ngamma");
        let (nlp, off) = ed.dot();
        assert_eq!(ed.lbytes(nlp), b"gamma");
        assert_eq!(off, 5);
    }
}
