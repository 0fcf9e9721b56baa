//! Insertion primitives and the commands built on them.

use core_state::{CmdResult, Editor, Modes, StrBuf, WFlags, failed};
use core_text::utf8;

use crate::{fixup_insert, fixup_moveline};

/// Insert `n` copies of byte `c` at dot. At the very end of the
/// buffer a new line is appended. Window dots at or past the point
/// advance; marks and pins only when strictly past.
pub fn linsert_byte(ed: &mut Editor, n: usize, c: u8) -> CmdResult {
    ed.check_writable()?;
    ed.lchange(WFlags::EDIT);
    let (lp, doto) = ed.dot();
    if lp == ed.header() {
        // Appending at the end: dot must be at offset 0 of the
        // sentinel.
        if doto != 0 {
            return failed("bug: insert at header offset");
        }
        let text = StrBuf::from_bytes(&vec![c; n]);
        let newlp = ed.lines.alloc(text);
        ed.lines.link_before(lp, newlp);
        // Windows looking at the sentinel as their top start showing
        // the new last line instead.
        for w in &mut ed.wins {
            if w.top == lp {
                w.top = newlp;
            }
        }
        ed.set_dot(newlp, n);
        return Ok(());
    }
    {
        let text = ed.lines.text_mut(lp);
        let bytes = vec![c; n];
        text.insert_at(doto, &bytes);
    }
    fixup_insert(ed, lp, doto, n);
    Ok(())
}

/// Insert `n` copies of a codepoint (encoded as UTF-8).
pub fn linsert_uc(ed: &mut Editor, n: usize, uc: u32) -> CmdResult {
    if uc <= 0x7f {
        return linsert_byte(ed, n, uc as u8);
    }
    let bytes = utf8::encode_vec(uc);
    for _ in 0..n {
        for &b in &bytes {
            linsert_byte(ed, 1, b)?;
        }
    }
    Ok(())
}

/// Split the current line at dot. Marks strictly past dot move with
/// the suffix; dot moves with the suffix when at or past the split.
/// With `force` set, a newline is created even at the very end of the
/// buffer (yank needs the real line).
pub fn lnewline_opt(ed: &mut Editor, force: bool) -> CmdResult {
    ed.check_writable()?;
    ed.lchange(WFlags::HARD | WFlags::INS);
    let (lp, doto) = ed.dot();
    let header = ed.header();

    if lp == header {
        // On the sentinel: a fresh empty line goes in front of it.
        let newlp = ed.lines.alloc(StrBuf::new());
        ed.lines.link_before(header, newlp);
        for w in &mut ed.wins {
            if w.top == header {
                w.top = newlp;
            }
        }
        return Ok(());
    }

    let len = ed.llen(lp);
    if !force && len > 0 && doto == len && ed.lforw(lp) == header {
        // End of the last real line: the newline is implicit, just
        // step onto the sentinel.
        ed.set_dot(header, 0);
        return Ok(());
    }

    // Split: the suffix beyond dot moves into a fresh line.
    let suffix = ed.lines.text(lp).bytes()[doto..].to_vec();
    let newlp = ed.lines.alloc(StrBuf::from_bytes(&suffix));
    ed.lines.text_mut(lp).truncate(doto);
    ed.lines.link_after(lp, newlp);

    for w in &mut ed.wins {
        if w.dot.0 == lp && w.dot.1 >= doto {
            w.dot = (newlp, w.dot.1 - doto);
        }
        if let Some(m) = &mut w.mark
            && m.0 == lp
            && m.1 > doto
        {
            *m = (newlp, m.1 - doto);
        }
    }
    if let Some(sm) = &mut ed.sysmark
        && sm.0 == lp
        && sm.1 > doto
    {
        *sm = (newlp, sm.1 - doto);
    }
    for p in &mut ed.pins {
        if p.0 == lp && p.1 > doto {
            *p = (newlp, p.1 - doto);
        }
    }
    Ok(())
}

pub fn lnewline(ed: &mut Editor) -> CmdResult {
    lnewline_opt(ed, false)
}

/// Insert a UTF-8 string at dot, breaking internal newlines into line
/// splits. `force_nl` is used by yank so trailing newlines create
/// real lines at the end of the buffer.
pub fn linstr_opt(ed: &mut Editor, s: &[u8], force_nl: bool) -> CmdResult {
    ed.check_writable()?;
    for &b in s {
        if b == b'\n' {
            lnewline_opt(ed, force_nl)?;
        } else {
            linsert_byte(ed, 1, b)?;
        }
    }
    Ok(())
}

pub fn linstr(ed: &mut Editor, s: &[u8]) -> CmdResult {
    linstr_opt(ed, s, false)
}

/// Join the current line with the next one (delete the implicit
/// newline at dot's line end).
pub fn ldelnewline(ed: &mut Editor) -> CmdResult {
    ed.check_writable()?;
    let (lp1, _) = ed.dot();
    let header = ed.header();
    if lp1 == header {
        return Ok(());
    }
    let lp2 = ed.lforw(lp1);
    if ed.llen(lp1) == 0 {
        // A blank line is simply removed; everything parked on it
        // lands at the start of the next line.
        for w in &mut ed.wins {
            if w.dot.0 == lp1 {
                w.dot = (lp2, 0);
            }
            if let Some(m) = &mut w.mark
                && m.0 == lp1
            {
                *m = (lp2, 0);
            }
            if w.top == lp1 {
                w.top = lp2;
            }
        }
        if let Some(sm) = &mut ed.sysmark
            && sm.0 == lp1
        {
            *sm = (lp2, 0);
        }
        for p in &mut ed.pins {
            if p.0 == lp1 {
                *p = (lp2, 0);
            }
        }
        ed.lines.remove(lp1);
        return Ok(());
    }
    if lp2 == header {
        return Ok(());
    }
    let orig_len = ed.llen(lp1);
    let tail = ed.lines.text(lp2).bytes().to_vec();
    ed.lines.text_mut(lp1).append(&tail);
    fixup_moveline(ed, lp2, lp1, orig_len);
    ed.lines.remove(lp2);
    Ok(())
}

// ---- commands ----

/// Insert a newline; in C mode nothing fancy happens here (the fence
/// matching lives with the painter).
pub fn insert_newline(ed: &mut Editor, _f: bool, n: i32) -> CmdResult {
    if n < 0 {
        return failed("Bad repeat count");
    }
    for _ in 0..n {
        lnewline(ed)?;
    }
    Ok(())
}

/// Open a line: insert a newline after dot, leaving dot in place.
pub fn openline(ed: &mut Editor, _f: bool, n: i32) -> CmdResult {
    if n < 0 {
        return failed("Bad repeat count");
    }
    if n == 0 {
        return Ok(());
    }
    let dot = ed.dot();
    for _ in 0..n {
        lnewline_opt(ed, true)?;
    }
    ed.set_dot(dot.0, dot.1);
    Ok(())
}

/// Insert spaces without moving dot.
pub fn insspace(ed: &mut Editor, _f: bool, n: i32) -> CmdResult {
    if n < 0 {
        return failed("Bad repeat count");
    }
    let dot = ed.dot();
    linsert_byte(ed, n as usize, b' ')?;
    ed.set_dot(dot.0, dot.1);
    Ok(())
}

/// Insert a tab (hard tab).
pub fn insert_tab(ed: &mut Editor, _f: bool, n: i32) -> CmdResult {
    if n < 0 {
        return failed("Bad repeat count");
    }
    linsert_byte(ed, n as usize, b'\t')
}

/// Prompted string insert.
pub fn istring(ed: &mut Editor, _f: bool, n: i32) -> CmdResult {
    let s = core_exec::nextarg(ed, "String to insert: ", core_complete::Cmplt::None)?;
    for _ in 0..n.max(1) {
        linstr(ed, s.as_bytes())?;
    }
    Ok(())
}

/// Insert the next keystroke literally.
pub fn quote_char(ed: &mut Editor, _f: bool, n: i32) -> CmdResult {
    if n < 0 {
        return failed("Bad repeat count");
    }
    let c = core_input::ectoc(core_input::get1key(ed)?);
    if c == b'\n' as u32 {
        for _ in 0..n {
            lnewline(ed)?;
        }
        return Ok(());
    }
    linsert_uc(ed, n as usize, c)
}

/// Self-insert for a typed codepoint, honouring Overwrite and
/// Phonetic modes and word wrap.
pub fn self_insert(ed: &mut Editor, c: u32, n: i32) -> CmdResult {
    if n < 0 {
        return failed("Bad repeat count");
    }
    for _ in 0..n {
        // Wrap mode: crossing the fill column on whitespace wraps the
        // word back to a new line.
        if ed.curb().mode.contains(Modes::WRAP)
            && ed.fillcol > 0
            && (c == b' ' as u32 || c == b'\t' as u32)
        {
            let (lp, doto) = ed.dot();
            let col = core_text::width::display_col(ed.lbytes(lp), doto, ed.tabstop);
            if col > ed.fillcol {
                crate::word::wrap_word(ed)?;
            }
        }
        if ed.curb().mode.contains(Modes::OVER) {
            let (lp, doto) = ed.dot();
            if doto < ed.llen(lp) && ed.lines.text(lp).byte_at(doto) != b'\t' {
                crate::delete::ldelgrapheme(ed, 1, false)?;
            }
        }
        if !(ed.curb().mode.contains(Modes::PHON)
            && ed.ptt.is_some()
            && crate::phonetic::ptt_handler(ed, c).is_ok())
        {
            linsert_uc(ed, 1, c)?;
        }
    }
    // Autosave accounting happens per keystroke of real input.
    if ed.curb().mode.contains(Modes::ASAVE) {
        ed.acount -= 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{contents, editor_with};

    #[test]
    fn insert_into_empty_buffer() {
        let mut ed = editor_with("");
        linsert_byte(&mut ed, 3, b'x').unwrap();
        assert_eq!(contents(&ed), "xxx");
        let (lp, doto) = ed.dot();
        assert_eq!(doto, 3);
        assert_ne!(lp, ed.header());
    }

    #[test]
    fn insert_shifts_dot_not_mark_at_point() {
        let mut ed = editor_with("abcd");
        let (lp, _) = ed.dot();
        ed.set_dot(lp, 2);
        ed.set_mark(Some((lp, 2)));
        linsert_byte(&mut ed, 2, b'!').unwrap();
        assert_eq!(contents(&ed), "ab!!cd");
        assert_eq!(ed.dot().1, 4);
        assert_eq!(ed.mark().unwrap().1, 2);
    }

    #[test]
    fn newline_splits_and_moves_suffix() {
        let mut ed = editor_with("hello");
        let (lp, _) = ed.dot();
        ed.set_dot(lp, 2);
        ed.set_mark(Some((lp, 4)));
        lnewline(&mut ed).unwrap();
        assert_eq!(contents(&ed), "he\nllo");
        let (dlp, doto) = ed.dot();
        assert_eq!(doto, 0);
        assert_eq!(dlp, ed.lforw(lp));
        let (mlp, moff) = ed.mark().unwrap();
        assert_eq!(mlp, dlp);
        assert_eq!(moff, 2);
    }

    #[test]
    fn newline_at_end_of_last_line_is_implicit() {
        let mut ed = editor_with("abc");
        let (lp, _) = ed.dot();
        ed.set_dot(lp, 3);
        lnewline(&mut ed).unwrap();
        assert_eq!(contents(&ed), "abc");
        assert!(ed.at_eob());
    }

    #[test]
    fn forced_newline_creates_real_line() {
        let mut ed = editor_with("abc");
        let (lp, _) = ed.dot();
        ed.set_dot(lp, 3);
        lnewline_opt(&mut ed, true).unwrap();
        assert_eq!(contents(&ed), "abc\n");
    }

    #[test]
    fn linstr_breaks_newlines() {
        let mut ed = editor_with("");
        linstr(&mut ed, b"one\ntwo").unwrap();
        assert_eq!(contents(&ed), "one\ntwo");
    }

    #[test]
    fn join_lines_keeps_positions() {
        let mut ed = editor_with("ab\ncd");
        let first = ed.lines.forward(ed.header());
        let second = ed.lforw(first);
        ed.set_mark(Some((second, 1)));
        ed.set_dot(first, 2);
        ldelnewline(&mut ed).unwrap();
        assert_eq!(contents(&ed), "abcd");
        assert_eq!(ed.mark().unwrap(), (first, 3));
    }

    #[test]
    fn multibyte_insert() {
        let mut ed = editor_with("");
        linsert_uc(&mut ed, 1, 0x00e9).unwrap(); // é
        linsert_uc(&mut ed, 1, b'z' as u32).unwrap();
        assert_eq!(contents(&ed), "éz");
    }

    #[test]
    fn view_mode_refuses() {
        let mut ed = editor_with("x");
        ed.curb_mut().mode |= Modes::VIEW;
        assert!(linsert_byte(&mut ed, 1, b'y').is_err());
    }

    #[test]
    fn openline_leaves_dot() {
        let mut ed = editor_with("abc");
        let (lp, _) = ed.dot();
        ed.set_dot(lp, 1);
        openline(&mut ed, false, 1).unwrap();
        assert_eq!(contents(&ed), "a\nbc");
        assert_eq!(ed.dot(), (lp, 1));
    }
}
