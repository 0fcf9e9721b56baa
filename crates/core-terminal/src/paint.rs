//! Screen painter: windows, modelines, the message line, cursor
//! placement. A straightforward full-window repaint driven by the
//! window flag bits.

use unicode_width::UnicodeWidthChar;

use core_state::{BufFlags, Editor, LineId, Modes, WFlags};
use core_text::utf8::decode;
use core_text::width::display_col;

/// Render raw line bytes into cells: tabs expand, control bytes show
/// as `^X`, the region before `fcol` is scrolled off, and the result
/// clips at `cols`.
fn render_line(bytes: &[u8], fcol: usize, cols: usize, tabstop: usize) -> String {
    let mut cells = String::new();
    let mut col = 0usize;
    let mut ix = 0usize;
    while ix < bytes.len() {
        let (uc, used) = decode(bytes, ix, bytes.len());
        ix += used;
        let piece: String = if uc == b'\t' as u32 {
            let width = tabstop - (col % tabstop);
            " ".repeat(width)
        } else if uc < 0x20 || uc == 0x7f {
            format!("^{}", ((uc as u8 & 0x3f) + b'@') as char)
        } else {
            char::from_u32(uc).map(String::from).unwrap_or_default()
        };
        let w: usize = piece
            .chars()
            .map(|c| UnicodeWidthChar::width(c).unwrap_or(0))
            .sum();
        if col + w > fcol {
            cells.push_str(&piece);
        }
        col += w;
        if col >= fcol + cols {
            break;
        }
    }
    cells
}

fn modeline(ed: &Editor, wix: usize) -> String {
    let w = &ed.wins[wix];
    let b = ed.bufs.get(w.buf);
    let chg = if b.flags.contains(BufFlags::CHG) {
        "*"
    } else {
        "-"
    };
    let nar = if b.flags.contains(BufFlags::NARROW) {
        "<>"
    } else {
        ""
    };
    let mut modes: Vec<&str> = Vec::new();
    for (ix, name) in Modes::NAMES.iter().enumerate() {
        if b.mode.bits() & (1 << ix) != 0 {
            modes.push(name);
        }
    }
    let ptt = match ed.ptt {
        Some(id) if b.mode.contains(Modes::PHON) => ed
            .bufs
            .get(id)
            .ptt
            .as_ref()
            .map(|t| t.display_code.clone())
            .unwrap_or_default(),
        _ => String::new(),
    };
    let mut line = format!(
        "-{chg}{nar} {} ({}) {} {}",
        b.name,
        modes.join(" "),
        ptt,
        b.fname
    );
    let cols = ed.term.size().1;
    while line.chars().count() < cols {
        line.push('-');
    }
    line.chars().take(cols).collect()
}

/// Keep dot framed inside the window, honouring a forced row.
fn reframe(ed: &mut Editor, wix: usize) {
    let (dotp, _) = ed.wins[wix].dot;
    let header = ed.bufs.get(ed.wins[wix].buf).header;
    let rows = ed.wins[wix].ntrows;

    // Is dot already visible from the current top?
    let mut lp = ed.wins[wix].top;
    let mut visible = false;
    if !ed.wins[wix].flags.contains(WFlags::FORCE) {
        for _ in 0..rows {
            if lp == dotp {
                visible = true;
                break;
            }
            if lp == header {
                break;
            }
            lp = ed.lines.forward(lp);
        }
    }
    if visible {
        return;
    }
    // Centre dot (or put it on the forced row).
    let force = ed.wins[wix].force;
    let up = if ed.wins[wix].flags.contains(WFlags::FORCE) && force > 0 {
        (force as usize - 1).min(rows - 1)
    } else {
        rows / 2
    };
    let mut top = dotp;
    for _ in 0..up {
        let prev = ed.lines.back(top);
        if prev == header {
            break;
        }
        top = prev;
    }
    ed.wins[wix].top = top;
    ed.wins[wix].flags.remove(WFlags::FORCE);
    ed.wins[wix].flags |= WFlags::HARD;
}

struct DrawOp {
    row: usize,
    text: String,
    reverse: bool,
}

/// Paint every window that asked for it, the message line, and land
/// the cursor on dot.
pub fn update(ed: &mut Editor) {
    for wix in 0..ed.wins.len() {
        reframe(ed, wix);
    }

    let (rows, cols) = ed.term.size();
    let tabstop = ed.tabstop;
    let mut ops: Vec<DrawOp> = Vec::new();

    for wix in 0..ed.wins.len() {
        let w = &ed.wins[wix];
        if w.flags.is_empty() {
            continue;
        }
        let header = ed.bufs.get(w.buf).header;
        let mut lp: LineId = w.top;
        for row in 0..w.ntrows {
            let text = if lp != header {
                let rendered = render_line(ed.lbytes(lp), w.fcol, cols, tabstop);
                lp = ed.lines.forward(lp);
                rendered
            } else {
                String::new()
            };
            ops.push(DrawOp {
                row: w.toprow + row,
                text,
                reverse: false,
            });
        }
        ops.push(DrawOp {
            row: w.toprow + w.ntrows,
            text: modeline(ed, wix),
            reverse: true,
        });
    }

    // Cursor from the current window's dot.
    let cursor = {
        let w = ed.cur_win();
        let header = ed.bufs.get(w.buf).header;
        let mut lp = w.top;
        let mut row = w.toprow;
        for _ in 0..w.ntrows {
            if lp == w.dot.0 {
                break;
            }
            if lp == header {
                break;
            }
            lp = ed.lines.forward(lp);
            row += 1;
        }
        let col = if w.dot.0 == header {
            0
        } else {
            display_col(ed.lbytes(w.dot.0), w.dot.1, tabstop).saturating_sub(w.fcol)
        };
        (row, col.min(cols.saturating_sub(1)))
    };

    let msg = if ed.msg.pending {
        Some(ed.msg.text.clone())
    } else {
        None
    };

    for op in &ops {
        ed.term.move_to(op.row, 0);
        if op.reverse {
            ed.term.rev(true);
        }
        ed.term.put_str(&op.text);
        ed.term.erase_eol();
        if op.reverse {
            ed.term.rev(false);
        }
    }
    if let Some(msg) = msg {
        ed.term.move_to(rows.saturating_sub(1), 0);
        ed.term.put_str(&msg);
        ed.term.erase_eol();
        ed.msg.pending = false;
    }
    ed.term.move_to(cursor.0, cursor.1);
    ed.term.flush();

    for w in &mut ed.wins {
        w.flags = WFlags::empty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_state::ScriptedTerm;

    #[test]
    fn control_bytes_render_caret() {
        assert_eq!(render_line(&[0x01, b'a'], 0, 80, 8), "^Aa");
    }

    #[test]
    fn tabs_expand_to_stops() {
        assert_eq!(render_line(b"a\tb", 0, 80, 8), "a       b");
    }

    #[test]
    fn horizontal_scroll_drops_prefix() {
        assert_eq!(render_line(b"abcdef", 2, 80, 8), "cdef");
    }

    #[test]
    fn update_emits_modeline_and_text() {
        let mut ed = Editor::new(Box::new(ScriptedTerm::new()));
        let id = ed.curb_id();
        // Editors start with everything dirty, so one update paints.
        core_state_fill(&mut ed, id, "hello");
        update(&mut ed);
        // Repaint cleared the flags.
        assert!(ed.wins.iter().all(|w| w.flags.is_empty()));
    }

    fn core_state_fill(ed: &mut Editor, id: core_state::BufId, text: &str) {
        let header = ed.bufs.get(id).header;
        let lp = ed.lines.alloc(core_state::StrBuf::from_bytes(text.as_bytes()));
        ed.lines.link_before(header, lp);
        let w = ed.cur_win_mut();
        w.dot = (lp, 0);
        w.top = lp;
    }
}
