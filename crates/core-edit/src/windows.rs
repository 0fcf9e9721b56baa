//! Window commands: split, delete, cycle, resize.

use core_state::{CmdResult, Editor, WFlags, Window, failed};

fn mark_all_hard(ed: &mut Editor) {
    for w in &mut ed.wins {
        w.flags |= WFlags::HARD | WFlags::MODE;
    }
}

/// Split the current window in two. An argument of 1 keeps dot in
/// the upper half, 2 in the lower.
pub fn splitwind(ed: &mut Editor, f: bool, n: i32) -> CmdResult {
    let cur = ed.curw;
    let w = &ed.wins[cur];
    if w.ntrows < 3 {
        return failed(format!("Cannot split a {} line window", w.ntrows));
    }
    let total = w.ntrows;
    let upper_rows = (total - 1) / 2;
    let lower_rows = total - upper_rows - 1;
    let buf = w.buf;
    let dot = w.dot;
    let top = w.top;

    let mut lower = Window::new(buf, top, w.toprow + upper_rows + 1, lower_rows);
    lower.dot = dot;
    lower.mark = w.mark;
    {
        let upper = &mut ed.wins[cur];
        upper.ntrows = upper_rows;
        upper.flags |= WFlags::HARD | WFlags::MODE;
    }
    ed.bufs.get_mut(buf).nwnd += 1;
    ed.wins.insert(cur + 1, lower);

    // Keep dot in the chosen half.
    let pick_lower = f && n == 2;
    ed.curw = if pick_lower { cur + 1 } else { cur };
    mark_all_hard(ed);
    Ok(())
}

/// Delete the other windows, keeping the current one full height.
pub fn onlywind(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    let keep = ed.curw;
    let kept_buf = ed.wins[keep].buf;
    let closing: Vec<usize> = (0..ed.wins.len()).filter(|&ix| ix != keep).collect();
    for &ix in closing.iter().rev() {
        let w = ed.wins.remove(ix);
        let locs = w.locs();
        let b = ed.bufs.get_mut(w.buf);
        b.nwnd -= 1;
        if b.nwnd == 0 {
            b.b = locs;
        }
    }
    ed.curw = 0;
    debug_assert_eq!(ed.wins[0].buf, kept_buf);
    let rows = ed.term.size().0;
    core_state::relayout(&mut ed.wins, rows);
    mark_all_hard(ed);
    Ok(())
}

/// Delete the current window, giving its rows to a neighbour.
pub fn delwind(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    if ed.wins.len() == 1 {
        return failed("Cannot delete the only window");
    }
    let w = ed.wins.remove(ed.curw);
    let locs = w.locs();
    let b = ed.bufs.get_mut(w.buf);
    b.nwnd -= 1;
    if b.nwnd == 0 {
        b.b = locs;
    }
    if ed.curw >= ed.wins.len() {
        ed.curw = ed.wins.len() - 1;
    }
    let rows = ed.term.size().0;
    core_state::relayout(&mut ed.wins, rows);
    mark_all_hard(ed);
    Ok(())
}

/// Move to the next window (wrapping).
pub fn nextwind(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    ed.curw = (ed.curw + 1) % ed.wins.len();
    Ok(())
}

/// Move to the previous window (wrapping).
pub fn prevwind(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    ed.curw = (ed.curw + ed.wins.len() - 1) % ed.wins.len();
    Ok(())
}

/// Grow the current window by `n` rows at a neighbour's expense.
pub fn enlargewind(ed: &mut Editor, _f: bool, n: i32) -> CmdResult {
    if n < 0 {
        return shrinkwind(ed, false, -n);
    }
    if ed.wins.len() == 1 {
        return failed("Only one window");
    }
    let n = n as usize;
    let cur = ed.curw;
    let victim = if cur + 1 < ed.wins.len() { cur + 1 } else { cur - 1 };
    if ed.wins[victim].ntrows <= n {
        return failed("Impossible change");
    }
    ed.wins[victim].ntrows -= n;
    ed.wins[cur].ntrows += n;
    // Re-deal top rows in order.
    let mut row = 0;
    for w in &mut ed.wins {
        w.toprow = row;
        row += w.ntrows + 1;
    }
    mark_all_hard(ed);
    Ok(())
}

/// Shrink the current window by `n` rows.
pub fn shrinkwind(ed: &mut Editor, _f: bool, n: i32) -> CmdResult {
    if n < 0 {
        return enlargewind(ed, false, -n);
    }
    if ed.wins.len() == 1 {
        return failed("Only one window");
    }
    let n = n as usize;
    let cur = ed.curw;
    if ed.wins[cur].ntrows <= n {
        return failed("Impossible change");
    }
    let victim = if cur + 1 < ed.wins.len() { cur + 1 } else { cur - 1 };
    ed.wins[cur].ntrows -= n;
    ed.wins[victim].ntrows += n;
    let mut row = 0;
    for w in &mut ed.wins {
        w.toprow = row;
        row += w.ntrows + 1;
    }
    mark_all_hard(ed);
    Ok(())
}

/// Force a reframe with dot centred (or at row `n` with an argument).
pub fn reposition(ed: &mut Editor, f: bool, n: i32) -> CmdResult {
    let w = ed.cur_win_mut();
    w.force = if f { n } else { 0 };
    w.flags |= WFlags::FORCE | WFlags::HARD;
    Ok(())
}

/// Repaint the screen from scratch.
pub fn redraw(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    mark_all_hard(ed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::editor_with;

    #[test]
    fn split_and_only() {
        let mut ed = editor_with("text");
        let rows_before = ed.cur_win().ntrows;
        splitwind(&mut ed, false, 1).unwrap();
        assert_eq!(ed.wins.len(), 2);
        assert_eq!(ed.bufs.get(ed.curb_id()).nwnd, 2);
        assert!(ed.wins[0].ntrows < rows_before);
        onlywind(&mut ed, false, 1).unwrap();
        assert_eq!(ed.wins.len(), 1);
        assert_eq!(ed.bufs.get(ed.curb_id()).nwnd, 1);
    }

    #[test]
    fn split_too_small_refused() {
        let mut ed = editor_with("x");
        ed.cur_win_mut().ntrows = 2;
        assert!(splitwind(&mut ed, false, 1).is_err());
    }

    #[test]
    fn window_cycling() {
        let mut ed = editor_with("x");
        splitwind(&mut ed, false, 1).unwrap();
        assert_eq!(ed.curw, 0);
        nextwind(&mut ed, false, 1).unwrap();
        assert_eq!(ed.curw, 1);
        nextwind(&mut ed, false, 1).unwrap();
        assert_eq!(ed.curw, 0);
        prevwind(&mut ed, false, 1).unwrap();
        assert_eq!(ed.curw, 1);
    }

    #[test]
    fn delete_window_restores_rows() {
        let mut ed = editor_with("x");
        splitwind(&mut ed, false, 1).unwrap();
        delwind(&mut ed, false, 1).unwrap();
        assert_eq!(ed.wins.len(), 1);
        // Last window cannot be deleted.
        assert!(delwind(&mut ed, false, 1).is_err());
    }

    #[test]
    fn resize_between_windows() {
        let mut ed = editor_with("x");
        splitwind(&mut ed, false, 1).unwrap();
        let upper = ed.wins[0].ntrows;
        let lower = ed.wins[1].ntrows;
        enlargewind(&mut ed, false, 2).unwrap();
        assert_eq!(ed.wins[0].ntrows, upper + 2);
        assert_eq!(ed.wins[1].ntrows, lower - 2);
    }
}
