//! Regions: the span between dot and mark, and the commands over it.

use core_state::{
    BufFlags, CmdFlags, CmdResult, Editor, LineId, NarrowSave, WFlags, failed,
};
use core_text::case::{CaseWork, recase};

use crate::delete::{kill_begin, ldelete};

/// A resolved region: start position, byte length (newlines count
/// one), and the line the region ends on.
#[derive(Debug, Clone, Copy)]
pub struct Region {
    pub line: LineId,
    pub offset: usize,
    pub bytes: u64,
    pub end_line: LineId,
}

/// Resolve dot/mark into a region. Fails without a mark.
pub fn getregion(ed: &Editor) -> CmdResult<Region> {
    let Some((markp, marko)) = ed.cur_win().mark else {
        return failed("No mark set in this window");
    };
    let (dotp, doto) = ed.dot();
    if dotp == markp {
        let (lo, hi) = if doto < marko {
            (doto, marko)
        } else {
            (marko, doto)
        };
        return Ok(Region {
            line: dotp,
            offset: lo,
            bytes: (hi - lo) as u64,
            end_line: dotp,
        });
    }
    // Walk forward and backward from dot at once; whichever finds the
    // mark first tells us the ordering.
    let header = ed.header();
    let mut flp = dotp;
    let mut blp = dotp;
    let mut fsize = (ed.llen(dotp) - doto + 1) as u64;
    let mut bsize = (doto + 1) as u64;
    loop {
        let mut progressed = false;
        if flp != header {
            flp = ed.lforw(flp);
            progressed = true;
            if flp == markp {
                return Ok(Region {
                    line: dotp,
                    offset: doto,
                    bytes: fsize + marko as u64,
                    end_line: markp,
                });
            }
            if flp != header {
                fsize += ed.llen(flp) as u64 + 1;
            }
        }
        if blp != header {
            let prev = ed.lback(blp);
            if prev != header {
                blp = prev;
                progressed = true;
                bsize += ed.llen(blp) as u64 + 1;
                if blp == markp {
                    return Ok(Region {
                        line: markp,
                        offset: marko,
                        bytes: bsize - marko as u64 - 1,
                        end_line: dotp,
                    });
                }
            }
        }
        if !progressed {
            return failed("Bug: lost mark");
        }
    }
}

/// Kill the region (into the kill ring).
pub fn killregion(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    let r = getregion(ed)?;
    kill_begin(ed);
    ed.set_dot(r.line, r.offset);
    ldelete(ed, r.bytes, true)
}

/// Copy the region to the kill ring without deleting it.
pub fn copyregion(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    let r = getregion(ed)?;
    kill_begin(ed);
    let header = ed.header();
    let mut lp = r.line;
    let mut off = r.offset;
    let mut remaining = r.bytes;
    let mut text = Vec::new();
    while remaining > 0 && lp != header {
        let len = ed.llen(lp);
        let take = ((len - off) as u64).min(remaining) as usize;
        text.extend_from_slice(&ed.lbytes(lp)[off..off + take]);
        remaining -= take as u64;
        if remaining > 0 {
            text.push(b'\n');
            remaining -= 1;
            lp = ed.lforw(lp);
            off = 0;
        }
    }
    ed.kill.top_mut().prepend_chunk(&text);
    ed.thisflag |= CmdFlags::KILL;
    ed.mlwrite("[region copied]");
    Ok(())
}

fn case_region(ed: &mut Editor, want: CaseWork) -> CmdResult {
    ed.check_writable()?;
    let r = getregion(ed)?;
    ed.lchange(WFlags::HARD);
    let header = ed.header();
    let mut lp = r.line;
    let mut off = r.offset;
    let mut remaining = r.bytes;
    while remaining > 0 && lp != header {
        let len = ed.llen(lp);
        let take = ((len - off) as u64).min(remaining) as usize;
        if take > 0 {
            let src = ed.lbytes(lp)[off..off + take].to_vec();
            let out = recase(want, &src);
            if out.bytes != src {
                let delta_new = out.bytes.len();
                {
                    let text = ed.lines.text_mut(lp);
                    text.delete_at(off, take);
                    text.insert_at(off, &out.bytes);
                }
                // Positions past the recased span shift by the size
                // difference; positions inside clamp to its end.
                if delta_new != take {
                    shift_after(ed, lp, off + take, delta_new as isize - take as isize);
                }
            }
        }
        remaining -= take as u64;
        if remaining > 0 {
            remaining -= 1; // the newline
            lp = ed.lforw(lp);
            off = 0;
        }
    }
    Ok(())
}

pub(crate) fn shift_after(ed: &mut Editor, lp: LineId, boundary: usize, delta: isize) {
    let apply = |off: &mut usize| {
        if *off >= boundary {
            *off = (*off as isize + delta).max(0) as usize;
        } else {
            let new_end = (boundary as isize + delta).max(0) as usize;
            if *off > new_end {
                *off = new_end;
            }
        }
    };
    for w in &mut ed.wins {
        if w.dot.0 == lp {
            apply(&mut w.dot.1);
        }
        if let Some(m) = &mut w.mark
            && m.0 == lp
        {
            apply(&mut m.1);
        }
    }
    if let Some(sm) = &mut ed.sysmark
        && sm.0 == lp
    {
        apply(&mut sm.1);
    }
    for p in &mut ed.pins {
        if p.0 == lp {
            apply(&mut p.1);
        }
    }
}

/// case-region-upper.
pub fn upperregion(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    case_region(ed, CaseWork::Upper)
}

/// case-region-lower.
pub fn lowerregion(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    case_region(ed, CaseWork::Lower)
}

/// Narrow the buffer to the region: lines outside it are parked on
/// two save rings until `widen`.
pub fn narrow(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    let id = ed.curb_id();
    if ed.bufs.get(id).flags.contains(BufFlags::NARROW) {
        return failed("This buffer is already narrowed");
    }
    let r = getregion(ed)?;
    let header = ed.header();
    let first = r.line;
    let last = if r.end_line == header {
        ed.lines.back(header)
    } else {
        r.end_line
    };

    let top_ring = ed.lines.new_ring();
    let mut lp = ed.lines.forward(header);
    while lp != first && lp != header {
        let next = ed.lines.forward(lp);
        ed.lines.unlink(lp);
        ed.lines.link_before(top_ring, lp);
        lp = next;
    }
    let bot_ring = ed.lines.new_ring();
    let mut lp = ed.lines.forward(last);
    while lp != header {
        let next = ed.lines.forward(lp);
        ed.lines.unlink(lp);
        ed.lines.link_before(bot_ring, lp);
        lp = next;
    }

    let b = ed.bufs.get_mut(id);
    b.narrowed = Some(NarrowSave {
        top: top_ring,
        bot: bot_ring,
    });
    b.flags |= BufFlags::NARROW;
    // Any window state outside the narrowed range snaps to it.
    for w in &mut ed.wins {
        if w.buf != id {
            continue;
        }
        if !ed.lines.ring_contains(header, w.top) {
            w.top = first;
        }
        if !ed.lines.ring_contains(header, w.dot.0) {
            w.dot = (first, 0);
        }
        if let Some(m) = w.mark
            && !ed.lines.ring_contains(header, m.0)
        {
            w.mark = None;
        }
        w.flags |= WFlags::HARD | WFlags::MODE;
    }
    ed.mlwrite("[Buffer narrowed]");
    Ok(())
}

/// Undo a narrow: splice the saved chains back around the text.
pub fn widen(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    let id = ed.curb_id();
    let Some(save) = ed.bufs.get(id).narrowed else {
        return failed("This buffer is not narrowed");
    };
    let header = ed.bufs.get(id).header;
    // Top chain goes back in front of the first line.
    let mut lp = ed.lines.back(save.top);
    while lp != save.top {
        let prev = ed.lines.back(lp);
        ed.lines.unlink(lp);
        let first = ed.lines.forward(header);
        ed.lines.link_before(first, lp);
        lp = prev;
    }
    // Bottom chain goes back before the header.
    let mut lp = ed.lines.forward(save.bot);
    while lp != save.bot {
        let next = ed.lines.forward(lp);
        ed.lines.unlink(lp);
        ed.lines.link_before(header, lp);
        lp = next;
    }
    ed.lines.free(save.top);
    ed.lines.free(save.bot);
    let b = ed.bufs.get_mut(id);
    b.narrowed = None;
    b.flags.remove(BufFlags::NARROW);
    for w in &mut ed.wins {
        if w.buf == id {
            w.flags |= WFlags::HARD | WFlags::MODE;
        }
    }
    ed.mlwrite("[Buffer widened]");
    Ok(())
}
