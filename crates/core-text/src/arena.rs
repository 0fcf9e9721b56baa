//! Slab arena for buffer lines.
//!
//! Every buffer owns a circular doubly-linked ring of lines rooted at
//! a header sentinel. Links are 32-bit arena indices, so they stay
//! valid across text regrow and arena growth; freeing a line pushes
//! its slot onto a free list for reuse.

use crate::strbuf::StrBuf;

/// Index of a line slot in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineId(u32);

impl LineId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One line of text. No trailing newline is stored; newlines are
/// implicit at ring boundaries.
#[derive(Debug)]
pub struct Line {
    text: StrBuf,
    fwd: LineId,
    back: LineId,
    live: bool,
}

#[derive(Debug, Default)]
pub struct LineArena {
    slots: Vec<Line>,
    free: Vec<u32>,
}

impl LineArena {
    pub fn new() -> Self {
        LineArena::default()
    }

    /// Number of live lines (headers included).
    pub fn live_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    fn alloc_raw(&mut self, text: StrBuf) -> LineId {
        if let Some(ix) = self.free.pop() {
            let id = LineId(ix);
            let slot = &mut self.slots[ix as usize];
            slot.text = text;
            slot.fwd = id;
            slot.back = id;
            slot.live = true;
            return id;
        }
        let id = LineId(self.slots.len() as u32);
        self.slots.push(Line {
            text,
            fwd: id,
            back: id,
            live: true,
        });
        id
    }

    /// Allocate a detached line (self-linked) with the given text.
    pub fn alloc(&mut self, text: StrBuf) -> LineId {
        self.alloc_raw(text)
    }

    /// Allocate a fresh header sentinel: an empty, self-linked ring.
    pub fn new_ring(&mut self) -> LineId {
        self.alloc_raw(StrBuf::new())
    }

    /// Free one line slot. The caller must have unlinked it.
    pub fn free(&mut self, id: LineId) {
        let slot = &mut self.slots[id.index()];
        debug_assert!(slot.live, "double free of line slot");
        slot.live = false;
        slot.text = StrBuf::new();
        self.free.push(id.0);
    }

    pub fn forward(&self, id: LineId) -> LineId {
        self.slots[id.index()].fwd
    }

    pub fn back(&self, id: LineId) -> LineId {
        self.slots[id.index()].back
    }

    pub fn text(&self, id: LineId) -> &StrBuf {
        &self.slots[id.index()].text
    }

    pub fn text_mut(&mut self, id: LineId) -> &mut StrBuf {
        &mut self.slots[id.index()].text
    }

    pub fn len_of(&self, id: LineId) -> usize {
        self.slots[id.index()].text.len()
    }

    /// Splice `new` in front of `at` (i.e. between `at.back` and `at`).
    pub fn link_before(&mut self, at: LineId, new: LineId) {
        let prev = self.slots[at.index()].back;
        self.slots[prev.index()].fwd = new;
        self.slots[new.index()].back = prev;
        self.slots[new.index()].fwd = at;
        self.slots[at.index()].back = new;
    }

    /// Splice `new` just after `at`.
    pub fn link_after(&mut self, at: LineId, new: LineId) {
        let next = self.slots[at.index()].fwd;
        self.link_before(next, new);
    }

    /// Unlink a line from its ring (it becomes self-linked).
    pub fn unlink(&mut self, id: LineId) {
        let fwd = self.slots[id.index()].fwd;
        let back = self.slots[id.index()].back;
        self.slots[back.index()].fwd = fwd;
        self.slots[fwd.index()].back = back;
        self.slots[id.index()].fwd = id;
        self.slots[id.index()].back = id;
    }

    /// Unlink and free.
    pub fn remove(&mut self, id: LineId) {
        self.unlink(id);
        self.free(id);
    }

    /// Iterate the real lines of a ring (header excluded), forward.
    pub fn ring_iter(&self, header: LineId) -> RingIter<'_> {
        RingIter {
            arena: self,
            header,
            cur: self.forward(header),
        }
    }

    /// Free every non-header line of a ring.
    pub fn clear_ring(&mut self, header: LineId) {
        let mut lp = self.forward(header);
        while lp != header {
            let next = self.forward(lp);
            self.free(lp);
            lp = next;
        }
        let h = &mut self.slots[header.index()];
        h.fwd = header;
        h.back = header;
    }

    /// Free a ring entirely, header included.
    pub fn drop_ring(&mut self, header: LineId) {
        self.clear_ring(header);
        self.free(header);
    }

    /// True when `id` is a live member of the ring rooted at `header`.
    /// Linear; used by debug assertions and window validation.
    pub fn ring_contains(&self, header: LineId, id: LineId) -> bool {
        if id == header {
            return true;
        }
        self.ring_iter(header).any(|lp| lp == id)
    }
}

pub struct RingIter<'a> {
    arena: &'a LineArena,
    header: LineId,
    cur: LineId,
}

impl Iterator for RingIter<'_> {
    type Item = LineId;

    fn next(&mut self) -> Option<LineId> {
        if self.cur == self.header {
            return None;
        }
        let out = self.cur;
        self.cur = self.arena.forward(self.cur);
        Some(out)
    }
}
