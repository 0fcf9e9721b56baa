//! Buffers and the buffer registry.
//!
//! A buffer owns a line ring in the arena plus naming, modes, type,
//! saved display state (used when no window shows it), per-buffer
//! variables for procedure buffers, the compiled phonetic table, and
//! the narrowing save chains.

use std::path::PathBuf;

use core_text::{LineArena, LineId};

use crate::error::{CmdResult, failed};
use crate::modes::{BufFlags, FuncOpts, Modes};

/// Buffer names are capped like the original's to keep modelines sane.
pub const NBUFN: usize = 31;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufId(u32);

impl BufId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufType {
    #[default]
    Normal,
    /// Generic special buffer (listings and such).
    Special,
    /// `store-procedure` buffer, executable; name starts with `/`.
    Procedure,
    /// Phonetic translation table buffer.
    PhoneticTable,
}

/// Saved display state: dot, mark, first displayed column.
#[derive(Debug, Clone, Copy)]
pub struct Locs {
    pub dot: (LineId, usize),
    pub mark: Option<(LineId, usize)>,
    pub fcol: usize,
}

/// One compiled phonetic-translation rule.
#[derive(Debug, Clone)]
pub struct PttRule {
    pub from: Vec<u8>,
    pub to: Vec<u8>,
    /// Final codepoint of the from-string; rules are keyed by the most
    /// recently typed character.
    pub final_uc: u32,
    pub from_len_uc: usize,
    pub to_len_uc: usize,
    pub bow_only: bool,
    pub caseset: CaseSet,
}

/// Casing discipline of a rule's replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaseSet {
    Off,
    #[default]
    On,
    CapInitOne,
    CapInitAll,
    LowInitOne,
    LowInitAll,
}

/// A compiled phonetic table: rules in definition order plus the
/// two-grapheme modeline display code.
#[derive(Debug, Clone, Default)]
pub struct PttTable {
    pub rules: Vec<PttRule>,
    pub display_code: String,
}

/// Saved line chains while a buffer is narrowed. Both rings are
/// present or narrowing is not active.
#[derive(Debug, Clone, Copy)]
pub struct NarrowSave {
    pub top: LineId,
    pub bot: LineId,
}

#[derive(Debug)]
pub struct Buffer {
    pub name: String,
    pub fname: String,
    pub realpath: Option<PathBuf>,
    pub header: LineId,
    pub b: Locs,
    pub mode: Modes,
    pub btype: BufType,
    pub flags: BufFlags,
    /// False until the backing file has been read (lazy activation).
    pub active: bool,
    pub eol_missing: bool,
    /// Encrypted key bytes (may contain NULs once self-encrypted).
    pub key: Vec<u8>,
    pub ptt: Option<PttTable>,
    /// Per-buffer variables; only procedure buffers get them.
    pub bvars: Vec<(String, String)>,
    pub proc_opts: FuncOpts,
    pub exec_level: u32,
    pub narrowed: Option<NarrowSave>,
    /// Count of windows currently displaying this buffer.
    pub nwnd: u32,
}

impl Buffer {
    pub fn is_changed(&self) -> bool {
        self.flags.contains(BufFlags::CHG)
    }

    pub fn is_invisible(&self) -> bool {
        self.flags.contains(BufFlags::INVS)
    }

    pub fn bvar(&self, name: &str) -> Option<&str> {
        self.bvars
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_bvar(&mut self, name: &str, value: &str) {
        match self.bvars.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.bvars.push((name.to_string(), value.to_string())),
        }
    }
}

#[derive(Debug, Default)]
pub struct BufferSet {
    slots: Vec<Option<Buffer>>,
}

impl BufferSet {
    pub fn new() -> Self {
        BufferSet::default()
    }

    pub fn get(&self, id: BufId) -> &Buffer {
        self.slots[id.index()].as_ref().expect("stale BufId")
    }

    pub fn get_mut(&mut self, id: BufId) -> &mut Buffer {
        self.slots[id.index()].as_mut().expect("stale BufId")
    }

    pub fn contains(&self, id: BufId) -> bool {
        self.slots.get(id.index()).is_some_and(|s| s.is_some())
    }

    /// Case-sensitive lookup by name. The list is small, so linear.
    pub fn find(&self, name: &str) -> Option<BufId> {
        self.iter_ids().find(|&id| self.get(id).name == name)
    }

    /// Create a buffer with a fresh header ring. Fails if the name is
    /// taken; names longer than [`NBUFN`] bytes are refused.
    pub fn create(
        &mut self,
        arena: &mut LineArena,
        name: &str,
        btype: BufType,
        flags: BufFlags,
        mode: Modes,
    ) -> CmdResult<BufId> {
        if name.len() > NBUFN {
            return failed(format!("Buffer name too long: {name}"));
        }
        if self.find(name).is_some() {
            return failed(format!("Buffer {name} already exists"));
        }
        let header = arena.new_ring();
        let buf = Buffer {
            name: name.to_string(),
            fname: String::new(),
            realpath: None,
            header,
            b: Locs {
                dot: (header, 0),
                mark: None,
                fcol: 0,
            },
            mode,
            btype,
            flags,
            active: true,
            eol_missing: false,
            key: Vec::new(),
            ptt: None,
            bvars: Vec::new(),
            proc_opts: FuncOpts::empty(),
            exec_level: 0,
            narrowed: None,
            nwnd: 0,
        };
        let id = match self.slots.iter().position(|s| s.is_none()) {
            Some(ix) => {
                self.slots[ix] = Some(buf);
                BufId(ix as u32)
            }
            None => {
                self.slots.push(Some(buf));
                BufId((self.slots.len() - 1) as u32)
            }
        };
        Ok(id)
    }

    /// Remove a buffer record; the caller has already cleared its ring
    /// and checked it is not displayed.
    pub fn remove(&mut self, arena: &mut LineArena, id: BufId) {
        let buf = self.slots[id.index()].take().expect("stale BufId");
        arena.drop_ring(buf.header);
    }

    pub fn iter_ids(&self) -> impl Iterator<Item = BufId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_some())
            .map(|(ix, _)| BufId(ix as u32))
    }

    /// Buffer ids in case-sensitive name order (registry order).
    pub fn ordered(&self) -> Vec<BufId> {
        let mut ids: Vec<BufId> = self.iter_ids().collect();
        ids.sort_by(|a, b| self.get(*a).name.cmp(&self.get(*b).name));
        ids
    }

    /// The next buffer after `id` in registry order, wrapping, and
    /// skipping invisible buffers.
    pub fn next_visible(&self, id: BufId) -> Option<BufId> {
        let order = self.ordered();
        let pos = order.iter().position(|&b| b == id)?;
        let n = order.len();
        (1..=n)
            .map(|k| order[(pos + k) % n])
            .find(|&cand| cand == id || !self.get(cand).is_invisible())
    }
}
