//! Key-binding table and function-name table.
//!
//! Composite keycodes are 32-bit: a Unicode base plus prefix bits.
//! The binding table is a growable array searched through a sorted
//! index that is rebuilt lazily; rebuilds are paused while startup
//! files execute batches of bind commands, during which lookups fall
//! back to a linear scan. A second index sorted by handler address
//! supports reverse lookup with successor iteration.

use tracing::trace;

use crate::error::CmdResult;

/// Control flag, or'ed in for C0-range keys.
pub const CONTROL: u32 = 0x1000_0000;
/// Meta (ESC) prefix.
pub const META: u32 = 0x2000_0000;
/// C-x prefix.
pub const CTLX: u32 = 0x4000_0000;
/// Function keys arriving via CSI.
pub const SPEC: u32 = 0x8000_0000;

/// Mask selecting the base character of a composite keycode.
pub const KEY_BASE: u32 = 0x0FFF_FFFF;

/// Handler signature: every editor action is one of these.
pub type CmdFunc = fn(&mut crate::Editor, bool, i32) -> CmdResult;

fn fp(f: CmdFunc) -> usize {
    f as usize
}

/// What a key is bound to.
#[derive(Clone)]
pub enum BindTarget {
    Func(CmdFunc),
    /// Name of a procedure buffer (without the leading `/`).
    Proc(String),
}

impl std::fmt::Debug for BindTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BindTarget::Func(h) => write!(f, "Func({:#x})", fp(*h)),
            BindTarget::Proc(name) => write!(f, "Proc({name})"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct KeyBinding {
    pub code: u32,
    pub target: BindTarget,
    /// Repeat multiplier applied to the numeric argument.
    pub multiplier: i32,
}

#[derive(Default)]
pub struct KeyTable {
    entries: Vec<KeyBinding>,
    key_index: Vec<u32>,
    key_index_valid: bool,
    /// While set (startup files), invalid indices mean linear lookup
    /// instead of an eager rebuild per binding change.
    pub pause_index_update: bool,
    func_index: Vec<u32>,
    next_func_index: Vec<i32>,
    func_index_valid: bool,
}

impl KeyTable {
    pub fn new() -> Self {
        KeyTable::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, ix: usize) -> &KeyBinding {
        &self.entries[ix]
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyBinding> {
        self.entries.iter()
    }

    fn invalidate(&mut self) {
        self.key_index_valid = false;
        self.func_index_valid = false;
    }

    fn index_bindings(&mut self) {
        let mut ix: Vec<u32> = (0..self.entries.len() as u32).collect();
        ix.sort_by_key(|&i| self.entries[i as usize].code);
        self.key_index = ix;
        self.key_index_valid = true;
        trace!(entries = self.entries.len(), "key index rebuilt");
    }

    fn index_funcs(&mut self) {
        let mut ix: Vec<u32> = (0..self.entries.len() as u32).collect();
        ix.sort_by_key(|&i| match &self.entries[i as usize].target {
            BindTarget::Func(f) => (0usize, fp(*f)),
            BindTarget::Proc(_) => (1usize, i as usize),
        });
        // Successor index keyed by physical entry number: for each
        // entry, the next one in handler-sorted order (-1 at the end).
        let mut next = vec![-1i32; self.entries.len()];
        for pair in ix.windows(2) {
            next[pair[0] as usize] = pair[1] as i32;
        }
        self.func_index = ix;
        self.next_func_index = next;
        self.func_index_valid = true;
    }

    /// Install (or replace) a binding.
    pub fn bind(&mut self, code: u32, target: BindTarget, multiplier: i32) {
        match self.entries.iter_mut().find(|e| e.code == code) {
            Some(e) => {
                e.target = target;
                e.multiplier = multiplier;
            }
            None => self.entries.push(KeyBinding {
                code,
                target,
                multiplier,
            }),
        }
        self.invalidate();
    }

    /// Remove a binding. False when the key was not bound.
    pub fn unbind(&mut self, code: u32) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.code != code);
        let removed = self.entries.len() != before;
        if removed {
            self.invalidate();
        }
        removed
    }

    /// Remove every binding whose handler is `func`; returns the
    /// codes removed. Used when rebinding a prefix function.
    pub fn unbind_func(&mut self, func: CmdFunc) -> Vec<u32> {
        let mut removed = Vec::new();
        self.entries.retain(|e| match &e.target {
            BindTarget::Func(f) if fp(*f) == fp(func) => {
                removed.push(e.code);
                false
            }
            _ => true,
        });
        if !removed.is_empty() {
            self.invalidate();
        }
        removed
    }

    /// Look a keycode up. Binary search through the sorted index when
    /// valid; linear while rebuilds are paused.
    pub fn get(&mut self, code: u32) -> Option<&KeyBinding> {
        if !self.key_index_valid {
            if self.pause_index_update {
                return self.entries.iter().find(|e| e.code == code);
            }
            self.index_bindings();
        }
        let ix = self
            .key_index
            .binary_search_by_key(&code, |&i| self.entries[i as usize].code)
            .ok()?;
        Some(&self.entries[self.key_index[ix] as usize])
    }

    /// First binding of `func` in handler-sorted order.
    pub fn get_by_func(&mut self, func: CmdFunc) -> Option<usize> {
        if !self.func_index_valid {
            self.index_funcs();
        }
        // Binary chop that lands on the first of any duplicates.
        let key = (0usize, fp(func));
        let mut first = 0usize;
        let mut last = self.func_index.len();
        while first < last {
            let mid = (first + last) / 2;
            let e = &self.entries[self.func_index[mid] as usize];
            let ekey = match &e.target {
                BindTarget::Func(f) => (0usize, fp(*f)),
                BindTarget::Proc(_) => (1usize, self.func_index[mid] as usize),
            };
            if ekey < key {
                first = mid + 1;
            } else {
                last = mid;
            }
        }
        if first == self.func_index.len() {
            return None;
        }
        let ent = self.func_index[first] as usize;
        match &self.entries[ent].target {
            BindTarget::Func(f) if fp(*f) == fp(func) => Some(ent),
            _ => None,
        }
    }

    /// Successor of entry `ix` in handler-sorted order, for walking
    /// every binding of one handler.
    pub fn next_by_func(&mut self, ix: usize) -> Option<usize> {
        if !self.func_index_valid {
            self.index_funcs();
        }
        let next = *self.next_func_index.get(ix)?;
        if next < 0 { None } else { Some(next as usize) }
    }
}

bitflags::bitflags! {
    /// Functions whose argument is reused by `reexecute`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RxArgs: u32 {
        const FORWSEARCH = 0x0001;
        const BACKSEARCH = 0x0002;
        const NAMEDCMD   = 0x0004;
        const EXECCMD    = 0x0008;
        const EXECPROC   = 0x0010;
        const EXECBUF    = 0x0020;
        const EXECFILE   = 0x0040;
        const QUOTE      = 0x0080;
        const SPAWN      = 0x0100;
    }
}

/// One row of the function-name table.
pub struct NameEntry {
    pub name: &'static str,
    pub func: CmdFunc,
    pub opts: crate::modes::FuncOpts,
}

/// Static table of every named command, with two sorted indices built
/// once at startup: by name (binary searched) and by handler address
/// (reverse lookup).
#[derive(Default)]
pub struct NameTable {
    entries: Vec<NameEntry>,
    by_name: Vec<u32>,
    by_func: Vec<u32>,
}

impl NameTable {
    pub fn build(entries: Vec<NameEntry>) -> Self {
        let mut by_name: Vec<u32> = (0..entries.len() as u32).collect();
        by_name.sort_by_key(|&i| entries[i as usize].name);
        let mut by_func: Vec<u32> = (0..entries.len() as u32).collect();
        by_func.sort_by_key(|&i| fp(entries[i as usize].func));
        NameTable {
            entries,
            by_name,
            by_func,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lookup(&self, name: &str) -> Option<&NameEntry> {
        let ix = self
            .by_name
            .binary_search_by_key(&name, |&i| self.entries[i as usize].name)
            .ok()?;
        Some(&self.entries[self.by_name[ix] as usize])
    }

    /// Name of a handler, if it is in the table.
    pub fn name_of(&self, func: CmdFunc) -> Option<&'static str> {
        self.entry_of(func).map(|e| e.name)
    }

    /// Full entry for a handler (reverse lookup).
    pub fn entry_of(&self, func: CmdFunc) -> Option<&NameEntry> {
        let ix = self
            .by_func
            .binary_search_by_key(&fp(func), |&i| fp(self.entries[i as usize].func))
            .ok()?;
        Some(&self.entries[self.by_func[ix] as usize])
    }

    /// Entries in name order.
    pub fn iter_sorted(&self) -> impl Iterator<Item = &NameEntry> {
        self.by_name.iter().map(|&i| &self.entries[i as usize])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Editor;
    use crate::modes::FuncOpts;

    fn f1(_: &mut Editor, _: bool, _: i32) -> CmdResult {
        Ok(())
    }
    fn f2(_: &mut Editor, _: bool, _: i32) -> CmdResult {
        Ok(())
    }

    #[test]
    fn bind_lookup_unbind() {
        let mut kt = KeyTable::new();
        kt.bind(CONTROL | b'F' as u32, BindTarget::Func(f1), 1);
        kt.bind(CTLX | b'S' as u32, BindTarget::Func(f2), 1);
        assert!(kt.get(CONTROL | b'F' as u32).is_some());
        assert!(kt.get(CONTROL | b'Z' as u32).is_none());
        assert!(kt.unbind(CONTROL | b'F' as u32));
        assert!(!kt.unbind(CONTROL | b'F' as u32));
    }

    #[test]
    fn paused_index_still_finds() {
        let mut kt = KeyTable::new();
        kt.pause_index_update = true;
        kt.bind(META | b'A' as u32, BindTarget::Func(f1), 1);
        assert!(kt.get(META | b'A' as u32).is_some());
    }

    #[test]
    fn reverse_lookup_walks_all_bindings() {
        let mut kt = KeyTable::new();
        kt.bind(CONTROL | b'A' as u32, BindTarget::Func(f1), 1);
        kt.bind(CONTROL | b'B' as u32, BindTarget::Func(f1), 1);
        kt.bind(CONTROL | b'C' as u32, BindTarget::Func(f2), 1);
        let mut codes = Vec::new();
        let mut cur = kt.get_by_func(f1);
        while let Some(ix) = cur {
            let e = kt.entry(ix);
            match &e.target {
                BindTarget::Func(f) if fp(*f) == fp(f1 as CmdFunc) => codes.push(e.code),
                _ => break,
            }
            cur = kt.next_by_func(ix);
        }
        codes.sort();
        assert_eq!(codes, vec![CONTROL | b'A' as u32, CONTROL | b'B' as u32]);
    }

    #[test]
    fn unbind_by_func_reports_codes() {
        let mut kt = KeyTable::new();
        kt.bind(1, BindTarget::Func(f1), 1);
        kt.bind(2, BindTarget::Func(f1), 1);
        kt.bind(3, BindTarget::Func(f2), 1);
        let mut gone = kt.unbind_func(f1);
        gone.sort();
        assert_eq!(gone, vec![1, 2]);
        assert_eq!(kt.len(), 1);
    }

    #[test]
    fn procedure_bindings() {
        let mut kt = KeyTable::new();
        kt.bind(CTLX | b'H' as u32, BindTarget::Proc("hello".into()), 1);
        match &kt.get(CTLX | b'H' as u32).unwrap().target {
            BindTarget::Proc(name) => assert_eq!(name, "hello"),
            _ => panic!("expected procedure binding"),
        }
    }

    #[test]
    fn name_table_lookups() {
        let nt = NameTable::build(vec![
            NameEntry {
                name: "zig",
                func: f1,
                opts: FuncOpts::empty(),
            },
            NameEntry {
                name: "alpha",
                func: f2,
                opts: FuncOpts::NOT_MB,
            },
        ]);
        assert!(nt.lookup("alpha").is_some());
        assert!(nt.lookup("nope").is_none());
        assert_eq!(nt.name_of(f1), Some("zig"));
        let names: Vec<_> = nt.iter_sorted().map(|e| e.name).collect();
        assert_eq!(names, ["alpha", "zig"]);
    }
}
