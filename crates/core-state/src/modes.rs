//! Mode masks and per-command flag bits.

use bitflags::bitflags;

bitflags! {
    /// Per-buffer (and global-default) editor modes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Modes: u16 {
        const WRAP  = 0x0001; // word wrap
        const CMOD  = 0x0002; // C indentation / fence match
        const PHON  = 0x0004; // phonetic input handling
        const EXACT = 0x0008; // exact-case searching
        const VIEW  = 0x0010; // read-only
        const OVER  = 0x0020; // overwrite
        const MAGIC = 0x0040; // regex search semantics
        const CRYPT = 0x0080; // encrypted file
        const ASAVE = 0x0100; // auto-save
        const EQUIV = 0x0200; // canonical-equivalence matching
        const DOSLE = 0x0400; // DOS line endings on write
        const RPTMG = 0x0800; // report match in Magic mode
    }
}

impl Modes {
    /// Equivalence only applies under Magic, so this pair is tested
    /// together in the search paths.
    pub const MAGEQV: Modes = Modes::MAGIC.union(Modes::EQUIV);

    /// Mode names in mask-bit order, as shown on modelines and
    /// accepted by add-mode / delete-mode.
    pub const NAMES: [&'static str; 12] = [
        "wrap", "cmode", "phon", "exact", "view", "over", "magic", "crypt", "asave", "equiv",
        "dosle", "report",
    ];

    pub fn by_name(name: &str) -> Option<Modes> {
        let ix = Self::NAMES
            .iter()
            .position(|n| n.eq_ignore_ascii_case(name))?;
        Modes::from_bits(1 << ix)
    }
}

bitflags! {
    /// `thisflag` / `lastflag` bits carried between commands.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CmdFlags: u8 {
        const CPCN = 0x01; // last command was C-p / C-n
        const KILL = 0x02; // last command was a kill
        const YANK = 0x04; // last command was a yank
    }
}

bitflags! {
    /// Window redisplay flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct WFlags: u8 {
        const FORCE = 0x01; // forced reframe
        const MOVE  = 0x02; // line-to-line movement
        const EDIT  = 0x04; // editing within a line
        const HARD  = 0x08; // full repaint preferred
        const MODE  = 0x10; // mode line needs update
        const KILLS = 0x40; // something deleted
        const INS   = 0x80; // something inserted
    }
}

bitflags! {
    /// Buffer state flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct BufFlags: u8 {
        const INVS   = 0x01; // internal invisible buffer
        const CHG    = 0x02; // changed since last write
        const TRUNC  = 0x04; // truncated when read
        const NARROW = 0x08; // narrowing active
    }
}

bitflags! {
    /// Function-table option bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FuncOpts: u8 {
        const SKIP_IN_MACRO   = 0x01;
        const NOT_MB          = 0x02;
        const NOT_INTERACTIVE = 0x04;
        const SEARCH_OK       = 0x08; // hunt may re-run it
        const ONE_PASS        = 0x10; // ignore repeat argument
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_lookup_by_name() {
        assert_eq!(Modes::by_name("Magic"), Some(Modes::MAGIC));
        assert_eq!(Modes::by_name("dosle"), Some(Modes::DOSLE));
        assert_eq!(Modes::by_name("bogus"), None);
    }

    #[test]
    fn mageqv_pair() {
        let m = Modes::MAGIC | Modes::EQUIV;
        assert!(m.contains(Modes::MAGEQV));
        assert!(!Modes::MAGIC.contains(Modes::MAGEQV));
    }
}
