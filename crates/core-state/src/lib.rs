//! Editor state: the `Editor` context struct that every command
//! handler threads through, plus buffers, windows, rings, search
//! state, key/name tables and the terminal capability trait.
//!
//! The process is single-threaded and cooperative; there is exactly
//! one current window, one kill ring, one search ring, one keyboard
//! macro recorder. Nested execution (`dobuf`, the minibuffer) saves
//! and restores the narrow slice of this state it perturbs.

pub mod buffer;
pub mod error;
pub mod keytab;
pub mod killring;
pub mod modes;
pub mod searchstate;
pub mod term;
pub mod vars;
pub mod window;

use std::path::PathBuf;

use tracing::debug;

pub use buffer::{BufId, BufType, Buffer, BufferSet, CaseSet, Locs, NarrowSave, PttRule, PttTable};
pub use core_text::{Grapheme, LineArena, LineId, StrBuf};
pub use error::{CmdResult, EdError, failed};
pub use keytab::{
    BindTarget, CONTROL, CTLX, CmdFunc, KEY_BASE, KeyBinding, KeyTable, META, NameEntry, NameTable,
    RxArgs, SPEC,
};
pub use killring::{KillRing, KillStream, RING_SIZE, ReplyRing};
pub use modes::{BufFlags, CmdFlags, FuncOpts, Modes, WFlags};
pub use searchstate::{CanHunt, Dir, MatchLoc, PtPos, SearchState};
pub use term::{ScriptedTerm, TermDriver, TermEvent};
pub use window::{Window, relayout};

/// Keyboard-macro recorder state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KbdMode {
    #[default]
    Stop,
    Play,
    Record,
}

#[derive(Debug, Default)]
pub struct MacroState {
    pub mode: KbdMode,
    pub keys: Vec<u32>,
    pub pos: usize,
    pub rep: i32,
    /// Numeric argument restored at the start of each replay pass.
    pub saved_arg: (bool, i32),
    /// Recorded length at the start of the current command's key
    /// sequence; end-keyboard-macro truncates back to it so its own
    /// keystrokes are not replayed.
    pub cmd_start: usize,
}

bitflags::bitflags! {
    /// Cipher configuration; empty means crypt is disabled.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CryptMode: u8 {
        /// Printable-range cipher (0x20..0x7E cycled mod 95).
        const MOD95  = 0x01;
        /// One key for every buffer instead of per-buffer keys.
        const GLOBAL = 0x02;
        /// Repeat short keys out to 63 bytes before self-encryption.
        const FILL63 = 0x04;
        /// Full 8-bit cipher.
        const RAW    = 0x08;
    }
}

#[derive(Debug, Default)]
pub struct CryptState {
    pub mode: CryptMode,
    pub global_key: Vec<u8>,
}

/// Interpreter / dispatch bookkeeping.
pub struct ExecState {
    /// True while command lines are being executed non-interactively.
    pub clexec: bool,
    /// Remaining argument text of the command line being executed;
    /// prompts consume tokens from here instead of the keyboard.
    pub execstr: Option<String>,
    /// Conditional-skip depth inside `dobuf`.
    pub execlevel: u32,
    /// Target buffer while store-procedure / store-macro is active.
    pub mstore: Option<BufId>,
    /// Procedure buffer currently executing (innermost), for `.var`
    /// resolution.
    pub cur_proc: Option<BufId>,
    pub ptt_storing: bool,
    /// execute-file nesting depth.
    pub include_level: u32,
    /// Macro debug mode: prompt before every interpreted line.
    pub macbug: bool,
    /// True status of the last `!force`d command.
    pub force_status: &'static str,
    /// Status of the most recent command.
    pub cmdstatus: bool,
    pub current_command: Option<String>,
    /// Previous command line, for `reexecute`.
    pub prev_cmdline: Option<String>,
    /// Set while a reexecute is in flight.
    pub inreex: bool,
    /// Which functions keep their argument across reexecute.
    pub rxargs: RxArgs,
    pub last_named: Option<String>,
    pub last_proc: Option<String>,
    pub last_file: Option<String>,
    pub last_spawn: Option<String>,
    /// Last interactively dispatched handler with its argument.
    pub last_cmd: Option<(CmdFunc, bool, i32)>,
}

impl Default for ExecState {
    fn default() -> Self {
        ExecState {
            clexec: false,
            execstr: None,
            execlevel: 0,
            mstore: None,
            cur_proc: None,
            ptt_storing: false,
            include_level: 0,
            macbug: false,
            force_status: "",
            cmdstatus: true,
            current_command: None,
            prev_cmdline: None,
            inreex: false,
            rxargs: RxArgs::all(),
            last_named: None,
            last_proc: None,
            last_file: None,
            last_spawn: None,
            last_cmd: None,
        }
    }
}

/// Behaviour toggles (the historical option bag).
#[derive(Debug, Clone, Copy)]
pub struct EditorOpts {
    /// Numeric argument to yank rotates the ring first.
    pub gnu_yank: bool,
    /// next-word lands at end of word instead of start of next.
    pub forw_word_end: bool,
    /// Wrap whole lines in fill mode, not just the last word.
    pub full_wrap: bool,
    /// Take `<path>.lock~` advisory locks around file opens.
    pub file_locks: bool,
}

impl Default for EditorOpts {
    fn default() -> Self {
        EditorOpts {
            gnu_yank: true,
            forw_word_end: false,
            full_wrap: false,
            file_locks: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct MessageLine {
    pub text: String,
    /// Message waiting to be painted.
    pub pending: bool,
}

pub struct Editor {
    pub lines: LineArena,
    pub bufs: BufferSet,
    pub wins: Vec<Window>,
    pub curw: usize,
    pub kill: KillRing,
    pub replies: ReplyRing,
    pub search: SearchState,
    pub keys: KeyTable,
    pub names: NameTable,
    /// `%name` user variables.
    pub uvars: Vec<(String, String)>,
    /// Default modes stamped onto new buffers.
    pub gmode: Modes,
    /// Modes forced on/off after file hooks run.
    pub force_mode_on: Modes,
    pub force_mode_off: Modes,
    pub opts: EditorOpts,
    pub fillcol: usize,
    pub tabstop: usize,
    pub thisflag: CmdFlags,
    pub lastflag: CmdFlags,
    /// Goal column for successive line moves.
    pub curgoal: usize,
    pub mac: MacroState,
    pub exec: ExecState,
    /// Current phonetic translation table buffer, if any compiled.
    pub ptt: Option<BufId>,
    /// Minibuffer nesting depth; non-zero while a prompt is active.
    pub mb_depth: u32,
    pub term: Box<dyn TermDriver>,
    pub msg: MessageLine,
    /// Echo interactive input (off while reading crypt keys).
    pub disinp: bool,
    /// Show command output on the message line.
    pub discmd: bool,
    pub crypt: CryptState,
    /// Percent of text codepoints under which a file counts as binary.
    pub binary_threshold: u32,
    /// Interpreter-owned saved position.
    pub sysmark: Option<(LineId, usize)>,
    /// Macro-level pins: saved positions owned by the interpreter.
    pub pins: Vec<(LineId, usize)>,
    /// Byte size of the last yank (dot sits just past it), for
    /// yank-replace.
    pub last_yank: Option<usize>,
    /// Subshell status, reported as the process exit code.
    pub rval: i32,
    pub seed: u32,
    /// Keystrokes between autosaves, and the countdown.
    pub asave: i32,
    pub acount: i32,
    /// Prefix keycodes (rebindable).
    pub metac: u32,
    pub ctlxc: u32,
    pub reptc: u32,
    pub abortc: u32,
    /// Directory list searched for startup/table files.
    pub conf_path: Vec<PathBuf>,
    pub quit: Option<i32>,
}

impl Editor {
    /// Build an editor with one empty `main` buffer in one window
    /// sized from the terminal.
    pub fn new(term: Box<dyn TermDriver>) -> Editor {
        let mut lines = LineArena::new();
        let mut bufs = BufferSet::new();
        let main = bufs
            .create(
                &mut lines,
                "main",
                BufType::Normal,
                BufFlags::empty(),
                Modes::empty(),
            )
            .expect("fresh registry");
        let header = bufs.get(main).header;
        let (rows, _cols) = term.size();
        let mut win = Window::new(main, header, 0, rows.saturating_sub(2).max(1));
        win.dot = (header, 0);
        bufs.get_mut(main).nwnd = 1;
        Editor {
            lines,
            bufs,
            wins: vec![win],
            curw: 0,
            kill: KillRing::new(),
            replies: ReplyRing::default(),
            search: SearchState::new(),
            keys: KeyTable::new(),
            names: NameTable::default(),
            uvars: Vec::new(),
            gmode: Modes::empty(),
            force_mode_on: Modes::empty(),
            force_mode_off: Modes::empty(),
            opts: EditorOpts::default(),
            fillcol: 72,
            tabstop: 8,
            thisflag: CmdFlags::empty(),
            lastflag: CmdFlags::empty(),
            curgoal: 0,
            mac: MacroState::default(),
            exec: ExecState::default(),
            ptt: None,
            mb_depth: 0,
            term,
            msg: MessageLine::default(),
            disinp: true,
            discmd: true,
            crypt: CryptState::default(),
            binary_threshold: 80,
            sysmark: None,
            pins: Vec::new(),
            last_yank: None,
            rval: 0,
            seed: 0,
            asave: 256,
            acount: 256,
            metac: CONTROL | b'[' as u32,
            ctlxc: CONTROL | b'X' as u32,
            reptc: CONTROL | b'U' as u32,
            abortc: CONTROL | b'G' as u32,
            conf_path: Vec::new(),
            quit: None,
        }
    }

    // ---- current window / buffer accessors ----

    pub fn cur_win(&self) -> &Window {
        &self.wins[self.curw]
    }

    pub fn cur_win_mut(&mut self) -> &mut Window {
        &mut self.wins[self.curw]
    }

    pub fn curb_id(&self) -> BufId {
        self.cur_win().buf
    }

    pub fn curb(&self) -> &Buffer {
        self.bufs.get(self.curb_id())
    }

    pub fn curb_mut(&mut self) -> &mut Buffer {
        let id = self.curb_id();
        self.bufs.get_mut(id)
    }

    /// Header sentinel of the current buffer's ring.
    pub fn header(&self) -> LineId {
        self.curb().header
    }

    pub fn dot(&self) -> (LineId, usize) {
        self.cur_win().dot
    }

    pub fn set_dot(&mut self, line: LineId, off: usize) {
        self.cur_win_mut().dot = (line, off);
    }

    pub fn mark(&self) -> Option<(LineId, usize)> {
        self.cur_win().mark
    }

    pub fn set_mark(&mut self, mark: Option<(LineId, usize)>) {
        self.cur_win_mut().mark = mark;
    }

    // ---- line shortcuts ----

    pub fn lforw(&self, lp: LineId) -> LineId {
        self.lines.forward(lp)
    }

    pub fn lback(&self, lp: LineId) -> LineId {
        self.lines.back(lp)
    }

    pub fn llen(&self, lp: LineId) -> usize {
        self.lines.len_of(lp)
    }

    pub fn lbytes(&self, lp: LineId) -> &[u8] {
        self.lines.text(lp).bytes()
    }

    /// True when dot sits on the header line (end of buffer).
    pub fn at_eob(&self) -> bool {
        self.dot().0 == self.header()
    }

    // ---- change tracking ----

    /// Record a change to the current buffer: set the changed flag
    /// (updating modelines on first change), propagate redisplay flags
    /// to every window on the buffer, invalidate match-group info and
    /// any compiled phonetic table of this buffer.
    pub fn lchange(&mut self, mut flag: WFlags) {
        let id = self.curb_id();
        if self.bufs.get(id).nwnd != 1 {
            flag = WFlags::HARD;
        }
        {
            let b = self.bufs.get_mut(id);
            if !b.flags.contains(BufFlags::CHG) {
                flag |= WFlags::MODE;
                b.flags |= BufFlags::CHG;
            }
            if b.btype == BufType::PhoneticTable && b.ptt.is_some() {
                b.ptt = None;
            }
        }
        if self.search.match_buf == Some(id) {
            self.search.invalidate_match();
        }
        for w in &mut self.wins {
            if w.buf == id {
                w.flags |= flag;
            }
        }
    }

    /// Guard for mutating commands: fails in View mode.
    pub fn check_writable(&self) -> CmdResult {
        if self.curb().mode.contains(Modes::VIEW) {
            failed("[Key illegal in VIEW mode]")
        } else {
            Ok(())
        }
    }

    // ---- message line ----

    pub fn mlwrite(&mut self, text: impl Into<String>) {
        if !self.discmd {
            return;
        }
        self.msg.text = text.into();
        self.msg.pending = true;
    }

    /// Write regardless of `$discmd`.
    pub fn mlforce(&mut self, text: impl Into<String>) {
        self.msg.text = text.into();
        self.msg.pending = true;
    }

    pub fn mlerase(&mut self) {
        self.msg.text.clear();
        self.msg.pending = true;
    }

    /// Report a command error on the message line (abort gets the
    /// bracketed form).
    pub fn report(&mut self, err: &EdError) {
        match err {
            EdError::Abort => self.mlforce("[Aborted]"),
            other => self.mlforce(other.to_string()),
        }
    }

    // ---- window/buffer connection ----

    /// Point window `wix` at buffer `id`, saving the old buffer's
    /// display state if this was its last window and restoring the
    /// new buffer's saved state (or copying from another window that
    /// already shows it).
    pub fn connect_window(&mut self, wix: usize, id: BufId) {
        let old = self.wins[wix].buf;
        if old == id {
            return;
        }
        debug!(from = %self.bufs.get(old).name, to = %self.bufs.get(id).name, "connect window");
        let locs = self.wins[wix].locs();
        {
            let ob = self.bufs.get_mut(old);
            ob.nwnd = ob.nwnd.saturating_sub(1);
            if ob.nwnd == 0 {
                ob.b = locs;
            }
        }
        let peer = self
            .wins
            .iter()
            .enumerate()
            .find(|(ix, w)| *ix != wix && w.buf == id)
            .map(|(_, w)| w.locs());
        let nb = self.bufs.get_mut(id);
        nb.nwnd += 1;
        let locs = peer.unwrap_or(nb.b);
        let w = &mut self.wins[wix];
        w.buf = id;
        w.set_locs(locs);
        w.top = locs.dot.0;
        w.flags |= WFlags::MODE | WFlags::HARD;
    }

    /// Every window in the registry invariant check (debug aid).
    pub fn check_invariants(&self) {
        for w in &self.wins {
            debug_assert!(self.bufs.contains(w.buf), "window on dead buffer");
            let header = self.bufs.get(w.buf).header;
            debug_assert!(
                self.lines.ring_contains(header, w.dot.0),
                "dot outside buffer ring"
            );
        }
    }
}
