//! Pattern compilation: the tagged-node array for Magic searches and
//! the replacement-node array, with their group bookkeeping.

use unicode_general_category::{GeneralCategory, get_general_category};

use core_state::{CmdResult, EdError, Grapheme};
use core_text::grapheme::build_grapheme;
use core_text::utf8;

/// Effectively-unbounded repetition ceiling.
pub const REP_MAX: u32 = u32::MAX;

/// Shorthand character kinds (`\d`, `\s`, `\w`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Digit,
    Space,
    Word,
}

impl Kind {
    pub fn probe(self, uc: u32) -> bool {
        let Some(c) = char::from_u32(uc) else {
            return false;
        };
        match self {
            Kind::Digit => c.is_ascii_digit(),
            Kind::Space => c.is_whitespace(),
            Kind::Word => c == '_' || c.is_alphanumeric(),
        }
    }
}

/// Unicode general-category probe compiled from `\p{..}` / `\P{..}`.
/// One letter matches the whole major class, two letters the exact
/// category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prop {
    pub code: [u8; 2],
    pub negate: bool,
}

/// Two-letter category code of a codepoint.
pub fn category_code(uc: u32) -> [u8; 2] {
    let Some(c) = char::from_u32(uc) else {
        return *b"Cn";
    };
    use GeneralCategory::*;
    let s: &[u8; 2] = match get_general_category(c) {
        UppercaseLetter => b"Lu",
        LowercaseLetter => b"Ll",
        TitlecaseLetter => b"Lt",
        ModifierLetter => b"Lm",
        OtherLetter => b"Lo",
        NonspacingMark => b"Mn",
        SpacingMark => b"Mc",
        EnclosingMark => b"Me",
        DecimalNumber => b"Nd",
        LetterNumber => b"Nl",
        OtherNumber => b"No",
        ConnectorPunctuation => b"Pc",
        DashPunctuation => b"Pd",
        OpenPunctuation => b"Ps",
        ClosePunctuation => b"Pe",
        InitialPunctuation => b"Pi",
        FinalPunctuation => b"Pf",
        OtherPunctuation => b"Po",
        MathSymbol => b"Sm",
        CurrencySymbol => b"Sc",
        ModifierSymbol => b"Sk",
        OtherSymbol => b"So",
        SpaceSeparator => b"Zs",
        LineSeparator => b"Zl",
        ParagraphSeparator => b"Zp",
        Control => b"Cc",
        Format => b"Cf",
        Surrogate => b"Cs",
        PrivateUse => b"Co",
        Unassigned => b"Cn",
    };
    *s
}

impl Prop {
    pub fn probe(&self, uc: u32) -> bool {
        let code = category_code(uc);
        let hit = if self.code[1] == 0 {
            code[0] == self.code[0]
        } else {
            code == self.code
        };
        hit != self.negate
    }
}

/// Extended class member for non-ASCII probes.
#[derive(Debug, Clone, PartialEq)]
pub enum XProbe {
    Range(u32, u32),
    UcLit(u32),
    UcGraph(Grapheme),
    Prop(Prop),
    Kind { kind: Kind, negate: bool },
}

/// A character class: 128-bit ASCII bitmap plus extended probes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Ccl {
    pub bitmap: [u8; 16],
    pub negate: bool,
    pub ext: Vec<XProbe>,
}

impl Ccl {
    pub fn set(&mut self, c: u8) {
        self.bitmap[(c >> 3) as usize] |= 1 << (c & 7);
    }

    pub fn test_ascii(&self, c: u8) -> bool {
        c < 0x80 && self.bitmap[(c >> 3) as usize] & (1 << (c & 7)) != 0
    }
}

/// One compiled pattern element.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Lit(u8),
    /// Any grapheme except newline.
    Any,
    /// Any grapheme including newline.
    AnyGph,
    Ccl(Box<Ccl>),
    Bol,
    Eol,
    UcLit(u32),
    UcGraph(Grapheme),
    Prop(Prop),
    Kind { kind: Kind, negate: bool },
    /// `\1`..`\9`: match the text an earlier group captured.
    Backref(usize),
    /// Group open/close and alternation, all carrying group numbers.
    Start(usize),
    End(usize),
    Choice(usize),
}

/// Bounded repetition attached to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rep {
    pub low: u32,
    pub high: u32,
    pub minimal: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MagicNode {
    pub node: Node,
    pub rep: Option<Rep>,
    /// For Start/Choice: index of the next alternative's Choice node
    /// (0 = none).
    pub next_choice: usize,
}

impl MagicNode {
    fn plain(node: Node) -> Self {
        MagicNode {
            node,
            rep: None,
            next_choice: 0,
        }
    }
}

/// Compile-time and run-time group table entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupInfo {
    pub parent: usize,
    /// Node index where the group's End lives.
    pub gpend: usize,
    /// Node index of the group's first Choice alternative (0 = none).
    pub first_choice: usize,
}

/// A compiled Magic pattern: node array plus group table. The whole
/// pattern is wrapped in group 0.
#[derive(Debug, Clone, Default)]
pub struct MagicPat {
    pub nodes: Vec<MagicNode>,
    pub groups: Vec<GroupInfo>,
}

fn parse_err(msg: &str, at: usize) -> EdError {
    EdError::Parse {
        msg: msg.to_string(),
        at,
    }
}

struct Compiler<'a> {
    pat: &'a [u8],
    ix: usize,
    nodes: Vec<MagicNode>,
    groups: Vec<GroupInfo>,
    open: Vec<usize>,
}

impl<'a> Compiler<'a> {
    fn new(pat: &'a [u8]) -> Self {
        Compiler {
            pat,
            ix: 0,
            nodes: Vec::new(),
            groups: Vec::new(),
            open: Vec::new(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.pat.get(self.ix).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.ix += 1;
        Some(c)
    }

    fn push(&mut self, node: Node) {
        self.nodes.push(MagicNode::plain(node));
    }

    fn kind_escape(c: u8) -> Option<(Kind, bool)> {
        Some(match c {
            b'd' => (Kind::Digit, false),
            b'D' => (Kind::Digit, true),
            b's' => (Kind::Space, false),
            b'S' => (Kind::Space, true),
            b'w' => (Kind::Word, false),
            b'W' => (Kind::Word, true),
            _ => return None,
        })
    }

    fn parse_prop(&mut self, negate: bool) -> CmdResult<Prop> {
        if self.bump() != Some(b'{') {
            return Err(parse_err("\\p needs {..}", self.ix));
        }
        let mut code = [0u8; 2];
        let mut got = 0;
        loop {
            match self.bump() {
                Some(b'}') => break,
                Some(c) if got < 2 => {
                    code[got] = c;
                    got += 1;
                }
                Some(_) => return Err(parse_err("property too long", self.ix)),
                None => return Err(parse_err("unterminated \\p{", self.ix)),
            }
        }
        if got == 0 {
            return Err(parse_err("empty property", self.ix));
        }
        Ok(Prop { code, negate })
    }

    /// Grapheme (or plain codepoint) node for non-ASCII input.
    fn unicode_node(&mut self) -> Node {
        let (g, next) = build_grapheme(self.pat, self.ix, self.pat.len(), true);
        self.ix = next;
        if g.is_plain() {
            Node::UcLit(g.uc)
        } else {
            Node::UcGraph(g)
        }
    }

    fn parse_class(&mut self) -> CmdResult<Node> {
        let mut ccl = Ccl::default();
        if self.peek() == Some(b'^') {
            ccl.negate = true;
            self.ix += 1;
        }
        let mut first = true;
        let mut prev: Option<u32> = None;
        loop {
            let Some(c) = self.peek() else {
                return Err(parse_err("unterminated character class", self.ix));
            };
            if c == b']' && !first {
                self.ix += 1;
                break;
            }
            first = false;
            if c == b'-' && prev.is_some() && self.pat.get(self.ix + 1) != Some(&b']') {
                // Range.
                self.ix += 1;
                let lo = prev.take().expect("range start");
                let hi = if self.peek() == Some(b'\\') {
                    self.ix += 1;
                    self.bump().map(u32::from)
                } else if self.peek().is_some_and(|c| c >= 0x80) {
                    let (g, next) = build_grapheme(self.pat, self.ix, self.pat.len(), false);
                    self.ix = next;
                    Some(g.uc)
                } else {
                    self.bump().map(u32::from)
                };
                let Some(hi) = hi else {
                    return Err(parse_err("unterminated range", self.ix));
                };
                if lo > hi {
                    return Err(parse_err("reversed range", self.ix));
                }
                if hi <= 0x7f {
                    for b in lo..=hi {
                        ccl.set(b as u8);
                    }
                } else {
                    ccl.ext.push(XProbe::Range(lo, hi));
                }
                continue;
            }
            if c == b'\\' {
                self.ix += 1;
                let Some(e) = self.bump() else {
                    return Err(parse_err("dangling \\ in class", self.ix));
                };
                if let Some((kind, negate)) = Self::kind_escape(e) {
                    ccl.ext.push(XProbe::Kind { kind, negate });
                    prev = None;
                } else if e == b'p' || e == b'P' {
                    let p = self.parse_prop(e == b'P')?;
                    ccl.ext.push(XProbe::Prop(p));
                    prev = None;
                } else {
                    ccl.set(e);
                    prev = Some(e as u32);
                }
                continue;
            }
            if c >= 0x80 {
                let (g, next) = build_grapheme(self.pat, self.ix, self.pat.len(), true);
                self.ix = next;
                if g.is_plain() {
                    ccl.ext.push(XProbe::UcLit(g.uc));
                    prev = Some(g.uc);
                } else {
                    ccl.ext.push(XProbe::UcGraph(g));
                    prev = None;
                }
                continue;
            }
            self.ix += 1;
            ccl.set(c);
            prev = Some(c as u32);
        }
        Ok(Node::Ccl(Box::new(ccl)))
    }

    /// `{n}`, `{n,}`, `{n,m}` following a node.
    fn parse_range_rep(&mut self) -> CmdResult<Rep> {
        let mut low = 0u32;
        let mut high: Option<u32> = None;
        let mut saw_digit = false;
        let mut in_high = false;
        loop {
            match self.bump() {
                Some(b'}') => break,
                Some(b',') if !in_high => {
                    in_high = true;
                }
                Some(c) if c.is_ascii_digit() => {
                    saw_digit = true;
                    let d = (c - b'0') as u32;
                    if in_high {
                        high = Some(high.unwrap_or(0) * 10 + d);
                    } else {
                        low = low * 10 + d;
                    }
                }
                _ => return Err(parse_err("bad {} repeat", self.ix)),
            }
        }
        if !saw_digit {
            return Err(parse_err("empty {} repeat", self.ix));
        }
        let high = if in_high {
            high.unwrap_or(REP_MAX)
        } else {
            low
        };
        if high < low {
            return Err(parse_err("reversed {} repeat", self.ix));
        }
        Ok(Rep {
            low,
            high,
            minimal: false,
        })
    }

    fn attach_rep(&mut self, mut rep: Rep) -> CmdResult {
        if self.peek() == Some(b'?') {
            rep.minimal = true;
            self.ix += 1;
        }
        let Some(last) = self.nodes.last_mut() else {
            return Err(parse_err("repeat with nothing to repeat", self.ix));
        };
        match last.node {
            Node::Start(_)
            | Node::End(_)
            | Node::Choice(_)
            | Node::Bol
            | Node::Eol
            | Node::Backref(_) => {
                return Err(parse_err("repeat not allowed here", self.ix));
            }
            _ => {}
        }
        if last.rep.is_some() {
            return Err(parse_err("double repeat", self.ix));
        }
        last.rep = Some(rep);
        Ok(())
    }

    fn open_group(&mut self) {
        let g = self.groups.len();
        self.groups.push(GroupInfo {
            parent: self.open.last().copied().unwrap_or(0),
            gpend: 0,
            first_choice: 0,
        });
        self.open.push(g);
        self.push(Node::Start(g));
    }

    fn close_group(&mut self) -> CmdResult {
        let Some(g) = self.open.pop() else {
            return Err(parse_err("unmatched )", self.ix));
        };
        self.groups[g].gpend = self.nodes.len();
        self.push(Node::End(g));
        Ok(())
    }

    fn compile(mut self) -> CmdResult<MagicPat> {
        self.open_group(); // group 0 wraps the pattern
        // `^` anchors only as the very first element.
        if self.peek() == Some(b'^') {
            self.ix += 1;
            self.push(Node::Bol);
        }
        while let Some(c) = self.peek() {
            match c {
                b'(' => {
                    self.ix += 1;
                    self.open_group();
                }
                b')' => {
                    self.ix += 1;
                    self.close_group()?;
                }
                b'|' => {
                    self.ix += 1;
                    let g = self.open.last().copied().unwrap_or(0);
                    let here = self.nodes.len();
                    // Chain this alternative off the group (or off the
                    // previous Choice of the same group).
                    let mut linked = false;
                    for ix in (0..self.nodes.len()).rev() {
                        match self.nodes[ix].node {
                            Node::Choice(cg) if cg == g && self.nodes[ix].next_choice == 0 => {
                                self.nodes[ix].next_choice = here;
                                linked = true;
                                break;
                            }
                            Node::Start(sg) if sg == g => {
                                self.nodes[ix].next_choice = here;
                                if self.groups[g].first_choice == 0 {
                                    self.groups[g].first_choice = here;
                                }
                                linked = true;
                                break;
                            }
                            _ => {}
                        }
                    }
                    if !linked {
                        return Err(parse_err("misplaced |", self.ix));
                    }
                    self.push(Node::Choice(g));
                }
                b'.' => {
                    self.ix += 1;
                    self.push(Node::Any);
                }
                b'$' if self.ix + 1 == self.pat.len() => {
                    self.ix += 1;
                    self.push(Node::Eol);
                }
                b'[' => {
                    self.ix += 1;
                    let node = self.parse_class()?;
                    self.push(node);
                }
                b'*' => {
                    self.ix += 1;
                    self.attach_rep(Rep {
                        low: 0,
                        high: REP_MAX,
                        minimal: false,
                    })?;
                }
                b'+' => {
                    self.ix += 1;
                    self.attach_rep(Rep {
                        low: 1,
                        high: REP_MAX,
                        minimal: false,
                    })?;
                }
                b'?' => {
                    self.ix += 1;
                    // Bare ? is the 0/1 closure.
                    let Some(last) = self.nodes.last_mut() else {
                        return Err(parse_err("? with nothing to repeat", self.ix));
                    };
                    if last.rep.is_some() {
                        return Err(parse_err("double repeat", self.ix));
                    }
                    last.rep = Some(Rep {
                        low: 0,
                        high: 1,
                        minimal: false,
                    });
                }
                b'{' => {
                    self.ix += 1;
                    let rep = self.parse_range_rep()?;
                    self.attach_rep(rep)?;
                }
                b'\\' => {
                    self.ix += 1;
                    let Some(e) = self.bump() else {
                        return Err(parse_err("dangling \\ at end", self.ix));
                    };
                    if let Some((kind, negate)) = Self::kind_escape(e) {
                        self.push(Node::Kind { kind, negate });
                    } else if (b'1'..=b'9').contains(&e) {
                        self.push(Node::Backref((e - b'0') as usize));
                    } else if e == b'p' || e == b'P' {
                        let p = self.parse_prop(e == b'P')?;
                        self.push(Node::Prop(p));
                    } else if e == b'X' {
                        self.push(Node::AnyGph);
                    } else if e == b'n' {
                        self.push(Node::Lit(b'\n'));
                    } else if e == b't' {
                        self.push(Node::Lit(b'\t'));
                    } else if e >= 0x80 {
                        // Escaped non-ASCII lead: re-read as unicode.
                        self.ix -= 1;
                        let node = self.unicode_node();
                        self.push(node);
                    } else {
                        self.push(Node::Lit(e));
                    }
                }
                c if c >= 0x80 => {
                    let node = self.unicode_node();
                    self.push(node);
                }
                c => {
                    self.ix += 1;
                    self.push(Node::Lit(c));
                }
            }
        }
        if self.open.len() != 1 {
            return Err(parse_err("unmatched (", self.ix));
        }
        self.close_group()?;
        Ok(MagicPat {
            nodes: self.nodes,
            groups: self.groups,
        })
    }
}

/// Compile a Magic pattern.
pub fn mcstr(pat: &str) -> CmdResult<MagicPat> {
    Compiler::new(pat.as_bytes()).compile()
}

/// Does the pattern contain any regex metacharacter (so Magic mode
/// needs the step scanner)?
pub fn has_magic_meta(pat: &str) -> bool {
    let mut esc = false;
    for b in pat.bytes() {
        if esc {
            return true; // escapes always go through the compiler
        }
        match b {
            b'\\' => esc = true,
            b'.' | b'[' | b'*' | b'+' | b'?' | b'{' | b'(' | b')' | b'|' | b'^' | b'$' => {
                return true;
            }
            _ => {}
        }
    }
    false
}

/// Does the text contain any non-ASCII byte (case folding then needs
/// the step scanner)?
pub fn has_non_ascii(pat: &str) -> bool {
    pat.bytes().any(|b| b >= 0x80)
}

// ---------------- replacement patterns ----------------

/// Counter spec for `${@}` replacements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counter {
    pub start: i64,
    pub incr: i64,
    /// printf-style `%d` format: only width/zero-pad forms.
    pub fmt: String,
}

impl Default for Counter {
    fn default() -> Self {
        Counter {
            start: 1,
            incr: 1,
            fmt: "%d".to_string(),
        }
    }
}

/// Render a counter value with its `%[0][w]d` format.
pub fn format_counter(fmt: &str, val: i64) -> String {
    let Some(rest) = fmt.strip_prefix('%') else {
        return val.to_string();
    };
    let body = rest.strip_suffix(['d', 'u', 'x']).unwrap_or(rest);
    let hex = rest.ends_with('x');
    let zero = body.starts_with('0');
    let width: usize = body.trim_start_matches('0').parse().unwrap_or(0);
    match (hex, zero) {
        (true, true) => format!("{val:0width$x}"),
        (true, false) => format!("{val:width$x}"),
        (false, true) => format!("{val:0width$}"),
        (false, false) => format!("{val:width$}"),
    }
}

/// A segment of a `${&...}` function-call replacement.
#[derive(Debug, Clone, PartialEq)]
pub enum FcSeg {
    Lit(String),
    Group(usize),
    Counter(usize),
}

/// One compiled replacement element.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplNode {
    Lit(u8),
    UcLit(u32),
    UcGraph(Grapheme),
    /// `${$name}` / `${%name}` / `${.name}` variable fetch.
    Var(String),
    Group(usize),
    /// Index into the counter table.
    Counter(usize),
    /// Function call assembled from segments then evaluated.
    Func(Vec<FcSeg>),
}

#[derive(Debug, Clone, Default)]
pub struct ReplPat {
    pub nodes: Vec<ReplNode>,
    pub counters: Vec<Counter>,
    /// True when any metacharacter was seen (a plain string can be
    /// inserted directly).
    pub magical: bool,
}

fn brace_text(bytes: &[u8], from: usize) -> Option<(String, usize)> {
    let mut depth = 1;
    let mut ix = from;
    while ix < bytes.len() {
        match bytes[ix] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some((
                        String::from_utf8_lossy(&bytes[from..ix]).into_owned(),
                        ix + 1,
                    ));
                }
            }
            _ => {}
        }
        ix += 1;
    }
    None
}

fn parse_counter(spec: &str) -> Counter {
    let mut c = Counter::default();
    if let Some(rest) = spec.strip_prefix(':') {
        for part in rest.split(',') {
            if let Some(v) = part.strip_prefix("start=") {
                c.start = v.parse().unwrap_or(1);
            } else if let Some(v) = part.strip_prefix("incr=") {
                c.incr = v.parse().unwrap_or(1);
            } else if let Some(v) = part.strip_prefix("fmt=") {
                c.fmt = v.to_string();
            }
        }
    }
    c
}

/// Compile a replacement string.
pub fn rmcstr(rplc: &str) -> CmdResult<ReplPat> {
    let bytes = rplc.as_bytes();
    let mut out = ReplPat::default();
    let mut ix = 0usize;
    while ix < bytes.len() {
        let c = bytes[ix];
        if c >= 0x80 {
            let (g, next) = build_grapheme(bytes, ix, bytes.len(), true);
            ix = next;
            out.nodes.push(if g.is_plain() {
                ReplNode::UcLit(g.uc)
            } else {
                ReplNode::UcGraph(g)
            });
            continue;
        }
        match c {
            b'$' => {
                if bytes.get(ix + 1) != Some(&b'{') {
                    return Err(parse_err("$ without {...}", ix));
                }
                let Some((btext, next)) = brace_text(bytes, ix + 2) else {
                    return Err(parse_err("${} not ended", ix));
                };
                ix = next;
                out.magical = true;
                match btext.bytes().next() {
                    Some(b'$') | Some(b'%') | Some(b'.') => {
                        out.nodes.push(ReplNode::Var(btext));
                    }
                    Some(b'@') => {
                        let cix = out.counters.len();
                        out.counters.push(parse_counter(&btext[1..]));
                        out.nodes.push(ReplNode::Counter(cix));
                    }
                    Some(b'&') => {
                        let mut segs = Vec::new();
                        let inner = btext.as_bytes();
                        let mut j = 0usize;
                        let mut lit_start = 0usize;
                        while j + 1 < inner.len() {
                            if inner[j] == b'$' && inner[j + 1] == b'{' {
                                if lit_start < j {
                                    segs.push(FcSeg::Lit(
                                        String::from_utf8_lossy(&inner[lit_start..j]).into_owned(),
                                    ));
                                }
                                let Some((sub, after)) = brace_text(inner, j + 2) else {
                                    return Err(parse_err("${} not ended", ix));
                                };
                                if sub.starts_with('@') {
                                    let cix = out.counters.len();
                                    out.counters.push(parse_counter(&sub[1..]));
                                    segs.push(FcSeg::Counter(cix));
                                } else {
                                    segs.push(FcSeg::Group(
                                        sub.parse().map_err(|_| parse_err("bad group", ix))?,
                                    ));
                                }
                                j = after;
                                lit_start = after;
                            } else {
                                j += 1;
                            }
                        }
                        if lit_start < inner.len() {
                            segs.push(FcSeg::Lit(
                                String::from_utf8_lossy(&inner[lit_start..]).into_owned(),
                            ));
                        }
                        out.nodes.push(ReplNode::Func(segs));
                    }
                    _ => {
                        let n: usize = btext
                            .trim()
                            .parse()
                            .map_err(|_| parse_err("bad ${group}", ix))?;
                        out.nodes.push(ReplNode::Group(n));
                    }
                }
            }
            b'\\' => {
                ix += 1;
                if ix >= bytes.len() {
                    return Err(parse_err("dangling \\ at end", ix));
                }
                out.magical = true;
                let e = bytes[ix];
                if e >= 0x80 {
                    let (g, next) = build_grapheme(bytes, ix, bytes.len(), true);
                    ix = next;
                    out.nodes.push(if g.is_plain() {
                        ReplNode::UcLit(g.uc)
                    } else {
                        ReplNode::UcGraph(g)
                    });
                } else {
                    out.nodes.push(ReplNode::Lit(e));
                    ix += 1;
                }
            }
            c => {
                out.nodes.push(ReplNode::Lit(c));
                ix += 1;
            }
        }
    }
    Ok(out)
}

/// Literal bytes of the pattern with escapes resolved; `None` when a
/// true metacharacter makes it non-literal.
pub fn literal_bytes(pat: &MagicPat) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    for n in &pat.nodes {
        if n.rep.is_some() {
            return None;
        }
        match &n.node {
            Node::Lit(b) => out.push(*b),
            Node::UcLit(uc) => out.extend_from_slice(&utf8::encode_vec(*uc)),
            Node::UcGraph(g) => out.extend_from_slice(&g.to_bytes()),
            Node::Start(0) | Node::End(0) => {}
            _ => return None,
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(p: &MagicPat) -> Vec<&'static str> {
        p.nodes
            .iter()
            .map(|n| match n.node {
                Node::Lit(_) => "lit",
                Node::Any => "any",
                Node::AnyGph => "anygph",
                Node::Ccl(_) => "ccl",
                Node::Bol => "bol",
                Node::Eol => "eol",
                Node::UcLit(_) => "uclit",
                Node::UcGraph(_) => "ucgraph",
                Node::Prop(_) => "prop",
                Node::Kind { .. } => "kind",
                Node::Backref(_) => "backref",
                Node::Start(_) => "start",
                Node::End(_) => "end",
                Node::Choice(_) => "choice",
            })
            .collect()
    }

    #[test]
    fn literal_pattern_shape() {
        let p = mcstr("ab").unwrap();
        assert_eq!(kinds(&p), ["start", "lit", "lit", "end"]);
        assert_eq!(literal_bytes(&p).unwrap(), b"ab");
    }

    #[test]
    fn anchors_only_at_edges() {
        let p = mcstr("^a$").unwrap();
        assert_eq!(kinds(&p), ["start", "bol", "lit", "eol", "end"]);
        let p = mcstr("a^b$c").unwrap();
        assert_eq!(kinds(&p), ["start", "lit", "lit", "lit", "lit", "lit", "end"]);
    }

    #[test]
    fn repeats() {
        let p = mcstr("a*b+c{2,5}?d?").unwrap();
        let reps: Vec<Option<Rep>> = p.nodes.iter().map(|n| n.rep).collect();
        assert_eq!(
            reps[1],
            Some(Rep {
                low: 0,
                high: REP_MAX,
                minimal: false
            })
        );
        assert_eq!(
            reps[2],
            Some(Rep {
                low: 1,
                high: REP_MAX,
                minimal: false
            })
        );
        assert_eq!(
            reps[3],
            Some(Rep {
                low: 2,
                high: 5,
                minimal: true
            })
        );
        assert_eq!(
            reps[4],
            Some(Rep {
                low: 0,
                high: 1,
                minimal: false
            })
        );
    }

    #[test]
    fn classes() {
        let p = mcstr("[A-Za-z_][^0-9]").unwrap();
        let Node::Ccl(c1) = &p.nodes[1].node else {
            panic!("expected class");
        };
        assert!(c1.test_ascii(b'Q') && c1.test_ascii(b'q') && c1.test_ascii(b'_'));
        assert!(!c1.test_ascii(b'1'));
        let Node::Ccl(c2) = &p.nodes[2].node else {
            panic!("expected class");
        };
        assert!(c2.negate);
        assert!(c2.test_ascii(b'5'));
    }

    #[test]
    fn class_with_unicode_and_props() {
        let p = mcstr("[é\\p{Lu}\\d]").unwrap();
        let Node::Ccl(c) = &p.nodes[1].node else {
            panic!("expected class");
        };
        assert_eq!(c.ext.len(), 3);
    }

    #[test]
    fn groups_and_alternation() {
        let p = mcstr("(ab|cd)x").unwrap();
        assert_eq!(p.groups.len(), 2);
        // group 1's Start should link to its Choice node
        let start_ix = p
            .nodes
            .iter()
            .position(|n| matches!(n.node, Node::Start(1)))
            .unwrap();
        let nc = p.nodes[start_ix].next_choice;
        assert!(matches!(p.nodes[nc].node, Node::Choice(1)));
        assert_eq!(p.groups[1].parent, 0);
        assert!(matches!(p.nodes[p.groups[1].gpend].node, Node::End(1)));
    }

    #[test]
    fn parse_errors_carry_position() {
        assert!(mcstr("[ab").is_err());
        assert!(mcstr("a{2,1}").is_err());
        assert!(mcstr("(a").is_err());
        assert!(mcstr("*a").is_err());
    }

    #[test]
    fn meta_detection() {
        assert!(has_magic_meta("a.b"));
        assert!(has_magic_meta("a\\d"));
        assert!(!has_magic_meta("plain text"));
        assert!(has_non_ascii("naïve"));
        assert!(!has_non_ascii("ascii"));
    }

    #[test]
    fn category_codes() {
        assert_eq!(&category_code('A' as u32), b"Lu");
        assert_eq!(&category_code('1' as u32), b"Nd");
        let lu = Prop {
            code: *b"Lu",
            negate: false,
        };
        assert!(lu.probe('Z' as u32));
        assert!(!lu.probe('z' as u32));
        let l_major = Prop {
            code: [b'L', 0],
            negate: false,
        };
        assert!(l_major.probe('z' as u32));
    }

    #[test]
    fn replacement_compile() {
        let r = rmcstr("x${1}y${@:start=10,incr=5,fmt=%03d}z${%var}").unwrap();
        assert!(r.magical);
        assert_eq!(r.counters.len(), 1);
        assert_eq!(r.counters[0].start, 10);
        assert_eq!(r.counters[0].incr, 5);
        assert_eq!(r.counters[0].fmt, "%03d");
        assert!(matches!(r.nodes[1], ReplNode::Group(1)));
        assert!(matches!(r.nodes[3], ReplNode::Counter(0)));
        assert!(matches!(&r.nodes[5], ReplNode::Var(v) if v == "%var"));
    }

    #[test]
    fn replacement_function_call() {
        let r = rmcstr("${&upper ${1}}").unwrap();
        let ReplNode::Func(segs) = &r.nodes[0] else {
            panic!("expected function");
        };
        assert_eq!(segs.len(), 2);
        assert!(matches!(&segs[0], FcSeg::Lit(s) if s == "&upper "));
        assert!(matches!(segs[1], FcSeg::Group(1)));
    }

    #[test]
    fn counter_formatting() {
        assert_eq!(format_counter("%d", 7), "7");
        assert_eq!(format_counter("%03d", 7), "007");
        assert_eq!(format_counter("%3d", 7), "  7");
        assert_eq!(format_counter("%x", 255), "ff");
    }

    #[test]
    fn plain_replacement_is_not_magical() {
        let r = rmcstr("plain").unwrap();
        assert!(!r.magical);
        assert_eq!(r.nodes.len(), 5);
    }
}
