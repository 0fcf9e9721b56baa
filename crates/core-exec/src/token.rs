//! Command-line tokenizer.
//!
//! Tokens are whitespace separated; `"…"` groups a quoted argument;
//! `~n ~r ~t ~b ~f` are character escapes (any other `~x` yields `x`).

/// A chopped token plus whether it was quoted (quoted tokens are
/// never variable-expanded).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub quoted: bool,
}

impl Token {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && !self.quoted
    }
}

/// Chop one token off `src`, returning it and the rest of the line.
pub fn token(src: &str) -> (Token, &str) {
    let src = src.trim_start_matches([' ', '\t']);
    let bytes = src.as_bytes();
    let mut out = String::new();
    let mut quoted = false;
    let mut quotef = false;
    let mut i = 0usize;
    while i < bytes.len() {
        let c = bytes[i];
        if c == b'~' {
            i += 1;
            if i >= bytes.len() {
                break;
            }
            let e = bytes[i];
            i += 1;
            out.push(match e {
                b'r' => '\r',
                b'n' => '\n',
                b't' => '\t',
                b'b' => '\u{8}',
                b'f' => '\u{c}',
                other => other as char,
            });
            continue;
        }
        if quotef {
            if c == b'"' {
                break;
            }
        } else if c == b' ' || c == b'\t' {
            break;
        }
        if c == b'"' {
            quotef = true;
            // Only a fully quoted token is shielded from evaluation;
            // a quote later on (as in @"prompt") just groups.
            if out.is_empty() {
                quoted = true;
            }
            i += 1;
            continue;
        }
        // Keep multibyte sequences intact.
        let ch_len = src[i..].chars().next().map(char::len_utf8).unwrap_or(1);
        out.push_str(&src[i..i + ch_len]);
        i += ch_len;
    }
    // Step over the terminator.
    if i < bytes.len() {
        i += 1;
    }
    (Token { text: out, quoted }, &src[i.min(src.len())..])
}

/// Token classification by leading character, applied to evaluated or
/// raw text as the caller requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokType {
    Nul,
    /// `@"prompt"`: interactive argument.
    Arg,
    /// `%name`: user variable.
    Var,
    /// `$name`: environment variable.
    Env,
    /// `.name`: buffer variable.
    BufVar,
    /// `&fun`: function.
    Fun,
    /// `!directive`
    Dir,
    /// `*label`
    Label,
    /// Numeric literal.
    Lit,
    /// Anything else: a command name (or bare string).
    Cmd,
}

pub fn gettyp(tok: &str) -> TokType {
    match tok.as_bytes().first() {
        None => TokType::Nul,
        Some(b'@') => TokType::Arg,
        Some(b'%') => TokType::Var,
        Some(b'$') => TokType::Env,
        Some(b'.') => TokType::BufVar,
        Some(b'&') => TokType::Fun,
        Some(b'!') => TokType::Dir,
        Some(b'*') => TokType::Label,
        Some(c) if c.is_ascii_digit() || *c == b'-' => TokType::Lit,
        Some(_) => TokType::Cmd,
    }
}

/// Leading-integer parse with `atoi` semantics (0 on junk).
pub fn atoi(s: &str) -> i32 {
    let s = s.trim_start();
    let mut end = 0;
    for (ix, c) in s.char_indices() {
        if (ix == 0 && (c == '-' || c == '+')) || c.is_ascii_digit() {
            end = ix + c.len_utf8();
        } else {
            break;
        }
    }
    s[..end].parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn toks(mut src: &str) -> Vec<String> {
        let mut out = Vec::new();
        loop {
            let (t, rest) = token(src);
            if t.is_empty() {
                break;
            }
            out.push(t.text);
            src = rest;
        }
        out
    }

    #[test]
    fn whitespace_split() {
        assert_eq!(toks("set %x  10"), ["set", "%x", "10"]);
    }

    #[test]
    fn quoting_groups() {
        let (t, rest) = token("\"two words\" tail");
        assert!(t.quoted);
        assert_eq!(t.text, "two words");
        assert_eq!(rest, " tail");
    }

    #[test]
    fn escapes() {
        assert_eq!(toks("a~nb ~t ~~"), ["a\nb", "\t", "~"]);
    }

    #[test]
    fn empty_quote_is_a_token() {
        let (t, _) = token("\"\" x");
        assert!(t.quoted);
        assert_eq!(t.text, "");
        assert!(!t.is_empty());
    }

    #[test]
    fn classification() {
        assert_eq!(gettyp("%u"), TokType::Var);
        assert_eq!(gettyp("$search"), TokType::Env);
        assert_eq!(gettyp("&add"), TokType::Fun);
        assert_eq!(gettyp("!while"), TokType::Dir);
        assert_eq!(gettyp("*lbl"), TokType::Label);
        assert_eq!(gettyp("42"), TokType::Lit);
        assert_eq!(gettyp("-3"), TokType::Lit);
        assert_eq!(gettyp("forward-character"), TokType::Cmd);
        assert_eq!(gettyp(""), TokType::Nul);
    }

    #[test]
    fn atoi_semantics() {
        assert_eq!(atoi("42x"), 42);
        assert_eq!(atoi("-7"), -7);
        assert_eq!(atoi("junk"), 0);
    }
}
