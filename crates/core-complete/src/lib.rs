//! Minibuffer completion dispatch.
//!
//! Each context supplies an enumerator over its candidates; the
//! driver accumulates the longest common prefix and formats the
//! remaining choices into one line for display. The search-ring
//! context completes nothing (Tab rotates the ring instead, handled
//! by the minibuffer itself).

use std::fs;
use std::path::{Path, PathBuf};

use tracing::trace;

use core_state::{BufType, Editor};
use core_state::vars::ENV_VARS;

/// What is being looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cmplt {
    #[default]
    None,
    File,
    Buffer,
    /// Procedure buffers, named without their `/` prefix.
    Proc,
    /// Phonetic-table buffers, named without their `/` prefix.
    Phon,
    FuncName,
    /// `$env` then `%user` variables.
    Var,
    /// No lookup; Tab rotates the search ring.
    SearchRing,
}

/// Outcome of a completion attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Input extended to the longest common prefix.
    pub text: String,
    /// Exactly one candidate remained.
    pub unique: bool,
    /// Remaining candidates formatted to the given width, when the
    /// prefix was ambiguous.
    pub choices: Option<String>,
}

/// Expand a leading `~` in a file picture: `~/` from `$HOME`,
/// `~user/` from the password database.
pub fn tilde_expand(input: &str) -> String {
    if !input.starts_with('~') {
        return input.to_string();
    }
    let rest = &input[1..];
    if rest.is_empty() || rest.starts_with('/') {
        if let Ok(home) = std::env::var("HOME") {
            return format!("{home}{rest}");
        }
        return input.to_string();
    }
    let (user, tail) = match rest.find('/') {
        Some(ix) => (&rest[..ix], &rest[ix..]),
        None => (rest, ""),
    };
    if let Some(dir) = passwd_home(user) {
        return format!("{dir}{tail}");
    }
    input.to_string()
}

fn passwd_home(user: &str) -> Option<String> {
    let pw = fs::read_to_string("/etc/passwd").ok()?;
    for line in pw.lines() {
        let mut fields = line.split(':');
        if fields.next() == Some(user) {
            return fields.nth(4).map(|s| s.to_string());
        }
    }
    None
}

fn file_candidates(picture: &str) -> Vec<String> {
    let expanded = tilde_expand(picture);
    let p = Path::new(&expanded);
    let (dir, leaf): (PathBuf, String) = if expanded.ends_with('/') {
        (p.to_path_buf(), String::new())
    } else {
        (
            p.parent()
                .filter(|d| !d.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
            p.file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_default(),
        )
    };
    let Ok(entries) = fs::read_dir(&dir) else {
        return Vec::new();
    };
    let show_hidden = leaf.starts_with('.');
    let mut out = Vec::new();
    for e in entries.flatten() {
        let name = e.file_name().to_string_lossy().into_owned();
        if !name.starts_with(&leaf) {
            continue;
        }
        if !show_hidden && name.starts_with('.') {
            continue;
        }
        let mut cand = if dir == Path::new(".") && !picture.starts_with("./") {
            name.clone()
        } else {
            let mut d = dir.to_string_lossy().into_owned();
            if !d.ends_with('/') {
                d.push('/');
            }
            format!("{d}{name}")
        };
        if e.file_type().is_ok_and(|t| t.is_dir()) {
            cand.push('/');
        }
        out.push(cand);
    }
    out.sort();
    out
}

fn buffer_candidates(ed: &Editor, picture: &str, want: Cmplt) -> Vec<String> {
    let mut out = Vec::new();
    for id in ed.bufs.ordered() {
        let b = ed.bufs.get(id);
        let name: &str = match want {
            Cmplt::Proc => {
                if b.btype != BufType::Procedure {
                    continue;
                }
                b.name.strip_prefix('/').unwrap_or(&b.name)
            }
            Cmplt::Phon => {
                if b.btype != BufType::PhoneticTable {
                    continue;
                }
                b.name.strip_prefix('/').unwrap_or(&b.name)
            }
            _ => {
                // Hidden buffers only offered once their convention
                // prefix has been typed.
                if (b.is_invisible() || b.name.starts_with('[')) && !picture.starts_with('[') {
                    continue;
                }
                if b.name.starts_with('/') && !picture.starts_with('/') {
                    continue;
                }
                &b.name
            }
        };
        if name.starts_with(picture) {
            out.push(name.to_string());
        }
    }
    out
}

fn name_candidates(ed: &Editor, picture: &str) -> Vec<String> {
    ed.names
        .iter_sorted()
        .map(|e| e.name.to_string())
        .filter(|n| n.starts_with(picture))
        .collect()
}

fn var_candidates(ed: &Editor, picture: &str) -> Vec<String> {
    let mut out = Vec::new();
    match picture.as_bytes().first() {
        Some(b'$') | None => {
            for v in ENV_VARS {
                let cand = format!("${v}");
                if cand.starts_with(picture) {
                    out.push(cand);
                }
            }
        }
        _ => {}
    }
    if matches!(picture.as_bytes().first(), Some(b'%') | None) {
        let mut users: Vec<String> = ed.uvars.iter().map(|(n, _)| format!("%{n}")).collect();
        users.sort();
        out.extend(users.into_iter().filter(|c| c.starts_with(picture)));
    }
    out
}

fn common_prefix(cands: &[String]) -> String {
    let Some(first) = cands.first() else {
        return String::new();
    };
    let mut prefix = first.clone();
    for c in &cands[1..] {
        let matched = prefix
            .as_bytes()
            .iter()
            .zip(c.as_bytes())
            .take_while(|(a, b)| a == b)
            .count();
        prefix.truncate(matched);
    }
    prefix
}

fn choices_line(cands: &[String], width: usize) -> String {
    let mut line = String::new();
    for c in cands {
        if !line.is_empty() {
            line.push_str("  ");
        }
        if line.len() + c.len() > width.saturating_sub(4) {
            line.push_str("...");
            break;
        }
        line.push_str(c);
    }
    line
}

/// Attempt to complete `input` in the given context. `None` when no
/// candidate matches (callers beep).
pub fn complete(ed: &Editor, ctx: Cmplt, input: &str, width: usize) -> Option<Completion> {
    let cands = match ctx {
        Cmplt::None | Cmplt::SearchRing => return None,
        Cmplt::File => file_candidates(input),
        Cmplt::Buffer => buffer_candidates(ed, input, Cmplt::Buffer),
        Cmplt::Proc => buffer_candidates(ed, input, Cmplt::Proc),
        Cmplt::Phon => buffer_candidates(ed, input, Cmplt::Phon),
        Cmplt::FuncName => name_candidates(ed, input),
        Cmplt::Var => var_candidates(ed, input),
    };
    trace!(?ctx, input, n = cands.len(), "completion candidates");
    if cands.is_empty() {
        return None;
    }
    let prefix = common_prefix(&cands);
    let text = if prefix.len() > input.len() {
        prefix
    } else {
        input.to_string()
    };
    if cands.len() == 1 {
        return Some(Completion {
            text,
            unique: true,
            choices: None,
        });
    }
    Some(Completion {
        text,
        unique: false,
        choices: Some(choices_line(&cands, width)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_state::{BufFlags, Modes, ScriptedTerm};

    fn ed() -> Editor {
        Editor::new(Box::new(ScriptedTerm::new()))
    }

    #[test]
    fn buffer_completion_prefix() {
        let mut ed = ed();
        for n in ["alpha", "alpine", "beta"] {
            ed.bufs
                .create(
                    &mut ed.lines,
                    n,
                    BufType::Normal,
                    BufFlags::empty(),
                    Modes::empty(),
                )
                .unwrap();
        }
        let c = complete(&ed, Cmplt::Buffer, "alp", 80).unwrap();
        assert!(!c.unique);
        assert_eq!(c.text, "alp");
        let choices = c.choices.unwrap();
        assert!(choices.contains("alpha") && choices.contains("alpine"));
        let c = complete(&ed, Cmplt::Buffer, "be", 80).unwrap();
        assert!(c.unique);
        assert_eq!(c.text, "beta");
    }

    #[test]
    fn proc_completion_strips_slash() {
        let mut ed = ed();
        ed.bufs
            .create(
                &mut ed.lines,
                "/hello",
                BufType::Procedure,
                BufFlags::empty(),
                Modes::empty(),
            )
            .unwrap();
        let c = complete(&ed, Cmplt::Proc, "he", 80).unwrap();
        assert!(c.unique);
        assert_eq!(c.text, "hello");
    }

    #[test]
    fn hidden_buffers_need_prefix() {
        let mut ed = ed();
        ed.bufs
            .create(
                &mut ed.lines,
                "[list]",
                BufType::Special,
                BufFlags::INVS,
                Modes::empty(),
            )
            .unwrap();
        assert!(complete(&ed, Cmplt::Buffer, "[l", 80).is_some());
        // bare prefix search must not surface it
        let c = complete(&ed, Cmplt::Buffer, "", 80);
        if let Some(c) = c {
            assert!(!c.text.starts_with('['));
        }
    }

    #[test]
    fn var_completion_covers_both_spaces() {
        let mut ed = ed();
        ed.set_uvar("count", "1");
        let c = complete(&ed, Cmplt::Var, "$se", 80).unwrap();
        assert!(c.text.starts_with("$se"));
        let c = complete(&ed, Cmplt::Var, "%c", 80).unwrap();
        assert!(c.unique);
        assert_eq!(c.text, "%count");
    }

    #[test]
    fn file_completion_in_tempdir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        std::fs::write(dir.path().join("notes.bak"), "x").unwrap();
        std::fs::create_dir(dir.path().join("notesdir")).unwrap();
        let picture = format!("{}/no", dir.path().display());
        let ed = ed();
        let c = complete(&ed, Cmplt::File, &picture, 200).unwrap();
        assert!(c.text.ends_with("notes"));
        assert!(!c.unique);
        assert!(c.choices.unwrap().contains("notesdir/"));
    }

    #[test]
    fn tilde_expansion_home() {
        unsafe { std::env::set_var("HOME", "/tmp/fe-home") };
        assert_eq!(tilde_expand("~/x"), "/tmp/fe-home/x");
        assert_eq!(tilde_expand("plain"), "plain");
    }
}
