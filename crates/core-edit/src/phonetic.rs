//! Phonetic on-type rewriting.
//!
//! When the current buffer's Phonetic mode is on, each typed
//! codepoint is inserted and then every rule whose final codepoint
//! matches is tried against the text just behind dot. On a hit the
//! matched span is replaced by the rule's to-string and re-cased
//! according to the rule's discipline.

use unicode_general_category::{GeneralCategory, get_general_category};

use core_state::{CaseSet, CmdResult, Editor, PttRule, failed};
use core_text::case::{CaseWork, cp_lower};
use core_text::grapheme::build_grapheme;
use core_text::utf8;

use crate::delete::{ldelete, ldelgrapheme};
use crate::insert::{linsert_uc, linstr};
use crate::motion::forw_grapheme;
use crate::word::{ensure_case, inword};

fn is_letter(uc: u32) -> bool {
    char::from_u32(uc).is_some_and(|c| {
        matches!(
            get_general_category(c),
            GeneralCategory::UppercaseLetter
                | GeneralCategory::LowercaseLetter
                | GeneralCategory::TitlecaseLetter
                | GeneralCategory::ModifierLetter
                | GeneralCategory::OtherLetter
        )
    })
}

fn rule_matches(ed: &Editor, rule: &PttRule, typed: u32) -> Option<usize> {
    let mut wc = typed;
    if rule.caseset != CaseSet::Off {
        wc = cp_lower(wc);
    }
    if rule.final_uc != wc {
        return None;
    }
    let (lp, doto) = ed.dot();
    let bytes = ed.lbytes(lp);
    let start_at = utf8::back_cp(bytes, doto, rule.from_len_uc)?;
    let hit = if rule.caseset != CaseSet::Off {
        utf8::eq_fold_lower(bytes, start_at, doto, &rule.from)
    } else {
        doto - start_at == rule.from.len() && &bytes[start_at..doto] == rule.from.as_slice()
    };
    if !hit {
        return None;
    }
    if rule.bow_only && start_at > 0 {
        // The rule only fires at word start: the preceding grapheme
        // must not be a letter.
        let prev = utf8::prev_offset(bytes, start_at, true)?;
        let (g, _) = build_grapheme(bytes, prev, bytes.len(), false);
        if is_letter(g.uc) {
            return None;
        }
    }
    Some(start_at)
}

/// Handle one typed codepoint with phonetic translation active.
/// Inserts the character, then applies the first matching rule.
/// Fails (after removing the probe character) when no rule fires, so
/// the caller knows plain insertion happened instead.
pub fn ptt_handler(ed: &mut Editor, c: u32) -> CmdResult {
    let Some(ptt_buf) = ed.ptt else {
        return failed("");
    };
    if ed.bufs.get(ptt_buf).ptt.is_none() {
        core_exec::ptt::ptt_compile(ed, ptt_buf)?;
    }

    let orig_doto = ed.dot().1;
    linsert_uc(ed, 1, c)?;

    let rules = ed
        .bufs
        .get(ptt_buf)
        .ptt
        .as_ref()
        .map(|t| t.rules.clone())
        .unwrap_or_default();

    for rule in &rules {
        let Some(start_at) = rule_matches(ed, rule, c) else {
            continue;
        };

        // Case discipline: note whether the typed text led with the
        // trigger case before the span is replaced.
        let (lp, _) = ed.dot();
        let mut edit_case = false;
        let mut set_case = CaseWork::Keep;
        if rule.caseset != CaseSet::Off {
            let bytes = ed.lbytes(lp);
            let (fc, _) = utf8::decode(bytes, start_at, bytes.len());
            let c = char::from_u32(fc);
            let (need, case) = match rule.caseset {
                CaseSet::LowInitOne | CaseSet::LowInitAll => {
                    (c.is_some_and(|c| get_general_category(c) == GeneralCategory::LowercaseLetter),
                     CaseWork::Lower)
                }
                _ => (
                    c.is_some_and(|c| get_general_category(c) == GeneralCategory::UppercaseLetter),
                    CaseWork::Upper,
                ),
            };
            edit_case = need;
            set_case = case;
        }

        let end = ed.dot().1;
        ed.set_dot(lp, start_at);
        ldelete(ed, (end - start_at) as u64, false)?;
        linstr(ed, &rule.to)?;

        if edit_case && rule.caseset != CaseSet::Off {
            let mut count = rule.to_len_uc;
            ed.set_dot(lp, start_at);
            ensure_case(ed, set_case)?;
            forw_grapheme(ed, 1)?;
            match rule.caseset {
                CaseSet::CapInitOne | CaseSet::LowInitOne => {
                    while count > 1 {
                        count -= 1;
                        if forw_grapheme(ed, 1).is_err() {
                            break;
                        }
                    }
                }
                CaseSet::On => {
                    while count > 1 {
                        count -= 1;
                        if forw_grapheme(ed, 1).is_err() {
                            break;
                        }
                        ensure_case(ed, set_case)?;
                    }
                }
                CaseSet::CapInitAll | CaseSet::LowInitAll => {
                    let mut was_inword = inword(ed);
                    while count > 1 {
                        count -= 1;
                        if forw_grapheme(ed, 1).is_err() {
                            break;
                        }
                        let now = inword(ed);
                        if now && !was_inword {
                            ensure_case(ed, set_case)?;
                        }
                        was_inword = now;
                    }
                }
                CaseSet::Off => {}
            }
        }
        return Ok(());
    }

    // No rule fired: take the probe character back out.
    let (lp, _) = ed.dot();
    ed.set_dot(lp, orig_doto);
    ldelgrapheme(ed, 1, false)?;
    Err(core_state::EdError::msg(""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{contents, editor_with};
    use core_state::{BufFlags, BufType, Modes};

    fn with_table(ed: &mut Editor, lines: &[&str]) {
        let id = ed
            .bufs
            .create(
                &mut ed.lines,
                "/test",
                BufType::PhoneticTable,
                BufFlags::INVS,
                Modes::empty(),
            )
            .unwrap();
        core_exec::fill_buffer(ed, id, &lines.join("\n"));
        core_exec::ptt::ptt_compile(ed, id).unwrap();
    }

    fn type_str(ed: &mut Editor, s: &str) {
        // Mirrors self-insert: a failed translation falls back to the
        // plain character.
        for c in s.chars() {
            if ptt_handler(ed, c as u32).is_err() {
                linsert_uc(ed, 1, c as u32).unwrap();
            }
        }
    }

    #[test]
    fn simple_rewrite_on_final_char() {
        let mut ed = editor_with("");
        with_table(&mut ed, &["th U+03B8"]);
        type_str(&mut ed, "atho");
        assert_eq!(contents(&ed), "aθo");
    }

    #[test]
    fn case_preserved_for_capitalised_trigger() {
        let mut ed = editor_with("");
        with_table(&mut ed, &["th U+03B8"]);
        type_str(&mut ed, "Th");
        // Trigger began uppercase: the replacement is re-cased.
        assert_eq!(contents(&ed), "Θ");
    }

    #[test]
    fn caseset_off_is_byte_exact() {
        let mut ed = editor_with("");
        with_table(&mut ed, &["caseset-off", "th X"]);
        type_str(&mut ed, "Th");
        assert_eq!(contents(&ed), "Th"); // 'T' != 't', no match
        type_str(&mut ed, " th");
        assert_eq!(contents(&ed), "Th X");
    }

    #[test]
    fn word_anchor_blocks_mid_word() {
        let mut ed = editor_with("");
        with_table(&mut ed, &["^ch Z"]);
        type_str(&mut ed, "echo");
        assert_eq!(contents(&ed), "echo");
        type_str(&mut ed, " cha");
        assert_eq!(contents(&ed), "echo Za");
    }

    #[test]
    fn no_rule_leaves_plain_text() {
        let mut ed = editor_with("");
        with_table(&mut ed, &["xy Q"]);
        assert!(ptt_handler(&mut ed, b'a' as u32).is_err());
        assert_eq!(contents(&ed), "");
    }
}
