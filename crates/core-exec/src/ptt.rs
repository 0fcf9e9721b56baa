//! Phonetic translation tables: compiling a table buffer into its
//! rule list, and the commands that select tables. The on-type
//! rewrite itself lives with the edit primitives.

use tracing::debug;

use core_complete::Cmplt;
use core_state::{
    BufId, BufType, CaseSet, CmdResult, Editor, Modes, PttRule, PttTable, WFlags, failed,
};
use core_text::case::{CaseWork, recase};
use core_text::utf8;

use crate::eval::nextarg_raw;
use crate::token::token;

fn display_code_of(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut offs = utf8::next_offset(bytes, 0, bytes.len(), true);
    offs = utf8::next_offset(bytes, offs, bytes.len(), true);
    String::from_utf8_lossy(&bytes[..offs]).into_owned()
}

fn caseset_of(word: &str) -> Option<CaseSet> {
    Some(match word {
        "caseset-on" => CaseSet::On,
        "caseset-off" => CaseSet::Off,
        "caseset-capinit1" => CaseSet::CapInitOne,
        "caseset-capinitall" => CaseSet::CapInitAll,
        "caseset-lowinit1" => CaseSet::LowInitOne,
        "caseset-lowinitall" => CaseSet::LowInitAll,
        _ => return None,
    })
}

/// Compile the contents of a table buffer into its rule list. Each
/// line is one rule: optional `^` word anchor, a from-string, then
/// to-string tokens (`0xNN` emits a byte, `U+XXXX` a codepoint, bare
/// tokens verbatim).
pub fn ptt_compile(ed: &mut Editor, bufid: BufId) -> CmdResult {
    let bname = ed.bufs.get(bufid).name.clone();
    let mut display_code = display_code_of(bname.strip_prefix('/').unwrap_or(&bname));
    let mut caseset = CaseSet::On;
    let mut rules: Vec<PttRule> = Vec::new();

    let header = ed.bufs.get(bufid).header;
    let lines: Vec<String> = ed
        .lines
        .ring_iter(header)
        .map(|lp| String::from_utf8_lossy(ed.lbytes(lp)).into_owned())
        .collect();

    for line in lines {
        let (first, mut rest) = token(&line);
        if first.is_empty() {
            continue;
        }
        let (bow, from_raw) = match first.text.strip_prefix('^') {
            Some(stripped) if !first.quoted => (true, stripped.to_string()),
            _ => (false, first.text.clone()),
        };
        if let Some(cs) = caseset_of(&from_raw) {
            caseset = cs;
            continue;
        }
        if from_raw == "display-code" {
            let (tok, _) = token(rest);
            if !tok.text.is_empty() {
                display_code = display_code_of(&tok.text);
            }
            continue;
        }

        let mut to = Vec::new();
        loop {
            let (tok, r) = token(rest);
            rest = r;
            if tok.is_empty() {
                break;
            }
            let t = tok.text.as_str();
            if let Some(hex) = t.strip_prefix("0x") {
                if let Ok(b) = u8::from_str_radix(hex, 16) {
                    to.push(b);
                }
            } else if let Some(hex) = t.strip_prefix("U+") {
                if let Ok(cp) = u32::from_str_radix(hex, 16) {
                    to.extend_from_slice(&utf8::encode_vec(cp));
                }
            } else {
                to.extend_from_slice(t.as_bytes());
            }
        }
        if to.is_empty() {
            continue;
        }

        // Case-matching rules are compared lowercased, so store the
        // from-string lowered once here. Upper and lower case forms
        // may differ in byte count.
        let (from, from_len_uc) = if caseset != CaseSet::Off {
            let r = recase(CaseWork::Lower, from_raw.as_bytes());
            (r.bytes, r.cp_count)
        } else {
            let b = from_raw.as_bytes().to_vec();
            let n = utf8::cp_count(&b);
            (b, n)
        };
        if from.is_empty() {
            continue;
        }
        let start_at = utf8::prev_offset(&from, from.len(), false).unwrap_or(0);
        let (final_uc, _) = utf8::decode(&from, start_at, from.len());
        let to_len_uc = utf8::cp_count(&to);
        rules.push(PttRule {
            from,
            to,
            final_uc,
            from_len_uc,
            to_len_uc,
            bow_only: bow,
            caseset,
        });
    }

    if rules.is_empty() {
        return failed(format!("No rules in {bname}"));
    }
    debug!(table = %bname, rules = rules.len(), "phonetic table compiled");
    ed.bufs.get_mut(bufid).ptt = Some(PttTable {
        rules,
        display_code: format!("P-{display_code}"),
    });
    ed.ptt = Some(bufid);
    ed.cur_win_mut().flags |= WFlags::MODE;
    Ok(())
}

/// Select which translation table to use.
pub fn set_pttable(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    if ed.ptt.is_none() {
        return failed("No phonetic translation tables are yet defined!");
    }
    let name = nextarg_raw(ed, "Translation table to use? ", Cmplt::Phon)?;
    let bufname = format!("/{name}");
    let Some(id) = ed.bufs.find(&bufname) else {
        return failed(format!("Table {bufname} was not found"));
    };
    if ed.bufs.get(id).btype != BufType::PhoneticTable {
        return failed(format!("Buffer {bufname} is not a translation buffer."));
    }
    ed.ptt = Some(id);
    ed.cur_win_mut().flags |= WFlags::MODE;
    Ok(())
}

/// Cycle to the next translation table.
pub fn next_pttable(ed: &mut Editor, f: bool, n: i32) -> CmdResult {
    let n = if f { n } else { 1 };
    if n < 1 {
        return failed("Bad repeat count");
    }
    let Some(cur) = ed.ptt else {
        return failed("No phonetic translation tables are yet defined!");
    };
    let order = ed.bufs.ordered();
    let tables: Vec<BufId> = order
        .into_iter()
        .filter(|&id| ed.bufs.get(id).btype == BufType::PhoneticTable)
        .collect();
    let Some(pos) = tables.iter().position(|&id| id == cur) else {
        return failed("No current table");
    };
    let next = tables[(pos + n as usize) % tables.len()];
    ed.ptt = Some(next);
    ed.cur_win_mut().flags |= WFlags::MODE;
    Ok(())
}

/// Toggle Phonetic mode on the current buffer: negative argument
/// forces off, positive on, zero toggles.
pub fn toggle_ptmode(ed: &mut Editor, f: bool, n: i32) -> CmdResult {
    if ed.ptt.is_none() {
        return failed("No phonetic translation tables are yet defined!");
    }
    let n = if f { n } else { 0 };
    let on = ed.curb().mode.contains(Modes::PHON);
    let turn_off = n < 0 || (n == 0 && on);
    if turn_off {
        ed.curb_mut().mode.remove(Modes::PHON);
    } else {
        ed.curb_mut().mode.insert(Modes::PHON);
    }
    ed.cur_win_mut().flags |= WFlags::MODE;
    Ok(())
}
