//! Low-level file transfer: byte streams split at newlines on the
//! way in, line endings and the final-newline policy applied on the
//! way out, with the cipher in the middle when Crypt mode is on.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use tracing::{info, warn};
use unicode_general_category::{GeneralCategory, get_general_category};

use core_state::{BufFlags, BufId, CmdResult, CryptMode, EdError, Editor, Modes, StrBuf};
use core_text::utf8::decode;

use crate::crypt::Cipher;

/// What a read brought in.
pub struct ReadInfo {
    pub nlines: usize,
    pub dos_file: bool,
    pub eol_missing: bool,
}

fn cipher_for(ed: &Editor, id: BufId) -> Option<Cipher> {
    if !ed.bufs.get(id).mode.contains(Modes::CRYPT) {
        return None;
    }
    let key: &[u8] = if ed.crypt.mode.contains(CryptMode::GLOBAL) {
        &ed.crypt.global_key
    } else {
        &ed.bufs.get(id).key
    };
    if key.is_empty() {
        return None;
    }
    Some(Cipher::with_key(key, ed.crypt.mode.contains(CryptMode::MOD95)))
}

/// Read `path` into the (already cleared) buffer. Splits at `\n`; a
/// first line ending in `\r` makes this a DOS file and every
/// subsequent `\r\n` is folded. A missing final newline is recorded.
pub fn read_into(ed: &mut Editor, id: BufId, path: &Path) -> CmdResult<ReadInfo> {
    let mut bytes = Vec::new();
    let mut file = File::open(path)
        .map_err(|e| EdError::msg(format!("Cannot open {}: {e}", path.display())))?;
    if let Err(e) = file.read_to_end(&mut bytes) {
        ed.bufs.get_mut(id).flags |= BufFlags::TRUNC;
        return Err(EdError::msg(format!("Read error: {e}")));
    }
    drop(file);
    if let Some(mut cipher) = cipher_for(ed, id) {
        cipher.process(&mut bytes);
    }

    let eol_missing = !bytes.is_empty() && !bytes.ends_with(b"\n");
    let mut dos_file = false;
    let mut nlines = 0usize;
    let header = ed.bufs.get(id).header;
    let segs: Vec<&[u8]> = if bytes.is_empty() {
        Vec::new()
    } else {
        bytes.split(|&b| b == b'\n').collect()
    };
    let nsegs = segs.len();
    for (ix, raw) in segs.into_iter().enumerate() {
        // split() yields a trailing empty slice for a final newline.
        if ix == nsegs - 1 && raw.is_empty() {
            break;
        }
        let mut line = raw;
        if nlines == 0 && line.last() == Some(&b'\r') {
            dos_file = true;
        }
        if dos_file && line.last() == Some(&b'\r') {
            line = &line[..line.len() - 1];
        }
        let lp = ed.lines.alloc(StrBuf::from_bytes(line));
        ed.lines.link_before(header, lp);
        nlines += 1;
    }

    let b = ed.bufs.get_mut(id);
    b.eol_missing = eol_missing;
    if dos_file {
        b.mode |= Modes::DOSLE;
    } else {
        b.mode.remove(Modes::DOSLE);
    }
    b.active = true;
    let first = ed.lines.forward(header);
    ed.bufs.get_mut(id).b.dot = (first, 0);
    info!(file = %path.display(), nlines, dos_file, "read");
    Ok(ReadInfo {
        nlines,
        dos_file,
        eol_missing,
    })
}

/// The binary heuristic: fewer than `threshold` percent of the first
/// hundred decoded codepoints carrying a Letter / Number /
/// Punctuation / Separator category classifies the content as binary.
pub fn looks_binary(bytes: &[u8], threshold: u32) -> bool {
    const PROBE: usize = 100;
    let mut total = 0usize;
    let mut text = 0usize;
    let mut ix = 0usize;
    while ix < bytes.len() && total < PROBE {
        let b = bytes[ix];
        if b < 0x7f {
            if b >= b' ' || b == b'\n' || b == b'\t' {
                text += 1;
            }
            ix += 1;
        } else {
            let (uc, used) = decode(bytes, ix, bytes.len());
            ix += used.max(1);
            if let Some(c) = char::from_u32(uc) {
                use GeneralCategory::*;
                match get_general_category(c) {
                    UppercaseLetter | LowercaseLetter | TitlecaseLetter | ModifierLetter
                    | OtherLetter | DecimalNumber | LetterNumber | OtherNumber
                    | ConnectorPunctuation | DashPunctuation | OpenPunctuation
                    | ClosePunctuation | InitialPunctuation | FinalPunctuation
                    | OtherPunctuation | SpaceSeparator | LineSeparator | ParagraphSeparator => {
                        text += 1;
                    }
                    _ => {}
                }
            }
        }
        total += 1;
    }
    if total == 0 {
        return false;
    }
    (text * 100) < (threshold as usize) * total
}

/// Write a buffer's lines to `path`. Line terminators are `\r\n` in
/// DOS mode. The final newline is suppressed only when the EOL was
/// missing on read and the content is encrypted or classifies as
/// binary; a write failure is never silently discarded.
pub fn write_from(ed: &mut Editor, id: BufId, path: &Path) -> CmdResult<usize> {
    let header = ed.bufs.get(id).header;
    let dos = ed.bufs.get(id).mode.contains(Modes::DOSLE);
    let mut out: Vec<u8> = Vec::new();
    let mut nlines = 0usize;
    for lp in ed.lines.ring_iter(header) {
        out.extend_from_slice(ed.lbytes(lp));
        if dos {
            out.push(b'\r');
        }
        out.push(b'\n');
        nlines += 1;
    }
    let crypting = cipher_for(ed, id).is_some();
    if ed.bufs.get(id).eol_missing && !out.is_empty() {
        let reason = if crypting {
            Some("crypt")
        } else if looks_binary(&out, ed.binary_threshold) {
            Some("binary")
        } else {
            None
        };
        if let Some(reason) = reason {
            let strip = if dos { 2 } else { 1 };
            out.truncate(out.len() - strip);
            info!(reason, "final newline suppressed");
        }
    }
    if let Some(mut cipher) = cipher_for(ed, id) {
        cipher.process(&mut out);
    }

    let mut file = File::create(path)
        .map_err(|e| EdError::msg(format!("Cannot write {}: {e}", path.display())))?;
    let write_err = file.write_all(&out).err();
    let sync_err = file.sync_data().err();
    let close_err = {
        drop(file);
        None::<std::io::Error>
    };
    if let Some(e) = write_err {
        // A close error after a write error would only mask it.
        warn!(err = %e, "write failed");
        return Err(EdError::msg(format!("Write I/O error: {e}")));
    }
    if let Some(e) = sync_err.or(close_err) {
        return Err(EdError::msg(format!("Write I/O error: {e}")));
    }
    info!(file = %path.display(), nlines, "wrote");
    Ok(nlines)
}
