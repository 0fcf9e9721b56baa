//! File adapter: transfer in/out with line-ending and cipher
//! handling, lock files, buffer activation and the file/buffer/shell
//! command set.

pub mod buffers;
pub mod crypt;
pub mod fio;
pub mod lock;
pub mod spawn;

use core_input::{get1key, getstring_hidden};
use core_state::{CmdResult, CryptMode, Editor, Modes, failed};

pub use buffers::{
    activate, bclear, filefind, filename, fileread, filesave, filewrite, insfile, killbuffer,
    listbuffers, namebuffer, nextbuffer, swbuffer, usebuffer, viewfile,
};
pub use spawn::{filter_buffer, pipecmd, spawn};

/// Cap on stored key material.
pub const NKEY: usize = 128;

/// set-encryption-key: read a key (unechoed) and store its encrypted
/// form globally or on the buffer. On a buffer that was read before
/// Crypt mode went on, ask whether the existing contents should be
/// re-encrypted on the next write rather than guessing.
pub fn set_encryption_key(ed: &mut Editor, _f: bool, _n: i32) -> CmdResult {
    if ed.crypt.mode.is_empty() {
        return failed("Crypt is not enabled. Set $crypt_mode");
    }
    let global = ed.crypt.mode.contains(CryptMode::GLOBAL);
    let prompt = if global {
        "Global encryption string: "
    } else {
        "Buffer encryption string: "
    };
    let plain = getstring_hidden(ed, prompt)?;
    if plain.is_empty() {
        return failed("No key");
    }
    let mut key = crypt::encrypt_key(
        plain.as_bytes(),
        ed.crypt.mode.contains(CryptMode::MOD95),
        ed.crypt.mode.contains(CryptMode::FILL63),
    );
    key.truncate(NKEY);

    let had_key = if global {
        !ed.crypt.global_key.is_empty()
    } else {
        !ed.curb().key.is_empty()
    };
    if global {
        ed.crypt.global_key = key;
    } else {
        ed.curb_mut().key = key;
    }

    // The pre-read plain buffer question, asked outright.
    let id = ed.curb_id();
    let has_content = {
        let header = ed.bufs.get(id).header;
        ed.lines.forward(header) != header
    };
    if !had_key
        && has_content
        && ed.bufs.get(id).active
        && ed.bufs.get(id).mode.contains(Modes::CRYPT)
    {
        ed.mlforce("Re-encrypt existing contents on next write? (y/n)");
        let c = get1key(ed)?;
        if (c & 0xff) as u8 == b'y' {
            ed.lchange(core_state::WFlags::MODE);
        } else {
            // Leave the buffer unmarked; only new content will be
            // written through the cipher when it is next saved
            // explicitly.
            ed.mlwrite("[Key set; existing contents left as read]");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_state::{CONTROL, ScriptedTerm};

    fn keys_for(s: &str) -> Vec<u32> {
        let mut v: Vec<u32> = s.chars().map(|c| c as u32).collect();
        v.push(CONTROL | b'M' as u32);
        v
    }

    #[test]
    fn key_requires_crypt_mode() {
        let mut ed = Editor::new(Box::new(ScriptedTerm::new()));
        assert!(set_encryption_key(&mut ed, false, 1).is_err());
    }

    #[test]
    fn buffer_key_stored_encrypted() {
        let mut ed = Editor::new(Box::new(ScriptedTerm::with_keys(keys_for("hush"))));
        ed.crypt.mode = CryptMode::RAW;
        set_encryption_key(&mut ed, false, 1).unwrap();
        let key = &ed.curb().key;
        assert!(!key.is_empty());
        assert_ne!(key.as_slice(), b"hush");
    }

    #[test]
    fn global_key_mode() {
        let mut ed = Editor::new(Box::new(ScriptedTerm::with_keys(keys_for("shared"))));
        ed.crypt.mode = CryptMode::RAW | CryptMode::GLOBAL;
        set_encryption_key(&mut ed, false, 1).unwrap();
        assert!(!ed.crypt.global_key.is_empty());
        assert!(ed.curb().key.is_empty());
    }

    #[test]
    fn reencrypt_question_marks_buffer() {
        let mut keys = keys_for("pw");
        keys.push(b'y' as u32);
        let mut ed = Editor::new(Box::new(ScriptedTerm::with_keys(keys)));
        ed.crypt.mode = CryptMode::RAW;
        let id = ed.curb_id();
        ed.curb_mut().mode |= Modes::CRYPT;
        core_exec::fill_buffer(&mut ed, id, "already here");
        set_encryption_key(&mut ed, false, 1).unwrap();
        assert!(ed.curb().is_changed());
    }
}
