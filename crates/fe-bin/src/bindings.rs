//! Stock key bindings, installed at startup before any command files
//! run.

use core_state::{BindTarget, Editor};

fn k(s: &str) -> u32 {
    core_keymap::strtokey(s).expect("stock key name")
}

pub fn install(ed: &mut Editor) {
    ed.keys.pause_index_update = true;
    let table: &[(&str, &str)] = &[
        // prefixes and control
        ("^[", "meta-prefix"),
        ("^X", "cex-prefix"),
        ("^U", "universal-argument"),
        ("^G", "abort-command"),
        // motion
        ("^F", "forward-character"),
        ("^B", "backward-character"),
        ("^N", "next-line"),
        ("^P", "previous-line"),
        ("^A", "beginning-of-line"),
        ("^E", "end-of-line"),
        ("M-<", "beginning-of-file"),
        ("M->", "end-of-file"),
        ("^V", "next-page"),
        ("M-V", "previous-page"),
        ("M-G", "goto-line"),
        ("M-F", "next-word"),
        ("M-B", "previous-word"),
        ("^@", "set-mark"),
        ("^X^X", "exchange-point-and-mark"),
        // editing
        ("^M", "newline"),
        ("^O", "open-line"),
        ("^I", "handle-tab"),
        ("^Q", "quote-character"),
        ("^D", "delete-next-character"),
        ("^H", "delete-previous-character"),
        ("^K", "kill-to-end-of-line"),
        ("^W", "kill-region"),
        ("M-W", "copy-region"),
        ("^Y", "yank"),
        ("M-Y", "yank-replace"),
        ("^X^O", "delete-blank-lines"),
        ("M-D", "delete-next-word"),
        ("M-^H", "delete-previous-word"),
        ("^T", "transpose-characters"),
        ("M-U", "case-word-upper"),
        ("M-L", "case-word-lower"),
        ("M-C", "case-word-capitalize"),
        ("^X^U", "case-region-upper"),
        ("^X^L", "case-region-lower"),
        ("^X<", "narrow-to-region"),
        ("^X>", "widen-from-region"),
        // search
        ("^S", "search-forward"),
        ("^R", "search-reverse"),
        ("^XS", "incremental-search"),
        ("^XR", "reverse-incremental-search"),
        ("M-R", "replace-string"),
        ("M-Q", "query-replace-string"),
        ("M-S", "hunt-forward"),
        ("M-^S", "hunt-backward"),
        // windows
        ("^X2", "split-current-window"),
        ("^X1", "delete-other-windows"),
        ("^X0", "delete-window"),
        ("^XO", "next-window"),
        ("^XP", "previous-window"),
        ("^XZ", "grow-window"),
        ("^X^Z", "shrink-window"),
        ("M-!", "reposition-window"),
        ("^L", "redraw-display"),
        // files and buffers
        ("^X^F", "find-file"),
        ("^X^V", "view-file"),
        ("^X^R", "read-file"),
        ("^X^I", "insert-file"),
        ("^X^S", "save-file"),
        ("^X^W", "write-file"),
        ("^XN", "change-file-name"),
        ("^XB", "select-buffer"),
        ("^XX", "next-buffer"),
        ("^XK", "kill-buffer"),
        ("^X^B", "list-buffers"),
        // interpreter and macros
        ("M-X", "execute-named-command"),
        ("^X(", "begin-macro"),
        ("^X)", "end-macro"),
        ("^XE", "execute-macro"),
        ("M-^E", "reexecute"),
        ("^X!", "shell-command"),
        ("^X@", "pipe-command"),
        ("^X#", "filter-buffer"),
        // help
        ("^X?", "describe-key"),
        ("M-A", "apropos"),
        ("^XH", "describe-bindings"),
        ("M-K", "bind-to-key"),
        // leaving
        ("^X^C", "exit-emacs"),
        ("M-Z", "quick-exit"),
        // function keys
        ("FNA", "previous-line"),
        ("FNB", "next-line"),
        ("FNC", "forward-character"),
        ("FND", "backward-character"),
        ("FN5", "previous-page"),
        ("FN6", "next-page"),
        ("FNH", "beginning-of-line"),
        ("FNF", "end-of-line"),
        ("FN3", "delete-next-character"),
    ];
    for (key, name) in table {
        let func = ed
            .names
            .lookup(name)
            .unwrap_or_else(|| panic!("stock binding to unknown command {name}"))
            .func;
        ed.keys.bind(k(key), BindTarget::Func(func), 1);
    }
    // Rubout mirrors ^H.
    let back = ed.names.lookup("delete-previous-character").expect("registry").func;
    ed.keys.bind(0x7f, BindTarget::Func(back), 1);
    ed.keys.pause_index_update = false;
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_state::{CONTROL, CTLX, SPEC, ScriptedTerm};

    #[test]
    fn stock_table_installs_cleanly() {
        let mut ed = Editor::new(Box::new(ScriptedTerm::new()));
        ed.names = crate::registry::name_table();
        install(&mut ed);
        assert!(ed.keys.get(CONTROL | b'F' as u32).is_some());
        assert!(ed.keys.get(CTLX | CONTROL | b'S' as u32).is_some());
        assert!(ed.keys.get(0x7f).is_some());
        assert!(ed.keys.get(SPEC | b'A' as u32).is_some());
    }
}
