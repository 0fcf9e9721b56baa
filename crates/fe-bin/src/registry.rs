//! The function-name table: every editor action, bindable and
//! callable by name.

use core_state::{FuncOpts, NameEntry, NameTable};

use crate::cmds;

macro_rules! entry {
    ($name:literal, $func:path) => {
        NameEntry {
            name: $name,
            func: $func,
            opts: FuncOpts::empty(),
        }
    };
    ($name:literal, $func:path, $opts:expr) => {
        NameEntry {
            name: $name,
            func: $func,
            opts: $opts,
        }
    };
}

/// Build the full command registry. Indices are sorted once here at
/// startup.
pub fn name_table() -> NameTable {
    let not_mb = FuncOpts::NOT_MB;
    let entries = vec![
        // motion
        entry!("forward-character", core_edit::motion::forwchar),
        entry!("backward-character", core_edit::motion::backchar),
        entry!("next-line", core_edit::motion::forwline),
        entry!("previous-line", core_edit::motion::backline),
        entry!("beginning-of-line", core_edit::motion::gotobol),
        entry!("end-of-line", core_edit::motion::gotoeol),
        entry!("beginning-of-file", core_edit::motion::gotobob),
        entry!("end-of-file", core_edit::motion::gotoeob),
        entry!("goto-line", core_edit::motion::gotoline),
        entry!("next-page", core_edit::motion::forwpage),
        entry!("previous-page", core_edit::motion::backpage),
        entry!("set-mark", core_edit::motion::setmark),
        entry!("exchange-point-and-mark", core_edit::motion::swapmark),
        entry!("next-word", core_edit::word::forwword),
        entry!("previous-word", core_edit::word::backword),
        // insertion
        entry!("newline", core_edit::insert::insert_newline),
        entry!("open-line", core_edit::insert::openline),
        entry!("handle-tab", core_edit::insert::insert_tab),
        entry!("insert-space", core_edit::insert::insspace),
        entry!("insert-string", core_edit::insert::istring),
        entry!("quote-character", core_edit::insert::quote_char),
        // deletion
        entry!("delete-next-character", core_edit::delete::forwdel),
        entry!("delete-previous-character", core_edit::delete::backdel),
        entry!("kill-to-end-of-line", core_edit::delete::killtext),
        entry!("delete-blank-lines", core_edit::delete::deblank),
        entry!("delete-next-word", core_edit::word::delfword),
        entry!("delete-previous-word", core_edit::word::delbword),
        // kill ring
        entry!("yank", core_edit::kill::yank),
        entry!("yank-minibuffer", core_edit::kill::yankmb),
        entry!("yank-replace", core_edit::kill::yank_replace),
        entry!("kill-region", core_edit::region::killregion),
        entry!("copy-region", core_edit::region::copyregion),
        // case
        entry!("case-word-upper", core_edit::word::upperword),
        entry!("case-word-lower", core_edit::word::lowerword),
        entry!("case-word-capitalize", core_edit::word::capword),
        entry!("case-region-upper", core_edit::region::upperregion),
        entry!("case-region-lower", core_edit::region::lowerregion),
        // narrowing
        entry!("narrow-to-region", core_edit::region::narrow),
        entry!("widen-from-region", core_edit::region::widen),
        // windows
        entry!("split-current-window", core_edit::windows::splitwind, not_mb),
        entry!("delete-other-windows", core_edit::windows::onlywind, not_mb),
        entry!("delete-window", core_edit::windows::delwind, not_mb),
        entry!("next-window", core_edit::windows::nextwind, not_mb),
        entry!("previous-window", core_edit::windows::prevwind, not_mb),
        entry!("grow-window", core_edit::windows::enlargewind, not_mb),
        entry!("shrink-window", core_edit::windows::shrinkwind, not_mb),
        entry!("reposition-window", core_edit::windows::reposition),
        entry!("redraw-display", core_edit::windows::redraw),
        // search and replace
        entry!("search-forward", core_search::forwsearch),
        entry!("search-reverse", core_search::backsearch),
        entry!("hunt-forward", core_search::forwhunt, FuncOpts::SEARCH_OK),
        entry!("hunt-backward", core_search::backhunt, FuncOpts::SEARCH_OK),
        entry!("incremental-search", core_search::fisearch, not_mb),
        entry!(
            "reverse-incremental-search",
            core_search::risearch,
            not_mb
        ),
        entry!("replace-string", core_search::sreplace),
        entry!("query-replace-string", core_search::qreplace, not_mb),
        // interpreter
        entry!("execute-command-line", core_exec::commands::execcmd),
        entry!("execute-named-command", core_exec::commands::namedcmd),
        entry!("execute-buffer", core_exec::commands::execbuf),
        entry!("execute-procedure", core_exec::commands::execproc),
        entry!("execute-file", core_exec::commands::execfile),
        entry!("reexecute", core_exec::commands::reexecute),
        entry!("store-procedure", core_exec::commands::storeproc),
        entry!("store-macro", core_exec::commands::storemac),
        entry!("store-pttable", core_exec::commands::storepttable),
        entry!("set", core_exec::commands::set),
        entry!("begin-macro", core_exec::commands::ctlxlp, FuncOpts::SKIP_IN_MACRO),
        entry!("end-macro", core_exec::commands::ctlxrp, FuncOpts::SKIP_IN_MACRO),
        entry!("execute-macro", core_exec::commands::ctlxe),
        // phonetic translation
        entry!("set-pttable", core_exec::ptt::set_pttable),
        entry!("next-pttable", core_exec::ptt::next_pttable),
        entry!("toggle-ptmode", core_exec::ptt::toggle_ptmode),
        // bindings
        entry!("bind-to-key", core_keymap::bindtokey),
        entry!("unbind-key", core_keymap::unbindkey),
        entry!("buffer-to-key", core_keymap::buffertokey),
        entry!("describe-bindings", core_keymap::desbind, not_mb),
        entry!("describe-key", core_keymap::deskey),
        entry!("apropos", core_keymap::apro, not_mb),
        entry!("meta-prefix", core_keymap::metafn),
        entry!("cex-prefix", core_keymap::cex),
        entry!("universal-argument", core_keymap::unarg),
        entry!("abort-command", core_keymap::ctrlg),
        // files
        entry!("find-file", core_file::filefind, not_mb),
        entry!("view-file", core_file::viewfile, not_mb),
        entry!("read-file", core_file::fileread, not_mb),
        entry!("insert-file", core_file::insfile),
        entry!("save-file", core_file::filesave),
        entry!("write-file", core_file::filewrite),
        entry!("change-file-name", core_file::filename),
        entry!("set-encryption-key", core_file::set_encryption_key),
        // buffers
        entry!("select-buffer", core_file::usebuffer, not_mb),
        entry!("next-buffer", core_file::nextbuffer, not_mb),
        entry!("kill-buffer", core_file::killbuffer),
        entry!("name-buffer", core_file::namebuffer),
        entry!("list-buffers", core_file::listbuffers, not_mb),
        // shell
        entry!("shell-command", core_file::spawn),
        entry!("pipe-command", core_file::pipecmd, not_mb),
        entry!("filter-buffer", core_file::filter_buffer),
        // the rest
        entry!("add-mode", cmds::add_mode),
        entry!("delete-mode", cmds::delete_mode),
        entry!("add-global-mode", cmds::add_global_mode),
        entry!("delete-global-mode", cmds::delete_global_mode),
        entry!("set-fill-column", cmds::set_fill_column),
        entry!("transpose-characters", cmds::twiddle),
        entry!("exit-emacs", cmds::quit, not_mb),
        entry!("quick-exit", cmds::quickexit, not_mb),
        entry!("version", cmds::show_version),
    ];
    NameTable::build(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_work_after_build() {
        let nt = name_table();
        assert!(nt.lookup("yank").is_some());
        assert!(nt.lookup("query-replace-string").is_some());
        assert!(nt.lookup("no-such").is_none());
        // Reverse lookup by handler.
        let f = nt.lookup("find-file").unwrap().func;
        assert_eq!(nt.name_of(f), Some("find-file"));
    }

    #[test]
    fn names_are_unique() {
        let nt = name_table();
        let mut names: Vec<&str> = nt.iter_sorted().map(|e| e.name).collect();
        let before = names.len();
        names.dedup();
        assert_eq!(before, names.len());
    }
}
