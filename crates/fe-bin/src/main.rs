//! ferrite: a programmable terminal editor.
//!
//! Startup order: registry and stock bindings, the startup command
//! file (searched along home, the configured path, then `$PATH`),
//! command-line files, then the read-dispatch-paint loop.

mod bindings;
mod cmds;
mod loop_;
mod registry;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use core_state::Editor;
use core_terminal::CrosstermDriver;

#[derive(Parser, Debug)]
#[command(name = "fe", version, about = "a programmable terminal editor")]
struct Cli {
    /// Open the first file read-only.
    #[arg(short = 'v', long)]
    view: bool,

    /// Position dot at this line of the first file.
    #[arg(short = 'g', long)]
    goto: Option<i32>,

    /// Search forward for this string in the first file.
    #[arg(short = 's', long)]
    search: Option<String>,

    /// Startup command file (also reachable as `-@ <path>`).
    #[arg(long = "rc")]
    rc: Option<PathBuf>,

    /// Files to edit; a bare `+N` positions dot at line N of the file
    /// that follows it.
    files: Vec<String>,
}

fn init_logging() {
    let dir = std::env::temp_dir();
    let appender = tracing_appender::rolling::never(dir, "ferrite.log");
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(appender)
        .with_ansi(false)
        .init();
}

fn default_conf_path() -> Vec<PathBuf> {
    let mut out = Vec::new();
    if let Ok(home) = std::env::var("HOME") {
        out.push(PathBuf::from(home));
    }
    out.push(PathBuf::from("/usr/local/share/ferrite"));
    out.push(PathBuf::from("/usr/share/ferrite"));
    out
}

fn startup_files(ed: &mut Editor, cli: &Cli) {
    let status = match &cli.rc {
        Some(path) => core_exec::commands::dofile(ed, path),
        None => match core_exec::commands::flook(ed, ".ferriterc") {
            Some(path) => core_exec::commands::dofile(ed, &path),
            None => Ok(()),
        },
    };
    if let Err(e) = status {
        ed.report(&e);
    }
}

fn visit_cli_files(ed: &mut Editor, cli: &Cli) {
    let mut goto_line: Option<i32> = cli.goto;
    let mut first = true;
    for arg in &cli.files {
        if let Some(n) = arg.strip_prefix('+').and_then(|n| n.parse::<i32>().ok()) {
            goto_line = Some(n);
            continue;
        }
        ed.exec.clexec = true;
        ed.exec.execstr = Some(format!("\"{arg}\""));
        let open = if cli.view && first {
            core_file::viewfile(ed, false, 1)
        } else {
            core_file::filefind(ed, false, 1)
        };
        ed.exec.clexec = false;
        ed.exec.execstr = None;
        if let Err(e) = open {
            ed.report(&e);
            continue;
        }
        if let Some(n) = goto_line.take() {
            let _ = core_edit::motion::gotoline(ed, true, n);
        }
        if first && let Some(pat) = &cli.search {
            ed.search.set_pat(pat);
            let _ = core_search::forwhunt(ed, false, 1);
        }
        first = false;
    }
}

fn run(cli: Cli) -> Result<i32> {
    let driver = CrosstermDriver::new().context("terminal probe failed")?;
    let mut ed = Editor::new(Box::new(driver));
    ed.names = registry::name_table();
    bindings::install(&mut ed);
    ed.conf_path = default_conf_path();

    startup_files(&mut ed, &cli);
    visit_cli_files(&mut ed, &cli);

    ed.term.open().context("cannot enter raw mode")?;
    info!("session start");
    let code = loop_::main_loop(&mut ed);
    let _ = ed.term.close();
    info!(code, "session end");
    Ok(code)
}

fn main() -> ExitCode {
    // `-@ path` predates the long-option era; map it across.
    let args: Vec<String> = std::env::args()
        .flat_map(|a| {
            if a == "-@" {
                vec!["--rc".to_string()]
            } else if let Some(rest) = a.strip_prefix("-@") {
                vec!["--rc".to_string(), rest.to_string()]
            } else {
                vec![a]
            }
        })
        .collect();
    init_logging();
    let cli = Cli::parse_from(args);
    match run(cli) {
        Ok(code) => ExitCode::from(code.clamp(0, 255) as u8),
        Err(err) => {
            eprintln!("fe: {err:#}");
            ExitCode::from(1)
        }
    }
}
