use clap::Parser;

pub(crate) mod args;
pub(crate) mod commands;
pub(crate) mod diagnostics;
pub(crate) mod scan;

use self::args::{Cli, Commands};
pub(crate) use self::diagnostics::print_diagnostics;

/// Runs the selected command and returns the process exit code: the number
/// of counted diagnostics, or 1 for a fatal failure.
pub(crate) fn entry() -> i32 {
    let cli = Cli::parse();
    match run(cli) {
        Ok(count) => count,
        Err(err) => {
            eprintln!("{}", err);
            1
        }
    }
}

fn run(cli: Cli) -> Result<i32, String> {
    match cli.command {
        Commands::Check {
            entry,
            src_tree,
            exclude,
            format,
            quiet,
        } => commands::check::execute(&entry, src_tree.as_deref(), &exclude, format, quiet),
        Commands::Dump { entry, out, quiet } => commands::dump::execute(&entry, &out, quiet),
    }
}
