use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "klint", version, about = "Kconfig tree linter")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    /// Load the whole tree and run the consistency checks.
    Check {
        #[arg(value_name = "KCONFIG")]
        entry: PathBuf,

        /// Source tree consulted for symbol usage and orphaned
        /// configuration files; without it those two checks are skipped.
        #[arg(long)]
        src_tree: Option<PathBuf>,

        #[arg(long = "exclude", action = ArgAction::Append)]
        exclude: Vec<PathBuf>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
        format: OutputFormat,

        /// Suppress diagnostic text; the exit status still counts.
        #[arg(long, short, default_value_t = false, action = ArgAction::SetTrue)]
        quiet: bool,
    },
    /// Write the reconstructed line-by-line tree with origin annotations.
    Dump {
        #[arg(value_name = "KCONFIG")]
        entry: PathBuf,

        /// Output destination, `-` for stdout.
        #[arg(long, default_value = "-")]
        out: PathBuf,

        #[arg(long, short, default_value_t = false, action = ArgAction::SetTrue)]
        quiet: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum OutputFormat {
    Human,
    Json,
}
