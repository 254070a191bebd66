use std::fs;
use std::path::Path;

use klint_lang::{parse_entry, render_dump};

use crate::cli::args::OutputFormat;
use crate::cli::print_diagnostics;

pub(crate) fn execute(entry: &Path, out: &Path, quiet: bool) -> Result<i32, String> {
    let report = parse_entry(entry).map_err(|err| err.to_string())?;
    let text = render_dump(&report.lines);

    if out == Path::new("-") {
        print!("{}", text);
    } else {
        fs::write(out, text).map_err(|err| format!("failed to write {}: {err}", out.display()))?;
    }

    if !quiet {
        print_diagnostics(&report.diagnostics, OutputFormat::Human);
    }
    Ok(report
        .diagnostics
        .iter()
        .filter(|diag| diag.counted())
        .count() as i32)
}
