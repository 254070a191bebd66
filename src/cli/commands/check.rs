use std::path::{Path, PathBuf};

use klint_lang::{check_report, parse_entry, CheckOptions};

use crate::cli::args::OutputFormat;
use crate::cli::print_diagnostics;
use crate::cli::scan::{scan_used_names, walk_tree};

pub(crate) fn execute(
    entry: &Path,
    src_tree: Option<&Path>,
    exclude: &[PathBuf],
    format: OutputFormat,
    quiet: bool,
) -> Result<i32, String> {
    let mut report = parse_entry(entry).map_err(|err| err.to_string())?;

    let mut used_names = None;
    let mut tree_files = None;
    if let Some(root) = src_tree {
        let exclude: Vec<PathBuf> = exclude
            .iter()
            .map(|dir| {
                if dir.is_absolute() {
                    dir.clone()
                } else {
                    root.join(dir)
                }
            })
            .collect();
        tree_files = Some(
            walk_tree(root)
                .map_err(|err| format!("failed to walk {}: {err}", root.display()))?,
        );
        used_names = Some(
            scan_used_names(root, &exclude)
                .map_err(|err| format!("failed to scan {}: {err}", root.display()))?,
        );
    }

    let mut all = std::mem::take(&mut report.diagnostics);
    all.extend(check_report(
        &report,
        &CheckOptions {
            used_names: used_names.as_ref(),
            tree_files: tree_files.as_deref(),
        },
    ));

    if !quiet {
        print_diagnostics(&all, format);
    }
    Ok(all.iter().filter(|diag| diag.counted()).count() as i32)
}
