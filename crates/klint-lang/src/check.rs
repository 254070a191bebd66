use std::collections::BTreeSet;
use std::path::PathBuf;

use tracing::debug;

use crate::error::Diagnostic;
use crate::parser::ParseReport;
use crate::symbol::DefaultEntry;

/// External inputs for the whole-tree checks. `used_names` comes from a
/// textual scan of the source tree for generated configuration names;
/// `tree_files` from a filesystem walk. Either can be absent, which skips
/// the check that needs it.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckOptions<'a> {
    pub used_names: Option<&'a BTreeSet<String>>,
    pub tree_files: Option<&'a [PathBuf]>,
}

pub fn check_report(report: &ParseReport, options: &CheckOptions<'_>) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    check_unreachable_defaults(report, &mut diagnostics);
    check_undefined_references(report, &mut diagnostics);
    if let Some(used_names) = options.used_names {
        check_unused_symbols(report, used_names, &mut diagnostics);
    }
    if let Some(tree_files) = options.tree_files {
        check_orphan_files(report, tree_files, &mut diagnostics);
    }
    debug!(count = diagnostics.len(), "consistency checks finished");
    diagnostics
}

/// The first default with no condition on a definition with no dependencies
/// always applies; anything after it in the same definition instance can
/// never be reached.
fn check_unreachable_defaults(report: &ParseReport, diagnostics: &mut Vec<Diagnostic>) {
    for symbol in report.symbols.symbols() {
        for definition in &symbol.definitions {
            let mut terminal: Option<&DefaultEntry> = None;
            for entry in &definition.defaults {
                if let Some(first) = terminal {
                    diagnostics.push(Diagnostic::error(
                        "E_UNREACHABLE_DEFAULT",
                        format!(
                            "default for '{}' is unreachable; the unconditional default at {}:{} always applies",
                            symbol.name, definition.file, first.line
                        ),
                        definition.file.clone(),
                        entry.line,
                    ));
                } else if entry.condition.is_none() && definition.depends_on.is_empty() {
                    terminal = Some(entry);
                }
            }
        }
    }
}

fn check_undefined_references(report: &ParseReport, diagnostics: &mut Vec<Diagnostic>) {
    for (name, occurrences) in report.symbols.references() {
        if report.symbols.get(name).is_some() {
            continue;
        }
        for occurrence in occurrences {
            diagnostics.push(Diagnostic::error(
                "E_UNDEFINED_SYMBOL",
                format!("'{name}' referenced but never defined"),
                occurrence.file.clone(),
                occurrence.line,
            ));
        }
    }
}

fn check_unused_symbols(
    report: &ParseReport,
    used_names: &BTreeSet<String>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for symbol in report.symbols.symbols() {
        if report.symbols.references().contains_key(&symbol.name) {
            continue;
        }
        if used_names.contains(&symbol.name) {
            continue;
        }
        for definition in &symbol.definitions {
            diagnostics.push(Diagnostic::warning(
                "W_UNUSED_SYMBOL",
                format!("'{}' is defined but never used", symbol.name),
                definition.file.clone(),
                definition.line,
            ));
        }
    }
}

fn is_config_file_name(name: &str) -> bool {
    name == "Kconfig" || name.starts_with("Kconfig.")
}

fn check_orphan_files(
    report: &ParseReport,
    tree_files: &[PathBuf],
    diagnostics: &mut Vec<Diagnostic>,
) {
    for path in tree_files {
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if !is_config_file_name(name) {
            continue;
        }
        let key = path.to_string_lossy();
        if !report.load_record.contains_key(key.as_ref()) {
            diagnostics.push(Diagnostic::warning(
                "W_ORPHAN_FILE",
                format!("'{key}' is never sourced"),
                key.into_owned(),
                0,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::is_config_file_name;

    #[test]
    fn config_file_names() {
        assert!(is_config_file_name("Kconfig"));
        assert!(is_config_file_name("Kconfig.debug"));
        assert!(!is_config_file_name("Kconfigs"));
        assert!(!is_config_file_name("README"));
    }
}
