use std::collections::BTreeSet;
use std::path::PathBuf;

use klint_lang::{check_report, parse_str, CheckOptions, Diagnostic, Severity};

fn checks_for(source: &str) -> Vec<Diagnostic> {
    let report = parse_str(source);
    check_report(&report, &CheckOptions::default())
}

fn codes(diagnostics: &[Diagnostic]) -> Vec<&'static str> {
    diagnostics.iter().map(|diag| diag.code).collect()
}

#[test]
fn default_after_an_unconditional_default_is_unreachable() {
    let diagnostics = checks_for("config FOO\n\tbool \"Foo\"\n\tdefault y\n\tdefault n\n");
    let unreachable: Vec<_> = diagnostics
        .iter()
        .filter(|diag| diag.code == "E_UNREACHABLE_DEFAULT")
        .collect();
    assert_eq!(unreachable.len(), 1, "{diagnostics:#?}");
    assert_eq!(unreachable[0].line, 4);
    assert!(unreachable[0].message.contains("FOO"), "{}", unreachable[0].message);
}

#[test]
fn every_default_after_the_terminal_one_is_reported() {
    let diagnostics =
        checks_for("config FOO\n\tbool\n\tdefault y\n\tdefault n if BAR\n\tdefault n\n");
    let unreachable: Vec<_> = diagnostics
        .iter()
        .filter(|diag| diag.code == "E_UNREACHABLE_DEFAULT")
        .map(|diag| diag.line)
        .collect();
    assert_eq!(unreachable, vec![4, 5], "{diagnostics:#?}");
}

#[test]
fn conditional_defaults_before_the_terminal_one_are_fine() {
    let diagnostics = checks_for("config FOO\n\tbool\n\tdefault y if BAR\n\tdefault n\n");
    assert!(
        !codes(&diagnostics).contains(&"E_UNREACHABLE_DEFAULT"),
        "{diagnostics:#?}"
    );
}

#[test]
fn dependencies_keep_later_defaults_reachable() {
    let diagnostics =
        checks_for("config FOO\n\tbool\n\tdepends on BAR\n\tdefault y\n\tdefault n\n");
    assert!(
        !codes(&diagnostics).contains(&"E_UNREACHABLE_DEFAULT"),
        "{diagnostics:#?}"
    );

    let enclosing = checks_for("if BAR\nconfig FOO\n\tbool\n\tdefault y\n\tdefault n\nendif\n");
    assert!(
        !codes(&enclosing).contains(&"E_UNREACHABLE_DEFAULT"),
        "{enclosing:#?}"
    );
}

#[test]
fn unreachable_defaults_are_scoped_to_one_definition_instance() {
    let diagnostics = checks_for(
        "config FOO\n\tbool\n\tdefault y\nconfig FOO\n\tdefault n\n",
    );
    assert!(
        !codes(&diagnostics).contains(&"E_UNREACHABLE_DEFAULT"),
        "a default in a later instance is not shadowed: {diagnostics:#?}"
    );
}

#[test]
fn references_to_undeclared_symbols_are_errors() {
    let diagnostics = checks_for("config FOO\n\tbool\n\tdepends on BAR\n");
    let undefined: Vec<_> = diagnostics
        .iter()
        .filter(|diag| diag.code == "E_UNDEFINED_SYMBOL")
        .collect();
    assert_eq!(undefined.len(), 1, "{diagnostics:#?}");
    assert_eq!(undefined[0].severity, Severity::Error);
    assert_eq!(undefined[0].line, 3, "cites the use site");
    assert!(undefined[0].message.contains("BAR"));
}

#[test]
fn every_use_site_of_an_undeclared_symbol_is_cited() {
    let diagnostics =
        checks_for("config FOO\n\tbool\n\tdepends on BAR\nconfig BAZ\n\tbool\n\tdepends on BAR\n");
    let lines: Vec<_> = diagnostics
        .iter()
        .filter(|diag| diag.code == "E_UNDEFINED_SYMBOL")
        .map(|diag| diag.line)
        .collect();
    assert_eq!(lines, vec![3, 6], "{diagnostics:#?}");
}

#[test]
fn unused_symbols_warn_when_nothing_references_them() {
    let report = parse_str("config FOO\n\tbool\nconfig FOO\n\tbool\nconfig BAR\n\tbool\n\tdepends on FOO\n");
    let used = BTreeSet::new();
    let diagnostics = check_report(
        &report,
        &CheckOptions {
            used_names: Some(&used),
            tree_files: None,
        },
    );
    let unused: Vec<_> = diagnostics
        .iter()
        .filter(|diag| diag.code == "W_UNUSED_SYMBOL")
        .collect();
    // FOO is referenced by BAR's dependency; BAR is used nowhere.
    assert_eq!(unused.len(), 1, "{diagnostics:#?}");
    assert!(unused[0].message.contains("BAR"));
}

#[test]
fn usage_scanner_hits_suppress_the_unused_warning() {
    let report = parse_str("config FOO\n\tbool\n");
    let mut used = BTreeSet::new();
    used.insert("FOO".to_string());
    let diagnostics = check_report(
        &report,
        &CheckOptions {
            used_names: Some(&used),
            tree_files: None,
        },
    );
    assert!(
        !codes(&diagnostics).contains(&"W_UNUSED_SYMBOL"),
        "{diagnostics:#?}"
    );
}

#[test]
fn unused_check_is_skipped_without_a_scan() {
    let diagnostics = checks_for("config FOO\n\tbool\n");
    assert!(
        !codes(&diagnostics).contains(&"W_UNUSED_SYMBOL"),
        "{diagnostics:#?}"
    );
}

#[test]
fn unsourced_config_files_are_orphans() {
    let report = parse_str("config FOO\n\tbool\n");
    let tree_files = vec![
        PathBuf::from("tree/drivers/Kconfig"),
        PathBuf::from("tree/drivers/Kconfig.debug"),
        PathBuf::from("tree/drivers/main.c"),
    ];
    let diagnostics = check_report(
        &report,
        &CheckOptions {
            used_names: None,
            tree_files: Some(&tree_files),
        },
    );
    let orphans: Vec<_> = diagnostics
        .iter()
        .filter(|diag| diag.code == "W_ORPHAN_FILE")
        .map(|diag| diag.file.clone())
        .collect();
    assert_eq!(
        orphans,
        vec![
            "tree/drivers/Kconfig".to_string(),
            "tree/drivers/Kconfig.debug".to_string()
        ],
        "{diagnostics:#?}"
    );
}

#[test]
fn check_diagnostics_come_out_in_symbol_name_order() {
    let diagnostics = checks_for(
        "config ZETA\n\tbool\n\tdefault y\n\tdefault n\nconfig ALPHA\n\tbool\n\tdefault y\n\tdefault n\n",
    );
    let subjects: Vec<_> = diagnostics
        .iter()
        .filter(|diag| diag.code == "E_UNREACHABLE_DEFAULT")
        .map(|diag| diag.message.clone())
        .collect();
    assert_eq!(subjects.len(), 2, "{diagnostics:#?}");
    assert!(subjects[0].contains("ALPHA"), "{subjects:#?}");
    assert!(subjects[1].contains("ZETA"), "{subjects:#?}");
}
