use std::fs;
use std::path::PathBuf;

use klint_lang::{LoadOrigin, Loader, Severity};

fn fixture_root(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("target")
        .join("tmp-tests")
        .join(name)
}

fn write_file(path: &PathBuf, text: &str) {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    fs::write(path, text).expect("write file");
}

fn cli_origin() -> LoadOrigin {
    LoadOrigin {
        file: "<command line>".to_string(),
        line: 0,
    }
}

#[test]
fn continuation_lines_fold_and_keep_alignment() {
    let lines = Loader::fold("depends on A && \\\n\tB\nconfig C\n", "Kconfig");
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0].text, "depends on A && \tB");
    assert_eq!(lines[0].line, 1);
    assert_eq!(lines[1].text, "#continued line ( B )");
    assert_eq!(lines[1].line, 2);
    assert_eq!(lines[2].text, "config C");
    assert_eq!(lines[2].line, 3);
}

#[test]
fn chained_continuations_accumulate_into_one_line() {
    let lines = Loader::fold("default A \\\nB \\\nC\n", "Kconfig");
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0].text, "default A B C");
    assert!(lines[1].is_continuation_placeholder());
    assert!(lines[2].is_continuation_placeholder());
}

#[test]
fn loading_same_file_twice_warns_once_and_keeps_first_loader() {
    let root = fixture_root("loader_twice");
    let file = root.join("Kconfig");
    write_file(&file, "config FOO\n\tbool\n");
    let path = file.to_string_lossy().into_owned();

    let mut loader = Loader::new();
    let first_origin = LoadOrigin {
        file: "a/Kconfig".to_string(),
        line: 4,
    };
    let second_origin = LoadOrigin {
        file: "b/Kconfig".to_string(),
        line: 9,
    };
    let first = loader.load(&path, &first_origin, false).expect("first load");
    let second = loader
        .load(&path, &second_origin, false)
        .expect("second load");
    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 2, "second load still proceeds");

    let warnings: Vec<_> = loader
        .diagnostics()
        .iter()
        .filter(|diag| diag.code == "W_ALREADY_SOURCED")
        .collect();
    assert_eq!(warnings.len(), 1, "{:#?}", loader.diagnostics());
    assert_eq!(warnings[0].file, "b/Kconfig");
    assert_eq!(loader.load_record()[&path].file, "a/Kconfig");
    assert_eq!(loader.load_record()[&path].line, 4);
}

#[test]
fn missing_file_warns_unless_expanding_a_glob() {
    let root = fixture_root("loader_missing");
    let _ = fs::create_dir_all(&root);
    let path = root.join("Kconfig.nope").to_string_lossy().into_owned();

    let mut loader = Loader::new();
    let lines = loader.load(&path, &cli_origin(), false).expect("load");
    assert!(lines.is_empty());

    let mut glob_loader = Loader::new();
    let glob_lines = glob_loader.load(&path, &cli_origin(), true).expect("load");
    assert!(glob_lines.is_empty());

    assert_eq!(loader.diagnostics().len(), 1, "{:#?}", loader.diagnostics());
    assert_eq!(loader.diagnostics()[0].code, "W_MISSING_FILE");
    assert!(glob_loader.diagnostics().is_empty());
}

#[test]
fn glob_source_expands_matching_subdirectories_in_order() {
    let root = fixture_root("loader_glob");
    write_file(&root.join("sub/b/Kconfig"), "config GB\n\tbool\n");
    write_file(&root.join("sub/a/Kconfig"), "config GA\n\tbool\n");
    write_file(&root.join("sub/.hidden/Kconfig"), "config HIDDEN\n\tbool\n");
    let _ = fs::create_dir_all(root.join("sub/empty"));
    let pattern = format!("{}/sub/*/Kconfig", root.to_string_lossy());

    let mut loader = Loader::new();
    let lines = loader.load(&pattern, &cli_origin(), false).expect("load");
    let configs: Vec<_> = lines
        .iter()
        .filter(|line| line.text.starts_with("config "))
        .map(|line| line.text.clone())
        .collect();
    assert_eq!(configs, vec!["config GA", "config GB"]);

    assert!(
        loader.diagnostics().is_empty(),
        "glob expansion must not warn about non-matching subdirectories: {:#?}",
        loader.diagnostics()
    );
}

#[test]
fn glob_prefix_that_is_not_a_directory_warns() {
    let root = fixture_root("loader_glob_prefix");
    let _ = fs::create_dir_all(&root);
    let pattern = format!("{}/nosuch/*/Kconfig", root.to_string_lossy());

    let mut loader = Loader::new();
    let lines = loader.load(&pattern, &cli_origin(), false).expect("load");
    assert!(lines.is_empty());
    assert_eq!(loader.diagnostics().len(), 1, "{:#?}", loader.diagnostics());
    assert_eq!(loader.diagnostics()[0].code, "W_GLOB_PREFIX");
    assert_eq!(loader.diagnostics()[0].severity, Severity::Warning);
}

#[test]
fn file_without_trailing_newline_warns() {
    let root = fixture_root("loader_newline");
    let file = root.join("Kconfig");
    write_file(&file, "config FOO\n\tbool");
    let path = file.to_string_lossy().into_owned();

    let mut loader = Loader::new();
    loader.load(&path, &cli_origin(), false).expect("load");
    assert_eq!(loader.diagnostics().len(), 1, "{:#?}", loader.diagnostics());
    assert_eq!(loader.diagnostics()[0].code, "W_NO_TRAILING_NEWLINE");
    assert_eq!(loader.diagnostics()[0].line, 2);
}
