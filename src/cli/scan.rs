use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::debug;

/// Prefix carried by generated configuration names in source code.
pub(crate) const USED_NAME_PREFIX: &str = "CONFIG_";

/// Every file under `root`, sorted, for the orphan-file check.
pub(crate) fn walk_tree(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                stack.push(entry.path());
            } else if file_type.is_file() {
                files.push(entry.path());
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Scans a source tree for `CONFIG_<NAME>` tokens and returns the bare
/// names, for the unused-symbol check. Unreadable (binary) files are
/// skipped, as are the excluded directories.
pub(crate) fn scan_used_names(
    root: &Path,
    exclude: &[PathBuf],
) -> io::Result<BTreeSet<String>> {
    let pattern = Regex::new(&format!(r"{USED_NAME_PREFIX}([A-Za-z0-9_]+)"))
        .expect("usage pattern compiles");
    let mut used = BTreeSet::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if exclude.iter().any(|excluded| path.starts_with(excluded)) {
                continue;
            }
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                stack.push(path);
                continue;
            }
            if !file_type.is_file() {
                continue;
            }
            let Ok(text) = fs::read_to_string(&path) else {
                continue;
            };
            for capture in pattern.captures_iter(&text) {
                used.insert(capture[1].to_string());
            }
        }
    }
    debug!(names = used.len(), "usage scan finished");
    Ok(used)
}
