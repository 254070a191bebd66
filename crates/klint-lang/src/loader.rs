use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::error::Diagnostic;

pub const CONTINUED_LINE_PREFIX: &str = "#continued line (";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine {
    pub text: String,
    pub file: String,
    pub line: usize,
    pub inside_help: bool,
}

impl LogicalLine {
    pub fn is_continuation_placeholder(&self) -> bool {
        self.text.starts_with(CONTINUED_LINE_PREFIX)
    }
}

/// Who sourced a file first: the requesting file and the line of its
/// `source` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOrigin {
    pub file: String,
    pub line: usize,
}

pub type LoadRecord = BTreeMap<String, LoadOrigin>;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to enumerate {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Default)]
pub struct Loader {
    pub(crate) load_record: LoadRecord,
    pub(crate) diagnostics: Vec<Diagnostic>,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_record(&self) -> &LoadRecord {
        &self.load_record
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Loads one source path into logical lines. A `*` path segment expands
    /// to every immediate subdirectory of the prefix, ascending, dot-dirs
    /// skipped. Missing files are warned about except during glob expansion,
    /// where absence of a match is expected.
    pub fn load(
        &mut self,
        path: &str,
        from: &LoadOrigin,
        is_glob_expansion: bool,
    ) -> Result<Vec<LogicalLine>, LoadError> {
        if let Some((prefix, suffix)) = split_glob(path) {
            return self.load_glob(&prefix, &suffix, path, from, is_glob_expansion);
        }

        let fs_path = Path::new(path);
        if !fs_path.exists() {
            if !is_glob_expansion {
                self.diagnostics.push(Diagnostic::warning(
                    "W_MISSING_FILE",
                    format!("'{path}' sourced but not found"),
                    from.file.clone(),
                    from.line,
                ));
            }
            return Ok(Vec::new());
        }

        if let Some(first) = self.load_record.get(path) {
            self.diagnostics.push(Diagnostic::warning(
                "W_ALREADY_SOURCED",
                format!(
                    "'{path}' was already sourced from {}:{}",
                    first.file, first.line
                ),
                from.file.clone(),
                from.line,
            ));
        } else {
            self.load_record.insert(path.to_string(), from.clone());
        }

        let raw = match fs::read_to_string(fs_path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                if !is_glob_expansion {
                    self.diagnostics.push(Diagnostic::warning(
                        "W_MISSING_FILE",
                        format!("'{path}' sourced but not found"),
                        from.file.clone(),
                        from.line,
                    ));
                }
                return Ok(Vec::new());
            }
            Err(err) => {
                return Err(LoadError::Read {
                    path: fs_path.to_path_buf(),
                    source: err,
                })
            }
        };

        if !raw.is_empty() && !raw.ends_with('\n') {
            self.diagnostics.push(Diagnostic::warning(
                "W_NO_TRAILING_NEWLINE",
                format!("'{path}' does not end with a newline"),
                path,
                raw.lines().count(),
            ));
        }

        let lines = Self::fold(&raw, path);
        debug!(path, lines = lines.len(), "loaded source file");
        Ok(lines)
    }

    fn load_glob(
        &mut self,
        prefix: &str,
        suffix: &str,
        pattern: &str,
        from: &LoadOrigin,
        is_glob_expansion: bool,
    ) -> Result<Vec<LogicalLine>, LoadError> {
        let dir = Path::new(prefix);
        if !dir.is_dir() {
            if !is_glob_expansion {
                self.diagnostics.push(Diagnostic::warning(
                    "W_GLOB_PREFIX",
                    format!("glob source '{pattern}': '{prefix}' is not a directory"),
                    from.file.clone(),
                    from.line,
                ));
            }
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(dir).map_err(|err| LoadError::ReadDir {
            path: dir.to_path_buf(),
            source: err,
        })?;
        let mut subdirs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| LoadError::ReadDir {
                path: dir.to_path_buf(),
                source: err,
            })?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            if entry.path().is_dir() {
                subdirs.push(name);
            }
        }
        subdirs.sort();

        let glob_origin = LoadOrigin {
            file: pattern.to_string(),
            line: from.line,
        };
        let mut lines = Vec::new();
        for subdir in subdirs {
            let child = format!("{prefix}/{subdir}/{suffix}");
            lines.extend(self.load(&child, &glob_origin, true)?);
        }
        Ok(lines)
    }

    /// Folds backslash-continued physical lines into one logical line. The
    /// physical line that carried the continuation survives as an inert
    /// placeholder so logical indices stay aligned with physical line
    /// numbers.
    pub fn fold(source: &str, file: &str) -> Vec<LogicalLine> {
        let mut out: Vec<LogicalLine> = Vec::new();
        let mut current: Option<usize> = None;

        for (index, raw) in source.lines().enumerate() {
            let number = index + 1;
            if let Some(slot) = current {
                let trimmed = out[slot].text.trim_end();
                if let Some(stem) = trimmed.strip_suffix('\\') {
                    out[slot].text = format!("{stem}{raw}");
                    out.push(LogicalLine {
                        text: format!("{} {} )", CONTINUED_LINE_PREFIX, raw.trim()),
                        file: file.to_string(),
                        line: number,
                        inside_help: false,
                    });
                    continue;
                }
            }
            out.push(LogicalLine {
                text: raw.to_string(),
                file: file.to_string(),
                line: number,
                inside_help: false,
            });
            current = Some(out.len() - 1);
        }

        out
    }
}

fn split_glob(path: &str) -> Option<(String, String)> {
    let parts: Vec<&str> = path.split('/').collect();
    let index = parts.iter().position(|part| *part == "*")?;
    let prefix = parts[..index].join("/");
    let suffix = parts[index + 1..].join("/");
    Some((prefix, suffix))
}
