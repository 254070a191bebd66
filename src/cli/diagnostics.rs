use klint_lang::{Diagnostic, Severity};

use crate::cli::args::OutputFormat;

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Note => "note",
    }
}

fn diagnostic_to_json(diag: &Diagnostic) -> serde_json::Value {
    serde_json::json!({
        "severity": severity_label(diag.severity),
        "code": diag.code,
        "message": diag.message,
        "file": diag.file,
        "line": diag.line,
    })
}

pub(crate) fn print_diagnostics(diags: &[Diagnostic], format: OutputFormat) {
    match format {
        OutputFormat::Human => {
            for diag in diags {
                let level = severity_label(diag.severity);
                if diag.file.is_empty() {
                    println!("{}: {}", level, diag.message);
                } else if diag.line == 0 {
                    println!("{}: {} ({})", level, diag.message, diag.file);
                } else {
                    println!("{}: {} ({}:{})", level, diag.message, diag.file, diag.line);
                }
            }
        }
        OutputFormat::Json => {
            let payload = diags.iter().map(diagnostic_to_json).collect::<Vec<_>>();
            if let Ok(text) = serde_json::to_string_pretty(&payload) {
                println!("{}", text);
            }
        }
    }
}
