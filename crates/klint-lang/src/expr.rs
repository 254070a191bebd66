use crate::error::Diagnostic;
use crate::symbol::SymbolTable;

/// Splits a trailing `if <cond>` clause off an expression, ignoring any
/// `if` embedded inside a quoted string. Returns the subject with the
/// clause removed and the condition text, if present.
pub fn split_if_clause(expr: &str) -> (String, Option<String>) {
    let bytes = expr.as_bytes();
    let mut in_quote = false;
    let mut index = 0;
    while index < bytes.len() {
        let byte = bytes[index];
        if byte == b'"' {
            in_quote = !in_quote;
            index += 1;
            continue;
        }
        if !in_quote
            && expr[index..].starts_with("if")
            && (index == 0 || bytes[index - 1].is_ascii_whitespace())
            && (index + 2 == bytes.len() || bytes[index + 2].is_ascii_whitespace())
        {
            let subject = expr[..index].trim_end().to_string();
            let condition = expr[index + 2..].trim();
            let condition = if condition.is_empty() {
                None
            } else {
                Some(condition.to_string())
            };
            return (subject, condition);
        }
        index += 1;
    }
    (expr.trim().to_string(), None)
}

/// Records every symbol name referenced by `expr` into the table, skipping
/// literal constants. Sequential greedy pattern matching, not precedence
/// parsing: `&&` splits are attempted before `||`, and comparison splits
/// before either, matching the observed behavior of the language.
pub fn extract_references(
    expr: &str,
    file: &str,
    line: usize,
    symbols: &mut SymbolTable,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let text = expr.trim();
    if text.is_empty() {
        return;
    }

    if matches!(text, "y" | "n" | "\"y\"" | "\"n\"") {
        return;
    }
    if is_integer_literal(text) {
        return;
    }
    if is_hex_literal(text) {
        return;
    }
    if is_quoted_string(text) {
        return;
    }
    if is_identifier(text) {
        symbols.record_reference(text, file, line);
        return;
    }
    if let Some(rest) = text.strip_prefix('!') {
        extract_references(rest, file, line, symbols, diagnostics);
        return;
    }
    if let Some(inner) = strip_outer_parens(text) {
        extract_references(inner, file, line, symbols, diagnostics);
        return;
    }
    if let Some((left, right)) = text.split_once("!=") {
        extract_references(left, file, line, symbols, diagnostics);
        extract_references(right, file, line, symbols, diagnostics);
        return;
    }
    if let Some((left, right)) = text.split_once('=') {
        extract_references(left, file, line, symbols, diagnostics);
        extract_references(right, file, line, symbols, diagnostics);
        return;
    }
    if let Some((left, right)) = text.split_once("&&") {
        extract_references(left, file, line, symbols, diagnostics);
        extract_references(right, file, line, symbols, diagnostics);
        return;
    }
    if let Some((left, right)) = text.split_once("||") {
        extract_references(left, file, line, symbols, diagnostics);
        extract_references(right, file, line, symbols, diagnostics);
        return;
    }
    if is_path_token(text) {
        return;
    }

    diagnostics.push(Diagnostic::error(
        "E_UNPARSEABLE_EXPR",
        format!("unrecognized expression '{text}'"),
        file,
        line,
    ));
}

fn is_integer_literal(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|byte| byte.is_ascii_digit())
}

fn is_hex_literal(text: &str) -> bool {
    let unsigned = text.strip_prefix('-').unwrap_or(text);
    let Some(digits) = unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"))
    else {
        return false;
    };
    !digits.is_empty() && digits.bytes().all(|byte| byte.is_ascii_hexdigit())
}

fn is_quoted_string(text: &str) -> bool {
    text.len() >= 2
        && text.starts_with('"')
        && text.ends_with('"')
        && !text[1..text.len() - 1].contains('"')
}

pub(crate) fn is_identifier(text: &str) -> bool {
    !text.is_empty()
        && text
            .bytes()
            .all(|byte| byte.is_ascii_alphanumeric() || byte == b'_')
}

fn is_path_token(text: &str) -> bool {
    !text.is_empty()
        && text
            .bytes()
            .all(|byte| byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b'-' | b'/'))
}

fn strip_outer_parens(text: &str) -> Option<&str> {
    let inner = text.strip_prefix('(')?.strip_suffix(')')?;
    let mut depth = 0i32;
    for byte in inner.bytes() {
        match byte {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            _ => {}
        }
    }
    (depth == 0).then_some(inner)
}
