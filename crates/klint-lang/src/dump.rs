use crate::loader::LogicalLine;

const TAB_WIDTH: usize = 8;
const TEXT_COLUMN: usize = 100;

/// Renders the reconstructed tree: one line per logical line, original text
/// tab-expanded and left-justified, then an annotation naming the origin
/// file, 1-based origin line, and whether the line was absorbed as help
/// text.
pub fn render_dump(lines: &[LogicalLine]) -> String {
    let mut out = String::new();
    for line in lines {
        let expanded = expand_tabs(&line.text);
        let marker = if line.inside_help { " (help)" } else { "" };
        out.push_str(&format!(
            "{:<width$} # {}:{}{}\n",
            expanded,
            line.file,
            line.line,
            marker,
            width = TEXT_COLUMN
        ));
    }
    out
}

pub fn expand_tabs(text: &str) -> String {
    let mut out = String::new();
    let mut column = 0;
    for ch in text.chars() {
        if ch == '\t' {
            let pad = TAB_WIDTH - column % TAB_WIDTH;
            for _ in 0..pad {
                out.push(' ');
            }
            column += pad;
        } else {
            out.push(ch);
            column += 1;
        }
    }
    out
}
