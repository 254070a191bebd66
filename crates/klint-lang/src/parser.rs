use std::collections::VecDeque;
use std::path::Path;

use tracing::debug;

use crate::error::Diagnostic;
use crate::expr::{extract_references, split_if_clause};
use crate::loader::{LoadError, LoadOrigin, LoadRecord, Loader, LogicalLine};
use crate::symbol::{
    DefaultEntry, Definition, Prompt, RangeDecl, SymbolTable, SymbolType, TypeDecl,
};

#[derive(Debug)]
pub struct ParseReport {
    pub symbols: SymbolTable,
    pub diagnostics: Vec<Diagnostic>,
    /// Every processed logical line in evaluation order, for the dump.
    pub lines: Vec<LogicalLine>,
    pub load_record: LoadRecord,
}

#[derive(Debug, Clone)]
struct MenuFrame {
    title: String,
    file: String,
    line: usize,
}

#[derive(Debug, Clone)]
struct IfFrame {
    expr: String,
    file: String,
    line: usize,
}

#[derive(Debug)]
struct ChoiceScope {
    name: Option<String>,
    file: String,
    line: usize,
    members: usize,
}

#[derive(Debug, Default)]
struct ScopeState {
    menu_stack: Vec<MenuFrame>,
    if_stack: Vec<IfFrame>,
    current_config: Option<String>,
    current_choice: Option<ChoiceScope>,
}

impl ScopeState {
    fn menu_path(&self) -> Vec<String> {
        self.menu_stack
            .iter()
            .map(|frame| frame.title.clone())
            .collect()
    }

    fn if_dependencies(&self) -> Vec<String> {
        self.if_stack
            .iter()
            .map(|frame| frame.expr.clone())
            .collect()
    }
}

#[derive(Debug)]
struct HelpScope {
    /// Indent prefix fixed by the first non-blank content line.
    prefix: Option<String>,
    /// Config symbol receiving the text, when one was open.
    attach_to: Option<String>,
}

pub fn parse_entry(path: &Path) -> Result<ParseReport, LoadError> {
    let mut parser = Parser::new();
    parser.load_root(&path.to_string_lossy())?;
    parser.run()?;
    Ok(parser.finish())
}

/// Parses in-memory source as if it were a single file named `<memory>`.
/// `source` directives still hit the filesystem relative to the working
/// directory; a fatal read failure is downgraded to an error diagnostic.
pub fn parse_str(source: &str) -> ParseReport {
    let mut parser = Parser::new();
    parser.queue.extend(Loader::fold(source, "<memory>"));
    if let Err(err) = parser.run() {
        parser
            .diagnostics
            .push(Diagnostic::error("E_IO", err.to_string(), "<memory>", 0));
    }
    parser.finish()
}

#[derive(Debug, Default)]
struct Parser {
    loader: Loader,
    symbols: SymbolTable,
    diagnostics: Vec<Diagnostic>,
    scope: ScopeState,
    help: Option<HelpScope>,
    queue: VecDeque<LogicalLine>,
    processed: Vec<LogicalLine>,
}

impl Parser {
    fn new() -> Self {
        Self::default()
    }

    fn load_root(&mut self, path: &str) -> Result<(), LoadError> {
        let origin = LoadOrigin {
            file: "<command line>".to_string(),
            line: 0,
        };
        let lines = self.loader.load(path, &origin, false)?;
        self.drain_loader_diagnostics();
        self.queue.extend(lines);
        Ok(())
    }

    fn run(&mut self) -> Result<(), LoadError> {
        while let Some(mut line) = self.queue.pop_front() {
            if self.absorb_help(&mut line) {
                self.processed.push(line);
                continue;
            }
            self.dispatch(&mut line)?;
            self.processed.push(line);
        }
        self.finish_scopes();
        Ok(())
    }

    fn finish(self) -> ParseReport {
        ParseReport {
            symbols: self.symbols,
            diagnostics: self.diagnostics,
            lines: self.processed,
            load_record: self.loader.load_record,
        }
    }

    fn drain_loader_diagnostics(&mut self) {
        self.diagnostics.append(&mut self.loader.diagnostics);
    }

    /// Returns true when the line was consumed as help text. The first
    /// non-blank content line fixes the block's indent prefix; a non-blank
    /// line outside that prefix ends the block and is classified normally.
    fn absorb_help(&mut self, line: &mut LogicalLine) -> bool {
        let Some(help) = self.help.as_mut() else {
            return false;
        };

        if line.is_continuation_placeholder() {
            line.inside_help = true;
            return true;
        }

        if line.text.trim().is_empty() {
            let attach = help.attach_to.clone();
            if let Some(name) = attach {
                self.append_help_line(&name, String::new());
            }
            line.inside_help = true;
            return true;
        }

        match help.prefix.clone() {
            None => {
                let indent_len = line.text.len() - line.text.trim_start().len();
                if indent_len == 0 {
                    self.diagnostics.push(Diagnostic::warning(
                        "W_HELP_INDENT",
                        "help text is not indented; ignoring the block",
                        line.file.clone(),
                        line.line,
                    ));
                    self.help = None;
                    return false;
                }
                let prefix = line.text[..indent_len].to_string();
                let content = line.text[indent_len..].to_string();
                help.prefix = Some(prefix);
                let attach = help.attach_to.clone();
                if let Some(name) = attach {
                    self.append_help_line(&name, content);
                }
                line.inside_help = true;
                true
            }
            Some(prefix) => {
                if let Some(content) = line.text.strip_prefix(prefix.as_str()) {
                    let content = content.to_string();
                    let attach = help.attach_to.clone();
                    if let Some(name) = attach {
                        self.append_help_line(&name, content);
                    }
                    line.inside_help = true;
                    true
                } else {
                    self.help = None;
                    false
                }
            }
        }
    }

    fn append_help_line(&mut self, name: &str, content: String) {
        if let Some(definition) = self.symbols.current_definition_mut(name) {
            definition.help.get_or_insert_with(Vec::new).push(content);
        }
    }

    fn dispatch(&mut self, line: &mut LogicalLine) -> Result<(), LoadError> {
        let stripped = strip_comment(&line.text);
        let text = stripped.trim().to_string();
        if text.is_empty() {
            return Ok(());
        }

        let indent = &line.text[..line.text.len() - line.text.trim_start().len()];
        if indent.contains(" \t") {
            self.diagnostics.push(Diagnostic::warning(
                "W_MIXED_INDENT",
                "space followed by tab in indentation",
                line.file.clone(),
                line.line,
            ));
        }

        let file = line.file.clone();
        let number = line.line;
        let (keyword, rest) = split_keyword(&text);

        match keyword {
            "config" => self.handle_config(rest, &file, number),
            "bool" | "string" | "hex" | "int" | "tristate" => {
                if let Some(ty) = SymbolType::parse(keyword) {
                    self.handle_type(ty, rest, &file, number);
                }
            }
            "def_bool" | "def_tristate" => {
                let ty = if keyword == "def_bool" {
                    SymbolType::Bool
                } else {
                    SymbolType::Tristate
                };
                self.handle_def_type(ty, rest, &file, number);
            }
            "prompt" => self.handle_prompt(rest, &file, number),
            "default" => self.handle_default(rest, &file, number),
            "depends" => match rest.strip_prefix("on") {
                Some(expr) if expr.is_empty() || expr.starts_with(char::is_whitespace) => {
                    self.handle_depends(expr.trim(), &file, number);
                }
                _ => self.unrecognized(&text, &file, number),
            },
            "comment" => {
                self.scope.current_config = None;
            }
            "choice" => self.handle_choice(rest, &file, number),
            "endchoice" => self.handle_endchoice(&file, number),
            "optional" => self.handle_optional(&file, number),
            "mainmenu" => {
                self.scope.current_config = None;
            }
            "menu" => self.handle_menu(rest, &file, number),
            "endmenu" => self.handle_endmenu(&file, number),
            "if" => self.handle_if(rest, &file, number),
            "endif" => self.handle_endif(&file, number),
            "range" => self.handle_range(rest, &file, number),
            "select" => self.handle_select(rest, &file, number),
            "source" => return self.handle_source(rest, line),
            "help" | "---help---" => self.handle_help(&file, number),
            _ => self.unrecognized(&text, &file, number),
        }
        Ok(())
    }

    fn unrecognized(&mut self, text: &str, file: &str, line: usize) {
        self.diagnostics.push(Diagnostic::error(
            "E_UNRECOGNIZED_LINE",
            format!("unrecognized line '{text}'"),
            file,
            line,
        ));
    }

    fn handle_config(&mut self, rest: &str, file: &str, line: usize) {
        let Some(name) = rest.split_whitespace().next() else {
            self.diagnostics.push(Diagnostic::error(
                "E_CONFIG_NAME_MISSING",
                "config without a symbol name",
                file,
                line,
            ));
            return;
        };
        self.scope.current_config = Some(name.to_string());
        if let Some(choice) = self.scope.current_choice.as_mut() {
            choice.members += 1;
        }
        self.symbols.begin_definition(
            name,
            Definition {
                file: file.to_string(),
                line,
                menu_path: self.scope.menu_path(),
                prompts: Vec::new(),
                defaults: Vec::new(),
                depends_on: self.scope.if_dependencies(),
                help: None,
            },
        );
    }

    fn handle_type(&mut self, ty: SymbolType, rest: &str, file: &str, line: usize) {
        let (subject, condition) = split_if_clause(rest);
        if let Some(cond) = &condition {
            extract_references(cond, file, line, &mut self.symbols, &mut self.diagnostics);
        }

        if let Some(name) = self.scope.current_config.clone() {
            self.record_type(&name, ty, file, line);
            if !subject.is_empty() {
                self.record_prompt(&name, &subject, condition, file, line);
            }
            return;
        }

        // A type line in a choice header types the named choice symbol, if
        // any; the anonymous form only carries the prompt text, which has
        // nothing to attach to.
        if self.scope.current_choice.is_some() {
            let choice_name = self
                .scope
                .current_choice
                .as_ref()
                .and_then(|choice| choice.name.clone());
            if let Some(name) = choice_name {
                self.record_type(&name, ty, file, line);
                if !subject.is_empty() {
                    self.record_prompt(&name, &subject, condition, file, line);
                }
            }
            return;
        }

        self.diagnostics.push(Diagnostic::error(
            "E_TYPE_OUTSIDE_CONFIG",
            format!("'{}' type declared outside of a config block", ty.as_str()),
            file,
            line,
        ));
    }

    fn handle_def_type(&mut self, ty: SymbolType, rest: &str, file: &str, line: usize) {
        let (expr, condition) = split_if_clause(rest);
        if let Some(cond) = &condition {
            extract_references(cond, file, line, &mut self.symbols, &mut self.diagnostics);
        }
        let Some(name) = self.scope.current_config.clone() else {
            self.diagnostics.push(Diagnostic::error(
                "E_TYPE_OUTSIDE_CONFIG",
                format!(
                    "def_{} declared outside of a config block",
                    ty.as_str()
                ),
                file,
                line,
            ));
            return;
        };
        self.record_type(&name, ty, file, line);
        extract_references(&expr, file, line, &mut self.symbols, &mut self.diagnostics);
        if let Some(definition) = self.symbols.current_definition_mut(&name) {
            definition.defaults.push(DefaultEntry {
                expr,
                line,
                condition,
            });
        }
    }

    fn handle_prompt(&mut self, rest: &str, file: &str, line: usize) {
        let (subject, condition) = split_if_clause(rest);
        if let Some(cond) = &condition {
            extract_references(cond, file, line, &mut self.symbols, &mut self.diagnostics);
        }

        if let Some(name) = self.scope.current_config.clone() {
            self.record_prompt(&name, &subject, condition, file, line);
            return;
        }
        if self.scope.current_choice.is_some() {
            let choice_name = self
                .scope
                .current_choice
                .as_ref()
                .and_then(|choice| choice.name.clone());
            if let Some(name) = choice_name {
                self.record_prompt(&name, &subject, condition, file, line);
            }
            return;
        }
        self.diagnostics.push(Diagnostic::error(
            "E_PROMPT_OUTSIDE_CONFIG",
            "prompt outside of a config or choice block",
            file,
            line,
        ));
    }

    fn handle_default(&mut self, rest: &str, file: &str, line: usize) {
        let (expr, condition) = split_if_clause(rest);
        if let Some(cond) = &condition {
            extract_references(cond, file, line, &mut self.symbols, &mut self.diagnostics);
        }

        if let Some(name) = self.scope.current_config.clone() {
            extract_references(&expr, file, line, &mut self.symbols, &mut self.diagnostics);
            if let Some(definition) = self.symbols.current_definition_mut(&name) {
                definition.defaults.push(DefaultEntry {
                    expr,
                    line,
                    condition,
                });
            }
            return;
        }
        if self.scope.current_choice.is_some() {
            // A choice-level default picks a member symbol; references are
            // still recorded but there is no definition to attach to.
            extract_references(&expr, file, line, &mut self.symbols, &mut self.diagnostics);
            return;
        }
        self.diagnostics.push(Diagnostic::error(
            "E_DEFAULT_OUTSIDE_CONFIG",
            "default outside of a config or choice block",
            file,
            line,
        ));
    }

    fn handle_depends(&mut self, expr: &str, file: &str, line: usize) {
        if expr.is_empty() {
            self.diagnostics.push(Diagnostic::error(
                "E_DEPENDS_ARGS",
                "depends on without an expression",
                file,
                line,
            ));
            return;
        }
        let Some(name) = self.scope.current_config.clone() else {
            self.diagnostics.push(Diagnostic::error(
                "E_DEPENDS_OUTSIDE_CONFIG",
                "depends on outside of a config block",
                file,
                line,
            ));
            return;
        };
        extract_references(expr, file, line, &mut self.symbols, &mut self.diagnostics);
        if let Some(definition) = self.symbols.current_definition_mut(&name) {
            definition.depends_on.push(expr.to_string());
        }
    }

    fn handle_choice(&mut self, rest: &str, file: &str, line: usize) {
        self.scope.current_config = None;
        let name = rest.split_whitespace().next().map(str::to_string);
        if let Some(name) = &name {
            self.symbols.begin_definition(
                name,
                Definition {
                    file: file.to_string(),
                    line,
                    menu_path: self.scope.menu_path(),
                    prompts: Vec::new(),
                    defaults: Vec::new(),
                    depends_on: self.scope.if_dependencies(),
                    help: None,
                },
            );
            self.record_type(name, SymbolType::Bool, file, line);
        }
        self.scope.current_choice = Some(ChoiceScope {
            name,
            file: file.to_string(),
            line,
            members: 0,
        });
    }

    fn handle_endchoice(&mut self, file: &str, line: usize) {
        self.scope.current_config = None;
        match self.scope.current_choice.take() {
            None => {
                self.diagnostics.push(Diagnostic::error(
                    "E_ENDCHOICE_UNMATCHED",
                    "endchoice not within a choice block",
                    file,
                    line,
                ));
            }
            Some(choice) => {
                if choice.members == 0 {
                    self.diagnostics.push(Diagnostic::error(
                        "E_CHOICE_EMPTY",
                        format!(
                            "choice block at {}:{} has no symbols",
                            choice.file, choice.line
                        ),
                        file,
                        line,
                    ));
                }
            }
        }
    }

    fn handle_optional(&mut self, file: &str, line: usize) {
        if self.scope.current_choice.is_none() || self.scope.current_config.is_some() {
            self.diagnostics.push(Diagnostic::error(
                "E_OPTIONAL_MISPLACED",
                "optional is only valid directly inside a choice block",
                file,
                line,
            ));
        }
    }

    fn handle_menu(&mut self, rest: &str, file: &str, line: usize) {
        self.scope.current_config = None;
        self.scope.current_choice = None;
        self.scope.menu_stack.push(MenuFrame {
            title: unquote(rest).to_string(),
            file: file.to_string(),
            line,
        });
    }

    fn handle_endmenu(&mut self, file: &str, line: usize) {
        self.scope.current_config = None;
        self.scope.current_choice = None;
        if self.scope.menu_stack.pop().is_none() {
            self.diagnostics.push(Diagnostic::error(
                "E_ENDMENU_UNMATCHED",
                "endmenu without a matching menu",
                file,
                line,
            ));
        }
    }

    fn handle_if(&mut self, rest: &str, file: &str, line: usize) {
        self.scope.current_config = None;
        extract_references(rest, file, line, &mut self.symbols, &mut self.diagnostics);
        self.scope.if_stack.push(IfFrame {
            expr: rest.to_string(),
            file: file.to_string(),
            line,
        });
    }

    fn handle_endif(&mut self, file: &str, line: usize) {
        self.scope.current_config = None;
        if self.scope.if_stack.pop().is_none() {
            self.diagnostics.push(Diagnostic::error(
                "E_ENDIF_UNMATCHED",
                "endif without a matching if",
                file,
                line,
            ));
        }
    }

    fn handle_range(&mut self, rest: &str, file: &str, line: usize) {
        let (subject, condition) = split_if_clause(rest);
        if let Some(cond) = &condition {
            extract_references(cond, file, line, &mut self.symbols, &mut self.diagnostics);
        }
        let Some(name) = self.scope.current_config.clone() else {
            self.diagnostics.push(Diagnostic::error(
                "E_RANGE_OUTSIDE_CONFIG",
                "range outside of a config block",
                file,
                line,
            ));
            return;
        };

        let mut parts = subject.split_whitespace();
        let (low, high) = match (parts.next(), parts.next()) {
            (Some(low), Some(high)) => (low, high),
            _ => {
                self.diagnostics.push(Diagnostic::error(
                    "E_RANGE_ARGS",
                    format!("range for '{name}' needs a low and a high bound"),
                    file,
                    line,
                ));
                return;
            }
        };

        if let (Some(low_value), Some(high_value)) = (parse_number(low), parse_number(high)) {
            if low_value > high_value {
                self.diagnostics.push(Diagnostic::error(
                    "E_RANGE_ORDER",
                    format!("range for '{name}': low {low} exceeds high {high}"),
                    file,
                    line,
                ));
            }
        }

        let decl = RangeDecl {
            low: low.to_string(),
            high: high.to_string(),
            file: file.to_string(),
            line,
        };
        if let Some(earlier) = self.symbols.insert_range(&name, decl) {
            self.diagnostics.push(Diagnostic::note(
                "N_RANGE_REDEFINED",
                format!(
                    "range for '{name}' differs from the one at {}:{}; first range kept",
                    earlier.file, earlier.line
                ),
                file,
                line,
            ));
        }
    }

    fn handle_select(&mut self, rest: &str, file: &str, line: usize) {
        let (subject, condition) = split_if_clause(rest);
        if let Some(cond) = &condition {
            extract_references(cond, file, line, &mut self.symbols, &mut self.diagnostics);
        }
        if self.scope.current_config.is_none() {
            self.diagnostics.push(Diagnostic::error(
                "E_SELECT_OUTSIDE_CONFIG",
                "select outside of a config block",
                file,
                line,
            ));
            return;
        }
        // A select target is a direct symbol activation, not an expression.
        let subject = subject.trim();
        if !subject.is_empty() {
            self.symbols.record_reference(subject, file, line);
        }
    }

    fn handle_source(&mut self, rest: &str, line: &mut LogicalLine) -> Result<(), LoadError> {
        let path = unquote(rest.trim()).to_string();
        let origin = LoadOrigin {
            file: line.file.clone(),
            line: line.line,
        };
        let loaded = self.loader.load(&path, &origin, false)?;
        self.drain_loader_diagnostics();
        debug!(path = %path, spliced = loaded.len(), "source directive expanded");
        for spliced in loaded.into_iter().rev() {
            self.queue.push_front(spliced);
        }
        line.text = format!("# source ( {path} ) evaluated");
        Ok(())
    }

    fn handle_help(&mut self, file: &str, line: usize) {
        let attach_to = self.scope.current_config.clone();
        if attach_to.is_none() && self.scope.current_choice.is_none() {
            self.diagnostics.push(Diagnostic::note(
                "N_HELP_SCOPE",
                "help not inside a config or choice block",
                file,
                line,
            ));
        }
        if let Some(name) = &attach_to {
            if let Some(definition) = self.symbols.current_definition_mut(name) {
                definition.help = Some(Vec::new());
            }
        }
        self.help = Some(HelpScope {
            prefix: None,
            attach_to,
        });
    }

    fn record_type(&mut self, name: &str, ty: SymbolType, file: &str, line: usize) {
        let decl = TypeDecl {
            value: ty,
            file: file.to_string(),
            line,
        };
        if let Some(earlier) = self.symbols.insert_type(name, decl) {
            self.diagnostics.push(Diagnostic::error(
                "E_TYPE_CONFLICT",
                format!(
                    "'{name}' declared as {} but first declared as {} at {}:{}",
                    ty.as_str(),
                    earlier.value.as_str(),
                    earlier.file,
                    earlier.line
                ),
                file,
                line,
            ));
        }
    }

    fn record_prompt(
        &mut self,
        name: &str,
        text: &str,
        condition: Option<String>,
        file: &str,
        line: usize,
    ) {
        if self.scope.menu_stack.is_empty() {
            self.diagnostics.push(Diagnostic::warning(
                "W_PROMPT_OUTSIDE_MENU",
                format!("prompt for '{name}' defined outside of a menu"),
                file,
                line,
            ));
        }
        if let Some(definition) = self.symbols.current_definition_mut(name) {
            definition.prompts.push(Prompt {
                text: unquote(text).to_string(),
                line,
                condition,
            });
        }
    }

    /// The observed language never diagnoses unterminated blocks at end of
    /// input; warning on them here is a deliberate deviation.
    fn finish_scopes(&mut self) {
        for frame in std::mem::take(&mut self.scope.menu_stack) {
            self.diagnostics.push(Diagnostic::warning(
                "W_UNTERMINATED_MENU",
                format!("menu '{}' is never closed", frame.title),
                frame.file,
                frame.line,
            ));
        }
        for frame in std::mem::take(&mut self.scope.if_stack) {
            self.diagnostics.push(Diagnostic::warning(
                "W_UNTERMINATED_IF",
                format!("if '{}' is never closed", frame.expr),
                frame.file,
                frame.line,
            ));
        }
    }
}

fn split_keyword(text: &str) -> (&str, &str) {
    match text.split_once(|ch: char| ch.is_whitespace()) {
        Some((keyword, rest)) => (keyword, rest.trim()),
        None => (text, ""),
    }
}

fn strip_comment(text: &str) -> &str {
    let mut in_quote = false;
    for (index, byte) in text.bytes().enumerate() {
        match byte {
            b'"' => in_quote = !in_quote,
            b'#' if !in_quote => return &text[..index],
            _ => {}
        }
    }
    text
}

fn unquote(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(trimmed)
}

fn parse_number(text: &str) -> Option<i128> {
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let value = if let Some(digits) = unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"))
    {
        i128::from_str_radix(digits, 16).ok()?
    } else {
        unsigned.parse::<i128>().ok()?
    };
    Some(if negative { -value } else { value })
}
