//! Compiler diagnostics and rustc JSON parsing.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CompileFailureKind;

/// A single compiler-reported message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// Severity level
    pub level: Severity,

    /// Error code (e.g., "E0425")
    pub code: Option<String>,

    /// Message text
    pub message: String,

    /// Primary location in the generated unit
    pub location: Option<SourceLocation>,

    /// Column (1-indexed) inside the expression text, when the primary span
    /// falls on the expression
    pub expression_column: Option<usize>,

    /// rustc's rendered form, including source snippet
    pub rendered: Option<String>,
}

/// Severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Note,
    Help,
}

impl Severity {
    fn from_rustc(level: &str) -> Self {
        // rustc also emits "error: internal compiler error" and "failure-note".
        if level.starts_with("error") {
            Self::Error
        } else if level.starts_with("warning") {
            Self::Warning
        } else if level == "help" {
            Self::Help
        } else {
            Self::Note
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Note => "note",
            Self::Help => "help",
        })
    }
}

/// A location in the generated unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    /// Line number (1-indexed)
    pub line: usize,

    /// Column number (1-indexed)
    pub column: usize,
}

impl Diagnostic {
    /// An error that did not come from the compiler (loader, toolchain, ...).
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: Severity::Error,
            code: None,
            message: message.into(),
            location: None,
            expression_column: None,
            rendered: None,
        }
    }

    /// A raw line of compiler output that was not JSON.
    pub fn raw(line: impl Into<String>) -> Self {
        Self {
            level: Severity::Note,
            ..Self::error(line)
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{}[{}]: {}", self.level, code, self.message)?,
            None => write!(f, "{}: {}", self.level, self.message)?,
        }
        if let Some(column) = self.expression_column {
            write!(f, " (at column {})", column)?;
        }
        Ok(())
    }
}

/// Classify a failed compilation from its diagnostics.
///
/// rustc attaches error codes to resolution and type errors but not to parse
/// errors, so any coded error means the expression at least parsed.
pub fn classify(diagnostics: &[Diagnostic]) -> CompileFailureKind {
    if diagnostics
        .iter()
        .any(|d| d.is_error() && d.code.is_some())
    {
        CompileFailureKind::Type
    } else {
        CompileFailureKind::Syntax
    }
}

/// Render diagnostics one per line, preserving order.
pub fn render_text(diagnostics: &[Diagnostic]) -> String {
    let mut text = String::new();
    for diagnostic in diagnostics {
        text.push_str(&diagnostic.to_string());
        text.push('\n');
    }
    text
}

/// Rustc JSON diagnostic format.
#[derive(Debug, Deserialize)]
struct RustcDiagnostic {
    message: String,
    code: Option<RustcCode>,
    level: String,
    #[serde(default)]
    spans: Vec<RustcSpan>,
    #[serde(default)]
    children: Vec<RustcDiagnostic>,
    rendered: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RustcCode {
    code: String,
}

#[derive(Debug, Deserialize)]
struct RustcSpan {
    line_start: usize,
    column_start: usize,
    is_primary: bool,
}

/// Parses rustc's `--error-format=json` stream and maps spans that land on
/// the expression back to expression columns.
pub struct DiagnosticParser {
    expression_line: usize,
    expression_column: usize,
}

impl DiagnosticParser {
    /// Create a parser for a unit whose expression starts at the given
    /// 1-indexed line and column.
    pub fn new(expression_line: usize, expression_column: usize) -> Self {
        Self {
            expression_line,
            expression_column,
        }
    }

    /// Parse rustc stderr. Every line produces at least one diagnostic;
    /// children follow their parent.
    pub fn parse_rustc_output(&self, stderr: &str) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        for line in stderr.lines() {
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<RustcDiagnostic>(line) {
                Ok(diagnostic) => self.flatten(&diagnostic, &mut diagnostics),
                Err(e) => {
                    tracing::debug!(
                        "Non-JSON compiler output: {} (line: {})",
                        e,
                        line.char_indices().nth(100).map_or(line, |(i, _)| &line[..i])
                    );
                    diagnostics.push(Diagnostic::raw(line));
                }
            }
        }

        diagnostics
    }

    fn flatten(&self, diagnostic: &RustcDiagnostic, out: &mut Vec<Diagnostic>) {
        out.push(self.map_diagnostic(diagnostic));
        for child in &diagnostic.children {
            self.flatten(child, out);
        }
    }

    fn map_diagnostic(&self, diagnostic: &RustcDiagnostic) -> Diagnostic {
        let primary = diagnostic
            .spans
            .iter()
            .find(|s| s.is_primary)
            .or_else(|| diagnostic.spans.first());

        let location = primary.map(|span| SourceLocation {
            line: span.line_start,
            column: span.column_start,
        });

        Diagnostic {
            level: Severity::from_rustc(&diagnostic.level),
            code: diagnostic.code.as_ref().map(|c| c.code.clone()),
            message: diagnostic.message.clone(),
            location,
            expression_column: location.and_then(|loc| self.map_column(loc)),
            rendered: diagnostic.rendered.clone(),
        }
    }

    /// Column inside the expression text, if the location is on it.
    fn map_column(&self, location: SourceLocation) -> Option<usize> {
        // Only the first line of a multi-line expression is mapped.
        (location.line == self.expression_line && location.column >= self.expression_column)
            .then(|| location.column - self.expression_column + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNRESOLVED: &str = r#"{"message":"cannot find function `banana` in this scope","code":{"code":"E0425","explanation":null},"level":"error","spans":[{"file_name":"<anon>","byte_start":10,"byte_end":16,"line_start":62,"line_end":62,"column_start":13,"column_end":19,"is_primary":true,"text":[],"label":"not found in this scope","suggested_replacement":null,"suggestion_applicability":null,"expansion":null}],"children":[],"rendered":"error[E0425]: cannot find function `banana` in this scope\n"}"#;

    const PARSE: &str = r#"{"message":"expected expression, found `}`","code":null,"level":"error","spans":[{"file_name":"<anon>","byte_start":10,"byte_end":11,"line_start":63,"line_end":63,"column_start":9,"column_end":10,"is_primary":true,"text":[],"label":"expected expression","suggested_replacement":null,"suggestion_applicability":null,"expansion":null}],"children":[{"message":"consider removing this","code":null,"level":"help","spans":[],"children":[],"rendered":null}],"rendered":"error: expected expression, found `}`\n"}"#;

    const ABORT: &str = r#"{"message":"aborting due to 1 previous error","code":null,"level":"error","spans":[],"children":[],"rendered":"error: aborting due to 1 previous error\n"}"#;

    #[test]
    fn test_parse_rustc_json() {
        let parser = DiagnosticParser::new(62, 13);
        let diagnostics = parser.parse_rustc_output(UNRESOLVED);

        assert_eq!(diagnostics.len(), 1);
        let d = &diagnostics[0];
        assert_eq!(d.code.as_deref(), Some("E0425"));
        assert_eq!(d.level, Severity::Error);
        assert!(d.message.contains("banana"));
        assert_eq!(d.location, Some(SourceLocation { line: 62, column: 13 }));
        assert_eq!(d.expression_column, Some(1));
    }

    #[test]
    fn test_order_and_children_preserved() {
        let stderr = format!("{}\n{}\n{}\n", PARSE, UNRESOLVED, ABORT);
        let parser = DiagnosticParser::new(62, 13);
        let diagnostics = parser.parse_rustc_output(&stderr);

        let messages: Vec<&str> = diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "expected expression, found `}`",
                "consider removing this",
                "cannot find function `banana` in this scope",
                "aborting due to 1 previous error",
            ]
        );
        assert_eq!(diagnostics[1].level, Severity::Help);
        // Span on the line after the expression is not mapped.
        assert_eq!(diagnostics[0].expression_column, None);
    }

    #[test]
    fn test_non_json_lines_are_kept() {
        let stderr = format!("{}\nerror: linker `cc` not found\n", ABORT);
        let diagnostics = DiagnosticParser::new(1, 1).parse_rustc_output(&stderr);

        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[1].level, Severity::Note);
        assert_eq!(diagnostics[1].message, "error: linker `cc` not found");
    }

    #[test]
    fn test_classify() {
        let parser = DiagnosticParser::new(62, 13);
        let syntax = parser.parse_rustc_output(&format!("{}\n{}", PARSE, ABORT));
        assert_eq!(classify(&syntax), CompileFailureKind::Syntax);

        let typed = parser.parse_rustc_output(&format!("{}\n{}", UNRESOLVED, ABORT));
        assert_eq!(classify(&typed), CompileFailureKind::Type);
    }

    #[test]
    fn test_render_text() {
        let diagnostics = DiagnosticParser::new(62, 13)
            .parse_rustc_output(&format!("{}\n{}", UNRESOLVED, ABORT));
        let text = render_text(&diagnostics);

        assert_eq!(
            text,
            "error[E0425]: cannot find function `banana` in this scope (at column 1)\n\
             error: aborting due to 1 previous error\n"
        );
    }

    #[test]
    fn test_severity_mapping() {
        assert_eq!(Severity::from_rustc("error: internal compiler error"), Severity::Error);
        assert_eq!(Severity::from_rustc("failure-note"), Severity::Note);
        assert_eq!(Severity::from_rustc("warning"), Severity::Warning);
        assert_eq!(Severity::from_rustc("help"), Severity::Help);
    }
}
