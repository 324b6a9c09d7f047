//! Synthesis of compilation units from the function template.

use crate::naming::UnitNames;
use crate::template::{EXPRESSION_PLACEHOLDER, PACKAGE_PLACEHOLDER, Template, UNIT_PLACEHOLDER};

/// Raw expression text as submitted by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionRequest {
    text: String,
}

impl ExpressionRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl From<&str> for ExpressionRequest {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for ExpressionRequest {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

/// A complete, ready-to-compile source unit.
#[derive(Debug, Clone)]
pub struct CompilationUnit {
    /// Names the unit was generated with.
    pub names: UnitNames,

    /// `package.unit`
    pub qualified_name: String,

    /// Synthesized Rust source.
    pub source: String,

    /// Line (1-indexed) on which the expression text starts.
    pub expression_line: usize,

    /// Column (1-indexed) at which the expression text starts.
    pub expression_column: usize,
}

impl CompilationUnit {
    /// Crate name passed to rustc; unique because the unit name is.
    pub fn crate_name(&self) -> String {
        self.names.unit.to_ascii_lowercase()
    }
}

/// Fill the template with the generated names and the expression.
///
/// Pure string replacement; never fails. The expression is substituted last
/// so that placeholder-like text inside it is left alone.
pub fn synthesize(
    template: &Template,
    names: &UnitNames,
    expression: &ExpressionRequest,
) -> CompilationUnit {
    let named = template
        .text()
        .replace(PACKAGE_PLACEHOLDER, &names.package)
        .replace(UNIT_PLACEHOLDER, &names.unit);

    let (expression_line, expression_column) = match named.find(EXPRESSION_PLACEHOLDER) {
        Some(offset) => {
            let before = &named[..offset];
            let line = before.matches('\n').count() + 1;
            let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
            (line, before[line_start..].chars().count() + 1)
        }
        None => (1, 1),
    };

    let source = named.replace(EXPRESSION_PLACEHOLDER, expression.text());

    CompilationUnit {
        qualified_name: names.qualified(),
        names: names.clone(),
        source,
        expression_line,
        expression_column,
    }
}
