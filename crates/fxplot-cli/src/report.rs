//! Output shared by the `plot` and `check` commands.

use fxplot_core::{Diagnostic, Evaluation, Sample, Severity};
use serde::Serialize;

use crate::colors;

/// JSON form of an evaluation.
#[derive(Serialize)]
pub struct Report<'a> {
    pub expression: &'a str,
    pub unit: Option<&'a str>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub samples: Option<Vec<Sample>>,
    pub diagnostics: &'a [Diagnostic],
    pub warnings: &'a [Diagnostic],
    pub compile_time_ms: Option<u64>,
}

impl<'a> Report<'a> {
    pub fn new(evaluation: &'a Evaluation, samples: Option<Vec<Sample>>) -> Self {
        Self {
            expression: &evaluation.expression,
            unit: evaluation.handle.unit_name(),
            success: evaluation.is_success(),
            samples,
            diagnostics: &evaluation.diagnostics,
            warnings: &evaluation.warnings,
            compile_time_ms: evaluation.compile_time_ms,
        }
    }

    pub fn print(&self) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(self)?);
        Ok(())
    }
}

/// Print diagnostics and warnings to stderr, in emission order.
pub fn print_diagnostics(evaluation: &Evaluation) {
    for diagnostic in evaluation.diagnostics.iter().chain(&evaluation.warnings) {
        let color = match diagnostic.level {
            Severity::Error => colors::RED,
            Severity::Warning => colors::YELLOW,
            Severity::Note | Severity::Help => colors::DIM,
        };
        eprintln!("{}{}{}", color, diagnostic, colors::RESET);
    }
}

/// Turn a failed evaluation into the command's error.
pub fn ensure_success(evaluation: &Evaluation) -> anyhow::Result<()> {
    match &evaluation.error {
        Some(error) => anyhow::bail!("`{}`: {}", evaluation.expression, error),
        None => Ok(()),
    }
}
