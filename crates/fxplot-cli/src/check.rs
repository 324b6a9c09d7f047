//! Check command: compile an expression without sampling it.

use fxplot_core::{FunctionHost, HostConfig};

use crate::colors;
use crate::report::{Report, ensure_success, print_diagnostics};

/// Execute the check command.
pub fn execute(config: HostConfig, expression: &str, json: bool) -> anyhow::Result<()> {
    let host = FunctionHost::new(config)?;
    let evaluation = host.evaluate(expression);

    if json {
        Report::new(&evaluation, None).print()?;
    } else {
        print_diagnostics(&evaluation);
        if let (Some(unit), Some(ms)) = (evaluation.handle.unit_name(), evaluation.compile_time_ms) {
            println!(
                "{}ok{} {} compiled in {}ms",
                colors::GREEN,
                colors::RESET,
                unit,
                ms
            );
        }
    }

    ensure_success(&evaluation)
}
