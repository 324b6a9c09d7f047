//! Plot command: compile an expression and print its samples.

use fxplot_core::{FunctionHost, HostConfig, SampleDomain, sample};

use crate::colors;
use crate::report::{Report, ensure_success, print_diagnostics};

const DEFAULT_START: f64 = -10.0;
const DEFAULT_END: f64 = 10.0;
const DEFAULT_STEP: f64 = 0.1;

/// Execute the plot command.
pub fn execute(
    config: HostConfig,
    expression: &str,
    (start, end, step): (Option<f64>, Option<f64>, Option<f64>),
    json: bool,
) -> anyhow::Result<()> {
    let domain = match (start, end, step) {
        (None, None, None) => SampleDomain::default(),
        _ => SampleDomain::new(
            start.unwrap_or(DEFAULT_START),
            end.unwrap_or(DEFAULT_END),
            step.unwrap_or(DEFAULT_STEP),
        )?,
    };
    let host = FunctionHost::new(config)?;

    let evaluation = host.evaluate(expression);
    print_diagnostics(&evaluation);

    // A failed compilation still samples the null handle, so output stays
    // well-formed.
    let samples = sample(&evaluation.handle, &domain);

    if json {
        Report::new(&evaluation, Some(samples)).print()?;
    } else if evaluation.is_success() {
        if let Some(unit) = evaluation.handle.unit_name() {
            println!(
                "{}f(x) = {}{}  {}{}{}",
                colors::BOLD,
                expression,
                colors::RESET,
                colors::DIM,
                unit,
                colors::RESET
            );
        }
        println!("{:>10}  {:>16}", "x", "f(x)");
        println!("{}", "─".repeat(28));
        for point in &samples {
            println!("{:>10.4}  {:>16.8}", point.x, point.y);
        }
    }

    ensure_success(&evaluation)
}
