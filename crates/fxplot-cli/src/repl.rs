//! Interactive mode: one expression per line from stdin.
//!
//! Each line is compiled in the background. A line entered while the previous
//! one is still compiling supersedes it.

use std::sync::Arc;

use fxplot_core::{BackgroundHost, Evaluation, FunctionHost, HostConfig, Outcome, SampleDomain, sample};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

use crate::colors;

/// Expression used for blank input.
pub const DEFAULT_EXPRESSION: &str = "x * (sin(x) + cos(x))";

/// Execute the repl command.
pub async fn execute(config: HostConfig) -> anyhow::Result<()> {
    let host = Arc::new(FunctionHost::new(config)?);
    let background = BackgroundHost::new(host);

    println!(
        "{}fxplot{} enter f(x), blank for {}{}{}",
        colors::BOLD,
        colors::RESET,
        colors::DIM,
        DEFAULT_EXPRESSION,
        colors::RESET
    );
    prompt();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last: Option<JoinHandle<()>> = None;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let expression = if line.is_empty() {
            DEFAULT_EXPRESSION
        } else {
            line
        };

        let pending = background.submit(expression);
        last = Some(tokio::spawn(async move {
            let expression = pending.expression().to_string();
            match pending.outcome().await {
                Outcome::Ready(evaluation) => print_summary(&evaluation),
                Outcome::Superseded => println!(
                    "{}superseded: {}{}",
                    colors::DIM,
                    expression,
                    colors::RESET
                ),
            }
            prompt();
        }));
    }

    // Let the final request finish before exiting.
    if let Some(task) = last {
        task.await?;
    }
    println!();

    Ok(())
}

fn prompt() {
    print!("{}>{} ", colors::CYAN, colors::RESET);
    colors::flush_stdout();
}

/// Print `f(0)` and the range over the default domain, or the diagnostics.
fn print_summary(evaluation: &Evaluation) {
    if !evaluation.is_success() {
        println!(
            "{}failed:{} {}",
            colors::RED,
            colors::RESET,
            evaluation.expression
        );
        print!("{}", evaluation.diagnostic_text());
        return;
    }

    let samples = sample(&evaluation.handle, &SampleDomain::default());
    let (min, max) = samples
        .iter()
        .map(|s| s.y)
        .filter(|y| y.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), y| {
            (lo.min(y), hi.max(y))
        });

    println!(
        "{}f(x) = {}{} {}({}, {}ms){}",
        colors::GREEN,
        evaluation.expression,
        colors::RESET,
        colors::DIM,
        evaluation.handle.unit_name().unwrap_or_default(),
        evaluation.compile_time_ms.unwrap_or_default(),
        colors::RESET
    );
    println!("  f(0) = {}", evaluation.handle.f(0.0));
    if min <= max {
        println!("  min = {:.6}, max = {:.6} on [-10, 10]", min, max);
    } else {
        println!("  no finite values on [-10, 10]");
    }
}
