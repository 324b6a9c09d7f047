//! fxplot CLI - compile single-variable expressions and sample them.

mod check;
mod colors;
mod plot;
mod repl;
mod report;
mod toolchain;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fxplot_core::{CompilerConfig, HostConfig, TemplateSource};

#[derive(Parser)]
#[command(name = "fxplot")]
#[command(about = "Compile f(x) expressions at runtime and sample them")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this rustc instead of the one on PATH
    #[arg(long, global = true)]
    rustc: Option<PathBuf>,

    /// Optimization level passed to rustc (0-3)
    #[arg(long, global = true, default_value = "0")]
    opt_level: u8,

    /// Use the Cranelift backend when the toolchain has it
    #[arg(long, global = true)]
    cranelift: bool,

    /// Function template file (default: built-in)
    #[arg(long, global = true)]
    template: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile an expression and print its samples
    Plot {
        /// Expression in `x`, e.g. "x * (sin(x) + cos(x))"
        expression: String,

        /// First sample point [default: -10]
        #[arg(long, allow_hyphen_values = true)]
        start: Option<f64>,

        /// Last sample point [default: 10]
        #[arg(long, allow_hyphen_values = true)]
        end: Option<f64>,

        /// Distance between sample points [default: 0.1]
        #[arg(long)]
        step: Option<f64>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Compile an expression and report diagnostics only
    Check {
        /// Expression in `x`
        expression: String,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Read expressions from stdin, one per line
    Repl,

    /// Show the detected toolchain
    Toolchain,
}

impl Cli {
    fn host_config(&self) -> HostConfig {
        let compiler = CompilerConfig {
            rustc_path: self.rustc.clone(),
            use_cranelift: self.cranelift,
            opt_level: self.opt_level,
            ..Default::default()
        };

        HostConfig {
            compiler,
            template: self
                .template
                .clone()
                .map_or(TemplateSource::Embedded, TemplateSource::File),
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout is reserved for results
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.host_config();

    match cli.command {
        Commands::Plot {
            expression,
            start,
            end,
            step,
            json,
        } => plot::execute(config, &expression, (start, end, step), json)?,

        Commands::Check { expression, json } => check::execute(config, &expression, json)?,

        Commands::Repl => repl::execute(config).await?,

        Commands::Toolchain => toolchain::execute(cli.rustc.as_deref())?,
    }

    Ok(())
}
