//! Runtime compilation of single-variable expressions.
//!
//! This crate provides:
//! - Function template loading and unit synthesis
//! - Collision-free unit naming
//! - Compilation with rustc and dynamic loading of the result
//! - Function handles that are always callable, even after a failure
//! - Background evaluation with cancel-on-supersede
//! - Sampling of handles over a domain
//!
//! # Example
//!
//! ```no_run
//! use fxplot_core::{FunctionHost, HostConfig};
//!
//! let host = FunctionHost::new(HostConfig::default())?;
//! let evaluation = host.evaluate("x * (sin(x) + cos(x))");
//! if evaluation.is_success() {
//!     println!("f(2) = {}", evaluation.handle.f(2.0));
//! } else {
//!     eprint!("{}", evaluation.diagnostic_text());
//! }
//! # Ok::<(), fxplot_core::Error>(())
//! ```

pub mod compile;
pub mod error;
pub mod execute;
pub mod host;
pub mod naming;
pub mod sample;
pub mod template;

pub use compile::{
    CompilationUnit, CompilerConfig, Diagnostic, ExpressionRequest, Severity, ToolchainManager,
    UnitCompiler,
};
pub use error::{CompileFailureKind, Error, Result};
pub use host::{
    BackgroundHost, Evaluation, FunctionHandle, FunctionHost, HostConfig, Outcome,
    PendingEvaluation,
};
pub use naming::{NameAllocator, UnitNames};
pub use sample::{Sample, SampleDomain, sample};
pub use template::{Template, TemplateSource, TemplateStore};
