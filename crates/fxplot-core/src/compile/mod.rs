//! Compilation pipeline for expression units.
//!
//! This module provides:
//! - Unit synthesis (template + names + expression → source)
//! - Toolchain discovery (rustc, optional Cranelift backend)
//! - Unit compilation (source → cdylib → loaded library)
//! - Diagnostic parsing (rustc JSON → ordered diagnostics)
//!
//! # Architecture
//!
//! ```text
//! expression ──► synthesize ──► CompilationUnit
//!                                     │
//!                                     └──► UnitCompiler ──► rustc (stdin) ──► lib<unit>.so
//!                                               │                               │
//!                                               ├── DiagnosticParser ◄── stderr │
//!                                               └── LoadedUnit ◄──────── libloading
//! ```

mod compiler;
mod diagnostics;
mod toolchain;
mod types;
mod unit;

pub use compiler::{CompiledUnit, UnitCompiler};
pub use diagnostics::{
    Diagnostic, DiagnosticParser, Severity, SourceLocation, classify, render_text,
};
pub use toolchain::ToolchainManager;
pub use types::{CompilerConfig, dylib_extension, dylib_prefix};
pub use unit::{CompilationUnit, ExpressionRequest, synthesize};
