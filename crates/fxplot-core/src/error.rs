//! Error types for fxplot-core.

use std::fmt;

use thiserror::Error;

use crate::compile::Diagnostic;

/// Result type for fxplot-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classification of a failed compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileFailureKind {
    /// The expression could not be parsed.
    Syntax,
    /// The expression parsed but did not type-check or resolve.
    Type,
}

impl fmt::Display for CompileFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax => f.write_str("syntax error"),
            Self::Type => f.write_str("type error"),
        }
    }
}

/// Errors that can occur in fxplot-core.
#[derive(Debug, Error)]
pub enum Error {
    /// The function template could not be located.
    #[error("function template not found: {0}")]
    TemplateMissing(String),

    /// The function template was found but could not be read completely.
    #[error("failed to read function template: {0}")]
    TemplateRead(String),

    /// The function template lacks one of its placeholder tokens.
    #[error("malformed function template: {0}")]
    TemplateMalformed(String),

    /// rustc rejected the synthesized unit.
    #[error("{kind} in `{unit}` ({} diagnostics)", .diagnostics.len())]
    Compilation {
        unit: String,
        kind: CompileFailureKind,
        diagnostics: Vec<Diagnostic>,
    },

    /// The compiled library does not expose the function capability.
    #[error("capability mismatch in `{unit}`: {reason}")]
    CapabilityMismatch { unit: String, reason: String },

    /// Failed to load the compiled library.
    #[error("failed to load library: {0}")]
    Loader(#[from] libloading::Error),

    /// The loaded unit could not construct an instance.
    #[error("failed to instantiate `{unit}`: {reason}")]
    Instantiation { unit: String, reason: String },

    /// Toolchain error (rustc missing or not runnable).
    #[error("toolchain error: {0}")]
    Toolchain(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A background compilation task ended abnormally.
    #[error("compilation task failed: {0}")]
    TaskFailed(String),

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Whether a caller can reasonably retry or re-prompt after this error.
    ///
    /// Setup errors (template, toolchain, configuration) and capability
    /// mismatches are not recoverable: every further request would fail the
    /// same way.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Compilation { .. }
                | Self::Loader(_)
                | Self::Instantiation { .. }
                | Self::TaskFailed(_)
        )
    }

    /// Diagnostics attached to the error, if it came from the compiler.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Self::Compilation { diagnostics, .. } => diagnostics,
            _ => &[],
        }
    }
}
