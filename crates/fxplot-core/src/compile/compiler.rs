//! Unit compiler.
//!
//! Pipes a synthesized unit into `rustc` on stdin, builds a cdylib in a
//! private scratch directory and loads it. No source file is ever written.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::sync::Arc;
use std::time::Instant;

use tempfile::TempDir;
use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};
use crate::execute::LoadedUnit;

use super::diagnostics::{Diagnostic, DiagnosticParser, Severity, classify};
use super::toolchain::ToolchainManager;
use super::types::{CompilerConfig, dylib_extension, dylib_prefix};
use super::unit::CompilationUnit;

/// A unit that compiled and loaded successfully.
#[derive(Debug)]
pub struct CompiledUnit {
    /// The loaded library
    pub loaded: Arc<LoadedUnit>,

    /// Warnings rustc emitted while compiling
    pub warnings: Vec<Diagnostic>,

    /// Compilation time in milliseconds
    pub compile_time_ms: u64,
}

/// Compiles units to dynamic libraries and loads them.
pub struct UnitCompiler {
    /// Compiler configuration
    config: CompilerConfig,

    /// Toolchain manager
    toolchain: ToolchainManager,

    /// Output directory for libraries; removed once the compiler and every
    /// loaded unit are gone
    scratch: Arc<TempDir>,

    /// Libraries still to be clobbered before loading
    #[cfg(test)]
    corrupt_loads: std::sync::atomic::AtomicU32,
}

impl UnitCompiler {
    /// Create a compiler, detecting the toolchain as configured.
    pub fn new(config: CompilerConfig) -> Result<Self> {
        let toolchain = match &config.rustc_path {
            Some(path) => ToolchainManager::with_rustc(path)?,
            None => ToolchainManager::new()?,
        };
        Self::with_toolchain(config, toolchain)
    }

    /// Create a compiler with an already detected toolchain.
    pub fn with_toolchain(config: CompilerConfig, toolchain: ToolchainManager) -> Result<Self> {
        if config.opt_level > 3 {
            return Err(Error::InvalidConfig(format!(
                "opt_level must be 0-3, got {}",
                config.opt_level
            )));
        }

        let mut builder = tempfile::Builder::new();
        builder.prefix("fxplot-");
        let scratch = match &config.scratch_parent {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };
        tracing::debug!("Unit scratch directory: {}", scratch.path().display());

        Ok(Self {
            config,
            toolchain,
            scratch: Arc::new(scratch),
            #[cfg(test)]
            corrupt_loads: std::sync::atomic::AtomicU32::new(0),
        })
    }

    /// The toolchain in use.
    pub fn toolchain(&self) -> &ToolchainManager {
        &self.toolchain
    }

    /// Directory the compiled libraries are written to.
    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }

    /// Compile and load a unit, blocking the calling thread.
    pub fn compile(&self, unit: &CompilationUnit) -> Result<CompiledUnit> {
        let start = Instant::now();
        let dylib_path = self.dylib_path(unit);

        let mut child = self
            .rustc_command(unit, &dylib_path)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        if let Some(mut stdin) = child.stdin.take()
            && let Err(e) = stdin.write_all(unit.source.as_bytes())
        {
            drop(stdin);
            child.kill().ok();
            child.wait().ok();
            return Err(e.into());
        }
        let output = child.wait_with_output()?;

        self.finish(unit, dylib_path, output, start)
    }

    /// Compile and load a unit without blocking the runtime.
    ///
    /// Dropping the returned future kills the rustc process.
    pub async fn compile_async(&self, unit: &CompilationUnit) -> Result<CompiledUnit> {
        let start = Instant::now();
        let dylib_path = self.dylib_path(unit);

        let mut cmd = tokio::process::Command::from(self.rustc_command(unit, &dylib_path));
        cmd.kill_on_drop(true);
        let mut child = cmd.spawn().map_err(|e| self.spawn_error(e))?;

        if let Some(mut stdin) = child.stdin.take()
            && let Err(e) = stdin.write_all(unit.source.as_bytes()).await
        {
            drop(stdin);
            child.kill().await.ok();
            return Err(e.into());
        }
        let output = child.wait_with_output().await?;

        self.finish(unit, dylib_path, output, start)
    }

    /// Build the rustc invocation for a unit.
    fn rustc_command(&self, unit: &CompilationUnit, dylib_path: &Path) -> Command {
        let mut cmd = Command::new(self.toolchain.rustc_path());

        cmd.arg("-")
            .arg("--crate-type=cdylib")
            .arg("--crate-name")
            .arg(unit.crate_name())
            .arg(format!("--edition={}", self.config.edition))
            .arg("--error-format=json")
            .arg("-o")
            .arg(dylib_path)
            .arg(format!("-Copt-level={}", self.config.opt_level));

        if self.config.use_cranelift && self.toolchain.has_cranelift() {
            for flag in self.toolchain.cranelift_flags() {
                cmd.arg(&flag);
            }
        }

        for flag in &self.config.extra_rustc_flags {
            cmd.arg(flag);
        }

        cmd.current_dir(self.scratch.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        cmd
    }

    /// Turn rustc's output into a loaded unit or a compilation error.
    fn finish(
        &self,
        unit: &CompilationUnit,
        dylib_path: PathBuf,
        output: Output,
        start: Instant,
    ) -> Result<CompiledUnit> {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let parser = DiagnosticParser::new(unit.expression_line, unit.expression_column);
        let mut diagnostics = parser.parse_rustc_output(&stderr);

        if !output.status.success() || !dylib_path.exists() {
            if !diagnostics.iter().any(Diagnostic::is_error) {
                diagnostics.push(Diagnostic::error(format!("rustc exited with {}", output.status)));
            }
            let kind = classify(&diagnostics);
            tracing::debug!(
                "{} failed to compile ({}, {} diagnostics)",
                unit.qualified_name,
                kind,
                diagnostics.len()
            );
            return Err(Error::Compilation {
                unit: unit.qualified_name.clone(),
                kind,
                diagnostics,
            });
        }

        let compile_time_ms = start.elapsed().as_millis() as u64;
        tracing::debug!("Compiled {} in {}ms", unit.qualified_name, compile_time_ms);

        #[cfg(test)]
        self.corrupt_if_requested(&dylib_path)?;

        let loaded = LoadedUnit::load(&unit.qualified_name, dylib_path, Arc::clone(&self.scratch))?;
        diagnostics.retain(|d| d.level != Severity::Error);

        Ok(CompiledUnit {
            loaded: Arc::new(loaded),
            warnings: diagnostics,
            compile_time_ms,
        })
    }

    /// Make the next `count` compiled libraries unloadable.
    #[cfg(test)]
    pub(crate) fn corrupt_next_loads(&self, count: u32) {
        self.corrupt_loads
            .store(count, std::sync::atomic::Ordering::SeqCst);
    }

    #[cfg(test)]
    fn corrupt_if_requested(&self, dylib_path: &Path) -> Result<()> {
        use std::sync::atomic::Ordering;

        let claimed = self
            .corrupt_loads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if claimed {
            std::fs::write(dylib_path, b"not a shared object")?;
        }
        Ok(())
    }

    fn dylib_path(&self, unit: &CompilationUnit) -> PathBuf {
        self.scratch.path().join(format!(
            "{}{}.{}",
            dylib_prefix(),
            unit.crate_name(),
            dylib_extension()
        ))
    }

    fn spawn_error(&self, e: std::io::Error) -> Error {
        Error::Toolchain(format!(
            "Failed to run {}: {}",
            self.toolchain.rustc_path().display(),
            e
        ))
    }
}
