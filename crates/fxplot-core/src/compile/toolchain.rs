//! Toolchain discovery for unit compilation.
//!
//! Locates `rustc`, records its version and probes for the Cranelift codegen
//! backend, which cuts compile latency noticeably for tiny units.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{Error, Result};

/// The Rust compiler used to build units.
#[derive(Debug, Clone)]
pub struct ToolchainManager {
    /// Path to rustc
    rustc_path: PathBuf,

    /// Whether Cranelift is available
    cranelift_available: bool,

    /// Toolchain version string
    version: String,
}

impl ToolchainManager {
    /// Detect `rustc` on `PATH`.
    pub fn new() -> Result<Self> {
        let rustc_path = Self::find_rustc()?;
        Self::with_rustc(rustc_path)
    }

    /// Use an explicit `rustc` binary.
    pub fn with_rustc(rustc_path: impl Into<PathBuf>) -> Result<Self> {
        let rustc_path = rustc_path.into();
        let version = Self::get_rustc_version(&rustc_path)?;
        let cranelift_available = Self::check_cranelift_available(&rustc_path);

        tracing::info!(
            "Using {} ({}), cranelift: {}",
            version,
            rustc_path.display(),
            cranelift_available
        );

        Ok(Self {
            rustc_path,
            cranelift_available,
            version,
        })
    }

    /// Check if Cranelift backend is available.
    pub fn has_cranelift(&self) -> bool {
        self.cranelift_available
    }

    /// Get the rustc path.
    pub fn rustc_path(&self) -> &Path {
        &self.rustc_path
    }

    /// Get the toolchain version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Get rustc flags for Cranelift compilation.
    pub fn cranelift_flags(&self) -> Vec<String> {
        if self.cranelift_available {
            vec!["-Zcodegen-backend=cranelift".to_string()]
        } else {
            Vec::new()
        }
    }

    /// Find rustc in PATH.
    fn find_rustc() -> Result<PathBuf> {
        which::which("rustc").map_err(|_| Error::Toolchain("rustc not found in PATH".to_string()))
    }

    /// Get rustc version string.
    fn get_rustc_version(rustc: &Path) -> Result<String> {
        let output = Command::new(rustc)
            .arg("--version")
            .output()
            .map_err(|e| Error::Toolchain(format!("Failed to run {}: {}", rustc.display(), e)))?;

        if !output.status.success() {
            return Err(Error::Toolchain(format!(
                "{} --version exited with {}",
                rustc.display(),
                output.status
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Check if Cranelift backend is available.
    fn check_cranelift_available(rustc: &Path) -> bool {
        Command::new(rustc)
            .args(["-Zcodegen-backend=cranelift", "--print", "crate-name", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}
