//! Common types for the compilation pipeline.

use std::path::PathBuf;

/// Configuration for the unit compiler.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Parent directory for the compiler's scratch directory.
    /// Defaults to the system temp directory.
    pub scratch_parent: Option<PathBuf>,

    /// Explicit rustc binary. `None` searches `PATH`.
    pub rustc_path: Option<PathBuf>,

    /// Use Cranelift backend when the toolchain has it
    pub use_cranelift: bool,

    /// Optimization level (0-3)
    pub opt_level: u8,

    /// Rust edition for generated units
    pub edition: String,

    /// Additional rustc flags
    pub extra_rustc_flags: Vec<String>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            scratch_parent: None,
            rustc_path: None,
            use_cranelift: false,
            opt_level: 0,
            edition: "2021".to_string(),
            extra_rustc_flags: Vec::new(),
        }
    }
}

impl CompilerConfig {
    /// Fast compiles for interactive use.
    pub fn development() -> Self {
        Self {
            use_cranelift: true,
            ..Default::default()
        }
    }

    /// Slower compiles, faster evaluation over large sample domains.
    pub fn optimized() -> Self {
        Self {
            use_cranelift: false,
            opt_level: 3,
            ..Default::default()
        }
    }
}

/// Platform-specific dynamic library extension.
pub fn dylib_extension() -> &'static str {
    #[cfg(target_os = "windows")]
    {
        "dll"
    }
    #[cfg(target_os = "macos")]
    {
        "dylib"
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        "so"
    }
}

/// Platform-specific dynamic library prefix.
pub fn dylib_prefix() -> &'static str {
    #[cfg(target_os = "windows")]
    {
        ""
    }
    #[cfg(not(target_os = "windows"))]
    {
        "lib"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CompilerConfig::default();
        assert!(!config.use_cranelift);
        assert_eq!(config.opt_level, 0);
        assert_eq!(config.edition, "2021");
    }

    #[test]
    fn test_optimized_config() {
        let config = CompilerConfig::optimized();
        assert!(!config.use_cranelift);
        assert_eq!(config.opt_level, 3);
    }

    #[test]
    fn test_dylib_extension() {
        let ext = dylib_extension();
        #[cfg(target_os = "linux")]
        assert_eq!(ext, "so");
        #[cfg(target_os = "macos")]
        assert_eq!(ext, "dylib");
        #[cfg(target_os = "windows")]
        assert_eq!(ext, "dll");
    }
}
