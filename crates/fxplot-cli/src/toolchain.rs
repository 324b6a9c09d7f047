//! Toolchain command: show what the compiler will run.

use std::path::Path;

use fxplot_core::ToolchainManager;

use crate::colors;

/// Execute the toolchain command.
pub fn execute(rustc: Option<&Path>) -> anyhow::Result<()> {
    let toolchain = match rustc {
        Some(path) => ToolchainManager::with_rustc(path)?,
        None => ToolchainManager::new()?,
    };

    println!(
        "{}rustc{}      {}",
        colors::BOLD,
        colors::RESET,
        toolchain.rustc_path().display()
    );
    println!("{}version{}    {}", colors::BOLD, colors::RESET, toolchain.version());

    let cranelift = if toolchain.has_cranelift() {
        format!("{}available{}", colors::GREEN, colors::RESET)
    } else {
        format!("{}not available{}", colors::YELLOW, colors::RESET)
    };
    println!("{}cranelift{}  {}", colors::BOLD, colors::RESET, cranelift);

    Ok(())
}
