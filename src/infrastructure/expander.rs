use anyhow::{Context, Result};
use std::path::Path;
use std::process::Command;

use super::project_loader::SourceUnit;

/// Run `cargo expand` on a crate and wrap the expanded source as one translation unit.
///
/// Derives and macros are already expanded in the result, so their output shows up
/// as written code.
pub fn expand_crate(manifest_path: &Path) -> Result<SourceUnit> {
    let output = Command::new("cargo")
        .arg("expand")
        .arg("--manifest-path")
        .arg(manifest_path)
        .output()
        .context("Failed to execute 'cargo expand'. Is cargo-expand installed?")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("cargo expand failed: {}", stderr);
    }

    let content = String::from_utf8(output.stdout)
        .context("cargo expand output was not valid UTF-8")?;

    Ok(SourceUnit::new(expanded_path(manifest_path), content))
}

/// `<crate dir>/expanded.rs`, the name expanded units are reported under.
pub fn expanded_path(manifest_path: &Path) -> String {
    manifest_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join("expanded.rs")
        .display()
        .to_string()
}
