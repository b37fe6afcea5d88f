/// `wixsync create`
pub mod create;
/// `wixsync placeholders`
pub mod placeholders;
/// `wixsync update`
pub mod update;

use crate::manifest::{Manifest, parse_manifest};
use crate::output;
use crate::utils::paths::ensure_parent_dirs;
use anyhow::{Context, Result};
use std::path::Path;

/// Read and parse a manifest, returning its raw text as well.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a manifest this
/// tool can work with.
pub fn read_manifest(path: &Path) -> Result<(String, Manifest)> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest {}", path.display()))?;
    let manifest = parse_manifest(&text, path)?;
    Ok((text, manifest))
}

/// Write rendered manifest text, creating parent directories as needed.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_manifest(path: &Path, text: &str) -> Result<()> {
    ensure_parent_dirs(path)?;
    std::fs::write(path, text)
        .with_context(|| format!("Failed to write manifest {}", path.display()))
}

/// Print reconciliation warnings.
pub fn print_warnings(warnings: &[String]) {
    for warning in warnings {
        output::warning(warning);
    }
}
