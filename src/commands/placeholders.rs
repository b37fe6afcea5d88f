use crate::output;
use crate::reconcile::{create_placeholders, removed_file_paths};
use anyhow::Result;
use std::path::Path;

/// Create a zero-byte file for every removed-file record in `file` whose
/// path does not exist yet.
///
/// # Errors
///
/// Returns an error if the manifest cannot be read or a file cannot be
/// created.
pub fn execute(file: &Path) -> Result<usize> {
    let (_, manifest) = super::read_manifest(file)?;
    let created = create_placeholders(&removed_file_paths(&manifest)?)?;

    for path in &created {
        output::action("Created", &path.display().to_string());
    }
    output::success(&format!("{} placeholder files created", created.len()));
    Ok(created.len())
}
