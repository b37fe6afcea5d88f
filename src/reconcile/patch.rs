//! Removed-file history for patch builds.
//!
//! A file that disappears from disk between runs is kept in the manifest as a
//! transitive component with a never-true condition, so that uninstall
//! patches can still reference it. Such records move to the end of their
//! directory and stay there until the history is purged.

use super::{UpdateOptions, Session};
use crate::error::{ManifestError, Result};
use crate::manifest::{Component, DirectoryChild, Manifest};
use crate::utils::PathAlias;
use crate::utils::paths::{absolute_directory, ensure_parent_dirs};
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Whether a matched prior component should be left to the removal tracker.
///
/// A transitive component whose file is back as a zero-byte placeholder is
/// still considered removed. If the file came back with content the run
/// fails rather than silently reinstating it.
///
/// # Errors
///
/// Returns [`ManifestError::RestoredRemovedFile`] for a restored file, or an
/// I/O error if the file cannot be inspected.
pub(super) fn is_pending_removal(run: UpdateOptions, prior: &Component, file: &Path) -> Result<bool> {
    if !run.patch_update || !prior.is_transitive() {
        return Ok(false);
    }
    if fs::metadata(file)?.len() == 0 {
        return Ok(true);
    }
    Err(ManifestError::RestoredRemovedFile {
        path: file.to_path_buf(),
    })
}

impl Session {
    /// Append removed-file records for prior components that were not matched.
    pub(super) fn track_removed<'a>(
        &mut self,
        removed: impl Iterator<Item = &'a Component>,
        output: &mut Vec<DirectoryChild>,
    ) {
        for prior in removed {
            let mut component = prior.clone();
            if !component.is_transitive() {
                info!(source = %component.file.source, "Marking file as removed");
            }
            component.mark_removed();

            if self.run.create_placeholders {
                self.pending_placeholders
                    .push(self.alias.to_disk(&component.file.source));
            }
            output.push(DirectoryChild::Component(component));
        }
    }
}

/// Create a zero-byte file at each path where nothing exists yet.
///
/// Existing files are never touched. Returns the paths actually created.
///
/// # Errors
///
/// Returns an I/O error if a file or its parent directory cannot be created.
pub fn create_placeholders(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut created = Vec::new();
    for path in paths {
        ensure_parent_dirs(path)?;
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(_) => {
                debug!(path = %path.display(), "Created placeholder");
                created.push(path.clone());
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(created)
}

/// Disk paths of every removed-file record in `manifest`.
///
/// # Errors
///
/// Returns an error if the manifest's starting directory cannot be resolved.
pub fn removed_file_paths(manifest: &Manifest) -> Result<Vec<PathBuf>> {
    let start = absolute_directory(&manifest.options.directory)?;
    let alias = PathAlias::new(&start, manifest.options.alias.as_deref())?;
    Ok(manifest
        .components()
        .into_iter()
        .filter(|c| c.is_transitive())
        .map(|c| alias.to_disk(&c.file.source))
        .collect())
}
