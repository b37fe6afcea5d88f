use super::filter::ExclusionFilter;
use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{Level, debug, span, warn};
use walkdir::WalkDir;

/// Direct contents of one directory after filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryListing {
    /// Files that belong in the manifest, sorted by name
    pub files: Vec<PathBuf>,
    /// Subdirectories to descend into, sorted by name; empty without recursion
    pub subdirectories: Vec<PathBuf>,
}

/// List the direct files and subdirectories of `directory`.
///
/// Only one level is read; the caller drives the traversal. A symlink to a
/// file is listed like the file itself. Links to directories are skipped
/// with a warning so the walk can never cycle, and dangling links are
/// ignored.
///
/// # Errors
///
/// Returns an error if the directory cannot be read.
pub fn list_directory(
    directory: &Path,
    filter: &ExclusionFilter,
    recurse: bool,
) -> Result<DirectoryListing> {
    let span = span!(Level::DEBUG, "list_directory", path = %directory.display());
    let _guard = span.enter();

    let mut listing = DirectoryListing::default();

    for entry in WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry?;
        let file_type = entry.file_type();
        let path = entry.into_path();

        let is_file = if file_type.is_symlink() {
            match fs::metadata(&path) {
                Ok(target) if target.is_file() => true,
                Ok(target) if target.is_dir() => {
                    warn!(path = %path.display(), "Skipping symlinked directory");
                    continue;
                }
                Ok(_) => continue,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Skipping dangling symlink");
                    continue;
                }
            }
        } else if file_type.is_file() {
            true
        } else if file_type.is_dir() {
            false
        } else {
            continue;
        };

        if is_file {
            if !filter.excludes_file(&path) {
                listing.files.push(path);
            }
        } else if recurse && !filter.excludes_directory(&path) {
            listing.subdirectories.push(path);
        }
    }

    debug!(
        files = listing.files.len(),
        subdirectories = listing.subdirectories.len(),
        "Directory listed"
    );
    Ok(listing)
}
