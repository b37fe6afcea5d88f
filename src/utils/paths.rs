use crate::error::{ManifestError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Borrow a path as UTF-8 text.
///
/// Manifests store paths as XML attribute text, so every path that ends up
/// in one must be valid UTF-8.
///
/// # Errors
///
/// Returns [`ManifestError::NonUtf8Path`] otherwise.
pub fn path_str(path: &Path) -> Result<&str> {
    path.to_str().ok_or_else(|| ManifestError::NonUtf8Path {
        path: path.to_path_buf(),
    })
}

/// Final path component as UTF-8 text.
///
/// # Errors
///
/// Returns [`ManifestError::NonUtf8Path`] if the name is missing or not UTF-8.
pub fn file_name_str(path: &Path) -> Result<&str> {
    path.file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| ManifestError::NonUtf8Path {
            path: path.to_path_buf(),
        })
}

/// Expands a leading `~` to the user's home directory.
#[must_use]
pub fn expand_tilde(path: &Path) -> PathBuf {
    match path.to_str() {
        Some("~") => dirs::home_dir().unwrap_or_else(|| path.to_path_buf()),
        Some(text) if text.starts_with("~/") => match dirs::home_dir() {
            Some(home) => home.join(&text[2..]),
            None => path.to_path_buf(),
        },
        _ => path.to_path_buf(),
    }
}

/// Resolve the starting directory recorded in a manifest to an absolute path.
///
/// Relative directories resolve against the current working directory, the
/// same way they did when the manifest was created. Symlinks are left alone
/// so stored `Source` values stay stable.
///
/// # Errors
///
/// Returns an error if the current directory cannot be determined.
pub fn absolute_directory(directory: &str) -> Result<PathBuf> {
    let expanded = expand_tilde(Path::new(directory));
    Ok(std::path::absolute(expanded)?)
}

/// Ensures parent directories exist for a given path
///
/// # Errors
///
/// Returns an error if the parent directories cannot be created
pub fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}
