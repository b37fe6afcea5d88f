//! Translation between on-disk paths and aliased `Source` values.

use crate::error::Result;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};

/// Rewrites the starting-directory prefix of source paths into an alias.
///
/// Both the starting directory and the alias are normalized to end with a
/// path separator, so `C:\build` with alias `$(var.Src)` maps
/// `C:\build\bin\a.dll` to `$(var.Src)\bin\a.dll`. Only a leading prefix is
/// ever substituted.
#[derive(Debug, Clone)]
pub struct PathAlias {
    start: String,
    alias: Option<String>,
}

impl PathAlias {
    /// Create a translator for `start_directory` (absolute) and an optional alias.
    ///
    /// # Errors
    ///
    /// Returns [`NonUtf8Path`](crate::error::ManifestError::NonUtf8Path) if the directory is not UTF-8.
    pub fn new(start_directory: &Path, alias: Option<&str>) -> Result<Self> {
        let start = super::paths::path_str(start_directory)?;
        Ok(Self {
            start: with_trailing_separator(start),
            alias: alias
                .filter(|a| !a.is_empty())
                .map(with_trailing_separator),
        })
    }

    /// The `Source` value for a file on disk.
    ///
    /// # Errors
    ///
    /// Returns [`NonUtf8Path`](crate::error::ManifestError::NonUtf8Path) if the path is not UTF-8.
    pub fn to_source(&self, disk_path: &Path) -> Result<String> {
        let path = super::paths::path_str(disk_path)?;
        Ok(match (&self.alias, path.strip_prefix(self.start.as_str())) {
            (Some(alias), Some(rest)) => format!("{alias}{rest}"),
            _ => path.to_string(),
        })
    }

    /// The on-disk path a stored `Source` value refers to.
    #[must_use]
    pub fn to_disk(&self, source: &str) -> PathBuf {
        match self
            .alias
            .as_deref()
            .and_then(|alias| source.strip_prefix(alias))
        {
            Some(rest) => PathBuf::from(format!("{}{rest}", self.start)),
            None => PathBuf::from(source),
        }
    }
}

fn with_trailing_separator(value: &str) -> String {
    if value.ends_with('/') || value.ends_with('\\') {
        value.to_string()
    } else {
        format!("{value}{MAIN_SEPARATOR}")
    }
}
