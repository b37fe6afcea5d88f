use crate::error::{ManifestError, Result};
use regex::{Regex, RegexBuilder};
use std::collections::HashSet;
use std::path::Path;
use tracing::trace;

/// Extension of injection sidecar files, which are never packaged.
pub const INJECTION_EXTENSION: &str = "ParaffinMold";

/// Normalize an extension to the stored form: leading dot, uppercase.
///
/// `pdb`, `.pdb` and `.PDB` all normalize to `.PDB`.
#[must_use]
pub fn normalize_extension(extension: &str) -> String {
    let trimmed = extension.trim();
    let upper = trimmed.to_uppercase();
    if upper.starts_with('.') {
        upper
    } else {
        format!(".{upper}")
    }
}

/// Decides which files and directories are left out of a manifest.
///
/// Rules, first match wins:
/// 1. files only: hidden files, injection sidecars and excluded extensions
/// 2. directories only: case-sensitive substring match against the full path
/// 3. patterns (case-insensitive): bare file name for files, full path for
///    directories
#[derive(Debug, Clone, Default)]
pub struct ExclusionFilter {
    extensions: HashSet<String>,
    directories: Vec<String>,
    patterns: Vec<Regex>,
}

impl ExclusionFilter {
    /// Build a filter from the raw option lists.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::InvalidPattern`] if a pattern does not compile.
    pub fn new(extensions: &[String], directories: &[String], patterns: &[String]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|pattern| compile_pattern(pattern))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            extensions: extensions.iter().map(|e| normalize_extension(e)).collect(),
            directories: directories.to_vec(),
            patterns,
        })
    }

    /// Whether `path` (a regular file) is excluded.
    #[must_use]
    pub fn excludes_file(&self, path: &Path) -> bool {
        if is_hidden(path) {
            trace!(path = %path.display(), "Skipping hidden file");
            return true;
        }

        if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
            if extension.eq_ignore_ascii_case(INJECTION_EXTENSION) {
                return true;
            }
            if self.extensions.contains(&normalize_extension(extension)) {
                trace!(path = %path.display(), "Excluded by extension");
                return true;
            }
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        self.matches_pattern(&name)
    }

    /// Whether `path` (a directory) is excluded.
    #[must_use]
    pub fn excludes_directory(&self, path: &Path) -> bool {
        let full = path.to_string_lossy();
        if self.directories.iter().any(|d| full.contains(d.as_str())) {
            trace!(path = %full, "Excluded by directory substring");
            return true;
        }
        self.matches_pattern(&full)
    }

    fn matches_pattern(&self, text: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.is_match(text))
    }
}

/// Compile a case-insensitive exclusion pattern.
///
/// # Errors
///
/// Returns [`ManifestError::InvalidPattern`] if the pattern does not compile.
pub fn compile_pattern(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| ManifestError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}

#[cfg(windows)]
fn is_hidden(path: &Path) -> bool {
    use std::os::windows::fs::MetadataExt;
    const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
    std::fs::metadata(path).is_ok_and(|m| m.file_attributes() & FILE_ATTRIBUTE_HIDDEN != 0)
}

#[cfg(not(windows))]
fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}
