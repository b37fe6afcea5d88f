//! Injection sidecars ("mold" files).
//!
//! A directory may carry one or more `*.ParaffinMold` documents. Every
//! element found under a `DirectoryRef` inside them is copied verbatim into
//! that directory's output node, after its files.

use crate::error::{ManifestError, Result};
use crate::scanner::INJECTION_EXTENSION;
use crate::utils::paths::path_str;
use crate::xml::{self, XmlElement};
use glob::{MatchOptions, Pattern, glob_with};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Injection files directly inside `directory`, sorted by name.
///
/// # Errors
///
/// Returns an error if the directory path is not UTF-8 or cannot be listed.
pub fn injection_files(directory: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!(
        "{}/*.{INJECTION_EXTENSION}",
        Pattern::escape(path_str(directory)?)
    );
    let options = MatchOptions {
        case_sensitive: false,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };

    let mut files = glob_with(&pattern, options)?.collect::<std::result::Result<Vec<_>, _>>()?;
    files.retain(|p| p.is_file());
    files.sort();
    Ok(files)
}

/// Load the content of one injection file.
///
/// # Errors
///
/// Returns [`ManifestError::InvalidInjectionFile`] when no `DirectoryRef`
/// in the file has element children, or the read/parse error.
pub fn load_injection_file(path: &Path) -> Result<Vec<XmlElement>> {
    let text = fs::read_to_string(path)?;
    let document = xml::parse_document(&text)?;

    let content: Vec<XmlElement> = document
        .root
        .descendants()
        .into_iter()
        .filter(|e| e.local_name() == "DirectoryRef")
        .flat_map(XmlElement::elements)
        .cloned()
        .collect();

    if content.is_empty() {
        return Err(ManifestError::InvalidInjectionFile {
            path: path.to_path_buf(),
        });
    }
    debug!(path = %path.display(), elements = content.len(), "Loaded injection file");
    Ok(content)
}

/// Everything to inject into `directory`, in file-name order.
///
/// # Errors
///
/// Fails on the first malformed or unreadable injection file.
pub fn injected_content(directory: &Path) -> Result<Vec<XmlElement>> {
    let mut content = Vec::new();
    for file in injection_files(directory)? {
        content.extend(load_injection_file(&file)?);
    }
    Ok(content)
}
