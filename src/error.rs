//! Error types for manifest generation and reconciliation.
//!
//! Every failure the engine can hit is fatal for the current run. The
//! variants are grouped into [`ErrorKind`]s so the binary can map them to
//! process exit codes without string matching.

use std::path::PathBuf;

/// Result type for manifest operations
pub type Result<T> = std::result::Result<T, ManifestError>;

/// Broad classification of a [`ManifestError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input document is not something this tool can work with.
    MalformedInput,
    /// The input uses the retired multiple-files-per-component layout.
    UnsupportedLegacyLayout,
    /// The prior manifest or an injection file contradicts itself.
    StructuralConflict,
    /// A file recorded as removed came back with real content.
    PatchConflict,
    /// The manifest was written by a newer format generation.
    VersionSkew,
    /// Filesystem, XML or pattern failures from underlying crates.
    Environment,
}

/// Errors that can occur while creating or reconciling a manifest
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// The root element does not start with the options header comment
    #[error("{path} does not look like a manifest this tool generated (missing options header)")]
    MissingOptionsHeader { path: PathBuf },

    /// The options header exists but a required field is absent or unreadable
    #[error("Invalid options header: {message}")]
    InvalidOptionsHeader { message: String },

    /// The document is missing one of the fixed structural elements
    #[error("Invalid manifest structure: {message}")]
    InvalidStructure { message: String },

    /// Legacy manifests that put several files in one component
    #[error(
        "Manifests with multiple files per component are no longer supported{}",
        .component.as_ref().map(|c| format!(" (component {c})")).unwrap_or_default()
    )]
    MultipleFilesPerComponent { component: Option<String> },

    /// Format version written by a newer generator
    #[error("Manifest format version {found} is newer than supported version {supported}. Please upgrade wixsync.")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// Two sibling directories share a name, or one directory lists a source twice
    #[error("Invalid name count: more than one entry named '{name}' in the prior manifest")]
    DuplicateEntry { name: String },

    /// Injection sidecar without content under a directory reference
    #[error("Injection file {path} has no elements under a DirectoryRef")]
    InvalidInjectionFile { path: PathBuf },

    /// A previously removed file reappeared with non-zero size
    #[error(
        "{path} was previously removed from the installer but is now back with content; \
         restoring removed files is not supported"
    )]
    RestoredRemovedFile { path: PathBuf },

    /// A file or directory path that is not valid UTF-8
    #[error("Path is not valid UTF-8: {path}")]
    NonUtf8Path { path: PathBuf },

    /// Exclusion pattern that failed to compile
    #[error("Invalid exclusion pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// XML reader or writer error
    #[error(transparent)]
    Xml(#[from] quick_xml::Error),

    /// Malformed XML attribute
    #[error(transparent)]
    XmlAttribute(#[from] quick_xml::events::attributes::AttrError),

    /// Non UTF-8 bytes in the document
    #[error(transparent)]
    Utf8(#[from] std::str::Utf8Error),

    /// Directory traversal failure
    #[error(transparent)]
    Walk(#[from] walkdir::Error),

    /// Injection file lookup pattern failure
    #[error(transparent)]
    Glob(#[from] glob::PatternError),

    /// Unreadable entry while listing injection files
    #[error(transparent)]
    GlobEntry(#[from] glob::GlobError),
}

impl ManifestError {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingOptionsHeader { .. }
            | Self::InvalidOptionsHeader { .. }
            | Self::InvalidStructure { .. } => ErrorKind::MalformedInput,
            Self::MultipleFilesPerComponent { .. } => ErrorKind::UnsupportedLegacyLayout,
            Self::DuplicateEntry { .. } | Self::InvalidInjectionFile { .. } => {
                ErrorKind::StructuralConflict
            }
            Self::RestoredRemovedFile { .. } => ErrorKind::PatchConflict,
            Self::UnsupportedVersion { .. } => ErrorKind::VersionSkew,
            Self::NonUtf8Path { .. }
            | Self::InvalidPattern { .. }
            | Self::Io(_)
            | Self::Xml(_)
            | Self::XmlAttribute(_)
            | Self::Utf8(_)
            | Self::Walk(_)
            | Self::Glob(_)
            | Self::GlobEntry(_) => ErrorKind::Environment,
        }
    }

    /// Process exit code the command-line layer reports for this error.
    ///
    /// `3` is reserved for the retired multiple-files-per-component layout;
    /// every other failure is reported as an invalid input (`2`).
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::UnsupportedLegacyLayout => 3,
            _ => 2,
        }
    }

    /// Shorthand for [`ManifestError::InvalidOptionsHeader`].
    pub(crate) fn header(message: impl Into<String>) -> Self {
        Self::InvalidOptionsHeader {
            message: message.into(),
        }
    }

    /// Shorthand for [`ManifestError::InvalidStructure`].
    pub(crate) fn structure(message: impl Into<String>) -> Self {
        Self::InvalidStructure {
            message: message.into(),
        }
    }
}
