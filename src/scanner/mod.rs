/// Exclusion rules for files and directories.
pub mod filter;

/// Single-level directory listing used by the reconciliation walk.
pub mod walker;

pub use filter::{ExclusionFilter, INJECTION_EXTENSION, normalize_extension};
pub use walker::{DirectoryListing, list_directory};
