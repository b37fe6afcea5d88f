//! Comparison of a prior manifest with its reconciled replacement.
//!
//! "Different" means the raw texts differ byte for byte. No structural
//! comparison is attempted: reordered attributes or whitespace count as a
//! change. The unified preview exists only to show a human what moved.

/// Unified diff preview of two manifest texts
pub mod unified;

pub use unified::{PreviewConfig, write_preview};

use similar::Algorithm;

/// Whether the reconciled text differs from the original.
#[must_use]
pub fn is_different(original: &str, reconciled: &str) -> bool {
    original != reconciled
}

/// Convert the configured algorithm name to `similar::Algorithm`
#[must_use]
pub const fn config_to_algorithm(algo: &crate::config::DiffAlgorithm) -> Algorithm {
    match algo {
        crate::config::DiffAlgorithm::Myers => Algorithm::Myers,
        crate::config::DiffAlgorithm::Patience => Algorithm::Patience,
    }
}
