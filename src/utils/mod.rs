//! Utility functions and helpers.
//!
//! # Submodules
//!
//! - [`alias`]: Starting-directory alias substitution for `Source` paths
//! - [`ids`]: Directory, component and file identifier generation
//! - [`natural`]: Natural ("logical") string ordering
//! - [`paths`]: Path manipulation and UTF-8 checks

/// Starting-directory alias substitution
pub mod alias;
/// Identifier generation (legacy sequential and random)
pub mod ids;
/// Natural string ordering
pub mod natural;
/// Path manipulation and resolution utilities
pub mod paths;

pub use alias::PathAlias;
pub use ids::{IdGenerator, RandomTokens, SequenceCounters, SequentialTokens, TokenSource};
pub use natural::natural_cmp;
pub use paths::{expand_tilde, path_str};
