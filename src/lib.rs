#![warn(missing_docs)]
#![allow(clippy::indexing_slicing)] // Indices come from enumerate over the same slice

//! # wixsync - WiX file manifests that stay stable across builds
//!
//! wixsync scans a build output directory and writes a WiX fragment with one
//! `Component` per file. On later builds it reconciles that fragment with the
//! directory instead of regenerating it, so component ids and GUIDs of files
//! that are still present never change. Removed files can be kept as
//! transitive records for patch builds.
//!
//! ## Architecture
//!
//! - [`manifest`]: typed document model, options header, parse and render
//! - [`reconcile`]: the directory walk that creates or updates a manifest
//! - [`scanner`]: exclusion rules and single-level directory listing
//! - [`xml`]: small order-preserving XML tree used by the manifest layer
//! - [`utils`]: identifier generation, path aliasing, natural ordering
//! - [`config`]: user settings file
//! - [`commands`], [`cli`], [`output`], [`logging`]: the command-line tool
//!
//! ## Example Usage
//!
//! ```no_run
//! use wixsync::manifest::{ManifestOptions, render_manifest};
//! use wixsync::utils::RandomTokens;
//!
//! # fn main() -> anyhow::Result<()> {
//! let options = ManifestOptions {
//!     group_name: "AppFiles".to_string(),
//!     directory: "build/out".to_string(),
//!     alias: Some("$(var.BuildDir)".to_string()),
//!     ..ManifestOptions::default()
//! };
//!
//! let created = wixsync::reconcile::create(options, Box::new(RandomTokens))?;
//! std::fs::write("AppFiles.wxs", render_manifest(&created.manifest)?)?;
//! # Ok(())
//! # }
//! ```

/// Command-line interface definitions (argument parsing structures).
pub mod cli;

/// Command implementations behind the binary.
pub mod commands;

/// User settings file parsing and validation.
pub mod config;

/// Difference reporting between a manifest and its reconciled output.
pub mod diff;

/// Error types for the manifest engine.
pub mod error;

/// Tracing subscriber setup.
pub mod logging;

/// Manifest document model.
pub mod manifest;

/// Console output styling and verbosity.
pub mod output;

/// Create and update manifests against a directory tree.
pub mod reconcile;

/// Exclusion rules and directory listing.
pub mod scanner;

/// Utility functions and helpers.
pub mod utils;

/// Minimal XML tree, reader and writer.
pub mod xml;

pub use error::{ErrorKind, ManifestError};

/// Current version of the wixsync binary.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
