//! Command-line interface definitions for wixsync.
//!
//! The definitions are shared between the main binary and the xtask crate,
//! which renders man pages from them.
//!
//! Note: field-level documentation is provided via clap help text, so
//! missing_docs is allowed for this module.

#![allow(missing_docs)]

use crate::manifest::OptionExtras;
use crate::manifest::options::MAX_GROUP_NAME_LEN;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Main CLI structure for wixsync.
#[derive(Parser)]
#[command(
    name = "wixsync",
    version = crate::VERSION,
    about = "Generate and keep WiX file manifests in sync with a directory tree",
    long_about = "Creates a WiX fragment listing every file under a directory, then \
                  reconciles it against later builds so that existing component ids \
                  and GUIDs never change"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Show verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress informational messages
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// All available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Create a new manifest from a directory
    Create(CreateArgs),

    /// Reconcile an existing manifest with the directory it describes
    Update(UpdateArgs),

    /// Create zero-byte files for every removed file recorded in a manifest
    Placeholders {
        /// Manifest to read
        file: PathBuf,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct CreateArgs {
    /// Manifest file to write
    pub file: PathBuf,

    /// Directory to scan
    #[arg(short, long)]
    pub dir: String,

    /// Component group name
    #[arg(short, long, value_parser = parse_group_name)]
    pub group_name: String,

    /// Preprocessor text replacing the directory in every Source path
    #[arg(short, long)]
    pub alias: Option<String>,

    /// DirectoryRef id (default: settings file, then INSTALLDIR)
    #[arg(long)]
    pub dirref: Option<String>,

    /// DiskId for new components
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub diskid: u32,

    /// Only scan the top-level directory
    #[arg(long)]
    pub norecurse: bool,

    /// Put top-level files directly under the DirectoryRef
    #[arg(long)]
    pub no_root_directory: bool,

    /// Value for each component's Win64 attribute, e.g. $(var.Win64)
    #[arg(long)]
    pub win64_var: Option<String>,

    /// Mark new components Permanent
    #[arg(long)]
    pub permanent: bool,

    /// Write the WiX 4 namespace
    #[arg(long)]
    pub wix4: bool,

    /// Per-user install: registry key paths instead of file key paths
    #[arg(long)]
    pub per_user: bool,

    #[command(flatten)]
    pub extras: ExtraArgs,
}

#[derive(Args)]
pub struct UpdateArgs {
    /// Manifest file to reconcile
    pub file: PathBuf,

    /// Keep removed files as transitive records for patch builds
    #[arg(short = 'p', long)]
    pub patch_update: bool,

    /// Create zero-byte files for removed files
    #[arg(long, requires = "patch_update")]
    pub patch_create_files: bool,

    /// Exit with code 4 when the output differs from the input
    #[arg(long)]
    pub report_if_different: bool,

    /// Output file (default: input with the configured update extension)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub extras: ExtraArgs,
}

/// List options accepted by both create and update.
#[derive(Args, Default)]
pub struct ExtraArgs {
    /// File extension to exclude (repeatable)
    #[arg(short, long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,

    /// Directory path substring to exclude (repeatable)
    #[arg(long = "dir-exclude", value_name = "TEXT")]
    pub directory_excludes: Vec<String>,

    /// Case-insensitive pattern to exclude (repeatable)
    #[arg(short, long = "regex-exclude", value_name = "PATTERN")]
    pub regex_excludes: Vec<String>,

    /// File to reference with an include directive (repeatable)
    #[arg(short, long = "include-file", value_name = "FILE")]
    pub include_files: Vec<String>,
}

impl ExtraArgs {
    #[must_use]
    pub fn to_extras(&self) -> OptionExtras {
        OptionExtras {
            extension_excludes: self.extensions.clone(),
            directory_excludes: self.directory_excludes.clone(),
            regex_excludes: self.regex_excludes.clone(),
            include_files: self.include_files.clone(),
        }
    }
}

fn parse_group_name(value: &str) -> Result<String, String> {
    if value.trim().is_empty() {
        return Err("group name must not be empty".to_string());
    }
    if value.chars().count() >= MAX_GROUP_NAME_LEN {
        return Err(format!(
            "group name must be shorter than {MAX_GROUP_NAME_LEN} characters"
        ));
    }
    Ok(value.to_string())
}
