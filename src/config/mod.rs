//! User settings shared by every run.
//!
//! Per-manifest settings live in the manifest's own options header. This file
//! only carries defaults that apply across manifests, such as exclusions a
//! team always wants, plus console preferences.

/// Unknown-field detection for settings files
pub mod validator;

use crate::manifest::OptionExtras;
use crate::scanner::filter::compile_pattern;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable overriding the settings file location.
pub const CONFIG_ENV: &str = "WIXSYNC_CONFIG";

/// Contents of `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Settings {
    /// Defaults merged into every create and update
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Output file naming and diff preview
    #[serde(default)]
    pub output: OutputConfig,
}

/// Option defaults, applied exactly like extra command-line values.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct DefaultsConfig {
    /// Extensions to leave out, e.g. `.pdb`
    #[serde(default)]
    pub extension_excludes: Vec<String>,
    /// Directory path substrings to leave out
    #[serde(default)]
    pub directory_excludes: Vec<String>,
    /// Case-insensitive exclusion patterns
    #[serde(default)]
    pub regex_excludes: Vec<String>,
    /// `DirectoryRef` id for new manifests
    #[serde(default)]
    pub directory_ref: Option<String>,
}

/// Where updated manifests go and how differences are previewed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputConfig {
    /// Extension of the file `update` writes next to its input
    #[serde(default = "default_update_extension")]
    pub update_extension: String,
    /// Context lines in the difference preview
    #[serde(default = "default_diff_context")]
    pub diff_context: usize,
    /// Line diff algorithm for the preview
    #[serde(default)]
    pub diff_algorithm: DiffAlgorithm,
}

/// Line diff algorithm for previews.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffAlgorithm {
    /// Myers' algorithm
    #[default]
    Myers,
    /// Patience diff, often clearer for reordered XML blocks
    Patience,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            update_extension: default_update_extension(),
            diff_context: default_diff_context(),
            diff_algorithm: DiffAlgorithm::default(),
        }
    }
}

impl Settings {
    /// Location of the settings file: `$WIXSYNC_CONFIG`, else
    /// `<config dir>/wixsync/config.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if no configuration directory can be determined.
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
            return Ok(PathBuf::from(path));
        }
        let dir = dirs::config_dir().context("Could not determine configuration directory")?;
        Ok(dir.join("wixsync").join("config.toml"))
    }

    /// Load settings from the default location.
    ///
    /// # Errors
    ///
    /// See [`Settings::load`].
    pub fn load_default() -> Result<Self> {
        Self::load(&Self::default_path()?)
    }

    /// Load settings from `path`; a missing file yields the defaults.
    ///
    /// Unknown keys are reported as warnings. Exclusion patterns are compiled
    /// once here so a typo fails before any directory is walked.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, or
    /// holds an invalid exclusion pattern.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No settings file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        validator::ConfigValidator::new().report(&content)?;

        let settings: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse settings file {}", path.display()))?;
        for pattern in &settings.defaults.regex_excludes {
            compile_pattern(pattern)
                .with_context(|| format!("Invalid setting in {}", path.display()))?;
        }

        debug!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    /// The configured defaults as option extras.
    #[must_use]
    pub fn extras(&self) -> OptionExtras {
        OptionExtras {
            extension_excludes: self.defaults.extension_excludes.clone(),
            directory_excludes: self.defaults.directory_excludes.clone(),
            regex_excludes: self.defaults.regex_excludes.clone(),
            include_files: Vec::new(),
        }
    }
}

fn default_update_extension() -> String {
    "wixsync".to_string()
}

const fn default_diff_context() -> usize {
    3
}
