use anyhow::Result;
use colored::Colorize;
use std::collections::HashSet;

/// Detects settings keys that wixsync does not recognize
pub struct ConfigValidator {
    /// Fully qualified keys, e.g. `defaults.extension_excludes`
    known_fields: HashSet<&'static str>,
}

impl ConfigValidator {
    /// Create a validator for the current settings layout
    #[must_use]
    pub fn new() -> Self {
        let known_fields = [
            "defaults",
            "defaults.extension_excludes",
            "defaults.directory_excludes",
            "defaults.regex_excludes",
            "defaults.directory_ref",
            "output",
            "output.update_extension",
            "output.diff_context",
            "output.diff_algorithm",
        ]
        .into_iter()
        .collect();

        Self { known_fields }
    }

    /// Keys in `content` that are not part of the settings layout
    ///
    /// # Errors
    ///
    /// Returns an error if `content` is not valid TOML
    pub fn unknown_fields(&self, content: &str) -> Result<Vec<String>> {
        let parsed: toml::Value = toml::from_str(content)?;
        let mut unknown = Vec::new();
        self.check_table(&parsed, "", &mut unknown);
        Ok(unknown)
    }

    /// Print a warning block for every unknown key
    ///
    /// # Errors
    ///
    /// Returns an error if `content` is not valid TOML
    pub fn report(&self, content: &str) -> Result<()> {
        let unknown = self.unknown_fields(content)?;
        if !unknown.is_empty() {
            eprintln!("{}", "Configuration warnings:".yellow().bold());
            for field in &unknown {
                eprintln!("  Unknown configuration field: {}", field.yellow());
            }
            eprintln!();
        }
        Ok(())
    }

    /// Walk a TOML table, collecting unknown keys
    ///
    /// Unknown tables are reported once as a whole rather than key by key.
    fn check_table(&self, table: &toml::Value, prefix: &str, unknown: &mut Vec<String>) {
        if let toml::Value::Table(map) = table {
            for (key, value) in map {
                let full_key = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };

                if !self.known_fields.contains(full_key.as_str()) {
                    unknown.push(full_key);
                } else if let toml::Value::Table(_) = value {
                    self.check_table(value, &full_key, unknown);
                }
            }
        }
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}
