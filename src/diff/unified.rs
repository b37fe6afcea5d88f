use anyhow::Result;
use colored::Colorize;
use similar::{Algorithm, ChangeTag, TextDiff};
use std::io::Write;
use std::path::Path;
use tracing::{Level, debug, span};

/// How to render a manifest preview
pub struct PreviewConfig {
    /// Unchanged lines shown around each change
    pub context_lines: usize,
    /// Diff algorithm
    pub algorithm: Algorithm,
    /// Color deletions red and insertions green
    pub colorize: bool,
}

/// Write a unified diff of `original` against `reconciled`.
///
/// Headers are `--- <original_path>` and `+++ <output_path>`. Returns the
/// number of inserted plus deleted lines.
///
/// # Errors
///
/// Returns an error if writing to `writer` fails.
pub fn write_preview(
    original: &str,
    reconciled: &str,
    original_path: &Path,
    output_path: &Path,
    config: &PreviewConfig,
    writer: &mut dyn Write,
) -> Result<usize> {
    let span = span!(
        Level::DEBUG,
        "manifest_preview",
        path = %output_path.display(),
        algorithm = ?config.algorithm
    );
    let _guard = span.enter();

    let diff = TextDiff::configure()
        .algorithm(config.algorithm)
        .diff_lines(original, reconciled);

    let old_header = format!("--- {}", original_path.display());
    let new_header = format!("+++ {}", output_path.display());
    if config.colorize {
        writeln!(writer, "{}", old_header.red())?;
        writeln!(writer, "{}", new_header.green())?;
    } else {
        writeln!(writer, "{old_header}")?;
        writeln!(writer, "{new_header}")?;
    }

    let mut changed = 0;
    for hunk in diff
        .unified_diff()
        .context_radius(config.context_lines)
        .iter_hunks()
    {
        let header = hunk.header().to_string();
        if config.colorize {
            writeln!(writer, "{}", header.cyan())?;
        } else {
            writeln!(writer, "{header}")?;
        }

        for change in hunk.iter_changes() {
            let line = match change.tag() {
                ChangeTag::Delete => {
                    changed += 1;
                    let line = format!("-{change}");
                    if config.colorize { line.red().to_string() } else { line }
                }
                ChangeTag::Insert => {
                    changed += 1;
                    let line = format!("+{change}");
                    if config.colorize { line.green().to_string() } else { line }
                }
                ChangeTag::Equal => format!(" {change}"),
            };

            write!(writer, "{line}")?;
            if !line.ends_with('\n') {
                writeln!(writer)?;
            }
        }
    }

    debug!(changed, "Preview written");
    Ok(changed)
}
