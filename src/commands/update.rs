use crate::cli::UpdateArgs;
use crate::config::Settings;
use crate::diff::{self, PreviewConfig};
use crate::manifest::render_manifest;
use crate::output::{self, Verbosity};
use crate::reconcile::{self, UpdateOptions};
use crate::utils::RandomTokens;
use anyhow::{Result, bail};
use std::path::{Path, PathBuf};

/// Exit code reported when `--report-if-different` finds a change.
pub const DIFFERENT_EXIT_CODE: i32 = 4;

/// What an update run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Where the reconciled manifest was written
    pub output: PathBuf,
    /// Whether the output text differs from the input text
    pub different: bool,
    /// Whether the caller asked for a difference exit code
    pub report_if_different: bool,
}

impl UpdateOutcome {
    /// Process exit code for this outcome.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        if self.report_if_different && self.different {
            DIFFERENT_EXIT_CODE
        } else {
            0
        }
    }
}

/// Default output path: the input with the configured extension.
#[must_use]
pub fn default_output_path(input: &Path, settings: &Settings) -> PathBuf {
    input.with_extension(&settings.output.update_extension)
}

/// Reconcile `args.file` against disk and write the result.
///
/// # Errors
///
/// Returns an error if the input is not a usable manifest, reconciliation
/// fails, or the output would overwrite the input.
pub fn execute(args: &UpdateArgs, settings: &Settings) -> Result<UpdateOutcome> {
    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.file, settings));
    if std::path::absolute(&output_path)? == std::path::absolute(&args.file)? {
        bail!(
            "Output {} would overwrite the input manifest",
            output_path.display()
        );
    }

    let (original, prior) = super::read_manifest(&args.file)?;

    let mut extras = args.extras.to_extras();
    extras.extend(&settings.extras());
    let run = UpdateOptions {
        patch_update: args.patch_update,
        create_placeholders: args.patch_create_files,
    };

    let reconciled = reconcile::update(&prior, &extras, run, Box::new(RandomTokens))?;
    let text = render_manifest(&reconciled.manifest)?;
    super::write_manifest(&output_path, &text)?;

    super::print_warnings(&reconciled.warnings);
    for placeholder in &reconciled.placeholders {
        output::action("Placeholder", &placeholder.display().to_string());
    }
    output::action("Wrote", &output_path.display().to_string());

    let different = diff::is_different(&original, &text);
    if args.report_if_different && different {
        output::info("The reconciled manifest differs from the input");
        if output::get_verbosity() == Verbosity::Verbose {
            let config = PreviewConfig {
                context_lines: settings.output.diff_context,
                algorithm: diff::config_to_algorithm(&settings.output.diff_algorithm),
                colorize: true,
            };
            diff::write_preview(
                &original,
                &text,
                &args.file,
                &output_path,
                &config,
                &mut std::io::stderr(),
            )?;
        }
    }

    Ok(UpdateOutcome {
        output: output_path,
        different,
        report_if_different: args.report_if_different,
    })
}
