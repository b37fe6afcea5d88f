use crate::cli::CreateArgs;
use crate::config::Settings;
use crate::manifest::{DEFAULT_DIRECTORY_REF, ManifestOptions, Numbering, render_manifest};
use crate::output;
use crate::reconcile;
use crate::utils::RandomTokens;
use crate::utils::paths::absolute_directory;
use anyhow::{Result, bail};

/// Build the persisted options for a new manifest.
///
/// Command-line list values come first, then the settings defaults.
#[must_use]
pub fn options_from_args(args: &CreateArgs, settings: &Settings) -> ManifestOptions {
    let directory_ref = args
        .dirref
        .clone()
        .or_else(|| settings.defaults.directory_ref.clone())
        .unwrap_or_else(|| DEFAULT_DIRECTORY_REF.to_string());

    let mut options = ManifestOptions {
        numbering: Numbering::Random,
        group_name: args.group_name.clone(),
        directory: args.dir.clone(),
        alias: args.alias.clone().filter(|a| !a.is_empty()),
        win64: args.win64_var.clone().filter(|w| !w.is_empty()),
        no_recurse: args.norecurse,
        no_root_directory: args.no_root_directory,
        disk_id: args.diskid,
        permanent: args.permanent,
        wix4: args.wix4,
        per_user: args.per_user,
        directory_ref,
        ..ManifestOptions::default()
    };
    options.merge_extras(&args.extras.to_extras());
    options.merge_extras(&settings.extras());
    options
}

/// Create a new manifest for `args.dir` and write it to `args.file`.
///
/// # Errors
///
/// Returns an error if the directory does not exist, the walk fails, or the
/// manifest cannot be written.
pub fn execute(args: &CreateArgs, settings: &Settings) -> Result<()> {
    let directory = absolute_directory(&args.dir)?;
    if !directory.is_dir() {
        bail!("Directory {} does not exist", directory.display());
    }

    let options = options_from_args(args, settings);
    let reconciled = reconcile::create(options, Box::new(RandomTokens))?;
    let text = render_manifest(&reconciled.manifest)?;
    super::write_manifest(&args.file, &text)?;

    super::print_warnings(&reconciled.warnings);
    output::action("Created", &args.file.display().to_string());
    output::info(&format!(
        "{} components under {}",
        reconciled.manifest.components().len(),
        directory.display()
    ));
    Ok(())
}
