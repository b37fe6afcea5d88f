use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::{Generator, generate};
use colored::Colorize;
use std::io;
use std::process;
use wixsync::cli::{Cli, Commands};
use wixsync::config::Settings;
use wixsync::output::{self, Verbosity};
use wixsync::{ManifestError, commands, logging};

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            // Printing help or usage can only fail on a closed stream.
            let _ = e.print();
            process::exit(code);
        }
    };

    match run(cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            process::exit(exit_code(&e));
        }
    }
}

/// Manifest errors carry their own exit code; anything else is a general failure.
fn exit_code(error: &anyhow::Error) -> i32 {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<ManifestError>())
        .map_or(1, ManifestError::exit_code)
}

fn run(cli: Cli) -> Result<i32> {
    output::set_verbosity(if cli.quiet {
        Verbosity::Quiet
    } else if cli.verbose {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    });
    if let Err(e) = logging::init(cli.verbose) {
        output::warning(&format!("Logging disabled: {e}"));
    }

    match cli.command {
        Commands::Create(args) => {
            let settings = Settings::load_default()?;
            commands::create::execute(&args, &settings)?;
            Ok(0)
        }
        Commands::Update(args) => {
            let settings = Settings::load_default()?;
            let outcome = commands::update::execute(&args, &settings)?;
            Ok(outcome.exit_code())
        }
        Commands::Placeholders { file } => {
            commands::placeholders::execute(&file)?;
            Ok(0)
        }
        Commands::Completion { shell } => {
            print_completions(shell, &mut Cli::command());
            Ok(0)
        }
    }
}

fn print_completions<G: Generator>(g: G, cmd: &mut clap::Command) {
    generate(g, cmd, cmd.get_name().to_string(), &mut io::stdout());
}
