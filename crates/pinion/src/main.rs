use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use owo_colors::OwoColorize;

use pinion_resolver::ResolveError;
use pinion_types::InvalidSlugError;

use crate::commands::ExitStatus;

mod commands;
mod logging;

/// Pin every transitively required Puppet module to a compatible version.
#[derive(Parser)]
#[command(author, version, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level for diagnostic output on stderr.
    #[arg(global = true, long, value_enum, default_value_t)]
    loglevel: logging::Level,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a Puppetfile into one with every module pinned.
    Resolve(ResolveArgs),
}

#[derive(Args)]
struct ResolveArgs {
    /// Path to the Puppetfile to resolve.
    puppetfile: PathBuf,

    /// File listing module slugs to omit from the output, one per line.
    #[arg(long)]
    hide_file: Option<PathBuf>,

    /// File listing module slugs whose deprecation and no-version-found
    /// errors are demoted to warnings, one per line.
    #[arg(long)]
    ignore_file: Option<PathBuf>,

    /// File whose contents are inserted verbatim after the forge line.
    #[arg(long)]
    preamble_file: Option<PathBuf>,

    /// Write the resolved Puppetfile here instead of stdout.
    #[arg(long, short)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = logging::setup_logging(cli.loglevel) {
        #[allow(clippy::print_stderr)]
        {
            eprintln!("{}: {err}", "error".red().bold());
        }
        return ExitStatus::Error.into();
    }

    let result = match &cli.command {
        Commands::Resolve(args) => {
            commands::resolve(
                &args.puppetfile,
                args.hide_file.as_deref(),
                args.ignore_file.as_deref(),
                args.preamble_file.as_deref(),
                args.output.as_deref(),
            )
            .await
        }
    };

    match result {
        Ok(status) => status.into(),
        Err(err) => {
            #[allow(clippy::print_stderr)]
            {
                eprintln!("{}: {err:#}", "error".red().bold());
            }
            classify(&err).into()
        }
    }
}

/// User-input failures (a bad manifest, a bad hide/ignore slug, an
/// unsatisfiable or deprecated module) exit 1; anything else exits 2.
fn classify(err: &anyhow::Error) -> ExitStatus {
    if err.downcast_ref::<pinion_puppetfile::Error>().is_some()
        || err.downcast_ref::<InvalidSlugError>().is_some()
    {
        return ExitStatus::Failure;
    }
    match err.downcast_ref::<ResolveError>() {
        Some(
            ResolveError::Puppetfile(_)
            | ResolveError::NoVersionFound { .. }
            | ResolveError::ModuleDeprecated { .. }
            | ResolveError::InvalidDependency { .. },
        ) => ExitStatus::Failure,
        _ => ExitStatus::Error,
    }
}
