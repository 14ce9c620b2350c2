mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use unitdefs::{reshape_directory, ReshapeOptions, Schema};

use cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err, cli.debug);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(debug: bool) {
    let default_filter = if debug {
        "unitdefs=debug,unitdefs_reshaper=debug"
    } else {
        "unitdefs=info,unitdefs_reshaper=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(std::io::stderr().is_terminal()),
        )
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let schema = Schema::beyond_all_reason().context("Built-in unitdef schema is invalid")?;
    let options = ReshapeOptions::default();

    tracing::debug!(
        input = %cli.unitdefs_dir.display(),
        output = %cli.output_file.display(),
        "Starting reshape"
    );

    reshape_directory(&cli.unitdefs_dir, &cli.output_file, &schema, &options)?;
    Ok(())
}

/// Log a single diagnostic line; the full error chain only in debug mode
fn report(err: &anyhow::Error, debug: bool) {
    let kind = err
        .chain()
        .find_map(|e| e.downcast_ref::<unitdefs::Error>())
        .map_or("Error", unitdefs::Error::kind);

    tracing::error!(kind, "{}", err);
    if debug {
        tracing::debug!("{:?}", err);
    }
}
