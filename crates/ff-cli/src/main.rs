use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ff_cli::commands::util::ignore_broken_pipe;
use ff_cli::commands::{events, report, turned_off};
use ff_cli::{Cli, Commands, Config, FetchArgs};

/// Load config and apply command-line overrides.
fn load_config(
    config_path: Option<&Path>,
    fetch: &FetchArgs,
    output_dir: Option<&PathBuf>,
) -> Result<Config> {
    let mut config = Config::load_from(config_path).context("failed to load configuration")?;
    fetch.apply(&mut config)?;
    if let Some(dir) = output_dir {
        config.output_dir.clone_from(dir);
    }
    tracing::debug!(?config, "loaded configuration");
    Ok(config)
}

fn main() -> Result<()> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let stdout = stdout();
    let mut writer = BufWriter::new(stdout.lock());

    match &cli.command {
        Some(Commands::Report { fetch, output_dir }) => {
            let config = load_config(cli.config.as_deref(), fetch, output_dir.as_ref())?;
            report::run(&mut writer, &config)?;
        }
        Some(Commands::TurnedOff { fetch, output_dir }) => {
            let config = load_config(cli.config.as_deref(), fetch, output_dir.as_ref())?;
            turned_off::run(&mut writer, &config)?;
        }
        Some(Commands::Events { fetch }) => {
            let config = load_config(cli.config.as_deref(), fetch, None)?;
            events::run(&mut writer, &config)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    ignore_broken_pipe(writer.flush()).context("failed to flush output")?;
    Ok(())
}
