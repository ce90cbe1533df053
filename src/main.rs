//! Foldwise - Main Entry Point

use clap::Parser;
use foldwise::cli::{cmd_compare, cmd_sweep, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "foldwise=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compare { run } => {
            cmd_compare(&run)?;
        }
        Commands::Sweep { run, model, param, values } => {
            cmd_sweep(&run, model, param, &values)?;
        }
    }

    Ok(())
}
