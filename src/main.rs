use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod cli;
mod commands;

use cli::{Cli, Commands};

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into()))
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::BuildIndex { .. } | Commands::RefreshIndex { .. } => {
            commands::handle_index_commands(&cli)
        }
        Commands::Inspect { .. } | Commands::InspectBatch { .. } => {
            commands::handle_inspect_commands(&cli)
        }
        Commands::GenSteer { .. } => commands::handle_steer_command(&cli),
    }
}
