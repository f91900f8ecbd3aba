mod cli;
mod commands;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    tracing::debug!(command = ?cli.command, "dispatching command");
    match cli.command {
        // Serial tooling works without a config file
        Command::Ports => commands::ports(),
        Command::Send(args) => commands::send(args).await,

        Command::Config => commands::show_config(&commands::load_config(&cli.global)?),
        Command::Run(args) => commands::run(commands::load_config(&cli.global)?, args).await,
        Command::Inventory(args) => {
            commands::inventory(commands::load_config(&cli.global)?, args).await
        }
        Command::Verify(args) => commands::verify(commands::load_config(&cli.global)?, args).await,
    }
}
