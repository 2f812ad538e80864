mod commands;
mod logging;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "ghosync",
    version,
    about = "Sync a WHO health indicator series into PostgreSQL"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the extract-transform-load pipeline, resuming from any checkpoint
    Run,
    /// Validate database and source API connectivity without syncing
    Check,
    /// Show pipeline state: status, checkpoint, records processed
    Status,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    match cli.command {
        Commands::Run => commands::run::execute(),
        Commands::Check => commands::check::execute(),
        Commands::Status => commands::status::execute(),
    }
}
