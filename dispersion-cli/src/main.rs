use anyhow::Result;
use clap::Parser;
use env_logger::Env;

use dispersion_cli::cli::commands::{history, process};
use dispersion_cli::cli::{Cli, Commands};
use dispersion_cli::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let config = Config::load(cli.config.as_deref())?;
    log::debug!("Using config: {:?}", config);

    match cli.command {
        Commands::Process(args) => process::handle_process_command(args, &config),
        Commands::Inspect(args) => process::handle_inspect_command(args, &config),
        Commands::Upload(args) => history::handle_upload_command(args, &config).await,
        Commands::History(cmd) => history::handle_history_command(cmd, &config).await,
        Commands::Download(args) => history::handle_download_command(args, &config).await,
    }
}
