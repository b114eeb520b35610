//! motorent-admin: operator console for the motorbike rental backend.

mod cli;
mod commands;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use motorent_admin::config::AppConfig;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env();
    tracing::debug!(api = %config.api_base_url, token = %config.token_path.display(), "configuration loaded");

    if let Err(e) = commands::execute(cli, config).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
