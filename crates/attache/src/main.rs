//! Attache entry point.

mod app;
mod config;
mod error;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{log_filter, AppConfig};

#[derive(Parser, Debug)]
#[command(name = "attache", version, about = "Personal AI assistant over Telegram")]
struct Args {
    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Override the API server port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    // Load .env if it exists (for TELEGRAM_BOT_TOKEN, OPENROUTER_API_KEY etc.)
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_filter(args.verbose)));
    fmt().with_env_filter(filter).with_target(false).init();

    let mut config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(port) = args.port {
        config.api_port = port;
    }

    if let Err(e) = app::run(config).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
