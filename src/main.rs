mod classify;
mod feed;
mod model;
mod report;
mod synth;
mod web;

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::feed::{FeedClient, Synchronizer};
use crate::synth::SyntheticGenerator;
use crate::web::Config;

#[derive(Parser)]
#[command(name = "drone-sentry")]
#[command(about = "Airspace watch: restricted-zone classification over live telemetry")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file
    Check { config: String },
    /// Run the feed synchronizer and the web server
    Run { config: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { config } => check(&config),
        Commands::Run { config } => run(&config).await,
    }
}

fn load_config(path: &str) -> Result<Config, String> {
    let config = Config::from_file(path).map_err(|e| e.to_string())?;
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn check(path: &str) -> ExitCode {
    match load_config(path) {
        Ok(config) => {
            let topup = if config.topup.enabled {
                format!("pads {} records", config.topup.count)
            } else {
                "off".to_string()
            };
            println!(
                "Configuration is valid ({} static zones, top-up {})",
                config.static_zones.len(),
                topup
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(path: &str) -> ExitCode {
    let config = match load_config(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let client = match FeedClient::new(config.feed.request_timeout) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error building feed client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let generator = SyntheticGenerator::new(config.synth.clone());
    let mut sync = Synchronizer::new(config.sync_settings(), client, generator);
    if let Err(e) = sync.start() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let sync = Arc::new(Mutex::new(sync));
    let result = web::run_server(&config, sync.clone()).await;

    // Server is down; close the channel and cancel any pending reconnect
    // before exiting.
    sync.lock().await.stop().await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}
