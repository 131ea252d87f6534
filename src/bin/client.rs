use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use wspulse::client::{ClientConfig, ClientMode, PushClient, Reporter, RttClient};
use wspulse::logging::init_logging;

#[tokio::main]
async fn main() {
    let config = ClientConfig::parse();

    init_logging(&config.log_level, config.is_json_format());

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(config).await {
        error!(error = %e, "Client failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: ClientConfig) -> Result<()> {
    info!(server = %config.server, mode = ?config.mode, "Starting wspulse client");
    let reporter = Reporter;

    // The mode strategy is selected exactly once, here.
    match config.mode {
        ClientMode::Rtt => {
            let outcome = RttClient::new(config).run().await?;
            reporter.print_rtt_summary(&outcome);
        }
        ClientMode::Push => {
            let outcome = PushClient::new(config).run().await?;
            reporter.print_push_summary(&outcome);
        }
    }
    Ok(())
}
