use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use wspulse::logging::init_logging;
use wspulse::server::{Server, ServerConfig};

#[tokio::main]
async fn main() {
    let config = ServerConfig::parse();

    init_logging(&config.log_level, config.is_json_format());

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(config).await {
        error!(error = %e, "Server failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: ServerConfig) -> Result<()> {
    info!(port = config.port, mode = ?config.mode, "Starting wspulse server");
    let server = Server::bind(config).await?;
    server.run().await
}
