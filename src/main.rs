use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use api_tester::config;
use api_tester::observability::{logging, metrics};
use api_tester::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "api-tester")]
#[command(about = "Outbound API proxy and inbound webhook catcher", long_about = None)]
struct Args {
    /// TOML configuration file; defaults plus environment overrides when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = config::load(args.config.as_deref())?;
    logging::init(&config.observability);

    tracing::info!(
        bind_address = %config.listener.bind_address,
        base_url = %config.base_url,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(config)?;

    let shutdown = Shutdown::new();
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
