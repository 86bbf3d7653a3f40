use clap::Parser;
use pulse_server::ServerConfig;

/// Real-time push server: event sessions, raw echo, status endpoints.
#[derive(Parser, Debug)]
#[command(name = "pulse", version)]
struct Cli {
    /// Host to bind.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to bind.
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Period between broadcaster ticks, in milliseconds.
    #[arg(long, default_value_t = 600_000)]
    broadcast_interval_ms: u64,
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = ServerConfig {
        host: cli.host,
        port: cli.port,
        broadcast_interval_ms: cli.broadcast_interval_ms,
        ..ServerConfig::default()
    };

    tracing::info!("Starting pulse server");

    let handle = pulse_server::start(config)
        .await
        .expect("Failed to start server");

    tracing::info!(port = handle.port, "pulse server ready");

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for ctrl+c");

    tracing::info!("Shutting down");
}
