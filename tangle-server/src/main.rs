use std::sync::Arc;

use clap::Parser;
use tangle_core::{create_provider, ChatProvider, TangleConfig};
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "tangle.toml")]
    config: String,

    /// Load config, select the provider, print the selection and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience — production uses real env vars)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config
    let config = match TangleConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Init logging: RUST_LOG wins, otherwise the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    fmt().with_env_filter(filter).init();

    // Provider is chosen once and shared read-only
    let provider: Arc<dyn ChatProvider> = match create_provider(&config.provider) {
        Ok(p) => Arc::from(p),
        Err(e) => {
            eprintln!("Failed to create provider {}: {}", config.provider.name, e);
            std::process::exit(1);
        }
    };

    if args.check {
        println!("✅ Provider: {} ({})", provider.name(), provider.model());
        println!("✅ Listen address: {}", config.listen_addr());
        return Ok(());
    }

    tracing::info!(
        provider = provider.name(),
        model = provider.model(),
        timeout_seconds = config.provider.timeout_seconds,
        "Provider selected"
    );

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    tangle_server::http::start_http_server(provider, config, tx.subscribe()).await?;

    Ok(())
}
