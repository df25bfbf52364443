//! ntfy-relay - Webhook to ntfy bridge
//!
//! Receives JSON alerts over HTTP and republishes them as ntfy push
//! notifications.

use anyhow::Result;
use clap::Parser;
use ntfy_relay::{app::App, cli::Cli, config::Config};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = Config::load(&cli).unwrap_or_else(|err| {
        init_tracing("info");
        error!("Failed to load configuration: {}", err);
        std::process::exit(1);
    });

    init_tracing(&config.log_level);

    info!("ntfy-relay starting up...");
    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_level);
    info!("ntfy URL: {}", config.ntfy.base_url);
    info!("ntfy Topic: {}", config.ntfy.topic);
    info!("Listen Address: {}", config.server.bind_address());
    info!("Priority Rules: {}", config.priority_rules.len());
    info!(
        "Metrics: {}",
        if config.metrics.enabled {
            format!("Enabled ({})", config.metrics.listen_address)
        } else {
            "Disabled".to_string()
        }
    );
    info!("-------------------------------------------------------");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let app = App::builder(config).build(shutdown_rx).await?;

    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received, stopping listeners.");
        let _ = shutdown_tx.send(true);
    });

    app.run().await?;
    info!("ntfy-relay stopped.");
    Ok(())
}

/// Installs the global subscriber. `RUST_LOG` wins over the configured level.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
