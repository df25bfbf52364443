//! The main application logic, decoupled from the entry point.

use crate::{
    config::Config,
    core::Notifier,
    formatting::NotificationFormatter,
    internal_metrics::{Metrics, MetricsBuilder},
    notification::NtfyClient,
    server::{AppState, RelayServer},
    task_manager::TaskManager,
};
use anyhow::{Context, Result};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, instrument};

/// A handle to the running application.
pub struct App {
    task_manager: TaskManager,
    local_addr: SocketAddr,
    metrics_addr: Option<SocketAddr>,
}

impl App {
    /// Creates a new `AppBuilder` to construct an `App`.
    pub fn builder(config: Config) -> AppBuilder {
        AppBuilder::new(config)
    }

    /// The address the relay listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn metrics_addr(&self) -> Option<SocketAddr> {
        self.metrics_addr
    }

    /// Waits for the shutdown signal and then gracefully shuts down all tasks.
    pub async fn run(self) -> Result<()> {
        let mut shutdown_rx = self.task_manager.get_shutdown_rx();
        shutdown_rx.changed().await.ok();
        info!("Shutdown signal received. Waiting for tasks to complete...");

        self.task_manager.shutdown().await
    }
}

/// Builder for the main application.
///
/// Separates constructing the components from running them, and lets tests
/// swap the notifier or metrics for their own.
pub struct AppBuilder {
    config: Config,
    notifier_override: Option<Arc<dyn Notifier>>,
    metrics_override: Option<Metrics>,
}

impl AppBuilder {
    /// Creates a new `AppBuilder` with the given configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            notifier_override: None,
            metrics_override: None,
        }
    }

    /// Overrides the ntfy client for testing.
    pub fn notifier_override(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier_override = Some(notifier);
        self
    }

    /// Overrides the metrics system for testing.
    pub fn metrics_override(mut self, metrics: Metrics) -> Self {
        self.metrics_override = Some(metrics);
        self
    }

    /// Binds the listeners and spawns the servers, returning a runnable `App`.
    ///
    /// Fails if the relay listener cannot be bound.
    #[instrument(skip_all)]
    pub async fn build(self, shutdown_rx: watch::Receiver<bool>) -> Result<App> {
        let config = self.config;
        let task_manager = TaskManager::new(shutdown_rx.clone());

        // =========================================================================
        // 1. Initialize Metrics
        // =========================================================================
        let (metrics, metrics_server_info) = match self.metrics_override {
            Some(m) => (m, None),
            None => {
                MetricsBuilder::new(config.metrics.clone())
                    .build(shutdown_rx.clone())
                    .await
            }
        };

        let metrics_addr = if let Some((server, addr)) = metrics_server_info {
            info!("Metrics server listening on {}", addr);
            task_manager.spawn("MetricsServer", server.run());
            Some(addr)
        } else {
            None
        };

        // =========================================================================
        // 2. Service Instantiation
        // =========================================================================
        let notifier = match self.notifier_override {
            Some(notifier) => notifier,
            None => Arc::new(NtfyClient::new(
                config.ntfy.base_url.clone(),
                config.ntfy.token.clone(),
            )) as Arc<dyn Notifier>,
        };
        let formatter = Arc::new(NotificationFormatter::new(
            config.ntfy.topic.clone(),
            config.priority_rules.clone(),
        ));
        let state = AppState {
            notifier,
            formatter,
            metrics,
        };

        // =========================================================================
        // 3. Start the Relay Server
        // =========================================================================
        let bind_address = config.server.bind_address();
        let listener = TcpListener::bind(&bind_address)
            .await
            .with_context(|| format!("Failed to bind relay listener to {}", bind_address))?;
        let local_addr = listener.local_addr()?;
        info!("Starting server on {}", local_addr);

        let server = RelayServer::new(listener, state, shutdown_rx);
        task_manager.spawn("RelayServer", server.run());

        Ok(App {
            task_manager,
            local_addr,
            metrics_addr,
        })
    }
}
