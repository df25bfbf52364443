//! # Internal Metrics Module
//!
//! Counters and histograms describing the relay's traffic, exported in the
//! Prometheus text format when enabled.
//!
//! ## Components:
//!
//! - **`MetricsBuilder`**: Installs the Prometheus recorder, binds the
//!   metrics listener and constructs the `Metrics` handle.
//!
//! - **`Metrics`**: A cloneable handle the request handler uses to record
//!   outcomes. When metrics are disabled every call is a no-op.
//!
//! - **`MetricsServer`**: (Defined in `server.rs`) An `axum`-based web server
//!   that exposes the `/metrics` endpoint for Prometheus to scrape.

use crate::config::MetricsConfig;
use crate::internal_metrics::server::MetricsServer;
use metrics::{Histogram, Unit};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use reqwest::StatusCode;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::error;

/// Outcome label for inbound requests that reached ntfy.
pub const OUTCOME_FORWARDED: &str = "forwarded";
/// Outcome label for inbound requests refused before the outbound call.
pub const OUTCOME_REJECTED: &str = "rejected";
/// Outcome label for inbound requests that failed with a server error.
pub const OUTCOME_FAILED: &str = "failed";

/// The public API for the metrics system.
#[derive(Clone)]
pub struct Metrics {
    enabled: bool,
    pub ntfy_request_duration_seconds: Histogram,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

impl Metrics {
    /// Creates a new `Metrics` instance and registers descriptions for all
    /// supported metrics with the global recorder.
    pub fn new() -> Self {
        metrics::describe_counter!(
            "relay_requests_total",
            Unit::Count,
            "Inbound alert requests, labeled by outcome (forwarded, rejected, failed)."
        );
        metrics::describe_counter!(
            "ntfy_responses_total",
            Unit::Count,
            "Responses received from ntfy, labeled by HTTP status code."
        );
        metrics::describe_histogram!(
            "ntfy_request_duration_seconds",
            Unit::Seconds,
            "Time spent waiting for ntfy to answer a publish request."
        );

        Self {
            enabled: true,
            ntfy_request_duration_seconds: metrics::histogram!("ntfy_request_duration_seconds"),
        }
    }

    /// Creates a `Metrics` instance that performs no operations.
    /// Used when metrics are disabled in the configuration.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ntfy_request_duration_seconds: Histogram::noop(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Counts one inbound request with the given outcome label.
    pub fn record_request(&self, outcome: &'static str) {
        if self.enabled {
            metrics::counter!("relay_requests_total", "outcome" => outcome).increment(1);
        }
    }

    /// Records the status and latency of a completed ntfy call.
    pub fn record_ntfy_response(&self, status: StatusCode, elapsed: Duration) {
        if self.enabled {
            metrics::counter!("ntfy_responses_total", "status" => status.as_u16().to_string())
                .increment(1);
            self.ntfy_request_duration_seconds.record(elapsed.as_secs_f64());
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Builder for the metrics system.
///
/// This builder is responsible for initializing the `PrometheusRecorder`,
/// binding the `MetricsServer`, and creating the `Metrics` handle.
pub struct MetricsBuilder {
    config: MetricsConfig,
}

impl MetricsBuilder {
    /// Creates a new `MetricsBuilder` with the given configuration.
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    /// Initializes the metrics system and returns a `Metrics` handle and an
    /// optional `MetricsServer` with the address it is bound to.
    ///
    /// Metrics are never fatal: if the listener cannot be bound or the
    /// recorder cannot be installed, the failure is logged and a disabled
    /// `Metrics` instance is returned.
    pub async fn build(
        self,
        shutdown_rx: watch::Receiver<bool>,
    ) -> (Metrics, Option<(MetricsServer, SocketAddr)>) {
        if !self.config.enabled {
            return (Metrics::disabled(), None);
        }

        let recorder = match PrometheusBuilder::new().set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        ) {
            Ok(builder) => builder.build_recorder(),
            Err(e) => {
                error!("Failed to configure Prometheus recorder: {}", e);
                return (Metrics::disabled(), None);
            }
        };
        let handle = recorder.handle();

        // Bind before installing the recorder so a port clash leaves the
        // global recorder untouched.
        let listener = match TcpListener::bind(self.config.listen_address).await {
            Ok(listener) => listener,
            Err(e) => {
                error!(
                    "Failed to bind metrics server to {}: {}",
                    self.config.listen_address, e
                );
                return (Metrics::disabled(), None);
            }
        };

        let addr = match listener.local_addr() {
            Ok(addr) => addr,
            Err(e) => {
                error!("Failed to get local address for metrics server: {}", e);
                return (Metrics::disabled(), None);
            }
        };

        if let Err(e) = metrics::set_global_recorder(recorder) {
            error!("Failed to install Prometheus recorder: {}", e);
            return (Metrics::disabled(), None);
        }

        let metrics = Metrics::new();
        let server = MetricsServer::new(listener, handle, shutdown_rx);

        (metrics, Some((server, addr)))
    }
}

pub mod server;
