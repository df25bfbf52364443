//! The inbound HTTP surface.
//!
//! `POST /` and `POST /message` both accept an alert, format it, publish it
//! to ntfy and answer with whatever status ntfy returned.

use crate::{
    core::{InboundAlert, Notifier},
    error::RelayError,
    formatting::NotificationFormatter,
    internal_metrics::{Metrics, OUTCOME_FAILED, OUTCOME_FORWARDED, OUTCOME_REJECTED},
};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument};

/// Shared, read-only state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub notifier: Arc<dyn Notifier>,
    pub formatter: Arc<NotificationFormatter>,
    pub metrics: Metrics,
}

/// Builds the routing table for the relay.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", post(on_message))
        .route("/message", post(on_message))
        .with_state(state)
}

/// Relays one alert and mirrors the ntfy status back to the caller.
#[instrument(skip_all)]
pub async fn on_message(State(state): State<AppState>, body: Bytes) -> Response {
    match relay(&state, &body).await {
        Ok(status) => {
            state.metrics.record_request(OUTCOME_FORWARDED);
            status.into_response()
        }
        Err(RelayError::MissingText) => {
            error!("No 'text' field in the request JSON.");
            state.metrics.record_request(OUTCOME_REJECTED);
            RelayError::MissingText.into_response()
        }
        Err(e) => {
            error!(kind = e.kind(), error = %e, "Error processing message");
            state.metrics.record_request(OUTCOME_FAILED);
            e.into_response()
        }
    }
}

async fn relay(state: &AppState, body: &[u8]) -> Result<StatusCode, RelayError> {
    let alert = InboundAlert::from_slice(body)?;
    let text = alert.text()?;
    let notification = state.formatter.format(text);
    info!(
        "Received message:\n{}\n{}",
        notification.title, notification.message
    );

    let started = Instant::now();
    let response = state.notifier.send(&notification).await?;
    state
        .metrics
        .record_ntfy_response(response.status, started.elapsed());

    Ok(response.status)
}

/// The relay's HTTP server, bound but not yet serving.
pub struct RelayServer {
    listener: TcpListener,
    router: Router,
    shutdown_rx: watch::Receiver<bool>,
}

impl RelayServer {
    pub fn new(listener: TcpListener, state: AppState, shutdown_rx: watch::Receiver<bool>) -> Self {
        Self {
            listener,
            router: router(state),
            shutdown_rx,
        }
    }

    /// Returns a future that serves requests until a shutdown signal is
    /// received. In-flight requests are allowed to finish.
    pub fn run(self) -> impl Future<Output = anyhow::Result<()>> {
        let Self {
            listener,
            router,
            mut shutdown_rx,
        } = self;

        async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    shutdown_rx.changed().await.ok();
                    debug!("Relay server received shutdown signal.");
                })
                .await?;
            Ok(())
        }
    }
}
