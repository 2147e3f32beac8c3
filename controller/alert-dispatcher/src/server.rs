//! HTTP surface: the Alertmanager webhook receiver and the health check

use crate::alert::NotificationBatch;
use crate::router::AlertRouter;
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::{DefaultMakeSpan, TraceLayer};
use tracing::{error, info};

pub const HEALTH_BODY: &str = "Healthcheck OK\n";

#[derive(Clone)]
pub struct AppState {
    router: Arc<AlertRouter>,
}

impl AppState {
    pub fn new(router: AlertRouter) -> Self {
        Self {
            router: Arc::new(router),
        }
    }
}

async fn health() -> impl IntoResponse {
    HEALTH_BODY
}

/// Webhook receiver
///
/// The caller is an alerting system that does not act on dispatch results, so
/// once the body decodes the response is always 200 with an empty body, sent
/// after every action of the batch has finished. Dispatch failures are only
/// logged. Only an undecodable body is reported back, as 400 with the decode
/// error.
async fn notify(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let batch = match NotificationBatch::from_slice(&body) {
        Ok(batch) => batch,
        Err(e) => {
            error!(error = %e, "Error getting message");
            return (StatusCode::BAD_REQUEST, e.to_string());
        }
    };

    state.router.route(&batch).await;
    (StatusCode::OK, String::new())
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/", post(notify))
        .route("/alerts", post(notify))
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .with_state(state)
}

/// Serve until the shutdown channel flips to true
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let addr = listener
        .local_addr()
        .context("Failed to read listener address")?;
    info!("Starting server on {}", addr);

    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(async move {
            let closed = shutdown.wait_for(|stop| *stop).await.is_err();
            if closed {
                // No sender left that could ask for shutdown
                std::future::pending::<()>().await;
            }
        })
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}
