use crate::ingest::{handle_ingress, IngestOutcome};
use crate::metrics::{gather_metrics, REQUESTS_TOTAL};
use crate::model::ApiResponse;
use crate::queue::QueueSender;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::{Method, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::debug;

/// Largest accepted request body. Larger bodies are treated as unreadable.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone)]
struct AppState {
    queue: QueueSender,
}

/// Builds the HTTP surface. The ingestion handler is the fallback so that it
/// answers every path that is not a probe or the metrics endpoint.
pub fn create_router(queue: QueueSender, request_timeout: Duration) -> Router {
    let state = AppState { queue };

    Router::new()
        .route("/health", any(probe))
        .route("/ready", any(probe))
        .route("/metrics", any(metrics_handler))
        .fallback(ingest_event)
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
}

async fn ingest_event(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    body: Result<Bytes, BytesRejection>,
) -> IngestOutcome {
    REQUESTS_TOTAL.inc();
    debug!("Received a request: {} {}", method, uri.path());

    // An unreadable body still goes through the path and method checks and
    // then fails to decode.
    let body = body.unwrap_or_else(|rejection| {
        debug!("Failed to read request body: {}", rejection);
        Bytes::new()
    });

    handle_ingress(&method, uri.path(), &body, &state.queue).await
}

impl IntoResponse for IngestOutcome {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ApiResponse {
                message: self.message,
            }),
        )
            .into_response()
    }
}

async fn probe() -> &'static str {
    "OK"
}

async fn metrics_handler() -> String {
    gather_metrics()
}
