use crate::metrics::{EVENTS_ACCEPTED_TOTAL, EVENTS_REJECTED_TOTAL};
use crate::model::{ApiMessage, EventType, OutboundMessage};
use crate::queue::QueueSender;
use crate::validate::{decode_event, decode_measurement};
use axum::http::{Method, StatusCode};
use tracing::{debug, error};

pub const EVENT_PATH: &str = "/event";

/// Status code and response message for a handled request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOutcome {
    pub status: StatusCode,
    pub message: ApiMessage,
}

impl IngestOutcome {
    const fn new(status: StatusCode, message: ApiMessage) -> Self {
        Self { status, message }
    }

    pub const OK: Self = Self::new(StatusCode::OK, ApiMessage::Ok);
    pub const NOT_FOUND: Self = Self::new(StatusCode::NOT_FOUND, ApiMessage::NotFound);
    pub const METHOD_NOT_ALLOWED: Self =
        Self::new(StatusCode::METHOD_NOT_ALLOWED, ApiMessage::InvalidRequest);
    pub const INVALID_REQUEST: Self =
        Self::new(StatusCode::BAD_REQUEST, ApiMessage::InvalidRequest);
    pub const UNKNOWN_EVENT: Self = Self::new(StatusCode::BAD_REQUEST, ApiMessage::UnknownEvent);
    pub const UNAVAILABLE: Self =
        Self::new(StatusCode::SERVICE_UNAVAILABLE, ApiMessage::ServiceUnavailable);
}

/// Runs the ingestion decision sequence for one request.
///
/// Checks short-circuit in order; only an accepted event touches the queue.
pub async fn handle_ingress(
    method: &Method,
    path: &str,
    body: &[u8],
    queue: &QueueSender,
) -> IngestOutcome {
    let payload = match prepare_message(method, path, body) {
        Ok(payload) => payload,
        Err((outcome, reason)) => {
            EVENTS_REJECTED_TOTAL.inc();
            debug!("Rejected {} {}: {}", method, path, reason);
            return outcome;
        }
    };

    match queue.enqueue(payload).await {
        Ok(()) => {
            EVENTS_ACCEPTED_TOTAL.inc();
            IngestOutcome::OK
        }
        Err(e) => {
            error!("Cannot accept event: {}", e);
            IngestOutcome::UNAVAILABLE
        }
    }
}

type Rejection = (IngestOutcome, String);

fn prepare_message(method: &Method, path: &str, body: &[u8]) -> Result<Vec<u8>, Rejection> {
    if path != EVENT_PATH {
        return Err((IngestOutcome::NOT_FOUND, "unknown path".to_string()));
    }

    if method != Method::POST {
        return Err((IngestOutcome::METHOD_NOT_ALLOWED, "method not allowed".to_string()));
    }

    let event = decode_event(body)
        .map_err(|e| (IngestOutcome::INVALID_REQUEST, e.to_string()))?;

    if event.source_uuid.is_empty() {
        return Err((IngestOutcome::INVALID_REQUEST, "empty source_uuid".to_string()));
    }

    let event_type = EventType::parse(&event.event_type).ok_or_else(|| {
        (
            IngestOutcome::UNKNOWN_EVENT,
            format!("unknown event type {:?}", event.event_type),
        )
    })?;

    match event_type {
        EventType::NewMeasurement => {
            let raw = event
                .data
                .as_ref()
                .ok_or_else(|| (IngestOutcome::INVALID_REQUEST, "missing data".to_string()))?;

            let payload = decode_measurement(raw.get().as_bytes())
                .map_err(|e| (IngestOutcome::INVALID_REQUEST, e.to_string()))?;

            let data = payload.into_complete().map_err(|field| {
                (
                    IngestOutcome::INVALID_REQUEST,
                    format!("incomplete measurement, missing {}", field),
                )
            })?;

            debug!("Received new measurement from {}", event.source_uuid);

            let message = OutboundMessage {
                event_type,
                data,
                source_uuid: event.source_uuid,
            };
            serde_json::to_vec(&message)
                .map_err(|e| (IngestOutcome::INVALID_REQUEST, e.to_string()))
        }
    }
}
