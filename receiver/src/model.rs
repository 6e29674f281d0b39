use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

/// Event types the receiver knows how to interpret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "new_measurement")]
    NewMeasurement,
}

impl EventType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new_measurement" => Some(Self::NewMeasurement),
            _ => None,
        }
    }
}

/// Envelope received from sensor gateways over HTTP.
///
/// `data` is kept as raw JSON until the event type is known.
#[derive(Debug, Deserialize)]
pub struct IngressEvent {
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default)]
    pub data: Option<Box<RawValue>>,
    #[serde(default)]
    pub source_uuid: String,
}

/// Decoded `new_measurement` payload.
///
/// Every field is optional so that a key missing from the JSON can be told
/// apart from one that is present with a zero value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MeasurementPayload {
    pub data_format: Option<i64>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<i64>,
    pub acceleration: Option<AccelerationPayload>,
    pub battery: Option<i64>,
    #[serde(rename = "TXPower")]
    pub tx_power: Option<i64>,
    pub movement: Option<i64>,
    pub sequence: Option<i64>,
    #[serde(rename = "MAC")]
    pub mac: Option<String>,
    #[serde(rename = "RSSI")]
    pub rssi: Option<i64>,
    pub address: Option<String>,
    pub local_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AccelerationPayload {
    #[serde(rename = "X")]
    pub x: Option<i64>,
    #[serde(rename = "Y")]
    pub y: Option<i64>,
    #[serde(rename = "Z")]
    pub z: Option<i64>,
}

/// A measurement with every field present, as forwarded to the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Measurement {
    pub data_format: i64,
    pub temperature: f64,
    pub humidity: f64,
    pub pressure: i64,
    pub acceleration: Acceleration,
    pub battery: i64,
    #[serde(rename = "TXPower")]
    pub tx_power: i64,
    pub movement: i64,
    pub sequence: i64,
    #[serde(rename = "MAC")]
    pub mac: String,
    #[serde(rename = "RSSI")]
    pub rssi: i64,
    pub address: String,
    pub local_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acceleration {
    #[serde(rename = "X")]
    pub x: i64,
    #[serde(rename = "Y")]
    pub y: i64,
    #[serde(rename = "Z")]
    pub z: i64,
}

/// Message published to the ingress topic. Field order is the wire order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub data: Measurement,
    pub source_uuid: String,
}

/// Fixed set of response messages returned to HTTP callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiMessage {
    #[serde(rename = "ok")]
    Ok,
    #[serde(rename = "invalid request")]
    InvalidRequest,
    #[serde(rename = "unknown event")]
    UnknownEvent,
    #[serde(rename = "not found")]
    NotFound,
    #[serde(rename = "service unavailable")]
    ServiceUnavailable,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub message: ApiMessage,
}
