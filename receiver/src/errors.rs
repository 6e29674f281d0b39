use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Kafka error: {0}")]
    Broker(#[from] rskafka::client::error::Error),

    #[error("Publish to topic {topic} timed out after {timeout_ms}ms")]
    PublishTimeout { topic: String, timeout_ms: u64 },

    #[error("Broker self-test failed: {0}")]
    SelfTest(Box<Error>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Delivery queue closed")]
    QueueClosed,
}

pub type Result<T> = std::result::Result<T, Error>;
