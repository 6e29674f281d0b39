use crate::metrics::PUBLISH_FAILURES_TOTAL;
use crate::producer::{BrokerPublisher, MessageWriter};
use crate::queue::QueueReceiver;
use tracing::{debug, error, info};

/// Drains the delivery queue into the broker until the queue is closed.
///
/// Delivery is at-most-once: a message whose publish fails is logged and dropped,
/// and the loop moves on to the next one.
pub async fn run_delivery<W: MessageWriter>(
    mut rx: QueueReceiver,
    publisher: BrokerPublisher<W>,
    topic: String,
) {
    info!(
        "Starting delivery worker for {} on topic {}",
        publisher.own_name(),
        topic
    );

    let mut delivered: u64 = 0;
    let mut dropped: u64 = 0;

    while let Some(message) = rx.dequeue().await {
        let len = message.len();
        match publisher.publish(message, &topic).await {
            Ok(()) => {
                delivered += 1;
                debug!("Published {} bytes to {}", len, topic);
            }
            Err(e) => {
                dropped += 1;
                PUBLISH_FAILURES_TOTAL.inc();
                error!("Failed to produce message: {}", e);
            }
        }
    }

    info!(
        "Delivery queue closed ({} delivered, {} dropped), closing producer",
        delivered, dropped
    );
    if let Err(e) = publisher.close().await {
        error!("Failed to close producer: {}", e);
    }

    info!("Delivery worker stopped");
}
