use crate::errors::{Error, Result};
use crate::metrics::QUEUE_FULL_TOTAL;
use tokio::sync::mpsc;
use tracing::debug;

pub const DEFAULT_CAPACITY: usize = 100;

/// Creates a bounded FIFO hand-off between request handlers and the delivery worker.
pub fn delivery_queue(capacity: usize) -> (QueueSender, QueueReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (QueueSender { tx }, QueueReceiver { rx })
}

/// Producer side. Cheap to clone; the queue closes when the last clone is dropped.
#[derive(Debug, Clone)]
pub struct QueueSender {
    tx: mpsc::Sender<Vec<u8>>,
}

impl QueueSender {
    /// Enqueues a serialized message, waiting for space if the queue is full.
    pub async fn enqueue(&self, message: Vec<u8>) -> Result<()> {
        match self.tx.try_send(message) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(message)) => {
                QUEUE_FULL_TOTAL.inc();
                debug!("Delivery queue full, waiting for space");
                self.tx.send(message).await.map_err(|_| Error::QueueClosed)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(Error::QueueClosed),
        }
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }
}

/// Consumer side, owned by the delivery worker.
#[derive(Debug)]
pub struct QueueReceiver {
    rx: mpsc::Receiver<Vec<u8>>,
}

impl QueueReceiver {
    /// Waits for the next message. Returns `None` once the queue is closed
    /// and everything already buffered has been handed out.
    pub async fn dequeue(&mut self) -> Option<Vec<u8>> {
        self.rx.recv().await
    }

    /// Stops accepting new messages; buffered ones can still be dequeued.
    #[cfg(test)]
    pub fn close(&mut self) {
        self.rx.close();
    }
}
