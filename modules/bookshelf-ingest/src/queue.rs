//! Ingestion queue: unbounded, order-preserving, many producers, one consumer.
//!
//! The orchestrator holds the only `QueueProducer`, hands cloneable
//! `RecordSender`s to fetch tasks, and calls `finish` once every fetch task is
//! done. `finish` consumes the producer, so the terminal marker can be pushed
//! exactly once.

use tokio::sync::mpsc;
use tracing::warn;

use books_api_client::VolumeItem;

#[derive(Debug)]
pub enum QueueItem {
    Record(VolumeItem),
    /// No further records will be enqueued.
    Done,
}

/// Orchestrator-side handle. Owns the right to end the stream.
pub struct QueueProducer {
    tx: mpsc::UnboundedSender<QueueItem>,
}

/// Fetch-task-side handle. Can only push records.
#[derive(Clone)]
pub struct RecordSender {
    tx: mpsc::UnboundedSender<QueueItem>,
}

pub struct QueueConsumer {
    rx: mpsc::UnboundedReceiver<QueueItem>,
    finished: bool,
}

pub fn channel() -> (QueueProducer, QueueConsumer) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        QueueProducer { tx },
        QueueConsumer {
            rx,
            finished: false,
        },
    )
}

impl QueueProducer {
    pub fn sender(&self) -> RecordSender {
        RecordSender {
            tx: self.tx.clone(),
        }
    }

    /// Push the terminal marker. Call only after every sender's task is done.
    pub fn finish(self) {
        if self.tx.send(QueueItem::Done).is_err() {
            warn!("Consumer already gone when pushing terminal marker");
        }
    }
}

impl RecordSender {
    /// Never blocks. Returns false if the consumer has already stopped.
    pub fn push(&self, item: impl Into<VolumeItem>) -> bool {
        self.tx.send(QueueItem::Record(item.into())).is_ok()
    }
}

impl QueueConsumer {
    /// Next record, or `None` once the terminal marker is dequeued. The marker
    /// itself is never handed out as data.
    ///
    /// If every producer handle was dropped without a marker, this also
    /// returns `None` so the consumer cannot hang.
    pub async fn next(&mut self) -> Option<VolumeItem> {
        if self.finished {
            return None;
        }
        match self.rx.recv().await {
            Some(QueueItem::Record(item)) => Some(item),
            Some(QueueItem::Done) => {
                self.finished = true;
                None
            }
            None => {
                warn!("Ingestion queue closed without a terminal marker");
                self.finished = true;
                None
            }
        }
    }

    /// Items still buffered. Zero once a well-behaved producer has finished
    /// and `next` has returned `None`.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}
