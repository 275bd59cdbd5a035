//! Catalog change notifications
//!
//! Mutations publish through the [`NotificationEmitter`] they were built with.
//! Delivery is best effort: publishing never fails the mutation.

use tokio::sync::broadcast;

use crate::db::BookRecord;

#[derive(Debug, Clone)]
pub enum CatalogEvent {
    /// A book was committed together with its author link
    BookAdded(BookRecord),
}

impl CatalogEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            Self::BookAdded(_) => "BOOK_ADDED",
        }
    }
}

/// Sink for catalog events
pub trait NotificationEmitter: Send + Sync {
    fn publish(&self, event: CatalogEvent);
}

/// In-process emitter backed by a tokio broadcast channel
pub struct BroadcastEmitter {
    sender: broadcast::Sender<CatalogEvent>,
}

impl BroadcastEmitter {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Receive every event published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.sender.subscribe()
    }
}

impl NotificationEmitter for BroadcastEmitter {
    fn publish(&self, event: CatalogEvent) {
        let topic = event.topic();
        match self.sender.send(event) {
            Ok(receivers) => tracing::debug!(topic, receivers, "Published catalog event"),
            Err(_) => tracing::debug!(topic, "No subscribers for catalog event"),
        }
    }
}
