//! Event bus for work that runs off the response path.
//!
//! The pipeline emits an event when a diagnosis completes or feedback
//! arrives; handlers subscribe and do the bookkeeping. Emitting never
//! blocks and never fails, even with no subscribers.

pub mod handlers;
pub mod types;

pub use types::AppEvent;

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;

/// Receiving end handed to a subscriber.
pub type EventReceiver = mpsc::UnboundedReceiver<AppEvent>;

/// Fan-out of unbounded queues, one per subscriber.
///
/// Every subscriber sees every event emitted after it subscribed; nothing
/// is dropped when a handler falls behind. Once every `EventBus` clone is
/// dropped, handlers drain what is queued and then stop.
#[derive(Clone)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<AppEvent>>>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Emit an event to all subscribers.
    pub fn emit(&self, event: AppEvent) {
        tracing::trace!("Event emitted: {}", event.description());
        let mut subscribers = self.lock();
        // Receivers that went away are pruned; no subscribers is fine
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Subscribe to events emitted from now on.
    pub fn subscribe(&self) -> EventReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().iter().filter(|tx| !tx.is_closed()).count()
    }

    // A panic while holding the lock cannot leave the list half-updated
    fn lock(&self) -> MutexGuard<'_, Vec<mpsc::UnboundedSender<AppEvent>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
