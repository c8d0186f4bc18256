// Host visibility notifications (shown/hidden) delivered to explicit
// subscribers.

use tokio::sync::broadcast;
use tracing::{debug, warn};

const BUS_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The host became visible; a session may start.
    Shown,
    /// The host was hidden; pending work should be flushed.
    Hidden,
}

#[derive(Debug, Clone)]
pub struct LifecycleBus {
    tx: broadcast::Sender<LifecycleEvent>,
}

impl Default for LifecycleBus {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> LifecycleSubscription {
        LifecycleSubscription { rx: self.tx.subscribe() }
    }

    /// Detach a subscriber. It receives nothing published afterwards.
    pub fn unsubscribe(&self, subscription: LifecycleSubscription) {
        drop(subscription);
        debug!(remaining = self.tx.receiver_count(), "lifecycle subscriber detached");
    }

    /// Deliver `event` to every current subscriber. Returns how many
    /// received it.
    pub fn publish(&self, event: LifecycleEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[derive(Debug)]
pub struct LifecycleSubscription {
    rx: broadcast::Receiver<LifecycleEvent>,
}

impl LifecycleSubscription {
    /// Next event, or `None` once every bus handle is gone.
    pub async fn next(&mut self) -> Option<LifecycleEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "lifecycle subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
