//! # Message Bus
//!
//! Detachable subscriptions between the platform event stream and live
//! dispatchers. The gateway handler publishes every inbound message here;
//! the reload controller attaches and detaches dispatchers without touching
//! the gateway connection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{Dispatcher, MessageEvent};

/// Handle for detaching a subscribed dispatcher.
pub type SubscriptionId = u64;

/// Fan-in point for inbound events, fan-out to subscribed dispatchers.
///
/// Normally exactly one dispatcher is subscribed. During a reload two are
/// briefly live at once, so a single event can be dispatched twice in that
/// window; hot reload favors availability over exactly-once semantics.
#[derive(Default)]
pub struct MessageBus {
    subscribers: RwLock<Vec<(SubscriptionId, Arc<Dispatcher>)>>,
    next_id: AtomicU64,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a dispatcher; it receives every event published from now on.
    pub async fn subscribe(&self, dispatcher: Arc<Dispatcher>) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.write().await.push((id, dispatcher));
        id
    }

    /// Detach a dispatcher. Returns false if the id was already gone.
    pub async fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write().await;
        let before = subscribers.len();
        subscribers.retain(|(sub_id, _)| *sub_id != id);
        subscribers.len() != before
    }

    /// Deliver one event to every live dispatcher.
    ///
    /// The subscriber list is cloned out of the lock first, so dispatch
    /// (which spawns tasks) never runs under it.
    pub async fn publish(&self, event: Arc<MessageEvent>) {
        let subscribers: Vec<Arc<Dispatcher>> = self
            .subscribers
            .read()
            .await
            .iter()
            .map(|(_, dispatcher)| Arc::clone(dispatcher))
            .collect();
        for dispatcher in subscribers {
            dispatcher.dispatch(Arc::clone(&event));
        }
    }

    /// Number of live subscriptions.
    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }
}
