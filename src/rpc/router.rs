//! Subscription routing.
//!
//! Maps server-assigned subscription ids to per-subscription delivery
//! channels. Delivery happens on the reader context and never blocks it: a
//! full or closed listener channel drops the notification with a counter and
//! a metric. The original `(method, params)` of each subscription is kept so
//! consumers can replay it after a reconnect.

use crate::rpc::metrics::Metrics;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

struct SubscriptionEntry {
    tx: mpsc::Sender<Value>,
    method: String,
    params: Value,
}

#[derive(Default)]
pub(crate) struct SubscriptionRouter {
    subs: Mutex<HashMap<String, SubscriptionEntry>>,
    dropped: AtomicU64,
}

impl SubscriptionRouter {
    /// Register a listener channel for a server-assigned id and return the
    /// receiving half.
    pub fn register(
        &self,
        id: &str,
        method: &str,
        params: Value,
        buffer: usize,
    ) -> mpsc::Receiver<Value> {
        let (tx, rx) = mpsc::channel(buffer);
        self.subs.lock().insert(
            id.to_string(),
            SubscriptionEntry { tx, method: method.to_string(), params },
        );
        rx
    }

    /// Remove a listener; returns whether it existed.
    pub fn remove(&self, id: &str) -> bool {
        self.subs.lock().remove(id).is_some()
    }

    /// Deliver a notification payload. Unknown ids are quietly ignored (they
    /// race with unsubscription); undeliverable payloads are counted.
    pub fn dispatch(&self, id: &str, payload: Value, metrics: &dyn Metrics) {
        let subs = self.subs.lock();
        let Some(entry) = subs.get(id) else {
            tracing::debug!(subscription = id, "notification for unknown subscription");
            return;
        };
        if entry.tx.try_send(payload).is_err() {
            drop(subs);
            self.dropped.fetch_add(1, Ordering::Relaxed);
            metrics.notification_dropped(id);
            tracing::warn!(subscription = id, "listener channel full or gone; notification dropped");
        }
    }

    /// The original `(method, params)` of a live subscription, for manual
    /// replay after a reconnect.
    pub fn replay_info(&self, id: &str) -> Option<(String, Value)> {
        self.subs
            .lock()
            .get(id)
            .map(|e| (e.method.clone(), e.params.clone()))
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.subs.lock().len()
    }

    /// Drop every listener (provider closed).
    pub fn clear(&self) {
        self.subs.lock().clear();
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
