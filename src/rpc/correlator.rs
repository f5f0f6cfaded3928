//! Request/response correlation.
//!
//! The correlator owns the map from request id to pending result slot. Ids
//! are assigned monotonically by the event loop and never reused, so whoever
//! removes an entry under the lock owns its completion; the oneshot sender
//! can fire at most once either way. Exactly one of {response, timeout,
//! connection failure} resolves each slot.

use crate::error::{Error, Result};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub(crate) struct PendingEntry {
    pub slot: oneshot::Sender<Result<Value>>,
    pub method: String,
    pub timeout: Option<JoinHandle<()>>,
    pub created_at: Instant,
}

impl PendingEntry {
    pub fn new(slot: oneshot::Sender<Result<Value>>, method: String) -> Self {
        Self { slot, method, timeout: None, created_at: Instant::now() }
    }

    fn abort_timeout(&mut self) {
        if let Some(handle) = self.timeout.take() {
            handle.abort();
        }
    }
}

#[derive(Default)]
pub(crate) struct Correlator {
    pending: Mutex<HashMap<u64, PendingEntry>>,
    orphaned: AtomicU64,
}

impl Correlator {
    pub fn insert(&self, id: u64, entry: PendingEntry) {
        self.pending.lock().insert(id, entry);
    }

    /// Attach the timeout task handle after the entry is already in the map.
    /// If the entry resolved in between, the fresh timer is cancelled.
    pub fn attach_timeout(&self, id: u64, handle: JoinHandle<()>) {
        let mut pending = self.pending.lock();
        match pending.get_mut(&id) {
            Some(entry) => entry.timeout = Some(handle),
            None => handle.abort(),
        }
    }

    /// Resolve a pending slot with a result. Returns `false` when no entry
    /// exists for the id (an orphaned response).
    pub fn resolve(&self, id: u64, result: Result<Value>) -> bool {
        let entry = self.pending.lock().remove(&id);
        match entry {
            Some(mut entry) => {
                entry.abort_timeout();
                let _ = entry.slot.send(result);
                true
            }
            None => false,
        }
    }

    /// Claim an entry for the timeout path; the caller completes the slot.
    pub fn take(&self, id: u64) -> Option<PendingEntry> {
        self.pending.lock().remove(&id)
    }

    /// Fail every pending slot and clear the map (connection lost, provider
    /// closed). All timers are cancelled.
    pub fn fail_all(&self, make_err: impl Fn(&str) -> Error) {
        let drained: Vec<(u64, PendingEntry)> = self.pending.lock().drain().collect();
        for (_id, mut entry) in drained {
            entry.abort_timeout();
            let err = make_err(&entry.method);
            let _ = entry.slot.send(Err(err));
        }
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Count an orphaned response; returns the running total.
    pub fn note_orphan(&self) -> u64 {
        self.orphaned.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn orphaned(&self) -> u64 {
        self.orphaned.load(Ordering::Relaxed)
    }
}
