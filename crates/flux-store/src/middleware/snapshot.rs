//! Snapshot middleware
//!
//! Records `(action, previous state, next state)` triples as JSON for
//! diagnostics. The log is a bounded ring buffer shared through `Arc`, so a
//! debug view or a persistence job can read it while the store keeps running.

use crate::error::StoreError;
use crate::middleware::{Middleware, Next};
use crate::store::Store;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;

/// One recorded transition
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub recorded_at: DateTime<Utc>,
    pub action: Value,
    pub previous: Value,
    pub next: Value,
}

/// Bounded, shareable history of snapshots (oldest first)
#[derive(Debug, Clone)]
pub struct SnapshotLog {
    entries: Arc<Mutex<VecDeque<Snapshot>>>,
    capacity: usize,
}

impl SnapshotLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn entries(&self) -> Vec<Snapshot> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<Snapshot> {
        self.entries.lock().back().cloned()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Render the whole history as pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        let entries = self.entries.lock();
        serde_json::to_string_pretty(&*entries)
    }

    fn push(&self, snapshot: Snapshot) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.entries.lock();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(snapshot);
    }
}

/// SnapshotMiddleware - records every committed transition into a [`SnapshotLog`]
///
/// Dispatches that leave the state untouched are not recorded. Serialization
/// failures are logged and never fail the dispatch.
pub struct SnapshotMiddleware {
    log: SnapshotLog,
}

impl SnapshotMiddleware {
    pub fn new(log: SnapshotLog) -> Self {
        Self { log }
    }

    pub fn log(&self) -> &SnapshotLog {
        &self.log
    }
}

impl<S: Serialize, A: Serialize> Middleware<S, A> for SnapshotMiddleware {
    fn name(&self) -> &str {
        "snapshot"
    }

    fn handle(
        &mut self,
        store: &Store<S, A>,
        action: A,
        mut next: Next<'_, S, A>,
    ) -> Result<(), StoreError> {
        let previous = store.get_state();
        let action_value = serde_json::to_value(&action);

        next.run(action)?;

        let current = store.get_state();
        if Arc::ptr_eq(&previous, &current) {
            return Ok(());
        }

        let snapshot = action_value.and_then(|action| {
            Ok(Snapshot {
                recorded_at: Utc::now(),
                action,
                previous: serde_json::to_value(&*previous)?,
                next: serde_json::to_value(&*current)?,
            })
        });
        match snapshot {
            Ok(snapshot) => self.log.push(snapshot),
            Err(e) => log::warn!("Failed to record state snapshot: {}", e),
        }
        Ok(())
    }
}
