//! Journal — a shared, ordered record of mock-swarm activity.

use std::sync::Mutex;

/// An append-only activity log shared by the mock nodes of one test
/// network. Tests use it to assert cross-node ordering (e.g. every
/// download reached a terminal state before the first removal).
#[derive(Debug, Default)]
pub struct Journal {
    entries: Mutex<Vec<String>>,
}

impl Journal {
    /// Create an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one entry.
    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    /// Return a snapshot of all entries in append order.
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }
}
