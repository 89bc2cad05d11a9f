//! RecordingSink — buffers every event for inspection in tests.

use crate::event::{BenchEvent, EventSink, RequestEvent, RunStatusEvent, StageEvent};
use std::sync::Mutex;

/// A sink that records every event in emission order.
/// Use `.events()` (or the filtered accessors) to inspect what the engine
/// emitted.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<BenchEvent>>,
}

impl RecordingSink {
    /// Create an empty recording sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a snapshot of all recorded events.
    pub fn events(&self) -> Vec<BenchEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Only the request events, in emission order.
    pub fn requests(&self) -> Vec<RequestEvent> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                BenchEvent::Request(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    /// Only the stage events, in emission order.
    pub fn stages(&self) -> Vec<StageEvent> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                BenchEvent::Stage(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    /// Only the run status events, in emission order.
    pub fn statuses(&self) -> Vec<RunStatusEvent> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                BenchEvent::RunStatus(s) => Some(s),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: BenchEvent) {
        self.events.lock().unwrap().push(event);
    }
}
