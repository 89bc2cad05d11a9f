//! LoopbackNode — a peer that "seeds" and "downloads" in memory.

use crate::component::ExperimentComponent;
use crate::error::NodeError;
use crate::node::{DownloadHandle, Node};
use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Deterministic content reference produced by [`LoopbackNode::genseed`]:
/// identical `(size, seed, meta)` triples yield identical handles.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoopbackHandle(pub String);

impl fmt::Display for LoopbackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a loopback download does when awaited.
#[derive(Debug, Clone)]
pub enum DownloadOutcome {
    /// Report completion.
    Complete,
    /// Report expiry (`Ok(false)`), the timeout-as-value path.
    Incomplete,
    /// Fail with a node error.
    Fail(String),
}

#[derive(Debug)]
struct LoopbackState {
    name: String,
    outcome: DownloadOutcome,
    lag: Duration,
    leech_failure: Option<String>,
    genseed_failure: Option<String>,
    seeded: Mutex<Option<LoopbackHandle>>,
    leeched: Mutex<Option<LoopbackHandle>>,
    awaited: AtomicBool,
    removed: Mutex<Option<LoopbackHandle>>,
    journal: Option<Arc<super::Journal>>,
}

impl LoopbackState {
    fn record(&self, entry: String) {
        if let Some(journal) = &self.journal {
            journal.record(entry);
        }
    }
}

/// A node that records every operation instead of talking to a network.
/// Use `.seeded()`, `.leeched()`, `.awaited()`, and `.removed()` to
/// inspect what the engine did to it.
#[derive(Debug)]
pub struct LoopbackNode {
    state: Arc<LoopbackState>,
}

impl LoopbackNode {
    /// Create a node whose downloads complete immediately.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            state: Arc::new(LoopbackState {
                name: name.into(),
                outcome: DownloadOutcome::Complete,
                lag: Duration::ZERO,
                leech_failure: None,
                genseed_failure: None,
                seeded: Mutex::new(None),
                leeched: Mutex::new(None),
                awaited: AtomicBool::new(false),
                removed: Mutex::new(None),
                journal: None,
            }),
        }
    }

    fn state_mut(&mut self) -> &mut LoopbackState {
        // Builder methods run before the node is shared.
        Arc::get_mut(&mut self.state).expect("configure LoopbackNode before cloning it")
    }

    /// Choose what `await_for_completion` reports.
    pub fn with_download_outcome(mut self, outcome: DownloadOutcome) -> Self {
        self.state_mut().outcome = outcome;
        self
    }

    /// Make `await_for_completion` take `lag` before answering.
    pub fn with_download_lag(mut self, lag: Duration) -> Self {
        self.state_mut().lag = lag;
        self
    }

    /// Make `leech` fail with the given message.
    pub fn with_leech_failure(mut self, message: impl Into<String>) -> Self {
        self.state_mut().leech_failure = Some(message.into());
        self
    }

    /// Make `genseed` fail with the given message.
    pub fn with_genseed_failure(mut self, message: impl Into<String>) -> Self {
        self.state_mut().genseed_failure = Some(message.into());
        self
    }

    /// Share an activity journal with the rest of the test network.
    pub fn with_journal(mut self, journal: Arc<super::Journal>) -> Self {
        self.state_mut().journal = Some(journal);
        self
    }

    /// The handle this node seeded, if it was a seeder.
    pub fn seeded(&self) -> Option<LoopbackHandle> {
        self.state.seeded.lock().unwrap().clone()
    }

    /// The handle this node leeched, if it was a leecher.
    pub fn leeched(&self) -> Option<LoopbackHandle> {
        self.state.leeched.lock().unwrap().clone()
    }

    /// Whether a download on this node was awaited to a terminal state.
    pub fn awaited(&self) -> bool {
        self.state.awaited.load(Ordering::SeqCst)
    }

    /// Whether `remove` was called on this node.
    pub fn removed(&self) -> bool {
        self.state.removed.lock().unwrap().is_some()
    }
}

#[async_trait]
impl Node for LoopbackNode {
    type Handle = LoopbackHandle;
    type Meta = String;
    type Download = LoopbackDownload;

    fn name(&self) -> &str {
        &self.state.name
    }

    async fn genseed(
        &self,
        size: u64,
        seed: u64,
        meta: &Self::Meta,
    ) -> Result<Self::Handle, NodeError> {
        if let Some(message) = &self.state.genseed_failure {
            return Err(NodeError::Request(message.clone()));
        }
        let handle = LoopbackHandle(format!("{meta}-{seed}-{size}"));
        *self.state.seeded.lock().unwrap() = Some(handle.clone());
        self.state.record(format!("genseed:{}", self.state.name));
        Ok(handle)
    }

    async fn leech(&self, handle: &Self::Handle) -> Result<Self::Download, NodeError> {
        if let Some(message) = &self.state.leech_failure {
            return Err(NodeError::Request(message.clone()));
        }
        *self.state.leeched.lock().unwrap() = Some(handle.clone());
        self.state.record(format!("leech:{}", self.state.name));
        Ok(LoopbackDownload {
            state: Arc::clone(&self.state),
        })
    }

    async fn remove(&self, handle: &Self::Handle) -> Result<bool, NodeError> {
        let had_content = self.state.seeded.lock().unwrap().is_some()
            || self.state.leeched.lock().unwrap().is_some();
        *self.state.removed.lock().unwrap() = Some(handle.clone());
        self.state.record(format!("remove:{}", self.state.name));
        Ok(had_content)
    }
}

#[async_trait]
impl ExperimentComponent for LoopbackNode {
    async fn is_ready(&self) -> bool {
        true
    }
}

/// The download side of a [`LoopbackNode`]. Ignores the deadline — the
/// configured [`DownloadOutcome`] decides what the await reports.
#[derive(Debug)]
pub struct LoopbackDownload {
    state: Arc<LoopbackState>,
}

#[async_trait]
impl DownloadHandle for LoopbackDownload {
    fn node_name(&self) -> &str {
        &self.state.name
    }

    async fn await_for_completion(&self, _deadline: Option<Duration>) -> Result<bool, NodeError> {
        if !self.state.lag.is_zero() {
            tokio::time::sleep(self.state.lag).await;
        }
        self.state.awaited.store(true, Ordering::SeqCst);
        match &self.state.outcome {
            DownloadOutcome::Complete => {
                self.state.record(format!("download:{}:complete", self.state.name));
                Ok(true)
            }
            DownloadOutcome::Incomplete => {
                self.state.record(format!("download:{}:incomplete", self.state.name));
                Ok(false)
            }
            DownloadOutcome::Fail(message) => {
                self.state.record(format!("download:{}:failed", self.state.name));
                Err(NodeError::Request(message.clone()))
            }
        }
    }
}
