//! CountdownComponent — reports ready after a fixed number of polls.

use crate::component::ExperimentComponent;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// A component that reports "not ready" for its first `loops` polls and
/// "ready" from then on. Use `.polls()` to see how often the gate sampled
/// it.
#[derive(Debug)]
pub struct CountdownComponent {
    countdown: AtomicUsize,
    polls: AtomicUsize,
    lag: Duration,
}

impl CountdownComponent {
    /// Create a component that becomes ready after `loops` unready polls.
    pub fn new(loops: usize) -> Self {
        Self {
            countdown: AtomicUsize::new(loops),
            polls: AtomicUsize::new(0),
            lag: Duration::ZERO,
        }
    }

    /// Make every poll take `lag` before answering.
    pub fn with_lag(mut self, lag: Duration) -> Self {
        self.lag = lag;
        self
    }

    /// How many times this component has been polled.
    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExperimentComponent for CountdownComponent {
    async fn is_ready(&self) -> bool {
        self.polls.fetch_add(1, Ordering::SeqCst);
        if !self.lag.is_zero() {
            tokio::time::sleep(self.lag).await;
        }
        self.countdown
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| c.checked_sub(1))
            .is_err()
    }
}
