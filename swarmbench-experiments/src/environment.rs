//! ExperimentEnvironment — gate an experiment on component readiness.

use async_trait::async_trait;
use bench0::component::ExperimentComponent;
use bench0::duration::DurationMs;
use bench0::error::ExperimentError;
use bench0::experiment::Experiment;
use bench0::id::ExperimentId;
use std::sync::Arc;
use std::time::Duration;
use swarmbench_sync::await_predicate;
use tokio::sync::Mutex;

/// How many components one readiness round polls at most.
pub const DEFAULT_PING_MAX: usize = 8;
/// Pause between readiness rounds.
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(1);
/// How long [`ExperimentEnvironment::run`] waits for readiness before
/// failing fast.
pub const DEFAULT_READINESS_TIMEOUT: Duration = Duration::from_secs(60);

/// The set of external components an experiment depends on, with a
/// polling gate that blocks experiment start until all of them report
/// ready.
///
/// Polling every component every round does not scale to large networks,
/// so each round draws a bounded random sample (at most `ping_max`,
/// without replacement) from the components that have not yet reported
/// ready. A component that reports ready once is never polled again.
pub struct ExperimentEnvironment {
    not_ready: Mutex<Vec<Arc<dyn ExperimentComponent>>>,
    polling_interval: Duration,
    ping_max: usize,
    readiness_timeout: Option<Duration>,
}

impl ExperimentEnvironment {
    /// Create an environment over the given components.
    pub fn new(components: Vec<Arc<dyn ExperimentComponent>>) -> Self {
        Self {
            not_ready: Mutex::new(components),
            polling_interval: DEFAULT_POLLING_INTERVAL,
            ping_max: DEFAULT_PING_MAX,
            readiness_timeout: Some(DEFAULT_READINESS_TIMEOUT),
        }
    }

    /// Set the pause between readiness rounds.
    pub fn with_polling_interval(mut self, interval: Duration) -> Self {
        self.polling_interval = interval;
        self
    }

    /// Set how many components one round polls at most.
    pub fn with_ping_max(mut self, ping_max: usize) -> Self {
        self.ping_max = ping_max.max(1);
        self
    }

    /// Set how long [`run`](Self::run) waits for readiness before failing
    /// fast. `None` waits indefinitely.
    pub fn with_readiness_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.readiness_timeout = timeout;
        self
    }

    /// Poll one bounded sample of not-yet-ready components and report
    /// whether everything has now been seen ready at least once.
    pub async fn is_ready(&self) -> bool {
        let mut pending = self.not_ready.lock().await;
        if pending.is_empty() {
            return true;
        }

        let sampled: Vec<usize> = if pending.len() > self.ping_max {
            rand::seq::index::sample(&mut rand::thread_rng(), pending.len(), self.ping_max)
                .into_vec()
        } else {
            (0..pending.len()).collect()
        };

        let mut ready = Vec::new();
        for index in sampled {
            if pending[index].is_ready().await {
                ready.push(index);
            }
        }

        // Highest index first so swap_remove doesn't disturb the rest.
        ready.sort_unstable_by(|a, b| b.cmp(a));
        for index in ready {
            pending.swap_remove(index);
        }

        pending.is_empty()
    }

    /// Poll until every component has reported ready or `deadline`
    /// elapses (`None` = wait indefinitely). Expiry is a clean `false`,
    /// not an error.
    pub async fn await_ready(&self, deadline: Option<Duration>) -> bool {
        await_predicate(|| self.is_ready(), deadline, self.polling_interval).await
    }

    /// Gate, then delegate: fail fast with
    /// [`ExperimentError::EnvironmentNotReady`] if readiness is not
    /// reached within the configured timeout, otherwise run the
    /// experiment.
    pub async fn run<E: Experiment>(&self, experiment: &mut E) -> Result<(), ExperimentError> {
        if !self.await_ready(self.readiness_timeout).await {
            let waited = self
                .readiness_timeout
                .map(DurationMs::from)
                .unwrap_or_default();
            return Err(ExperimentError::EnvironmentNotReady(waited));
        }
        experiment.run().await
    }

    /// Attach this environment to an experiment: the returned wrapper's
    /// `run` gates on readiness first, without the inner experiment
    /// knowing anything about it. Clone the `Arc` to bind the same
    /// environment around several experiments.
    pub fn bind<E: Experiment>(self: Arc<Self>, experiment: E) -> BoundExperiment<E> {
        BoundExperiment {
            environment: self,
            inner: experiment,
        }
    }
}

/// An experiment bound to the environment it depends on. See
/// [`ExperimentEnvironment::bind`].
pub struct BoundExperiment<E> {
    environment: Arc<ExperimentEnvironment>,
    inner: E,
}

impl<E> BoundExperiment<E> {
    /// The wrapped experiment.
    pub fn inner(&self) -> &E {
        &self.inner
    }

    /// Unwrap the experiment.
    pub fn into_inner(self) -> E {
        self.inner
    }
}

#[async_trait]
impl<E: Experiment> Experiment for BoundExperiment<E> {
    fn experiment_id(&self) -> Option<&ExperimentId> {
        self.inner.experiment_id()
    }

    async fn run(&mut self) -> Result<(), ExperimentError> {
        self.environment.run(&mut self.inner).await
    }
}
