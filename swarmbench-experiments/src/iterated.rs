//! IteratedExperiment — run a sequence of experiments and keep score.

use crate::stage::TracingSink;
use async_trait::async_trait;
use bench0::duration::DurationMs;
use bench0::error::ExperimentError;
use bench0::event::{BenchEvent, EventSink, RunStatusEvent};
use bench0::experiment::Experiment;
use bench0::id::BatchId;
use std::sync::Arc;
use tokio::time::Instant;

/// Runs a lazily-produced sequence of experiments, one after the other.
///
/// A repetition's failure is logged and recorded, never rethrown
/// per-iteration — one bad run cannot abort the rest of the batch. After
/// the sequence is exhausted, the driver raises a single batch-level
/// error iff any repetition failed and raising is enabled (the default);
/// either way [`successful_runs`](Self::successful_runs) and
/// [`failed_runs`](Self::failed_runs) remain as the record of outcome.
pub struct IteratedExperiment<E> {
    experiments: Box<dyn Iterator<Item = E> + Send + Sync>,
    batch: BatchId,
    raise_when_failures: bool,
    successful_runs: u32,
    failed_runs: u32,
    sink: Arc<dyn EventSink>,
}

impl<E: Experiment + 'static> IteratedExperiment<E> {
    /// Create a driver over `experiments`, correlating its status events
    /// under `batch`.
    pub fn new<I>(experiments: I, batch: impl Into<BatchId>) -> Self
    where
        I: IntoIterator<Item = E>,
        I::IntoIter: Send + Sync + 'static,
    {
        Self {
            experiments: Box::new(experiments.into_iter()),
            batch: batch.into(),
            raise_when_failures: true,
            successful_runs: 0,
            failed_runs: 0,
            sink: Arc::new(TracingSink),
        }
    }

    /// Whether a failed repetition fails the whole batch after all
    /// repetitions have run. Defaults to `true`.
    pub fn with_raise_when_failures(mut self, raise_when_failures: bool) -> Self {
        self.raise_when_failures = raise_when_failures;
        self
    }

    /// Send status events somewhere other than the tracing pipeline.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Repetitions that completed normally so far.
    pub fn successful_runs(&self) -> u32 {
        self.successful_runs
    }

    /// Repetitions that failed so far.
    pub fn failed_runs(&self) -> u32 {
        self.failed_runs
    }
}

#[async_trait]
impl<E: Experiment + 'static> Experiment for IteratedExperiment<E> {
    async fn run(&mut self) -> Result<(), ExperimentError> {
        let mut repetition = 0usize;
        while let Some(mut experiment) = self.experiments.next() {
            let started = Instant::now();
            let error = match experiment.run().await {
                Ok(()) => {
                    self.successful_runs += 1;
                    None
                }
                Err(error) => {
                    self.failed_runs += 1;
                    tracing::error!(
                        %error,
                        repetition,
                        batch = %self.batch,
                        "experiment repetition failed"
                    );
                    Some(error.to_string())
                }
            };
            self.sink.emit(BenchEvent::RunStatus(RunStatusEvent {
                batch: self.batch.clone(),
                repetition,
                duration: DurationMs::from(started.elapsed()),
                error,
            }));
            repetition += 1;
        }

        if self.failed_runs > 0 && self.raise_when_failures {
            return Err(ExperimentError::Batch {
                batch: self.batch.clone(),
                succeeded: self.successful_runs,
                failed: self.failed_runs,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bench0::test_utils::RecordingSink;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        fail: bool,
        runs: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Experiment for Scripted {
        async fn run(&mut self) -> Result<(), ExperimentError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ExperimentError::Internal("this repetition failed".into()));
            }
            Ok(())
        }
    }

    fn batch(runs: &Arc<AtomicUsize>, failures: [bool; 3]) -> Vec<Scripted> {
        failures
            .into_iter()
            .map(|fail| Scripted {
                fail,
                runs: Arc::clone(runs),
            })
            .collect()
    }

    #[tokio::test]
    async fn runs_every_repetition() {
        let runs = Arc::new(AtomicUsize::new(0));
        let sink = Arc::new(RecordingSink::new());
        let mut driver = IteratedExperiment::new(batch(&runs, [false, false, false]), "batch-a")
            .with_sink(Arc::clone(&sink) as Arc<dyn EventSink>);

        driver.run().await.unwrap();

        assert_eq!(driver.successful_runs(), 3);
        assert_eq!(driver.failed_runs(), 0);
        assert_eq!(runs.load(Ordering::SeqCst), 3);

        let statuses = sink.statuses();
        assert_eq!(statuses.len(), 3);
        assert!(statuses.iter().all(|s| s.error.is_none()));
        assert_eq!(
            statuses.iter().map(|s| s.repetition).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_the_batch() {
        let runs = Arc::new(AtomicUsize::new(0));
        let sink = Arc::new(RecordingSink::new());
        let mut driver = IteratedExperiment::new(batch(&runs, [false, true, false]), "batch-a")
            .with_raise_when_failures(false)
            .with_sink(Arc::clone(&sink) as Arc<dyn EventSink>);

        driver.run().await.unwrap();

        assert_eq!(driver.successful_runs(), 2);
        assert_eq!(driver.failed_runs(), 1);
        assert_eq!(runs.load(Ordering::SeqCst), 3);

        let statuses = sink.statuses();
        assert!(statuses[1].error.as_deref().unwrap().contains("this repetition failed"));
        assert!(statuses[0].error.is_none());
        assert!(statuses[2].error.is_none());
    }

    #[tokio::test]
    async fn raises_one_batch_error_after_all_repetitions() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut driver = IteratedExperiment::new(batch(&runs, [false, true, false]), "batch-a");

        let err = driver.run().await.unwrap_err();

        assert!(matches!(
            err,
            ExperimentError::Batch {
                succeeded: 2,
                failed: 1,
                ..
            }
        ));
        assert_eq!(driver.successful_runs(), 2);
        assert_eq!(driver.failed_runs(), 1);
        // The failing repetition did not stop the third run.
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }
}
