//! StaticDisseminationExperiment — one seed → leech → download → teardown
//! cycle over a fixed seeder set.

use crate::stage::{stage, TracingSink};
use async_trait::async_trait;
use bench0::error::{Aggregate, ExperimentError, StageFailure};
use bench0::event::{BenchEvent, Boundary, EventSink, RequestEvent};
use bench0::experiment::{run_with_lifecycle, Experiment, ExperimentWithLifecycle};
use bench0::id::ExperimentId;
use bench0::node::{DownloadHandle, Node};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use swarmbench_sync::{collect, WorkerPool};

/// The name the engine reports itself as on request events.
const RUNNER: &str = "runner";

fn emit_request(
    sink: &dyn EventSink,
    destination: &str,
    operation: &str,
    request_id: &str,
    boundary: Boundary,
) {
    sink.emit(BenchEvent::Request(RequestEvent {
        node: RUNNER.to_owned(),
        destination: destination.to_owned(),
        operation: operation.to_owned(),
        request_id: request_id.to_owned(),
        boundary,
    }));
}

/// One repetition of a dissemination experiment: the seeder nodes ingest
/// a freshly generated dataset, every other node downloads it, and
/// teardown removes it from the whole network.
///
/// Instances are single-use — the run handle and the worker pool live
/// exactly one repetition.
pub struct StaticDisseminationExperiment<N: Node> {
    nodes: Vec<Arc<N>>,
    seeders: Vec<usize>,
    meta: N::Meta,
    file_size: u64,
    seed: u64,
    logging_cooldown: Duration,
    id: ExperimentId,
    pool: WorkerPool,
    handle: OnceLock<N::Handle>,
    sink: Arc<dyn EventSink>,
}

impl<N: Node> std::fmt::Debug for StaticDisseminationExperiment<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticDisseminationExperiment")
            .field("id", &self.id)
            .field("seeders", &self.seeders)
            .field("file_size", &self.file_size)
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

impl<N: Node> StaticDisseminationExperiment<N> {
    /// Create an experiment over `nodes` where the nodes at the `seeders`
    /// indices seed a dataset generated from `(file_size, seed, meta)`
    /// and every other node leeches it.
    ///
    /// The worker pool is sized to one worker per leecher (at least one);
    /// use [`with_concurrency`](Self::with_concurrency) to throttle.
    pub fn new(
        nodes: Vec<Arc<N>>,
        seeders: Vec<usize>,
        meta: N::Meta,
        file_size: u64,
        seed: u64,
    ) -> Result<Self, ExperimentError> {
        if seeders.is_empty() {
            return Err(ExperimentError::Config(
                "at least one seeder is required".into(),
            ));
        }
        if let Some(&out_of_range) = seeders.iter().find(|&&index| index >= nodes.len()) {
            return Err(ExperimentError::Config(format!(
                "seeder index {out_of_range} out of range for a network of {} nodes",
                nodes.len()
            )));
        }
        let mut unique = seeders.clone();
        unique.sort_unstable();
        unique.dedup();
        if unique.len() != seeders.len() {
            return Err(ExperimentError::Config(
                "seeder indices must be unique".into(),
            ));
        }

        let workers = nodes.len().saturating_sub(seeders.len()).max(1);
        Ok(Self {
            nodes,
            seeders,
            meta,
            file_size,
            seed,
            logging_cooldown: Duration::ZERO,
            id: ExperimentId::from("unnamed"),
            pool: WorkerPool::new(workers),
            handle: OnceLock::new(),
            sink: Arc::new(TracingSink),
        })
    }

    /// Set the id that correlates this run's events.
    pub fn with_experiment_id(mut self, id: impl Into<ExperimentId>) -> Self {
        self.id = id.into();
        self
    }

    /// Throttle the worker pool to `workers` instead of one per leecher.
    pub fn with_concurrency(mut self, workers: usize) -> Self {
        self.pool = WorkerPool::new(workers);
        self
    }

    /// Sleep this long after downloads finish, giving nodes a chance to
    /// flush their own telemetry before teardown removes their state.
    pub fn with_logging_cooldown(mut self, cooldown: Duration) -> Self {
        self.logging_cooldown = cooldown;
        self
    }

    /// Send events somewhere other than the tracing pipeline.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// The worker pool's concurrency bound.
    pub fn concurrency(&self) -> usize {
        self.pool.workers()
    }

    fn split(&self) -> (Vec<(usize, Arc<N>)>, Vec<(usize, Arc<N>)>) {
        let seeders = self
            .seeders
            .iter()
            .map(|&index| (index, Arc::clone(&self.nodes[index])))
            .collect();
        let leechers = (0..self.nodes.len())
            .filter(|index| !self.seeders.contains(index))
            .map(|index| (index, Arc::clone(&self.nodes[index])))
            .collect();
        (seeders, leechers)
    }
}

#[async_trait]
impl<N: Node> Experiment for StaticDisseminationExperiment<N> {
    fn experiment_id(&self) -> Option<&ExperimentId> {
        Some(&self.id)
    }

    async fn run(&mut self) -> Result<(), ExperimentError> {
        run_with_lifecycle(self).await
    }
}

#[async_trait]
impl<N: Node> ExperimentWithLifecycle for StaticDisseminationExperiment<N> {
    async fn do_run(&mut self) -> Result<(), ExperimentError> {
        if self.handle.get().is_some() {
            return Err(ExperimentError::Config(
                "dissemination experiments are single-use".into(),
            ));
        }

        let (seeders, leechers) = self.split();
        let request_id = self.meta.to_string();

        tracing::info!(
            experiment = %self.id,
            seeders = seeders.len(),
            leechers = leechers.len(),
            "running dissemination experiment"
        );

        let handle = stage(self.sink.as_ref(), &self.id, "seeding", async {
            let mut last = None;
            for (_, node) in &seeders {
                emit_request(
                    self.sink.as_ref(),
                    node.name(),
                    "genseed",
                    &request_id,
                    Boundary::Start,
                );
                let handle = node
                    .genseed(self.file_size, self.seed, &self.meta)
                    .await
                    .map_err(|source| ExperimentError::Stage {
                        stage: "seeding".into(),
                        failures: Aggregate::new(vec![StageFailure::Node {
                            node: node.name().to_owned(),
                            source,
                        }]),
                    })?;
                emit_request(
                    self.sink.as_ref(),
                    node.name(),
                    "genseed",
                    &request_id,
                    Boundary::End,
                );
                last = Some(handle);
            }
            // Unreachable given the non-empty seeder set enforced at
            // construction; kept total rather than asserted.
            last.ok_or_else(|| {
                ExperimentError::Internal("no seeder produced a network handle".into())
            })
        })
        .await?;

        if self.handle.set(handle.clone()).is_err() {
            return Err(ExperimentError::Internal(
                "run handle was already set".into(),
            ));
        }

        let downloads = stage(self.sink.as_ref(), &self.id, "leeching", async {
            tracing::info!(leechers = leechers.len(), "setting up leechers");

            let mut submissions = Vec::with_capacity(leechers.len());
            for (index, node) in &leechers {
                let index = *index;
                let node = Arc::clone(node);
                let handle = handle.clone();
                let sink = Arc::clone(&self.sink);
                let request_id = request_id.clone();
                submissions.push(self.pool.spawn(async move {
                    emit_request(sink.as_ref(), node.name(), "leech", &request_id, Boundary::Start);
                    let download =
                        node.leech(&handle)
                            .await
                            .map_err(|source| StageFailure::Node {
                                node: node.name().to_owned(),
                                source,
                            })?;
                    emit_request(sink.as_ref(), node.name(), "leech", &request_id, Boundary::End);
                    Ok::<_, StageFailure>((index, download))
                }));
            }
            collect(submissions).await.map_err(|failures| ExperimentError::Stage {
                stage: "leeching".into(),
                failures,
            })
        })
        .await?;

        stage(self.sink.as_ref(), &self.id, "downloading", async {
            let total = downloads.len();
            let mut awaits = Vec::with_capacity(total);
            for (index, download) in downloads {
                awaits.push(self.pool.spawn(async move {
                    let completed = download
                        .await_for_completion(None)
                        .await
                        .map_err(|source| StageFailure::Node {
                            node: download.node_name().to_owned(),
                            source,
                        })?;
                    if !completed {
                        return Err(StageFailure::Incomplete {
                            index,
                            node: download.node_name().to_owned(),
                        });
                    }
                    tracing::info!(node = download.node_name(), total, "download completed");
                    Ok(())
                }));
            }
            collect(awaits)
                .await
                .map(|_| ())
                .map_err(|failures| ExperimentError::Stage {
                    stage: "downloading".into(),
                    failures,
                })
        })
        .await?;

        stage(self.sink.as_ref(), &self.id, "log_cooldown", async {
            tokio::time::sleep(self.logging_cooldown).await;
            Ok(())
        })
        .await
    }

    async fn teardown(&mut self, _failure: Option<&ExperimentError>) -> Result<(), ExperimentError> {
        tracing::info!(experiment = %self.id, "tearing down experiment");

        let result = stage(self.sink.as_ref(), &self.id, "deleting", async {
            // A run that never seeded has nothing to remove.
            let Some(handle) = self.handle.get() else {
                return Ok(());
            };
            let request_id = self.meta.to_string();

            let mut removals = Vec::with_capacity(self.nodes.len());
            for node in &self.nodes {
                let node = Arc::clone(node);
                let handle = handle.clone();
                let sink = Arc::clone(&self.sink);
                let request_id = request_id.clone();
                removals.push(self.pool.spawn(async move {
                    emit_request(sink.as_ref(), node.name(), "remove", &request_id, Boundary::Start);
                    // When the body failed, some removes are expected to
                    // fail too; they are still collected and surfaced.
                    node.remove(&handle)
                        .await
                        .map_err(|source| StageFailure::Node {
                            node: node.name().to_owned(),
                            source,
                        })?;
                    emit_request(sink.as_ref(), node.name(), "remove", &request_id, Boundary::End);
                    Ok::<_, StageFailure>(())
                }));
            }
            collect(removals)
                .await
                .map(|_| ())
                .map_err(|failures| ExperimentError::Stage {
                    stage: "deleting".into(),
                    failures,
                })
        })
        .await;

        // The pool drains fully even when removal failed.
        self.pool.shutdown().await;
        result
    }
}
