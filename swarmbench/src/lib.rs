#![deny(missing_docs)]
//! # swarmbench — umbrella crate
//!
//! Provides a single import surface for the swarmbench workspace.
//! Re-exports the protocol crate and the implementation crates behind
//! feature flags, plus a `prelude` for the happy path.

#[cfg(feature = "core")]
pub use bench0;
#[cfg(feature = "experiments")]
pub use swarmbench_experiments;
#[cfg(feature = "sync")]
pub use swarmbench_sync;

/// Happy-path imports for composing dissemination benchmarks.
pub mod prelude {
    #[cfg(feature = "core")]
    pub use bench0::{
        BatchId, BenchEvent, Boundary, DownloadHandle, DurationMs, EventSink, Experiment,
        ExperimentComponent, ExperimentError, ExperimentId, ExperimentWithLifecycle, NodeError,
        NullSink, Node, StageFailure,
    };

    #[cfg(feature = "sync")]
    pub use swarmbench_sync::{await_predicate, collect, merge, Aggregate, WorkerPool};

    #[cfg(feature = "experiments")]
    pub use swarmbench_experiments::{
        ExperimentEnvironment, IteratedExperiment, StaticDisseminationExperiment, TracingSink,
    };
}
