//! Experiment orchestration for swarmbench.
//!
//! This crate turns the bench0 protocol traits and the swarmbench-sync
//! kernel into runnable experiments:
//!
//! - [`ExperimentEnvironment`] — gates an experiment on the readiness of
//!   its external components, polling a bounded random sample per round.
//! - [`StaticDisseminationExperiment`] — one seed → leech → download →
//!   teardown cycle over a fixed seeder set.
//! - [`IteratedExperiment`] — repeats experiments and keeps score.
//!
//! A caller builds a network of [`Node`](bench0::Node) handles, wraps a
//! dissemination experiment with an environment via
//! [`ExperimentEnvironment::bind`], and hands the result to an iterated
//! experiment. Events flow to an [`EventSink`](bench0::EventSink) —
//! [`TracingSink`] by default.

#![deny(missing_docs)]

pub mod dissemination;
pub mod environment;
pub mod iterated;
mod stage;

pub use dissemination::StaticDisseminationExperiment;
pub use environment::{BoundExperiment, ExperimentEnvironment};
pub use iterated::IteratedExperiment;
pub use stage::TracingSink;
