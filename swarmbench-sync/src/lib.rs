//! Concurrency kernel for the swarmbench orchestration engine.
//!
//! Three primitives, each with one job:
//!
//! - [`await_predicate`] — bounded polling of an async predicate.
//! - [`collect`] — all-or-nothing fan-out: wait for every submitted unit
//!   of work and either return all results or one [`Aggregate`] carrying
//!   every failure.
//! - [`merge`] — backpressured merge of independently-produced sequences
//!   into one drainable stream.
//!
//! Plus the [`WorkerPool`] they run on: a semaphore-bounded task spawner
//! whose lifetime equals one experiment run.
//!
//! These are the only places where the engine touches scheduling; the
//! experiment crates above express orchestration purely in terms of them.

#![deny(missing_docs)]

mod fanout;
mod merge;
mod poll;
mod pool;

pub use bench0::error::Aggregate;
pub use fanout::collect;
pub use merge::{merge, Merged};
pub use poll::await_predicate;
pub use pool::WorkerPool;
