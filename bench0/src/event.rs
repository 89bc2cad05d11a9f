//! Structured experiment events — the vocabulary the engine emits.
//!
//! These are NOT a logging framework — they're a shared vocabulary. The
//! engine hands each event to an [`EventSink`]; what the sink does with it
//! (JSON lines through `tracing`, an in-memory buffer, a socket) is its
//! own business, and the parsing/splitting pipeline that later consumes
//! stored events lives entirely outside this workspace.
//!
//! Events deliberately carry no wall-clock timestamp: stamping is the
//! sink's job, which keeps the vocabulary deterministic for tests.

use crate::duration::DurationMs;
use crate::id::{BatchId, ExperimentId};
use serde::{Deserialize, Serialize};

/// Whether an event marks the start or the end of the thing it describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Boundary {
    /// The operation or stage is about to run.
    Start,
    /// The operation or stage has finished (successfully or not).
    End,
}

/// One side of a request/response pair for a single node operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestEvent {
    /// Who issued the operation. The orchestration engine always reports
    /// itself as `"runner"`.
    pub node: String,
    /// Name of the node the operation was issued against.
    pub destination: String,
    /// Operation name (`genseed`, `leech`, `remove`).
    pub operation: String,
    /// Correlation id shared by the start/end pair.
    pub request_id: String,
    /// Which side of the pair this is.
    pub boundary: Boundary,
}

/// One side of a start/end pair for a dissemination stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageEvent {
    /// The experiment run this stage belongs to.
    pub experiment: ExperimentId,
    /// Stage name (`seeding`, `leeching`, `downloading`, `log_cooldown`,
    /// `deleting`).
    pub stage: String,
    /// Which side of the pair this is.
    pub boundary: Boundary,
    /// Error text, present only on the `End` side of a failed stage.
    pub error: Option<String>,
}

/// Status record for one repetition of an iterated experiment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatusEvent {
    /// The batch this repetition belongs to.
    pub batch: BatchId,
    /// Zero-based repetition index.
    pub repetition: usize,
    /// Wall-clock duration of the repetition.
    pub duration: DurationMs,
    /// Error text when the repetition failed.
    pub error: Option<String>,
}

/// Every event the engine can emit.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BenchEvent {
    /// A node operation boundary.
    Request(RequestEvent),
    /// A dissemination stage boundary.
    Stage(StageEvent),
    /// A repetition status record.
    RunStatus(RunStatusEvent),
}

/// Where the engine sends its events.
///
/// Implementations must be cheap and non-blocking from the caller's point
/// of view; the engine emits from inside concurrent stage workers.
pub trait EventSink: Send + Sync {
    /// Accept one event. Failures are the sink's problem — emission is
    /// fire-and-forget from the engine's side.
    fn emit(&self, event: BenchEvent);
}

/// A sink that discards every event.
#[derive(Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: BenchEvent) {}
}
