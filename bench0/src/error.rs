//! Error types for each protocol.

use crate::duration::DurationMs;
use crate::id::BatchId;
use std::fmt;
use thiserror::Error;

/// Errors raised by a [`Node`](crate::node::Node) or
/// [`DownloadHandle`](crate::node::DownloadHandle) implementation.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum NodeError {
    /// A request to the peer failed (transport, RPC, or agent error).
    #[error("request to node failed: {0}")]
    Request(String),

    /// The peer did not answer within its own internal deadline.
    #[error("node operation timed out after {0}")]
    Timeout(DurationMs),

    /// Catch-all for backend-specific causes. Include context.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// One failed unit of concurrent work inside an experiment stage.
///
/// Fan-out stages collect every failure, so errors always name the node
/// they came from — essential for diagnosing partial-network failures.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StageFailure {
    /// A node operation failed.
    #[error("node {node}: {source}")]
    Node {
        /// Name of the node whose operation failed.
        node: String,
        /// The underlying node error.
        source: NodeError,
    },

    /// A download reached its deadline without completing.
    #[error("download {index} on node {node} did not complete")]
    Incomplete {
        /// Submission index of the download within its stage.
        index: usize,
        /// Name of the downloading node.
        node: String,
    },

    /// A worker task panicked instead of returning a result.
    #[error("worker panicked: {0}")]
    Panic(String),
}

impl From<tokio::task::JoinError> for StageFailure {
    fn from(join: tokio::task::JoinError) -> Self {
        StageFailure::Panic(join.to_string())
    }
}

/// The outcome of fanning work out and insisting on hearing back from
/// every unit: one value carrying the failure of each non-cancelled unit
/// that failed.
///
/// Callers must be able to inspect each underlying failure, so the list is
/// exposed and `Display` enumerates every entry, not just the first.
#[derive(Debug)]
pub struct Aggregate<E> {
    failures: Vec<E>,
}

impl<E> Aggregate<E> {
    /// Wrap a non-empty list of failures.
    pub fn new(failures: Vec<E>) -> Self {
        Self { failures }
    }

    /// Number of underlying failures.
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Whether there are no underlying failures. Fan-out never constructs
    /// an empty aggregate; this exists for completeness.
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Iterate over the underlying failures.
    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.failures.iter()
    }

    /// Consume the aggregate, yielding the underlying failures.
    pub fn into_failures(self) -> Vec<E> {
        self.failures
    }
}

impl<E: fmt::Display> fmt::Display for Aggregate<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} operation(s) failed", self.failures.len())?;
        for (i, failure) in self.failures.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{failure}")?;
        }
        Ok(())
    }
}

impl<E> std::error::Error for Aggregate<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.failures
            .first()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Orchestration errors.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ExperimentError {
    /// The experiment was constructed with invalid parameters (e.g. an
    /// empty seeder set). Fatal, surfaced immediately, never retried.
    #[error("invalid experiment configuration: {0}")]
    Config(String),

    /// The environment's components did not all become ready in time.
    #[error("environment not ready after {0}")]
    EnvironmentNotReady(DurationMs),

    /// One or more concurrent operations within a stage failed.
    #[error("stage {stage} failed: {failures}")]
    Stage {
        /// Name of the failed stage.
        stage: String,
        /// Every underlying failure, one per failed unit of work.
        failures: Aggregate<StageFailure>,
    },

    /// One or more repetitions of an iterated experiment failed.
    #[error("batch {batch}: {failed} run(s) failed, {succeeded} succeeded")]
    Batch {
        /// Identifier of the batch.
        batch: BatchId,
        /// Repetitions that completed normally.
        succeeded: u32,
        /// Repetitions that failed.
        failed: u32,
    },

    /// An invariant the engine relies on was broken. Include context.
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_display_enumerates_every_failure() {
        let aggregate = Aggregate::new(vec![
            StageFailure::Node {
                node: "node-1".into(),
                source: NodeError::Request("connection refused".into()),
            },
            StageFailure::Incomplete {
                index: 4,
                node: "node-5".into(),
            },
        ]);

        let rendered = aggregate.to_string();
        assert!(rendered.starts_with("2 operation(s) failed"));
        assert!(rendered.contains("node node-1: request to node failed: connection refused"));
        assert!(rendered.contains("download 4 on node node-5 did not complete"));
    }

    #[test]
    fn aggregate_failures_are_individually_inspectable() {
        let aggregate = Aggregate::new(vec![
            StageFailure::Panic("boom".into()),
            StageFailure::Panic("bang".into()),
            StageFailure::Panic("pow".into()),
        ]);

        assert_eq!(aggregate.len(), 3);
        let messages: Vec<String> = aggregate.iter().map(|f| f.to_string()).collect();
        assert_eq!(
            messages,
            vec![
                "worker panicked: boom",
                "worker panicked: bang",
                "worker panicked: pow"
            ]
        );
    }

    #[test]
    fn stage_error_names_the_stage() {
        let err = ExperimentError::Stage {
            stage: "leeching".into(),
            failures: Aggregate::new(vec![StageFailure::Node {
                node: "node-0".into(),
                source: NodeError::Request("no route".into()),
            }]),
        };
        assert!(err.to_string().starts_with("stage leeching failed"));
    }
}
