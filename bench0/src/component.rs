//! The ExperimentComponent protocol — readiness of an external dependency.

use async_trait::async_trait;

/// Anything an experiment depends on that takes time to come up: a node, a
/// tracker, a metrics collector.
///
/// Components have no ownership relation to the experiment — the readiness
/// gate only polls them.
#[async_trait]
pub trait ExperimentComponent: Send + Sync {
    /// Whether this component is ready to take part in an experiment.
    ///
    /// Must be side-effect-free and safe to call repeatedly, including
    /// concurrently with other polls.
    async fn is_ready(&self) -> bool;
}
