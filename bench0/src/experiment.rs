//! The Experiment protocol — one measured unit of work, with or without a
//! managed lifecycle.

use crate::error::ExperimentError;
use crate::id::ExperimentId;
use async_trait::async_trait;

/// An `Experiment` is an arbitrary piece of work that can be run and
/// measured. `run` drives it to completion, blocking the caller until it
/// is done.
#[async_trait]
pub trait Experiment: Send + Sync {
    /// Identifier used to correlate this run's events, if it has one.
    fn experiment_id(&self) -> Option<&ExperimentId> {
        None
    }

    /// Run the experiment to completion.
    async fn run(&mut self) -> Result<(), ExperimentError>;
}

/// An experiment with a managed setup → body → teardown lifecycle.
///
/// Implementors provide [`do_run`](ExperimentWithLifecycle::do_run) and
/// implement [`Experiment::run`] by delegating to [`run_with_lifecycle`],
/// which guarantees `teardown` is invoked exactly once per run, whatever
/// the body does. This is how resources with a one-run lifetime (worker
/// pools, swarm membership) are released even on partial failure.
#[async_trait]
pub trait ExperimentWithLifecycle: Send + Sync {
    /// Acquire resources before the body runs. Defaults to a no-op.
    async fn setup(&mut self) -> Result<(), ExperimentError> {
        Ok(())
    }

    /// The body of the experiment.
    async fn do_run(&mut self) -> Result<(), ExperimentError>;

    /// Release resources. Runs exactly once per [`run_with_lifecycle`]
    /// call; `failure` carries the setup/body error when there was one.
    /// Defaults to a no-op.
    async fn teardown(&mut self, failure: Option<&ExperimentError>) -> Result<(), ExperimentError> {
        let _ = failure;
        Ok(())
    }
}

/// Drive a lifecycle experiment: setup, body, then teardown — the last
/// exactly once, whatever the first two did.
///
/// On a clean body, a teardown failure is the run's failure. When the
/// body (or setup) fails, that error is what the caller sees; a teardown
/// failure on this path remains observable through stage events.
pub async fn run_with_lifecycle<T>(experiment: &mut T) -> Result<(), ExperimentError>
where
    T: ExperimentWithLifecycle + ?Sized,
{
    let outcome = match experiment.setup().await {
        Ok(()) => experiment.do_run().await,
        Err(setup_error) => Err(setup_error),
    };

    match outcome {
        Ok(()) => experiment.teardown(None).await,
        Err(body_error) => {
            let _ = experiment.teardown(Some(&body_error)).await;
            Err(body_error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Scripted {
        fail_setup: bool,
        fail_body: bool,
        fail_teardown: bool,
        calls: Vec<&'static str>,
        teardown_saw_failure: Option<bool>,
    }

    #[async_trait]
    impl ExperimentWithLifecycle for Scripted {
        async fn setup(&mut self) -> Result<(), ExperimentError> {
            self.calls.push("setup");
            if self.fail_setup {
                return Err(ExperimentError::Internal("setup failed".into()));
            }
            Ok(())
        }

        async fn do_run(&mut self) -> Result<(), ExperimentError> {
            self.calls.push("do_run");
            if self.fail_body {
                return Err(ExperimentError::Internal("body failed".into()));
            }
            Ok(())
        }

        async fn teardown(
            &mut self,
            failure: Option<&ExperimentError>,
        ) -> Result<(), ExperimentError> {
            self.calls.push("teardown");
            self.teardown_saw_failure = Some(failure.is_some());
            if self.fail_teardown {
                return Err(ExperimentError::Internal("teardown failed".into()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn lifecycle_runs_in_order_on_success() {
        let mut experiment = Scripted::default();
        run_with_lifecycle(&mut experiment).await.unwrap();

        assert_eq!(experiment.calls, vec!["setup", "do_run", "teardown"]);
        assert_eq!(experiment.teardown_saw_failure, Some(false));
    }

    #[tokio::test]
    async fn teardown_runs_when_the_body_fails() {
        let mut experiment = Scripted {
            fail_body: true,
            ..Scripted::default()
        };

        let err = run_with_lifecycle(&mut experiment).await.unwrap_err();
        assert!(err.to_string().contains("body failed"));
        assert_eq!(experiment.calls, vec!["setup", "do_run", "teardown"]);
        assert_eq!(experiment.teardown_saw_failure, Some(true));
    }

    #[tokio::test]
    async fn setup_failure_skips_the_body_but_not_teardown() {
        let mut experiment = Scripted {
            fail_setup: true,
            ..Scripted::default()
        };

        let err = run_with_lifecycle(&mut experiment).await.unwrap_err();
        assert!(err.to_string().contains("setup failed"));
        assert_eq!(experiment.calls, vec!["setup", "teardown"]);
    }

    #[tokio::test]
    async fn teardown_failure_surfaces_after_a_clean_body() {
        let mut experiment = Scripted {
            fail_teardown: true,
            ..Scripted::default()
        };

        let err = run_with_lifecycle(&mut experiment).await.unwrap_err();
        assert!(err.to_string().contains("teardown failed"));
    }

    #[tokio::test]
    async fn body_error_wins_over_teardown_error() {
        let mut experiment = Scripted {
            fail_body: true,
            fail_teardown: true,
            ..Scripted::default()
        };

        let err = run_with_lifecycle(&mut experiment).await.unwrap_err();
        assert!(err.to_string().contains("body failed"));
        assert_eq!(experiment.calls, vec!["setup", "do_run", "teardown"]);
    }
}
