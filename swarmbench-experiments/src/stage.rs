//! Stage event emission and the default tracing-backed sink.

use bench0::error::ExperimentError;
use bench0::event::{BenchEvent, Boundary, EventSink, StageEvent};
use bench0::id::ExperimentId;
use std::future::Future;

/// Run `body` between a start/end [`StageEvent`] pair. The end event
/// carries the error text when the body fails; the error itself still
/// propagates to the caller.
pub(crate) async fn stage<T, F>(
    sink: &dyn EventSink,
    experiment: &ExperimentId,
    name: &str,
    body: F,
) -> Result<T, ExperimentError>
where
    F: Future<Output = Result<T, ExperimentError>>,
{
    sink.emit(BenchEvent::Stage(StageEvent {
        experiment: experiment.clone(),
        stage: name.to_owned(),
        boundary: Boundary::Start,
        error: None,
    }));

    let outcome = body.await;

    sink.emit(BenchEvent::Stage(StageEvent {
        experiment: experiment.clone(),
        stage: name.to_owned(),
        boundary: Boundary::End,
        error: outcome.as_ref().err().map(|e| e.to_string()),
    }));

    outcome
}

/// The default sink: events become JSON lines on the `tracing` pipeline,
/// under the `swarmbench::events` target, where whatever subscriber the
/// host process installed can pick them up.
#[derive(Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: BenchEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => tracing::info!(target: "swarmbench::events", event = %json),
            Err(error) => tracing::warn!(%error, "failed to serialize experiment event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bench0::test_utils::RecordingSink;

    #[tokio::test]
    async fn stage_brackets_the_body_with_events() {
        let sink = RecordingSink::new();
        let id = ExperimentId::from("exp");

        let value = stage(&sink, &id, "seeding", async { Ok(42) }).await.unwrap();
        assert_eq!(value, 42);

        let stages = sink.stages();
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0].boundary, Boundary::Start);
        assert_eq!(stages[1].boundary, Boundary::End);
        assert_eq!(stages[1].error, None);
        assert!(stages.iter().all(|s| s.stage == "seeding"));
    }

    #[tokio::test]
    async fn failed_stage_ends_with_error_text() {
        let sink = RecordingSink::new();
        let id = ExperimentId::from("exp");

        let err = stage::<(), _>(&sink, &id, "leeching", async {
            Err(ExperimentError::Internal("it broke".into()))
        })
        .await
        .unwrap_err();
        assert!(err.to_string().contains("it broke"));

        let stages = sink.stages();
        assert_eq!(stages[1].boundary, Boundary::End);
        assert_eq!(stages[1].error.as_deref(), Some("internal error: it broke"));
    }
}
