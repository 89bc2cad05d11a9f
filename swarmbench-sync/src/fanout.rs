//! All-or-nothing fan-out: wait for everything, report every failure.

use bench0::error::Aggregate;
use tokio::task::{JoinError, JoinHandle};

/// Await every handle and either return all results or every failure.
///
/// Each handle is driven to a terminal state regardless of its siblings —
/// there is no short-circuiting. Cancelled tasks are vacuously successful
/// and contribute no result; panicked tasks contribute a failure via
/// `E::from`; `Err` results are gathered as-is. If any failures exist the
/// whole call fails with one [`Aggregate`] carrying the full list;
/// otherwise the successes come back in submission order.
///
/// This is the mechanism by which the orchestration tolerates individual
/// nodes misbehaving without masking the fact that something failed.
pub async fn collect<T, E>(handles: Vec<JoinHandle<Result<T, E>>>) -> Result<Vec<T>, Aggregate<E>>
where
    E: From<JoinError>,
{
    let mut results = Vec::with_capacity(handles.len());
    let mut failures = Vec::new();

    for handle in handles {
        match handle.await {
            Ok(Ok(value)) => results.push(value),
            Ok(Err(failure)) => failures.push(failure),
            Err(join) if join.is_cancelled() => {}
            Err(join) => failures.push(E::from(join)),
        }
    }

    if failures.is_empty() {
        Ok(results)
    } else {
        Err(Aggregate::new(failures))
    }
}
