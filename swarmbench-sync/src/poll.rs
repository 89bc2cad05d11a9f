//! Bounded polling of an async predicate.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Evaluate `predicate` until it returns true or `deadline` elapses,
/// sleeping `interval` between attempts.
///
/// `deadline` of `None` polls indefinitely — callers must not rely on the
/// function returning unless the predicate is guaranteed to eventually
/// become true. Returns `true` iff the predicate became true before the
/// deadline. A false predicate is never an error; panics inside the
/// predicate propagate to the caller.
///
/// The predicate is always evaluated at least once, even with a zero
/// deadline.
pub async fn await_predicate<F, Fut>(
    mut predicate: F,
    deadline: Option<Duration>,
    interval: Duration,
) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let started = Instant::now();
    loop {
        if deadline.is_some_and(|limit| started.elapsed() > limit) {
            return false;
        }
        if predicate().await {
            return true;
        }
        tokio::time::sleep(interval).await;
    }
}
