//! WorkerPool — a bounded task spawner with drain-aware shutdown.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinHandle;

#[derive(Debug, Default)]
struct Drain {
    outstanding: AtomicUsize,
    drained: Notify,
}

struct DrainGuard {
    drain: Arc<Drain>,
}

impl Drop for DrainGuard {
    fn drop(&mut self) {
        if self.drain.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.drain.drained.notify_waiters();
        }
    }
}

/// A bounded pool of concurrent tasks on the tokio runtime.
///
/// At most `workers` submitted futures run at any moment; the rest queue
/// on a semaphore. The pool is exclusively owned by the experiment run
/// that created it and is never shared across runs.
#[derive(Debug)]
pub struct WorkerPool {
    workers: usize,
    permits: Arc<Semaphore>,
    drain: Arc<Drain>,
}

impl WorkerPool {
    /// Create a pool running at most `workers` tasks concurrently.
    /// A zero worker count is treated as one.
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            workers,
            permits: Arc::new(Semaphore::new(workers)),
            drain: Arc::new(Drain::default()),
        }
    }

    /// The concurrency bound this pool was created with.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Submit a future. It starts once a permit is available; the returned
    /// handle behaves like a plain `tokio::spawn` handle.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.drain.outstanding.fetch_add(1, Ordering::AcqRel);
        let guard = DrainGuard {
            drain: Arc::clone(&self.drain),
        };
        let permits = Arc::clone(&self.permits);
        tokio::spawn(async move {
            let _guard = guard;
            // The pool never closes its semaphore, so acquisition cannot fail.
            let _permit = permits.acquire_owned().await.ok();
            future.await
        })
    }

    /// Wait until every submitted task has reached a terminal state
    /// (completed, failed, or cancelled).
    pub async fn shutdown(&self) {
        loop {
            let drained = self.drain.drained.notified();
            if self.drain.outstanding.load(Ordering::Acquire) == 0 {
                break;
            }
            drained.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    #[tokio::test]
    async fn runs_at_most_workers_tasks_concurrently() {
        let pool = WorkerPool::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let high_water = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let running = Arc::clone(&running);
                let high_water = Arc::clone(&high_water);
                pool.spawn(async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    high_water.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        assert!(high_water.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn shutdown_waits_for_every_task_to_finish() {
        let pool = WorkerPool::new(4);
        let finished = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&finished);
        pool.spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            flag.store(true, Ordering::SeqCst);
        });

        pool.shutdown().await;
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn shutdown_counts_cancelled_tasks_as_terminal() {
        let pool = WorkerPool::new(1);

        let handle = pool.spawn(async {
            std::future::pending::<()>().await;
        });
        handle.abort();

        pool.shutdown().await;
    }
}
