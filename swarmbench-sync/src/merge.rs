//! Backpressured merge of independently-produced sequences.

use crate::fanout::collect;
use bench0::error::Aggregate;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinError, JoinHandle};

enum Envelope<T> {
    Item(T),
    Done,
}

enum QueueTx<T> {
    Bounded(mpsc::Sender<Envelope<T>>),
    Unbounded(mpsc::UnboundedSender<Envelope<T>>),
}

impl<T> Clone for QueueTx<T> {
    fn clone(&self) -> Self {
        match self {
            QueueTx::Bounded(tx) => QueueTx::Bounded(tx.clone()),
            QueueTx::Unbounded(tx) => QueueTx::Unbounded(tx.clone()),
        }
    }
}

impl<T> QueueTx<T> {
    /// Send from a blocking worker. Fails only when the consumer is gone.
    fn blocking_send(&self, envelope: Envelope<T>) -> Result<(), ()> {
        match self {
            QueueTx::Bounded(tx) => tx.blocking_send(envelope).map_err(|_| ()),
            QueueTx::Unbounded(tx) => tx.send(envelope).map_err(|_| ()),
        }
    }

    async fn send(&self, envelope: Envelope<T>) -> Result<(), ()> {
        match self {
            QueueTx::Bounded(tx) => tx.send(envelope).await.map_err(|_| ()),
            QueueTx::Unbounded(tx) => tx.send(envelope).map_err(|_| ()),
        }
    }
}

enum QueueRx<T> {
    Bounded(mpsc::Receiver<Envelope<T>>),
    Unbounded(mpsc::UnboundedReceiver<Envelope<T>>),
}

impl<T> QueueRx<T> {
    async fn recv(&mut self) -> Option<Envelope<T>> {
        match self {
            QueueRx::Bounded(rx) => rx.recv().await,
            QueueRx::Unbounded(rx) => rx.recv().await,
        }
    }
}

fn queue<T>(capacity: Option<usize>) -> (QueueTx<T>, QueueRx<T>) {
    match capacity {
        Some(n) => {
            let (tx, rx) = mpsc::channel(n.max(1));
            (QueueTx::Bounded(tx), QueueRx::Bounded(rx))
        }
        None => {
            let (tx, rx) = mpsc::unbounded_channel();
            (QueueTx::Unbounded(tx), QueueRx::Unbounded(rx))
        }
    }
}

/// Run each source to completion on its own worker, pushing produced
/// items into one shared queue drained through the returned [`Merged`].
///
/// At most `workers` sources run concurrently; each iterates on the
/// blocking thread pool, so sources may block freely. `capacity` bounds
/// the backlog of undelivered items (`None` = unbounded): a full queue
/// blocks producers, never the consumer.
///
/// Items from different sources interleave in arbitrary order; each
/// source's own items preserve its production order. A source that yields
/// `Err` stops there; its error (and any worker panic) is re-raised by
/// [`Merged::finish`] only after every source has wound down.
pub fn merge<I, T, E>(sources: Vec<I>, workers: usize, capacity: Option<usize>) -> Merged<T, E>
where
    I: IntoIterator<Item = Result<T, E>> + Send + 'static,
    I::IntoIter: Send + 'static,
    T: Send + 'static,
    E: From<JoinError> + Send + 'static,
{
    let (tx, rx) = queue(capacity);
    let permits = Arc::new(Semaphore::new(workers.max(1)));
    let producers = sources.len();

    let handles = sources
        .into_iter()
        .map(|source| {
            let tx = tx.clone();
            let permits = Arc::clone(&permits);
            tokio::spawn(async move {
                // The semaphore is never closed, so acquisition cannot fail.
                let _permit = permits.acquire_owned().await.ok();

                let feed = {
                    let tx = tx.clone();
                    tokio::task::spawn_blocking(move || {
                        for item in source {
                            match item {
                                Ok(value) => {
                                    if tx.blocking_send(Envelope::Item(value)).is_err() {
                                        // Consumer dropped the stream; stop producing.
                                        break;
                                    }
                                }
                                Err(error) => return Err(error),
                            }
                        }
                        Ok(())
                    })
                };

                let outcome = match feed.await {
                    Ok(result) => result,
                    Err(join) => Err(E::from(join)),
                };

                // One end marker per worker, success or failure, so the
                // consumer always knows when to stop.
                let _ = tx.send(Envelope::Done).await;
                outcome
            })
        })
        .collect();

    Merged {
        rx,
        remaining: producers,
        handles,
    }
}

/// The consumer side of a [`merge`]: a lazy, exhaustible, non-restartable
/// sequence over everything the sources produce.
pub struct Merged<T, E> {
    rx: QueueRx<T>,
    remaining: usize,
    handles: Vec<JoinHandle<Result<(), E>>>,
}

impl<T, E> Merged<T, E>
where
    E: From<JoinError>,
{
    /// Next merged item, or `None` once every source has wound down.
    pub async fn next(&mut self) -> Option<T> {
        while self.remaining > 0 {
            match self.rx.recv().await {
                Some(Envelope::Item(item)) => return Some(item),
                Some(Envelope::Done) => self.remaining -= 1,
                None => return None,
            }
        }
        None
    }

    /// Re-raise anything the workers recorded, through the all-or-nothing
    /// fan-out. Call after [`next`](Merged::next) returns `None`; calling
    /// earlier can deadlock against producers blocked on a full queue.
    pub async fn finish(self) -> Result<(), Aggregate<E>> {
        collect(self.handles).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bench0::error::StageFailure;

    fn source(range: std::ops::Range<u64>) -> Vec<Result<u64, StageFailure>> {
        range.map(Ok).collect()
    }

    #[tokio::test]
    async fn interleaves_sources_preserving_per_source_order() {
        let mut merged = merge(vec![source(0..10), source(100..110)], 2, None);

        let mut low = Vec::new();
        let mut high = Vec::new();
        while let Some(item) = merged.next().await {
            if item < 100 {
                low.push(item);
            } else {
                high.push(item);
            }
        }

        assert_eq!(low, (0..10).collect::<Vec<_>>());
        assert_eq!(high, (100..110).collect::<Vec<_>>());
        merged.finish().await.unwrap();
    }

    #[tokio::test]
    async fn surfaces_failures_only_after_all_items() {
        let faulty: Vec<Result<u64, StageFailure>> =
            vec![Ok(999), Err(StageFailure::Panic("I'm very faulty".into()))];
        let mut merged = merge(vec![source(0..10), faulty], 2, None);

        let mut seen = Vec::new();
        while let Some(item) = merged.next().await {
            seen.push(item);
        }

        // Every item produced before the failure arrives, including the
        // faulty source's own output.
        assert_eq!(seen.len(), 11);
        assert!(seen.contains(&999));

        let aggregate = merged.finish().await.unwrap_err();
        assert_eq!(aggregate.len(), 1);
    }

    #[tokio::test]
    async fn delivers_everything_through_a_bounded_queue() {
        let mut merged = merge(vec![source(0..25), source(0..20)], 2, Some(1));

        let mut count = 0;
        while merged.next().await.is_some() {
            count += 1;
        }

        assert_eq!(count, 45);
        merged.finish().await.unwrap();
    }

    #[tokio::test]
    async fn fewer_workers_than_sources_still_drains_everything() {
        let mut merged = merge(vec![source(0..5), source(0..5), source(0..5)], 1, Some(2));

        let mut count = 0;
        while merged.next().await.is_some() {
            count += 1;
        }

        assert_eq!(count, 15);
        merged.finish().await.unwrap();
    }
}
