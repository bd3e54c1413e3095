//! Bounded worker pool over a shared LIFO work queue.
//!
//! The queue is a stack: lanes pop the most recently discovered URL first.
//! Cross-source ordering is therefore not discovery order, and nothing in
//! the pipeline depends on it.
//!
//! Lanes are futures joined on the calling task, so at most `concurrency`
//! items are in flight at once. Each lane processes its items strictly one
//! after another and exits the first time it finds the queue empty; the pool
//! finishes when every lane has exited. The pool never re-balances or grows.

use futures::future::join_all;
use parking_lot::Mutex;
use std::future::Future;
use tracing::debug;

/// A stack shared by all lanes. `pop` is atomic, so no item is handed out twice.
#[derive(Debug)]
pub struct WorkQueue<T> {
    items: Mutex<Vec<T>>,
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
        }
    }
}

impl<T> WorkQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, item: T) {
        self.items.lock().push(item);
    }

    pub fn pop(&self) -> Option<T> {
        self.items.lock().pop()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

impl<T> FromIterator<T> for WorkQueue<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: Mutex::new(iter.into_iter().collect()),
        }
    }
}

/// Drain `queue` with `concurrency` lanes, returning every handler result.
///
/// A `concurrency` of zero is treated as one.
pub async fn drain<T, R, F, Fut>(queue: &WorkQueue<T>, concurrency: usize, handler: F) -> Vec<R>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = R>,
{
    let handler = &handler;
    let lanes = (0..concurrency.max(1)).map(|lane| async move {
        let mut results = Vec::new();
        while let Some(item) = queue.pop() {
            results.push(handler(item).await);
        }
        debug!(lane, processed = results.len(), "Lane found queue empty");
        results
    });

    join_all(lanes).await.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_single_lane_pops_lifo() {
        let queue: WorkQueue<&str> = ["u1", "u2"].into_iter().collect();
        let seen = Mutex::new(Vec::new());

        drain(&queue, 1, |url| {
            seen.lock().push(url);
            async {}
        })
        .await;

        assert_eq!(*seen.lock(), vec!["u2", "u1"]);
    }

    #[tokio::test]
    async fn test_every_item_popped_exactly_once() {
        let queue: WorkQueue<usize> = (0..20).collect();

        let results = drain(&queue, 3, |n| async move {
            tokio::task::yield_now().await;
            n
        })
        .await;

        assert_eq!(results.len(), 20);
        let unique: HashSet<_> = results.iter().copied().collect();
        assert_eq!(unique.len(), 20);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_in_flight_never_exceeds_concurrency() {
        let queue: WorkQueue<usize> = (0..12).collect();
        let in_flight = &AtomicUsize::new(0);
        let peak = &AtomicUsize::new(0);

        drain(&queue, 3, move |_| async move {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::task::yield_now().await;
            tokio::task::yield_now().await;
            in_flight.fetch_sub(1, Ordering::SeqCst);
        })
        .await;

        assert_eq!(peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_empty_queue_and_zero_concurrency_terminate() {
        let queue: WorkQueue<u8> = WorkQueue::new();
        let results = drain(&queue, 0, |n| async move { n }).await;
        assert!(results.is_empty());

        let queue: WorkQueue<u8> = [1, 2].into_iter().collect();
        let results = drain(&queue, 0, |n| async move { n }).await;
        assert_eq!(results, vec![2, 1]);
    }
}
