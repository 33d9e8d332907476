use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::domain::types::QueueSnapshot;

/// Unbounded FIFO shared between the webhook handlers and the worker.
///
/// `push` never blocks. `pop` waits until an item is available and is meant
/// for a single consumer.
#[derive(Debug)]
pub struct JobQueue<T> {
    items: Mutex<VecDeque<T>>,
    available: Notify,
}

impl<T> JobQueue<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            available: Notify::new(),
        }
    }

    pub fn push(&self, value: T) {
        self.items.lock().push_back(value);
        self.available.notify_one();
    }

    pub fn try_pop(&self) -> Option<T> {
        self.items.lock().pop_front()
    }

    /// Cancel-safe: an item is only removed once the future resolves.
    pub async fn pop(&self) -> T {
        loop {
            if let Some(value) = self.try_pop() {
                return value;
            }
            // notify_one stores a permit when nobody is waiting, so a push
            // landing between try_pop and here is not missed.
            self.available.notified().await;
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            pending: self.len(),
        }
    }
}

impl<T> Default for JobQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;

    #[tokio::test]
    async fn pops_in_push_order() {
        let queue = JobQueue::new();
        for value in 0..5 {
            queue.push(value);
        }
        let mut seen = Vec::new();
        for _ in 0..5 {
            seen.push(queue.pop().await);
        }
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
        assert!(queue.try_pop().is_none());
    }

    #[tokio::test]
    async fn pop_waits_for_a_later_push() {
        let queue = Arc::new(JobQueue::new());
        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.pop().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!consumer.is_finished());

        queue.push("late");
        let value = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .expect("consumer woke up")
            .expect("consumer task");
        assert_eq!(value, "late");
    }

    #[tokio::test]
    async fn concurrent_producers_lose_nothing() {
        let queue = Arc::new(JobQueue::new());
        let mut producers = Vec::new();
        for producer in 0..4u32 {
            let queue = queue.clone();
            producers.push(tokio::spawn(async move {
                for n in 0..50u32 {
                    queue.push((producer, n));
                }
            }));
        }
        for producer in producers {
            producer.await.unwrap();
        }

        assert_eq!(queue.snapshot().pending, 200);
        let mut last_seen = [None::<u32>; 4];
        while let Some((producer, n)) = queue.try_pop() {
            let slot = &mut last_seen[producer as usize];
            assert!(slot.map_or(true, |prev| prev < n), "per-producer order kept");
            *slot = Some(n);
        }
        assert!(last_seen.iter().all(|slot| *slot == Some(49)));
    }

    #[tokio::test]
    async fn dropping_a_pending_pop_keeps_items() {
        let queue = JobQueue::new();
        let _ = tokio::time::timeout(Duration::from_millis(10), queue.pop()).await;
        queue.push(7);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pop().await, 7);
    }
}
