//! A bounded handoff queue between the fetcher task and the consumer surface, with watermark
//! hooks the fetcher uses to pause/resume broker fetch.
//!
//! `tokio::sync::mpsc` is the natural choice for `ApplyBackpressure` (its bounded `send` already
//! blocks the producer once full), but `DropOldest` needs to evict from the *front* of the queue
//! on overflow, which an mpsc channel cannot do from the sender side. A small `Mutex<VecDeque<T>>`
//! guarded by two `Notify`s supports both modes with one implementation.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tracing::warn;

/// How the fetcher behaves once the buffer is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackpressureMode {
    /// Block the fetcher (pausing broker fetch) until the consumer drains space.
    ApplyBackpressure,
    /// Never block the fetcher; evict the oldest buffered message to make room.
    DropOldest,
}

#[derive(Debug, Clone, Copy)]
pub struct BackpressureConfig {
    pub mode: BackpressureMode,
    pub capacity: usize,
    /// Pause fetch once buffer occupancy exceeds this fraction of `capacity`.
    pub high_water_ratio: f64,
    /// Resume fetch once buffer occupancy drops below this fraction of `capacity`.
    pub low_water_ratio: f64,
}

impl Default for BackpressureConfig {
    fn default() -> Self {
        Self { mode: BackpressureMode::ApplyBackpressure, capacity: 1000, high_water_ratio: 0.8, low_water_ratio: 0.2 }
    }
}

impl BackpressureConfig {
    pub fn high_watermark(&self) -> usize {
        (self.capacity as f64 * self.high_water_ratio).round() as usize
    }

    pub fn low_watermark(&self) -> usize {
        (self.capacity as f64 * self.low_water_ratio).round() as usize
    }
}

struct Shared<T> {
    queue: tokio::sync::Mutex<VecDeque<T>>,
    not_empty: Notify,
    not_full: Notify,
    len: AtomicUsize,
    config: BackpressureConfig,
}

/// The fetcher-side half.
pub struct BackpressureSender<T> {
    shared: Arc<Shared<T>>,
}

/// The consumer-side half.
pub struct BackpressureReceiver<T> {
    shared: Arc<Shared<T>>,
}

pub fn channel<T>(config: BackpressureConfig) -> (BackpressureSender<T>, BackpressureReceiver<T>) {
    let shared = Arc::new(Shared {
        queue: tokio::sync::Mutex::new(VecDeque::with_capacity(config.capacity)),
        not_empty: Notify::new(),
        not_full: Notify::new(),
        len: AtomicUsize::new(0),
        config,
    });
    (BackpressureSender { shared: shared.clone() }, BackpressureReceiver { shared })
}

impl<T> BackpressureSender<T> {
    /// Push a message. Under `ApplyBackpressure` this waits for room; under `DropOldest` it
    /// always returns immediately, evicting the oldest buffered item if necessary.
    ///
    /// Returns `true` once the push crossed the high watermark (the caller should pause fetch).
    pub async fn push(&self, item: T) -> bool {
        loop {
            let mut queue = self.shared.queue.lock().await;
            if queue.len() >= self.shared.config.capacity {
                match self.shared.config.mode {
                    BackpressureMode::ApplyBackpressure => {
                        drop(queue);
                        self.shared.not_full.notified().await;
                        continue;
                    }
                    BackpressureMode::DropOldest => {
                        if queue.pop_front().is_some() {
                            warn!("consumer buffer full, dropped oldest buffered message");
                        }
                    }
                }
            }
            queue.push_back(item);
            let len = queue.len();
            self.shared.len.store(len, Ordering::SeqCst);
            drop(queue);
            self.shared.not_empty.notify_one();
            return len >= self.shared.config.high_watermark();
        }
    }

    pub fn len(&self) -> usize {
        self.shared.len.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &BackpressureConfig {
        &self.shared.config
    }
}

impl<T> BackpressureReceiver<T> {
    /// Pop the oldest message, waiting if the buffer is empty.
    ///
    /// Returns `(item, should_resume)` where `should_resume` is true once occupancy drops below
    /// the low watermark (the caller should resume a paused fetch).
    pub async fn pop(&self) -> (T, bool) {
        loop {
            let mut queue = self.shared.queue.lock().await;
            if let Some(item) = queue.pop_front() {
                let len = queue.len();
                self.shared.len.store(len, Ordering::SeqCst);
                drop(queue);
                self.shared.not_full.notify_one();
                return (item, len <= self.shared.config.low_watermark());
            }
            drop(queue);
            self.shared.not_empty.notified().await;
        }
    }

    pub fn len(&self) -> usize {
        self.shared.len.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drop_oldest_evicts_front_instead_of_blocking() {
        let config = BackpressureConfig {
            mode: BackpressureMode::DropOldest,
            capacity: 2,
            high_water_ratio: 0.8,
            low_water_ratio: 0.2,
        };
        let (tx, rx) = channel::<i32>(config);
        tx.push(1).await;
        tx.push(2).await;
        tx.push(3).await; // evicts 1

        let (first, _) = rx.pop().await;
        assert_eq!(first, 2);
        let (second, _) = rx.pop().await;
        assert_eq!(second, 3);
    }

    #[tokio::test]
    async fn apply_backpressure_blocks_until_drained() {
        let config = BackpressureConfig {
            mode: BackpressureMode::ApplyBackpressure,
            capacity: 1,
            high_water_ratio: 1.0,
            low_water_ratio: 0.0,
        };
        let (tx, rx) = channel::<i32>(config);
        tx.push(1).await;

        let tx2 = Arc::new(tx);
        let tx2_clone = tx2.clone();
        let blocked = tokio::spawn(async move {
            tx2_clone.push(2).await;
        });

        tokio::task::yield_now().await;
        assert!(!blocked.is_finished());

        let (item, _) = rx.pop().await;
        assert_eq!(item, 1);
        blocked.await.unwrap();
    }

    #[test]
    fn watermarks_are_fractions_of_capacity() {
        let config = BackpressureConfig { capacity: 1000, high_water_ratio: 0.8, low_water_ratio: 0.2, ..Default::default() };
        assert_eq!(config.high_watermark(), 800);
        assert_eq!(config.low_watermark(), 200);
    }
}
