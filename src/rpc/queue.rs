//! Bounded submission queue.
//!
//! Decouples caller tasks from the single socket writer: producers claim a
//! slot (bounded by the backpressure timeout), the event loop drains in FIFO
//! order. Capacity is a power of two and remaining capacity is introspected
//! on every submission to drive the saturation metric.

use crate::error::{Error, Result};
use crate::rpc::metrics::Metrics;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::SendTimeoutError};
use tokio::sync::oneshot;

/// One queued request: method, params, and the caller's result slot.
pub(crate) struct Submission {
    pub method: String,
    pub params: Value,
    pub slot: oneshot::Sender<Result<Value>>,
}

pub(crate) struct SubmissionQueue {
    tx: mpsc::Sender<Submission>,
    capacity: usize,
    /// Remaining capacity strictly below this fires the saturation metric.
    saturation_slots: usize,
}

impl SubmissionQueue {
    /// `capacity` must already be validated as a power of two >= 2.
    pub fn new(capacity: usize, saturation_threshold: f64) -> (Self, mpsc::Receiver<Submission>) {
        debug_assert!(capacity.is_power_of_two() && capacity >= 2);
        let (tx, rx) = mpsc::channel(capacity);
        let saturation_slots = ((capacity as f64) * saturation_threshold).ceil() as usize;
        (Self { tx, capacity, saturation_slots }, rx)
    }

    pub fn remaining(&self) -> usize {
        self.tx.capacity()
    }

    /// Enqueue a submission, waiting at most `backpressure_timeout` for a
    /// slot. On timeout the submission is dropped and a backpressure error
    /// returned; the caller surfaces it through the result slot it holds.
    pub async fn submit(
        &self,
        submission: Submission,
        backpressure_timeout: Duration,
        metrics: &dyn Metrics,
    ) -> Result<()> {
        let remaining = self.tx.capacity();
        if remaining < self.saturation_slots {
            metrics.queue_saturated(remaining, self.capacity);
        }
        match self.tx.send_timeout(submission, backpressure_timeout).await {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(submission)) => {
                metrics.backpressure(&submission.method);
                Err(Error::Backpressure(format!(
                    "no submission slot for {} within {:?}",
                    submission.method, backpressure_timeout
                )))
            }
            Err(SendTimeoutError::Closed(_)) => Err(Error::Closed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingMetrics {
        saturated: AtomicUsize,
        backpressure: AtomicUsize,
    }

    impl Metrics for CountingMetrics {
        fn queue_saturated(&self, _remaining: usize, _capacity: usize) {
            self.saturated.fetch_add(1, Ordering::Relaxed);
        }
        fn backpressure(&self, _method: &str) {
            self.backpressure.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn submission(method: &str) -> Submission {
        let (tx, _rx) = oneshot::channel();
        Submission { method: method.into(), params: Value::Null, slot: tx }
    }

    #[tokio::test]
    async fn fifo_order_preserved() {
        let (queue, mut rx) = SubmissionQueue::new(8, 0.10);
        let metrics = CountingMetrics::default();
        for name in ["a", "b", "c"] {
            queue
                .submit(submission(name), Duration::from_millis(10), &metrics)
                .await
                .unwrap();
        }
        assert_eq!(rx.recv().await.unwrap().method, "a");
        assert_eq!(rx.recv().await.unwrap().method, "b");
        assert_eq!(rx.recv().await.unwrap().method, "c");
    }

    #[tokio::test]
    async fn backpressure_after_timeout() {
        let (queue, _rx) = SubmissionQueue::new(2, 0.10);
        let metrics = CountingMetrics::default();
        queue
            .submit(submission("a"), Duration::from_millis(10), &metrics)
            .await
            .unwrap();
        queue
            .submit(submission("b"), Duration::from_millis(10), &metrics)
            .await
            .unwrap();

        let err = queue
            .submit(submission("c"), Duration::from_millis(50), &metrics)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Backpressure(_)));
        assert_eq!(metrics.backpressure.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn saturation_metric_fires_per_submission() {
        // Capacity 4, threshold 0.5 → metric fires when remaining < 2.
        let (queue, _rx) = SubmissionQueue::new(4, 0.5);
        let metrics = CountingMetrics::default();
        for name in ["a", "b", "c"] {
            queue
                .submit(submission(name), Duration::from_millis(10), &metrics)
                .await
                .unwrap();
        }
        // Third submission saw remaining == 2 - not saturated; fill one more.
        queue
            .submit(submission("d"), Duration::from_millis(10), &metrics)
            .await
            .unwrap();
        assert_eq!(metrics.saturated.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn closed_receiver_reports_closed() {
        let (queue, rx) = SubmissionQueue::new(2, 0.10);
        drop(rx);
        let metrics = CountingMetrics::default();
        let err = queue
            .submit(submission("a"), Duration::from_millis(10), &metrics)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Closed));
    }
}
