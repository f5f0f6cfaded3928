//! Transport metrics callbacks.
//!
//! The transport reports operational events through this trait rather than
//! logging them itself; pass an implementation via
//! [`WsConfigBuilder::metrics`](crate::rpc::config::WsConfigBuilder::metrics).
//! All callbacks run on the event loop or a timer task and must not block.

/// Sink for transport events. Every method has an empty default body, so
/// implementors override only what they record.
pub trait Metrics: Send + Sync {
    /// A request hit its per-request deadline before a response arrived.
    fn request_timeout(&self, _method: &str, _id: u64) {}

    /// A response frame arrived whose id had no pending slot (timed out,
    /// abandoned, or duplicated). Never an error.
    fn orphaned_response(&self, _id: u64) {}

    /// A submission was rejected: queue full past the backpressure timeout,
    /// or the pending-request cap was reached.
    fn backpressure(&self, _method: &str) {}

    /// Remaining queue capacity dropped below the saturation threshold.
    /// Fires per submission, not once.
    fn queue_saturated(&self, _remaining: usize, _capacity: usize) {}

    /// The connection entered the reconnecting state; `attempt` is 1-indexed.
    fn reconnecting(&self, _attempt: u32) {}

    /// The reconnect schedule was exhausted and the provider closed.
    fn reconnect_gave_up(&self, _attempts: u32) {}

    /// A subscription notification was dropped because its listener channel
    /// was full or closed.
    fn notification_dropped(&self, _subscription: &str) {}
}

/// Metrics sink that records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl Metrics for NoopMetrics {}
