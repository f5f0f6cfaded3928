//! WebSocket JSON-RPC transport.
//!
//! Data flow: caller → submission queue → event loop → socket; socket →
//! event loop → correlator (responses carrying an id) or subscription router
//! (notifications). Control flow: the state machine in [`ws`] supervises
//! reconnection with exponential backoff and fans out cancellation to every
//! pending request.

pub mod config;
pub(crate) mod correlator;
pub mod metrics;
pub(crate) mod queue;
pub(crate) mod router;
pub mod ws;

pub use config::{WsConfig, WsConfigBuilder};
pub use metrics::{Metrics, NoopMetrics};
pub use ws::{ConnectionState, Subscription, WsClient};
