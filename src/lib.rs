//! Ethlink SDK — Ethereum client building blocks.
//!
//! Two independent cores, each usable on its own:
//!
//! - [`abi`] — the contract ABI codec: a byte-exact encoder/decoder for the
//!   padded, offset-indexed binary format used by calldata, return values,
//!   and event logs, plus a JSON-driven registry with pre-computed selectors.
//! - [`rpc`] — a persistent WebSocket JSON-RPC transport: request/response
//!   correlation over a single duplex socket, subscription routing,
//!   backpressure, per-request timeouts, idle detection, and automatic
//!   reconnection with exponential backoff.
//!
//! Chain semantics (blocks, transactions, signing) live above this crate.

pub mod abi;
pub mod error;
pub mod rpc;
pub mod utils;

pub use error::{Error, Result};
