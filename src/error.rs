use core::fmt;
use thiserror::Error;

/// Common result alias for the SDK.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Structured JSON-RPC error object, as carried by a response frame.
#[derive(Debug, Clone)]
pub struct RpcErrorObj {
    pub code: i64,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

impl RpcErrorObj {
    pub fn new(code: i64, message: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self { code, message: message.into(), data }
    }
}

impl fmt::Display for RpcErrorObj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(d) = &self.data {
            write!(f, "RPC error {}: {} (data={})", self.code, self.message, d)
        } else {
            write!(f, "RPC error {}: {}", self.code, self.message)
        }
    }
}

impl std::error::Error for RpcErrorObj {}

/// Top-level SDK error.
///
/// Variants are intentionally broad and stable. Submodules convert their
/// detail into these for public APIs.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    // ---- ABI codec ---------------------------------------------------------
    /// Encoding failure: bad argument type, out-of-range integer, wrong
    /// fixed-bytes size, unknown type string, unknown function, arity mismatch.
    #[error("abi encode error: {0}")]
    AbiEncode(String),

    /// Decoding failure: truncated buffer, offset/length out of bounds,
    /// oversized length word, or conversion to the target type failed.
    #[error("abi decode error: {0}")]
    AbiDecode(String),

    // ---- RPC / Protocol ----------------------------------------------------
    /// JSON-RPC error response with structured details.
    #[error("{0}")]
    Rpc(#[from] RpcErrorObj),

    /// A frame had an unexpected shape (missing result/error, non-scalar
    /// subscription id, ...). One bad frame never kills the connection.
    #[error("protocol error: {0}")]
    Protocol(String),

    // ---- Transport ---------------------------------------------------------
    /// Connect failure or socket-level I/O error.
    #[error("transport error: {0}")]
    Transport(String),

    /// The connection dropped while the request was pending.
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    /// The provider was closed, either explicitly or after the reconnect
    /// schedule was exhausted.
    #[error("provider closed")]
    Closed,

    /// Reconnect attempts exhausted.
    #[error("reconnect attempts exhausted")]
    RetryExhausted,

    /// Submission rejected: ring buffer full past the backpressure timeout,
    /// or the pending-request cap was reached.
    #[error("backpressure: {0}")]
    Backpressure(String),

    /// Per-request deadline expired before a response arrived.
    #[error("timeout: {0}")]
    Timeout(String),

    // ---- Encoding / misc ---------------------------------------------------
    /// JSON (de)serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Hex decoding error.
    #[error("hex decode error: {0}")]
    Hex(#[from] hex::FromHexError),

    /// URL parse error.
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Generic IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration or call parameters.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
}

impl Error {
    /// Whether this error is likely transient and safe to retry.
    pub fn is_retryable(&self) -> bool {
        use Error::*;
        match self {
            Transport(_) | ConnectionLost(_) | Timeout(_) | Backpressure(_) => true,
            Rpc(e) => {
                // JSON-RPC -32603 (internal) and the -320xx server range are
                // generally transient; everything else is a caller problem.
                e.code == -32603 || (-32099..=-32000).contains(&e.code)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(Error::Transport("connection reset".into()).is_retryable());
        assert!(Error::ConnectionLost("read eof".into()).is_retryable());
        assert!(Error::Rpc(RpcErrorObj::new(-32000, "busy", None)).is_retryable());
        assert!(!Error::Rpc(RpcErrorObj::new(-32601, "method not found", None)).is_retryable());
        assert!(!Error::AbiEncode("uint8 out of range".into()).is_retryable());
        assert!(!Error::Closed.is_retryable());
    }

    #[test]
    fn rpc_error_display_includes_data() {
        let e = RpcErrorObj::new(3, "execution reverted", Some(serde_json::json!("0x08c379a0")));
        let s = e.to_string();
        assert!(s.contains("execution reverted"));
        assert!(s.contains("0x08c379a0"));
    }
}
