//! WebSocket transport configuration.
//!
//! Built through [`WsConfigBuilder`]; every knob is validated in `build()`
//! so a constructed [`WsConfig`] is always internally consistent.

use crate::error::{Error, Result};
use crate::rpc::metrics::{Metrics, NoopMetrics};
use http::{header, HeaderMap, HeaderName, HeaderValue};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Hard ceiling on the inbound frame size.
pub const MAX_FRAME_SIZE_CEILING: usize = 16 * 1024 * 1024;

/// Validated transport configuration.
#[derive(Clone)]
pub struct WsConfig {
    pub(crate) url: Url,
    pub(crate) headers: HeaderMap,
    pub(crate) connect_timeout: Duration,
    pub(crate) default_request_timeout: Duration,
    /// Zero disables the read-idle watchdog.
    pub(crate) read_idle_timeout: Duration,
    /// Zero disables the keepalive ping.
    pub(crate) write_idle_timeout: Duration,
    pub(crate) backpressure_timeout: Duration,
    pub(crate) max_pending_requests: usize,
    pub(crate) ring_buffer_size: usize,
    pub(crate) ring_buffer_saturation_threshold: f64,
    pub(crate) write_buffer_low_water_mark: usize,
    pub(crate) write_buffer_high_water_mark: usize,
    pub(crate) max_frame_size: usize,
    pub(crate) max_reconnect_attempts: u32,
    pub(crate) metrics: Arc<dyn Metrics>,
}

impl std::fmt::Debug for WsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsConfig")
            .field("url", &self.url)
            .field("connect_timeout", &self.connect_timeout)
            .field("default_request_timeout", &self.default_request_timeout)
            .field("read_idle_timeout", &self.read_idle_timeout)
            .field("write_idle_timeout", &self.write_idle_timeout)
            .field("ring_buffer_size", &self.ring_buffer_size)
            .field("max_pending_requests", &self.max_pending_requests)
            .field("max_reconnect_attempts", &self.max_reconnect_attempts)
            .finish()
    }
}

impl WsConfig {
    /// Start a builder for the given `ws://` or `wss://` endpoint.
    pub fn builder(endpoint: &str) -> Result<WsConfigBuilder> {
        let url = endpoint
            .parse::<Url>()
            .map_err(|e| Error::Transport(format!("bad ws url '{endpoint}': {e}")))?;
        Ok(WsConfigBuilder::new(url))
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// Builder for [`WsConfig`].
#[derive(Clone)]
pub struct WsConfigBuilder {
    url: Url,
    headers: HeaderMap,
    bearer_token: Option<String>,
    connect_timeout: Duration,
    default_request_timeout: Duration,
    read_idle_timeout: Duration,
    write_idle_timeout: Duration,
    backpressure_timeout: Duration,
    max_pending_requests: usize,
    ring_buffer_size: usize,
    ring_buffer_saturation_threshold: f64,
    write_buffer_low_water_mark: usize,
    write_buffer_high_water_mark: usize,
    max_frame_size: usize,
    max_reconnect_attempts: u32,
    metrics: Arc<dyn Metrics>,
}

impl WsConfigBuilder {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            headers: HeaderMap::new(),
            bearer_token: None,
            connect_timeout: Duration::from_secs(10),
            default_request_timeout: Duration::from_secs(30),
            read_idle_timeout: Duration::from_secs(60),
            write_idle_timeout: Duration::from_secs(30),
            backpressure_timeout: Duration::from_secs(1),
            max_pending_requests: 8192,
            ring_buffer_size: 4096,
            ring_buffer_saturation_threshold: 0.10,
            write_buffer_low_water_mark: 128 * 1024,
            write_buffer_high_water_mark: MAX_FRAME_SIZE_CEILING,
            max_frame_size: 64 * 1024,
            max_reconnect_attempts: 10,
            metrics: Arc::new(NoopMetrics),
        }
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Attach a bearer token to the handshake. The token is validated in
    /// [`build`](Self::build) like every other option; a token that cannot
    /// form a header value fails there instead of going out malformed.
    pub fn bearer_auth(mut self, token: &str) -> Self {
        self.bearer_token = Some(token.to_string());
        self
    }

    pub fn connect_timeout(mut self, d: Duration) -> Self {
        self.connect_timeout = d;
        self
    }

    pub fn default_request_timeout(mut self, d: Duration) -> Self {
        self.default_request_timeout = d;
        self
    }

    /// Read-idle watchdog period; `Duration::ZERO` disables it (tests only).
    pub fn read_idle_timeout(mut self, d: Duration) -> Self {
        self.read_idle_timeout = d;
        self
    }

    /// Keepalive ping period; `Duration::ZERO` disables it (tests only).
    pub fn write_idle_timeout(mut self, d: Duration) -> Self {
        self.write_idle_timeout = d;
        self
    }

    /// How long a submission may wait for a ring-buffer slot before failing
    /// with a backpressure error.
    pub fn backpressure_timeout(mut self, d: Duration) -> Self {
        self.backpressure_timeout = d;
        self
    }

    /// Soft cap on in-flight requests; submissions beyond it are rejected.
    pub fn max_pending_requests(mut self, n: usize) -> Self {
        self.max_pending_requests = n;
        self
    }

    /// Submission queue depth; must be a power of two, at least 2.
    pub fn ring_buffer_size(mut self, n: usize) -> Self {
        self.ring_buffer_size = n;
        self
    }

    /// Remaining-capacity fraction below which the saturation metric fires.
    pub fn ring_buffer_saturation_threshold(mut self, fraction: f64) -> Self {
        self.ring_buffer_saturation_threshold = fraction;
        self
    }

    pub fn write_buffer_water_marks(mut self, low: usize, high: usize) -> Self {
        self.write_buffer_low_water_mark = low;
        self.write_buffer_high_water_mark = high;
        self
    }

    pub fn max_frame_size(mut self, bytes: usize) -> Self {
        self.max_frame_size = bytes;
        self
    }

    pub fn max_reconnect_attempts(mut self, n: u32) -> Self {
        self.max_reconnect_attempts = n;
        self
    }

    pub fn metrics(mut self, metrics: Arc<dyn Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn build(self) -> Result<WsConfig> {
        match self.url.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(Error::Transport(format!(
                    "unsupported url scheme '{other}': expected ws or wss"
                )))
            }
        }
        if self.connect_timeout.is_zero() {
            return Err(Error::InvalidParams("connect_timeout must be non-zero".into()));
        }
        if self.default_request_timeout.is_zero() {
            return Err(Error::InvalidParams(
                "default_request_timeout must be non-zero".into(),
            ));
        }
        if self.backpressure_timeout.is_zero() {
            return Err(Error::InvalidParams(
                "backpressure_timeout must be non-zero".into(),
            ));
        }
        if self.ring_buffer_size < 2 || !self.ring_buffer_size.is_power_of_two() {
            return Err(Error::InvalidParams(format!(
                "ring_buffer_size {} must be a power of two >= 2",
                self.ring_buffer_size
            )));
        }
        if !(self.ring_buffer_saturation_threshold > 0.0
            && self.ring_buffer_saturation_threshold < 1.0)
        {
            return Err(Error::InvalidParams(format!(
                "ring_buffer_saturation_threshold {} must be in (0, 1)",
                self.ring_buffer_saturation_threshold
            )));
        }
        if self.write_buffer_low_water_mark > self.write_buffer_high_water_mark {
            return Err(Error::InvalidParams(
                "write buffer low water mark exceeds the high water mark".into(),
            ));
        }
        if self.max_frame_size == 0 || self.max_frame_size > MAX_FRAME_SIZE_CEILING {
            return Err(Error::InvalidParams(format!(
                "max_frame_size {} must be in 1..={MAX_FRAME_SIZE_CEILING}",
                self.max_frame_size
            )));
        }
        if self.max_pending_requests == 0 {
            return Err(Error::InvalidParams(
                "max_pending_requests must be non-zero".into(),
            ));
        }
        let mut headers = self.headers;
        if let Some(token) = &self.bearer_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                Error::InvalidParams("bearer token is not a valid header value".into())
            })?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(WsConfig {
            url: self.url,
            headers,
            connect_timeout: self.connect_timeout,
            default_request_timeout: self.default_request_timeout,
            read_idle_timeout: self.read_idle_timeout,
            write_idle_timeout: self.write_idle_timeout,
            backpressure_timeout: self.backpressure_timeout,
            max_pending_requests: self.max_pending_requests,
            ring_buffer_size: self.ring_buffer_size,
            ring_buffer_saturation_threshold: self.ring_buffer_saturation_threshold,
            write_buffer_low_water_mark: self.write_buffer_low_water_mark,
            write_buffer_high_water_mark: self.write_buffer_high_water_mark,
            max_frame_size: self.max_frame_size,
            max_reconnect_attempts: self.max_reconnect_attempts,
            metrics: self.metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_build() {
        let cfg = WsConfig::builder("ws://localhost:8546").unwrap().build().unwrap();
        assert_eq!(cfg.ring_buffer_size, 4096);
        assert_eq!(cfg.max_reconnect_attempts, 10);
        assert_eq!(cfg.max_frame_size, 64 * 1024);
    }

    #[test]
    fn rejects_non_ws_scheme() {
        let err = WsConfig::builder("http://localhost:8545")
            .unwrap()
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("scheme"));
    }

    #[test]
    fn rejects_bad_ring_size() {
        for n in [0usize, 1, 3, 100] {
            let res = WsConfig::builder("ws://x")
                .unwrap()
                .ring_buffer_size(n)
                .build();
            assert!(res.is_err(), "ring size {n} should be rejected");
        }
        assert!(WsConfig::builder("ws://x")
            .unwrap()
            .ring_buffer_size(2)
            .build()
            .is_ok());
    }

    #[test]
    fn rejects_bad_threshold_and_water_marks() {
        assert!(WsConfig::builder("ws://x")
            .unwrap()
            .ring_buffer_saturation_threshold(0.0)
            .build()
            .is_err());
        assert!(WsConfig::builder("ws://x")
            .unwrap()
            .ring_buffer_saturation_threshold(1.0)
            .build()
            .is_err());
        assert!(WsConfig::builder("ws://x")
            .unwrap()
            .write_buffer_water_marks(1024, 512)
            .build()
            .is_err());
    }

    #[test]
    fn rejects_oversized_frames() {
        assert!(WsConfig::builder("ws://x")
            .unwrap()
            .max_frame_size(MAX_FRAME_SIZE_CEILING + 1)
            .build()
            .is_err());
        assert!(WsConfig::builder("ws://x")
            .unwrap()
            .max_frame_size(MAX_FRAME_SIZE_CEILING)
            .build()
            .is_ok());
    }

    #[test]
    fn bearer_token_validated_on_build() {
        let cfg = WsConfig::builder("ws://x")
            .unwrap()
            .bearer_auth("s3cr3t-token")
            .build()
            .unwrap();
        let auth = cfg.headers.get(header::AUTHORIZATION).unwrap();
        assert_eq!(auth.to_str().unwrap(), "Bearer s3cr3t-token");

        // Control characters cannot form a header value; build must say so.
        let err = WsConfig::builder("ws://x")
            .unwrap()
            .bearer_auth("bad\ntoken")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("bearer token"));
    }

    #[test]
    fn idle_timers_may_be_disabled() {
        let cfg = WsConfig::builder("ws://x")
            .unwrap()
            .read_idle_timeout(Duration::ZERO)
            .write_idle_timeout(Duration::ZERO)
            .build()
            .unwrap();
        assert!(cfg.read_idle_timeout.is_zero());
        assert!(cfg.write_idle_timeout.is_zero());
    }
}
