//! Tokio WebSocket JSON-RPC client (tokio-tungstenite).
//!
//! One logical connection, four states:
//!
//! ```text
//! create ──> Connecting ──handshake ok──> Connected <──reconnect ok──┐
//!                │                           │                      │
//!                └──handshake failure──> Reconnecting ──────────────┘
//!                                            │ attempts > max
//!            Connected ──explicit close──> Closed <─────────────────┘
//! ```
//!
//! A single event-loop task owns the socket, the submission-queue drain, the
//! idle timers, and the frame reader; callers talk to it only through the
//! bounded queue and their oneshot result slots. Responses are matched to
//! requests by id through the correlator; `eth_subscription` notifications go
//! to the router. On every transition into `Reconnecting` or `Closed` all
//! pending requests fail with a connection-lost or provider-closed error; the
//! subscription map survives reconnects, the server-side subscriptions do
//! not — replay is the consumer's call (see [`Subscription::replay_request`]).

use crate::error::{Error, Result, RpcErrorObj};
use crate::rpc::config::WsConfig;
use crate::rpc::correlator::{Correlator, PendingEntry};
use crate::rpc::queue::{Submission, SubmissionQueue};
use crate::rpc::router::SubscriptionRouter;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{sleep, sleep_until, Instant};
use tokio_tungstenite::{
    connect_async_with_config,
    tungstenite::{client::IntoClientRequest, protocol::Message, protocol::WebSocketConfig},
    MaybeTlsStream, WebSocketStream,
};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Writer = SplitSink<Ws, Message>;

/// Lifecycle state of a [`WsClient`]. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Reconnecting,
    Closed,
}

/// Delay before reconnect attempt `k` (1-indexed): doubles from one second,
/// capped at 32 seconds.
fn backoff_delay(attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(5);
    Duration::from_millis((1000u64 << exp).min(32_000))
}

fn idle_deadline(period: Duration) -> Instant {
    if period.is_zero() {
        // Timer disabled; park the sleep far out so it never fires.
        Instant::now() + Duration::from_secs(30 * 24 * 3600)
    } else {
        Instant::now() + period
    }
}

/// Handle to a multiplexed, reconnecting WebSocket JSON-RPC connection.
/// Cheap to clone; all clones share one socket and one event loop.
#[derive(Clone)]
pub struct WsClient {
    inner: Arc<Shared>,
}

struct Shared {
    config: WsConfig,
    queue: SubmissionQueue,
    correlator: Arc<Correlator>,
    router: Arc<SubscriptionRouter>,
    state_rx: watch::Receiver<ConnectionState>,
    shutdown_tx: watch::Sender<bool>,
}

impl std::fmt::Debug for WsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsClient")
            .field("url", &self.inner.config.url)
            .field("state", &self.state())
            .finish()
    }
}

impl WsClient {
    /// Connect with default configuration.
    pub async fn connect(endpoint: &str) -> Result<Self> {
        let config = WsConfig::builder(endpoint)?.build()?;
        Self::connect_with(config).await
    }

    /// Spawn the connection task and wait for the initial handshake to
    /// settle. A failed first handshake is not an error: the client is
    /// returned in `Reconnecting` and keeps trying on its backoff schedule.
    pub async fn connect_with(config: WsConfig) -> Result<Self> {
        let client = Self::spawn(config);
        let mut state_rx = client.inner.state_rx.clone();
        loop {
            // Copy the state out so no watch read guard is held across await.
            let state = *state_rx.borrow_and_update();
            match state {
                ConnectionState::Connecting => {
                    if state_rx.changed().await.is_err() {
                        return Err(Error::Transport("connection task stopped".into()));
                    }
                }
                ConnectionState::Closed => return Err(Error::Closed),
                _ => return Ok(client),
            }
        }
    }

    fn spawn(config: WsConfig) -> Self {
        let (queue, queue_rx) =
            SubmissionQueue::new(config.ring_buffer_size, config.ring_buffer_saturation_threshold);
        let correlator = Arc::new(Correlator::default());
        let router = Arc::new(SubscriptionRouter::default());
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let supervisor = Supervisor {
            config: config.clone(),
            correlator: Arc::clone(&correlator),
            router: Arc::clone(&router),
            state_tx,
            shutdown_rx,
            queue_rx,
            next_id: 1,
        };
        tokio::spawn(supervisor.run());

        WsClient {
            inner: Arc::new(Shared { config, queue, correlator, router, state_rx, shutdown_tx }),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self.inner.state_rx.borrow()
    }

    /// Watch state transitions (useful for reconnect-aware consumers).
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_rx.clone()
    }

    /// Number of requests currently awaiting a response.
    pub fn pending_requests(&self) -> usize {
        self.inner.correlator.len()
    }

    /// Responses that arrived with no matching pending request.
    pub fn orphaned_responses(&self) -> u64 {
        self.inner.correlator.orphaned()
    }

    /// Live client-side subscriptions.
    pub fn subscriptions(&self) -> usize {
        self.inner.router.len()
    }

    /// Notifications dropped because a listener channel was full or gone.
    pub fn dropped_notifications(&self) -> u64 {
        self.inner.router.dropped()
    }

    /// Perform a JSON-RPC call and decode the result into `T`.
    pub async fn call<T, P>(&self, method: &str, params: P) -> Result<T>
    where
        T: DeserializeOwned,
        P: Serialize,
    {
        let params = serde_json::to_value(params)?;
        let result = self.request(method, params).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Perform a JSON-RPC call and return the untyped result.
    pub async fn call_raw(&self, method: &str, params: Option<Value>) -> Result<Value> {
        self.request(method, params.unwrap_or(Value::Null)).await
    }

    /// Submit a request and await its result slot. Rejected immediately while
    /// reconnecting or closed; bounded by the backpressure timeout on the
    /// queue side and the request timeout on the response side.
    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        match self.state() {
            ConnectionState::Reconnecting => {
                return Err(Error::ConnectionLost(
                    "connection is reconnecting; submission rejected".into(),
                ))
            }
            ConnectionState::Closed => return Err(Error::Closed),
            _ => {}
        }
        let config = &self.inner.config;
        if self.inner.correlator.len() >= config.max_pending_requests {
            config.metrics.backpressure(method);
            return Err(Error::Backpressure(format!(
                "{} pending requests reached max_pending_requests",
                config.max_pending_requests
            )));
        }

        // JSON-RPC params are positional; normalize a missing list.
        let params = if params.is_null() { json!([]) } else { params };
        let (tx, rx) = oneshot::channel();
        let submission = Submission { method: method.to_string(), params, slot: tx };
        self.inner
            .queue
            .submit(submission, config.backpressure_timeout, config.metrics.as_ref())
            .await?;

        match rx.await {
            Ok(result) => result,
            // The slot sender vanished without resolving; only possible if
            // the event loop died mid-request.
            Err(_) => Err(Error::ConnectionLost("request slot dropped".into())),
        }
    }

    /// Subscribe via a JSON-RPC subscribe method; the scalar response is the
    /// server-assigned subscription id.
    ///
    /// Notifications are delivered on the event loop into a bounded channel;
    /// a listener that needs to do heavy work should hand payloads off to its
    /// own task, or notifications beyond the buffer will be dropped.
    pub async fn subscribe(
        &self,
        method: &str,
        unsubscribe_method: &str,
        params: Value,
    ) -> Result<Subscription> {
        let result = self.request(method, params.clone()).await?;
        let id = scalar_string(&result).ok_or_else(|| {
            Error::Protocol(format!("subscription response is not a scalar id: {result}"))
        })?;
        let rx = self.inner.router.register(&id, method, params.clone(), 64);
        Ok(Subscription {
            client: self.clone(),
            id,
            method: method.to_string(),
            unsubscribe_method: unsubscribe_method.to_string(),
            params,
            rx,
            removed: false,
        })
    }

    /// Ethereum-style subscription: `eth_subscribe` / `eth_unsubscribe`.
    pub async fn subscribe_eth(&self, params: Value) -> Result<Subscription> {
        self.subscribe("eth_subscribe", "eth_unsubscribe", params).await
    }

    /// Close the provider: terminal. Fails all pending requests, drops
    /// queued submissions, clears subscriptions, and stops the event loop.
    pub async fn close(&self) {
        let _ = self.inner.shutdown_tx.send(true);
        let mut state_rx = self.inner.state_rx.clone();
        while *state_rx.borrow_and_update() != ConnectionState::Closed {
            if state_rx.changed().await.is_err() {
                break;
            }
        }
    }
}

// --------------------------- Subscription handle ------------------------------

/// A live subscription producing a stream of notification payloads.
///
/// Dropping the handle removes the listener and attempts a best-effort
/// unsubscribe. After a reconnect the server no longer knows this
/// subscription; use [`Subscription::replay_request`] to subscribe again.
pub struct Subscription {
    client: WsClient,
    id: String,
    method: String,
    unsubscribe_method: String,
    params: Value,
    rx: mpsc::Receiver<Value>,
    removed: bool,
}

impl Subscription {
    /// Receive the next payload; `None` once the subscription is closed.
    pub async fn next(&mut self) -> Option<Value> {
        self.rx.recv().await
    }

    /// Receive without waiting.
    pub fn try_next(&mut self) -> Option<Value> {
        self.rx.try_recv().ok()
    }

    /// Server-assigned subscription id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The original `(method, params)` used to create this subscription.
    pub fn replay_request(&self) -> (&str, &Value) {
        (&self.method, &self.params)
    }

    /// Remove the listener and send the unsubscribe request. The listener is
    /// gone regardless of the server's answer.
    pub async fn unsubscribe(mut self) -> Result<()> {
        self.removed = true;
        self.client.inner.router.remove(&self.id);
        let method = self.unsubscribe_method.clone();
        let id = self.id.clone();
        let _ = self.client.call::<Value, _>(&method, json!([id])).await;
        Ok(())
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        self.client.inner.router.remove(&self.id);
        // Fire-and-forget unsubscribe; no await in Drop.
        let client = self.client.clone();
        let method = self.unsubscribe_method.clone();
        let id = self.id.clone();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                let _ = client.call::<Value, _>(&method, json!([id])).await;
            });
        }
    }
}

// ------------------------------- Supervisor -----------------------------------

enum IoExit {
    Shutdown,
    Lost(String),
}

/// Owns the socket side: runs the handshake/reconnect loop and, while
/// connected, the single event loop over queue drain, frame reads, and idle
/// timers. All state transitions happen here.
struct Supervisor {
    config: WsConfig,
    correlator: Arc<Correlator>,
    router: Arc<SubscriptionRouter>,
    state_tx: watch::Sender<ConnectionState>,
    shutdown_rx: watch::Receiver<bool>,
    queue_rx: mpsc::Receiver<Submission>,
    next_id: u64,
}

impl Supervisor {
    async fn run(mut self) {
        let mut attempt: u32 = 0;
        loop {
            if *self.shutdown_rx.borrow() {
                break;
            }
            match self.handshake().await {
                Ok(ws) => {
                    attempt = 0;
                    self.set_state(ConnectionState::Connected);
                    tracing::debug!(url = %self.config.url, "websocket connected");
                    match self.run_io(ws).await {
                        IoExit::Shutdown => break,
                        IoExit::Lost(reason) => {
                            tracing::warn!(reason = %reason, "websocket connection lost");
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, url = %self.config.url, "websocket handshake failed");
                }
            }

            attempt += 1;
            if attempt > self.config.max_reconnect_attempts {
                tracing::error!(
                    attempts = attempt - 1,
                    "reconnect attempts exhausted; closing provider"
                );
                self.config.metrics.reconnect_gave_up(attempt - 1);
                break;
            }
            self.set_state(ConnectionState::Reconnecting);
            self.config.metrics.reconnecting(attempt);
            self.correlator
                .fail_all(|method| Error::ConnectionLost(format!("{method}: connection lost")));

            let delay = backoff_delay(attempt);
            tracing::debug!(attempt, ?delay, "reconnecting after backoff");
            tokio::select! {
                _ = sleep(delay) => {}
                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
        self.finish_closed();
    }

    /// Terminal cleanup: fail everything with "provider closed", drop queued
    /// submissions, clear subscriptions.
    fn finish_closed(&mut self) {
        self.set_state(ConnectionState::Closed);
        self.correlator.fail_all(|_| Error::Closed);
        self.router.clear();
        self.queue_rx.close();
        while let Ok(submission) = self.queue_rx.try_recv() {
            let _ = submission.slot.send(Err(Error::Closed));
        }
    }

    fn set_state(&self, state: ConnectionState) {
        let _ = self.state_tx.send(state);
    }

    async fn handshake(&self) -> Result<Ws> {
        let mut request = self
            .config
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| Error::Transport(format!("ws request: {e}")))?;
        request.headers_mut().extend(self.config.headers.clone());

        let mut ws_config = WebSocketConfig::default();
        ws_config.max_message_size = Some(self.config.max_frame_size);
        ws_config.max_frame_size = Some(self.config.max_frame_size);
        ws_config.write_buffer_size = self.config.write_buffer_low_water_mark;
        ws_config.max_write_buffer_size = self.config.write_buffer_high_water_mark;

        let connecting = connect_async_with_config(request, Some(ws_config), true);
        let (ws, _response) = tokio::time::timeout(self.config.connect_timeout, connecting)
            .await
            .map_err(|_| Error::Transport("ws connect timeout".into()))?
            .map_err(|e| Error::Transport(format!("ws connect: {e}")))?;
        Ok(ws)
    }

    /// The single event loop for one connected socket.
    async fn run_io(&mut self, ws: Ws) -> IoExit {
        let (mut sink, mut stream) = ws.split();
        let read_idle = self.config.read_idle_timeout;
        let write_idle = self.config.write_idle_timeout;
        let read_enabled = !read_idle.is_zero();
        let write_enabled = !write_idle.is_zero();
        let read_sleep = sleep_until(idle_deadline(read_idle));
        let write_sleep = sleep_until(idle_deadline(write_idle));
        tokio::pin!(read_sleep, write_sleep);

        loop {
            tokio::select! {
                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        let _ = sink.send(Message::Close(None)).await;
                        return IoExit::Shutdown;
                    }
                }
                submission = self.queue_rx.recv() => {
                    let Some(submission) = submission else {
                        // Every client handle is gone.
                        let _ = sink.send(Message::Close(None)).await;
                        return IoExit::Shutdown;
                    };
                    if let Err(reason) = self.write_request(&mut sink, submission).await {
                        return IoExit::Lost(reason);
                    }
                    if write_enabled {
                        write_sleep.as_mut().reset(idle_deadline(write_idle));
                    }
                }
                frame = stream.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            if read_enabled {
                                read_sleep.as_mut().reset(idle_deadline(read_idle));
                            }
                            self.route_frame(&text);
                        }
                        Some(Ok(Message::Binary(_))) => {
                            // Not part of the protocol; counts as traffic only.
                            if read_enabled {
                                read_sleep.as_mut().reset(idle_deadline(read_idle));
                            }
                        }
                        Some(Ok(Message::Ping(_))) => {
                            // tungstenite answers with a pong on next flush.
                            if read_enabled {
                                read_sleep.as_mut().reset(idle_deadline(read_idle));
                            }
                        }
                        Some(Ok(Message::Pong(_))) => {
                            // Keepalive replies do not count as received traffic.
                        }
                        Some(Ok(Message::Close(_))) => {
                            return IoExit::Lost("server closed the connection".into());
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return IoExit::Lost(format!("read error: {e}")),
                        None => return IoExit::Lost("connection closed".into()),
                    }
                }
                _ = &mut read_sleep, if read_enabled => {
                    return IoExit::Lost("read idle timeout".into());
                }
                _ = &mut write_sleep, if write_enabled => {
                    if let Err(e) = sink.send(Message::Ping(Vec::new())).await {
                        return IoExit::Lost(format!("keepalive ping failed: {e}"));
                    }
                    write_sleep.as_mut().reset(idle_deadline(write_idle));
                }
            }
        }
    }

    /// Assign an id, register the pending entry, arm the timeout, write the
    /// frame. Correlator insertion happens before the socket write.
    async fn write_request(
        &mut self,
        sink: &mut Writer,
        submission: Submission,
    ) -> std::result::Result<(), String> {
        let id = self.next_id;
        self.next_id += 1;
        let Submission { method, params, slot } = submission;
        let frame = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        })
        .to_string();

        self.correlator.insert(id, PendingEntry::new(slot, method.clone()));

        let timeout = self.config.default_request_timeout;
        let correlator = Arc::clone(&self.correlator);
        let metrics = Arc::clone(&self.config.metrics);
        let timer = tokio::spawn(async move {
            sleep(timeout).await;
            if let Some(entry) = correlator.take(id) {
                metrics.request_timeout(&entry.method, id);
                let _ = entry.slot.send(Err(Error::Timeout(format!(
                    "{}: no response within {timeout:?}",
                    entry.method
                ))));
            }
        });
        self.correlator.attach_timeout(id, timer);

        if let Err(e) = sink.send(Message::Text(frame)).await {
            self.correlator
                .resolve(id, Err(Error::ConnectionLost(format!("write failed: {e}"))));
            return Err(format!("write error: {e}"));
        }
        Ok(())
    }

    /// Route one inbound text frame: response to the correlator, notification
    /// to the router. A frame that parses to neither is logged, never fatal.
    fn route_frame(&self, text: &str) {
        let value: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "unparseable frame ignored");
                return;
            }
        };

        if let Some(id) = scalar_id(&value) {
            if value.get("result").is_some() || value.get("error").is_some() {
                let outcome = translate_response(value);
                if !self.correlator.resolve(id, outcome) {
                    let total = self.correlator.note_orphan();
                    self.config.metrics.orphaned_response(id);
                    tracing::debug!(id, total, "orphaned response");
                }
                return;
            }
        }

        if value.get("method").and_then(Value::as_str).is_some() {
            if let Some(params) = value.get("params") {
                let sub_id = params.get("subscription").and_then(scalar_string);
                if let (Some(sub_id), Some(result)) = (sub_id, params.get("result")) {
                    self.router
                        .dispatch(&sub_id, result.clone(), self.config.metrics.as_ref());
                    return;
                }
            }
            tracing::debug!("notification without subscription id ignored");
            return;
        }

        tracing::debug!("frame with neither id nor method ignored");
    }
}

// ------------------------------- Frame helpers --------------------------------

/// Scalar request id: a JSON number, or a string holding one.
fn scalar_id(value: &Value) -> Option<u64> {
    let id = value.get("id")?;
    id.as_u64()
        .or_else(|| id.as_str().and_then(|s| s.parse::<u64>().ok()))
}

/// Scalar rendered as a string (subscription ids may be hex strings or
/// numbers depending on the server).
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Split a response frame into the caller-visible result.
fn translate_response(mut value: Value) -> Result<Value> {
    if let Some(err) = value.get("error") {
        if !err.is_null() {
            let code = err.get("code").and_then(Value::as_i64).unwrap_or(-32603);
            let message = err
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("rpc error")
                .to_string();
            let data = err.get("data").filter(|d| !d.is_null()).cloned();
            return Err(Error::Rpc(RpcErrorObj::new(code, message, data)));
        }
    }
    match value.get_mut("result") {
        Some(result) => Ok(result.take()),
        None => Err(Error::Protocol(
            "response carries neither result nor error".into(),
        )),
    }
}

// --------------------------------- Tests --------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_schedule_doubles_to_cap() {
        let expected_ms = [1000u64, 2000, 4000, 8000, 16_000, 32_000, 32_000, 32_000];
        for (i, &ms) in expected_ms.iter().enumerate() {
            assert_eq!(backoff_delay(i as u32 + 1), Duration::from_millis(ms));
        }
    }

    #[test]
    fn scalar_id_accepts_number_and_string() {
        assert_eq!(scalar_id(&json!({"id": 7})), Some(7));
        assert_eq!(scalar_id(&json!({"id": "42"})), Some(42));
        assert_eq!(scalar_id(&json!({"id": null})), None);
        assert_eq!(scalar_id(&json!({"method": "x"})), None);
    }

    #[test]
    fn translate_result_and_error() {
        let ok = translate_response(json!({"jsonrpc":"2.0","id":1,"result":"0x10"}));
        assert_eq!(ok.unwrap(), json!("0x10"));

        let err = translate_response(json!({
            "jsonrpc":"2.0","id":1,
            "error": {"code": -32601, "message": "method not found"}
        }))
        .unwrap_err();
        match err {
            Error::Rpc(e) => {
                assert_eq!(e.code, -32601);
                assert_eq!(e.message, "method not found");
            }
            other => panic!("unexpected error: {other}"),
        }

        let neither = translate_response(json!({"jsonrpc":"2.0","id":1})).unwrap_err();
        assert!(matches!(neither, Error::Protocol(_)));
    }

    #[test]
    fn subscription_id_forms() {
        assert_eq!(scalar_string(&json!("0xab12")), Some("0xab12".into()));
        assert_eq!(scalar_string(&json!(31)), Some("31".into()));
        assert_eq!(scalar_string(&json!({"x": 1})), None);
    }
}
