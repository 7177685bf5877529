//! The shared push channel.

use std::fmt;
use std::sync::{Arc, Weak};

use futures::{SinkExt, StreamExt};
use obsidian_proto::ChannelFrame;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::reconnect::ReconnectConfig;
use super::registry::{Handler, HandlerId, HandlerRegistry};
use super::state::ConnectionState;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// One persistent connection to the backend's push surface.
///
/// Cloning is cheap and every clone refers to the same connection and the
/// same handler registry. Connection failures never reach callers; they show
/// up as [`ConnectionState`] changes while a background task retries with
/// exponential backoff.
#[derive(Clone)]
pub struct TransportChannel {
    inner: Arc<Inner>,
}

struct Inner {
    url: String,
    reconnect: ReconnectConfig,
    registry: HandlerRegistry,
    state: watch::Sender<ConnectionState>,
    task: Mutex<Option<ConnectionTask>>,
}

struct ConnectionTask {
    cancel: CancellationToken,
    outbound: mpsc::UnboundedSender<ChannelFrame>,
}

impl Inner {
    /// Publish `state` unless `cancel` has fired.
    ///
    /// The check runs under the watch lock, so it is ordered against the
    /// `Disconnected` published by [`TransportChannel::disconnect`].
    fn set_state(&self, cancel: &CancellationToken, state: ConnectionState) {
        self.state.send_if_modified(|current| {
            if cancel.is_cancelled() || *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.cancel.cancel();
        }
    }
}

impl TransportChannel {
    /// Create a channel for `url`. Nothing connects until [`connect`](Self::connect).
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_reconnect(url, ReconnectConfig::default())
    }

    /// Create a channel with a custom reconnection policy.
    #[must_use]
    pub fn with_reconnect(url: impl Into<String>, reconnect: ReconnectConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(Inner {
                url: url.into(),
                reconnect,
                registry: HandlerRegistry::new(),
                state,
                task: Mutex::new(None),
            }),
        }
    }

    /// Endpoint this channel connects to.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Start the background connection task unless one is already running.
    ///
    /// Returns immediately. Must be called from within a tokio runtime; outside
    /// one the call is logged and ignored.
    pub fn connect(&self) {
        let mut task = self.inner.task.lock();
        if task.as_ref().is_some_and(|t| !t.cancel.is_cancelled()) {
            debug!(url = %self.inner.url, "push channel already running");
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(url = %self.inner.url, "connect called outside a tokio runtime");
            return;
        };

        let cancel = CancellationToken::new();
        let (outbound, outbound_rx) = mpsc::unbounded_channel();

        self.inner.set_state(&cancel, ConnectionState::Connecting);
        runtime.spawn(connection_loop(
            Arc::downgrade(&self.inner),
            self.inner.url.clone(),
            self.inner.reconnect.clone(),
            cancel.clone(),
            outbound_rx,
        ));

        *task = Some(ConnectionTask { cancel, outbound });
    }

    /// Tear the connection down. Handlers stay registered.
    pub fn disconnect(&self) {
        let task = self.inner.task.lock().take();
        if let Some(task) = task {
            task.cancel.cancel();
            info!(url = %self.inner.url, "push channel disconnected");
        }
        self.inner.state.send_replace(ConnectionState::Disconnected);
    }

    /// Register `handler` for `event`. Handlers for the same event run in
    /// registration order on the channel's reader task and must not block.
    pub fn on<F>(&self, event: &str, handler: F) -> HandlerId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let handler: Handler = Arc::new(handler);
        let id = self.inner.registry.register(event, handler);
        debug!(event, ?id, "handler registered");
        id
    }

    /// Unregister a handler. Returns `false` if it was not registered.
    pub fn off(&self, event: &str, id: HandlerId) -> bool {
        let removed = self.inner.registry.unregister(event, id);
        debug!(event, ?id, removed, "handler unregistered");
        removed
    }

    /// Send an event to the backend. Dropped while not connected.
    pub fn emit<T: Serialize>(&self, event: &str, payload: &T) {
        if !self.is_connected() {
            debug!(event, "push channel not connected, dropping emit");
            return;
        }

        let frame = match ChannelFrame::encode(event, payload) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(event, error = %e, "failed to encode outbound event");
                return;
            }
        };

        let sent = self
            .inner
            .task
            .lock()
            .as_ref()
            .is_some_and(|task| task.outbound.send(frame).is_ok());
        if !sent {
            debug!(event, "connection task gone, dropping emit");
        }
    }

    /// Dispatch a payload to local handlers as if it had arrived on the socket.
    pub fn deliver(&self, event: &str, data: &Value) -> usize {
        self.inner.registry.dispatch(event, data)
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Whether the socket is currently open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Receiver notified on every connection state change.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Number of handlers registered for `event`.
    #[must_use]
    pub fn handler_count(&self, event: &str) -> usize {
        self.inner.registry.handler_count(event)
    }
}

impl fmt::Debug for TransportChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportChannel")
            .field("url", &self.inner.url)
            .field("state", &self.state())
            .field("registry", &self.inner.registry)
            .finish_non_exhaustive()
    }
}

async fn connection_loop(
    inner: Weak<Inner>,
    url: String,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
    mut outbound: mpsc::UnboundedReceiver<ChannelFrame>,
) {
    let mut attempt = 0u32;

    loop {
        let connected = tokio::select! {
            () = cancel.cancelled() => return,
            result = tokio_tungstenite::connect_async(url.as_str()) => result,
        };

        match connected {
            Ok((socket, _)) => {
                attempt = 0;
                match inner.upgrade() {
                    Some(shared) => shared.set_state(&cancel, ConnectionState::Connected),
                    None => return,
                }
                info!(url = %url, "push channel connected");

                let reason = run_connection(socket, &inner, &cancel, &mut outbound).await;
                if cancel.is_cancelled() {
                    return;
                }
                warn!(url = %url, reason = %reason, "push channel lost");

                match inner.upgrade() {
                    Some(shared) => shared.set_state(&cancel, ConnectionState::Reconnecting),
                    None => return,
                }
                // Drain emits queued for the dead socket.
                while outbound.try_recv().is_ok() {}

                tokio::select! {
                    () = cancel.cancelled() => return,
                    () = sleep(reconnect.initial_delay) => {}
                }
            }
            Err(e) => {
                attempt = attempt.saturating_add(1);
                let Some(shared) = inner.upgrade() else {
                    return;
                };

                if !reconnect.should_reconnect(attempt) {
                    shared.set_state(&cancel, ConnectionState::Failed);
                    cancel.cancel();
                    warn!(url = %url, attempts = attempt, error = %e, "giving up on push channel");
                    return;
                }

                shared.set_state(&cancel, ConnectionState::Reconnecting);
                drop(shared);

                let delay = reconnect.delay_for_attempt(attempt);
                debug!(url = %url, attempt, ?delay, error = %e, "push channel connect failed");

                tokio::select! {
                    () = cancel.cancelled() => return,
                    () = sleep(delay) => {}
                }
            }
        }
    }
}

async fn run_connection(
    socket: Socket,
    inner: &Weak<Inner>,
    cancel: &CancellationToken,
    outbound: &mut mpsc::UnboundedReceiver<ChannelFrame>,
) -> String {
    let (mut write, mut read) = socket.split();

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                let _ = write.send(Message::Close(None)).await;
                return "closed by client".to_string();
            }

            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let frame = match ChannelFrame::from_json(text.as_str()) {
                            Ok(frame) => frame,
                            Err(e) => {
                                warn!(error = %e, "skipping malformed push frame");
                                continue;
                            }
                        };
                        let Some(shared) = inner.upgrade() else {
                            return "channel dropped".to_string();
                        };
                        let handled = shared.registry.dispatch(&frame.event, &frame.data);
                        debug!(event = %frame.event, handled, "push frame dispatched");
                    }
                    Some(Ok(Message::Close(_))) => {
                        return "server closed connection".to_string();
                    }
                    Some(Ok(_)) => {
                        // Ping, Pong and Binary frames carry no events.
                    }
                    Some(Err(e)) => {
                        return format!("WebSocket error: {e}");
                    }
                    None => {
                        return "connection closed".to_string();
                    }
                }
            }

            frame = outbound.recv() => {
                let Some(frame) = frame else {
                    return "outbound queue closed".to_string();
                };
                match frame.to_json() {
                    Ok(json) => {
                        if write.send(Message::text(json)).await.is_err() {
                            return "write failed".to_string();
                        }
                    }
                    Err(e) => warn!(event = %frame.event, error = %e, "failed to encode frame"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_new_channel_is_disconnected() {
        let channel = TransportChannel::new("ws://localhost:3001");
        assert_eq!(channel.state(), ConnectionState::Disconnected);
        assert!(!channel.is_connected());
        assert_eq!(channel.url(), "ws://localhost:3001");
    }

    #[test]
    fn test_connect_outside_runtime_is_ignored() {
        let channel = TransportChannel::new("ws://localhost:3001");
        channel.connect();
        assert_eq!(channel.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_clones_share_handlers() {
        let channel = TransportChannel::new("ws://localhost:3001");
        let other = channel.clone();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        let id = channel.on("circuit:state-change", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(other.deliver("circuit:state-change", &json!({})), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        assert!(other.off("circuit:state-change", id));
        assert_eq!(channel.deliver("circuit:state-change", &json!({})), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_emit_while_disconnected_is_dropped() {
        let channel = TransportChannel::new("ws://localhost:3001");
        channel.emit("subscribe", &json!({"serviceId": "a"}));
        assert_eq!(channel.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_connect_is_idempotent_and_disconnect_resets() {
        // Nothing listens on port 9; the task keeps retrying in the background.
        let channel = TransportChannel::with_reconnect(
            "ws://127.0.0.1:9",
            ReconnectConfig {
                initial_delay: std::time::Duration::from_millis(10),
                ..ReconnectConfig::default()
            },
        );

        channel.connect();
        channel.connect();
        assert!(channel.state().is_active());

        channel.disconnect();
        assert_eq!(channel.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_cancelled_task_cannot_publish_state() {
        let channel = TransportChannel::new("ws://localhost:3001");
        let cancel = CancellationToken::new();

        channel.inner.set_state(&cancel, ConnectionState::Connecting);
        assert_eq!(channel.state(), ConnectionState::Connecting);

        cancel.cancel();
        channel.inner.set_state(&cancel, ConnectionState::Connected);
        assert_eq!(channel.state(), ConnectionState::Connecting);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_disconnect_wins_on_multi_thread_runtime() {
        let channel = TransportChannel::with_reconnect(
            "ws://127.0.0.1:9",
            ReconnectConfig {
                initial_delay: std::time::Duration::from_millis(1),
                max_delay: std::time::Duration::from_millis(1),
                ..ReconnectConfig::default()
            },
        );

        for _ in 0..50 {
            channel.connect();
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
            channel.disconnect();
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            assert_eq!(channel.state(), ConnectionState::Disconnected);
        }
    }
}
