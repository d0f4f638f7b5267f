//! Default transport: JSON over a tokio-tungstenite WebSocket, with
//! heartbeat and bounded exponential-backoff reconnects.

use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::{client::IntoClientRequest, Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use super::{ConnectionState, Connector, Transport, TransportHandler, TransportOptions};
use crate::error::{RealtimeError, Result};

type RealtimeWebSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connector for [`WebSocketTransport`]. Must be called inside a Tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl Connector for WebSocketConnector {
    fn connect(
        &self,
        url: &str,
        options: &TransportOptions,
        handler: Arc<dyn TransportHandler>,
    ) -> Result<Arc<dyn Transport>> {
        let transport = WebSocketTransport::spawn(url.to_string(), options.clone(), handler)?;
        Ok(Arc::new(transport))
    }
}

struct Shared {
    outbound_tx: mpsc::UnboundedSender<Message>,
    state_tx: watch::Sender<ConnectionState>,
    shutdown_tx: watch::Sender<bool>,
}

/// Handle to a background WebSocket connection.
///
/// Cloning yields another handle to the same connection.
#[derive(Clone)]
pub struct WebSocketTransport {
    shared: Arc<Shared>,
}

impl WebSocketTransport {
    /// Start connecting in the background and return immediately.
    pub fn spawn(
        url: String,
        options: TransportOptions,
        handler: Arc<dyn TransportHandler>,
    ) -> Result<Self> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            RealtimeError::Configuration(
                "The WebSocket transport must be started inside a Tokio runtime".into(),
            )
        })?;

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(ConnectionState::Connecting);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let transport = Self {
            shared: Arc::new(Shared {
                outbound_tx,
                state_tx,
                shutdown_tx,
            }),
        };

        runtime.spawn(run_supervisor_loop(
            url,
            options,
            handler,
            transport.clone(),
            outbound_rx,
            shutdown_rx,
        ));
        Ok(transport)
    }

    fn set_state(&self, state: ConnectionState) {
        self.shared.state_tx.send_if_modified(|current| {
            // Closing is only left for Closed.
            if *current == state
                || (*current == ConnectionState::Closing && state != ConnectionState::Closed)
                || *current == ConnectionState::Closed
            {
                return false;
            }
            *current = state;
            true
        });
    }
}

impl Transport for WebSocketTransport {
    fn send(&self, message: Value) -> Result<()> {
        let state = self.state();
        if state != ConnectionState::Open {
            return Err(RealtimeError::InvalidState(format!(
                "Realtime socket is {state}, cannot send"
            )));
        }
        let payload = serde_json::to_string(&message)?;
        self.shared
            .outbound_tx
            .send(Message::Text(payload.into()))
            .map_err(|_| RealtimeError::InvalidState("Realtime socket task has stopped".into()))
    }

    fn close(&self) {
        self.set_state(ConnectionState::Closing);
        let _ = self.shared.shutdown_tx.send(true);
    }

    fn state(&self) -> ConnectionState {
        *self.shared.state_tx.borrow()
    }

    fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }
}

enum ConnectionOutcome {
    Shutdown,
    Disconnected,
}

async fn run_supervisor_loop(
    url: String,
    options: TransportOptions,
    handler: Arc<dyn TransportHandler>,
    transport: WebSocketTransport,
    mut outbound_rx: mpsc::UnboundedReceiver<Message>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut reconnect_attempt = 0usize;
    loop {
        let connected = tokio::select! {
            result = connect_realtime_socket(&url, options.connect_timeout) => result,
            _ = wait_for_shutdown(&mut shutdown_rx) => break,
        };

        match connected {
            Ok(mut socket) => {
                reconnect_attempt = 0;
                // Commands queued for the previous socket must not reach a
                // new session ahead of its session.update.
                let stale = discard_queued(&mut outbound_rx);
                if stale > 0 {
                    debug!(stale, "dropped commands queued for the previous connection");
                }
                transport.set_state(ConnectionState::Open);
                if transport.state() != ConnectionState::Open {
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                }
                debug!("realtime websocket open");
                handler.on_open(&transport);

                let outcome = run_active_connection(
                    &mut socket,
                    handler.as_ref(),
                    &transport,
                    &mut outbound_rx,
                    &mut shutdown_rx,
                    options.heartbeat_interval,
                )
                .await;
                if matches!(outcome, ConnectionOutcome::Shutdown) || *shutdown_rx.borrow() {
                    break;
                }
                transport.set_state(ConnectionState::Connecting);
                debug!("realtime websocket disconnected");
            }
            Err(error) => {
                warn!(error = %error, "realtime websocket connect failed");
                if !error.is_retryable() {
                    break;
                }
            }
        }

        if reconnect_attempt >= options.reconnect_max_attempts {
            warn!(
                attempts = reconnect_attempt,
                "realtime websocket reconnect attempts exhausted"
            );
            break;
        }
        reconnect_attempt += 1;

        let delay = compute_backoff_delay(
            reconnect_attempt,
            options.reconnect_base_delay,
            options.reconnect_max_delay,
        );
        debug!(attempt = reconnect_attempt, ?delay, "realtime websocket reconnecting");
        tokio::select! {
            _ = time::sleep(delay) => {}
            _ = wait_for_shutdown(&mut shutdown_rx) => break,
        }
    }

    // Drop anything queued for a socket that no longer exists.
    outbound_rx.close();
    transport.set_state(ConnectionState::Closed);
    debug!("realtime websocket closed");
}

async fn run_active_connection(
    socket: &mut RealtimeWebSocket,
    handler: &dyn TransportHandler,
    transport: &WebSocketTransport,
    outbound_rx: &mut mpsc::UnboundedReceiver<Message>,
    shutdown_rx: &mut watch::Receiver<bool>,
    heartbeat_interval: Duration,
) -> ConnectionOutcome {
    let mut heartbeat = (!heartbeat_interval.is_zero()).then(|| {
        let first_tick = Instant::now() + heartbeat_interval;
        let mut interval = time::interval_at(first_tick, heartbeat_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    });

    loop {
        tokio::select! {
            _ = wait_for_shutdown(shutdown_rx) => {
                let _ = socket.send(Message::Close(None)).await;
                return ConnectionOutcome::Shutdown;
            }
            _ = next_heartbeat(&mut heartbeat) => {
                if let Err(error) = socket.send(Message::Ping(Default::default())).await {
                    warn!(error = %error, "realtime heartbeat failed");
                    return ConnectionOutcome::Disconnected;
                }
            }
            outbound = outbound_rx.recv() => {
                let Some(message) = outbound else {
                    return ConnectionOutcome::Shutdown;
                };
                if let Err(error) = socket.send(message).await {
                    warn!(error = %error, "realtime websocket send failed");
                    return ConnectionOutcome::Disconnected;
                }
            }
            frame = socket.next() => {
                match frame {
                    Some(Ok(message)) => {
                        let handled =
                            handle_server_message(socket, handler, transport, message).await;
                        if let Err(error) = handled {
                            debug!(error = %error, "realtime websocket frame ended the connection");
                            return ConnectionOutcome::Disconnected;
                        }
                    }
                    Some(Err(error)) => {
                        warn!(error = %error, "realtime websocket receive failed");
                        return ConnectionOutcome::Disconnected;
                    }
                    None => return ConnectionOutcome::Disconnected,
                }
            }
        }
    }
}

async fn handle_server_message(
    socket: &mut RealtimeWebSocket,
    handler: &dyn TransportHandler,
    transport: &WebSocketTransport,
    message: Message,
) -> std::result::Result<(), WsError> {
    match message {
        Message::Text(text) => dispatch_payload(text.as_str(), handler, transport),
        Message::Binary(bytes) => {
            if let Ok(text) = String::from_utf8(bytes.to_vec()) {
                dispatch_payload(&text, handler, transport);
            }
        }
        Message::Ping(payload) => socket.send(Message::Pong(payload)).await?,
        Message::Pong(_) => {}
        Message::Close(_) => return Err(WsError::ConnectionClosed),
        Message::Frame(_) => {}
    }
    Ok(())
}

fn dispatch_payload(payload: &str, handler: &dyn TransportHandler, transport: &WebSocketTransport) {
    // Frames racing a close() are dropped.
    if transport.state() != ConnectionState::Open {
        return;
    }
    match serde_json::from_str::<Value>(payload) {
        Ok(value) => handler.on_message(transport, value),
        Err(error) => debug!(error = %error, "ignoring non-JSON realtime frame"),
    }
}

fn discard_queued(outbound_rx: &mut mpsc::UnboundedReceiver<Message>) -> usize {
    let mut discarded = 0;
    while outbound_rx.try_recv().is_ok() {
        discarded += 1;
    }
    discarded
}

async fn wait_for_shutdown(shutdown_rx: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown_rx.borrow_and_update() {
            return;
        }
        if shutdown_rx.changed().await.is_err() {
            return;
        }
    }
}

async fn next_heartbeat(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(interval) => {
            interval.tick().await;
        }
        None => pending::<()>().await,
    }
}

async fn connect_realtime_socket(
    url: &str,
    connect_timeout: Duration,
) -> Result<RealtimeWebSocket> {
    let request = url.into_client_request().map_err(|error| {
        RealtimeError::Configuration(format!("Invalid realtime websocket URL: {error}"))
    })?;
    debug!("connecting realtime websocket");
    match time::timeout(connect_timeout, connect_async(request)).await {
        Ok(result) => result.map(|(socket, _)| socket).map_err(RealtimeError::from),
        Err(_) => Err(RealtimeError::WebSocket(format!(
            "Realtime websocket handshake timed out after {}ms",
            connect_timeout.as_millis()
        ))),
    }
}

fn compute_backoff_delay(attempt: usize, base: Duration, max_delay: Duration) -> Duration {
    let multiplier = 2u32.saturating_pow(attempt.saturating_sub(1) as u32) as f64;
    let scaled = base.as_secs_f64() * multiplier;
    Duration::from_secs_f64(scaled.min(max_delay.as_secs_f64()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let base = Duration::from_millis(125);
        let max = Duration::from_millis(375);
        assert_eq!(compute_backoff_delay(1, base, max), Duration::from_millis(125));
        assert_eq!(compute_backoff_delay(2, base, max), Duration::from_millis(250));
        assert_eq!(compute_backoff_delay(3, base, max), Duration::from_millis(375));
        assert_eq!(compute_backoff_delay(40, base, max), Duration::from_millis(375));
    }

    #[test]
    fn discard_queued_empties_the_channel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(Message::Text("{\"type\":\"response.cancel\"}".to_string().into()))
            .unwrap();
        tx.send(Message::Text("{\"type\":\"input_audio_buffer.commit\"}".to_string().into()))
            .unwrap();

        assert_eq!(discard_queued(&mut rx), 2);
        assert!(rx.try_recv().is_err());
        assert_eq!(discard_queued(&mut rx), 0);
    }

    #[test]
    fn spawn_outside_runtime_is_a_configuration_error() {
        struct Noop;
        impl TransportHandler for Noop {
            fn on_open(&self, _transport: &dyn Transport) {}
            fn on_message(&self, _transport: &dyn Transport, _message: Value) {}
        }

        let result = WebSocketTransport::spawn(
            "ws://127.0.0.1:9".into(),
            TransportOptions::default(),
            Arc::new(Noop),
        );
        assert!(matches!(result, Err(RealtimeError::Configuration(_))));
    }
}
