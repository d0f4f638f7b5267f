//! Transport seam between the realtime client and a JSON message socket.
//!
//! The client only reacts to [`TransportHandler`] callbacks and pushes
//! messages through [`Transport::send`]. Connection management (handshake,
//! heartbeat, reconnect) belongs to the transport. [`WebSocketConnector`] is
//! the default implementation; tests and non-tokio hosts can inject their
//! own [`Connector`].

pub mod websocket;

use std::sync::Arc;
use std::time::Duration;

use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};
use tokio::sync::watch;

use crate::error::Result;

pub use websocket::{WebSocketConnector, WebSocketTransport};

/// Connection state reported by a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Outbound half of a JSON message connection.
pub trait Transport: Send + Sync {
    /// Serialize and queue one message. Fails when the socket is not open.
    fn send(&self, message: Value) -> Result<()>;

    /// Close the connection. Idempotent; no callbacks fire afterwards.
    fn close(&self);

    fn state(&self) -> ConnectionState;

    /// Watch state changes. `Closed` is terminal.
    fn subscribe_state(&self) -> watch::Receiver<ConnectionState>;
}

/// Inbound callbacks, invoked synchronously on the transport's task.
pub trait TransportHandler: Send + Sync {
    /// The underlying socket opened (again, after a reconnect).
    fn on_open(&self, transport: &dyn Transport);

    /// A frame was received and parsed as JSON.
    fn on_message(&self, transport: &dyn Transport, message: Value);
}

/// Opens a transport for a URL and wires it to a handler.
pub trait Connector {
    fn connect(
        &self,
        url: &str,
        options: &TransportOptions,
        handler: Arc<dyn TransportHandler>,
    ) -> Result<Arc<dyn Transport>>;
}

/// Tuning for the default WebSocket transport.
#[derive(Debug, Clone, Builder)]
pub struct TransportOptions {
    /// Ping interval while connected; `Duration::ZERO` disables heartbeats.
    #[builder(default = Duration::from_secs(30))]
    pub heartbeat_interval: Duration,
    /// Reconnect attempts after an unexpected disconnect. `0` disables.
    #[builder(default = 5)]
    pub reconnect_max_attempts: usize,
    #[builder(default = Duration::from_millis(500))]
    pub reconnect_base_delay: Duration,
    #[builder(default = Duration::from_secs(10))]
    pub reconnect_max_delay: Duration,
    /// Upper bound for a single handshake.
    #[builder(default = Duration::from_secs(15))]
    pub connect_timeout: Duration,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_enable_heartbeat_and_reconnect() {
        let options = TransportOptions::default();
        assert_eq!(options.heartbeat_interval, Duration::from_secs(30));
        assert_eq!(options.reconnect_max_attempts, 5);
        assert!(options.reconnect_base_delay < options.reconnect_max_delay);
    }

    #[test]
    fn builder_overrides_selected_fields() {
        let options = TransportOptions::builder()
            .reconnect_max_attempts(0)
            .heartbeat_interval(Duration::ZERO)
            .build();
        assert_eq!(options.reconnect_max_attempts, 0);
        assert_eq!(options.heartbeat_interval, Duration::ZERO);
        assert_eq!(options.connect_timeout, Duration::from_secs(15));
    }

    #[test]
    fn connection_state_names() {
        assert_eq!(ConnectionState::Open.to_string(), "open");
        assert_eq!("closing".parse::<ConnectionState>().unwrap(), ConnectionState::Closing);
    }
}
