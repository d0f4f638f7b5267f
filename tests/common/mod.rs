//! Shared test helpers: an in-memory transport driven by the test.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tokio::sync::watch;

use azure_realtime_audio::config::ClientOptions;
use azure_realtime_audio::error::{RealtimeError, Result};
use azure_realtime_audio::transport::{
    ConnectionState, Connector, Transport, TransportHandler, TransportOptions,
};
use azure_realtime_audio::AzureRealtimeAudio;

/// Transport that records every sent message.
pub struct MockTransport {
    sent: Mutex<Vec<Value>>,
    state: watch::Sender<ConnectionState>,
    refuse_sends: AtomicBool,
}

impl MockTransport {
    fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            state: watch::Sender::new(ConnectionState::Connecting),
            refuse_sends: AtomicBool::new(false),
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }
}

impl Transport for MockTransport {
    fn send(&self, message: Value) -> Result<()> {
        let state = self.state();
        if state != ConnectionState::Open {
            return Err(RealtimeError::InvalidState(format!("mock socket is {state}")));
        }
        if self.refuse_sends.load(Ordering::SeqCst) {
            return Err(RealtimeError::WebSocket("mock send refused".into()));
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    fn close(&self) {
        self.set_state(ConnectionState::Closed);
    }

    fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }
}

/// Connector handing out a single [`MockTransport`] the test can drive.
pub struct MockConnector {
    transport: Arc<MockTransport>,
    handler: Mutex<Option<Arc<dyn TransportHandler>>>,
    url: Mutex<Option<String>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self {
            transport: Arc::new(MockTransport::new()),
            handler: Mutex::new(None),
            url: Mutex::new(None),
        }
    }

    pub fn url(&self) -> Option<String> {
        self.url.lock().unwrap().clone()
    }

    /// Simulate the socket opening (or reopening after a reconnect).
    pub fn open(&self) {
        self.transport.set_state(ConnectionState::Open);
        let handler = self.handler();
        handler.on_open(self.transport.as_ref());
    }

    /// Deliver an inbound message. Dropped unless the socket is open.
    pub fn deliver(&self, message: Value) {
        if self.transport.state() != ConnectionState::Open {
            return;
        }
        let handler = self.handler();
        handler.on_message(self.transport.as_ref(), message);
    }

    pub fn sent(&self) -> Vec<Value> {
        self.transport.sent.lock().unwrap().clone()
    }

    pub fn sent_types(&self) -> Vec<String> {
        self.sent()
            .iter()
            .filter_map(|message| message["type"].as_str().map(str::to_string))
            .collect()
    }

    /// Make every subsequent send fail while the socket stays open.
    pub fn refuse_sends(&self, refuse: bool) {
        self.transport.refuse_sends.store(refuse, Ordering::SeqCst);
    }

    pub fn clear_sent(&self) {
        self.transport.sent.lock().unwrap().clear();
    }

    /// Simulate the transport giving up on its own (no reconnect left).
    pub fn transport_close(&self) {
        self.transport.set_state(ConnectionState::Closed);
    }

    pub fn transport_state(&self) -> ConnectionState {
        self.transport.state()
    }

    fn handler(&self) -> Arc<dyn TransportHandler> {
        self.handler
            .lock()
            .unwrap()
            .clone()
            .expect("client should have connected")
    }
}

impl Connector for MockConnector {
    fn connect(
        &self,
        url: &str,
        _options: &TransportOptions,
        handler: Arc<dyn TransportHandler>,
    ) -> Result<Arc<dyn Transport>> {
        *self.url.lock().unwrap() = Some(url.to_string());
        *self.handler.lock().unwrap() = Some(handler);
        let transport: Arc<dyn Transport> = self.transport.clone();
        Ok(transport)
    }
}

pub fn test_options() -> ClientOptions {
    ClientOptions::builder()
        .host_name("unit.openai.azure.com")
        .api_version("2024-10-01-preview")
        .deployment("gpt-4o-realtime-preview")
        .api_key("test-key")
        .build()
}

/// A client whose socket has not opened yet.
pub fn client_with(options: ClientOptions) -> (AzureRealtimeAudio, MockConnector) {
    let connector = MockConnector::new();
    let client =
        AzureRealtimeAudio::with_connector(options, TransportOptions::default(), &connector)
            .expect("client should construct");
    (client, connector)
}

/// A client with an open socket and no recorded sends.
pub fn open_client() -> (AzureRealtimeAudio, MockConnector) {
    let (client, connector) = client_with(test_options());
    connector.open();
    connector.clear_sent();
    (client, connector)
}

pub fn session_updated() -> Value {
    json!({
        "type": "session.updated",
        "event_id": "evt_session",
        "session": {"id": "sess_1", "model": "gpt-4o-realtime-preview", "voice": "alloy"}
    })
}

pub fn event(kind: &str) -> Value {
    json!({"type": kind})
}
