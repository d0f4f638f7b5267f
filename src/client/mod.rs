//! The realtime client: session bootstrap, status tracking and event fan-out.

pub mod emitter;
mod status;

use std::fmt;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, warn};

use crate::api::request::{
    ConversationItemCreate, ConversationItemDelete, ConversationItemTruncate,
    InputAudioBufferAppend, InputAudioBufferClear, InputAudioBufferCommit, ResponseCancel,
    ResponseCreate, SessionUpdate,
};
use crate::api::{
    ConversationItem, RequestPayload, ResponseCommand, ResponseConfig, ResponsePayload,
    SessionConfig,
};
use crate::config::ClientOptions;
use crate::constants::ModelStatus;
use crate::error::{RealtimeError, Result};
use crate::transport::{
    ConnectionState, Connector, Transport, TransportHandler, TransportOptions, WebSocketConnector,
};

pub use emitter::{EventHub, Listener, ListenerId};

/// Client for one Azure OpenAI realtime session.
///
/// Construction opens the connection in the background. Every time the
/// socket opens the client sends `session.update` with the configured
/// session; the first `session.updated` reply is republished as `init`.
/// Every other inbound message is republished under its `type`, after the
/// status machine has seen it.
///
/// Listeners run synchronously on the transport's task and must not block.
pub struct AzureRealtimeAudio {
    transport: Arc<dyn Transport>,
    state: Arc<ClientState>,
}

impl AzureRealtimeAudio {
    /// Connect with the default WebSocket transport. Requires a Tokio runtime.
    pub fn new(options: ClientOptions) -> Result<Self> {
        Self::with_transport_options(options, TransportOptions::default())
    }

    pub fn with_transport_options(
        options: ClientOptions,
        transport_options: TransportOptions,
    ) -> Result<Self> {
        Self::with_connector(options, transport_options, &WebSocketConnector)
    }

    /// Connect through a custom [`Connector`].
    pub fn with_connector(
        options: ClientOptions,
        transport_options: TransportOptions,
        connector: &dyn Connector,
    ) -> Result<Self> {
        options.validate()?;
        let state = Arc::new(ClientState::new(options.effective_session_config()));
        debug!(
            host = %options.host_name,
            deployment = %options.deployment,
            "opening realtime session"
        );
        let handler: Arc<dyn TransportHandler> = state.clone();
        let transport = connector.connect(&options.endpoint_url(), &transport_options, handler)?;
        Ok(Self { transport, state })
    }

    /// Register a listener for `event` (a wire `type` or `init`).
    ///
    /// The client owns its listeners, so a listener holding an
    /// `Arc<AzureRealtimeAudio>` keeps the client alive until the listener
    /// is removed. Capture a [`std::sync::Weak`] and upgrade it inside the
    /// listener instead.
    pub fn on<F>(&self, event: impl AsRef<str>, listener: F) -> ListenerId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.state.hub.on(event.as_ref(), Arc::new(listener))
    }

    /// Register a listener removed before its first invocation.
    pub fn once<F>(&self, event: impl AsRef<str>, listener: F) -> ListenerId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.state.hub.once(event.as_ref(), Arc::new(listener))
    }

    /// Register a listener that receives the decoded payload for `P`.
    ///
    /// Messages that fail to decode are logged and skipped for this
    /// listener only.
    pub fn on_payload<P, F>(&self, listener: F) -> ListenerId
    where
        P: ResponsePayload + 'static,
        F: Fn(P) + Send + Sync + 'static,
    {
        self.state.hub.on(P::COMMAND.as_str(), typed_listener(listener))
    }

    pub fn once_payload<P, F>(&self, listener: F) -> ListenerId
    where
        P: ResponsePayload + 'static,
        F: Fn(P) + Send + Sync + 'static,
    {
        self.state.hub.once(P::COMMAND.as_str(), typed_listener(listener))
    }

    /// Remove one listener, or all listeners of `event` when `id` is `None`.
    pub fn off(&self, event: impl AsRef<str>, id: Option<ListenerId>) -> usize {
        self.state.hub.off(event.as_ref(), id)
    }

    pub fn off_all(&self) {
        self.state.hub.off_all();
    }

    pub fn listener_count(&self, event: impl AsRef<str>) -> usize {
        self.state.hub.listener_count(event.as_ref())
    }

    /// Messages for `event` as a stream. Dropping the stream unsubscribes.
    ///
    /// The stream is unbounded: messages queue until polled, so a stream
    /// for a busy event such as `response.audio.delta` should be drained
    /// promptly or dropped.
    pub fn events(&self, event: impl AsRef<str>) -> EventStream {
        let event = event.as_ref().to_string();
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.state.hub.on(
            &event,
            Arc::new(move |message: &Value| {
                let _ = tx.send(message.clone());
            }),
        );
        EventStream {
            event,
            id,
            hub: Arc::downgrade(&self.state.hub),
            receiver: UnboundedReceiverStream::new(rx),
        }
    }

    /// Send a typed request command.
    pub fn send<P: RequestPayload>(&self, payload: &P) -> Result<()> {
        self.send_raw(payload.to_message()?)
    }

    /// Send an already-built message. It must carry its own `type`.
    pub fn send_raw(&self, message: Value) -> Result<()> {
        let command = message
            .get("type")
            .and_then(|kind| kind.as_str())
            .unwrap_or("<untyped>")
            .to_string();
        debug!(command = %command, "sending realtime command");
        self.transport.send(message)
    }

    /// Append base64-encoded audio to the input buffer.
    pub fn append_audio(&self, audio: impl Into<String>) -> Result<()> {
        self.send(&InputAudioBufferAppend { audio: audio.into() })
    }

    /// Append raw audio bytes to the input buffer.
    pub fn append_audio_pcm(&self, data: &[u8]) -> Result<()> {
        self.send(&InputAudioBufferAppend::from_pcm(data))
    }

    pub fn commit_audio(&self) -> Result<()> {
        self.send(&InputAudioBufferCommit::default())
    }

    pub fn clear_audio_buffer(&self) -> Result<()> {
        self.send(&InputAudioBufferClear::default())
    }

    pub fn create_conversation_item(
        &self,
        item: ConversationItem,
        previous_item_id: Option<String>,
    ) -> Result<()> {
        self.send(&ConversationItemCreate {
            item,
            previous_item_id,
        })
    }

    pub fn delete_item(&self, item_id: impl Into<String>) -> Result<()> {
        self.send(&ConversationItemDelete {
            item_id: item_id.into(),
        })
    }

    /// Truncate an assistant audio item at `audio_end_ms`.
    pub fn truncate_item(
        &self,
        item_id: impl Into<String>,
        content_index: u32,
        audio_end_ms: u32,
    ) -> Result<()> {
        self.send(&ConversationItemTruncate {
            item_id: item_id.into(),
            content_index,
            audio_end_ms,
        })
    }

    /// Ask the model to respond; `None` uses the session configuration.
    pub fn create_response(&self, response: Option<ResponseConfig>) -> Result<()> {
        self.send(&ResponseCreate { response })
    }

    pub fn cancel_response(&self) -> Result<()> {
        self.send(&ResponseCancel::default())
    }

    pub fn status(&self) -> ModelStatus {
        *self.state.status.borrow()
    }

    /// Overwrite the status. Not checked against the state machine.
    pub fn set_status(&self, status: ModelStatus) {
        self.state.set_status(status);
    }

    pub fn status_changes(&self) -> watch::Receiver<ModelStatus> {
        self.state.status.subscribe()
    }

    /// Local playback of the model's reply finished.
    pub fn set_model_speak_done(&self) {
        self.state.set_status(ModelStatus::Idle);
    }

    /// Whether `init` has fired.
    pub fn is_initialized(&self) -> bool {
        *self.state.initialized.borrow()
    }

    /// Wait for `init`. Returns immediately if it already fired.
    ///
    /// Fails with [`RealtimeError::InvalidState`] once the transport is
    /// closed without the session having initialized (rejected handshake,
    /// reconnect attempts exhausted, or [`AzureRealtimeAudio::close`]).
    pub async fn wait_until_initialized(&self) -> Result<()> {
        let mut initialized = self.state.initialized.subscribe();
        let mut connection = self.transport.subscribe_state();
        tokio::select! {
            biased;
            _ = initialized.wait_for(|done| *done) => Ok(()),
            _ = connection.wait_for(|state| *state == ConnectionState::Closed) => {
                if self.is_initialized() {
                    Ok(())
                } else {
                    Err(RealtimeError::InvalidState(
                        "Realtime connection closed before the session initialized".into(),
                    ))
                }
            }
        }
    }

    /// Session configuration sent on every open.
    pub fn session_config(&self) -> &SessionConfig {
        &self.state.session
    }

    pub fn state(&self) -> ConnectionState {
        self.transport.state()
    }

    /// Close the connection. No events are delivered afterwards.
    pub fn close(&self) {
        debug!("closing realtime session");
        self.transport.close();
    }
}

impl Drop for AzureRealtimeAudio {
    fn drop(&mut self) {
        self.transport.close();
    }
}

impl fmt::Debug for AzureRealtimeAudio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureRealtimeAudio")
            .field("state", &self.state())
            .field("status", &self.status())
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

struct ClientState {
    hub: Arc<EventHub>,
    status: watch::Sender<ModelStatus>,
    initialized: watch::Sender<bool>,
    session: SessionConfig,
}

impl ClientState {
    fn new(session: SessionConfig) -> Self {
        Self {
            hub: Arc::new(EventHub::new()),
            status: watch::Sender::new(ModelStatus::Idle),
            initialized: watch::Sender::new(false),
            session,
        }
    }

    fn set_status(&self, next: ModelStatus) {
        self.status.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            debug!(from = %current, to = %next, "model status changed");
            *current = next;
            true
        });
    }

    /// Set the init flag. True only for the call that flipped it.
    fn mark_initialized(&self) -> bool {
        self.initialized.send_if_modified(|done| !std::mem::replace(done, true))
    }
}

impl TransportHandler for ClientState {
    fn on_open(&self, transport: &dyn Transport) {
        let update = SessionUpdate {
            session: self.session.clone(),
        };
        match update.to_message().and_then(|message| transport.send(message)) {
            Ok(()) => debug!("sent session.update"),
            Err(error) => warn!(error = %error, "failed to send session.update"),
        }
    }

    fn on_message(&self, transport: &dyn Transport, message: Value) {
        let Some(kind) = message.get("type").and_then(Value::as_str) else {
            debug!("ignoring realtime message without a type");
            return;
        };
        let command = ResponseCommand::from_wire(kind);

        if command == ResponseCommand::SessionUpdated && self.mark_initialized() {
            debug!("realtime session initialized");
            self.hub.emit(ResponseCommand::Init.as_str(), &message);
            return;
        }

        let current = *self.status.borrow();
        let effect = status::transition(current, &command);
        if effect.cancel_response {
            let cancelled = ResponseCancel::default()
                .to_message()
                .and_then(|cancel| transport.send(cancel));
            if let Err(error) = cancelled {
                warn!(error = %error, "failed to cancel response on user speech");
            }
        }
        if let Some(next) = effect.next {
            self.set_status(next);
        }

        self.hub.emit(kind, &message);
    }
}

fn typed_listener<P, F>(listener: F) -> Listener
where
    P: ResponsePayload + 'static,
    F: Fn(P) + Send + Sync + 'static,
{
    Arc::new(move |message: &Value| match P::from_message(message) {
        Ok(payload) => listener(payload),
        Err(error) => {
            let command = P::COMMAND;
            warn!(
                event = command.as_str(),
                error = %error,
                "skipping listener for undecodable payload"
            );
        }
    })
}

/// Stream of raw messages for one event, from [`AzureRealtimeAudio::events`].
///
/// Ends once the client and its transport are gone.
pub struct EventStream {
    event: String,
    id: ListenerId,
    hub: Weak<EventHub>,
    receiver: UnboundedReceiverStream<Value>,
}

impl EventStream {
    pub fn event(&self) -> &str {
        &self.event
    }
}

impl Stream for EventStream {
    type Item = Value;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_next_unpin(cx)
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.off(&self.event, Some(self.id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_flag_flips_once() {
        let state = ClientState::new(SessionConfig::default());
        assert!(state.mark_initialized());
        assert!(!state.mark_initialized());
        assert!(*state.initialized.borrow());
    }

    #[test]
    fn set_status_skips_redundant_notifications() {
        let state = ClientState::new(SessionConfig::default());
        let mut changes = state.status.subscribe();
        state.set_status(ModelStatus::Idle);
        assert!(!changes.has_changed().unwrap());
        state.set_status(ModelStatus::Listening);
        assert!(changes.has_changed().unwrap());
        assert_eq!(*changes.borrow_and_update(), ModelStatus::Listening);
    }
}
