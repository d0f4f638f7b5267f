//! Response command payloads (server → client).
//!
//! Every struct mirrors one server event. Fields the client does not model
//! are ignored on deserialization; listeners that need them can subscribe
//! to the raw JSON message instead.

use base64::prelude::*;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::commands::ResponseCommand;
use super::types::{
    ApiErrorDetails, ContentPart, ConversationItem, RateLimit, ResponseObject, Session,
};
use crate::error::Result;

/// A response payload with a statically known event name.
pub trait ResponsePayload: DeserializeOwned {
    const COMMAND: ResponseCommand;

    /// Decode a raw inbound message into this payload.
    fn from_message(message: &Value) -> Result<Self> {
        Ok(Self::deserialize(message)?)
    }
}

macro_rules! response_payload {
    ($ty:ty => $command:ident) => {
        impl ResponsePayload for $ty {
            const COMMAND: ResponseCommand = ResponseCommand::$command;
        }
    };
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionCreated {
    #[serde(default)]
    pub event_id: Option<String>,
    pub session: Session,
}
response_payload!(SessionCreated => SessionCreated);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionUpdated {
    #[serde(default)]
    pub event_id: Option<String>,
    pub session: Session,
}
response_payload!(SessionUpdated => SessionUpdated);

/// The synthetic `init` event: the first `session.updated` of a client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Init(pub SessionUpdated);
response_payload!(Init => Init);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationItemCreated {
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub previous_item_id: Option<String>,
    pub item: ConversationItem,
}
response_payload!(ConversationItemCreated => ConversationItemCreated);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationItemDeleted {
    #[serde(default)]
    pub event_id: Option<String>,
    pub item_id: String,
}
response_payload!(ConversationItemDeleted => ConversationItemDeleted);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationItemTruncated {
    #[serde(default)]
    pub event_id: Option<String>,
    pub item_id: String,
    pub content_index: u32,
    pub audio_end_ms: u32,
}
response_payload!(ConversationItemTruncated => ConversationItemTruncated);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseCreated {
    #[serde(default)]
    pub event_id: Option<String>,
    pub response: ResponseObject,
}
response_payload!(ResponseCreated => ResponseCreated);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseDone {
    #[serde(default)]
    pub event_id: Option<String>,
    pub response: ResponseObject,
}
response_payload!(ResponseDone => ResponseDone);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateLimitsUpdated {
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub rate_limits: Vec<RateLimit>,
}
response_payload!(RateLimitsUpdated => RateLimitsUpdated);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseOutputItemAdded {
    #[serde(default)]
    pub event_id: Option<String>,
    pub response_id: String,
    pub output_index: u32,
    pub item: ConversationItem,
}
response_payload!(ResponseOutputItemAdded => ResponseOutputItemAdded);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseOutputItemDone {
    #[serde(default)]
    pub event_id: Option<String>,
    pub response_id: String,
    pub output_index: u32,
    pub item: ConversationItem,
}
response_payload!(ResponseOutputItemDone => ResponseOutputItemDone);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseContentPartAdded {
    #[serde(default)]
    pub event_id: Option<String>,
    pub response_id: String,
    pub item_id: String,
    pub output_index: u32,
    pub content_index: u32,
    pub part: ContentPart,
}
response_payload!(ResponseContentPartAdded => ResponseContentPartAdded);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseContentPartDone {
    #[serde(default)]
    pub event_id: Option<String>,
    pub response_id: String,
    pub item_id: String,
    pub output_index: u32,
    pub content_index: u32,
    pub part: ContentPart,
}
response_payload!(ResponseContentPartDone => ResponseContentPartDone);

/// A chunk of model audio, base64-encoded in the session's output format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseAudioDelta {
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub response_id: Option<String>,
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub output_index: Option<u32>,
    #[serde(default)]
    pub content_index: Option<u32>,
    pub delta: String,
}
response_payload!(ResponseAudioDelta => ResponseAudioDelta);

impl ResponseAudioDelta {
    /// Decode the base64 audio chunk.
    pub fn decode_audio(&self) -> std::result::Result<Vec<u8>, base64::DecodeError> {
        BASE64_STANDARD.decode(&self.delta)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseAudioDone {
    #[serde(default)]
    pub event_id: Option<String>,
    pub response_id: String,
    pub item_id: String,
    pub output_index: u32,
    pub content_index: u32,
}
response_payload!(ResponseAudioDone => ResponseAudioDone);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseAudioTranscriptDelta {
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub response_id: Option<String>,
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub output_index: Option<u32>,
    #[serde(default)]
    pub content_index: Option<u32>,
    pub delta: String,
}
response_payload!(ResponseAudioTranscriptDelta => ResponseAudioTranscriptDelta);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseAudioTranscriptDone {
    #[serde(default)]
    pub event_id: Option<String>,
    pub response_id: String,
    pub item_id: String,
    pub output_index: u32,
    pub content_index: u32,
    pub transcript: String,
}
response_payload!(ResponseAudioTranscriptDone => ResponseAudioTranscriptDone);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseTextDelta {
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub response_id: Option<String>,
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub output_index: Option<u32>,
    #[serde(default)]
    pub content_index: Option<u32>,
    pub delta: String,
}
response_payload!(ResponseTextDelta => ResponseTextDelta);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseTextDone {
    #[serde(default)]
    pub event_id: Option<String>,
    pub response_id: String,
    pub item_id: String,
    pub output_index: u32,
    pub content_index: u32,
    pub text: String,
}
response_payload!(ResponseTextDone => ResponseTextDone);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseFunctionCallArgumentsDelta {
    #[serde(default)]
    pub event_id: Option<String>,
    pub response_id: String,
    pub item_id: String,
    pub output_index: u32,
    pub call_id: String,
    pub delta: String,
}
response_payload!(ResponseFunctionCallArgumentsDelta => ResponseFunctionCallArgumentsDelta);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseFunctionCallArgumentsDone {
    #[serde(default)]
    pub event_id: Option<String>,
    pub response_id: String,
    pub item_id: String,
    pub output_index: u32,
    pub call_id: String,
    /// Complete JSON-encoded arguments.
    pub arguments: String,
}
response_payload!(ResponseFunctionCallArgumentsDone => ResponseFunctionCallArgumentsDone);

impl ResponseFunctionCallArgumentsDone {
    /// Parse the accumulated arguments as JSON.
    pub fn parsed_arguments(&self) -> Result<Value> {
        Ok(serde_json::from_str(&self.arguments)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InputAudioBufferSpeechStarted {
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub audio_start_ms: u64,
    #[serde(default)]
    pub item_id: Option<String>,
}
response_payload!(InputAudioBufferSpeechStarted => InputAudioBufferSpeechStarted);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InputAudioBufferSpeechStopped {
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub audio_end_ms: u64,
    #[serde(default)]
    pub item_id: Option<String>,
}
response_payload!(InputAudioBufferSpeechStopped => InputAudioBufferSpeechStopped);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationItemInputAudioTranscriptionCompleted {
    #[serde(default)]
    pub event_id: Option<String>,
    pub item_id: String,
    pub content_index: u32,
    pub transcript: String,
}
response_payload!(
    ConversationItemInputAudioTranscriptionCompleted =>
        ConversationItemInputAudioTranscriptionCompleted
);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationItemInputAudioTranscriptionFailed {
    #[serde(default)]
    pub event_id: Option<String>,
    pub item_id: String,
    pub content_index: u32,
    pub error: ApiErrorDetails,
}
response_payload!(
    ConversationItemInputAudioTranscriptionFailed => ConversationItemInputAudioTranscriptionFailed
);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InputAudioBufferCommitted {
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub previous_item_id: Option<String>,
    pub item_id: String,
}
response_payload!(InputAudioBufferCommitted => InputAudioBufferCommitted);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InputAudioBufferCleared {
    #[serde(default)]
    pub event_id: Option<String>,
}
response_payload!(InputAudioBufferCleared => InputAudioBufferCleared);

/// Server-reported error. Delivered as an event, never raised.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorEvent {
    #[serde(default)]
    pub event_id: Option<String>,
    pub error: ApiErrorDetails,
}
response_payload!(ErrorEvent => Error);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn init_decodes_as_session_updated_shape() {
        let message = json!({
            "type": "session.updated",
            "event_id": "evt_1",
            "session": {"id": "sess_1", "voice": "alloy"}
        });
        let Init(updated) = Init::from_message(&message).unwrap();
        assert_eq!(updated.event_id.as_deref(), Some("evt_1"));
        assert_eq!(updated.session.id.as_deref(), Some("sess_1"));
    }

    #[test]
    fn audio_delta_decodes_payload() {
        let delta = ResponseAudioDelta::from_message(&json!({
            "type": "response.audio.delta",
            "delta": "AAEC"
        }))
        .unwrap();
        assert_eq!(delta.decode_audio().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn error_event_carries_details() {
        let event = ErrorEvent::from_message(&json!({
            "type": "error",
            "error": {"type": "invalid_request_error", "message": "bad item"}
        }))
        .unwrap();
        assert_eq!(event.error.message, "bad item");
        assert_eq!(event.error.error_type.as_deref(), Some("invalid_request_error"));
    }

    #[test]
    fn mismatched_shape_is_a_serialization_error() {
        let message = json!({"type": "conversation.item.deleted"});
        let result = ConversationItemDeleted::from_message(&message);
        assert!(matches!(result, Err(crate::error::RealtimeError::Serialization(_))));
    }

    #[test]
    fn function_call_arguments_parse() {
        let done = ResponseFunctionCallArgumentsDone::from_message(&json!({
            "type": "response.function_call_arguments.done",
            "response_id": "resp_1",
            "item_id": "item_1",
            "output_index": 0,
            "call_id": "call_1",
            "arguments": "{\"city\":\"Paris\"}"
        }))
        .unwrap();
        assert_eq!(done.parsed_arguments().unwrap(), json!({"city": "Paris"}));
    }
}
