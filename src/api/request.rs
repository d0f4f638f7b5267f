//! Request command payloads (client → server).

use base64::prelude::*;
use serde::Serialize;
use serde_json::{Map, Value};

use super::commands::RequestCommand;
use super::types::{ConversationItem, ResponseConfig, SessionConfig};
use crate::error::{RealtimeError, Result};

/// A request payload with a statically known command name.
///
/// The payload serializes to a JSON object without its `type` field;
/// [`RequestPayload::to_message`] stamps it.
pub trait RequestPayload: Serialize {
    const COMMAND: RequestCommand;

    /// Build the full wire message (`type` + payload fields).
    fn to_message(&self) -> Result<Value> {
        let mut object = match serde_json::to_value(self)? {
            Value::Object(object) => object,
            Value::Null => Map::new(),
            other => {
                return Err(RealtimeError::InvalidState(format!(
                    "{} payload must serialize to an object, got {other}",
                    Self::COMMAND
                )))
            }
        };
        object.insert("type".into(), Value::String(Self::COMMAND.as_str().into()));
        Ok(Value::Object(object))
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionUpdate {
    pub session: SessionConfig,
}

impl RequestPayload for SessionUpdate {
    const COMMAND: RequestCommand = RequestCommand::SessionUpdate;
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InputAudioBufferAppend {
    /// Base64-encoded audio in the session's input format.
    pub audio: String,
}

impl InputAudioBufferAppend {
    /// Encode raw audio bytes.
    pub fn from_pcm(data: &[u8]) -> Self {
        Self {
            audio: BASE64_STANDARD.encode(data),
        }
    }
}

impl RequestPayload for InputAudioBufferAppend {
    const COMMAND: RequestCommand = RequestCommand::InputAudioBufferAppend;
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct InputAudioBufferCommit {}

impl RequestPayload for InputAudioBufferCommit {
    const COMMAND: RequestCommand = RequestCommand::InputAudioBufferCommit;
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct InputAudioBufferClear {}

impl RequestPayload for InputAudioBufferClear {
    const COMMAND: RequestCommand = RequestCommand::InputAudioBufferClear;
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConversationItemCreate {
    pub item: ConversationItem,
    /// Insert after this item; appended at the end when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_item_id: Option<String>,
}

impl RequestPayload for ConversationItemCreate {
    const COMMAND: RequestCommand = RequestCommand::ConversationItemCreate;
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConversationItemDelete {
    pub item_id: String,
}

impl RequestPayload for ConversationItemDelete {
    const COMMAND: RequestCommand = RequestCommand::ConversationItemDelete;
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConversationItemTruncate {
    pub item_id: String,
    pub content_index: u32,
    pub audio_end_ms: u32,
}

impl RequestPayload for ConversationItemTruncate {
    const COMMAND: RequestCommand = RequestCommand::ConversationItemTruncate;
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ResponseCreate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseConfig>,
}

impl RequestPayload for ResponseCreate {
    const COMMAND: RequestCommand = RequestCommand::ResponseCreate;
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ResponseCancel {}

impl RequestPayload for ResponseCancel {
    const COMMAND: RequestCommand = RequestCommand::ResponseCancel;
}
