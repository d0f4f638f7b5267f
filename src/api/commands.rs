//! Request and response command names.

use std::fmt;
use std::str::FromStr;

use strum::{EnumIter, EnumString, IntoStaticStr};

/// Commands sent from the client to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, IntoStaticStr, EnumIter)]
pub enum RequestCommand {
    #[strum(serialize = "session.update")]
    SessionUpdate,
    #[strum(serialize = "input_audio_buffer.append")]
    InputAudioBufferAppend,
    #[strum(serialize = "input_audio_buffer.commit")]
    InputAudioBufferCommit,
    #[strum(serialize = "input_audio_buffer.clear")]
    InputAudioBufferClear,
    #[strum(serialize = "conversation.item.create")]
    ConversationItemCreate,
    #[strum(serialize = "conversation.item.delete")]
    ConversationItemDelete,
    #[strum(serialize = "conversation.item.truncate")]
    ConversationItemTruncate,
    #[strum(serialize = "response.create")]
    ResponseCreate,
    #[strum(serialize = "response.cancel")]
    ResponseCancel,
}

impl RequestCommand {
    /// Wire value of the `type` field.
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

impl fmt::Display for RequestCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events delivered from the server, plus the synthetic `init` event.
///
/// Messages whose `type` is not part of the published protocol are still
/// delivered, under [`ResponseCommand::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumString, EnumIter)]
pub enum ResponseCommand {
    /// Fired once, for the first `session.updated` message of a client.
    #[strum(serialize = "init")]
    Init,
    #[strum(serialize = "session.created")]
    SessionCreated,
    #[strum(serialize = "session.updated")]
    SessionUpdated,
    #[strum(serialize = "conversation.item.created")]
    ConversationItemCreated,
    #[strum(serialize = "conversation.item.deleted")]
    ConversationItemDeleted,
    #[strum(serialize = "conversation.item.truncated")]
    ConversationItemTruncated,
    #[strum(serialize = "response.created")]
    ResponseCreated,
    #[strum(serialize = "response.done")]
    ResponseDone,
    #[strum(serialize = "rate_limits.updated")]
    RateLimitsUpdated,
    #[strum(serialize = "response.output_item.added")]
    ResponseOutputItemAdded,
    #[strum(serialize = "response.output_item.done")]
    ResponseOutputItemDone,
    #[strum(serialize = "response.content_part.added")]
    ResponseContentPartAdded,
    #[strum(serialize = "response.content_part.done")]
    ResponseContentPartDone,
    #[strum(serialize = "response.audio.delta")]
    ResponseAudioDelta,
    #[strum(serialize = "response.audio.done")]
    ResponseAudioDone,
    #[strum(serialize = "response.audio_transcript.delta")]
    ResponseAudioTranscriptDelta,
    #[strum(serialize = "response.audio_transcript.done")]
    ResponseAudioTranscriptDone,
    #[strum(serialize = "response.text.delta")]
    ResponseTextDelta,
    #[strum(serialize = "response.text.done")]
    ResponseTextDone,
    #[strum(serialize = "response.function_call_arguments.delta")]
    ResponseFunctionCallArgumentsDelta,
    #[strum(serialize = "response.function_call_arguments.done")]
    ResponseFunctionCallArgumentsDone,
    #[strum(serialize = "input_audio_buffer.speech_started")]
    InputAudioBufferSpeechStarted,
    #[strum(serialize = "input_audio_buffer.speech_stopped")]
    InputAudioBufferSpeechStopped,
    #[strum(serialize = "conversation.item.input_audio_transcription.completed")]
    ConversationItemInputAudioTranscriptionCompleted,
    #[strum(serialize = "conversation.item.input_audio_transcription.failed")]
    ConversationItemInputAudioTranscriptionFailed,
    #[strum(serialize = "input_audio_buffer.committed")]
    InputAudioBufferCommitted,
    #[strum(serialize = "input_audio_buffer.cleared")]
    InputAudioBufferCleared,
    #[strum(serialize = "error")]
    Error,
    /// Unknown event type, carried verbatim.
    #[strum(default)]
    Other(String),
}

impl ResponseCommand {
    /// Wire value of the `type` field (or the event name for `init`).
    pub fn as_str(&self) -> &str {
        match self {
            Self::Init => "init",
            Self::SessionCreated => "session.created",
            Self::SessionUpdated => "session.updated",
            Self::ConversationItemCreated => "conversation.item.created",
            Self::ConversationItemDeleted => "conversation.item.deleted",
            Self::ConversationItemTruncated => "conversation.item.truncated",
            Self::ResponseCreated => "response.created",
            Self::ResponseDone => "response.done",
            Self::RateLimitsUpdated => "rate_limits.updated",
            Self::ResponseOutputItemAdded => "response.output_item.added",
            Self::ResponseOutputItemDone => "response.output_item.done",
            Self::ResponseContentPartAdded => "response.content_part.added",
            Self::ResponseContentPartDone => "response.content_part.done",
            Self::ResponseAudioDelta => "response.audio.delta",
            Self::ResponseAudioDone => "response.audio.done",
            Self::ResponseAudioTranscriptDelta => "response.audio_transcript.delta",
            Self::ResponseAudioTranscriptDone => "response.audio_transcript.done",
            Self::ResponseTextDelta => "response.text.delta",
            Self::ResponseTextDone => "response.text.done",
            Self::ResponseFunctionCallArgumentsDelta => "response.function_call_arguments.delta",
            Self::ResponseFunctionCallArgumentsDone => "response.function_call_arguments.done",
            Self::InputAudioBufferSpeechStarted => "input_audio_buffer.speech_started",
            Self::InputAudioBufferSpeechStopped => "input_audio_buffer.speech_stopped",
            Self::ConversationItemInputAudioTranscriptionCompleted => {
                "conversation.item.input_audio_transcription.completed"
            }
            Self::ConversationItemInputAudioTranscriptionFailed => {
                "conversation.item.input_audio_transcription.failed"
            }
            Self::InputAudioBufferCommitted => "input_audio_buffer.committed",
            Self::InputAudioBufferCleared => "input_audio_buffer.cleared",
            Self::Error => "error",
            Self::Other(name) => name,
        }
    }

    /// Resolve an inbound `type` string. Never fails.
    pub fn from_wire(value: &str) -> Self {
        Self::from_str(value).unwrap_or_else(|_| Self::Other(value.to_string()))
    }
}

impl fmt::Display for ResponseCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for ResponseCommand {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn request_commands_round_trip_through_wire_names() {
        for command in RequestCommand::iter() {
            assert_eq!(command.as_str().parse::<RequestCommand>().ok(), Some(command));
        }
        assert_eq!(RequestCommand::iter().count(), 9);
    }

    #[test]
    fn response_commands_round_trip_through_wire_names() {
        let known = ResponseCommand::iter().filter(|c| !matches!(c, ResponseCommand::Other(_)));
        for command in known {
            assert_eq!(ResponseCommand::from_wire(command.as_str()), command);
        }
    }

    #[test]
    fn try_from_resolves_wire_names() {
        assert_eq!(
            ResponseCommand::try_from("response.done").unwrap(),
            ResponseCommand::ResponseDone
        );
        assert_eq!(
            ResponseCommand::try_from("vendor.event").unwrap(),
            ResponseCommand::Other("vendor.event".into())
        );
        assert_eq!(
            RequestCommand::try_from("response.cancel").unwrap(),
            RequestCommand::ResponseCancel
        );
    }

    #[test]
    fn unknown_response_type_is_carried_verbatim() {
        let command = ResponseCommand::from_wire("response.audio.flushed");
        assert_eq!(command, ResponseCommand::Other("response.audio.flushed".into()));
        assert_eq!(command.to_string(), "response.audio.flushed");
    }

    #[test]
    fn display_matches_wire_name() {
        assert_eq!(RequestCommand::ResponseCancel.to_string(), "response.cancel");
        assert_eq!(
            ResponseCommand::InputAudioBufferSpeechStarted.to_string(),
            "input_audio_buffer.speech_started"
        );
    }
}
