//! Session defaults and the conversational status.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::api::types::{AudioFormat, InputAudioTranscription, SessionConfig, TurnDetection, Voice};

/// Instructions sent when the caller does not override the session.
pub const DEFAULT_INSTRUCTIONS: &str = "Call provided tools if appropriate for the user's input.";

/// Transcription model for input speech.
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";

/// Server VAD activation threshold.
pub const DEFAULT_VAD_THRESHOLD: f64 = 0.4;

/// Server VAD silence before a turn ends, in milliseconds.
pub const DEFAULT_VAD_SILENCE_DURATION_MS: u32 = 600;

/// The session configuration used when none is supplied at construction.
pub fn default_session_config() -> SessionConfig {
    SessionConfig {
        modalities: None,
        instructions: Some(DEFAULT_INSTRUCTIONS.to_string()),
        voice: Some(Voice::Alloy),
        input_audio_format: Some(AudioFormat::Pcm16),
        output_audio_format: None,
        input_audio_transcription: Some(InputAudioTranscription {
            model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
        }),
        turn_detection: Some(TurnDetection::ServerVad {
            threshold: Some(DEFAULT_VAD_THRESHOLD),
            prefix_padding_ms: None,
            silence_duration_ms: Some(DEFAULT_VAD_SILENCE_DURATION_MS),
        }),
        tools: None,
        tool_choice: None,
        temperature: None,
        max_response_output_tokens: None,
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        default_session_config()
    }
}

/// Coarse conversational status of the model.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ModelStatus {
    /// Nothing in progress.
    #[default]
    Idle,
    /// The user is speaking.
    Listening,
    /// A response is being generated.
    Thinking,
    /// Response audio has been delivered and may still be playing locally.
    Speaking,
}
