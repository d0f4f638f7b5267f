//! Status transitions driven by inbound server events.

use crate::api::ResponseCommand;
use crate::constants::ModelStatus;

/// Effect of one inbound event on the conversational status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Transition {
    pub next: Option<ModelStatus>,
    /// Send `response.cancel` before applying `next`.
    pub cancel_response: bool,
}

impl Transition {
    const NONE: Self = Self {
        next: None,
        cancel_response: false,
    };
}

pub(crate) fn transition(current: ModelStatus, command: &ResponseCommand) -> Transition {
    match command {
        ResponseCommand::InputAudioBufferSpeechStarted => Transition {
            next: Some(ModelStatus::Listening),
            cancel_response: current == ModelStatus::Thinking,
        },
        ResponseCommand::ResponseCreated => Transition {
            next: Some(ModelStatus::Thinking),
            cancel_response: false,
        },
        ResponseCommand::ResponseDone => Transition {
            next: Some(ModelStatus::Speaking),
            cancel_response: false,
        },
        _ => Transition::NONE,
    }
}
