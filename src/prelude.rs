//! Convenience re-exports for common use.

pub use crate::api::request::RequestPayload;
pub use crate::api::response::ResponsePayload;
pub use crate::api::{
    ConversationItem, Modality, RequestCommand, ResponseCommand, ResponseConfig, SessionConfig,
    TurnDetection, Voice,
};
pub use crate::client::{AzureRealtimeAudio, EventStream, ListenerId};
pub use crate::config::ClientOptions;
pub use crate::constants::ModelStatus;
pub use crate::error::{RealtimeError, Result};
pub use crate::transport::{ConnectionState, TransportOptions};
