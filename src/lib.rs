//! Azure OpenAI realtime audio client.
//!
//! A thin client for the Azure OpenAI Realtime API. It opens a WebSocket to
//! a realtime deployment, bootstraps the session with `session.update`,
//! republishes every server event to listeners by name and tracks a coarse
//! conversational status (`idle`, `listening`, `thinking`, `speaking`).
//! User speech that starts while a response is being generated cancels
//! that response.
//!
//! # Quick Start
//!
//! ```no_run
//! use azure_realtime_audio::prelude::*;
//! use azure_realtime_audio::api::response::ResponseTextDelta;
//!
//! # async fn example() -> azure_realtime_audio::error::Result<()> {
//! let client = AzureRealtimeAudio::new(ClientOptions::from_env()?)?;
//! client.wait_until_initialized().await?;
//!
//! client.on_payload::<ResponseTextDelta, _>(|event| print!("{}", event.delta));
//! client.create_conversation_item(ConversationItem::user_text("Hello!"), None)?;
//! client.create_response(None)?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod prelude;
pub mod transport;

#[cfg(feature = "cli")]
pub mod cli;

pub use client::AzureRealtimeAudio;
