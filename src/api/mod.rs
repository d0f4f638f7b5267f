//! Realtime protocol catalog: command names and their payload types.
//!
//! Each request struct implements [`RequestPayload`] and each response
//! struct implements [`ResponsePayload`], tying a command name to exactly
//! one payload shape at compile time.

pub mod commands;
pub mod request;
pub mod response;
pub mod types;

pub use commands::{RequestCommand, ResponseCommand};
pub use request::RequestPayload;
pub use response::ResponsePayload;
pub use types::*;
