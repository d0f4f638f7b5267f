//! Error types for the realtime client.

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

/// Primary error type for all realtime client operations.
///
/// Server-pushed `error` messages are not represented here: they are
/// republished as ordinary `error` events for listeners to handle.
#[derive(Error, Debug)]
pub enum RealtimeError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Stream error: {0}")]
    Stream(String),
}

impl RealtimeError {
    /// Create an API error from an HTTP status.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Whether reconnecting after this error can succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Io(_) | Self::WebSocket(_) | Self::Stream(_) => true,
            Self::Api { status, .. } => matches!(status, 429 | 500..=599),
            _ => false,
        }
    }
}

impl From<WsError> for RealtimeError {
    fn from(error: WsError) -> Self {
        match error {
            WsError::Http(response) => {
                let status = response.status().as_u16();
                if matches!(status, 401 | 403) {
                    Self::Authentication(format!(
                        "Realtime websocket authentication failed with status {status}"
                    ))
                } else {
                    Self::api(
                        status,
                        format!("Realtime websocket handshake failed with status {status}"),
                    )
                }
            }
            WsError::Io(error) => Self::Io(error),
            WsError::Url(error) => {
                Self::Configuration(format!("Invalid realtime websocket URL: {error}"))
            }
            other => Self::WebSocket(other.to_string()),
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, RealtimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display_includes_status() {
        let err = RealtimeError::api(404, "Not found");
        assert_eq!(err.to_string(), "API error (status 404): Not found");
    }

    #[test]
    fn retryable_classification() {
        assert!(RealtimeError::WebSocket("reset".into()).is_retryable());
        assert!(RealtimeError::api(503, "unavailable").is_retryable());
        assert!(RealtimeError::api(429, "slow down").is_retryable());
        assert!(!RealtimeError::api(400, "bad request").is_retryable());
        assert!(!RealtimeError::Authentication("bad key".into()).is_retryable());
        assert!(!RealtimeError::Configuration("no host".into()).is_retryable());
    }

    #[test]
    fn url_errors_map_to_configuration() {
        let err: RealtimeError = WsError::Url(
            tokio_tungstenite::tungstenite::error::UrlError::NoHostName,
        )
        .into();
        assert!(matches!(err, RealtimeError::Configuration(_)));
    }
}
