//! Client configuration (explicit values or environment).

use std::fmt;

use bon::Builder;

use crate::api::types::SessionConfig;
use crate::error::{RealtimeError, Result};

/// API version used when `AZURE_OPENAI_API_VERSION` is not set.
pub const DEFAULT_API_VERSION: &str = "2024-10-01-preview";

const ENV_HOST: &str = "AZURE_OPENAI_HOST";
const ENV_API_VERSION: &str = "AZURE_OPENAI_API_VERSION";
const ENV_DEPLOYMENT: &str = "AZURE_OPENAI_DEPLOYMENT";
const ENV_API_KEY: &str = "AZURE_OPENAI_API_KEY";

/// Connection options for [`crate::AzureRealtimeAudio`].
///
/// ```
/// use azure_realtime_audio::config::ClientOptions;
///
/// let options = ClientOptions::builder()
///     .host_name("my-resource.openai.azure.com")
///     .api_version("2024-10-01-preview")
///     .deployment("gpt-4o-realtime-preview")
///     .api_key("secret")
///     .build();
/// assert!(options.endpoint_url().starts_with("wss://my-resource.openai.azure.com/"));
/// ```
#[derive(Clone, Builder)]
#[builder(on(String, into))]
pub struct ClientOptions {
    /// Resource host, e.g. `my-resource.openai.azure.com`.
    pub host_name: String,
    pub api_version: String,
    /// Model deployment name configured in Azure OpenAI.
    pub deployment: String,
    pub api_key: String,
    /// Session sent on every open; the built-in defaults when `None`.
    pub session_config: Option<SessionConfig>,
    /// `wss` when true, plain `ws` otherwise (local servers only).
    #[builder(default = true)]
    pub use_tls: bool,
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("host_name", &self.host_name)
            .field("api_version", &self.api_version)
            .field("deployment", &self.deployment)
            .field("api_key", &"<redacted>")
            .field("session_config", &self.session_config)
            .field("use_tls", &self.use_tls)
            .finish()
    }
}

impl ClientOptions {
    /// Load from environment variables, reading `.env` first if present.
    ///
    /// `AZURE_OPENAI_HOST`, `AZURE_OPENAI_DEPLOYMENT` and
    /// `AZURE_OPENAI_API_KEY` are required; `AZURE_OPENAI_API_VERSION`
    /// defaults to [`DEFAULT_API_VERSION`].
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let host_name = read(ENV_HOST)
            .ok_or_else(|| RealtimeError::Configuration(format!("Missing {ENV_HOST}")))?;
        let deployment = read(ENV_DEPLOYMENT)
            .ok_or_else(|| RealtimeError::Configuration(format!("Missing {ENV_DEPLOYMENT}")))?;
        let api_key = read(ENV_API_KEY)
            .ok_or_else(|| RealtimeError::Authentication(format!("Missing {ENV_API_KEY}")))?;
        let api_version = read(ENV_API_VERSION).unwrap_or_else(|| DEFAULT_API_VERSION.to_string());

        Ok(Self {
            host_name,
            api_version,
            deployment,
            api_key,
            session_config: None,
            use_tls: true,
        })
    }

    /// Replace the session configuration sent on open.
    pub fn with_session_config(mut self, session_config: SessionConfig) -> Self {
        self.session_config = Some(session_config);
        self
    }

    /// The session configuration that will actually be sent.
    pub fn effective_session_config(&self) -> SessionConfig {
        self.session_config.clone().unwrap_or_default()
    }

    /// Reject options that cannot produce a usable URL.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("host name", &self.host_name),
            ("API version", &self.api_version),
            ("deployment", &self.deployment),
        ];
        for (label, value) in required {
            if value.trim().is_empty() {
                return Err(RealtimeError::Configuration(format!(
                    "Realtime {label} cannot be empty"
                )));
            }
        }
        if self.api_key.trim().is_empty() {
            return Err(RealtimeError::Authentication("Realtime API key cannot be empty".into()));
        }
        Ok(())
    }

    /// `wss://<host>/openai/realtime?api-version=..&deployment=..&api-key=..`
    pub fn endpoint_url(&self) -> String {
        let scheme = if self.use_tls { "wss" } else { "ws" };
        let host = normalize_host(&self.host_name);
        let query = format!(
            "api-version={version}&deployment={deployment}&api-key={key}",
            version = self.api_version,
            deployment = self.deployment,
            key = self.api_key,
        );
        format!("{scheme}://{host}/openai/realtime?{query}")
    }
}

/// Accept `https://host/` style input as well as a bare host.
fn normalize_host(host: &str) -> &str {
    let trimmed = host.trim();
    let without_scheme = ["https://", "http://", "wss://", "ws://"]
        .iter()
        .find_map(|prefix| trimmed.strip_prefix(prefix))
        .unwrap_or(trimmed);
    without_scheme.trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn options() -> ClientOptions {
        ClientOptions::builder()
            .host_name("res.openai.azure.com")
            .api_version("2024-10-01-preview")
            .deployment("rt")
            .api_key("k3y")
            .build()
    }

    fn lookup_in<'a>(vars: &'a HashMap<&str, &str>) -> impl Fn(&str) -> Option<String> + 'a {
        move |name: &str| vars.get(name).map(|value| value.to_string())
    }

    #[test]
    fn endpoint_url_embeds_query_parameters() {
        assert_eq!(
            options().endpoint_url(),
            concat!(
                "wss://res.openai.azure.com/openai/realtime",
                "?api-version=2024-10-01-preview&deployment=rt&api-key=k3y"
            )
        );
    }

    #[test]
    fn endpoint_url_tolerates_scheme_and_trailing_slash() {
        let mut opts = options();
        opts.host_name = "https://res.openai.azure.com/".into();
        assert!(opts.endpoint_url().starts_with("wss://res.openai.azure.com/openai/realtime?"));

        opts.use_tls = false;
        assert!(opts.endpoint_url().starts_with("ws://res.openai.azure.com/"));
    }

    #[test]
    fn debug_redacts_api_key() {
        let rendered = format!("{:?}", options());
        assert!(!rendered.contains("k3y"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn from_lookup_applies_default_api_version() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("AZURE_OPENAI_HOST", "res.openai.azure.com"),
            ("AZURE_OPENAI_DEPLOYMENT", "rt"),
            ("AZURE_OPENAI_API_KEY", "k3y"),
        ]);
        let opts = ClientOptions::from_lookup(lookup_in(&vars)).unwrap();
        assert_eq!(opts.api_version, DEFAULT_API_VERSION);
        assert_eq!(opts.deployment, "rt");
        assert!(opts.session_config.is_none());
    }

    #[test]
    fn from_lookup_reports_missing_values() {
        let err = ClientOptions::from_lookup(|_| None).unwrap_err();
        assert!(matches!(
            err,
            RealtimeError::Configuration(ref m) if m.contains("AZURE_OPENAI_HOST")
        ));

        let vars: HashMap<&str, &str> = HashMap::from([
            ("AZURE_OPENAI_HOST", "res.openai.azure.com"),
            ("AZURE_OPENAI_DEPLOYMENT", "rt"),
            ("AZURE_OPENAI_API_KEY", "   "),
        ]);
        let err = ClientOptions::from_lookup(lookup_in(&vars)).unwrap_err();
        assert!(matches!(err, RealtimeError::Authentication(_)));
    }

    #[test]
    fn validate_rejects_empty_fields() {
        let mut opts = options();
        assert!(opts.validate().is_ok());
        opts.deployment = " ".into();
        assert!(matches!(opts.validate(), Err(RealtimeError::Configuration(_))));
    }

    #[test]
    fn effective_session_falls_back_to_defaults() {
        let opts = options();
        assert_eq!(opts.effective_session_config(), SessionConfig::default());

        let custom = SessionConfig::builder().instructions("be brief".to_string()).build();
        let opts = opts.with_session_config(custom.clone());
        assert_eq!(opts.effective_session_config(), custom);
    }
}
