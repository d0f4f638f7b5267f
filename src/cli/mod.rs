//! Command-line interface for the realtime client.

use clap::{Parser, Subcommand};

use crate::api::Voice;
use crate::error::RealtimeError;

/// Azure OpenAI realtime CLI
#[derive(Parser, Debug)]
#[command(name = "azure-realtime", version, about = "Azure OpenAI realtime client")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send one prompt and print the reply
    Chat(ChatArgs),
}

/// Arguments for the `chat` subcommand.
#[derive(Parser, Debug)]
pub struct ChatArgs {
    /// User prompt
    pub prompt: String,

    /// Ask for a text-only reply instead of audio with transcript
    #[arg(long)]
    pub text_only: bool,

    /// Session instructions (overrides the default)
    #[arg(short, long)]
    pub instructions: Option<String>,

    /// Output voice (alloy, ash, ballad, coral, echo, sage, shimmer, verse)
    #[arg(long)]
    pub voice: Option<Voice>,

    /// Seconds to wait for the session and the reply
    #[arg(long, default_value_t = 60)]
    pub timeout: u64,
}

/// Map a [`RealtimeError`] to a user-facing message with a hint.
pub fn format_error_help(err: &RealtimeError) -> String {
    match err {
        RealtimeError::Authentication(msg) => {
            format!("Authentication failed: {msg}. Check AZURE_OPENAI_API_KEY")
        }
        RealtimeError::Configuration(msg) => {
            format!("Configuration error: {msg}. Check your .env or AZURE_OPENAI_* variables")
        }
        RealtimeError::Api { status: 404, .. } => {
            format!("{err}. Check AZURE_OPENAI_DEPLOYMENT and AZURE_OPENAI_API_VERSION")
        }
        other => format!("{other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_parses_prompt_and_flags() {
        let argv = ["azure-realtime", "chat", "hello", "--text-only", "--voice", "echo"];
        let cli = Cli::try_parse_from(argv).unwrap();
        let Commands::Chat(args) = cli.command;
        assert_eq!(args.prompt, "hello");
        assert!(args.text_only);
        assert_eq!(args.voice, Some(Voice::Echo));
        assert_eq!(args.timeout, 60);
    }

    #[test]
    fn chat_requires_prompt() {
        assert!(Cli::try_parse_from(["azure-realtime", "chat"]).is_err());
    }

    #[test]
    fn authentication_error_points_at_api_key() {
        let help = format_error_help(&RealtimeError::Authentication("status 401".into()));
        assert!(help.contains("AZURE_OPENAI_API_KEY"));
    }

    #[test]
    fn not_found_points_at_deployment() {
        let help = format_error_help(&RealtimeError::api(404, "handshake failed"));
        assert!(help.contains("AZURE_OPENAI_DEPLOYMENT"));
    }

    #[test]
    fn other_errors_fall_through_to_display() {
        let help = format_error_help(&RealtimeError::WebSocket("reset".into()));
        assert!(help.contains("reset"));
    }
}
