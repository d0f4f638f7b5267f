//! azure-realtime binary entry point.

use std::io::Write;
use std::time::Duration;

use clap::Parser;
use futures::StreamExt;
use tokio::time;
use tracing_subscriber::EnvFilter;

use azure_realtime_audio::api::response::{
    ErrorEvent, ResponseAudioTranscriptDelta, ResponseTextDelta,
};
use azure_realtime_audio::api::{
    ConversationItem, Modality, ResponseCommand, ResponseConfig, SessionConfig,
};
use azure_realtime_audio::cli::{format_error_help, ChatArgs, Cli, Commands};
use azure_realtime_audio::config::ClientOptions;
use azure_realtime_audio::error::{RealtimeError, Result};
use azure_realtime_audio::transport::ConnectionState;
use azure_realtime_audio::AzureRealtimeAudio;

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Chat(args) => handle_chat(args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", format_error_help(&e));
        std::process::exit(1);
    }
}

async fn handle_chat(args: ChatArgs) -> Result<()> {
    let mut session = SessionConfig::default();
    if let Some(instructions) = args.instructions {
        session.instructions = Some(instructions);
    }
    if let Some(voice) = args.voice {
        session.voice = Some(voice);
    }

    let options = ClientOptions::from_env()?.with_session_config(session);
    let client = AzureRealtimeAudio::new(options)?;
    let limit = Duration::from_secs(args.timeout);

    match time::timeout(limit, client.wait_until_initialized()).await {
        Ok(Ok(())) => {}
        Ok(Err(_)) | Err(_) => {
            return Err(stalled(&client, "waiting for the realtime session"));
        }
    }

    client.on_payload::<ResponseTextDelta, _>(|event| print_delta(&event.delta));
    client.on_payload::<ResponseAudioTranscriptDelta, _>(|event| print_delta(&event.delta));
    client.on_payload::<ErrorEvent, _>(|event| {
        eprintln!("\nServer error: {}", event.error.message)
    });
    let mut done = client.events(ResponseCommand::ResponseDone);

    client.create_conversation_item(ConversationItem::user_text(args.prompt), None)?;
    let response = args
        .text_only
        .then(|| ResponseConfig::builder().modalities(vec![Modality::Text]).build());
    client.create_response(response)?;

    let finished = time::timeout(limit, done.next()).await;
    println!();
    let outcome = match finished {
        Ok(Some(_)) => Ok(()),
        Ok(None) | Err(_) => Err(stalled(&client, "waiting for the reply")),
    };
    client.close();
    outcome
}

fn print_delta(delta: &str) {
    print!("{delta}");
    let _ = std::io::stdout().flush();
}

fn stalled(client: &AzureRealtimeAudio, what: &str) -> RealtimeError {
    if client.state() == ConnectionState::Closed {
        RealtimeError::Stream(format!(
            "Connection closed while {what}; rerun with RUST_LOG=debug for details"
        ))
    } else {
        RealtimeError::Stream(format!("Timed out {what}"))
    }
}
