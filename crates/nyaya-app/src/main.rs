//! Nyaya application binary - composition root.
//!
//! Ties the workspace crates into a single executable:
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Initialize tracing
//! 3. Build the HTTP backend and the speech adapters for this platform
//! 4. Run the interactive chat loop over stdin/stdout
//!
//! A terminal offers no native speech engines, so the unavailable adapters
//! are wired in; platforms with engines inject their own implementations of
//! the `nyaya-speech` traits instead.

use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use nyaya_backend::{HttpBackend, LegalBackend};
use nyaya_chat::{
    suggested_questions, ConversationSession, MessageOrigin, SessionConfig, LEGAL_TOPICS,
};
use nyaya_core::error::Result;
use nyaya_core::NyayaConfig;
use nyaya_speech::{
    SpeechRecognizer, SpeechSynthesizer, UnavailableRecognizer, UnavailableSynthesizer,
};

mod cli;
use cli::CliArgs;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    let config_path = args.resolve_config_path();
    let config = NyayaConfig::load_or_default(&config_path);

    let log_level = args
        .resolve_log_level()
        .unwrap_or_else(|| config.general.log_level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let endpoint = args.resolve_endpoint(&config.backend.endpoint);
    tracing::info!(endpoint = %endpoint, "Nyaya starting");

    let backend: Arc<dyn LegalBackend> = Arc::new(HttpBackend::new(endpoint));
    let recognizer: Arc<dyn SpeechRecognizer> = Arc::new(UnavailableRecognizer);
    let synthesizer: Arc<dyn SpeechSynthesizer> = Arc::new(UnavailableSynthesizer);

    let session = Arc::new(ConversationSession::new(
        backend,
        recognizer,
        synthesizer,
        SessionConfig::from(&config),
    ));

    if args.no_voice && session.is_voice_output_enabled() {
        session.toggle_voice_output();
    }

    run_chat_loop(session).await
}

/// Line-oriented chat loop. Plain lines are sent; `:`-prefixed lines are
/// local commands.
async fn run_chat_loop(session: Arc<ConversationSession>) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout
        .write_all(b"Nyaya legal assistant. Ask about Indian law, or :help for commands.\n")
        .await?;
    stdout.flush().await?;

    loop {
        stdout.write_all(b"you> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix(':') {
            if !handle_command(&session, command, &mut stdout).await? {
                break;
            }
            continue;
        }

        let composed = session.compose_input(&line);
        match session.send_message(&composed, MessageOrigin::Typed).await {
            Ok(()) => print_last_reply(&session, &mut stdout).await?,
            Err(e) => {
                stdout
                    .write_all(format!("! {}\n", e).as_bytes())
                    .await?;
            }
        }
    }

    tracing::info!("Nyaya exiting");
    Ok(())
}

/// Handle one `:command`. Returns false when the loop should end.
async fn handle_command(
    session: &Arc<ConversationSession>,
    command: &str,
    stdout: &mut tokio::io::Stdout,
) -> Result<bool> {
    let (name, rest) = match command.split_once(' ') {
        Some((name, rest)) => (name, rest.trim()),
        None => (command, ""),
    };

    match name {
        "quit" | "exit" => return Ok(false),
        "clear" => {
            session.clear_messages();
            stdout.write_all(b"Conversation cleared.\n").await?;
        }
        "topics" => {
            for topic in LEGAL_TOPICS {
                stdout.write_all(format!("  {}\n", topic).as_bytes()).await?;
            }
        }
        "topic" => {
            if rest.is_empty() {
                session.set_topic(None);
                stdout.write_all(b"Topic cleared.\n").await?;
            } else {
                session.set_topic(Some(rest.to_string()));
                stdout
                    .write_all(format!("Next question will be tagged [{}].\n", rest).as_bytes())
                    .await?;
            }
        }
        "questions" => {
            let topic = session.active_topic();
            for question in suggested_questions(topic.as_deref(), 4) {
                stdout
                    .write_all(format!("  {}\n", question).as_bytes())
                    .await?;
            }
        }
        "voice" => {
            let enabled = session.toggle_voice_output();
            let status = if enabled { "enabled" } else { "disabled" };
            stdout
                .write_all(format!("Voice output {}.\n", status).as_bytes())
                .await?;
        }
        "help" => {
            stdout
                .write_all(
                    b"Commands: :topic <name>, :topic, :topics, :questions, :clear, :voice, :quit\n",
                )
                .await?;
        }
        other => {
            stdout
                .write_all(format!("Unknown command: {}\n", other).as_bytes())
                .await?;
        }
    }
    Ok(true)
}

/// Print the newest assistant turn and any speech-subsystem error.
async fn print_last_reply(
    session: &Arc<ConversationSession>,
    stdout: &mut tokio::io::Stdout,
) -> Result<()> {
    if let Some(reply) = session.messages().last() {
        let marker = if reply.is_error {
            " [offline fallback]"
        } else if reply.is_fallback {
            " [general guidance]"
        } else {
            ""
        };
        stdout
            .write_all(format!("nyaya>{} {}\n", marker, reply.text).as_bytes())
            .await?;
    }
    if let Some(error) = session.error() {
        stdout.write_all(format!("! {}\n", error).as_bytes()).await?;
    }
    Ok(())
}
