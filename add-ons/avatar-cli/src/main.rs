//! Avatar terminal front end.
//!
//! Typed lines become text turns. Slash commands drive the rest of the widget:
//!
//! ```text
//! /voice <words>   speak <words> into the scripted microphone and start a voice turn
//! /mic             press the mic button (starts a turn, or stops the one in flight)
//! /stop            cancel the current turn
//! /volume <0..1>   set playback volume
//! /lang <pt|en|fr> switch language
//! /a11y <on|off>   accessibility mode
//! /open /close     show or hide the text box
//! /clear           clear the conversation (shows the welcome message)
//! /status          print orchestrator state
//! /quit
//! ```

use avatar_core::{AvatarConfig, ChatRole, Language};
use avatar_voice::{
    ConsoleSynthesizer, ConversationView, HttpCompletionGateway, OrchestratorEvent,
    OrchestratorHandle, ScriptedRecognizer, TurnOrchestrator, TurnOutcome, VoiceError,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

enum Flow {
    Continue,
    Quit,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Load .env file if present (before any env::var calls)
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[avatar] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AvatarConfig::load()?;
    let gateway = Arc::new(HttpCompletionGateway::from_config(&config)?);
    let recognizer = Arc::new(ScriptedRecognizer::new());
    let synthesizer = Arc::new(ConsoleSynthesizer::new());

    tracing::info!(
        gateway = %gateway.base_url,
        language = %config.language,
        accessibility = config.accessibility_mode,
        "avatar started"
    );

    let mut view = ConversationView::new(config.language);
    view.volume = config.volume;
    view.accessibility_mode = config.accessibility_mode;

    let (handle, task) =
        TurnOrchestrator::new(config, recognizer.clone(), synthesizer, gateway).spawn();
    let mut events = handle.subscribe();

    view.open_chat();
    render_history(&view);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => {
                    let flow = handle_line(line.trim(), &handle, &recognizer, &mut view).await;
                    if let Flow::Quit = flow {
                        break;
                    }
                }
                None => break,
            },
            event = events.recv() => match event {
                Ok(event) => {
                    view.apply(&event);
                    render_event(&event, &view);
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event display fell behind");
                }
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("CTRL-C received; shutting down");
                break;
            }
        }
    }

    if let Err(e) = handle.shutdown() {
        tracing::debug!(error = %e, "orchestrator already stopped");
    }
    task.await?;
    Ok(())
}

/// Problems with a typed line, and orchestrator failures while acting on it.
#[derive(Debug, Error)]
enum CliError {
    #[error("{0}")]
    Input(String),

    #[error(transparent)]
    Voice(#[from] VoiceError),
}

async fn handle_line(
    line: &str,
    handle: &OrchestratorHandle,
    recognizer: &ScriptedRecognizer,
    view: &mut ConversationView,
) -> Flow {
    match run_line(line, handle, recognizer, view).await {
        Ok(flow) => flow,
        Err(e) => {
            println!("⚠️  {}", e);
            Flow::Continue
        }
    }
}

async fn run_line(
    line: &str,
    handle: &OrchestratorHandle,
    recognizer: &ScriptedRecognizer,
    view: &mut ConversationView,
) -> Result<Flow, CliError> {
    if line.is_empty() {
        return Ok(Flow::Continue);
    }
    let (command, arg) = match line.split_once(char::is_whitespace) {
        Some((c, a)) => (c, a.trim()),
        None => (line, ""),
    };

    match command {
        "/quit" | "/exit" => return Ok(Flow::Quit),
        "/voice" => {
            if !arg.is_empty() {
                recognizer.push_transcript(arg);
            }
            handle.start_voice_turn()?;
        }
        "/mic" => handle.start_voice_turn()?,
        "/stop" => handle.cancel()?,
        "/volume" => {
            let volume = arg
                .parse::<f32>()
                .map_err(|_| CliError::Input(format!("not a volume: {:?}", arg)))?;
            handle.set_volume(volume)?;
        }
        "/lang" => {
            let language = arg
                .parse::<Language>()
                .map_err(|_| CliError::Input(format!("unknown language: {:?}", arg)))?;
            handle.set_language(language)?;
        }
        "/a11y" => match arg {
            "on" => handle.set_accessibility_mode(true)?,
            "off" => handle.set_accessibility_mode(false)?,
            _ => return Err(CliError::Input("use /a11y on|off".to_string())),
        },
        "/open" => {
            view.open_chat();
            render_history(view);
        }
        "/close" => view.close_chat(),
        "/clear" => {
            view.clear_chat(true);
            render_history(view);
        }
        "/status" => {
            let s = handle.snapshot().await?;
            println!(
                "phase={:?} listening={} processing={} volume={:.2} language={} a11y={} emotion={}",
                s.phase,
                s.listening,
                s.processing,
                s.volume,
                s.language,
                s.accessibility_mode,
                view.emotion
            );
        }
        _ if command.starts_with('/') => {
            return Err(CliError::Input(format!("unknown command: {}", command)));
        }
        _ => {
            if !view.text_box_open {
                view.open_chat();
            }
            handle.submit_text_turn(line)?;
        }
    }
    Ok(Flow::Continue)
}

fn render_history(view: &ConversationView) {
    for entry in &view.history {
        print_entry(entry.role, &entry.message);
    }
}

fn print_entry(role: ChatRole, message: &str) {
    match role {
        ChatRole::User => println!("👤 {}", message),
        ChatRole::Avatar => println!("🤖 Maria: {}", message),
    }
}

fn render_event(event: &OrchestratorEvent, view: &ConversationView) {
    match event {
        OrchestratorEvent::HistoryAppended(entry) => print_entry(entry.role, &entry.message),
        OrchestratorEvent::EmotionChanged(emotion) => println!("   ({})", emotion),
        OrchestratorEvent::ListeningChanged(true) => println!("🎤 listening..."),
        OrchestratorEvent::ProcessingChanged(true) if !view.listening => println!("…"),
        OrchestratorEvent::Announcement(text) => println!("📢 {}", text),
        OrchestratorEvent::VolumeChanged(volume) => println!("🔊 volume {:.2}", volume),
        OrchestratorEvent::LanguageChanged(language) => {
            println!("🌐 {}", language.label());
            if view.shows_only_welcome() {
                render_history(view);
            }
        }
        OrchestratorEvent::AccessibilityChanged(enabled) => {
            println!("♿ accessibility {}", if *enabled { "on" } else { "off" })
        }
        OrchestratorEvent::TurnEnded { turn, outcome } => match outcome {
            TurnOutcome::Failed(failure) => println!("⚠️  {}: {}", turn, failure),
            TurnOutcome::Recovered { error, .. } => {
                tracing::debug!(turn = %turn, error = %error, "turn recovered")
            }
            TurnOutcome::Cancelled => println!("⏹  stopped"),
            TurnOutcome::Completed(_) => {}
        },
        other => tracing::debug!(event = ?other, "event"),
    }
}
