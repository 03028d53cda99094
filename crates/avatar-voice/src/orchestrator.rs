//! **TurnOrchestrator**: the state machine that sequences one conversation turn.
//!
//! ```text
//! Idle → Capturing → AwaitingReply → Speaking → Idle      (voice)
//! Idle ─────────────→ AwaitingReply → Speaking → Idle      (text)
//! ```
//!
//! A single actor task owns every device and all turn state. UI commands arrive on an
//! mpsc channel; capture results, gateway replies and playback completions come back
//! from spawned tasks tagged with their turn (or utterance) id, so a result that
//! belongs to a superseded turn is dropped instead of applied.

use crate::capture::{CaptureAbort, RecognitionConfig, SpeechCaptureSession, SpeechRecognizer};
use crate::error::{GatewayError, RecognitionFailure, VoiceError, VoiceResult};
use crate::events::{
    OrchestratorEvent, OrchestratorSnapshot, Turn, TurnFailure, TurnId, TurnKind, TurnOutcome,
    TurnPhase,
};
use crate::gateway::{ChatReply, ChatRequest, CompletionGateway};
use crate::playback::{
    PlaybackController, PlaybackTicket, SpeechSynthesizer, UtteranceEnd, UtteranceId,
};
use avatar_core::{classify, resolve, AvatarConfig, ChatEntry, Emotion, Language, Persona};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Commands accepted by the actor.
#[derive(Debug)]
pub enum OrchestratorCommand {
    StartVoiceTurn,
    SubmitText(String),
    Cancel,
    SetVolume(f32),
    SetLanguage(Language),
    SetAccessibilityMode(bool),
    Snapshot(oneshot::Sender<OrchestratorSnapshot>),
    Shutdown,
}

/// Results posted back by the tasks a turn spawns.
#[derive(Debug)]
enum Internal {
    Captured {
        turn: TurnId,
        result: VoiceResult<String>,
    },
    Replied {
        turn: TurnId,
        result: Result<ChatReply, GatewayError>,
    },
    PlaybackEnded {
        utterance: UtteranceId,
        end: UtteranceEnd,
    },
}

/// Cloneable front door to a running orchestrator.
#[derive(Clone)]
pub struct OrchestratorHandle {
    commands: mpsc::UnboundedSender<OrchestratorCommand>,
    events: broadcast::Sender<OrchestratorEvent>,
}

impl OrchestratorHandle {
    /// Mic button: start a voice turn, or stop the one in flight.
    pub fn start_voice_turn(&self) -> VoiceResult<()> {
        self.send(OrchestratorCommand::StartVoiceTurn)
    }

    /// Submit typed text. Blank input is rejected here and never reaches the gateway.
    pub fn submit_text_turn(&self, text: impl Into<String>) -> VoiceResult<()> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(VoiceError::EmptyMessage);
        }
        self.send(OrchestratorCommand::SubmitText(text))
    }

    pub fn cancel(&self) -> VoiceResult<()> {
        self.send(OrchestratorCommand::Cancel)
    }

    pub fn set_volume(&self, volume: f32) -> VoiceResult<()> {
        self.send(OrchestratorCommand::SetVolume(volume))
    }

    pub fn set_language(&self, language: Language) -> VoiceResult<()> {
        self.send(OrchestratorCommand::SetLanguage(language))
    }

    pub fn set_accessibility_mode(&self, enabled: bool) -> VoiceResult<()> {
        self.send(OrchestratorCommand::SetAccessibilityMode(enabled))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrchestratorEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> VoiceResult<OrchestratorSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(OrchestratorCommand::Snapshot(tx))?;
        rx.await.map_err(|_| VoiceError::ChannelClosed)
    }

    /// Cancel any turn and stop the actor.
    pub fn shutdown(&self) -> VoiceResult<()> {
        self.send(OrchestratorCommand::Shutdown)
    }

    fn send(&self, command: OrchestratorCommand) -> VoiceResult<()> {
        self.commands
            .send(command)
            .map_err(|_| VoiceError::ChannelClosed)
    }
}

/// Owns the devices until [`TurnOrchestrator::spawn`] moves them into the actor.
pub struct TurnOrchestrator {
    config: AvatarConfig,
    recognizer: Arc<dyn SpeechRecognizer>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    gateway: Arc<dyn CompletionGateway>,
}

impl TurnOrchestrator {
    pub fn new(
        config: AvatarConfig,
        recognizer: Arc<dyn SpeechRecognizer>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        gateway: Arc<dyn CompletionGateway>,
    ) -> Self {
        Self {
            config,
            recognizer,
            synthesizer,
            gateway,
        }
    }

    /// Start the actor on the current tokio runtime.
    pub fn spawn(self) -> (OrchestratorHandle, JoinHandle<()>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(self.config.event_capacity.max(1));

        let volume = if self.config.volume.is_finite() {
            self.config.volume.clamp(0.0, 1.0)
        } else {
            avatar_core::DEFAULT_VOLUME
        };
        let runtime = Runtime {
            language: self.config.language,
            volume,
            accessibility_mode: self.config.accessibility_mode,
            recognizer: self.recognizer,
            gateway: self.gateway,
            playback: PlaybackController::new(self.synthesizer).with_rate(self.config.speech_rate),
            events: events.clone(),
            internal_tx,
            phase: TurnPhase::Idle,
            listening: false,
            processing: false,
            next_turn: 1,
            current: None,
        };

        let task = tokio::spawn(runtime.run(command_rx, internal_rx));
        (
            OrchestratorHandle {
                commands: command_tx,
                events,
            },
            task,
        )
    }
}

struct InFlight {
    id: TurnId,
    kind: TurnKind,
    language: Language,
    started_at: DateTime<Utc>,
    input_text: Option<String>,
    input_emotion: Emotion,
    capture: Option<CaptureAbort>,
    /// Set once the reply has been applied and is being spoken.
    spoken: Option<Turn>,
}

struct Runtime {
    language: Language,
    volume: f32,
    accessibility_mode: bool,
    recognizer: Arc<dyn SpeechRecognizer>,
    gateway: Arc<dyn CompletionGateway>,
    playback: PlaybackController,
    events: broadcast::Sender<OrchestratorEvent>,
    internal_tx: mpsc::UnboundedSender<Internal>,
    phase: TurnPhase,
    listening: bool,
    processing: bool,
    next_turn: u64,
    current: Option<InFlight>,
}

impl Runtime {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<OrchestratorCommand>,
        mut internal: mpsc::UnboundedReceiver<Internal>,
    ) {
        info!(language = %self.language, volume = self.volume, "🎭 turn orchestrator started");
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(OrchestratorCommand::Shutdown) | None => {
                        self.cancel_turn();
                        break;
                    }
                    Some(command) => self.handle_command(command),
                },
                Some(message) = internal.recv() => self.handle_internal(message),
            }
        }
        info!("turn orchestrator stopped");
    }

    fn handle_command(&mut self, command: OrchestratorCommand) {
        match command {
            OrchestratorCommand::StartVoiceTurn => self.voice_entry(),
            OrchestratorCommand::SubmitText(text) => self.text_entry(text),
            OrchestratorCommand::Cancel => self.cancel_turn(),
            OrchestratorCommand::SetVolume(volume) => self.set_volume(volume),
            OrchestratorCommand::SetLanguage(language) => {
                if language != self.language {
                    info!(from = %self.language, to = %language, "language changed");
                    self.language = language;
                    self.emit(OrchestratorEvent::LanguageChanged(language));
                }
            }
            OrchestratorCommand::SetAccessibilityMode(enabled) => {
                if enabled != self.accessibility_mode {
                    self.accessibility_mode = enabled;
                    self.emit(OrchestratorEvent::AccessibilityChanged(enabled));
                }
            }
            OrchestratorCommand::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            // handled by the run loop
            OrchestratorCommand::Shutdown => {}
        }
    }

    fn handle_internal(&mut self, message: Internal) {
        match message {
            Internal::Captured { turn, result } => self.on_captured(turn, result),
            Internal::Replied { turn, result } => self.on_replied(turn, result),
            Internal::PlaybackEnded { utterance, end } => self.on_playback_ended(utterance, end),
        }
    }

    fn voice_entry(&mut self) {
        let stop_only = match (self.phase, self.current.as_ref().map(|t| t.kind)) {
            (TurnPhase::Capturing, _) | (TurnPhase::Speaking, _) => true,
            (TurnPhase::AwaitingReply, Some(TurnKind::Voice)) => true,
            _ => false,
        };
        if stop_only {
            debug!(phase = ?self.phase, "voice entry while busy acts as stop");
            self.cancel_turn();
            return;
        }
        if self.current.is_some() {
            self.cancel_turn();
        }

        self.emit(OrchestratorEvent::VoiceTurnStarting);
        let id = self.next_turn_id();
        let language = self.language;
        let session = match SpeechCaptureSession::start(
            Arc::clone(&self.recognizer),
            RecognitionConfig::for_language(language),
        ) {
            Ok(session) => session,
            Err(e) => {
                warn!(turn = %id, error = %e, "voice turn cannot start");
                self.emit(OrchestratorEvent::TurnEnded {
                    turn: id,
                    outcome: TurnOutcome::Failed(TurnFailure::CaptureUnavailable),
                });
                return;
            }
        };

        info!(turn = %id, locale = language.locale(), "voice turn started");
        self.current = Some(InFlight {
            id,
            kind: TurnKind::Voice,
            language,
            started_at: Utc::now(),
            input_text: None,
            input_emotion: Emotion::default(),
            capture: Some(session.abort_handle()),
            spoken: None,
        });
        self.set_listening(true);
        self.set_processing(true);
        self.set_phase(TurnPhase::Capturing);

        let tx = self.internal_tx.clone();
        tokio::spawn(async move {
            let result = session.transcript().await;
            let _ = tx.send(Internal::Captured { turn: id, result });
        });
    }

    fn text_entry(&mut self, text: String) {
        let text = text.trim().to_string();
        if text.is_empty() {
            debug!("ignoring blank text turn");
            return;
        }
        if self.current.is_some() {
            self.cancel_turn();
        }

        let id = self.next_turn_id();
        let language = self.language;
        let persona = if self.accessibility_mode {
            Persona::Accessibility
        } else {
            Persona::Text
        };
        info!(turn = %id, persona = %persona, "text turn started");

        self.emit(OrchestratorEvent::HistoryAppended(ChatEntry::user(text.clone())));
        if self.accessibility_mode {
            self.emit(OrchestratorEvent::Announcement(language.user_announcement(&text)));
        }

        let input_emotion = classify(&text);
        self.current = Some(InFlight {
            id,
            kind: TurnKind::Text,
            language,
            started_at: Utc::now(),
            input_text: Some(text.clone()),
            input_emotion,
            capture: None,
            spoken: None,
        });
        self.set_processing(true);
        self.set_phase(TurnPhase::AwaitingReply);
        self.dispatch(id, ChatRequest::new(text, persona, language));
    }

    fn on_captured(&mut self, turn: TurnId, result: VoiceResult<String>) {
        if !self.is_current(turn) {
            debug!(turn = %turn, "dropping capture result for superseded turn");
            return;
        }
        self.set_listening(false);

        let transcript = match result {
            Ok(transcript) => transcript,
            Err(e) => {
                warn!(turn = %turn, error = %e, "capture failed");
                let failure = match e {
                    VoiceError::CaptureFailed(failure) => TurnFailure::Capture(failure),
                    VoiceError::CaptureUnavailable => TurnFailure::CaptureUnavailable,
                    VoiceError::CaptureAbandoned => {
                        TurnFailure::Capture(RecognitionFailure::Aborted)
                    }
                    other => TurnFailure::Capture(RecognitionFailure::Other(other.to_string())),
                };
                self.current = None;
                self.set_processing(false);
                self.set_phase(TurnPhase::Idle);
                self.emit(OrchestratorEvent::TurnEnded {
                    turn,
                    outcome: TurnOutcome::Failed(failure),
                });
                return;
            }
        };

        let input_emotion = classify(&transcript);
        debug!(turn = %turn, emotion = %input_emotion, "transcript received");
        let Some(current) = self.current.as_mut() else {
            return;
        };
        current.capture = None;
        current.input_text = Some(transcript.clone());
        current.input_emotion = input_emotion;
        let language = current.language;

        self.emit(OrchestratorEvent::HistoryAppended(ChatEntry::user(transcript.clone())));
        if self.accessibility_mode {
            self.emit(OrchestratorEvent::Announcement(language.user_announcement(&transcript)));
        }
        self.set_phase(TurnPhase::AwaitingReply);
        self.dispatch(turn, ChatRequest::new(transcript, Persona::Voice, language));
    }

    fn dispatch(&self, turn: TurnId, request: ChatRequest) {
        let gateway = Arc::clone(&self.gateway);
        let tx = self.internal_tx.clone();
        tokio::spawn(async move {
            let result = gateway.send(&request).await;
            let _ = tx.send(Internal::Replied { turn, result });
        });
    }

    fn on_replied(&mut self, turn: TurnId, result: Result<ChatReply, GatewayError>) {
        if !self.is_current(turn) {
            debug!(turn = %turn, "dropping reply for superseded turn");
            return;
        }
        self.set_processing(false);
        let Some(mut current) = self.current.take() else {
            return;
        };
        let language = current.language;
        let input_text = current.input_text.clone().unwrap_or_default();

        match result {
            Ok(reply) => {
                let reply_text = if reply.response.trim().is_empty() {
                    debug!(turn = %turn, "blank reply; substituting apology");
                    language.empty_reply_apology().to_string()
                } else {
                    reply.response
                };
                let reply_emotion = classify(&reply_text);
                let resolved = resolve(current.input_emotion, reply_emotion);
                let completed = Turn {
                    id: turn,
                    kind: current.kind,
                    input_text,
                    input_emotion: current.input_emotion,
                    reply_text: reply_text.clone(),
                    reply_emotion,
                    resolved_emotion: resolved,
                    reply_emotion_hint: Some(reply.emotion),
                    started_at: current.started_at,
                };
                info!(
                    turn = %turn,
                    input = %completed.input_emotion,
                    reply = %reply_emotion,
                    hint = %reply.emotion,
                    resolved = %resolved,
                    "reply received"
                );

                self.apply_reply(language, &reply_text, resolved);

                match self.playback.speak(&reply_text, language.locale(), self.volume) {
                    Ok(ticket) => {
                        current.spoken = Some(completed);
                        self.current = Some(current);
                        self.set_phase(TurnPhase::Speaking);
                        self.emit(OrchestratorEvent::SpeakingTextChanged(Some(reply_text)));
                        self.watch_playback(ticket);
                    }
                    Err(e) => {
                        warn!(
                            turn = %turn,
                            error = %e,
                            "playback failed; reply shown without speech"
                        );
                        self.set_phase(TurnPhase::Idle);
                        self.emit(OrchestratorEvent::TurnEnded {
                            turn,
                            outcome: TurnOutcome::Completed(completed),
                        });
                    }
                }
            }
            Err(e) => {
                warn!(turn = %turn, error = %e, "gateway failed; using fallback reply");
                let reply_text = e
                    .fallback_text()
                    .unwrap_or_else(|| language.fallback_reply())
                    .to_string();
                let hint = match &e {
                    GatewayError::Service { fallback_emotion, .. } => *fallback_emotion,
                    _ => None,
                };
                self.apply_reply(language, &reply_text, Emotion::Sad);
                self.set_phase(TurnPhase::Idle);
                self.emit(OrchestratorEvent::TurnEnded {
                    turn,
                    outcome: TurnOutcome::Recovered {
                        turn: Turn {
                            id: turn,
                            kind: current.kind,
                            input_text,
                            input_emotion: current.input_emotion,
                            reply_text,
                            reply_emotion: Emotion::Sad,
                            resolved_emotion: Emotion::Sad,
                            reply_emotion_hint: hint,
                            started_at: current.started_at,
                        },
                        error: e.to_string(),
                    },
                });
            }
        }
    }

    fn apply_reply(&self, language: Language, reply_text: &str, emotion: Emotion) {
        self.emit(OrchestratorEvent::HistoryAppended(ChatEntry::avatar(reply_text)));
        if self.accessibility_mode {
            self.emit(OrchestratorEvent::Announcement(language.reply_announcement(reply_text)));
        }
        self.emit(OrchestratorEvent::EmotionChanged(emotion));
    }

    fn watch_playback(&self, ticket: PlaybackTicket) {
        let tx = self.internal_tx.clone();
        let PlaybackTicket { id, done } = ticket;
        tokio::spawn(async move {
            let end = done.await.unwrap_or(UtteranceEnd::Cancelled);
            let _ = tx.send(Internal::PlaybackEnded { utterance: id, end });
        });
    }

    fn on_playback_ended(&mut self, utterance: UtteranceId, end: UtteranceEnd) {
        if !self.playback.finish(utterance) {
            debug!(utterance = %utterance, "ignoring end of replaced utterance");
            return;
        }
        debug!(utterance = %utterance, end = ?end, "utterance ended");
        self.emit(OrchestratorEvent::SpeakingTextChanged(None));
        self.finish_spoken_turn();
    }

    fn finish_spoken_turn(&mut self) {
        if self.phase != TurnPhase::Speaking {
            return;
        }
        if let Some(current) = self.current.take() {
            let id = current.id;
            self.set_phase(TurnPhase::Idle);
            if let Some(turn) = current.spoken {
                info!(turn = %id, "turn completed");
                self.emit(OrchestratorEvent::TurnEnded {
                    turn: id,
                    outcome: TurnOutcome::Completed(turn),
                });
            }
        } else {
            self.set_phase(TurnPhase::Idle);
        }
    }

    fn set_volume(&mut self, volume: f32) {
        if !volume.is_finite() {
            debug!("ignoring non-finite volume");
            return;
        }
        let volume = volume.clamp(0.0, 1.0);
        if (volume - self.volume).abs() < f32::EPSILON {
            return;
        }
        self.volume = volume;
        self.emit(OrchestratorEvent::VolumeChanged(volume));

        match self.playback.retarget(volume) {
            Ok(Some(ticket)) => self.watch_playback(ticket),
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "could not restart utterance at new volume");
                self.emit(OrchestratorEvent::SpeakingTextChanged(None));
                self.finish_spoken_turn();
            }
        }
    }

    /// Abandon capture, stop playback and return to Idle. The in-flight gateway call
    /// keeps running; its reply fails the turn-identity check.
    fn cancel_turn(&mut self) {
        let current = self.current.take();
        if let Some(abort) = current.as_ref().and_then(|t| t.capture.as_ref()) {
            abort.abandon();
        }
        if self.playback.stop() {
            self.emit(OrchestratorEvent::SpeakingTextChanged(None));
        }
        self.set_listening(false);
        self.set_processing(false);
        if let Some(current) = current {
            info!(turn = %current.id, phase = ?self.phase, "turn cancelled");
            self.emit(OrchestratorEvent::TurnEnded {
                turn: current.id,
                outcome: TurnOutcome::Cancelled,
            });
        }
        self.set_phase(TurnPhase::Idle);
    }

    fn next_turn_id(&mut self) -> TurnId {
        let id = TurnId(self.next_turn);
        self.next_turn += 1;
        id
    }

    fn is_current(&self, turn: TurnId) -> bool {
        self.current.as_ref().map(|t| t.id) == Some(turn)
    }

    fn set_phase(&mut self, phase: TurnPhase) {
        if self.phase != phase {
            debug!(from = ?self.phase, to = ?phase, "phase");
            self.phase = phase;
            self.emit(OrchestratorEvent::PhaseChanged(phase));
        }
    }

    fn set_listening(&mut self, listening: bool) {
        if self.listening != listening {
            self.listening = listening;
            self.emit(OrchestratorEvent::ListeningChanged(listening));
        }
    }

    fn set_processing(&mut self, processing: bool) {
        if self.processing != processing {
            self.processing = processing;
            self.emit(OrchestratorEvent::ProcessingChanged(processing));
        }
    }

    fn snapshot(&self) -> OrchestratorSnapshot {
        OrchestratorSnapshot {
            phase: self.phase,
            turn: self.current.as_ref().map(|t| t.id),
            listening: self.listening,
            processing: self.processing,
            speaking_text: self.playback.active_text().map(str::to_string),
            volume: self.volume,
            language: self.language,
            accessibility_mode: self.accessibility_mode,
        }
    }

    fn emit(&self, event: OrchestratorEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }
}
