//! Events published by the orchestrator and the values they carry.

use crate::error::RecognitionFailure;
use avatar_core::{ChatEntry, Emotion, Language};
use chrono::{DateTime, Utc};
use std::fmt;

/// Identity of one capture/submit cycle. Results tagged with an older id are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TurnId(pub(crate) u64);

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnPhase {
    #[default]
    Idle,
    Capturing,
    AwaitingReply,
    Speaking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnKind {
    Voice,
    Text,
}

/// A fully populated turn, reported once and then dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub id: TurnId,
    pub kind: TurnKind,
    pub input_text: String,
    pub input_emotion: Emotion,
    pub reply_text: String,
    pub reply_emotion: Emotion,
    pub resolved_emotion: Emotion,
    /// Emotion suggested by the service; informational only.
    pub reply_emotion_hint: Option<Emotion>,
    pub started_at: DateTime<Utc>,
}

/// Why a turn ended without any reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnFailure {
    CaptureUnavailable,
    Capture(RecognitionFailure),
}

impl fmt::Display for TurnFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnFailure::CaptureUnavailable => f.write_str("speech recognition unavailable"),
            TurnFailure::Capture(failure) => write!(f, "speech recognition failed: {}", failure),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// Reply delivered (and spoken, when playback succeeded).
    Completed(Turn),
    /// Gateway failed; the fallback apology was shown with `sad`.
    Recovered { turn: Turn, error: String },
    Failed(TurnFailure),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrchestratorEvent {
    PhaseChanged(TurnPhase),
    ListeningChanged(bool),
    ProcessingChanged(bool),
    /// A voice turn is about to capture; the UI closes its text box and clears history.
    VoiceTurnStarting,
    HistoryAppended(ChatEntry),
    EmotionChanged(Emotion),
    SpeakingTextChanged(Option<String>),
    /// Text for a screen-reader live region (accessibility mode only).
    Announcement(String),
    VolumeChanged(f32),
    LanguageChanged(Language),
    AccessibilityChanged(bool),
    TurnEnded { turn: TurnId, outcome: TurnOutcome },
}

/// Point-in-time view of orchestrator state.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorSnapshot {
    pub phase: TurnPhase,
    pub turn: Option<TurnId>,
    pub listening: bool,
    pub processing: bool,
    pub speaking_text: Option<String>,
    pub volume: f32,
    pub language: Language,
    pub accessibility_mode: bool,
}
