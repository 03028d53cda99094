//! Error types for the avatar voice system

use avatar_core::Emotion;
use std::fmt;
use thiserror::Error;

/// Result type alias for voice operations
pub type VoiceResult<T> = Result<T, VoiceError>;

/// Errors that can occur while running a conversation turn
#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Speech recognition is not available on this device")]
    CaptureUnavailable,

    #[error("Speech recognition failed: {0}")]
    CaptureFailed(RecognitionFailure),

    #[error("Capture was abandoned")]
    CaptureAbandoned,

    #[error("Speech synthesis error: {0}")]
    Synthesis(String),

    #[error("Message cannot be empty")]
    EmptyMessage,

    #[error("Orchestrator is not running")]
    ChannelClosed,
}

/// Why a single recognition attempt ended without a transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionFailure {
    /// Nothing intelligible was heard (includes blank transcripts).
    NoSpeech,
    /// The device stopped the attempt.
    Aborted,
    /// Microphone permission denied.
    NotAllowed,
    /// Recognition service unreachable.
    Network,
    Other(String),
}

impl fmt::Display for RecognitionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecognitionFailure::NoSpeech => f.write_str("no-speech"),
            RecognitionFailure::Aborted => f.write_str("aborted"),
            RecognitionFailure::NotAllowed => f.write_str("not-allowed"),
            RecognitionFailure::Network => f.write_str("network"),
            RecognitionFailure::Other(reason) => f.write_str(reason),
        }
    }
}

/// Failures talking to the chat service. All of them are recovered by the orchestrator.
#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("service error {status}: {message}")]
    Service {
        status: u16,
        message: String,
        /// Apology text the service sent alongside the error, if any.
        fallback: Option<String>,
        fallback_emotion: Option<Emotion>,
    },

    #[error("invalid response: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Non-blank apology text supplied by the service.
    pub fn fallback_text(&self) -> Option<&str> {
        match self {
            GatewayError::Service {
                fallback: Some(text),
                ..
            } if !text.trim().is_empty() => Some(text.as_str()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GatewayError::Decode(err.to_string())
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}
