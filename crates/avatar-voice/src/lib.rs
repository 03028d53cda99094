//! # avatar-voice - Conversation Turn Orchestration
//!
//! Runs one conversation turn at a time for the interactive avatar: capture what the
//! user said (or take typed text), ask the chat service for a reply, settle the
//! avatar's emotion and speak the reply.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                       Turn Orchestrator                        │
//! │  ┌──────────────┐   ┌──────────────┐   ┌───────────────────┐  │
//! │  │   Capture    │ → │   Gateway    │ → │ Emotion classify  │  │
//! │  │  (one-shot)  │   │  POST /chat  │   │  input + reply    │  │
//! │  └──────────────┘   └──────────────┘   └───────────────────┘  │
//! │         ↑                                        ↓            │
//! │  ┌──────────────┐                       ┌───────────────────┐ │
//! │  │  Commands    │   OrchestratorEvent → │     Playback      │ │
//! │  │   (mpsc)     │      (broadcast)      │ speak/retarget/stop│ │
//! │  └──────────────┘                       └───────────────────┘ │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Devices sit behind [`SpeechRecognizer`] and [`SpeechSynthesizer`]; the chat service
//! sits behind [`CompletionGateway`].

pub mod capture;
pub mod error;
pub mod events;
pub mod gateway;
pub mod orchestrator;
pub mod playback;
pub mod view;

pub use capture::{
    capture, CaptureAbort, RecognitionConfig, ScriptedRecognizer, SpeechCaptureSession,
    SpeechRecognizer, UnavailableRecognizer,
};
pub use error::{GatewayError, RecognitionFailure, VoiceError, VoiceResult};
pub use events::{
    OrchestratorEvent, OrchestratorSnapshot, Turn, TurnFailure, TurnId, TurnKind, TurnOutcome,
    TurnPhase,
};
pub use gateway::{ChatReply, ChatRequest, CompletionGateway, HttpCompletionGateway};
pub use orchestrator::{OrchestratorCommand, OrchestratorHandle, TurnOrchestrator};
pub use playback::{
    effective_volume, select_voice, ConsoleSynthesizer, PlaybackController, PlaybackTicket,
    SpeechSynthesizer, SynthesisVoice, Utterance, UtteranceEnd, UtteranceId,
};
pub use view::ConversationView;
