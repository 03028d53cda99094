//! **Speech capture**: one recognition attempt, one transcript.
//!
//! `SpeechCaptureSession::start` checks device capability, then runs the recognizer in a
//! background task. The session resolves exactly once. Once abandoned it can never
//! deliver a transcript, even if the device answers late.

use crate::error::{RecognitionFailure, VoiceError, VoiceResult};
use async_trait::async_trait;
use avatar_core::Language;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Settings for a single recognition attempt. Always single-shot and final-results-only.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionConfig {
    pub locale: String,
    pub continuous: bool,
    pub interim_results: bool,
}

impl RecognitionConfig {
    pub fn for_locale(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            continuous: false,
            interim_results: false,
        }
    }

    pub fn for_language(language: Language) -> Self {
        Self::for_locale(language.locale())
    }
}

/// Backend for speech recognition. Implement for a platform recognizer or a remote STT API.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Capability check; sessions refuse to start when this is false.
    fn is_available(&self) -> bool;

    /// Listen once and return the final transcript.
    async fn recognize(&self, config: &RecognitionConfig) -> Result<String, RecognitionFailure>;

    /// Stop a pending `recognize` call. Default: nothing to release.
    fn abort(&self) {}
}

/// Cloneable handle that abandons a pending session.
#[derive(Debug, Clone)]
pub struct CaptureAbort {
    token: CancellationToken,
}

impl CaptureAbort {
    pub fn abandon(&self) {
        self.token.cancel();
    }

    pub fn is_abandoned(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// A single in-flight recognition attempt.
pub struct SpeechCaptureSession {
    token: CancellationToken,
    result_rx: oneshot::Receiver<Result<String, RecognitionFailure>>,
}

impl SpeechCaptureSession {
    /// Begin listening. Fails immediately with [`VoiceError::CaptureUnavailable`] when the
    /// device reports no capability. Must be called inside a tokio runtime.
    pub fn start(
        recognizer: Arc<dyn SpeechRecognizer>,
        config: RecognitionConfig,
    ) -> VoiceResult<Self> {
        if !recognizer.is_available() {
            return Err(VoiceError::CaptureUnavailable);
        }

        let token = CancellationToken::new();
        let (result_tx, result_rx) = oneshot::channel();
        let task_token = token.clone();

        info!(locale = %config.locale, "🎤 capture started");
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = task_token.cancelled() => {
                    recognizer.abort();
                    debug!("capture abandoned before a result arrived");
                }
                result = recognizer.recognize(&config) => {
                    if !task_token.is_cancelled() {
                        let _ = result_tx.send(result);
                    }
                }
            }
        });

        Ok(Self { token, result_rx })
    }

    pub fn abort_handle(&self) -> CaptureAbort {
        CaptureAbort {
            token: self.token.clone(),
        }
    }

    /// Wait for the outcome. Blank transcripts count as [`RecognitionFailure::NoSpeech`].
    pub async fn transcript(self) -> VoiceResult<String> {
        let Self { token, result_rx } = self;
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(VoiceError::CaptureAbandoned),
            result = result_rx => match result {
                Ok(Ok(text)) if token.is_cancelled() => {
                    debug!(chars = text.len(), "dropping transcript from abandoned capture");
                    Err(VoiceError::CaptureAbandoned)
                }
                Ok(Ok(text)) => {
                    let text = text.trim().to_string();
                    if text.is_empty() {
                        Err(VoiceError::CaptureFailed(RecognitionFailure::NoSpeech))
                    } else {
                        Ok(text)
                    }
                }
                Ok(Err(failure)) => Err(VoiceError::CaptureFailed(failure)),
                // sender dropped: the task was cancelled
                Err(_) => Err(VoiceError::CaptureAbandoned),
            },
        }
    }
}

/// One-shot convenience: start a session and wait for its transcript.
pub async fn capture(
    recognizer: Arc<dyn SpeechRecognizer>,
    language: Language,
) -> VoiceResult<String> {
    SpeechCaptureSession::start(recognizer, RecognitionConfig::for_language(language))?
        .transcript()
        .await
}

/// Recognizer for hosts without speech input. Every session fails with `CaptureUnavailable`.
#[derive(Debug, Default)]
pub struct UnavailableRecognizer;

#[async_trait]
impl SpeechRecognizer for UnavailableRecognizer {
    fn is_available(&self) -> bool {
        false
    }

    async fn recognize(&self, _config: &RecognitionConfig) -> Result<String, RecognitionFailure> {
        Err(RecognitionFailure::Other("speech recognition unavailable".to_string()))
    }
}

/// Recognizer that replays queued results in order. An empty queue reads as no speech.
/// Used by the terminal front end to simulate spoken turns.
#[derive(Debug, Default)]
pub struct ScriptedRecognizer {
    queue: Mutex<VecDeque<Result<String, RecognitionFailure>>>,
    last_locale: Mutex<Option<String>>,
}

impl ScriptedRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_transcript(&self, text: impl Into<String>) {
        self.push(Ok(text.into()));
    }

    pub fn push_failure(&self, failure: RecognitionFailure) {
        self.push(Err(failure));
    }

    fn push(&self, item: Result<String, RecognitionFailure>) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push_back(item);
        }
    }

    /// Locale of the most recent `recognize` call.
    pub fn last_locale(&self) -> Option<String> {
        self.last_locale.lock().ok().and_then(|l| l.clone())
    }
}

#[async_trait]
impl SpeechRecognizer for ScriptedRecognizer {
    fn is_available(&self) -> bool {
        true
    }

    async fn recognize(&self, config: &RecognitionConfig) -> Result<String, RecognitionFailure> {
        if let Ok(mut locale) = self.last_locale.lock() {
            *locale = Some(config.locale.clone());
        }
        self.queue
            .lock()
            .map_err(|e| RecognitionFailure::Other(format!("script lock poisoned: {}", e)))?
            .pop_front()
            .unwrap_or(Err(RecognitionFailure::NoSpeech))
    }
}
