//! **SpeechPlaybackController**: exactly zero or one audible utterance.
//!
//! `speak` always cancels what is playing before starting the replacement (never queues).
//! `retarget` restarts the active text at a new volume, and `stop` is the hard kill.

use crate::error::{VoiceError, VoiceResult};
use avatar_core::{base_subtag, DEFAULT_SPEECH_RATE, DEFAULT_VOLUME};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info};

/// A voice the synthesis device offers.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisVoice {
    pub name: String,
    pub locale: String,
}

impl SynthesisVoice {
    pub fn new(name: impl Into<String>, locale: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            locale: locale.into(),
        }
    }
}

/// Pick the first voice whose base subtag matches `locale`'s (case-insensitive).
/// `None` means "let the device use its default".
pub fn select_voice(voices: &[SynthesisVoice], locale: &str) -> Option<SynthesisVoice> {
    let wanted = base_subtag(locale);
    voices
        .iter()
        .find(|v| base_subtag(&v.locale).eq_ignore_ascii_case(wanted))
        .cloned()
}

/// Volumes that are not finite or fall outside 0.0–1.0 become the default.
pub fn effective_volume(volume: f32) -> f32 {
    if volume.is_finite() && (0.0..=1.0).contains(&volume) {
        volume
    } else {
        DEFAULT_VOLUME
    }
}

/// One synthesis request.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub locale: String,
    pub volume: f32,
    pub rate: f32,
    pub pitch: f32,
    pub voice: Option<SynthesisVoice>,
}

impl Utterance {
    pub fn new(text: impl Into<String>, locale: impl Into<String>, volume: f32) -> Self {
        Self {
            text: text.into(),
            locale: locale.into(),
            volume: effective_volume(volume),
            rate: DEFAULT_SPEECH_RATE,
            pitch: 1.0,
            voice: None,
        }
    }

    pub fn with_rate(mut self, rate: f32) -> Self {
        if rate.is_finite() && rate > 0.0 {
            self.rate = rate;
        }
        self
    }

    pub fn with_voice(mut self, voice: Option<SynthesisVoice>) -> Self {
        self.voice = voice;
        self
    }
}

/// How an utterance left the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtteranceEnd {
    Completed,
    Cancelled,
}

/// Backend that makes utterances audible. `speak` returns a receiver that fires once
/// when that utterance ends for any reason.
pub trait SpeechSynthesizer: Send + Sync {
    fn voices(&self) -> Vec<SynthesisVoice>;

    fn speak(&self, utterance: Utterance) -> VoiceResult<oneshot::Receiver<UtteranceEnd>>;

    fn pause(&self);

    /// Silence everything; pending receivers resolve with [`UtteranceEnd::Cancelled`].
    fn cancel(&self);
}

/// Monotonic id; completion notices carrying an older id are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtteranceId(u64);

impl fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "u{}", self.0)
    }
}

/// Returned by `speak`/`retarget`. Await `done`, then hand `id` back to
/// [`PlaybackController::finish`].
#[derive(Debug)]
pub struct PlaybackTicket {
    pub id: UtteranceId,
    pub done: oneshot::Receiver<UtteranceEnd>,
}

#[derive(Debug, Clone)]
struct ActiveUtterance {
    id: UtteranceId,
    text: String,
    locale: String,
    volume: f32,
}

pub struct PlaybackController {
    device: Arc<dyn SpeechSynthesizer>,
    rate: f32,
    active: Option<ActiveUtterance>,
    next_id: u64,
}

impl PlaybackController {
    pub fn new(device: Arc<dyn SpeechSynthesizer>) -> Self {
        Self {
            device,
            rate: DEFAULT_SPEECH_RATE,
            active: None,
            next_id: 1,
        }
    }

    pub fn with_rate(mut self, rate: f32) -> Self {
        if rate.is_finite() && rate > 0.0 {
            self.rate = rate;
        }
        self
    }

    pub fn is_speaking(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_text(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.text.as_str())
    }

    pub fn active_id(&self) -> Option<UtteranceId> {
        self.active.as_ref().map(|a| a.id)
    }

    pub fn active_volume(&self) -> Option<f32> {
        self.active.as_ref().map(|a| a.volume)
    }

    /// Cancel whatever is active, then start `text`.
    pub fn speak(&mut self, text: &str, locale: &str, volume: f32) -> VoiceResult<PlaybackTicket> {
        if let Some(prev) = self.active.take() {
            debug!(utterance = %prev.id, "replacing active utterance");
            self.device.cancel();
        }

        let voice = select_voice(&self.device.voices(), locale);
        let utterance = Utterance::new(text, locale, volume)
            .with_rate(self.rate)
            .with_voice(voice);
        let volume = utterance.volume;
        let done = self.device.speak(utterance)?;

        let id = UtteranceId(self.next_id);
        self.next_id += 1;
        self.active = Some(ActiveUtterance {
            id,
            text: text.to_string(),
            locale: locale.to_string(),
            volume,
        });
        info!(utterance = %id, locale = %locale, volume, "🔊 speaking");
        Ok(PlaybackTicket { id, done })
    }

    /// Restart the active utterance at `volume`. `Ok(None)` when idle or unchanged.
    pub fn retarget(&mut self, volume: f32) -> VoiceResult<Option<PlaybackTicket>> {
        let Some(active) = self.active.clone() else {
            return Ok(None);
        };
        let target = effective_volume(volume);
        if (active.volume - target).abs() < f32::EPSILON {
            return Ok(None);
        }

        debug!(utterance = %active.id, from = active.volume, to = target, "retargeting volume");
        self.device.pause();
        self.device.cancel();
        self.active = None;
        self.speak(&active.text, &active.locale, target).map(Some)
    }

    /// Hard-cancel. Returns whether anything was playing.
    pub fn stop(&mut self) -> bool {
        match self.active.take() {
            Some(prev) => {
                self.device.cancel();
                info!(utterance = %prev.id, "🔇 playback stopped");
                true
            }
            None => false,
        }
    }

    /// Record that utterance `id` ended. Stale ids are ignored.
    pub fn finish(&mut self, id: UtteranceId) -> bool {
        if self.active_id() == Some(id) {
            self.active = None;
            true
        } else {
            false
        }
    }
}

#[derive(Default)]
struct ConsoleState {
    generation: u64,
    pending: Option<oneshot::Sender<UtteranceEnd>>,
}

/// Synthesizer for terminals: logs each utterance and reports completion after an
/// estimated speaking time.
#[derive(Clone)]
pub struct ConsoleSynthesizer {
    per_word: Duration,
    state: Arc<Mutex<ConsoleState>>,
}

impl Default for ConsoleSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleSynthesizer {
    pub fn new() -> Self {
        Self::with_pace(Duration::from_millis(350))
    }

    /// Speaking time per word at rate 1.0.
    pub fn with_pace(per_word: Duration) -> Self {
        Self {
            per_word,
            state: Arc::new(Mutex::new(ConsoleState::default())),
        }
    }

    fn estimate(&self, utterance: &Utterance) -> Duration {
        let words = utterance.text.split_whitespace().count().max(1) as f64;
        let rate = f64::from(utterance.rate.max(0.1));
        self.per_word.mul_f64(words / rate)
    }
}

impl SpeechSynthesizer for ConsoleSynthesizer {
    fn voices(&self) -> Vec<SynthesisVoice> {
        vec![
            SynthesisVoice::new("console-pt", "pt-BR"),
            SynthesisVoice::new("console-en", "en-US"),
            SynthesisVoice::new("console-fr", "fr-FR"),
        ]
    }

    fn speak(&self, utterance: Utterance) -> VoiceResult<oneshot::Receiver<UtteranceEnd>> {
        let (tx, rx) = oneshot::channel();
        let generation = {
            let mut state = self
                .state
                .lock()
                .map_err(|e| VoiceError::Synthesis(format!("console state poisoned: {}", e)))?;
            if let Some(prev) = state.pending.take() {
                let _ = prev.send(UtteranceEnd::Cancelled);
            }
            state.generation += 1;
            state.pending = Some(tx);
            state.generation
        };

        let duration = self.estimate(&utterance);
        info!(
            voice = utterance.voice.as_ref().map(|v| v.name.as_str()).unwrap_or("default"),
            locale = %utterance.locale,
            volume = utterance.volume,
            ms = duration.as_millis() as u64,
            "🗣️ {}",
            utterance.text
        );

        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            if let Ok(mut state) = state.lock() {
                if state.generation == generation {
                    if let Some(tx) = state.pending.take() {
                        let _ = tx.send(UtteranceEnd::Completed);
                    }
                }
            }
        });
        Ok(rx)
    }

    fn pause(&self) {
        debug!("console synthesizer paused");
    }

    fn cancel(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.generation += 1;
            if let Some(tx) = state.pending.take() {
                let _ = tx.send(UtteranceEnd::Cancelled);
            }
        }
    }
}
