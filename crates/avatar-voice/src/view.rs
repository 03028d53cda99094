//! Headless conversation view: what a widget would render, folded from orchestrator events.

use crate::events::{OrchestratorEvent, TurnOutcome};
use avatar_core::{ChatEntry, ChatRole, Emotion, Language, DEFAULT_VOLUME};

#[derive(Debug, Clone, PartialEq)]
pub struct ConversationView {
    pub history: Vec<ChatEntry>,
    pub emotion: Emotion,
    pub listening: bool,
    pub processing: bool,
    pub speaking_text: Option<String>,
    pub text_box_open: bool,
    pub language: Language,
    pub volume: f32,
    pub accessibility_mode: bool,
    /// Last announcement for the live region.
    pub announcement: Option<String>,
    pub last_error: Option<String>,
}

impl Default for ConversationView {
    fn default() -> Self {
        Self::new(Language::default())
    }
}

impl ConversationView {
    pub fn new(language: Language) -> Self {
        Self {
            history: Vec::new(),
            emotion: Emotion::Happy,
            listening: false,
            processing: false,
            speaking_text: None,
            text_box_open: false,
            language,
            volume: DEFAULT_VOLUME,
            accessibility_mode: false,
            announcement: None,
            last_error: None,
        }
    }

    /// Open the text box. An empty conversation starts with the welcome message.
    pub fn open_chat(&mut self) {
        self.text_box_open = true;
        if self.history.is_empty() {
            self.history
                .push(ChatEntry::avatar(self.language.welcome_message()));
        }
    }

    pub fn close_chat(&mut self) {
        self.text_box_open = false;
    }

    pub fn clear_chat(&mut self, show_welcome: bool) {
        self.emotion = Emotion::Happy;
        self.history.clear();
        self.last_error = None;
        if show_welcome {
            self.history
                .push(ChatEntry::avatar(self.language.welcome_message()));
        }
    }

    /// Only the welcome message has been shown so far.
    pub fn shows_only_welcome(&self) -> bool {
        matches!(self.history.as_slice(), [only] if only.role == ChatRole::Avatar
            && Language::ALL.iter().any(|l| only.message == l.welcome_message()))
    }

    pub fn apply(&mut self, event: &OrchestratorEvent) {
        match event {
            OrchestratorEvent::PhaseChanged(_) => {}
            OrchestratorEvent::ListeningChanged(listening) => self.listening = *listening,
            OrchestratorEvent::ProcessingChanged(processing) => self.processing = *processing,
            OrchestratorEvent::VoiceTurnStarting => {
                self.close_chat();
                self.clear_chat(false);
            }
            OrchestratorEvent::HistoryAppended(entry) => self.history.push(entry.clone()),
            OrchestratorEvent::EmotionChanged(emotion) => self.emotion = *emotion,
            OrchestratorEvent::SpeakingTextChanged(text) => self.speaking_text = text.clone(),
            OrchestratorEvent::Announcement(text) => self.announcement = Some(text.clone()),
            OrchestratorEvent::VolumeChanged(volume) => self.volume = *volume,
            OrchestratorEvent::LanguageChanged(language) => {
                let replace_welcome = self.text_box_open && self.shows_only_welcome();
                self.language = *language;
                if replace_welcome {
                    self.history.clear();
                    self.history.push(ChatEntry::avatar(language.welcome_message()));
                }
            }
            OrchestratorEvent::AccessibilityChanged(enabled) => self.accessibility_mode = *enabled,
            OrchestratorEvent::TurnEnded { outcome, .. } => match outcome {
                TurnOutcome::Failed(failure) => self.last_error = Some(failure.to_string()),
                TurnOutcome::Recovered { error, .. } => self.last_error = Some(error.clone()),
                TurnOutcome::Completed(_) | TurnOutcome::Cancelled => self.last_error = None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecognitionFailure;
    use crate::events::{TurnFailure, TurnId};

    #[test]
    fn open_chat_shows_welcome_once() {
        let mut view = ConversationView::new(Language::En);
        view.open_chat();
        view.close_chat();
        view.open_chat();
        assert!(view.text_box_open);
        assert_eq!(view.history.len(), 1);
        assert_eq!(view.history[0].message, Language::En.welcome_message());
    }

    #[test]
    fn voice_turn_start_closes_and_clears_without_welcome() {
        let mut view = ConversationView::default();
        view.open_chat();
        view.apply(&OrchestratorEvent::EmotionChanged(Emotion::Sad));
        view.apply(&OrchestratorEvent::VoiceTurnStarting);
        assert!(!view.text_box_open);
        assert!(view.history.is_empty());
        assert_eq!(view.emotion, Emotion::Happy);
    }

    #[test]
    fn language_change_replaces_lone_welcome() {
        let mut view = ConversationView::new(Language::Pt);
        view.open_chat();
        view.apply(&OrchestratorEvent::LanguageChanged(Language::Fr));
        assert_eq!(view.history.len(), 1);
        assert_eq!(view.history[0].message, Language::Fr.welcome_message());
    }

    #[test]
    fn language_change_keeps_real_conversation() {
        let mut view = ConversationView::new(Language::Pt);
        view.open_chat();
        view.apply(&OrchestratorEvent::HistoryAppended(ChatEntry::user("Olá")));
        view.apply(&OrchestratorEvent::LanguageChanged(Language::En));
        assert_eq!(view.history.len(), 2);
        assert_eq!(view.language, Language::En);
    }

    #[test]
    fn clear_chat_resets_emotion() {
        let mut view = ConversationView::default();
        view.apply(&OrchestratorEvent::HistoryAppended(ChatEntry::user("x")));
        view.apply(&OrchestratorEvent::EmotionChanged(Emotion::Surprised));
        view.clear_chat(true);
        assert_eq!(view.emotion, Emotion::Happy);
        assert!(view.shows_only_welcome());
    }

    #[test]
    fn failed_turn_records_error() {
        let mut view = ConversationView::default();
        view.apply(&OrchestratorEvent::TurnEnded {
            turn: TurnId(3),
            outcome: TurnOutcome::Failed(TurnFailure::Capture(RecognitionFailure::NoSpeech)),
        });
        assert_eq!(
            view.last_error.as_deref(),
            Some("speech recognition failed: no-speech")
        );
    }
}
