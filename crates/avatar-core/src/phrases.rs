//! Canned, localized strings the orchestrator and front ends show without asking the model.

use crate::types::Language;

impl Language {
    /// Greeting shown when the chat box opens on an empty history.
    pub fn welcome_message(&self) -> &'static str {
        match self {
            Language::Pt => "Olá! Sou a Maria. É um prazer conhecer-te! Como posso ajudar-te hoje?",
            Language::En => "Hi! I'm Maria. It's a pleasure to meet you! How can I help you today?",
            Language::Fr => {
                "Bonjour ! Je suis Maria. Ravie de faire ta connaissance ! Comment puis-je t'aider ?"
            }
        }
    }

    /// Reply used when the completion service cannot be reached or fails.
    pub fn fallback_reply(&self) -> &'static str {
        match self {
            Language::Pt => "Desculpe, ocorreu um erro. Tente novamente.",
            Language::En => "Sorry, something went wrong. Please try again.",
            Language::Fr => "Désolée, une erreur s'est produite. Réessaie.",
        }
    }

    /// Reply used when the service answers with blank text.
    pub fn empty_reply_apology(&self) -> &'static str {
        match self {
            Language::Pt => "Desculpe, não consegui processar sua mensagem.",
            Language::En => "Sorry, I couldn't process your message.",
            Language::Fr => "Désolée, je n'ai pas pu traiter ton message.",
        }
    }

    /// Screen-reader text for a message the user just sent.
    pub fn user_announcement(&self, message: &str) -> String {
        match self {
            Language::Pt => format!("Tu disseste: {}", message),
            Language::En => format!("You said: {}", message),
            Language::Fr => format!("Tu as dit : {}", message),
        }
    }

    /// Screen-reader text for the avatar's reply.
    pub fn reply_announcement(&self, message: &str) -> String {
        match self {
            Language::Pt => format!("Maria respondeu: {}", message),
            Language::En => format!("Maria replied: {}", message),
            Language::Fr => format!("Maria a répondu : {}", message),
        }
    }
}
