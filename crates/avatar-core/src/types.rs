//! Conversation vocabulary shared by the orchestrator, the gateway client, and front ends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported conversation languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Pt,
    En,
    Fr,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Pt, Language::En, Language::Fr];

    /// Short code sent on the wire (`pt`, `en`, `fr`).
    pub fn code(&self) -> &'static str {
        match self {
            Language::Pt => "pt",
            Language::En => "en",
            Language::Fr => "fr",
        }
    }

    /// BCP-47 locale handed to the speech devices.
    pub fn locale(&self) -> &'static str {
        match self {
            Language::Pt => "pt-BR",
            Language::En => "en-US",
            Language::Fr => "fr-FR",
        }
    }

    /// Human-readable name (used in system prompts upstream and in logs).
    pub fn label(&self) -> &'static str {
        match self {
            Language::Pt => "Portuguese",
            Language::En => "English",
            Language::Fr => "French",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    /// Accepts a short code or a full locale (`"pt-PT"` → `Pt`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let base = base_subtag(s.trim());
        Language::ALL
            .into_iter()
            .find(|l| l.code().eq_ignore_ascii_case(base))
            .ok_or_else(|| format!("unsupported language: {}", s))
    }
}

/// Primary subtag of a locale (`"pt-BR"` → `"pt"`, `"en_US"` → `"en"`).
pub fn base_subtag(locale: &str) -> &str {
    locale
        .split(|c| c == '-' || c == '_')
        .next()
        .unwrap_or(locale)
}

/// System-prompt variant the completion service applies (`avatarType` on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    Voice,
    #[default]
    Text,
    Accessibility,
}

impl Persona {
    pub fn as_str(&self) -> &'static str {
        match self {
            Persona::Voice => "voice",
            Persona::Text => "text",
            Persona::Accessibility => "accessibility",
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Author of a chat history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    #[serde(alias = "assistant")]
    Avatar,
}

/// One line of the visible transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub role: ChatRole,
    pub message: String,
    #[serde(default = "Utc::now")]
    pub at: DateTime<Utc>,
}

impl ChatEntry {
    pub fn user(message: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            message: message.into(),
            at: Utc::now(),
        }
    }

    pub fn avatar(message: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Avatar,
            message: message.into(),
            at: Utc::now(),
        }
    }

    /// Same author and text (timestamps ignored).
    pub fn same_as(&self, role: ChatRole, message: &str) -> bool {
        self.role == role && self.message == message
    }
}
