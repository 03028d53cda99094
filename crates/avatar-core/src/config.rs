//! Avatar configuration: `avatar.toml` when present, then environment overrides.
//!
//! | Env | Default | Description |
//! |-----|---------|-------------|
//! | AVATAR_GATEWAY_URL | http://localhost:3000/api | Base URL of the chat service (`POST {base}/chat`). |
//! | AVATAR_REQUEST_TIMEOUT_SECS | 30 | Per-request timeout for the chat service. |
//! | AVATAR_LANGUAGE | pt | pt \| en \| fr |
//! | AVATAR_VOLUME | 0.9 | Playback volume, clamped to 0.0–1.0. |
//! | AVATAR_SPEECH_RATE | 0.9 | Synthesis rate multiplier. |
//! | AVATAR_ACCESSIBILITY_MODE | false | Use the accessibility persona and emit announcements. |
//! | AVATAR_EVENT_CAPACITY | 256 | Buffer size of the orchestrator event channel. |

use crate::error::ConfigError;
use crate::types::Language;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_VOLUME: f32 = 0.9;
pub const DEFAULT_SPEECH_RATE: f32 = 0.9;

fn default_gateway_url() -> String {
    "http://localhost:3000/api".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_volume() -> f32 {
    DEFAULT_VOLUME
}

fn default_speech_rate() -> f32 {
    DEFAULT_SPEECH_RATE
}

fn default_event_capacity() -> usize {
    256
}

/// Runtime settings for the orchestrator and its devices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvatarConfig {
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub language: Language,
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default = "default_speech_rate")]
    pub speech_rate: f32,
    #[serde(default)]
    pub accessibility_mode: bool,
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            gateway_url: default_gateway_url(),
            request_timeout_secs: default_request_timeout_secs(),
            language: Language::default(),
            volume: DEFAULT_VOLUME,
            speech_rate: DEFAULT_SPEECH_RATE,
            accessibility_mode: false,
            event_capacity: default_event_capacity(),
        }
    }
}

impl AvatarConfig {
    /// Default path for the config file.
    pub fn default_path() -> PathBuf {
        PathBuf::from("avatar.toml")
    }

    /// Load `avatar.toml` (if it exists) and apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        let mut config = if path.exists() {
            Self::load_from_path(&path)?
        } else {
            debug!(path = %path.display(), "no config file; using defaults");
            Self::default()
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides only.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Parse a TOML file. Missing keys take their defaults.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: AvatarConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from `AVATAR_*` variables. Unset or invalid values leave the field alone.
    pub fn apply_env(&mut self) {
        if let Some(url) = env_opt_string("AVATAR_GATEWAY_URL") {
            self.gateway_url = url;
        }
        if let Some(secs) = env_parse::<u64>("AVATAR_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = secs.max(1);
        }
        if let Some(lang) = env_parse::<Language>("AVATAR_LANGUAGE") {
            self.language = lang;
        }
        if let Some(volume) = env_parse::<f32>("AVATAR_VOLUME") {
            if volume.is_finite() {
                self.volume = volume.clamp(0.0, 1.0);
            }
        }
        if let Some(rate) = env_parse::<f32>("AVATAR_SPEECH_RATE") {
            if rate.is_finite() && rate > 0.0 {
                self.speech_rate = rate;
            }
        }
        self.accessibility_mode = env_bool("AVATAR_ACCESSIBILITY_MODE", self.accessibility_mode);
        if let Some(capacity) = env_parse::<usize>("AVATAR_EVENT_CAPACITY") {
            self.event_capacity = capacity.max(1);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gateway_url.trim().is_empty() {
            return Err(ConfigError::Invalid("gateway_url is empty".to_string()));
        }
        if !self.volume.is_finite() || !(0.0..=1.0).contains(&self.volume) {
            return Err(ConfigError::Invalid(format!(
                "volume must be within 0.0..=1.0, got {}",
                self.volume
            )));
        }
        if !self.speech_rate.is_finite() || self.speech_rate <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "speech_rate must be positive, got {}",
                self.speech_rate
            )));
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::Invalid("event_capacity must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) => {
            let v = v.trim();
            if v.is_empty() {
                default
            } else {
                v.eq_ignore_ascii_case("true") || v == "1"
            }
        }
        Err(_) => default,
    }
}

fn env_opt_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env_opt_string(name).and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = AvatarConfig::default();
        assert_eq!(c.gateway_url, "http://localhost:3000/api");
        assert_eq!(c.language, Language::Pt);
        assert!((c.volume - 0.9).abs() < f32::EPSILON);
        assert!(!c.accessibility_mode);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn partial_toml_takes_defaults() {
        let c: AvatarConfig = toml::from_str("language = \"fr\"\nvolume = 0.5\n").unwrap();
        assert_eq!(c.language, Language::Fr);
        assert!((c.volume - 0.5).abs() < f32::EPSILON);
        assert_eq!(c.request_timeout_secs, 30);
        assert_eq!(c.event_capacity, 256);
    }

    #[test]
    fn out_of_range_volume_is_invalid() {
        let c = AvatarConfig {
            volume: 1.5,
            ..Default::default()
        };
        assert!(matches!(c.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn empty_gateway_url_is_invalid() {
        let c = AvatarConfig {
            gateway_url: "  ".to_string(),
            ..Default::default()
        };
        assert!(c.validate().is_err());
    }
}
