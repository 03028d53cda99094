//! avatar-core: vocabulary for the interactive avatar (emotions, languages, personas, chat
//! history entries), the keyword emotion classifier, and configuration loading.
//!
//! Nothing here performs I/O besides reading the optional config file; the async
//! orchestration lives in `avatar-voice`.

mod config;
mod emotion;
mod error;
mod phrases;
mod types;

pub use config::{AvatarConfig, DEFAULT_SPEECH_RATE, DEFAULT_VOLUME};
pub use emotion::{classify, resolve, Emotion};
pub use error::ConfigError;
pub use types::{base_subtag, ChatEntry, ChatRole, Language, Persona};
