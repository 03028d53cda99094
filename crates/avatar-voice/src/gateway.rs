//! **CompletionGateway**: the boundary to the remote chat service.
//!
//! The service applies its own persona prompt and length limits; this side only sends
//! `{message, avatarType, language}` to `POST {base}/chat` and reads back
//! `{response, emotion}`. Error bodies (`{error, response, emotion}`) are surfaced as
//! [`GatewayError::Service`] so the orchestrator can reuse the service's apology text.

use crate::error::GatewayError;
use async_trait::async_trait;
use avatar_core::{AvatarConfig, Emotion, Language, Persona};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Body of `POST /chat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(rename = "avatarType")]
    pub avatar_type: Persona,
    pub language: Language,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>, avatar_type: Persona, language: Language) -> Self {
        Self {
            message: message.into(),
            avatar_type,
            language,
        }
    }
}

/// Successful reply. `emotion` is the service's hint; the orchestrator re-classifies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    #[serde(default)]
    pub emotion: Emotion,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    emotion: Option<Emotion>,
}

/// Stateless, one request per turn.
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply, GatewayError>;
}

/// `reqwest` client for the chat route.
#[derive(Debug, Clone)]
pub struct HttpCompletionGateway {
    /// Base URL without trailing slash (e.g. http://localhost:3000/api).
    pub base_url: String,
    client: reqwest::Client,
}

impl HttpCompletionGateway {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Build from `gateway_url` / `request_timeout_secs`.
    pub fn from_config(config: &AvatarConfig) -> Result<Self, GatewayError> {
        Self::new(
            config.gateway_url.clone(),
            Duration::from_secs(config.request_timeout_secs.max(1)),
        )
    }

    fn chat_url(&self) -> String {
        format!("{}/chat", self.base_url)
    }
}

#[async_trait]
impl CompletionGateway for HttpCompletionGateway {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply, GatewayError> {
        let url = self.chat_url();
        debug!(
            url = %url,
            persona = %request.avatar_type,
            language = %request.language,
            "chat request"
        );

        let res = self.client.post(&url).json(request).send().await?;
        let status = res.status();
        if status.is_success() {
            let reply: ChatReply = res
                .json()
                .await
                .map_err(|e| GatewayError::Decode(e.to_string()))?;
            return Ok(reply);
        }

        let raw = res.text().await.unwrap_or_default();
        let body: ErrorBody = serde_json::from_str(&raw).unwrap_or_default();
        let message = body.error.unwrap_or_else(|| {
            if raw.trim().is_empty() {
                status.to_string()
            } else {
                raw.clone()
            }
        });

        if status == reqwest::StatusCode::BAD_REQUEST {
            return Err(GatewayError::BadRequest(message));
        }
        Err(GatewayError::Service {
            status: status.as_u16(),
            message,
            fallback: body.response,
            fallback_emotion: body.emotion,
        })
    }
}
