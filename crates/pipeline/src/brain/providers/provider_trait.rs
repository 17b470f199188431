//! Provider trait and common types for tiered text generation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Generation tiers, in the order the backend tries them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    /// Hosted OpenAI-compatible endpoint
    Hosted,
    /// Hosted inference API (HuggingFace style)
    InferenceApi,
    /// In-process model
    Local,
    /// Canned placeholder text, always succeeds
    Fallback,
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderType::Hosted => write!(f, "hosted"),
            ProviderType::InferenceApi => write!(f, "inference_api"),
            ProviderType::Local => write!(f, "local"),
            ProviderType::Fallback => write!(f, "fallback"),
        }
    }
}

/// Why a tier did not produce text
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Response parse error: {0}")]
    ParseError(String),

    #[error("Provider returned empty text")]
    EmptyResponse,

    #[error("Local inference failed: {0}")]
    Inference(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::RequestFailed(err.to_string())
    }
}

/// One generation call after the backend applied truncation and defaults
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// A single fallible generation strategy
#[async_trait]
pub trait TextProvider: Send + Sync {
    fn provider_type(&self) -> ProviderType;

    /// Name for logging
    fn name(&self) -> &'static str;

    /// Whether this tier has what it needs to be attempted at all
    fn is_configured(&self) -> bool;

    /// Produce non-empty, trimmed text or say why not
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError>;
}

/// Trim generated text, rejecting blank output
pub(crate) fn non_empty(text: &str) -> Result<String, ProviderError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(ProviderError::EmptyResponse)
    } else {
        Ok(trimmed.to_string())
    }
}

/// Bail out with an [`ProviderError::ApiError`] for non-2xx responses
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(ProviderError::ApiError {
        status: status.as_u16(),
        message,
    })
}
