//! Text generation backend
//!
//! One `generate(prompt, options) -> text` contract over an ordered list of
//! tiers. Every tier failure falls through to the next; when nothing is
//! configured or everything failed, the deterministic fallback answers.
//! `generate` therefore never fails and never returns an empty string.

pub mod fallback;
pub mod providers;

use serde::Serialize;

use crate::config::BackendConfig;
pub use providers::{
    GenerationRequest, InferenceApiProvider, LocalModel, LocalProvider, OpenAIProvider,
    ProviderError, ProviderType, TextProvider,
};

/// Per-call overrides; `None` uses the configured defaults
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenerationOptions {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl GenerationOptions {
    pub fn max_tokens(max_tokens: u32) -> Self {
        Self {
            max_tokens: Some(max_tokens),
            temperature: None,
        }
    }
}

/// A tier that was attempted and did not produce text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierAttempt {
    pub provider: ProviderType,
    pub reason: String,
}

/// Generated text together with how it was obtained
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Generation {
    pub text: String,
    pub source: ProviderType,
    /// Attempted tiers that failed, in the order they were tried
    pub attempts: Vec<TierAttempt>,
}

pub struct TextBackend {
    config: BackendConfig,
    tiers: Vec<Box<dyn TextProvider>>,
}

impl TextBackend {
    /// Hosted endpoint, then inference API, then local model
    pub fn new(config: BackendConfig) -> Self {
        let tiers: Vec<Box<dyn TextProvider>> = vec![
            Box::new(OpenAIProvider::new(&config)),
            Box::new(InferenceApiProvider::new(&config)),
            Box::new(LocalProvider::new(&config)),
        ];
        Self::with_tiers(config, tiers)
    }

    /// Use the given tiers, tried in order, ahead of the fallback
    pub fn with_tiers(config: BackendConfig, tiers: Vec<Box<dyn TextProvider>>) -> Self {
        let configured: Vec<&'static str> = tiers
            .iter()
            .filter(|t| t.is_configured())
            .map(|t| t.name())
            .collect();
        if configured.is_empty() {
            tracing::warn!("[BACKEND] No generation tier configured, using placeholder text");
        } else {
            tracing::info!("[BACKEND] Generation tiers available: {:?}", configured);
        }

        Self { config, tiers }
    }

    pub fn default_max_tokens(&self) -> u32 {
        self.config.max_tokens_default
    }

    /// True iff at least one non-fallback tier is configured
    pub fn is_available(&self) -> bool {
        self.tiers.iter().any(|t| t.is_configured())
    }

    /// Apply truncation, defaults and bounds to a raw call
    pub fn prepare(&self, prompt: &str, options: GenerationOptions) -> GenerationRequest {
        let max_tokens = options
            .max_tokens
            .filter(|&m| m > 0)
            .unwrap_or(self.config.max_tokens_default)
            .max(1);
        let temperature = options
            .temperature
            .unwrap_or(self.config.temperature_default)
            .clamp(0.0, 2.0);

        GenerationRequest {
            prompt: truncate_chars(prompt, self.config.prompt_truncate_chars),
            max_tokens,
            temperature,
        }
    }

    pub async fn generate(&self, prompt: &str, options: GenerationOptions) -> String {
        self.generate_traced(prompt, options).await.text
    }

    pub async fn generate_traced(&self, prompt: &str, options: GenerationOptions) -> Generation {
        let request = self.prepare(prompt, options);
        let mut attempts = Vec::new();

        for tier in self.tiers.iter().filter(|t| t.is_configured()) {
            tracing::debug!(
                "[BACKEND] Trying {} ({} prompt chars, max_tokens={})",
                tier.name(),
                request.prompt.len(),
                request.max_tokens
            );

            match tier.generate(&request).await {
                Ok(text) if !text.trim().is_empty() => {
                    tracing::info!("[BACKEND] {} produced {} chars", tier.name(), text.len());
                    return Generation {
                        text,
                        source: tier.provider_type(),
                        attempts,
                    };
                }
                Ok(_) => attempts.push(TierAttempt {
                    provider: tier.provider_type(),
                    reason: ProviderError::EmptyResponse.to_string(),
                }),
                Err(e) => {
                    tracing::warn!("[BACKEND] {} failed, falling through: {}", tier.name(), e);
                    attempts.push(TierAttempt {
                        provider: tier.provider_type(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Generation {
            text: fallback::canned_response(&request.prompt).to_string(),
            source: ProviderType::Fallback,
            attempts,
        }
    }
}

/// Keep at most `max_chars` characters, never splitting a code point
fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}
