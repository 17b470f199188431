//! Hosted OpenAI-compatible provider
//!
//! Tries the legacy `/v1/completions` route first and falls back to
//! `/v1/chat/completions` on the same base URL.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};

use super::provider_trait::{
    check_status, non_empty, GenerationRequest, ProviderError, ProviderType, TextProvider,
};
use crate::config::BackendConfig;

const CHAT_SYSTEM_PROMPT: &str = "You are a helpful writing assistant.";

pub struct OpenAIProvider {
    client: Client,
    base_url: Option<String>,
    api_key: Option<String>,
    model: String,
    timeout: Duration,
}

impl OpenAIProvider {
    pub fn new(config: &BackendConfig) -> Self {
        match (&config.textgen_base_url, &config.textgen_api_key) {
            (Some(url), Some(_)) => {
                tracing::info!("[BACKEND] Hosted endpoint configured at {} with API key", url)
            }
            (Some(url), None) => tracing::info!(
                "[BACKEND] Hosted endpoint configured at {} without API key",
                url
            ),
            (None, _) => tracing::debug!("[BACKEND] No hosted endpoint configured"),
        }

        Self {
            client: Client::new(),
            base_url: config
                .textgen_base_url
                .as_ref()
                .map(|u| u.trim_end_matches('/').to_string()),
            api_key: config.textgen_api_key.clone(),
            model: config.textgen_model.clone(),
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    fn post(&self, url: String) -> RequestBuilder {
        let builder = self
            .client
            .post(url)
            .timeout(self.timeout)
            .header("Content-Type", "application/json");

        match &self.api_key {
            Some(key) => builder.header("Authorization", format!("Bearer {}", key)),
            None => builder,
        }
    }

    fn completions_payload(&self, request: &GenerationRequest) -> Value {
        json!({
            "model": self.model,
            "prompt": request.prompt,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        })
    }

    fn chat_payload(&self, request: &GenerationRequest) -> Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": CHAT_SYSTEM_PROMPT },
                { "role": "user", "content": request.prompt }
            ],
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        })
    }

    async fn call(&self, url: String, payload: Value) -> Result<Value, ProviderError> {
        let response = self.post(url).json(&payload).send().await?;
        let response = check_status(response).await?;
        response
            .json::<Value>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))
    }

    async fn complete(
        &self,
        base: &str,
        request: &GenerationRequest,
    ) -> Result<String, ProviderError> {
        let json = self
            .call(format!("{}/v1/completions", base), self.completions_payload(request))
            .await?;
        non_empty(json["choices"][0]["text"].as_str().unwrap_or(""))
    }

    async fn chat(
        &self,
        base: &str,
        request: &GenerationRequest,
    ) -> Result<String, ProviderError> {
        let json = self
            .call(format!("{}/v1/chat/completions", base), self.chat_payload(request))
            .await?;
        non_empty(json["choices"][0]["message"]["content"].as_str().unwrap_or(""))
    }
}

#[async_trait]
impl TextProvider for OpenAIProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Hosted
    }

    fn name(&self) -> &'static str {
        "OpenAI-compatible"
    }

    fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let base = self
            .base_url
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("TEXTGEN_BASE_URL".to_string()))?;

        match self.complete(base, request).await {
            Ok(text) => return Ok(text),
            Err(e) => tracing::warn!("[BACKEND] Completions call failed, trying chat: {}", e),
        }

        self.chat(base, request).await
    }
}
