//! Hosted inference API provider (HuggingFace text-generation style)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider_trait::{
    check_status, non_empty, GenerationRequest, ProviderError, ProviderType, TextProvider,
};
use crate::config::BackendConfig;

pub struct InferenceApiProvider {
    client: Client,
    token: Option<String>,
    models: Vec<String>,
    base_url: String,
    timeout: Duration,
}

impl InferenceApiProvider {
    pub fn new(config: &BackendConfig) -> Self {
        let models = config.hf_models();
        if config.hf_token.is_some() && !models.is_empty() {
            tracing::info!("[BACKEND] Inference API configured with models {:?}", models);
        }

        Self {
            client: Client::new(),
            token: config.hf_token.clone(),
            models,
            base_url: config.hf_base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    fn payload(request: &GenerationRequest) -> Value {
        json!({
            "inputs": request.prompt,
            "parameters": {
                "max_new_tokens": request.max_tokens,
                "temperature": request.temperature,
                "return_full_text": false,
            }
        })
    }

    async fn call_model(
        &self,
        token: &str,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(format!("{}/models/{}", self.base_url, model))
            .timeout(self.timeout)
            .header("Authorization", format!("Bearer {}", token))
            .header("Content-Type", "application/json")
            .json(&Self::payload(request))
            .send()
            .await?;
        let response = check_status(response).await?;
        let json: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        extract_generated_text(&json)
    }
}

/// Accepts `[{"generated_text": ..}]` as well as a bare object, and the
/// `summary_text` key summarisation models answer with.
fn extract_generated_text(json: &Value) -> Result<String, ProviderError> {
    let entry = match json {
        Value::Array(items) => items.first(),
        Value::Object(_) => Some(json),
        _ => None,
    }
    .ok_or_else(|| ProviderError::ParseError("unexpected inference response shape".into()))?;

    let text = entry["generated_text"]
        .as_str()
        .filter(|t| !t.trim().is_empty())
        .or_else(|| entry["summary_text"].as_str())
        .unwrap_or("");
    non_empty(text)
}

#[async_trait]
impl TextProvider for InferenceApiProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::InferenceApi
    }

    fn name(&self) -> &'static str {
        "Inference API"
    }

    fn is_configured(&self) -> bool {
        self.token.is_some() && !self.models.is_empty()
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("HUGGINGFACE_API_TOKEN".to_string()))?;

        let mut last_error =
            ProviderError::NotConfigured("no inference API models configured".to_string());

        for model in &self.models {
            match self.call_model(token, model, request).await {
                Ok(text) => {
                    tracing::info!("[BACKEND] Inference API model {} answered", model);
                    return Ok(text);
                }
                Err(e) => {
                    tracing::debug!("[BACKEND] Inference API model {} failed: {}", model, e);
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}
