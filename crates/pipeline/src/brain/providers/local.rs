//! In-process model provider
//!
//! The model is loaded once when the provider is built. A configured path
//! that fails to load leaves the tier unconfigured for the rest of the run.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;

use super::provider_trait::{
    non_empty, GenerationRequest, ProviderError, ProviderType, TextProvider,
};
use crate::config::BackendConfig;

#[cfg(feature = "local-model")]
mod gguf;

/// End-of-sequence marker local completions stop at
pub const STOP_MARKER: &str = "</s>";

/// Synchronous text completion running on the caller's thread
pub trait LocalModel: Send + Sync {
    fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
        stop: &[&str],
    ) -> Result<String, ProviderError>;
}

pub struct LocalProvider {
    model: Option<Arc<dyn LocalModel>>,
}

impl LocalProvider {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            model: load_local_model(config),
        }
    }

    /// Use an already loaded model
    pub fn with_model(model: Arc<dyn LocalModel>) -> Self {
        Self { model: Some(model) }
    }
}

#[async_trait]
impl TextProvider for LocalProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Local
    }

    fn name(&self) -> &'static str {
        "Local model"
    }

    fn is_configured(&self) -> bool {
        self.model.is_some()
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let model = self
            .model
            .clone()
            .ok_or_else(|| ProviderError::NotConfigured("LLM_MODEL_PATH".to_string()))?;
        let request = request.clone();

        let text = tokio::task::spawn_blocking(move || {
            model.complete(
                &request.prompt,
                request.max_tokens,
                request.temperature,
                &[STOP_MARKER],
            )
        })
        .await
        .map_err(|e| ProviderError::Inference(e.to_string()))??;

        non_empty(&truncate_at_stop(&text, &[STOP_MARKER]))
    }
}

/// Cut generated text at the first stop marker
pub(crate) fn truncate_at_stop(text: &str, stop: &[&str]) -> String {
    let end = stop
        .iter()
        .filter_map(|marker| text.find(marker))
        .min()
        .unwrap_or(text.len());
    text[..end].to_string()
}

fn tokenizer_path(config: &BackendConfig, model_path: &Path) -> PathBuf {
    config.local_tokenizer_path.clone().unwrap_or_else(|| {
        model_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join("tokenizer.json")
    })
}

fn load_local_model(config: &BackendConfig) -> Option<Arc<dyn LocalModel>> {
    let model_path = config.local_model_path.as_ref()?;
    if !model_path.exists() {
        tracing::warn!(
            "[BACKEND] LLM_MODEL_PATH {} does not exist, local tier disabled",
            model_path.display()
        );
        return None;
    }
    let tokenizer = tokenizer_path(config, model_path);

    #[cfg(feature = "local-model")]
    {
        match gguf::GgufModel::load(model_path, &tokenizer, config.ctx_size, config.n_threads) {
            Ok(model) => {
                tracing::info!("[BACKEND] Local model loaded from {}", model_path.display());
                Some(Arc::new(model))
            }
            Err(e) => {
                tracing::warn!("[BACKEND] Failed to load local model: {}", e);
                None
            }
        }
    }

    #[cfg(not(feature = "local-model"))]
    {
        tracing::warn!(
            "[BACKEND] LLM_MODEL_PATH is set ({}, tokenizer {}) but this build lacks the \
             `local-model` feature, local tier disabled",
            model_path.display(),
            tokenizer.display()
        );
        None
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct EchoModel {
        calls: Mutex<Vec<(u32, f32)>>,
        output: String,
    }

    impl LocalModel for EchoModel {
        fn complete(
            &self,
            _prompt: &str,
            max_tokens: u32,
            temperature: f32,
            stop: &[&str],
        ) -> Result<String, ProviderError> {
            assert_eq!(stop, &[STOP_MARKER]);
            self.calls.lock().unwrap().push((max_tokens, temperature));
            Ok(self.output.clone())
        }
    }

    #[test]
    fn test_truncate_at_stop() {
        assert_eq!(truncate_at_stop("hello</s>junk", &[STOP_MARKER]), "hello");
        assert_eq!(truncate_at_stop("no marker", &[STOP_MARKER]), "no marker");
        assert_eq!(truncate_at_stop("a|b</s>", &["</s>", "|"]), "a");
    }

    #[test]
    fn test_missing_model_path_is_unconfigured() {
        let provider = LocalProvider::new(&BackendConfig {
            local_model_path: Some(PathBuf::from("/definitely/not/here.gguf")),
            ..BackendConfig::default()
        });
        assert!(!provider.is_configured());
        assert!(!LocalProvider::new(&BackendConfig::default()).is_configured());
    }

    #[test]
    fn test_tokenizer_defaults_next_to_model() {
        let config = BackendConfig::default();
        assert_eq!(
            tokenizer_path(&config, Path::new("/models/llama.gguf")),
            PathBuf::from("/models/tokenizer.json")
        );
    }

    #[tokio::test]
    async fn test_generate_runs_model_and_cuts_at_stop() {
        let model = Arc::new(EchoModel {
            calls: Mutex::new(Vec::new()),
            output: "  local text </s> trailing".into(),
        });
        let provider = LocalProvider::with_model(model.clone());

        let text = provider
            .generate(&GenerationRequest {
                prompt: "p".into(),
                max_tokens: 12,
                temperature: 0.3,
            })
            .await
            .unwrap();

        assert_eq!(text, "local text");
        assert_eq!(*model.calls.lock().unwrap(), vec![(12, 0.3)]);
    }
}
