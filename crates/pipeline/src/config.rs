//! Process-wide configuration, read once at startup and handed to constructors.

use std::path::PathBuf;

use cinematics::CinematicsConfig;
use serde::{Deserialize, Serialize};
use utils::env::{env_parse, env_string};

/// Everything the pipeline needs to know about its environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub backend: BackendConfig,
    pub research: ResearchConfig,
    pub image: CinematicsConfig,
    pub output_root: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            research: ResearchConfig::default(),
            image: CinematicsConfig::default(),
            output_root: PathBuf::from("outputs"),
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        Self {
            backend: BackendConfig::from_env(),
            research: ResearchConfig::from_env(),
            image: CinematicsConfig::from_env(),
            output_root: utils::default_output_root(),
        }
    }
}

/// Text generation tiers and their shared defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// OpenAI-compatible base URL, without the `/v1/...` suffix
    pub textgen_base_url: Option<String>,
    pub textgen_api_key: Option<String>,
    pub textgen_model: String,

    pub hf_token: Option<String>,
    pub hf_model: Option<String>,
    /// Extra inference-API models tried after `hf_model`
    pub hf_model_candidates: Vec<String>,
    pub hf_base_url: String,

    /// Timeout for each hosted call, tiers 1 and 2
    pub request_timeout_secs: u64,

    pub local_model_path: Option<PathBuf>,
    pub local_tokenizer_path: Option<PathBuf>,
    pub ctx_size: usize,
    pub n_threads: usize,

    pub max_tokens_default: u32,
    pub temperature_default: f32,
    pub prompt_truncate_chars: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            textgen_base_url: None,
            textgen_api_key: None,
            textgen_model: "gpt-3.5-turbo".to_string(),
            hf_token: None,
            hf_model: None,
            hf_model_candidates: Vec::new(),
            hf_base_url: "https://api-inference.huggingface.co".to_string(),
            request_timeout_secs: 30,
            local_model_path: None,
            local_tokenizer_path: None,
            ctx_size: 4096,
            n_threads: 4,
            max_tokens_default: 768,
            temperature_default: 0.7,
            prompt_truncate_chars: 8000,
        }
    }
}

impl BackendConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            textgen_base_url: env_string("TEXTGEN_BASE_URL"),
            textgen_api_key: env_string("TEXTGEN_API_KEY"),
            textgen_model: env_string("TEXTGEN_MODEL").unwrap_or(defaults.textgen_model),
            hf_token: env_string("HUGGINGFACE_API_TOKEN"),
            hf_model: env_string("HUGGINGFACE_MODEL"),
            hf_model_candidates: env_string("HF_MODELS")
                .map(|raw| parse_model_list(&raw))
                .unwrap_or_default(),
            hf_base_url: env_string("HF_INFERENCE_URL").unwrap_or(defaults.hf_base_url),
            request_timeout_secs: env_parse("HF_TIMEOUT_SECONDS", defaults.request_timeout_secs),
            local_model_path: env_string("LLM_MODEL_PATH").map(PathBuf::from),
            local_tokenizer_path: env_string("LLM_TOKENIZER_PATH").map(PathBuf::from),
            ctx_size: env_parse("LLM_CTX_SIZE", defaults.ctx_size),
            n_threads: env_parse("LLM_N_THREADS", defaults.n_threads),
            max_tokens_default: env_parse("LLM_MAX_TOKENS", defaults.max_tokens_default),
            temperature_default: env_parse("LLM_TEMPERATURE", defaults.temperature_default)
                .clamp(0.0, 2.0),
            prompt_truncate_chars: env_parse(
                "PROMPT_TRUNCATE_CHARS",
                defaults.prompt_truncate_chars,
            ),
        }
    }

    /// Inference-API models in the order they are tried: the primary model
    /// first, then the candidates with duplicates removed.
    pub fn hf_models(&self) -> Vec<String> {
        let mut models: Vec<String> = self.hf_model.iter().cloned().collect();
        for candidate in &self.hf_model_candidates {
            if !models.contains(candidate) {
                models.push(candidate.clone());
            }
        }
        models
    }
}

/// External lookups made by the research stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Suggestion endpoint for trending queries; unset means "not configured"
    pub trends_url: Option<String>,
    pub search_url: String,
    pub fetch_timeout_secs: u64,
    pub competitor_limit: usize,
    pub keyword_limit: usize,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            trends_url: None,
            search_url: "https://duckduckgo.com/html/".to_string(),
            fetch_timeout_secs: 8,
            competitor_limit: 5,
            keyword_limit: 20,
        }
    }
}

impl ResearchConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            trends_url: env_string("TRENDS_URL"),
            search_url: env_string("SEARCH_URL").unwrap_or(defaults.search_url),
            fetch_timeout_secs: env_parse("SEARCH_TIMEOUT_SECONDS", defaults.fetch_timeout_secs),
            ..defaults
        }
    }
}

fn parse_model_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect()
}
