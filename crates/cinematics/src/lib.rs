use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;
use utils::env::{non_blank, parse_or_default};

/// Runtime configuration for the image synthesis service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CinematicsConfig {
    pub sd_base_url: String,
    pub width: u32,
    pub height: u32,
    pub steps: u32,
    pub cfg_scale: f32,
    pub sampler: String,
    pub timeout_secs: u64,
}

impl Default for CinematicsConfig {
    fn default() -> Self {
        Self {
            sd_base_url: "http://127.0.0.1:7860".into(),
            width: 768,
            height: 512,
            steps: 25,
            cfg_scale: 7.0,
            sampler: "Euler a".into(),
            timeout_secs: 60,
        }
    }
}

impl CinematicsConfig {
    /// Defaults overridden by `SD_WEBUI_URL`, `SD_SAMPLER` and `SD_TIMEOUT_SECONDS`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Blank values keep the default, a malformed timeout is logged and ignored
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            sd_base_url: non_blank(lookup("SD_WEBUI_URL")).unwrap_or(defaults.sd_base_url),
            sampler: non_blank(lookup("SD_SAMPLER")).unwrap_or(defaults.sampler),
            timeout_secs: parse_or_default(
                "SD_TIMEOUT_SECONDS",
                lookup("SD_TIMEOUT_SECONDS"),
                defaults.timeout_secs,
            ),
            ..defaults
        }
    }
}

/// Anything able to turn a text prompt into still images.
///
/// Images come back base64-encoded, in the order the service returned them.
/// An empty vector is a valid answer (the service rendered nothing).
#[async_trait]
pub trait Cinematographer: Send + Sync {
    async fn render_still(&self, prompt: &str) -> Result<Vec<String>>;
}

pub struct CinematicsService {
    client: Client,
    config: CinematicsConfig,
}

impl CinematicsService {
    pub fn new(config: CinematicsConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn txt2img_endpoint(&self) -> String {
        format!("{}/sdapi/v1/txt2img", self.config.sd_base_url.trim_end_matches('/'))
    }

    fn build_payload(&self, prompt: &str) -> Txt2ImgRequest {
        Txt2ImgRequest {
            prompt: prompt.to_string(),
            width: self.config.width,
            height: self.config.height,
            steps: self.config.steps,
            cfg_scale: self.config.cfg_scale,
            sampler_name: self.config.sampler.clone(),
        }
    }
}

#[async_trait]
impl Cinematographer for CinematicsService {
    async fn render_still(&self, prompt: &str) -> Result<Vec<String>> {
        let endpoint = self.txt2img_endpoint();
        info!("Requesting txt2img render from {}", endpoint);

        let response = self
            .client
            .post(&endpoint)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .json(&self.build_payload(prompt))
            .send()
            .await
            .with_context(|| format!("txt2img request to {} failed", endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("txt2img returned {}: {}", status, body));
        }

        let body = response
            .json::<Txt2ImgResponse>()
            .await
            .context("Failed to parse txt2img response")?;

        info!("txt2img returned {} image(s)", body.images.len());
        Ok(body.images)
    }
}

/// Decode one base64 image as returned by the service.
/// Tolerates a `data:image/...;base64,` prefix.
pub fn decode_image(encoded: &str) -> Result<Vec<u8>> {
    let raw = match encoded.split_once(";base64,") {
        Some((_, data)) => data,
        None => encoded,
    };
    STANDARD
        .decode(raw.trim())
        .context("Image payload is not valid base64")
}

#[derive(Debug, Clone, Serialize)]
struct Txt2ImgRequest {
    prompt: String,
    width: u32,
    height: u32,
    steps: u32,
    cfg_scale: f32,
    sampler_name: String,
}

#[derive(Debug, Deserialize)]
struct Txt2ImgResponse {
    #[serde(default)]
    images: Vec<String>,
}
