//! Quantized llama-family inference with candle

use std::{path::Path, sync::Mutex};

use candle_core::{quantized::gguf_file, Device, Tensor};
use candle_transformers::{generation::LogitsProcessor, models::quantized_llama::ModelWeights};
use tokenizers::Tokenizer;

use super::{truncate_at_stop, LocalModel, STOP_MARKER};
use crate::brain::providers::ProviderError;

const SAMPLING_SEED: u64 = 299_792_458;

pub struct GgufModel {
    weights: Mutex<ModelWeights>,
    tokenizer: Tokenizer,
    device: Device,
    eos_token: Option<u32>,
    ctx_size: usize,
    pool: rayon::ThreadPool,
}

fn inference(err: impl std::fmt::Display) -> ProviderError {
    ProviderError::Inference(err.to_string())
}

impl GgufModel {
    pub fn load(
        model_path: &Path,
        tokenizer_path: &Path,
        ctx_size: usize,
        n_threads: usize,
    ) -> Result<Self, ProviderError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(n_threads.max(1))
            .build()
            .map_err(inference)?;
        let device = Device::Cpu;

        let weights = pool.install(|| {
            let mut file = std::fs::File::open(model_path).map_err(inference)?;
            let content = gguf_file::Content::read(&mut file).map_err(inference)?;
            tracing::debug!(
                "[BACKEND] GGUF model has {} tensors",
                content.tensor_infos.len()
            );
            ModelWeights::from_gguf(content, &mut file, &device).map_err(inference)
        })?;

        let tokenizer = Tokenizer::from_file(tokenizer_path).map_err(inference)?;
        let eos_token = tokenizer.token_to_id(STOP_MARKER);

        Ok(Self {
            weights: Mutex::new(weights),
            tokenizer,
            device,
            eos_token,
            ctx_size,
            pool,
        })
    }

    fn run(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
        stop: &[&str],
    ) -> Result<String, ProviderError> {
        let encoding = self.tokenizer.encode(prompt, true).map_err(inference)?;
        let mut prompt_tokens = encoding.get_ids().to_vec();

        // Keep the tail of the prompt so prompt + completion fit the window
        let max_tokens = max_tokens as usize;
        let prompt_budget = self.ctx_size.saturating_sub(max_tokens).max(1);
        if prompt_tokens.len() > prompt_budget {
            prompt_tokens.drain(..prompt_tokens.len() - prompt_budget);
        }
        let max_new = max_tokens.min(self.ctx_size.saturating_sub(prompt_tokens.len()));

        let mut weights = self
            .weights
            .lock()
            .map_err(|_| ProviderError::Inference("model lock poisoned".into()))?;
        let temperature = (temperature > 0.0).then_some(f64::from(temperature));
        let mut sampler = LogitsProcessor::new(SAMPLING_SEED, temperature, None);

        let mut generated: Vec<u32> = Vec::with_capacity(max_new);
        let mut input = prompt_tokens;
        let mut index_pos = 0;

        for _ in 0..max_new {
            let tensor = Tensor::new(input.as_slice(), &self.device)
                .and_then(|t| t.unsqueeze(0))
                .map_err(inference)?;
            let logits = weights
                .forward(&tensor, index_pos)
                .and_then(|l| l.squeeze(0))
                .map_err(inference)?;
            index_pos += input.len();

            let next = sampler.sample(&logits).map_err(inference)?;
            if Some(next) == self.eos_token {
                break;
            }
            generated.push(next);
            input = vec![next];
        }

        let text = self.tokenizer.decode(&generated, true).map_err(inference)?;
        Ok(truncate_at_stop(&text, stop))
    }
}

impl LocalModel for GgufModel {
    fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
        stop: &[&str],
    ) -> Result<String, ProviderError> {
        self.pool
            .install(|| self.run(prompt, max_tokens, temperature, stop))
    }
}
