//! Generation tiers behind a single provider trait
//!
//! Each tier is a [`TextProvider`]; the backend walks them in priority
//! order and falls through on any failure.

mod inference_api;
mod local;
mod openai;
mod provider_trait;

pub use inference_api::InferenceApiProvider;
pub use local::{LocalModel, LocalProvider, STOP_MARKER};
pub use openai::OpenAIProvider;
pub use provider_trait::{GenerationRequest, ProviderError, ProviderType, TextProvider};
