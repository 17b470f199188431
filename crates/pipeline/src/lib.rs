//! # Content pipeline
//!
//! Topic in, marketing content out: research → content → {social, image},
//! driven by a tiered text-generation backend that always answers.

pub mod brain;
pub mod config;
pub mod orchestrator;
pub mod stages;
pub mod state;


pub use brain::{Generation, GenerationOptions, ProviderType, TextBackend, TierAttempt};
pub use config::{BackendConfig, PipelineConfig, ResearchConfig};
pub use orchestrator::{ContentPipeline, RunRequest};
pub use stages::{ContentStage, ImageStage, ResearchStage, SocialStage, StageName};
pub use state::{
    Competitor, ContentArtifact, ImageArtifact, ImageStatus, PipelineState, ResearchArtifact,
    SeoMetadata, SocialArtifact, StageDelta,
};

/// Errors that abort a pipeline run
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A stage was wired before the stage it depends on produced its artifact
    #[error("Missing state key '{key}' required by {stage} stage")]
    MissingState { key: &'static str, stage: StageName },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
