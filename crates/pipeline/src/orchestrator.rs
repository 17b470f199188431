//! Pipeline orchestrator
//!
//! Fixed flow: Research → Content → {Social, Image}. The state is owned here
//! for the duration of a run; stages only ever see a shared borrow and hand
//! back a [`StageDelta`]. Social and Image run concurrently over the same
//! post-Content state and write disjoint keys.

use std::sync::Arc;

use cinematics::{CinematicsService, Cinematographer};
use serde::{Deserialize, Serialize};
use utils::{OutputDir, run_files};

use crate::{
    Result,
    brain::TextBackend,
    config::PipelineConfig,
    stages::{ContentStage, ImageStage, ResearchStage, SocialStage, StageName},
    state::{ImageArtifact, PipelineState, StageDelta},
};

/// Everything a caller provides to start a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    pub topic: String,
    pub output_dir: OutputDir,
    pub include_image: bool,
}

pub struct ContentPipeline {
    backend: Arc<TextBackend>,
    research: ResearchStage,
    content: ContentStage,
    social: SocialStage,
    image: ImageStage,
}

impl ContentPipeline {
    pub fn new(config: &PipelineConfig) -> Self {
        Self::with_components(
            ResearchStage::new(&config.research),
            Arc::new(TextBackend::new(config.backend.clone())),
            Arc::new(CinematicsService::new(config.image.clone())),
        )
    }

    /// Assemble from already built parts; the backend is shared by the
    /// content and social stages.
    pub fn with_components(
        research: ResearchStage,
        backend: Arc<TextBackend>,
        renderer: Arc<dyn Cinematographer>,
    ) -> Self {
        Self {
            content: ContentStage::new(backend.clone()),
            social: SocialStage::new(backend.clone()),
            image: ImageStage::new(renderer),
            research,
            backend,
        }
    }

    pub fn backend(&self) -> &TextBackend {
        &self.backend
    }

    /// Run every stage and return the merged state
    pub async fn run(&self, request: RunRequest) -> Result<PipelineState> {
        tracing::info!(
            "[PIPELINE] Starting run for {:?} into {} (image: {})",
            request.topic,
            request.output_dir.path().display(),
            request.include_image
        );

        let mut state = PipelineState::new(request.topic, request.output_dir);

        for stage in [StageName::Research, StageName::Content] {
            let delta = self.run_stage(stage, &state).await?;
            state.merge(delta);
        }

        for delta in self.fan_out(&state, request.include_image).await? {
            state.merge(delta);
        }

        tracing::info!(
            "[PIPELINE] Run complete, stages: {:?}",
            state.completed_stages()
        );
        Ok(state)
    }

    /// Social alongside Image, joined before returning
    async fn fan_out(&self, state: &PipelineState, include_image: bool) -> Result<Vec<StageDelta>> {
        if !include_image {
            tracing::debug!("[PIPELINE] Image branch disabled for this run");
            return Ok(vec![self.run_stage(StageName::Social, state).await?]);
        }

        let (social, image) = tokio::join!(
            self.run_stage(StageName::Social, state),
            self.run_stage(StageName::Image, state)
        );
        Ok(vec![social?, image?])
    }

    /// Run one stage against the current state.
    ///
    /// Fails only when a key the stage reads has not been produced yet.
    pub async fn run_stage(&self, stage: StageName, state: &PipelineState) -> Result<StageDelta> {
        tracing::info!("[PIPELINE] Stage {}: {}", stage.order(), stage.display_name());
        let output = &state.output_dir;

        let delta = match stage {
            StageName::Research => {
                StageDelta::Research(self.research.run(&state.topic, output).await)
            }
            StageName::Content => {
                let research = state.require_research(stage)?;
                StageDelta::Content(self.content.run(&state.topic, research, output).await)
            }
            StageName::Social => {
                let content = state.require_content(stage)?;
                StageDelta::Social(self.social.run(&state.topic, &content.blog_md, output).await)
            }
            StageName::Image => {
                let content = state.require_content(stage)?;
                StageDelta::Image(self.image.run(&content.blog_md, output).await)
            }
        };
        Ok(delta)
    }

    /// Re-render the hero image of an existing run from its stored blog post.
    /// A run without `blog.md` renders from an empty post.
    pub async fn run_image_only(&self, output: &OutputDir) -> ImageArtifact {
        let blog_md = output.read_text(run_files::BLOG).await.unwrap_or_else(|| {
            tracing::warn!(
                "[PIPELINE] No blog post in {}, rendering from defaults",
                output.path().display()
            );
            String::new()
        });
        self.image.run(&blog_md, output).await
    }
}
