//! Pipeline state and the artifacts stages contribute to it
//!
//! [`PipelineState`] is owned by the orchestrator for one run. Stages get a
//! shared borrow of it and hand back a [`StageDelta`], which the orchestrator
//! merges. Keys are only ever added or replaced, never removed.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use utils::OutputDir;

use crate::{PipelineError, Result, stages::StageName};

/// One competitor listing found by the research stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Competitor {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchArtifact {
    pub topic: String,
    /// Never empty, deduplicated case-insensitively
    pub trending_keywords: Vec<String>,
    pub competitors: Vec<Competitor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeoMetadata {
    pub title: String,
    pub meta_description: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentArtifact {
    /// Markdown blog document
    pub blog_md: String,
    pub seo: SeoMetadata,
}

/// Always exactly 3 tweets, 2 LinkedIn posts and 3 Instagram captions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialArtifact {
    pub tweets: Vec<String>,
    pub linkedin_posts: Vec<String>,
    pub instagram_captions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageStatus {
    Ok,
    NoImages,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageArtifact {
    pub status: ImageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hero_image: Option<PathBuf>,
}

impl ImageArtifact {
    pub fn ok(hero_image: PathBuf) -> Self {
        Self {
            status: ImageStatus::Ok,
            hero_image: Some(hero_image),
        }
    }

    pub fn no_images() -> Self {
        Self {
            status: ImageStatus::NoImages,
            hero_image: None,
        }
    }

    pub fn skipped() -> Self {
        Self {
            status: ImageStatus::Skipped,
            hero_image: None,
        }
    }
}

/// What a single stage contributes to the state, tagged by artifact kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageDelta {
    Research(ResearchArtifact),
    Content(ContentArtifact),
    Social(SocialArtifact),
    Image(ImageArtifact),
}

impl StageDelta {
    pub fn stage(&self) -> StageName {
        match self {
            StageDelta::Research(_) => StageName::Research,
            StageDelta::Content(_) => StageName::Content,
            StageDelta::Social(_) => StageName::Social,
            StageDelta::Image(_) => StageName::Image,
        }
    }
}

/// Accumulated result of one run; serialises to the `final_state.json` shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    pub topic: String,
    pub output_dir: OutputDir,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research: Option<ResearchArtifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<ContentArtifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social: Option<SocialArtifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<ImageArtifact>,
}

impl PipelineState {
    pub fn new(topic: impl Into<String>, output_dir: OutputDir) -> Self {
        Self {
            topic: topic.into(),
            output_dir,
            research: None,
            content: None,
            social: None,
            images: None,
        }
    }

    /// Fold a stage's delta in; the delta's key overwrites, the rest persist
    pub fn merge(&mut self, delta: StageDelta) {
        tracing::debug!("[PIPELINE] Merging {} delta", delta.stage());
        match delta {
            StageDelta::Research(research) => self.research = Some(research),
            StageDelta::Content(content) => self.content = Some(content),
            StageDelta::Social(social) => self.social = Some(social),
            StageDelta::Image(images) => self.images = Some(images),
        }
    }

    /// Builder form of [`merge`](Self::merge)
    pub fn with(mut self, delta: StageDelta) -> Self {
        self.merge(delta);
        self
    }

    pub fn require_research(&self, stage: StageName) -> Result<&ResearchArtifact> {
        self.research.as_ref().ok_or(PipelineError::MissingState {
            key: StageName::Research.state_key(),
            stage,
        })
    }

    pub fn require_content(&self, stage: StageName) -> Result<&ContentArtifact> {
        self.content.as_ref().ok_or(PipelineError::MissingState {
            key: StageName::Content.state_key(),
            stage,
        })
    }

    /// Stages whose artifact is present, in pipeline order
    pub fn completed_stages(&self) -> Vec<StageName> {
        StageName::ALL
            .into_iter()
            .filter(|stage| match stage {
                StageName::Research => self.research.is_some(),
                StageName::Content => self.content.is_some(),
                StageName::Social => self.social.is_some(),
                StageName::Image => self.images.is_some(),
            })
            .collect()
    }
}
