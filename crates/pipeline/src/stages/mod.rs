//! Pipeline stages
//!
//! Four stages, each a total function over its inputs:
//! 1. Research - trending keywords and competitor listings
//! 2. Content - blog post plus SEO metadata
//! 3. Social - tweets, LinkedIn posts, Instagram captions
//! 4. Image - hero image for the blog post
//!
//! Social and Image both hang off Content and write disjoint keys.

pub mod content;
pub mod image;
pub mod research;
pub mod social;

use serde::{Deserialize, Serialize};

pub use content::ContentStage;
pub use image::ImageStage;
pub use research::{
    CompetitorSource, DuckDuckGoSource, ResearchStage, SuggestTrendSource, TrendSource,
};
pub use social::SocialStage;

/// Stage names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    Research,
    Content,
    Social,
    Image,
}

impl StageName {
    pub const ALL: [StageName; 4] = [
        StageName::Research,
        StageName::Content,
        StageName::Social,
        StageName::Image,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::Research => "research",
            StageName::Content => "content",
            StageName::Social => "social",
            StageName::Image => "image",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            StageName::Research => "Research",
            StageName::Content => "Content",
            StageName::Social => "Social",
            StageName::Image => "Image",
        }
    }

    /// Key the stage's artifact is stored under in the run state
    pub fn state_key(&self) -> &'static str {
        match self {
            StageName::Research => "research",
            StageName::Content => "content",
            StageName::Social => "social",
            StageName::Image => "images",
        }
    }

    /// Depth in the flow; Social and Image share a level
    pub fn order(&self) -> u32 {
        match self {
            StageName::Research => 1,
            StageName::Content => 2,
            StageName::Social | StageName::Image => 3,
        }
    }
}

impl std::fmt::Display for StageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
