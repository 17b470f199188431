//! Stage 3: Social
//!
//! Turns the blog post into 3 tweets, 2 LinkedIn posts and 3 Instagram
//! captions. Anything short of that from the model is replaced wholesale by
//! templated copy built from the topic.

use std::sync::Arc;

use utils::{OutputDir, run_files};

use crate::{
    brain::{GenerationOptions, TextBackend, fallback::SOCIAL_MARKER},
    state::SocialArtifact,
};

pub const SOCIAL_MAX_TOKENS: u32 = 384;
const BLOG_SNIPPET_CHARS: usize = 2000;

const TWEETS: usize = 3;
const LINKEDIN_POSTS: usize = 2;
const INSTAGRAM_CAPTIONS: usize = 3;

const LIST_MARKERS: &[char] = &['-', '*', '•'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bucket {
    Tweets,
    LinkedIn,
    Instagram,
}

impl Bucket {
    /// Header lines switch the active bucket
    fn from_header(lowered: &str) -> Option<Self> {
        if lowered.starts_with("tweets") {
            Some(Bucket::Tweets)
        } else if lowered.starts_with("linkedin") {
            Some(Bucket::LinkedIn)
        } else if lowered.starts_with("instagram") {
            Some(Bucket::Instagram)
        } else {
            None
        }
    }
}

pub struct SocialStage {
    backend: Arc<TextBackend>,
}

impl SocialStage {
    pub fn new(backend: Arc<TextBackend>) -> Self {
        Self { backend }
    }

    /// Write social copy for the post, persisting `social.json` into `output`
    pub async fn run(&self, topic: &str, blog_md: &str, output: &OutputDir) -> SocialArtifact {
        let social = if self.backend.is_available() {
            tracing::info!("[SOCIAL] Generating social copy for: {:?}", topic);
            let raw = self
                .backend
                .generate(
                    &build_social_prompt(topic, blog_md),
                    GenerationOptions::max_tokens(SOCIAL_MAX_TOKENS),
                )
                .await;

            parse_social(&raw).unwrap_or_else(|| {
                tracing::warn!("[SOCIAL] Model output too thin, using templated copy");
                fallback_social(topic)
            })
        } else {
            tracing::info!("[SOCIAL] No generation backend, using templated copy");
            fallback_social(topic)
        };

        if let Err(e) = output.write_json(run_files::SOCIAL, &social).await {
            tracing::warn!("[SOCIAL] Failed to persist social copy: {}", e);
        }
        social
    }
}

fn build_social_prompt(topic: &str, blog_md: &str) -> String {
    let snippet: String = blog_md.chars().take(BLOG_SNIPPET_CHARS).collect();
    format!(
        "SYSTEM: Social media strategist.\n\
         TASK: Create 3 tweets, 2 LinkedIn posts, and 3 Instagram captions based on the blog content.\n\
         STYLE: Punchy, value-driven, with clear hooks and hashtags.\n\n\
         TOPIC: {topic}\n\n\
         BLOG_SNIPPET:\n{snippet}\n\n\
         OUTPUT:\n\
         {SOCIAL_MARKER}\n"
    )
}

/// Sort model output into buckets. `None` unless every bucket reached its
/// required count; extra entries are cut.
///
/// Lines before the first header belong to no bucket and are dropped.
fn parse_social(raw: &str) -> Option<SocialArtifact> {
    let mut tweets = Vec::new();
    let mut linkedin = Vec::new();
    let mut instagram = Vec::new();
    let mut active: Option<Bucket> = None;

    for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(bucket) = Bucket::from_header(&line.to_lowercase()) {
            active = Some(bucket);
            continue;
        }

        let item = match line.strip_prefix(LIST_MARKERS) {
            Some(rest) => rest.trim(),
            None => line,
        };
        if item.is_empty() {
            continue;
        }

        match active {
            Some(Bucket::Tweets) => tweets.push(item.to_string()),
            Some(Bucket::LinkedIn) => linkedin.push(item.to_string()),
            Some(Bucket::Instagram) => instagram.push(item.to_string()),
            None => tracing::debug!("[SOCIAL] Dropping line before any header: {:?}", item),
        }
    }

    if tweets.len() < TWEETS
        || linkedin.len() < LINKEDIN_POSTS
        || instagram.len() < INSTAGRAM_CAPTIONS
    {
        return None;
    }

    tweets.truncate(TWEETS);
    linkedin.truncate(LINKEDIN_POSTS);
    instagram.truncate(INSTAGRAM_CAPTIONS);
    Some(SocialArtifact {
        tweets,
        linkedin_posts: linkedin,
        instagram_captions: instagram,
    })
}

/// First character upper-cased, the rest lower-cased
fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.as_str().to_lowercase().chars()).collect(),
        None => String::new(),
    }
}

/// Templated copy derived from the topic alone
pub fn fallback_social(topic: &str) -> SocialArtifact {
    let base = capitalize(topic.trim());
    SocialArtifact {
        tweets: vec![
            format!("{base}: what to know in 60s ⏱️ #HowTo"),
            format!("Why {base} matters in 2025 — practical tips inside. #Growth"),
            format!("{base} checklist you can actually use. Save this! #Productivity"),
        ],
        linkedin_posts: vec![
            format!(
                "We just published a practical guide to {base}. It covers benefits, how-to, and a quick comparison. Read the highlights and contribute your insights."
            ),
            format!(
                "Looking to adopt {base}? Start with the fundamentals, align your goals, and ship a small pilot. Our guide breaks it down step-by-step."
            ),
        ],
        instagram_captions: vec![
            format!("{base} made simple. Swipe for the essentials. #LearnByDoing"),
            format!("3 tips to get started with {base} today. #QuickWins"),
            format!("From zero to confident with {base}. Save for later! #Guide"),
        ],
    }
}
