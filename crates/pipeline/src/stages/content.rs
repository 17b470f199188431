//! Stage 2: Content
//!
//! Drafts the blog post from topic and research, then lifts the SEO title
//! and description out of the trailing lines of the draft.

use std::sync::Arc;

use utils::{OutputDir, run_files};

use crate::{
    brain::{GenerationOptions, TextBackend, fallback::BLOG_MARKER},
    state::{Competitor, ContentArtifact, ResearchArtifact, SeoMetadata},
};

/// Upper bound on the blog token budget, whatever the backend default
pub const BLOG_MAX_TOKENS: u32 = 600;

const PROMPT_KEYWORDS: usize = 12;
const PROMPT_COMPETITORS: usize = 5;
const SEO_KEYWORDS: usize = 15;
/// Only this many trailing lines are searched for SEO markers
const SEO_SCAN_LINES: usize = 10;

const SEO_TITLE_MARKER: &str = "seo title:";
const SEO_DESCRIPTION_MARKER: &str = "seo description:";

pub struct ContentStage {
    backend: Arc<TextBackend>,
}

impl ContentStage {
    pub fn new(backend: Arc<TextBackend>) -> Self {
        Self { backend }
    }

    /// Write the blog post, persisting `blog.md` and `seo.json` into `output`
    pub async fn run(
        &self,
        topic: &str,
        research: &ResearchArtifact,
        output: &OutputDir,
    ) -> ContentArtifact {
        tracing::info!("[CONTENT] Drafting blog post for: {:?}", topic);

        let prompt = build_blog_prompt(topic, &research.trending_keywords, &research.competitors);
        let max_tokens = BLOG_MAX_TOKENS.min(self.backend.default_max_tokens());
        let generation = self
            .backend
            .generate_traced(&prompt, GenerationOptions::max_tokens(max_tokens))
            .await;
        tracing::info!(
            "[CONTENT] Draft of {} chars from {} tier",
            generation.text.len(),
            generation.source
        );

        let blog_md = generation.text;
        let (title, description) = extract_seo_lines(&blog_md);
        let seo = SeoMetadata {
            title: title.unwrap_or_else(|| default_seo_title(topic)),
            meta_description: description.unwrap_or_else(|| default_seo_description(topic)),
            keywords: research
                .trending_keywords
                .iter()
                .take(SEO_KEYWORDS)
                .cloned()
                .collect(),
        };

        if let Err(e) = output.write_text(run_files::BLOG, &blog_md).await {
            tracing::warn!("[CONTENT] Failed to persist blog post: {}", e);
        }
        if let Err(e) = output.write_json(run_files::SEO, &seo).await {
            tracing::warn!("[CONTENT] Failed to persist SEO metadata: {}", e);
        }

        ContentArtifact { blog_md, seo }
    }
}

fn build_blog_prompt(topic: &str, keywords: &[String], competitors: &[Competitor]) -> String {
    let keyword_line = keywords
        .iter()
        .take(PROMPT_KEYWORDS)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    let competitor_lines = competitors
        .iter()
        .take(PROMPT_COMPETITORS)
        .map(|c| format!("- {} ({})", c.title, c.url))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "SYSTEM: You are an expert marketing writer.\n\
         TASK: Write a comprehensive blog post in Markdown. Include headings, bullet points, and a clear CTA.\n\
         STYLE: Helpful, concise, SEO-friendly.\n\n\
         TOPIC: {topic}\n\
         KEYWORDS: {keyword_line}\n\
         COMPETITORS:\n{competitor_lines}\n\n\
         OUTPUT_FORMAT: Start with a strong H1. Provide sections (Intro, Benefits, How-To, Comparison, FAQs, Conclusion).\n\
         INCLUDE: A brief meta title and meta description at the end as \n\
         'SEO TITLE: ...' and 'SEO DESCRIPTION: ...'.\n\n\
         {BLOG_MARKER}:"
    )
}

/// `(title, description)` from `SEO TITLE:` / `SEO DESCRIPTION:` lines
/// among the last few lines. Blank values count as missing; a later line
/// wins over an earlier one.
fn extract_seo_lines(blog_md: &str) -> (Option<String>, Option<String>) {
    let lines: Vec<&str> = blog_md.lines().collect();
    let tail = &lines[lines.len().saturating_sub(SEO_SCAN_LINES)..];

    let mut title = None;
    let mut description = None;
    for line in tail {
        let lowered = line.trim().to_lowercase();
        let value = || {
            line.split_once(':')
                .map(|(_, rest)| rest.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if lowered.starts_with(SEO_TITLE_MARKER) {
            title = value().or(title);
        } else if lowered.starts_with(SEO_DESCRIPTION_MARKER) {
            description = value().or(description);
        }
    }
    (title, description)
}

fn default_seo_title(topic: &str) -> String {
    format!("{} — A Practical Guide", topic)
}

fn default_seo_description(topic: &str) -> String {
    format!(
        "Explore {}: key benefits, how to choose, and answers to common questions.",
        topic
    )
}
