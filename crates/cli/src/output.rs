//! Terminal rendering of a finished run

use colored::Colorize;
use pipeline::{ImageStatus, PipelineState};
use utils::OutputDir;

/// Short per-stage report printed after a run
pub fn summary_lines(state: &PipelineState) -> Vec<String> {
    let mut lines = Vec::new();

    if let Some(research) = &state.research {
        lines.push(format!(
            "research  {} keywords, {} competitors",
            research.trending_keywords.len(),
            research.competitors.len()
        ));
    }
    if let Some(content) = &state.content {
        lines.push(format!(
            "content   {} chars, title {:?}",
            content.blog_md.chars().count(),
            content.seo.title
        ));
    }
    if let Some(social) = &state.social {
        lines.push(format!(
            "social    {} tweets, {} linkedin, {} instagram",
            social.tweets.len(),
            social.linkedin_posts.len(),
            social.instagram_captions.len()
        ));
    }
    if let Some(images) = &state.images {
        let status = match images.status {
            ImageStatus::Ok => "ok",
            ImageStatus::NoImages => "no images returned",
            ImageStatus::Skipped => "skipped",
        };
        lines.push(format!("image     {}", status));
    }

    lines
}

pub fn print_summary(state: &PipelineState, output: &OutputDir) {
    println!();
    for line in summary_lines(state) {
        println!("  {}", line.bright_white());
    }
    println!();
    println!(
        "{} {}",
        "Saved outputs to:".bright_green(),
        output.path().display()
    );
}
