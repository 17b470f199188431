//! Content pipeline CLI
//!
//! Runs research, drafting, social copy and (optionally) a hero image for a
//! single topic, writing every artifact into a fresh run folder.

mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use pipeline::{ContentPipeline, PipelineConfig, PipelineState, RunRequest};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utils::{OutputDir, run_files};

/// Generate a blog post, SEO metadata and social copy for a topic
#[derive(Debug, Parser)]
#[command(name = "content-pipeline")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = r#"
Runs the content pipeline for one topic and saves the results into a
timestamped folder under the output root.

Examples:
  content-pipeline --topic "Remote work"
  content-pipeline --topic "Home espresso" --no-image --output-root /tmp/runs
"#)]
struct Cli {
    /// Topic to research and write about
    #[arg(short, long)]
    topic: String,

    /// Skip hero image generation
    #[arg(long)]
    no_image: bool,

    /// Directory run folders are created in
    #[arg(long, env = "OUTPUT_ROOT", default_value = "outputs")]
    output_root: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "cli={level},pipeline={level},utils={level},cinematics={level},warn",
                    level = log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let mut config = PipelineConfig::from_env();
    config.output_root = cli.output_root.clone();

    let (state, output) = execute(&cli, &config).await?;
    output::print_summary(&state, &output);
    Ok(())
}

/// Create the run folder, run every stage and persist the merged state
async fn execute(cli: &Cli, config: &PipelineConfig) -> Result<(PipelineState, OutputDir)> {
    let output = OutputDir::create(&config.output_root, &cli.topic)?;
    let pipeline = ContentPipeline::new(config);
    tracing::info!("Running pipeline for {:?} (image: {})", cli.topic, !cli.no_image);

    let state = pipeline
        .run(RunRequest {
            topic: cli.topic.clone(),
            output_dir: output.clone(),
            include_image: !cli.no_image,
        })
        .await?;
    let final_state = output.write_json(run_files::FINAL_STATE, &state).await?;
    tracing::debug!("Final state written to {}", final_state.display());

    Ok((state, output))
}

#[cfg(test)]
mod tests {
    use pipeline::ResearchConfig;

    use super::*;

    #[test]
    fn test_parse_defaults() {
        let cli = Cli::try_parse_from(["content-pipeline", "--topic", "Tea"]).unwrap();
        assert_eq!(cli.topic, "Tea");
        assert!(!cli.no_image);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_topic_is_required() {
        assert!(Cli::try_parse_from(["content-pipeline", "--no-image"]).is_err());
    }

    #[tokio::test]
    async fn test_offline_run_writes_final_state() {
        let root = tempfile::tempdir().unwrap();
        let cli = Cli::try_parse_from([
            "content-pipeline",
            "--topic",
            "Remote Work",
            "--no-image",
            "--output-root",
            root.path().to_str().unwrap(),
        ])
        .unwrap();
        let config = PipelineConfig {
            research: ResearchConfig {
                search_url: "http://127.0.0.1:9/html/".to_string(),
                fetch_timeout_secs: 1,
                ..ResearchConfig::default()
            },
            output_root: cli.output_root.clone(),
            ..PipelineConfig::default()
        };

        let (state, output) = execute(&cli, &config).await.unwrap();

        assert!(output.path().starts_with(root.path()));
        assert!(state.images.is_none());
        for file in [
            run_files::RESEARCH,
            run_files::BLOG,
            run_files::SEO,
            run_files::SOCIAL,
            run_files::FINAL_STATE,
        ] {
            assert!(output.contains(file), "missing {}", file);
        }

        let saved = output.read_json(run_files::FINAL_STATE).await.unwrap();
        assert_eq!(saved["topic"], "Remote Work");
        assert_eq!(saved, serde_json::to_value(&state).unwrap());
    }
}
