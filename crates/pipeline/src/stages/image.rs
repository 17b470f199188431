//! Stage 4: Image
//!
//! Renders a hero image for the blog post. Never fails outward: any
//! rendering, decoding or write problem ends up as [`ImageStatus::Skipped`].
//!
//! [`ImageStatus::Skipped`]: crate::state::ImageStatus::Skipped

use std::sync::Arc;

use cinematics::{Cinematographer, decode_image};
use utils::{OutputDir, run_files};

use crate::state::ImageArtifact;

pub const IMAGE_STYLE_SUFFIX: &str =
    "clean composition, modern, high contrast, photorealistic, 35mm, 4k";
const DEFAULT_TITLE: &str = "Hero Image";
const SCAN_LINES: usize = 50;
const KEYWORD_SOFT_CAP: usize = 20;
const PROMPT_KEYWORDS: usize = 12;

pub struct ImageStage {
    renderer: Arc<dyn Cinematographer>,
}

impl ImageStage {
    pub fn new(renderer: Arc<dyn Cinematographer>) -> Self {
        Self { renderer }
    }

    /// Render and persist `hero.png` into `output`
    pub async fn run(&self, blog_md: &str, output: &OutputDir) -> ImageArtifact {
        let prompt = build_image_prompt(blog_md);
        tracing::info!("[IMAGE] Rendering hero image");
        tracing::debug!("[IMAGE] Prompt: {}", prompt);

        match self.render(&prompt, output).await {
            Ok(artifact) => {
                tracing::info!("[IMAGE] Finished with status {:?}", artifact.status);
                artifact
            }
            Err(e) => {
                tracing::warn!("[IMAGE] Skipping hero image: {:#}", e);
                ImageArtifact::skipped()
            }
        }
    }

    async fn render(&self, prompt: &str, output: &OutputDir) -> anyhow::Result<ImageArtifact> {
        let images = self.renderer.render_still(prompt).await?;
        let Some(first) = images.first() else {
            return Ok(ImageArtifact::no_images());
        };

        let bytes = decode_image(first)?;
        let path = output.write_bytes(run_files::HERO_IMAGE, &bytes).await?;
        Ok(ImageArtifact::ok(path))
    }
}

/// `{title}, {keyword soup}, {style}` where the title is the first non-blank
/// line and the soup is the first two words of early multi-word lines.
fn build_image_prompt(blog_md: &str) -> String {
    let lines: Vec<&str> = blog_md
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let title = lines.first().copied().unwrap_or(DEFAULT_TITLE);

    let mut keywords: Vec<&str> = Vec::new();
    for line in lines.iter().take(SCAN_LINES) {
        if keywords.len() > KEYWORD_SOFT_CAP {
            break;
        }
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.len() >= 2 {
            keywords.extend_from_slice(&words[..2]);
        }
    }
    keywords.truncate(PROMPT_KEYWORDS);

    format!("{}, {}, {}", title, keywords.join(" "), IMAGE_STYLE_SUFFIX)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use anyhow::anyhow;
    use async_trait::async_trait;
    use axum::{Json, Router, routing::post};
    use cinematics::{CinematicsConfig, CinematicsService};

    use super::*;
    use crate::state::ImageStatus;

    /// "hello" in base64
    const HELLO_B64: &str = "aGVsbG8=";

    struct StubRenderer {
        answer: std::result::Result<Vec<String>, String>,
        prompts: Mutex<Vec<String>>,
    }

    impl StubRenderer {
        fn new(answer: std::result::Result<Vec<&str>, &str>) -> Arc<Self> {
            Arc::new(Self {
                answer: answer
                    .map(|v| v.into_iter().map(str::to_string).collect())
                    .map_err(str::to_string),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Cinematographer for StubRenderer {
        async fn render_still(&self, prompt: &str) -> anyhow::Result<Vec<String>> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.answer.clone().map_err(|e| anyhow!(e))
        }
    }

    async fn spawn(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_prompt_heuristic() {
        let blog = "\n# Cold Brew Guide\n\nIntro paragraph here\nsingle\n## Benefits list\n";
        assert_eq!(
            build_image_prompt(blog),
            format!(
                "# Cold Brew Guide, # Cold Intro paragraph ## Benefits, {}",
                IMAGE_STYLE_SUFFIX
            )
        );
    }

    #[test]
    fn test_prompt_for_empty_blog() {
        assert_eq!(
            build_image_prompt("  \n"),
            format!("Hero Image, , {}", IMAGE_STYLE_SUFFIX)
        );
    }

    #[test]
    fn test_prompt_keeps_twelve_keywords() {
        let blog: String = (0..40).map(|i| format!("w{} x{} y\n", i, i)).collect();
        let prompt = build_image_prompt(&blog);
        let soup = prompt.split(", ").nth(1).unwrap();
        assert_eq!(soup.split(' ').count(), 12);
        assert!(soup.starts_with("w0 x0 w1 x1"));
    }

    #[tokio::test]
    async fn test_first_image_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let output = OutputDir::open(dir.path());
        let renderer = StubRenderer::new(Ok(vec![HELLO_B64, "ignored"]));

        let artifact = ImageStage::new(renderer.clone()).run("# Tea", &output).await;

        assert_eq!(artifact.status, ImageStatus::Ok);
        let hero = artifact.hero_image.unwrap();
        assert_eq!(hero, output.join(run_files::HERO_IMAGE));
        assert_eq!(std::fs::read(hero).unwrap(), b"hello");
        assert!(renderer.prompts.lock().unwrap()[0].starts_with("# Tea, "));
    }

    #[tokio::test]
    async fn test_empty_image_list_is_no_images() {
        let dir = tempfile::tempdir().unwrap();
        let output = OutputDir::open(dir.path());

        let artifact = ImageStage::new(StubRenderer::new(Ok(Vec::new())))
            .run("# Tea", &output)
            .await;
        assert_eq!(artifact, ImageArtifact::no_images());
        assert!(!output.contains(run_files::HERO_IMAGE));
    }

    #[tokio::test]
    async fn test_failures_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let output = OutputDir::open(dir.path());

        let render_error = ImageStage::new(StubRenderer::new(Err("timed out")))
            .run("# Tea", &output)
            .await;
        assert_eq!(render_error, ImageArtifact::skipped());

        let decode_error = ImageStage::new(StubRenderer::new(Ok(vec!["%%% not base64"])))
            .run("# Tea", &output)
            .await;
        assert_eq!(decode_error, ImageArtifact::skipped());

        let missing_dir = OutputDir::open(dir.path().join("gone"));
        let write_error = ImageStage::new(StubRenderer::new(Ok(vec![HELLO_B64])))
            .run("# Tea", &missing_dir)
            .await;
        assert_eq!(write_error, ImageArtifact::skipped());
    }

    #[tokio::test]
    async fn test_against_image_service() {
        let app = Router::new().route(
            "/sdapi/v1/txt2img",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["width"], 768);
                assert_eq!(body["sampler_name"], "Euler a");
                Json(serde_json::json!({ "images": [] }))
            }),
        );
        let base = spawn(app).await;
        let dir = tempfile::tempdir().unwrap();
        let output = OutputDir::open(dir.path());

        let service = CinematicsService::new(CinematicsConfig {
            sd_base_url: base,
            timeout_secs: 5,
            ..CinematicsConfig::default()
        });
        let artifact = ImageStage::new(Arc::new(service)).run("# Tea", &output).await;
        assert_eq!(artifact.status, ImageStatus::NoImages);

        let unreachable = CinematicsService::new(CinematicsConfig {
            sd_base_url: "http://127.0.0.1:9".into(),
            timeout_secs: 2,
            ..CinematicsConfig::default()
        });
        let artifact = ImageStage::new(Arc::new(unreachable)).run("# Tea", &output).await;
        assert_eq!(artifact.status, ImageStatus::Skipped);
    }
}
