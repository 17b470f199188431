//! Stage 1: Research
//!
//! Fetches trending keywords and competitor listings for a topic. The two
//! lookups run concurrently and each degrades to its own deterministic
//! fallback, so the stage always returns a usable artifact.

use std::{collections::HashSet, sync::Arc, time::Duration};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde_json::Value;
use utils::{OutputDir, run_files};

use crate::{
    config::ResearchConfig,
    state::{Competitor, ResearchArtifact},
};

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

static RESULT_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<a\s([^>]*\bclass\s*=\s*"[^"]*\bresult__a\b[^"]*"[^>]*)>(.*?)</a>"#)
        .expect("result anchor regex is valid")
});
static HREF_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bhref\s*=\s*"([^"]*)""#).expect("href regex is valid"));
static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("tag regex is valid"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("ws regex is valid"));

/// Why an external research lookup produced nothing
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("Source not configured")]
    NotConfigured,

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Unexpected response: {0}")]
    ParseError(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::RequestFailed(err.to_string())
    }
}

/// Something that knows what people search for around a topic
#[async_trait]
pub trait TrendSource: Send + Sync {
    async fn trending(&self, topic: &str) -> Result<Vec<String>, FetchError>;
}

/// Something that lists pages competing for a topic
#[async_trait]
pub trait CompetitorSource: Send + Sync {
    async fn competitors(&self, topic: &str) -> Result<Vec<Competitor>, FetchError>;
}

/// Search-suggestion endpoint queried as `{url}?q={topic}`
pub struct SuggestTrendSource {
    client: Client,
    url: Option<String>,
    timeout: Duration,
}

impl SuggestTrendSource {
    pub fn new(config: &ResearchConfig) -> Self {
        Self {
            client: Client::new(),
            url: config.trends_url.clone(),
            timeout: Duration::from_secs(config.fetch_timeout_secs),
        }
    }
}

#[async_trait]
impl TrendSource for SuggestTrendSource {
    async fn trending(&self, topic: &str) -> Result<Vec<String>, FetchError> {
        let url = self.url.as_deref().ok_or(FetchError::NotConfigured)?;

        let body: Value = self
            .client
            .get(url)
            .query(&[("q", topic)])
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        parse_suggestions(&body)
    }
}

/// Accepts the OpenSearch suggest shape `["query", ["a", "b"]]` or a plain
/// array of strings.
fn parse_suggestions(body: &Value) -> Result<Vec<String>, FetchError> {
    let items = match body {
        Value::Array(items) => match items.as_slice() {
            [Value::String(_), Value::Array(suggestions), ..] => suggestions,
            _ => items,
        },
        other => {
            return Err(FetchError::ParseError(format!(
                "expected a JSON array, got {}",
                other
            )));
        }
    };

    Ok(items
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect())
}

/// DuckDuckGo HTML results page
pub struct DuckDuckGoSource {
    client: Client,
    search_url: String,
    timeout: Duration,
    limit: usize,
}

impl DuckDuckGoSource {
    pub fn new(config: &ResearchConfig) -> Self {
        Self {
            client: Client::new(),
            search_url: config.search_url.clone(),
            timeout: Duration::from_secs(config.fetch_timeout_secs),
            limit: config.competitor_limit,
        }
    }
}

#[async_trait]
impl CompetitorSource for DuckDuckGoSource {
    async fn competitors(&self, topic: &str) -> Result<Vec<Competitor>, FetchError> {
        let query = format!("{} competitors review", topic);
        tracing::debug!("[RESEARCH] Searching competitors: {}", query);

        let html = self
            .client
            .get(&self.search_url)
            .query(&[("q", query.as_str())])
            .header("User-Agent", BROWSER_USER_AGENT)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(parse_result_anchors(&html, self.limit))
    }
}

/// Pull title/URL pairs out of `<a class="result__a" href="...">` anchors
fn parse_result_anchors(html: &str, limit: usize) -> Vec<Competitor> {
    RESULT_ANCHOR
        .captures_iter(html)
        .filter_map(|caps| {
            let attrs = caps.get(1)?.as_str();
            let url = decode_entities(HREF_ATTR.captures(attrs)?.get(1)?.as_str());
            let inner = HTML_TAG.replace_all(caps.get(2)?.as_str(), "");
            let title = WHITESPACE
                .replace_all(&decode_entities(&inner), " ")
                .trim()
                .to_string();

            (!title.is_empty() && !url.trim().is_empty()).then(|| Competitor {
                title,
                url: url.trim().to_string(),
            })
        })
        .take(limit)
        .collect()
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Keyword variants synthesised from the topic alone. Deterministic and
/// never empty.
pub fn fallback_keywords(topic: &str) -> Vec<String> {
    let cleaned: String = topic
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ')
        .collect::<String>()
        .to_lowercase();
    let base = match cleaned.trim() {
        "" => "topic",
        trimmed => trimmed,
    };

    dedupe_keywords(
        vec![
            base.to_string(),
            format!("best {}", base),
            format!("{} reviews", base),
            format!("{} benefits", base),
            format!("buy {}", base),
        ],
        usize::MAX,
    )
}

/// Listings used when the search page cannot be fetched
pub fn fallback_competitors(topic: &str) -> Vec<Competitor> {
    vec![
        Competitor {
            title: format!("Top {} alternatives", topic),
            url: "https://example.com/alt".to_string(),
        },
        Competitor {
            title: format!("Best {} in 2025", topic),
            url: "https://example.com/best".to_string(),
        },
    ]
}

/// Trim, drop blanks, drop case-insensitive repeats keeping the first
/// spelling, keep at most `limit`.
fn dedupe_keywords(keywords: Vec<String>, limit: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    keywords
        .into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty() && seen.insert(k.to_lowercase()))
        .take(limit)
        .collect()
}

pub struct ResearchStage {
    trends: Arc<dyn TrendSource>,
    competitors: Arc<dyn CompetitorSource>,
    keyword_limit: usize,
}

impl ResearchStage {
    pub fn new(config: &ResearchConfig) -> Self {
        Self::with_sources(
            Arc::new(SuggestTrendSource::new(config)),
            Arc::new(DuckDuckGoSource::new(config)),
            config.keyword_limit,
        )
    }

    pub fn with_sources(
        trends: Arc<dyn TrendSource>,
        competitors: Arc<dyn CompetitorSource>,
        keyword_limit: usize,
    ) -> Self {
        Self {
            trends,
            competitors,
            keyword_limit,
        }
    }

    /// Research `topic` and persist `research.json` into `output`
    pub async fn run(&self, topic: &str, output: &OutputDir) -> ResearchArtifact {
        tracing::info!("[RESEARCH] Researching topic: {:?}", topic);

        let (trending_keywords, competitors) =
            tokio::join!(self.trending_keywords(topic), self.competitor_listings(topic));

        let artifact = ResearchArtifact {
            topic: topic.to_string(),
            trending_keywords,
            competitors,
        };

        if let Err(e) = output.write_json(run_files::RESEARCH, &artifact).await {
            tracing::warn!("[RESEARCH] Failed to persist research: {}", e);
        }

        tracing::info!(
            "[RESEARCH] Completed: {} keywords, {} competitors",
            artifact.trending_keywords.len(),
            artifact.competitors.len()
        );
        artifact
    }

    async fn trending_keywords(&self, topic: &str) -> Vec<String> {
        match self.trends.trending(topic).await {
            Ok(raw) => {
                let keywords = dedupe_keywords(raw, self.keyword_limit);
                if keywords.is_empty() {
                    tracing::warn!("[RESEARCH] Trend source returned nothing, using variants");
                    fallback_keywords(topic)
                } else {
                    keywords
                }
            }
            Err(FetchError::NotConfigured) => {
                tracing::debug!("[RESEARCH] No trend source configured, using variants");
                fallback_keywords(topic)
            }
            Err(e) => {
                tracing::warn!("[RESEARCH] Trend lookup failed, using variants: {}", e);
                fallback_keywords(topic)
            }
        }
    }

    async fn competitor_listings(&self, topic: &str) -> Vec<Competitor> {
        match self.competitors.competitors(topic).await {
            Ok(listings) => listings,
            Err(e) => {
                tracing::warn!("[RESEARCH] Competitor search failed, using examples: {}", e);
                fallback_competitors(topic)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::{Json, Router, extract::Query, http::StatusCode, routing::get};
    use serde_json::json;

    use super::*;

    struct FixedTrends(Result<Vec<String>, FetchError>);

    #[async_trait]
    impl TrendSource for FixedTrends {
        async fn trending(&self, _topic: &str) -> Result<Vec<String>, FetchError> {
            self.0.clone()
        }
    }

    struct FixedCompetitors(Result<Vec<Competitor>, FetchError>);

    #[async_trait]
    impl CompetitorSource for FixedCompetitors {
        async fn competitors(&self, _topic: &str) -> Result<Vec<Competitor>, FetchError> {
            self.0.clone()
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

    fn config(trends_url: Option<String>, search_url: String) -> ResearchConfig {
        ResearchConfig {
            trends_url,
            search_url,
            fetch_timeout_secs: 5,
            ..ResearchConfig::default()
        }
    }

    const RESULTS_PAGE: &str = r#"
        <div class="result">
          <a rel="nofollow" class="result__a" href="https://a.example/one?x=1&amp;y=2">Best <b>Bottles</b> &amp; more</a>
        </div>
        <div class="result">
          <a class="result__snippet" href="https://ignored.example">snippet</a>
          <a class="result__a  big" href="https://b.example/two">
             Second   result
          </a>
          <a class="result__a" href="">no url</a>
          <a class="result__a" href="https://c.example/three">Third</a>
        </div>
    "#;

    #[test]
    fn test_fallback_keywords() {
        assert_eq!(
            fallback_keywords("Eco Friendly Water-Bottle!"),
            vec![
                "eco friendly waterbottle",
                "best eco friendly waterbottle",
                "eco friendly waterbottle reviews",
                "eco friendly waterbottle benefits",
                "buy eco friendly waterbottle",
            ]
        );
    }

    #[test]
    fn test_fallback_keywords_never_empty() {
        for topic in ["", "   ", "?!*", "日本茶", "Ünïcödé"] {
            let keywords = fallback_keywords(topic);
            assert_eq!(keywords.len(), 5, "topic {:?}", topic);
            assert!(keywords.iter().all(|k| !k.is_empty()));
        }
        assert_eq!(fallback_keywords("")[0], "topic");
        assert_eq!(fallback_keywords("日本茶")[0], "日本茶");
        assert_eq!(fallback_keywords("cold brew"), fallback_keywords("cold brew"));
    }

    #[test]
    fn test_dedupe_keywords_case_insensitive() {
        let raw = vec![
            " Cold Brew ".to_string(),
            "cold brew".to_string(),
            "".to_string(),
            "cold brew maker".to_string(),
            "COLD BREW MAKER".to_string(),
            "iced coffee".to_string(),
        ];
        assert_eq!(
            dedupe_keywords(raw.clone(), 20),
            vec!["Cold Brew", "cold brew maker", "iced coffee"]
        );
        assert_eq!(dedupe_keywords(raw, 2), vec!["Cold Brew", "cold brew maker"]);
    }

    #[test]
    fn test_parse_suggestions_shapes() {
        assert_eq!(
            parse_suggestions(&json!(["tea", ["tea set", "tea pot"]])).unwrap(),
            vec!["tea set", "tea pot"]
        );
        assert_eq!(
            parse_suggestions(&json!(["a", "b", 3])).unwrap(),
            vec!["a", "b"]
        );
        assert!(parse_suggestions(&json!({ "q": "tea" })).is_err());
    }

    #[test]
    fn test_parse_result_anchors() {
        let found = parse_result_anchors(RESULTS_PAGE, 5);
        assert_eq!(
            found,
            vec![
                Competitor {
                    title: "Best Bottles & more".into(),
                    url: "https://a.example/one?x=1&y=2".into(),
                },
                Competitor {
                    title: "Second result".into(),
                    url: "https://b.example/two".into(),
                },
                Competitor {
                    title: "Third".into(),
                    url: "https://c.example/three".into(),
                },
            ]
        );
        assert_eq!(parse_result_anchors(RESULTS_PAGE, 1).len(), 1);
        assert!(parse_result_anchors("<html></html>", 5).is_empty());
    }

    #[tokio::test]
    async fn test_sources_against_local_endpoints() {
        let app = Router::new()
            .route(
                "/suggest",
                get(|Query(q): Query<HashMap<String, String>>| async move {
                    Json(json!([q["q"], [format!("{} recipe", q["q"]), "Tea Recipe"]]))
                }),
            )
            .route(
                "/html/",
                get(|Query(q): Query<HashMap<String, String>>| async move {
                    assert_eq!(q["q"], "tea competitors review");
                    RESULTS_PAGE
                }),
            );
        let base = spawn(app).await;
        let config = config(Some(format!("{}/suggest", base)), format!("{}/html/", base));

        let trends = SuggestTrendSource::new(&config).trending("tea").await.unwrap();
        assert_eq!(trends, vec!["tea recipe", "Tea Recipe"]);

        let competitors = DuckDuckGoSource::new(&config)
            .competitors("tea")
            .await
            .unwrap();
        assert_eq!(competitors.len(), 3);
    }

    #[tokio::test]
    async fn test_sources_report_failures() {
        let app = Router::new().route(
            "/html/",
            get(|| async { (StatusCode::FORBIDDEN, "blocked") }),
        );
        let base = spawn(app).await;
        let config = config(None, format!("{}/html/", base));

        assert_eq!(
            SuggestTrendSource::new(&config).trending("tea").await,
            Err(FetchError::NotConfigured)
        );
        assert!(matches!(
            DuckDuckGoSource::new(&config).competitors("tea").await,
            Err(FetchError::RequestFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_stage_degrades_each_lookup_independently() {
        let dir = tempfile::tempdir().unwrap();
        let output = OutputDir::open(dir.path());
        let listing = Competitor {
            title: "Real".into(),
            url: "https://real.example".into(),
        };

        let stage = ResearchStage::with_sources(
            Arc::new(FixedTrends(Err(FetchError::RequestFailed("timeout".into())))),
            Arc::new(FixedCompetitors(Ok(vec![listing.clone()]))),
            20,
        );
        let artifact = stage.run("Cold Brew", &output).await;
        assert_eq!(artifact.trending_keywords, fallback_keywords("Cold Brew"));
        assert_eq!(artifact.competitors, vec![listing]);

        let stage = ResearchStage::with_sources(
            Arc::new(FixedTrends(Ok(vec!["a".into(), "A".into(), "b".into()]))),
            Arc::new(FixedCompetitors(Err(FetchError::RequestFailed("dns".into())))),
            20,
        );
        let artifact = stage.run("Cold Brew", &output).await;
        assert_eq!(artifact.trending_keywords, vec!["a", "b"]);
        assert_eq!(artifact.competitors, fallback_competitors("Cold Brew"));
        assert_eq!(artifact.competitors[1].title, "Best Cold Brew in 2025");

        let persisted = output.read_json(run_files::RESEARCH).await.unwrap();
        assert_eq!(persisted["trending_keywords"], json!(["a", "b"]));
        assert_eq!(persisted["competitors"][0]["url"], "https://example.com/alt");
    }

    #[tokio::test]
    async fn test_empty_trend_answer_uses_variants() {
        let dir = tempfile::tempdir().unwrap();
        let stage = ResearchStage::with_sources(
            Arc::new(FixedTrends(Ok(vec!["  ".into()]))),
            Arc::new(FixedCompetitors(Ok(Vec::new()))),
            20,
        );

        let artifact = stage.run("", &OutputDir::open(dir.path())).await;
        assert_eq!(artifact.trending_keywords[0], "topic");
        assert!(artifact.competitors.is_empty());
    }
}
