use std::{
    io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

const OUTPUT_ROOT_ENV: &str = "OUTPUT_ROOT";
const DEFAULT_OUTPUT_ROOT: &str = "outputs";
const SLUG_FALLBACK: &str = "topic";

static NON_SLUG_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("slug regex is valid"));

/// File names each run folder is filled with.
///
/// ```text
/// 20250101_120000_eco-friendly-water-bottle/
/// ├── research.json
/// ├── blog.md
/// ├── seo.json
/// ├── social.json
/// ├── hero.png            # only when the image stage produced one
/// └── final_state.json    # snapshot written by the caller of the pipeline
/// ```
pub mod run_files {
    pub const RESEARCH: &str = "research.json";
    pub const BLOG: &str = "blog.md";
    pub const SEO: &str = "seo.json";
    pub const SOCIAL: &str = "social.json";
    pub const HERO_IMAGE: &str = "hero.png";
    pub const FINAL_STATE: &str = "final_state.json";
}

/// Root directory for run folders, from `OUTPUT_ROOT` or `./outputs`
pub fn default_output_root() -> PathBuf {
    crate::env::env_string(OUTPUT_ROOT_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_ROOT))
}

/// Lower-case, collapse every non `[a-z0-9]` run into a single dash.
/// Never returns an empty string.
pub fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();
    let slug = NON_SLUG_CHARS.replace_all(&lowered, "-");
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        SLUG_FALLBACK.to_string()
    } else {
        slug.to_string()
    }
}

/// `{YYYYmmdd_HHMMSS}_{slug}`
pub fn run_folder_name(topic: &str, now: DateTime<Local>) -> String {
    format!("{}_{}", now.format("%Y%m%d_%H%M%S"), slugify(topic))
}

/// Handle to the folder a single pipeline run persists its artifacts into.
///
/// Writers are async and return `io::Result`, callers that treat persistence
/// as best-effort log and drop the error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputDir {
    path: PathBuf,
}

impl OutputDir {
    /// Create a fresh timestamped run folder for `topic` under `root`
    pub fn create(root: &Path, topic: &str) -> io::Result<Self> {
        let path = root.join(run_folder_name(topic, Local::now()));
        std::fs::create_dir_all(&path)?;
        tracing::info!("Created run folder at {}", path.display());
        Ok(Self { path })
    }

    /// Wrap an existing directory without touching the filesystem
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last path component, used as the public identifier of a run
    pub fn folder_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }

    pub fn join(&self, file_name: &str) -> PathBuf {
        self.path.join(file_name)
    }

    pub fn contains(&self, file_name: &str) -> bool {
        self.join(file_name).is_file()
    }

    pub async fn write_json<T: Serialize + ?Sized>(
        &self,
        file_name: &str,
        value: &T,
    ) -> io::Result<PathBuf> {
        let body = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        self.write_bytes(file_name, body.as_bytes()).await
    }

    pub async fn write_text(&self, file_name: &str, text: &str) -> io::Result<PathBuf> {
        self.write_bytes(file_name, text.as_bytes()).await
    }

    pub async fn write_bytes(&self, file_name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        let target = self.join(file_name);
        tokio::fs::write(&target, bytes).await?;
        tracing::debug!("Wrote {} bytes to {}", bytes.len(), target.display());
        Ok(target)
    }

    pub async fn read_text(&self, file_name: &str) -> Option<String> {
        tokio::fs::read_to_string(self.join(file_name)).await.ok()
    }

    pub async fn read_json(&self, file_name: &str) -> Option<serde_json::Value> {
        let raw = self.read_text(file_name).await?;
        serde_json::from_str(&raw).ok()
    }
}

/// Run folder names under `root`, newest first.
/// A missing root is an empty listing rather than an error.
pub fn list_runs(root: &Path) -> io::Result<Vec<String>> {
    if !root.exists() {
        return Ok(Vec::new());
    }

    let mut folders: Vec<String> = std::fs::read_dir(root)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .collect();

    // Folder names start with a sortable timestamp
    folders.sort_unstable_by(|a, b| b.cmp(a));
    Ok(folders)
}

/// A single path component that cannot point outside its parent
pub fn is_safe_folder_name(folder: &str) -> bool {
    let folder = folder.trim();
    !(folder.is_empty()
        || folder == "."
        || folder == ".."
        || folder.contains('/')
        || folder.contains('\\'))
}

/// Resolve a client-supplied folder name to an existing run folder under
/// `root`. Rejects anything that could escape the root.
pub fn safe_join(root: &Path, folder: &str) -> Option<OutputDir> {
    if !is_safe_folder_name(folder) {
        return None;
    }

    let path = root.join(folder.trim());
    path.is_dir().then(|| OutputDir::open(path))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Eco Friendly Water Bottle!"), "eco-friendly-water-bottle");
        assert_eq!(slugify("  --a__b--  "), "a-b");
        assert_eq!(slugify(""), "topic");
        assert_eq!(slugify("¿¡!?"), "topic");
    }

    #[test]
    fn test_run_folder_name() {
        let now = Local.with_ymd_and_hms(2025, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(
            run_folder_name("eco friendly water bottle", now),
            "20250309_070501_eco-friendly-water-bottle"
        );
    }

    #[tokio::test]
    async fn test_create_write_and_read_back() {
        let root = tempfile::tempdir().unwrap();
        let out = OutputDir::create(root.path(), "Cold Brew").unwrap();

        assert!(out.folder_name().unwrap().ends_with("_cold-brew"));

        out.write_text(run_files::BLOG, "# Title").await.unwrap();
        out.write_json(run_files::SEO, &serde_json::json!({"title": "t"}))
            .await
            .unwrap();

        assert!(out.contains(run_files::BLOG));
        assert_eq!(out.read_text(run_files::BLOG).await.unwrap(), "# Title");
        assert_eq!(out.read_json(run_files::SEO).await.unwrap()["title"], "t");
        assert!(out.read_json(run_files::SOCIAL).await.is_none());
    }

    #[test]
    fn test_list_runs_newest_first() {
        let root = tempfile::tempdir().unwrap();
        for name in ["20240101_000000_a", "20250101_000000_b", "20240601_000000_c"] {
            std::fs::create_dir(root.path().join(name)).unwrap();
        }
        std::fs::write(root.path().join("stray.txt"), "x").unwrap();

        let runs = list_runs(root.path()).unwrap();
        assert_eq!(
            runs,
            vec!["20250101_000000_b", "20240601_000000_c", "20240101_000000_a"]
        );

        assert!(list_runs(&root.path().join("missing")).unwrap().is_empty());
    }

    #[test]
    fn test_safe_join_rejects_escapes() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("run")).unwrap();

        assert!(safe_join(root.path(), "run").is_some());
        assert!(safe_join(root.path(), "..").is_none());
        assert!(safe_join(root.path(), "../etc").is_none());
        assert!(safe_join(root.path(), "a\\b").is_none());
        assert!(safe_join(root.path(), "").is_none());
        assert!(safe_join(root.path(), "missing").is_none());

        assert!(is_safe_folder_name("20250101_000000_tea"));
        assert!(!is_safe_folder_name(" .. "));
    }
}
