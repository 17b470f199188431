//! Browsing past runs

use std::path::Path;

use axum::{
    Router,
    extract::{Query, State},
    response::Json,
    routing::get,
};
use serde::Deserialize;
use serde_json::{Value, json};
use utils::{OutputDir, is_safe_folder_name, list_runs, run_files, safe_join};

use super::STATIC_PREFIX;
use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct FolderQuery {
    pub folder: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/outputs/list", get(list_outputs))
        .route("/outputs/details", get(output_details))
}

pub async fn list_outputs(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let folders = list_runs(&state.output_root)?;
    Ok(Json(json!({ "folders": folders })))
}

pub async fn output_details(
    State(state): State<AppState>,
    Query(query): Query<FolderQuery>,
) -> Result<Json<Value>, ApiError> {
    let output = resolve_folder(&state.output_root, &query.folder)?;

    Ok(Json(json!({
        "folder": output.folder_name(),
        "blog_md": output.read_text(run_files::BLOG).await,
        "seo": output.read_json(run_files::SEO).await,
        "social": output.read_json(run_files::SOCIAL).await,
        "research": output.read_json(run_files::RESEARCH).await,
        "final_state": output.read_json(run_files::FINAL_STATE).await,
        "images": { "hero_url": hero_url(&output) },
    })))
}

/// 400 for names that could escape the root, 404 for unknown runs
pub(crate) fn resolve_folder(root: &Path, folder: &str) -> Result<OutputDir, ApiError> {
    if !is_safe_folder_name(folder) {
        return Err(ApiError::BadRequest("invalid folder".to_string()));
    }
    safe_join(root, folder)
        .ok_or_else(|| ApiError::NotFound(format!("no run folder named {}", folder.trim())))
}

/// Public URL of the run's hero image, when it has one
pub(crate) fn hero_url(output: &OutputDir) -> Option<String> {
    let folder = output.folder_name()?;
    output
        .contains(run_files::HERO_IMAGE)
        .then(|| format!("{}/{}/{}", STATIC_PREFIX, folder, run_files::HERO_IMAGE))
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::*;
    use crate::routes::test_support::spawn_app;

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("20240101_000000_old")).unwrap();
        std::fs::create_dir(root.path().join("20250101_000000_new")).unwrap();
        let base = spawn_app(root.path()).await;

        let body: Value = reqwest::get(format!("{}/outputs/list", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(
            body,
            json!({ "folders": ["20250101_000000_new", "20240101_000000_old"] })
        );
    }

    #[tokio::test]
    async fn test_details_reads_artifacts_and_serves_hero() {
        let root = tempfile::tempdir().unwrap();
        let output = OutputDir::open(root.path().join("20250101_000000_tea"));
        std::fs::create_dir(output.path()).unwrap();
        output.write_text(run_files::BLOG, "# Tea").await.unwrap();
        output
            .write_json(run_files::SEO, &json!({ "title": "Tea" }))
            .await
            .unwrap();
        output.write_bytes(run_files::HERO_IMAGE, b"png").await.unwrap();
        let base = spawn_app(root.path()).await;

        let body: Value = reqwest::get(format!(
            "{}/outputs/details?folder=20250101_000000_tea",
            base
        ))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

        assert_eq!(body["folder"], "20250101_000000_tea");
        assert_eq!(body["blog_md"], "# Tea");
        assert_eq!(body["seo"]["title"], "Tea");
        assert!(body["social"].is_null());
        let hero = body["images"]["hero_url"].as_str().unwrap();
        assert_eq!(hero, "/outputs-static/20250101_000000_tea/hero.png");

        let bytes = reqwest::get(format!("{}{}", base, hero))
            .await
            .unwrap()
            .bytes()
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"png");
    }

    #[tokio::test]
    async fn test_details_rejects_bad_folders() {
        let root = tempfile::tempdir().unwrap();
        let base = spawn_app(root.path()).await;

        let traversal = reqwest::get(format!("{}/outputs/details?folder=..", base))
            .await
            .unwrap();
        assert_eq!(traversal.status(), StatusCode::BAD_REQUEST);
        let body: Value = traversal.json().await.unwrap();
        assert_eq!(body["error"], "invalid folder");

        let missing = reqwest::get(format!("{}/outputs/details?folder=nope", base))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }
}
