use axum::{
    Router,
    extract::{Query, State},
    response::Json,
    routing::post,
};
use pipeline::RunRequest;
use serde::Deserialize;
use serde_json::{Value, json};
use utils::{OutputDir, run_files};

use super::outputs::{FolderQuery, hero_url, resolve_folder};
use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct RunPayload {
    pub topic: String,
    #[serde(default = "default_no_image")]
    pub no_image: bool,
}

fn default_no_image() -> bool {
    true
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/run", post(run_pipeline))
        .route("/image", post(regenerate_image))
}

pub async fn run_pipeline(
    State(state): State<AppState>,
    Json(payload): Json<RunPayload>,
) -> Result<Json<Value>, ApiError> {
    let output = OutputDir::create(&state.output_root, &payload.topic)?;
    tracing::info!("Run requested for {:?} in {}", payload.topic, output.path().display());

    let final_state = state
        .pipeline
        .run(RunRequest {
            topic: payload.topic,
            output_dir: output.clone(),
            include_image: !payload.no_image,
        })
        .await?;
    if let Err(e) = output.write_json(run_files::FINAL_STATE, &final_state).await {
        tracing::warn!("Failed to persist final state: {}", e);
    }
    let content = final_state.content.as_ref();

    Ok(Json(json!({
        "output_dir": output.path(),
        "blog_md": content.map(|c| &c.blog_md),
        "seo": content.map(|c| &c.seo),
        "social": &final_state.social,
        "research": &final_state.research,
        "images": {
            "status": final_state.images.as_ref().map(|i| i.status),
            "hero_url": hero_url(&output),
        },
        "final_state": &final_state,
    })))
}

/// Re-render the hero image of an existing run from its saved blog post
pub async fn regenerate_image(
    State(state): State<AppState>,
    Query(query): Query<FolderQuery>,
) -> Result<Json<Value>, ApiError> {
    let output = resolve_folder(&state.output_root, &query.folder)?;
    let artifact = state.pipeline.run_image_only(&output).await;

    Ok(Json(json!({
        "images": {
            "status": artifact.status,
            "hero_url": hero_url(&output),
        }
    })))
}
