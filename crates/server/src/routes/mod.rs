use axum::{Router, routing::get};
use tower_http::{cors::CorsLayer, services::ServeDir};

use crate::AppState;

pub mod health;
pub mod outputs;
pub mod runs;

/// URL prefix run folders are served under
pub const STATIC_PREFIX: &str = "/outputs-static";

pub fn router(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.output_root);

    Router::new()
        .route("/health", get(health::health_check))
        .merge(outputs::router())
        .merge(runs::router())
        .nest_service(STATIC_PREFIX, static_files)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
