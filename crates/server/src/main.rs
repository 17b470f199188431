use pipeline::PipelineConfig;
use server::{AppState, routes};
use tracing_subscriber::{EnvFilter, prelude::*};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pick up backend URLs and keys from `.env` during local development
    dotenv::dotenv().ok();

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter_string = format!(
        "warn,server={level},pipeline={level},utils={level},cinematics={level}",
        level = log_level
    );
    let env_filter = EnvFilter::try_new(filter_string)?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(env_filter))
        .init();

    let config = PipelineConfig::from_env();
    if !config.output_root.exists() {
        std::fs::create_dir_all(&config.output_root)?;
    }

    let state = AppState::from_config(&config);
    if !state.pipeline.backend().is_available() {
        tracing::warn!("No text backend configured - runs will use placeholder content");
    }
    let app_router = routes::router(state);

    let port = std::env::var("PORT")
        .ok()
        .and_then(|s| s.trim().parse::<u16>().ok())
        .unwrap_or(8000);
    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let listener = tokio::net::TcpListener::bind(format!("{host}:{port}")).await?;

    tracing::info!(
        "Serving content pipeline on http://{} (outputs in {})",
        listener.local_addr()?,
        config.output_root.display()
    );

    axum::serve(listener, app_router).await?;
    Ok(())
}
