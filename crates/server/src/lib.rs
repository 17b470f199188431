//! Thin HTTP layer over the content pipeline and its run folders.

pub mod error;
pub mod routes;

use std::{path::PathBuf, sync::Arc};

use pipeline::{ContentPipeline, PipelineConfig};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ContentPipeline>,
    pub output_root: PathBuf,
}

impl AppState {
    pub fn new(pipeline: ContentPipeline, output_root: PathBuf) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            output_root,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(ContentPipeline::new(config), config.output_root.clone())
    }
}
