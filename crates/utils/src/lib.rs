//! Shared helpers for the content pipeline: run folders, artifact files and
//! environment lookups.

pub mod env;
pub mod output;

pub use output::{
    OutputDir, default_output_root, is_safe_folder_name, list_runs, run_files, run_folder_name,
    safe_join, slugify,
};
