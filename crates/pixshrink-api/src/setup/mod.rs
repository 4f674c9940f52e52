//! Application setup and initialization
//!
//! Split from main.rs so integration tests can build the same router.

pub mod routes;
pub mod server;

use std::sync::Arc;

use anyhow::{Context, Result};
use pixshrink_core::{Config, ProcessingLogSink, TracingLogSink};
use pixshrink_processing::{BatchProcessor, ImageCrateTransform, UploadValidator};
use pixshrink_storage::{FileStore, LocalFileStore};

use crate::state::AppState;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    let state = build_state(config.clone(), Arc::new(TracingLogSink)).await?;
    let router = routes::setup_routes(&config, state.clone())?;
    Ok((state, router))
}

/// Build the shared state: store, processing pipeline and upload validator.
pub async fn build_state(
    config: Config,
    log_sink: Arc<dyn ProcessingLogSink>,
) -> Result<Arc<AppState>> {
    // Fail fast on misconfiguration
    config.validate().context("Configuration validation failed")?;

    let store: Arc<dyn FileStore> = Arc::new(
        LocalFileStore::new(config.upload_path().clone())
            .await
            .with_context(|| format!("Failed to prepare upload directory {:?}", config.upload_path()))?,
    );

    let transform = Arc::new(ImageCrateTransform::new(store.clone()));
    let batch = BatchProcessor::new(store.clone(), transform);
    let validator = UploadValidator::new(
        config.max_file_size_bytes(),
        config.max_files(),
        config.supported_input_formats().to_vec(),
        config.allowed_content_types().to_vec(),
    );

    tracing::info!(
        upload_path = %config.upload_path().display(),
        environment = %config.environment(),
        "Configuration loaded and validated successfully"
    );

    Ok(Arc::new(AppState {
        config,
        store,
        batch,
        validator,
        log_sink,
    }))
}
