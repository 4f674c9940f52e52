use std::sync::Arc;

use pixshrink_core::{Config, ProcessingLogSink};
use pixshrink_processing::{BatchProcessor, UploadValidator};
use pixshrink_storage::FileStore;

/// Shared application state
///
/// Request-scoped data (options, results) never lives here; handlers pass it
/// along explicitly.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn FileStore>,
    pub batch: BatchProcessor,
    pub validator: UploadValidator,
    pub log_sink: Arc<dyn ProcessingLogSink>,
}
