//! Test helpers: build AppState and router for integration tests.
//!
//! Every test app gets its own temporary upload directory.
#![allow(dead_code)]

pub mod auth;
pub mod fixtures;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum_test::TestServer;
use pixshrink_api::setup::{build_state, routes};
use pixshrink_api::state::AppState;
use pixshrink_core::{
    BaseConfig, Config, OptimizerConfig, OutputFormat, ProcessingLogEntry, ProcessingLogSink,
};
use pixshrink_storage::FileStore;
use tempfile::TempDir;

/// Records entries in memory; can be told to fail every write.
#[derive(Default)]
pub struct MemoryLogSink {
    pub entries: Mutex<Vec<ProcessingLogEntry>>,
    pub fail: bool,
}

#[async_trait]
impl ProcessingLogSink for MemoryLogSink {
    async fn record(&self, entry: ProcessingLogEntry) -> Result<(), String> {
        if self.fail {
            return Err("log store unavailable".to_string());
        }
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }
}

/// Test application: server, state and owned resources.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub log_sink: Arc<MemoryLogSink>,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub async fn exists(&self, filename: &str) -> bool {
        self.state.store.exists(filename).await.unwrap()
    }

    pub async fn files(&self) -> Vec<String> {
        let mut files = self.state.store.list().await.unwrap();
        files.sort();
        files
    }

    /// Post-download cleanup runs in the background; wait for it.
    pub async fn wait_until_gone(&self, filename: &str) -> bool {
        for _ in 0..200 {
            if !self.exists(filename).await {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

pub fn test_config(upload_path: PathBuf) -> OptimizerConfig {
    OptimizerConfig {
        base: BaseConfig {
            server_port: 0,
            cors_origins: vec!["http://localhost:3000".to_string()],
            jwt_secret: auth::TEST_JWT_SECRET.to_string(),
            environment: "test".to_string(),
            rate_limit_max_requests: 1000,
            rate_limit_window_secs: 900,
            log_format: "text".to_string(),
        },
        upload_path,
        max_file_size_bytes: 10 * 1024 * 1024,
        max_files: 20,
        default_quality: 85,
        default_format: OutputFormat::Webp,
        max_width: 1920,
        supported_input_formats: ["jpeg", "jpg", "png", "gif", "webp", "avif"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        allowed_content_types: [
            "image/jpeg",
            "image/jpg",
            "image/png",
            "image/gif",
            "image/webp",
            "image/avif",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect(),
    }
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(|_| {}, MemoryLogSink::default()).await
}

pub async fn setup_test_app_with(
    customize: impl FnOnce(&mut OptimizerConfig),
    log_sink: MemoryLogSink,
) -> TestApp {
    build_test_app(customize, log_sink, false).await
}

/// Serves over a real socket. Needed wherever hyper's handling of the
/// response body matters, such as cleanup after a download.
pub async fn setup_http_test_app() -> TestApp {
    setup_http_test_app_with(|_| {}).await
}

pub async fn setup_http_test_app_with(customize: impl FnOnce(&mut OptimizerConfig)) -> TestApp {
    build_test_app(customize, MemoryLogSink::default(), true).await
}

async fn build_test_app(
    customize: impl FnOnce(&mut OptimizerConfig),
    log_sink: MemoryLogSink,
    http_transport: bool,
) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut optimizer = test_config(temp_dir.path().join("uploads"));
    customize(&mut optimizer);
    let config = Config(Box::new(optimizer));

    let log_sink = Arc::new(log_sink);
    let state = build_state(config.clone(), log_sink.clone())
        .await
        .expect("Failed to build state");
    let router = routes::setup_routes(&config, state.clone()).expect("Failed to build routes");
    let server = if http_transport {
        TestServer::builder().http_transport().build(router)
    } else {
        TestServer::new(router)
    }
    .expect("Failed to start test server");

    TestApp {
        server,
        state,
        log_sink,
        _temp_dir: temp_dir,
    }
}
