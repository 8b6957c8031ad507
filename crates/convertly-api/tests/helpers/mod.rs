//! Test helpers: build AppState and router over an in-memory store and a
//! scripted provider. No network access.
//!
//! Run with: `cargo test -p convertly-api`

pub mod fixtures;

use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestResponse, TestServer};
use convertly_api::setup::{routes, services};
use convertly_api::AppState;
use convertly_core::{Config, ConverterConfig, ProviderCredential};
use convertly_provider::testing::ScriptedProvider;
use convertly_storage::MemoryStore;
use std::sync::Arc;

pub const PUBLIC_BASE_URL: &str = "http://localhost:4000";

pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub store: Arc<MemoryStore>,
    pub provider: Arc<ScriptedProvider>,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

/// Defaults with a dummy credential and millisecond polling.
pub fn test_config() -> ConverterConfig {
    let mut config = ConverterConfig {
        provider_api_key: ProviderCredential::new("test-api-key-0123456789"),
        poll_interval_ms: 1,
        batch_poll_interval_ms: 1,
        max_poll_attempts: 20,
        ..Default::default()
    };
    config.base.public_base_url = PUBLIC_BASE_URL.to_string();
    config
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(ScriptedProvider::default(), test_config()).await
}

pub async fn setup_test_app_with(provider: ScriptedProvider, config: ConverterConfig) -> TestApp {
    let config = Config(Box::new(config));
    let store = Arc::new(MemoryStore::new());
    let provider = Arc::new(provider);

    let state = services::initialize_services(&config, store.clone(), provider.clone())
        .expect("Failed to initialize services");
    let router = routes::setup_routes(&config, state.clone()).expect("Failed to build routes");
    let server = TestServer::new(router).expect("Failed to start test server");

    TestApp {
        server,
        state,
        store,
        provider,
    }
}

/// POST /upload with one `file` part.
pub async fn upload(server: &TestServer, filename: &str, mime_type: &str, bytes: Vec<u8>) -> TestResponse {
    let part = Part::bytes(bytes).file_name(filename).mime_type(mime_type);
    server
        .post("/upload")
        .multipart(MultipartForm::new().add_part("file", part))
        .await
}

/// Upload and return the new file id.
pub async fn upload_ok(server: &TestServer, filename: &str, mime_type: &str, bytes: Vec<u8>) -> String {
    let response = upload(server, filename, mime_type, bytes).await;
    assert_eq!(response.status_code(), 200, "upload failed: {}", response.text());
    let body: serde_json::Value = response.json();
    body["id"].as_str().expect("upload id").to_string()
}

/// GET /convert until the job is terminal. Panics after `max_polls`.
pub async fn poll_until_terminal(server: &TestServer, job_id: &str, max_polls: usize) -> serde_json::Value {
    for _ in 0..max_polls {
        let response = server.get("/convert").add_query_param("jobId", job_id).await;
        assert_eq!(response.status_code(), 200, "status failed: {}", response.text());
        let body: serde_json::Value = response.json();
        if body["status"] == "finished" || body["status"] == "error" {
            return body;
        }
    }
    panic!("job {} did not reach a terminal status", job_id);
}
