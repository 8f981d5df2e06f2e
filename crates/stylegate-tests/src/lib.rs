//! End-to-end test support for the stylegate gateway
//!
//! Starts fake remote inference services and a gateway wired to them over
//! real HTTP on ephemeral ports, so the whole path (resolver, registry,
//! remote client, routes, staging) is exercised in-process.
//!
//! # Test Structure
//!
//! - `gateway_e2e_test.rs` - Resolution, routing and file flow end to end

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use stylegate_api::{create_router, AppState, StagingArea};
use stylegate_client::testing::TestServer;
use stylegate_client::ClientOptions;
use stylegate_core::Capability;
use stylegate_proxy::RemoteConnector;
use stylegate_registry::{CapabilityConfig, CapabilityRegistry, EndpointResolver, RetryPolicy};
use tempfile::TempDir;

/// Remote path the fake service reports for its file outputs
pub const REMOTE_OUTPUT_PATH: &str = "/srv/outputs/out.png";

// =============================================================================
// Fake inference service
// =============================================================================

/// What a fake service answers on its predict endpoint
#[derive(Debug, Clone)]
pub enum FakeOutput {
    Text(String),
    /// A file output, fetched from `/file=<REMOTE_OUTPUT_PATH>`
    File(Vec<u8>),
    /// HTTP 500 with `{"error": <message>}`
    Error(String),
}

/// Observations shared between a fake service and the test
#[derive(Debug, Clone, Default)]
pub struct FakeSpaceLog {
    config_probes: Arc<AtomicUsize>,
    /// Bodies posted to the predict endpoint
    pub predictions: Arc<Mutex<Vec<Value>>>,
    /// `(file name, bytes)` of every uploaded file, in order
    pub uploads: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
}

impl FakeSpaceLog {
    pub fn config_probes(&self) -> usize {
        self.config_probes.load(Ordering::SeqCst)
    }

    pub fn prediction_count(&self) -> usize {
        self.predictions.lock().len()
    }
}

#[derive(Clone)]
struct FakeSpaceState {
    output: FakeOutput,
    /// Config probes still to answer with 503
    failing_probes: Arc<AtomicUsize>,
    log: FakeSpaceLog,
}

/// A fake Gradio-style inference app
pub struct FakeSpace {
    pub server: TestServer,
    pub log: FakeSpaceLog,
}

impl FakeSpace {
    /// Serve `output` on `/run<api_name>`
    pub async fn start(api_name: &str, output: FakeOutput) -> Self {
        Self::start_flaky(api_name, output, 0).await
    }

    /// Like `start`, but the first `failing_probes` config probes get a 503
    pub async fn start_flaky(api_name: &str, output: FakeOutput, failing_probes: usize) -> Self {
        let log = FakeSpaceLog::default();
        let state = FakeSpaceState {
            output,
            failing_probes: Arc::new(AtomicUsize::new(failing_probes)),
            log: log.clone(),
        };

        let router = Router::new()
            .route("/config", get(config))
            .route("/upload", post(upload))
            .route(&format!("/run{}", api_name), post(predict))
            .route(&format!("/file={}", REMOTE_OUTPUT_PATH), get(output_file))
            .with_state(state);

        let server = TestServer::start(router)
            .await
            .expect("Failed to start fake space");
        Self { server, log }
    }

    pub fn endpoint(&self) -> String {
        self.server.base_url()
    }
}

async fn config(State(state): State<FakeSpaceState>) -> (StatusCode, Json<Value>) {
    state.log.config_probes.fetch_add(1, Ordering::SeqCst);

    let failing = state
        .failing_probes
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if failing {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": "Space is starting"})),
        );
    }

    (StatusCode::OK, Json(json!({"version": "4.44.0"})))
}

async fn upload(State(state): State<FakeSpaceState>, mut multipart: Multipart) -> Json<Vec<String>> {
    let mut paths = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.file_name().unwrap_or("blob").to_string();
        let bytes = field.bytes().await.unwrap_or_default().to_vec();
        paths.push(format!("/srv/uploads/{}", name));
        state.log.uploads.lock().push((name, bytes));
    }
    Json(paths)
}

async fn predict(
    State(state): State<FakeSpaceState>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.log.predictions.lock().push(body);

    match &state.output {
        FakeOutput::Text(text) => (StatusCode::OK, Json(json!({"data": [text]}))),
        FakeOutput::File(_) => (
            StatusCode::OK,
            Json(json!({"data": [{"path": REMOTE_OUTPUT_PATH, "orig_name": "out.png"}]})),
        ),
        FakeOutput::Error(message) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": message})),
        ),
    }
}

async fn output_file(State(state): State<FakeSpaceState>) -> (StatusCode, Vec<u8>) {
    match &state.output {
        FakeOutput::File(bytes) => (StatusCode::OK, bytes.clone()),
        _ => (StatusCode::NOT_FOUND, Vec::new()),
    }
}

/// An endpoint that refuses connections
pub fn dead_endpoint() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    let addr = listener.local_addr().expect("No local address");
    drop(listener);
    format!("http://{}/", addr)
}

// =============================================================================
// Gateway
// =============================================================================

/// Bytes of the base person image written into every gateway's public dir
pub const BASE_IMAGE_BYTES: &[u8] = b"base person image";

/// Builder for an in-process gateway
pub struct GatewayBuilder {
    capabilities: Vec<CapabilityConfig>,
    api_names: Vec<(Capability, String)>,
    policy: RetryPolicy,
}

impl Default for GatewayBuilder {
    fn default() -> Self {
        Self {
            capabilities: Vec::new(),
            api_names: Vec::new(),
            policy: RetryPolicy {
                max_attempts: 3,
                backoff: Duration::from_millis(20),
            },
        }
    }
}

impl GatewayBuilder {
    pub fn capability<I, S>(mut self, capability: Capability, endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities
            .push(CapabilityConfig::new(capability, endpoints));
        self
    }

    pub fn api_name(mut self, capability: Capability, api_name: &str) -> Self {
        self.api_names.push((capability, api_name.to_string()));
        self
    }

    pub async fn start(self) -> Gateway {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let staging = StagingArea::new(
            dir.path().join("uploads"),
            dir.path().join("public"),
            dir.path().join("public/image.JPEG"),
        );
        staging
            .ensure_directories()
            .await
            .expect("Failed to create staging directories");
        std::fs::write(staging.base_image(), BASE_IMAGE_BYTES).expect("Failed to write base image");

        let options = ClientOptions {
            download_dir: dir.path().join("downloads"),
            ..ClientOptions::default()
        };
        let connector = self
            .api_names
            .into_iter()
            .fold(RemoteConnector::new(options), |connector, (capability, name)| {
                connector.with_api_name(capability, name)
            });

        let resolver = EndpointResolver::with_policy(Arc::new(connector), self.policy);
        let registry = CapabilityRegistry::build(&resolver, self.capabilities).await;

        let state = AppState::new(Arc::new(registry), Arc::new(staging));
        let server = TestServer::start_with_timeout(create_router(state), Duration::from_secs(30))
            .await
            .expect("Failed to start gateway");

        Gateway { server, dir }
    }
}

/// A running gateway with its own staging directories
pub struct Gateway {
    pub server: TestServer,
    dir: TempDir,
}

impl Gateway {
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::default()
    }

    /// Where the remote client lands file outputs before publishing
    pub fn downloads_dir(&self) -> PathBuf {
        self.dir.path().join("downloads")
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.dir.path().join("uploads")
    }

    pub fn public_dir(&self) -> PathBuf {
        self.dir.path().join("public")
    }

    pub fn url(&self, path: &str) -> String {
        self.server.url(path)
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.server.http
    }

    /// POST a JSON body and return status and parsed body
    pub async fn post_json(&self, path: &str, body: Value) -> (u16, Value) {
        let response = self
            .http()
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("Request failed");
        read(response).await
    }

    /// POST a multipart form and return status and parsed body
    pub async fn post_form(&self, path: &str, form: reqwest::multipart::Form) -> (u16, Value) {
        let response = self
            .http()
            .post(self.url(path))
            .multipart(form)
            .send()
            .await
            .expect("Request failed");
        read(response).await
    }

    pub async fn get_json(&self, path: &str) -> (u16, Value) {
        let response = self
            .http()
            .get(self.url(path))
            .send()
            .await
            .expect("Request failed");
        read(response).await
    }
}

async fn read(response: reqwest::Response) -> (u16, Value) {
    let status = response.status().as_u16();
    let body = response.json().await.unwrap_or(Value::Null);
    (status, body)
}

/// Multipart form with an `uploadedFile` image part
pub fn garment_form(file_name: &str, bytes: &[u8]) -> reqwest::multipart::Form {
    reqwest::multipart::Form::new().part(
        "uploadedFile",
        reqwest::multipart::Part::bytes(bytes.to_vec()).file_name(file_name.to_string()),
    )
}
