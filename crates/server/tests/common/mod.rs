//! Common test utilities for API testing with mock strategies.
//!
//! This module provides a test fixture that builds the router in-process
//! around a dispatcher whose registry holds mock strategies, so the API can
//! be exercised without any conversion tools installed.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use transmute_core::{
    testing::{fixtures, MockStrategy},
    Config, Dispatcher, DispatcherConfig, FallbackExecutor, JobStore, StrategyRegistry,
    UploadCache,
};

const BOUNDARY: &str = "transmute-test-boundary";

/// Test fixture for API testing.
///
/// Registers a single `DOCX -> PDF` pair served by [`TestFixture::strategy`].
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_convert() {
///     let fixture = TestFixture::new().await;
///     let response = fixture.convert(b"doc", "a.docx", "docx", "pdf").await;
///     assert_eq!(response.status, StatusCode::ACCEPTED);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock strategy behind the registered pair
    pub strategy: Arc<MockStrategy>,
    /// Dispatcher shared with the router
    pub dispatcher: Arc<Dispatcher>,
    /// Temporary directory for uploads and outputs
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub bytes: Vec<u8>,
    pub body: Value,
}

impl TestFixture {
    /// Create a fixture whose strategy succeeds and writes `%PDF`.
    pub async fn new() -> Self {
        Self::with_strategy(
            MockStrategy::succeeding("strategy-1").with_output("%PDF"),
            DispatcherConfig::default(),
        )
        .await
    }

    /// Create a fixture around a custom strategy and dispatcher config.
    pub async fn with_strategy(strategy: MockStrategy, dispatcher_config: DispatcherConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let strategy = Arc::new(strategy);
        let registry: StrategyRegistry = fixtures::registry("docx", "pdf", &[&strategy]);

        let mut config = Config::default();
        config.storage.uploads_dir = temp_dir.path().join("uploads");
        config.storage.outputs_dir = temp_dir.path().join("outputs");
        config.dispatcher = dispatcher_config;

        let uploads = Arc::new(UploadCache::new(&config.storage.uploads_dir));
        let store = Arc::new(JobStore::new(uploads));
        let executor = FallbackExecutor::new(Arc::clone(&store), config.executor.clone());
        let dispatcher = Arc::new(Dispatcher::new(
            config.dispatcher.clone(),
            &config.storage.outputs_dir,
            Arc::new(registry),
            store,
            executor,
        ));
        dispatcher.start().await.expect("Failed to start dispatcher");

        let state = Arc::new(transmute_server::state::AppState::new(config, Arc::clone(&dispatcher)));
        let router = transmute_server::api::create_router(state);

        Self {
            router,
            strategy,
            dispatcher,
            temp_dir,
        }
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.send(Request::builder().method("GET").uri(path).body(Body::empty()).unwrap())
            .await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        self.send(Request::builder().method("DELETE").uri(path).body(Body::empty()).unwrap())
            .await
    }

    /// POST /api/v1/convert with a multipart body.
    pub async fn convert(
        &self,
        bytes: &[u8],
        filename: &str,
        source_format: &str,
        destination_format: &str,
    ) -> TestResponse {
        let body = multipart_body(&[
            Part::File {
                name: "file",
                filename,
                bytes,
            },
            Part::Text {
                name: "sourceFormat",
                value: source_format,
            },
            Part::Text {
                name: "destinationFormat",
                value: destination_format,
            },
        ]);
        self.post_multipart("/api/v1/convert", body).await
    }

    pub async fn post_multipart(&self, path: &str, body: Vec<u8>) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Poll the status endpoint until the job is terminal.
    pub async fn wait_terminal(&self, job_id: &str) -> TestResponse {
        for _ in 0..500 {
            let response = self.get(&format!("/api/v1/status/{}", job_id)).await;
            let status = response.body["status"].as_str().unwrap_or_default();
            if status == "completed" || status == "error" {
                return response;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {} did not finish", job_id);
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes()
            .to_vec();

        let body: Value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            bytes,
            body,
        }
    }
}

/// One part of a multipart form.
pub enum Part<'a> {
    Text { name: &'a str, value: &'a str },
    File { name: &'a str, filename: &'a str, bytes: &'a [u8] },
}

/// Encode parts as a `multipart/form-data` body using the fixture boundary.
pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                filename,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                        name, filename
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}
