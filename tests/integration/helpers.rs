//! Shared test helpers for integration tests.
#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, Bytes, to_bytes};
use axum::http::{HeaderMap, Request, StatusCode, header};
use serde_json::Value;
use tower::ServiceExt;

use bigdrop_api::{AppState, build_app};
use bigdrop_auth::{JwtDecoder, JwtEncoder};
use bigdrop_core::config::AppConfig;
use bigdrop_core::traits::storage::StorageProvider;
use bigdrop_core::types::id::OwnerId;
use bigdrop_database::{MemoryTransferRepository, TransferRepository};
use bigdrop_service::TransferServices;
use bigdrop_storage::LocalStorageProvider;

const BOUNDARY: &str = "bigdrop-test-boundary";

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Registry for direct inspection and time travel
    pub repo: Arc<dyn TransferRepository>,
    /// Application config
    pub config: AppConfig,
    /// Owner behind `token`
    pub owner: OwnerId,
    /// Bearer token for `owner`
    pub token: String,
    encoder: JwtEncoder,
    _dir: tempfile::TempDir,
}

/// A captured response
pub struct TestResponse {
    /// HTTP status
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Raw body
    pub bytes: Bytes,
    /// Body parsed as JSON, `Null` when it is not JSON
    pub body: Value,
}

impl TestApp {
    /// Create a new test application with a 1 MiB chunk size
    pub async fn new() -> Self {
        Self::with_chunk_size(1024 * 1024).await
    }

    /// Create a new test application with the given chunk size
    pub async fn with_chunk_size(chunk_size: u64) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");

        let mut config = AppConfig::default();
        config.database.provider = "memory".to_string();
        config.storage.data_root = dir.path().to_string_lossy().to_string();
        config.transfer.max_chunk_size_bytes = chunk_size;
        config.transfer.max_transfer_size_bytes = 64 * 1024 * 1024;
        config.auth.jwt_secret = "integration-test-secret".to_string();
        config.worker.enabled = false;

        let storage: Arc<dyn StorageProvider> = Arc::new(
            LocalStorageProvider::new(dir.path())
                .await
                .expect("Failed to init storage"),
        );
        let repo: Arc<dyn TransferRepository> = Arc::new(MemoryTransferRepository::new());

        let services = TransferServices::build(
            Arc::clone(&repo),
            Arc::clone(&storage),
            &config.storage.chunk_prefix,
            &config.storage.archive_prefix,
            config.transfer.clone(),
        );

        let encoder = JwtEncoder::new(&config.auth);
        let decoder = Arc::new(JwtDecoder::new(&config.auth));
        let owner = OwnerId::new();
        let token = encoder.issue(owner).expect("Failed to issue token").access_token;

        let state = AppState::new(Arc::new(config.clone()), decoder, storage, services);

        Self {
            router: build_app(state),
            repo,
            config,
            owner,
            token,
            encoder,
            _dir: dir,
        }
    }

    /// A token for some other owner
    pub fn stranger_token(&self) -> String {
        self.encoder
            .issue(OwnerId::new())
            .expect("Failed to issue token")
            .access_token
    }

    /// Make a JSON request
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        self.send(request).await
    }

    /// Upload one chunk as multipart form data
    pub async fn upload_chunk(&self, transfer_id: &str, index: u32, data: &[u8]) -> TestResponse {
        let mut body = Vec::new();
        write_text_field(&mut body, "transfer_id", transfer_id);
        write_text_field(&mut body, "index", &index.to_string());
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"chunk\"; filename=\"blob\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri("/transfer/upload")
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("Failed to build request");

        self.send(request).await
    }

    /// Create a transfer for `size` bytes and return its id
    pub async fn create_transfer(&self, size: usize) -> String {
        let response = self
            .request(
                "POST",
                "/transfer/new",
                Some(serde_json::json!({ "size": size, "expiry": "24h" })),
                Some(&self.token),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body["data"]["transfer_id"]
            .as_str()
            .expect("transfer_id missing")
            .to_string()
    }

    /// Create, upload in chunk-size pieces and assemble `archive`
    pub async fn publish(&self, archive: &[u8]) -> String {
        let id = self.create_transfer(archive.len()).await;
        let chunk = self.config.transfer.max_chunk_size_bytes as usize;
        for (index, piece) in archive.chunks(chunk).enumerate() {
            let response = self.upload_chunk(&id, index as u32, piece).await;
            assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        }
        let response = self
            .request(
                "POST",
                "/transfer/assemble",
                Some(serde_json::json!({ "id": id })),
                Some(&self.token),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        id
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            bytes,
            body,
        }
    }
}

fn write_text_field(body: &mut Vec<u8>, name: &str, value: &str) {
    body.extend_from_slice(
        format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
            .as_bytes(),
    );
}

/// Build a zip archive with stored (uncompressed) entries
pub fn zip_of(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);
    for (name, content) in files {
        writer.start_file(*name, options).expect("start_file");
        writer.write_all(content).expect("write_all");
    }
    writer.finish().expect("finish").into_inner()
}
