//! Integration tests against an in-process HTTP server
//!
//! The server stores every multipart chunk it receives so tests can reassemble
//! the upload and compare it with the original bytes.

use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use chunkup::UploadConfig;
use chunkup::manager::UploadManager;
use chunkup::token::fetch_upload_token;
use chunkup::transfer::{
    CachePolicy, ParsedBody, RequestBody, RequestOptions, TransferClient, TransferError, Transport,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
struct ReceivedChunk {
    data: Bytes,
    token: String,
    file_name: Option<String>,
    content_type: Option<String>,
}

#[derive(Clone, Default)]
struct ServerState {
    chunks: Arc<Mutex<BTreeMap<u64, ReceivedChunk>>>,
    requests: Arc<AtomicUsize>,
    /// Requests to /flaky answered with 503 before accepting
    flaky_failures: usize,
}

impl ServerState {
    fn reassemble(&self) -> Vec<u8> {
        self.chunks
            .lock()
            .unwrap()
            .values()
            .flat_map(|chunk| chunk.data.iter().copied())
            .collect()
    }
}

async fn start_mock_server(state: ServerState) -> Result<String, Box<dyn std::error::Error>> {
    let app = Router::new()
        .route("/upload", post(receive_chunk))
        .route("/flaky", post(flaky_chunk))
        .route("/fail", post(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
        .route("/token", get(|| async { Json(json!({"token": "srv-token"})) }))
        .route("/json", get(|| async { Json(json!({"status": "ok", "n": 3})) }))
        .route("/text", get(|| async { "plain body" }))
        .route(
            "/broken-json",
            get(|| async { ([(header::CONTENT_TYPE, "application/json")], "{oops") }),
        )
        .route("/headers", get(echo_headers))
        .with_state(state);

    // Bind to random available port
    let addr = SocketAddr::from(([127, 0, 0, 1], 0));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Ok(format!("http://{}", bound_addr))
}

async fn receive_chunk(State(state): State<ServerState>, multipart: Multipart) -> StatusCode {
    state.requests.fetch_add(1, Ordering::SeqCst);
    store_chunk(&state, multipart).await
}

async fn flaky_chunk(State(state): State<ServerState>, multipart: Multipart) -> StatusCode {
    let seen = state.requests.fetch_add(1, Ordering::SeqCst);
    if seen < state.flaky_failures {
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    store_chunk(&state, multipart).await
}

async fn store_chunk(state: &ServerState, mut multipart: Multipart) -> StatusCode {
    let mut number = None;
    let mut token = None;
    let mut data = None;

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "chunkNumber" => number = field.text().await.ok().and_then(|n| n.parse::<u64>().ok()),
            "token" => token = field.text().await.ok(),
            "data" => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                if let Ok(bytes) = field.bytes().await {
                    data = Some((bytes, file_name, content_type));
                }
            }
            _ => {}
        }
    }

    match (number, token, data) {
        (Some(number), Some(token), Some((data, file_name, content_type))) => {
            state.chunks.lock().unwrap().insert(
                number,
                ReceivedChunk {
                    data,
                    token,
                    file_name,
                    content_type,
                },
            );
            StatusCode::OK
        }
        _ => StatusCode::BAD_REQUEST,
    }
}

async fn echo_headers(headers: HeaderMap) -> impl IntoResponse {
    let value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string()
    };
    Json(json!({
        "cache_control": value("cache-control"),
        "x_trace": value("x-trace"),
        "user_agent": value("user-agent"),
    }))
}

fn client() -> TransferClient {
    TransferClient::new(&Default::default()).unwrap()
}

fn sample_data(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[tokio::test]
async fn test_json_response_is_decoded() {
    let url = start_mock_server(ServerState::default()).await.unwrap();

    let body = client()
        .get(&format!("{}/json", url), RequestOptions::new())
        .await
        .unwrap();

    assert_eq!(body, ParsedBody::Json(json!({"status": "ok", "n": 3})));
}

#[tokio::test]
async fn test_text_response_is_left_binary() {
    let url = start_mock_server(ServerState::default()).await.unwrap();

    let body = client()
        .get(&format!("{}/text", url), RequestOptions::new())
        .await
        .unwrap();

    assert_eq!(body, ParsedBody::Binary(Bytes::from_static(b"plain body")));
}

#[tokio::test]
async fn test_error_status_is_rejected() {
    let url = start_mock_server(ServerState::default()).await.unwrap();

    let err = client()
        .post(
            &format!("{}/fail", url),
            RequestOptions::new().with_body(RequestBody::Bytes(Bytes::from_static(b"x"))),
        )
        .await
        .unwrap_err();

    assert_eq!(err, TransferError::Rejected { status: 500 });
    assert_eq!(err.reason(), "rejected");
    assert_eq!(err.to_string(), "The request was not accepted.");
}

#[tokio::test]
async fn test_malformed_json_is_network_error() {
    let url = start_mock_server(ServerState::default()).await.unwrap();

    let err = client()
        .get(&format!("{}/broken-json", url), RequestOptions::new())
        .await
        .unwrap_err();

    assert_eq!(err.reason(), "network");
}

#[tokio::test]
async fn test_headers_and_cache_policy_are_sent() {
    let url = start_mock_server(ServerState::default()).await.unwrap();

    let options = RequestOptions::new()
        .with_header("x-trace", "trace-1")
        .with_cache(CachePolicy::NoCache);
    let body = client()
        .get(&format!("{}/headers", url), options)
        .await
        .unwrap();

    let ParsedBody::Json(echo) = body else {
        panic!("expected JSON echo");
    };
    assert_eq!(echo["cache_control"], "no-cache");
    assert_eq!(echo["x_trace"], "trace-1");
    assert!(echo["user_agent"].as_str().unwrap().starts_with("chunkup/"));
}

#[tokio::test]
async fn test_upload_reassembles_on_server() {
    let state = ServerState::default();
    let url = start_mock_server(state.clone()).await.unwrap();
    let data = sample_data(1_050_000);

    let config = UploadConfig::builder()
        .endpoint(format!("{}/upload", url))
        .token("t-42")
        .chunk_size(100_000)
        .max_concurrent_workers(3)
        .build()
        .unwrap();
    let manager = UploadManager::new(config).unwrap();

    let report = manager
        .upload(Bytes::from(data.clone()))
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert_eq!(report.chunks, 11);
    assert_eq!(report.bytes, 1_050_000);
    assert_eq!(state.requests.load(Ordering::SeqCst), 11);
    assert_eq!(state.reassemble(), data);

    let chunks = state.chunks.lock().unwrap();
    assert_eq!(chunks.keys().copied().collect::<Vec<_>>(), (0..11u64).collect::<Vec<_>>());
    assert_eq!(chunks[&10].data.len(), 50_000);
    for chunk in chunks.values() {
        assert_eq!(chunk.token, "t-42");
        assert_eq!(chunk.file_name.as_deref(), Some("blob"));
        assert_eq!(chunk.content_type.as_deref(), Some("application/octet-stream"));
    }
}

#[tokio::test]
async fn test_upload_survives_transient_server_errors() {
    let state = ServerState {
        flaky_failures: 2,
        ..Default::default()
    };
    let url = start_mock_server(state.clone()).await.unwrap();
    let data = sample_data(10_000);

    let config = UploadConfig::builder()
        .endpoint(format!("{}/flaky", url))
        .token("t")
        .chunk_size(1_000)
        .max_concurrent_workers(2)
        .max_retries_per_chunk(3)
        .build()
        .unwrap();
    let manager = UploadManager::new(config).unwrap();

    let report = manager
        .upload(Bytes::from(data.clone()))
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert_eq!(report.chunks, 10);
    assert_eq!(report.retries, 2);
    assert_eq!(state.requests.load(Ordering::SeqCst), 12);
    assert_eq!(state.reassemble(), data);
}

#[tokio::test]
async fn test_upload_fails_when_server_rejects() {
    let url = start_mock_server(ServerState::default()).await.unwrap();

    let config = UploadConfig::builder()
        .endpoint(format!("{}/fail", url))
        .token("t")
        .chunk_size(4)
        .max_concurrent_workers(1)
        .build()
        .unwrap();
    let manager = UploadManager::new(config).unwrap();

    let err = manager
        .upload(Bytes::from_static(b"abcdefgh"))
        .await
        .unwrap()
        .wait()
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "There was an issue uploading chunk 0. Error: The request was not accepted."
    );
    assert!(!manager.snapshot().await.in_progress);
}

#[tokio::test]
async fn test_token_endpoint_feeds_upload() {
    let state = ServerState::default();
    let url = start_mock_server(state.clone()).await.unwrap();

    let token = fetch_upload_token(&client(), &format!("{}/token", url))
        .await
        .unwrap();
    assert_eq!(token, "srv-token");

    let config = UploadConfig::builder()
        .endpoint(format!("{}/upload", url))
        .token(token)
        .chunk_size(3)
        .build()
        .unwrap();
    let manager = UploadManager::new(config).unwrap();
    manager
        .upload(Bytes::from_static(b"hello"))
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    let chunks = state.chunks.lock().unwrap();
    assert_eq!(chunks.len(), 2);
    assert!(chunks.values().all(|c| c.token == "srv-token"));
}
