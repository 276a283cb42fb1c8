//! Single-attempt HTTP transfers
//!
//! [`Transport`] is the seam between upload workers and the network. The
//! production implementation is [`http::TransferClient`]; tests plug in
//! scripted transports. A transport never retries; retry belongs to the worker.

pub mod http;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Method;
use thiserror::Error;

pub use http::{HttpConfig, TransferClient};

const REJECTED_MESSAGE: &str = "The request was not accepted.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// Connection, timeout or body decoding problem
    #[error("{0}")]
    Network(String),

    /// The endpoint answered with a non-success status
    #[error("{}", REJECTED_MESSAGE)]
    Rejected { status: u16 },
}

impl TransferError {
    /// Short classification: `"network"` or `"rejected"`
    pub fn reason(&self) -> &'static str {
        match self {
            TransferError::Network(_) => "network",
            TransferError::Rejected { .. } => "rejected",
        }
    }

    pub fn message(&self) -> String {
        match self {
            TransferError::Network(message) => message.clone(),
            TransferError::Rejected { .. } => REJECTED_MESSAGE.to_string(),
        }
    }
}

/// Decoded response body
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedBody {
    Json(serde_json::Value),
    /// Anything that is not JSON, left for the caller to interpret
    Binary(Bytes),
}

/// Value of a `Cache-Control` request header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CachePolicy {
    /// No header; intermediaries apply their usual rules
    #[default]
    Default,
    NoStore,
    NoCache,
}

impl CachePolicy {
    pub fn header_value(&self) -> Option<&'static str> {
        match self {
            CachePolicy::Default => None,
            CachePolicy::NoStore => Some("no-store"),
            CachePolicy::NoCache => Some("no-cache"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Bytes(Bytes),
}

/// One `multipart/form-data` field
#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub name: String,
    pub value: FieldValue,
}

impl FormField {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: FieldValue::Text(value.into()),
        }
    }

    pub fn bytes(name: impl Into<String>, value: Bytes) -> Self {
        Self {
            name: name.into(),
            value: FieldValue::Bytes(value),
        }
    }
}

/// Request body. Kept as plain data so a retry can rebuild the same request.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Bytes(Bytes),
    Multipart(Vec<FormField>),
}

/// Caller-supplied request options, merged over the defaults (GET, no body,
/// no extra headers, default caching)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub method: Option<Method>,
    pub body: RequestBody,
    pub headers: Vec<(String, String)>,
    pub cache: CachePolicy,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_cache(mut self, cache: CachePolicy) -> Self {
        self.cache = cache;
        self
    }

    /// Method after defaults are applied
    pub fn method(&self) -> Method {
        self.method.clone().unwrap_or(Method::GET)
    }
}

/// One-shot request/response exchange with a remote endpoint
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a single request; never retries
    async fn send(&self, endpoint: &str, options: RequestOptions)
    -> Result<ParsedBody, TransferError>;

    async fn get(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<ParsedBody, TransferError> {
        self.send(endpoint, options.with_method(Method::GET)).await
    }

    async fn post(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<ParsedBody, TransferError> {
        self.send(endpoint, options.with_method(Method::POST)).await
    }
}

/// Whether a `Content-Type` value names a JSON media type
pub fn is_json_content_type(content_type: &str) -> bool {
    match content_type.parse::<mime::Mime>() {
        Ok(media_type) => {
            media_type.subtype() == mime::JSON || media_type.suffix() == Some(mime::JSON)
        }
        Err(_) => content_type
            .to_ascii_lowercase()
            .contains(mime::APPLICATION_JSON.essence_str()),
    }
}

/// Classify a successful response body by its declared content type
pub fn classify_body(content_type: Option<&str>, body: Bytes) -> Result<ParsedBody, TransferError> {
    match content_type {
        Some(content_type) if is_json_content_type(content_type) => serde_json::from_slice(&body)
            .map(ParsedBody::Json)
            .map_err(|e| TransferError::Network(format!("Malformed JSON response: {}", e))),
        _ => Ok(ParsedBody::Binary(body)),
    }
}
