//! reqwest-backed transport

use super::{
    FieldValue, FormField, ParsedBody, RequestBody, RequestOptions, TransferError, Transport,
    classify_body,
};
use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use std::time::Duration;
use tracing::debug;

/// HTTP client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            user_agent: format!("chunkup/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Stateless HTTP transport; every call is independent
#[derive(Debug, Clone)]
pub struct TransferClient {
    client: Client,
}

impl TransferClient {
    pub fn new(config: &HttpConfig) -> Result<Self, TransferError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| TransferError::Network(e.to_string()))?;

        Ok(Self { client })
    }

    fn build_form(fields: Vec<FormField>) -> Result<Form, TransferError> {
        let mut form = Form::new();
        for field in fields {
            form = match field.value {
                FieldValue::Text(text) => form.text(field.name, text),
                FieldValue::Bytes(bytes) => {
                    let length = bytes.len() as u64;
                    let part = Part::stream_with_length(Body::from(bytes), length)
                        .file_name("blob")
                        .mime_str(mime::APPLICATION_OCTET_STREAM.as_ref())
                        .map_err(|e| TransferError::Network(format!("Invalid form part: {}", e)))?;
                    form.part(field.name, part)
                }
            };
        }
        Ok(form)
    }
}

fn network_error(e: reqwest::Error) -> TransferError {
    if e.is_timeout() {
        TransferError::Network(format!("Request timed out: {}", e))
    } else if e.is_connect() {
        TransferError::Network(format!("Connection failed: {}", e))
    } else {
        TransferError::Network(e.to_string())
    }
}

#[async_trait]
impl Transport for TransferClient {
    async fn send(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<ParsedBody, TransferError> {
        let method = options.method();
        debug!(endpoint, %method, "Sending request");

        let mut request = self.client.request(method, endpoint);

        for (name, value) in &options.headers {
            request = request.header(name, value);
        }
        if let Some(value) = options.cache.header_value() {
            request = request.header(CACHE_CONTROL, value);
        }

        request = match options.body {
            RequestBody::Empty => request,
            RequestBody::Json(value) => request
                .header(CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
                .body(value.to_string()),
            RequestBody::Bytes(bytes) => request
                .header(CONTENT_TYPE, mime::APPLICATION_OCTET_STREAM.as_ref())
                .body(bytes),
            RequestBody::Multipart(fields) => request.multipart(Self::build_form(fields)?),
        };

        let response = request.send().await.map_err(network_error)?;

        let status = response.status();
        if !status.is_success() {
            debug!(endpoint, status = status.as_u16(), "Request rejected");
            return Err(TransferError::Rejected {
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        let body = response
            .bytes()
            .await
            .map_err(|e| TransferError::Network(format!("Failed to read body: {}", e)))?;

        debug!(endpoint, size = body.len(), "Response received");

        classify_body(content_type.as_deref(), body)
    }
}
