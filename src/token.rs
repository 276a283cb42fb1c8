//! Upload token retrieval

use crate::config::UploadSection;
use crate::error::UploadError;
use crate::transfer::{CachePolicy, ParsedBody, RequestOptions, Transport};
use serde_json::Value;
use tracing::{debug, warn};

/// GET a fresh upload token from `endpoint`.
///
/// Accepted bodies: `{"token": "..."}` (string or number), a bare JSON string,
/// or plain text. Anything else, or an empty token, is
/// [`UploadError::TokenUnavailable`].
pub async fn fetch_upload_token(
    transport: &dyn Transport,
    endpoint: &str,
) -> Result<String, UploadError> {
    let options = RequestOptions::new()
        .with_header("accept", "application/json, text/plain")
        .with_cache(CachePolicy::NoStore);

    let body = transport.get(endpoint, options).await.map_err(|e| {
        warn!(endpoint, error = %e, "Token request failed");
        UploadError::TokenUnavailable(e.message())
    })?;

    let token = extract_token(body)?;
    debug!(endpoint, "Upload token obtained");
    Ok(token)
}

/// Token for the upload described by `upload`.
///
/// A configured `token` is used as is; otherwise one is fetched from
/// `token_endpoint`. `None` when neither is set.
pub async fn resolve_upload_token(
    upload: &UploadSection,
    transport: &dyn Transport,
) -> Result<Option<String>, UploadError> {
    if let Some(token) = &upload.token {
        return Ok(Some(token.clone()));
    }

    match upload.token_endpoint.as_deref() {
        Some(endpoint) => fetch_upload_token(transport, endpoint).await.map(Some),
        None => Ok(None),
    }
}

fn extract_token(body: ParsedBody) -> Result<String, UploadError> {
    let token = match body {
        ParsedBody::Json(Value::Object(mut fields)) => match fields.remove("token") {
            Some(Value::String(token)) => token,
            Some(Value::Number(token)) => token.to_string(),
            _ => {
                return Err(UploadError::TokenUnavailable(
                    "response has no 'token' field".to_string(),
                ));
            }
        },
        ParsedBody::Json(Value::String(token)) => token,
        ParsedBody::Json(other) => {
            return Err(UploadError::TokenUnavailable(format!(
                "unexpected JSON response: {}",
                other
            )));
        }
        ParsedBody::Binary(bytes) => String::from_utf8(bytes.to_vec()).map_err(|_| {
            UploadError::TokenUnavailable("response is not valid UTF-8".to_string())
        })?,
    };

    let token = token.trim();
    if token.is_empty() {
        return Err(UploadError::TokenUnavailable("empty token".to_string()));
    }

    Ok(token.to_string())
}
