use super::models::{Config, UploadSection};
use reqwest::Url;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("A valid upload endpoint is required")]
    MissingEndpoint,

    #[error("An upload token is required")]
    MissingToken,

    #[error("Invalid {field} '{value}': {reason}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Chunk size must be positive")]
    ZeroChunkSize,

    #[error("At least one concurrent connection is required")]
    ZeroConcurrency,

    #[error("At least one attempt per chunk is required")]
    ZeroRetries,

    #[error("Option '{option}' is not supported; disable it or remove it from the configuration")]
    UnsupportedOption { option: &'static str },

    /// HTTP settings the client library refused (e.g. a malformed user agent)
    #[error("Invalid HTTP client settings: {0}")]
    HttpClient(String),
}

/// Validate the file/environment layer.
///
/// Endpoint and token may still be supplied later (CLI flags, token endpoint), so
/// only their syntax is checked here; presence is enforced by `UploadConfig`.
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_upload(&config.upload)
}

fn validate_upload(upload: &UploadSection) -> Result<(), ValidationError> {
    if let Some(endpoint) = upload.endpoint.as_deref() {
        check_url("endpoint", endpoint)?;
    }
    if let Some(token_endpoint) = upload.token_endpoint.as_deref() {
        check_url("token_endpoint", token_endpoint)?;
    }

    check_limits(
        upload.chunk_size.as_u64(),
        upload.max_concurrent_connections,
        upload.max_retries_per_connection,
    )?;

    check_inert_options(
        upload.checksum,
        upload.checksum_incremental,
        upload.encrypt,
        upload.encryption_public_key.is_some(),
    )
}

/// Endpoints must be absolute http(s) URLs
pub(crate) fn check_url(field: &'static str, value: &str) -> Result<(), ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidUrl {
        field,
        value: value.to_string(),
        reason,
    };

    let url = Url::parse(value).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(format!("unsupported scheme '{}'", other))),
    }
}

pub(crate) fn check_limits(
    chunk_size: u64,
    max_concurrent: usize,
    max_attempts: u32,
) -> Result<(), ValidationError> {
    if chunk_size == 0 {
        return Err(ValidationError::ZeroChunkSize);
    }
    if max_concurrent == 0 {
        return Err(ValidationError::ZeroConcurrency);
    }
    if max_attempts == 0 {
        return Err(ValidationError::ZeroRetries);
    }
    Ok(())
}

/// Checksum and encryption are recognized but not implemented; requesting them is an error.
pub(crate) fn check_inert_options(
    checksum: bool,
    checksum_incremental: bool,
    encrypt: bool,
    has_public_key: bool,
) -> Result<(), ValidationError> {
    if checksum {
        return Err(ValidationError::UnsupportedOption { option: "checksum" });
    }
    if checksum_incremental {
        return Err(ValidationError::UnsupportedOption {
            option: "checksum_incremental",
        });
    }
    if encrypt {
        return Err(ValidationError::UnsupportedOption { option: "encrypt" });
    }
    if has_public_key {
        return Err(ValidationError::UnsupportedOption {
            option: "encryption_public_key",
        });
    }
    Ok(())
}
