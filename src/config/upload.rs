use super::models::{
    default_checksum_algorithm, default_chunk_size, default_encryption_algorithm,
    default_max_concurrent_connections, default_max_retries_per_connection,
};
use super::validation::{self, ValidationError};
use crate::transfer::http::HttpConfig;
use bon::bon;
use std::time::Duration;

/// Per-chunk checksum options (recognized, not implemented)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumOptions {
    pub enabled: bool,
    pub incremental: bool,
    pub algorithm: String,
}

impl Default for ChecksumOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            incremental: false,
            algorithm: default_checksum_algorithm(),
        }
    }
}

/// Payload encryption options (recognized, not implemented)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionOptions {
    pub enabled: bool,
    pub algorithm: String,
    pub public_key: Option<String>,
}

impl Default for EncryptionOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            algorithm: default_encryption_algorithm(),
            public_key: None,
        }
    }
}

/// Validated settings for one [`UploadManager`](crate::manager::UploadManager).
///
/// Built through [`UploadConfig::builder`]; every rule is checked in `build()`
/// so a manager never starts with an unusable configuration.
///
/// ```
/// use chunkup::config::UploadConfig;
///
/// let config = UploadConfig::builder()
///     .endpoint("https://uploads.example.com/chunks")
///     .token("t-123")
///     .chunk_size(5)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_concurrent_workers(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct UploadConfig {
    endpoint: String,
    token: String,
    chunk_size: u64,
    max_concurrent_workers: usize,
    max_retries_per_chunk: u32,
    retry_backoff: Duration,
    http: HttpConfig,
    checksum: ChecksumOptions,
    encryption: EncryptionOptions,
}

#[bon]
impl UploadConfig {
    #[builder]
    pub fn new(
        #[builder(into)] endpoint: String,
        #[builder(into)] token: String,
        #[builder(default = default_chunk_size().as_u64())] chunk_size: u64,
        #[builder(default = default_max_concurrent_connections())] max_concurrent_workers: usize,
        #[builder(default = default_max_retries_per_connection())] max_retries_per_chunk: u32,
        #[builder(default)] retry_backoff: Duration,
        #[builder(default)] http: HttpConfig,
        #[builder(default)] checksum: ChecksumOptions,
        #[builder(default)] encryption: EncryptionOptions,
    ) -> Result<Self, ValidationError> {
        if endpoint.trim().is_empty() {
            return Err(ValidationError::MissingEndpoint);
        }
        validation::check_url("endpoint", &endpoint)?;

        if token.trim().is_empty() {
            return Err(ValidationError::MissingToken);
        }

        validation::check_limits(chunk_size, max_concurrent_workers, max_retries_per_chunk)?;
        validation::check_inert_options(
            checksum.enabled,
            checksum.incremental,
            encryption.enabled,
            encryption.public_key.is_some(),
        )?;

        Ok(Self {
            endpoint,
            token,
            chunk_size,
            max_concurrent_workers,
            max_retries_per_chunk,
            retry_backoff,
            http,
            checksum,
            encryption,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    pub fn max_concurrent_workers(&self) -> usize {
        self.max_concurrent_workers
    }

    /// Total attempts a worker makes for one chunk
    pub fn max_retries_per_chunk(&self) -> u32 {
        self.max_retries_per_chunk
    }

    pub fn retry_backoff(&self) -> Duration {
        self.retry_backoff
    }

    pub fn http(&self) -> &HttpConfig {
        &self.http
    }

    pub fn checksum(&self) -> &ChecksumOptions {
        &self.checksum
    }

    pub fn encryption(&self) -> &EncryptionOptions {
        &self.encryption
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENDPOINT: &str = "https://uploads.example.com/chunks";

    #[test]
    fn test_defaults() {
        let config = UploadConfig::builder()
            .endpoint(ENDPOINT)
            .token("t")
            .build()
            .unwrap();

        assert_eq!(config.endpoint(), ENDPOINT);
        assert_eq!(config.token(), "t");
        assert_eq!(config.chunk_size(), 1_000_000);
        assert_eq!(config.max_concurrent_workers(), 3);
        assert_eq!(config.max_retries_per_chunk(), 3);
        assert_eq!(config.retry_backoff(), Duration::ZERO);
        assert_eq!(config.checksum().algorithm, "md5");
        assert_eq!(config.encryption().algorithm, "rsa");
    }

    #[test]
    fn test_requires_endpoint_and_token() {
        let err = UploadConfig::builder()
            .endpoint("")
            .token("t")
            .build()
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingEndpoint);

        let err = UploadConfig::builder()
            .endpoint(ENDPOINT)
            .token("   ")
            .build()
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingToken);
    }

    #[test]
    fn test_rejects_non_http_endpoint() {
        let err = UploadConfig::builder()
            .endpoint("file:///tmp/chunks")
            .token("t")
            .build()
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidUrl { field: "endpoint", .. }));
    }

    #[test]
    fn test_rejects_zero_values() {
        let err = UploadConfig::builder()
            .endpoint(ENDPOINT)
            .token("t")
            .chunk_size(0)
            .build()
            .unwrap_err();
        assert_eq!(err, ValidationError::ZeroChunkSize);

        let err = UploadConfig::builder()
            .endpoint(ENDPOINT)
            .token("t")
            .max_concurrent_workers(0)
            .build()
            .unwrap_err();
        assert_eq!(err, ValidationError::ZeroConcurrency);

        let err = UploadConfig::builder()
            .endpoint(ENDPOINT)
            .token("t")
            .max_retries_per_chunk(0)
            .build()
            .unwrap_err();
        assert_eq!(err, ValidationError::ZeroRetries);
    }

    #[test]
    fn test_rejects_checksum_and_encryption() {
        let err = UploadConfig::builder()
            .endpoint(ENDPOINT)
            .token("t")
            .checksum(ChecksumOptions {
                enabled: true,
                ..Default::default()
            })
            .build()
            .unwrap_err();
        assert_eq!(err, ValidationError::UnsupportedOption { option: "checksum" });

        let err = UploadConfig::builder()
            .endpoint(ENDPOINT)
            .token("t")
            .encryption(EncryptionOptions {
                enabled: true,
                ..Default::default()
            })
            .build()
            .unwrap_err();
        assert_eq!(err, ValidationError::UnsupportedOption { option: "encrypt" });
    }
}
