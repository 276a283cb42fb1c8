//! Configuration management for chunkup
//!
//! Two layers:
//! - [`Config`]: what the binary loads from defaults, a TOML file, and
//!   environment variables (highest priority).
//! - [`UploadConfig`]: the validated, immutable record an
//!   [`UploadManager`](crate::manager::UploadManager) is built from.
//!
//! # Usage
//!
//! ```no_run
//! use chunkup::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! let upload = config.upload_config(None).expect("incomplete upload settings");
//! println!("Uploading to: {}", upload.endpoint());
//! ```
//!
//! Command-line flags travel as [`UploadOverrides`] and are applied last with
//! [`Config::apply_overrides`].
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `CHUNKUP__<section>__<key>`
//!
//! Examples:
//! - `CHUNKUP__UPLOAD__ENDPOINT=https://uploads.example.com/chunks`
//! - `CHUNKUP__UPLOAD__TOKEN=secret`
//! - `CHUNKUP__UPLOAD__CHUNK_SIZE=4MB`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/chunkup.toml`.
//! This can be overridden using the `CHUNKUP_CONFIG` environment variable.

mod models;
mod overrides;
mod sources;
mod upload;
mod validation;

pub use crate::humanize::ByteSize;
pub use models::{Config, HttpSection, LoggingSection, UploadSection};
pub use overrides::UploadOverrides;
pub use upload::{ChecksumOptions, EncryptionOptions, UploadConfig};
pub use validation::ValidationError;

use crate::transfer::http::HttpConfig;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("Missing required setting: {0}")]
    MissingField(&'static str),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables (`CHUNKUP__*`)
    /// 2. TOML file (default: `config/chunkup.toml`)
    /// 3. Default values
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file is malformed
    /// - Validation fails (bad URLs, zero limits, checksum/encryption requested)
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Re-run validation after in-memory overrides (e.g. CLI flags)
    pub fn validate(&self) -> Result<(), ConfigError> {
        validation::validate(self)?;
        Ok(())
    }

    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            connect_timeout: Duration::from_secs(self.http.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.http.request_timeout_secs),
            user_agent: self.http.user_agent.clone(),
        }
    }

    /// Build the manager configuration.
    ///
    /// `token` takes precedence over `upload.token`; callers pass the token they
    /// fetched from `upload.token_endpoint` here.
    pub fn upload_config(&self, token: Option<String>) -> Result<UploadConfig, ConfigError> {
        let upload = &self.upload;

        let endpoint = upload
            .endpoint
            .clone()
            .ok_or(ConfigError::MissingField("upload.endpoint"))?;
        let token = token
            .or_else(|| upload.token.clone())
            .ok_or(ConfigError::MissingField("upload.token"))?;

        let config = UploadConfig::builder()
            .endpoint(endpoint)
            .token(token)
            .chunk_size(upload.chunk_size.as_u64())
            .max_concurrent_workers(upload.max_concurrent_connections)
            .max_retries_per_chunk(upload.max_retries_per_connection)
            .retry_backoff(Duration::from_millis(upload.retry_backoff_ms))
            .http(self.http_config())
            .checksum(ChecksumOptions {
                enabled: upload.checksum,
                incremental: upload.checksum_incremental,
                algorithm: upload.checksum_algorithm.clone(),
            })
            .encryption(EncryptionOptions {
                enabled: upload.encrypt,
                algorithm: upload.encryption_algorithm.clone(),
                public_key: upload.encryption_public_key.clone(),
            })
            .build()?;

        Ok(config)
    }

    /// TOML rendering with the token redacted
    pub fn to_redacted_toml(&self) -> Result<String, toml::ser::Error> {
        let mut redacted = self.clone();
        if redacted.upload.token.is_some() {
            redacted.upload.token = Some("<redacted>".to_string());
        }
        if redacted.upload.encryption_public_key.is_some() {
            redacted.upload.encryption_public_key = Some("<redacted>".to_string());
        }
        toml::to_string(&redacted)
    }
}
