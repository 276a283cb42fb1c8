use crate::humanize::ByteSize;
use serde::{Deserialize, Serialize};

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub upload: UploadSection,
    #[serde(default)]
    pub http: HttpSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Upload settings, keyed the same way as the manager construction options
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadSection {
    /// URL every chunk is POSTed to
    pub endpoint: Option<String>,
    /// Upload token included in every chunk request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// URL that hands out upload tokens when `token` is not set
    pub token_endpoint: Option<String>,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: ByteSize,
    #[serde(default = "default_max_concurrent_connections")]
    pub max_concurrent_connections: usize,
    /// Total attempts per chunk, the first one included
    #[serde(default = "default_max_retries_per_connection")]
    pub max_retries_per_connection: u32,
    /// Base delay between attempts; 0 retries immediately
    #[serde(default)]
    pub retry_backoff_ms: u64,

    #[serde(default)]
    pub checksum: bool,
    #[serde(default)]
    pub checksum_incremental: bool,
    #[serde(default = "default_checksum_algorithm")]
    pub checksum_algorithm: String,
    #[serde(default)]
    pub encrypt: bool,
    #[serde(default = "default_encryption_algorithm")]
    pub encryption_algorithm: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_public_key: Option<String>,
}

impl Default for UploadSection {
    fn default() -> Self {
        Self {
            endpoint: None,
            token: None,
            token_endpoint: None,
            chunk_size: default_chunk_size(),
            max_concurrent_connections: default_max_concurrent_connections(),
            max_retries_per_connection: default_max_retries_per_connection(),
            retry_backoff_ms: 0,
            checksum: false,
            checksum_incremental: false,
            checksum_algorithm: default_checksum_algorithm(),
            encrypt: false,
            encryption_algorithm: default_encryption_algorithm(),
            encryption_public_key: None,
        }
    }
}

pub(crate) fn default_chunk_size() -> ByteSize {
    ByteSize(1_000_000)
}

pub(crate) fn default_max_concurrent_connections() -> usize {
    3
}

pub(crate) fn default_max_retries_per_connection() -> u32 {
    3
}

pub(crate) fn default_checksum_algorithm() -> String {
    "md5".to_string()
}

pub(crate) fn default_encryption_algorithm() -> String {
    "rsa".to_string()
}

/// HTTP client settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpSection {
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    60
}

pub(crate) fn default_user_agent() -> String {
    format!("chunkup/{}", env!("CARGO_PKG_VERSION"))
}

/// Logging settings; `RUST_LOG` takes precedence over `filter`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "info".to_string()
}
