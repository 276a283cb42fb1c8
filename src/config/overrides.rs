use super::models::Config;
use crate::humanize::ByteSize;

/// Per-invocation settings (command-line flags) applied on top of every
/// configuration source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOverrides {
    pub endpoint: Option<String>,
    pub token: Option<String>,
    /// Switches the token source to this endpoint; a configured token is dropped
    pub token_endpoint: Option<String>,
    pub chunk_size: Option<ByteSize>,
    pub max_concurrent_connections: Option<usize>,
    pub max_retries_per_connection: Option<u32>,
}

impl Config {
    /// Replace loaded values with every override that is set.
    ///
    /// An explicit `token` is applied after `token_endpoint`, so it wins when
    /// both are given. Run [`Config::validate`] afterwards.
    pub fn apply_overrides(&mut self, overrides: &UploadOverrides) {
        let upload = &mut self.upload;

        if let Some(endpoint) = &overrides.endpoint {
            upload.endpoint = Some(endpoint.clone());
        }
        if let Some(token_endpoint) = &overrides.token_endpoint {
            upload.token_endpoint = Some(token_endpoint.clone());
            upload.token = None;
        }
        if let Some(token) = &overrides.token {
            upload.token = Some(token.clone());
        }
        if let Some(chunk_size) = overrides.chunk_size {
            upload.chunk_size = chunk_size;
        }
        if let Some(workers) = overrides.max_concurrent_connections {
            upload.max_concurrent_connections = workers;
        }
        if let Some(retries) = overrides.max_retries_per_connection {
            upload.max_retries_per_connection = retries;
        }
    }
}
