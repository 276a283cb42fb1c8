use crate::config::ValidationError;
use crate::transfer::TransferError;
use thiserror::Error;

/// Errors surfaced to callers of the upload API
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    /// Bad endpoint, token, or limits; raised at construction and never retried
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ValidationError),

    /// Misuse of the API, e.g. starting an upload while one is running
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A chunk exhausted its attempts
    #[error("There was an issue uploading chunk {chunk}. Error: {source}")]
    TransferFailure {
        chunk: u64,
        #[source]
        source: TransferError,
    },

    /// The blob could not produce a chunk's bytes, e.g. a file shrank mid-upload
    #[error("could not read chunk {chunk}: {message}")]
    Unreadable { chunk: u64, message: String },

    #[error("could not obtain an upload token: {0}")]
    TokenUnavailable(String),

    /// The coordinating task ended without reporting a result
    #[error("upload interrupted: {0}")]
    Interrupted(String),
}

impl UploadError {
    /// Index of the chunk that failed, if the failure belongs to one chunk
    pub fn failed_chunk(&self) -> Option<u64> {
        match self {
            UploadError::TransferFailure { chunk, .. } | UploadError::Unreadable { chunk, .. } => {
                Some(*chunk)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_failure_message_names_chunk() {
        let err = UploadError::TransferFailure {
            chunk: 4,
            source: TransferError::Rejected { status: 500 },
        };
        assert_eq!(
            err.to_string(),
            "There was an issue uploading chunk 4. Error: The request was not accepted."
        );
        assert_eq!(err.failed_chunk(), Some(4));
    }

    #[test]
    fn test_unreadable_names_chunk() {
        let err = UploadError::Unreadable {
            chunk: 2,
            message: "early eof".to_string(),
        };
        assert_eq!(err.to_string(), "could not read chunk 2: early eof");
        assert_eq!(err.failed_chunk(), Some(2));
    }

    #[test]
    fn test_configuration_error_converts() {
        let err: UploadError = ValidationError::ZeroChunkSize.into();
        assert!(matches!(err, UploadError::InvalidConfiguration(_)));
        assert_eq!(err.failed_chunk(), None);
    }
}
