//! Chunked, concurrent blob uploads over HTTP.
//!
//! A blob is cut into fixed-size chunks by [`chunker::Chunker`]; an
//! [`UploadManager`] hands the chunks to a bounded pool of workers, each of
//! which POSTs its chunk through a [`transfer::Transport`] and retries it a
//! bounded number of times.
//!
//! ```no_run
//! use bytes::Bytes;
//! use chunkup::{UploadConfig, UploadManager};
//!
//! # async fn run() -> Result<(), chunkup::UploadError> {
//! let config = UploadConfig::builder()
//!     .endpoint("https://uploads.example.com/chunks")
//!     .token("t-123")
//!     .build()?;
//! let manager = UploadManager::new(config)?;
//!
//! let report = manager.upload(Bytes::from(vec![0u8; 4_000_000])).await?.wait().await?;
//! println!("{} chunks sent", report.chunks);
//! # Ok(())
//! # }
//! ```

pub mod blob;
pub mod chunker;
pub mod config;
pub mod error;
pub mod humanize;
pub mod manager;
pub mod observability;
pub mod token;
pub mod transfer;
pub mod worker;

pub use blob::{Blob, FileBlob};
pub use config::UploadConfig;
pub use error::UploadError;
pub use manager::{UploadHandle, UploadManager, UploadReport};
