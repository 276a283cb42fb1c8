use chunkup::config::UploadOverrides;
use chunkup::humanize::ByteSize;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "chunkup")]
#[command(about = "Upload large files to an HTTP endpoint in concurrent chunks", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload a file
    Upload(UploadArgs),
    /// Show how a file would be split, without sending anything
    Plan(PlanArgs),
    /// Print the effective configuration (secrets redacted)
    Config(ConfigArgs),
}

#[derive(clap::Args, Debug)]
pub struct UploadArgs {
    /// File to upload
    pub file: PathBuf,

    /// Configuration file (defaults to $CHUNKUP_CONFIG or config/chunkup.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// URL every chunk is POSTed to
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Upload token
    #[arg(long, conflicts_with = "token_endpoint")]
    pub token: Option<String>,

    /// URL to fetch an upload token from
    #[arg(long)]
    pub token_endpoint: Option<String>,

    /// Chunk size, e.g. 1048576, 1MB or 4MiB
    #[arg(long)]
    pub chunk_size: Option<ByteSize>,

    /// Concurrent chunk uploads
    #[arg(long)]
    pub workers: Option<usize>,

    /// Attempts per chunk before the upload fails
    #[arg(long)]
    pub retries: Option<u32>,
}

impl UploadArgs {
    /// Flags that replace configured values
    pub fn overrides(&self) -> UploadOverrides {
        UploadOverrides {
            endpoint: self.endpoint.clone(),
            token: self.token.clone(),
            token_endpoint: self.token_endpoint.clone(),
            chunk_size: self.chunk_size,
            max_concurrent_connections: self.workers,
            max_retries_per_connection: self.retries,
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct PlanArgs {
    /// File to inspect
    pub file: PathBuf,

    /// Configuration file (defaults to $CHUNKUP_CONFIG or config/chunkup.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Chunk size, e.g. 1048576, 1MB or 4MiB (defaults to the configured size)
    #[arg(long)]
    pub chunk_size: Option<ByteSize>,
}

impl PlanArgs {
    pub fn overrides(&self) -> UploadOverrides {
        UploadOverrides {
            chunk_size: self.chunk_size,
            ..Default::default()
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct ConfigArgs {
    /// Configuration file (defaults to $CHUNKUP_CONFIG or config/chunkup.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,
}
