mod cli;

use chunkup::chunker::Chunker;
use chunkup::config::{ByteSize, Config, ConfigError};
use chunkup::observability::init_tracing;
use chunkup::token::resolve_upload_token;
use chunkup::transfer::{TransferClient, Transport};
use chunkup::{Blob, FileBlob, UploadConfig, UploadError, UploadManager};
use clap::Parser;
use cli::{Cli, Commands, ConfigArgs, PlanArgs, UploadArgs};
use std::path::PathBuf;
use tracing::info;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Upload(args) => upload(args).await?,
        Commands::Plan(args) => plan(args).await?,
        Commands::Config(args) => show_config(args)?,
    }

    Ok(())
}

fn load_config(path: Option<PathBuf>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => {
            let _ = dotenvy::dotenv();
            Config::load_from_path(path)
        }
        None => Config::load(),
    }
}

/// Apply the upload flags, resolve the token and build the manager settings
async fn upload_settings(
    mut config: Config,
    args: &UploadArgs,
    transport: &dyn Transport,
) -> Result<UploadConfig, BoxError> {
    config.apply_overrides(&args.overrides());
    config.validate()?;

    let token = resolve_upload_token(&config.upload, transport).await?;
    Ok(config.upload_config(token)?)
}

async fn upload(args: UploadArgs) -> Result<(), BoxError> {
    let config = load_config(args.config.clone())?;
    init_tracing(&config.logging.filter);

    let http = TransferClient::new(&config.http_config())?;
    let upload_config = upload_settings(config, &args, &http).await?;

    let blob = FileBlob::open(&args.file).await.map_err(|e| {
        UploadError::InvalidInput(format!("cannot read {}: {}", args.file.display(), e))
    })?;
    info!(file = %args.file.display(), bytes = blob.size(), "File opened");

    let manager = UploadManager::new(upload_config)?;
    let report = manager.upload(blob).await?.wait().await?;

    println!(
        "uploaded {} ({} bytes) in {} chunks, {} retries, {:.2}s [upload {}]",
        args.file.display(),
        report.bytes,
        report.chunks,
        report.retries,
        report.elapsed.as_secs_f64(),
        report.upload_id
    );

    Ok(())
}

/// Configured chunk size, unless `--chunk-size` replaces it
fn plan_chunk_size(mut config: Config, args: &PlanArgs) -> Result<ByteSize, ConfigError> {
    config.apply_overrides(&args.overrides());
    config.validate()?;
    Ok(config.upload.chunk_size)
}

async fn plan(args: PlanArgs) -> Result<(), BoxError> {
    let config = load_config(args.config.clone())?;
    let chunk_size = plan_chunk_size(config, &args)?;

    // Only the length is read
    let blob = FileBlob::open(&args.file).await?;
    let size = blob.size();
    let chunker = Chunker::new(blob, chunk_size.as_u64())?;

    let last = chunker.chunk_count().checked_sub(1).and_then(|i| chunker.chunk_at(i));

    println!("file:        {}", args.file.display());
    println!("size:        {} ({} bytes)", ByteSize(size), size);
    println!("chunk size:  {}", chunk_size);
    println!("chunks:      {}", chunker.chunk_count());
    if let Some(last) = last {
        println!("last chunk:  {} bytes", last.byte_length);
    }

    Ok(())
}

fn show_config(args: ConfigArgs) -> Result<(), BoxError> {
    let config = load_config(args.config)?;
    print!("{}", config.to_redacted_toml()?);
    Ok(())
}
