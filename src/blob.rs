//! Sliceable byte sources

use async_trait::async_trait;
use bytes::Bytes;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// A read-only binary payload with a known length that can be cut into
/// sub-ranges of the same type.
#[async_trait]
pub trait Blob: Sized + Send + Sync + 'static {
    /// Length in bytes
    fn size(&self) -> u64;

    /// Bytes in `start..end`, clamped to the blob's length
    fn slice(&self, start: u64, end: u64) -> Self;

    /// Body sent over the wire for this blob. In-memory blobs never fail.
    async fn into_payload(self) -> io::Result<Bytes>;
}

fn clamp(start: u64, end: u64, len: u64) -> (u64, u64) {
    let end = end.min(len);
    let start = start.min(end);
    (start, end)
}

/// Zero-copy: slices share the parent's buffer
#[async_trait]
impl Blob for Bytes {
    fn size(&self) -> u64 {
        self.len() as u64
    }

    fn slice(&self, start: u64, end: u64) -> Self {
        let (start, end) = clamp(start, end, self.size());
        Bytes::slice(self, start as usize..end as usize)
    }

    async fn into_payload(self) -> io::Result<Bytes> {
        Ok(self)
    }
}

#[async_trait]
impl Blob for Vec<u8> {
    fn size(&self) -> u64 {
        self.len() as u64
    }

    fn slice(&self, start: u64, end: u64) -> Self {
        let (start, end) = clamp(start, end, self.size());
        self[start as usize..end as usize].to_vec()
    }

    async fn into_payload(self) -> io::Result<Bytes> {
        Ok(Bytes::from(self))
    }
}

#[async_trait]
impl Blob for &'static [u8] {
    fn size(&self) -> u64 {
        self.len() as u64
    }

    fn slice(&self, start: u64, end: u64) -> Self {
        let (start, end) = clamp(start, end, self.size());
        let data: &'static [u8] = *self;
        &data[start as usize..end as usize]
    }

    async fn into_payload(self) -> io::Result<Bytes> {
        Ok(Bytes::from_static(self))
    }
}

/// A byte range of a file on disk.
///
/// Slicing only narrows the range; bytes are read when the payload is
/// requested, so at most one chunk per worker is held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBlob {
    path: Arc<PathBuf>,
    offset: u64,
    len: u64,
}

impl FileBlob {
    /// The whole file at `path`. Its length is fixed at this point.
    pub async fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let metadata = tokio::fs::metadata(&path).await?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }

        Ok(Self {
            path: Arc::new(path),
            offset: 0,
            len: metadata.len(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Position of this range within the file
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

#[async_trait]
impl Blob for FileBlob {
    fn size(&self) -> u64 {
        self.len
    }

    fn slice(&self, start: u64, end: u64) -> Self {
        let (start, end) = clamp(start, end, self.len);
        Self {
            path: self.path.clone(),
            offset: self.offset + start,
            len: end - start,
        }
    }

    async fn into_payload(self) -> io::Result<Bytes> {
        let mut file = tokio::fs::File::open(self.path.as_path()).await?;
        file.seek(SeekFrom::Start(self.offset)).await?;

        let mut buffer = vec![0u8; self.len as usize];
        file.read_exact(&mut buffer).await?;
        Ok(Bytes::from(buffer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_bytes_slice_is_clamped() {
        let blob = Bytes::from_static(b"abcdefg");
        assert_eq!(Blob::slice(&blob, 2, 4), Bytes::from_static(b"cd"));
        assert_eq!(Blob::slice(&blob, 6, 100), Bytes::from_static(b"g"));
        assert!(Blob::slice(&blob, 10, 12).is_empty());
    }

    #[tokio::test]
    async fn test_vec_and_static_agree() {
        let data: &'static [u8] = b"0123456789";
        let vec = data.to_vec();

        assert_eq!(Blob::slice(&data, 3, 7), b"3456");
        assert_eq!(Blob::slice(&vec, 3, 7), b"3456".to_vec());
        assert_eq!(vec.into_payload().await.unwrap(), Bytes::from_static(data));
    }

    #[tokio::test]
    async fn test_file_blob_reads_only_its_range() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.bin");
        fs::write(&path, b"0123456789abcdef").unwrap();

        let blob = FileBlob::open(&path).await.unwrap();
        assert_eq!(blob.size(), 16);

        let middle = blob.slice(4, 10);
        assert_eq!(middle.offset(), 4);
        assert_eq!(middle.size(), 6);
        assert_eq!(middle.into_payload().await.unwrap(), Bytes::from_static(b"456789"));

        // Nested slices stay relative to their parent
        let tail = blob.slice(10, 100).slice(2, 4);
        assert_eq!(tail.offset(), 12);
        assert_eq!(tail.into_payload().await.unwrap(), Bytes::from_static(b"cd"));

        assert!(blob.slice(20, 30).into_payload().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_blob_errors() {
        let temp_dir = TempDir::new().unwrap();

        let missing = FileBlob::open(temp_dir.path().join("missing.bin")).await;
        assert_eq!(missing.unwrap_err().kind(), io::ErrorKind::NotFound);

        let directory = FileBlob::open(temp_dir.path()).await;
        assert_eq!(directory.unwrap_err().kind(), io::ErrorKind::InvalidInput);

        // Truncated after opening: the range no longer exists
        let path = temp_dir.path().join("shrinking.bin");
        fs::write(&path, b"0123456789").unwrap();
        let blob = FileBlob::open(&path).await.unwrap();
        fs::write(&path, b"0123").unwrap();

        let err = blob.slice(5, 10).into_payload().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
