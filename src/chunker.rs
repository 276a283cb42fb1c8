//! Splits a blob into ordered, fixed-size chunks

use crate::blob::Blob;
use crate::config::ValidationError;
use crate::error::UploadError;
use std::iter::FusedIterator;

/// One contiguous piece of a blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk<B> {
    /// Zero-based position in the blob
    pub index: u64,
    pub payload: B,
    /// Between 1 and the chunk size; only the last chunk may be shorter
    pub byte_length: u64,
}

/// Produces the chunks of a blob.
///
/// [`chunk_at`](Chunker::chunk_at) is a pure function of the index; iterating
/// walks the same chunks in order through an internal cursor.
///
/// ```
/// use bytes::Bytes;
/// use chunkup::chunker::Chunker;
///
/// let chunker = Chunker::new(Bytes::from_static(b"abcdefg"), 2).unwrap();
/// let pieces: Vec<_> = chunker.map(|chunk| chunk.payload).collect();
/// assert_eq!(pieces, ["ab", "cd", "ef", "g"]);
/// ```
#[derive(Debug, Clone)]
pub struct Chunker<B> {
    blob: B,
    chunk_size: u64,
    cursor: u64,
}

impl<B: Blob> Chunker<B> {
    pub fn new(blob: B, chunk_size: u64) -> Result<Self, UploadError> {
        if chunk_size == 0 {
            return Err(ValidationError::ZeroChunkSize.into());
        }

        Ok(Self {
            blob,
            chunk_size,
            cursor: 0,
        })
    }

    /// `ceil(blob size / chunk size)`
    pub fn chunk_count(&self) -> u64 {
        self.blob.size().div_ceil(self.chunk_size)
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    pub fn blob_size(&self) -> u64 {
        self.blob.size()
    }

    /// The chunk at `index`, or `None` past the end. Does not move the cursor.
    pub fn chunk_at(&self, index: u64) -> Option<Chunk<B>> {
        if index >= self.chunk_count() {
            return None;
        }

        let start = index * self.chunk_size;
        let end = start.saturating_add(self.chunk_size).min(self.blob.size());

        Some(Chunk {
            index,
            payload: self.blob.slice(start, end),
            byte_length: end - start,
        })
    }
}

impl<B: Blob> Iterator for Chunker<B> {
    type Item = Chunk<B>;

    fn next(&mut self) -> Option<Chunk<B>> {
        let chunk = self.chunk_at(self.cursor)?;
        self.cursor += 1;
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.chunk_count().saturating_sub(self.cursor);
        let remaining = usize::try_from(remaining).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl<B: Blob> FusedIterator for Chunker<B> {}
