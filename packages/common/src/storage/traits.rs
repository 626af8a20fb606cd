use std::path::Path;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Path-addressed file storage for uploaded blobs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stream `reader` into `path`, replacing any existing file.
    ///
    /// An existing file is removed first and the new one is created
    /// exclusively, so a concurrent writer recreating the path in between
    /// yields [`StorageError::WriteConflict`]. Fails with
    /// [`StorageError::SizeLimitExceeded`] once more than `limit` bytes have
    /// been read. A partially written file is left in place.
    async fn write(
        &self,
        path: &Path,
        reader: &mut (dyn AsyncRead + Unpin + Send),
        limit: u64,
    ) -> Result<u64, StorageError>;

    /// Like [`BlobStore::write`], but the bytes only appear at `path` once the
    /// whole stream has been received. On failure `path` is left untouched.
    async fn put_stream(
        &self,
        path: &Path,
        reader: &mut (dyn AsyncRead + Unpin + Send),
        limit: u64,
    ) -> Result<u64, StorageError>;

    /// Retrieve all bytes stored at `path`.
    async fn get(&self, path: &Path) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.get_stream(path).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Open the file at `path` as a streaming async reader.
    async fn get_stream(&self, path: &Path) -> Result<BoxReader, StorageError>;

    /// Check whether a file exists at `path`.
    async fn exists(&self, path: &Path) -> Result<bool, StorageError>;

    /// Delete the file at `path`.
    ///
    /// Returns `true` if the file was deleted, `false` if it did not exist.
    async fn delete(&self, path: &Path) -> Result<bool, StorageError>;

    /// Get the size of the file at `path` in bytes.
    async fn size(&self, path: &Path) -> Result<u64, StorageError>;
}
