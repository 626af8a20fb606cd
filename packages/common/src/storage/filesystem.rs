use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

use super::error::StorageError;
use super::traits::{BlobStore, BoxReader};

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Filesystem-backed blob store rooted at a single directory.
///
/// Staged uploads go through `{base_path}/.tmp/{uuid}` so they share a
/// filesystem with their final location.
pub struct FilesystemBlobStore {
    base_path: PathBuf,
}

impl FilesystemBlobStore {
    /// Create a new filesystem blob store.
    pub async fn new(base_path: PathBuf) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Path for a temporary file during staged writes.
    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }

    /// Move a fully written staged file onto `target`.
    async fn promote(&self, staged: &Path, target: &Path) -> Result<(), StorageError> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        remove_if_exists(target).await?;
        link_exclusive(staged, target).await
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn write(
        &self,
        path: &Path,
        reader: &mut (dyn AsyncRead + Unpin + Send),
        limit: u64,
    ) -> Result<u64, StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        remove_if_exists(path).await?;

        let mut file = create_exclusive(path).await?;
        let mut buf = vec![0u8; COPY_BUFFER_SIZE];
        let mut total_bytes: u64 = 0;

        loop {
            let n = reader.read(&mut buf).await.map_err(StorageError::Source)?;
            if n == 0 {
                break;
            }

            total_bytes += n as u64;
            if total_bytes > limit {
                return Err(StorageError::SizeLimitExceeded {
                    actual: total_bytes,
                    limit,
                });
            }

            file.write_all(&buf[..n]).await?;
        }

        file.flush().await?;
        file.sync_all().await?;

        Ok(total_bytes)
    }

    async fn put_stream(
        &self,
        path: &Path,
        reader: &mut (dyn AsyncRead + Unpin + Send),
        limit: u64,
    ) -> Result<u64, StorageError> {
        // Dropped on every exit, including cancellation of this future.
        let staged = StagedFile(self.temp_path());

        let written = self.write(&staged.0, reader, limit).await?;
        self.promote(&staged.0, path).await?;
        Ok(written)
    }

    async fn get_stream(&self, path: &Path) -> Result<BoxReader, StorageError> {
        match fs::File::open(path).await {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, path: &Path) -> Result<bool, StorageError> {
        Ok(fs::try_exists(path).await?)
    }

    async fn delete(&self, path: &Path) -> Result<bool, StorageError> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn size(&self, path: &Path) -> Result<u64, StorageError> {
        match fs::metadata(path).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Staging file removed when dropped. After a promotion the target keeps its
/// own link to the data.
struct StagedFile(PathBuf);

impl Drop for StagedFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.0)
            && e.kind() != ErrorKind::NotFound
        {
            warn!(path = %self.0.display(), error = %e, "Failed to remove staged file");
        }
    }
}

async fn remove_if_exists(path: &Path) -> Result<(), StorageError> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Create `path`, failing if anything already exists there.
async fn create_exclusive(path: &Path) -> Result<fs::File, StorageError> {
    match fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
    {
        Ok(file) => Ok(file),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            Err(StorageError::WriteConflict(path.display().to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Make `staged` visible at `target`, failing if `target` already exists.
async fn link_exclusive(staged: &Path, target: &Path) -> Result<(), StorageError> {
    match fs::hard_link(staged, target).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            Err(StorageError::WriteConflict(target.display().to_string()))
        }
        // Filesystems without hard links.
        Err(e) if matches!(e.kind(), ErrorKind::Unsupported | ErrorKind::CrossesDevices) => {
            debug!(error = %e, "hard_link unavailable, renaming staged file");
            Ok(fs::rename(staged, target).await?)
        }
        Err(e) => Err(e.into()),
    }
}
