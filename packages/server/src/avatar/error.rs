use common::storage::StorageError;
use sea_orm::DbErr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AvatarError {
    /// The student or their avatar does not exist.
    #[error("{0}")]
    NotFound(String),

    #[error("Avatar exceeds maximum size of {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    /// The client stream broke off before the upload completed.
    #[error("Upload aborted: {0}")]
    UploadAborted(String),

    #[error("Concurrent write detected: {0}")]
    WriteConflict(String),

    /// Disk failure, or a record whose file is missing or disagrees with it.
    #[error("Avatar storage failure: {0}")]
    Io(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<StorageError> for AvatarError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::SizeLimitExceeded { limit, .. } => AvatarError::PayloadTooLarge { limit },
            StorageError::Source(e) => AvatarError::UploadAborted(e.to_string()),
            StorageError::WriteConflict(path) => AvatarError::WriteConflict(path),
            StorageError::NotFound(path) => AvatarError::Io(format!("file not found: {path}")),
            StorageError::Io(e) => AvatarError::Io(e.to_string()),
        }
    }
}

impl AvatarError {
    /// Whether this error is the server's fault rather than the client's.
    pub fn is_server_fault(&self) -> bool {
        matches!(
            self,
            AvatarError::WriteConflict(_) | AvatarError::Io(_) | AvatarError::Database(_)
        )
    }
}
