use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use common::StorageAppConfig;
use common::storage::{BlobStore, StorageError, resolve_avatar_path};
use mime_guess::mime::Mime;
use tokio::io::AsyncRead;
use tracing::{debug, error, info, instrument, warn};

use super::lock::KeyedLock;
use super::repository::{AvatarRepository, StudentLookup};
use super::{AvatarError, AvatarRecord, AvatarUpload, NewAvatar};

const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

/// Stores and serves student avatars.
///
/// Every upload writes two sinks: the file under `avatars_dir` and the cached
/// copy in the avatar record. The two writes are not atomic. Uploads for the
/// same student are serialized. When the record upsert fails, a newly created
/// file is removed again; a file overwritten at the recorded path stays and
/// disagrees with the record until the next upload for that student.
pub struct AvatarService {
    pub(super) students: Arc<dyn StudentLookup>,
    pub(super) avatars: Arc<dyn AvatarRepository>,
    pub(super) blobs: Arc<dyn BlobStore>,
    pub(super) config: StorageAppConfig,
    locks: KeyedLock<i32>,
}

impl AvatarService {
    pub fn new(
        students: Arc<dyn StudentLookup>,
        avatars: Arc<dyn AvatarRepository>,
        blobs: Arc<dyn BlobStore>,
        config: StorageAppConfig,
    ) -> Self {
        Self {
            students,
            avatars,
            blobs,
            config,
            locks: KeyedLock::new(),
        }
    }

    /// Store `reader` as the avatar of `upload.student_id`, replacing any
    /// previous one.
    ///
    /// Nothing is written when the declared size is over the limit or the
    /// student does not exist. When the stream breaks off or grows past the
    /// limit, the previous avatar (file and record) is left as it was.
    #[instrument(skip(self, upload, reader), fields(student_id = upload.student_id))]
    pub async fn upload_avatar(
        &self,
        upload: AvatarUpload,
        reader: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<AvatarRecord, AvatarError> {
        let student_id = upload.student_id;
        let limit = self.config.max_avatar_size;

        if let Some(declared) = upload.declared_size
            && declared > limit
        {
            debug!(declared, limit, "Rejected oversized avatar before writing");
            return Err(AvatarError::PayloadTooLarge { limit });
        }

        if !self.students.exists_by_id(student_id).await? {
            return Err(AvatarError::NotFound(format!(
                "Student {student_id} not found"
            )));
        }

        let media_type =
            resolve_media_type(upload.media_type.as_deref(), upload.file_name.as_deref());

        let _guard = self.locks.lock(student_id).await;

        let target = resolve_avatar_path(
            &self.config.avatars_dir,
            student_id,
            upload.file_name.as_deref(),
        );
        let previous = self.avatars.find_by_student_id(student_id).await?;

        let written = self
            .blobs
            .put_stream(&target.path, reader, limit)
            .await
            .map_err(|e| storage_failure(student_id, &target.path, None, limit, e))?;

        let record = match self
            .commit(student_id, &target.path, written, media_type)
            .await
        {
            Ok(record) => record,
            Err(err) => {
                // A file at the recorded path was overwritten in place and stays.
                if previous
                    .as_ref()
                    .is_none_or(|p| Path::new(&p.file_path) != target.path)
                {
                    remove_unreferenced_file(
                        &*self.blobs,
                        student_id,
                        &target.path.to_string_lossy(),
                    )
                    .await;
                }
                return Err(err);
            }
        };

        if let Some(previous) = previous
            && Path::new(&previous.file_path) != target.path
        {
            remove_unreferenced_file(&*self.blobs, student_id, &previous.file_path).await;
        }

        info!(
            student_id,
            path = %record.file_path,
            size = record.file_size,
            media_type = %record.media_type,
            "Avatar stored"
        );

        Ok(record)
    }

    /// Read the written file back and point the student's record at it.
    async fn commit(
        &self,
        student_id: i32,
        path: &Path,
        written: u64,
        media_type: String,
    ) -> Result<AvatarRecord, AvatarError> {
        let limit = self.config.max_avatar_size;
        let cached_blob = self
            .blobs
            .get(path)
            .await
            .map_err(|e| storage_failure(student_id, path, Some(written), limit, e))?;

        if cached_blob.len() as u64 != written {
            error!(
                student_id,
                path = %path.display(),
                size = written,
                read_back = cached_blob.len(),
                "Avatar file changed between write and read-back"
            );
            return Err(AvatarError::Io(format!(
                "{} changed while being stored",
                path.display()
            )));
        }

        let file_path = path.to_string_lossy().into_owned();
        self.avatars
            .upsert(NewAvatar {
                student_id,
                file_path: file_path.clone(),
                file_size: i64::try_from(written).unwrap_or(i64::MAX),
                media_type,
                cached_blob,
            })
            .await
            .map_err(|e| {
                error!(
                    student_id,
                    path = %file_path,
                    size = written,
                    error = %e,
                    "Avatar file written but record upsert failed"
                );
                AvatarError::from(e)
            })
    }
}

/// Prefer the client's media type, then a guess from the file name.
fn resolve_media_type(declared: Option<&str>, file_name: Option<&str>) -> String {
    if let Some(declared) = declared.map(str::trim).filter(|m| !m.is_empty()) {
        if declared.parse::<Mime>().is_ok() {
            return declared.to_string();
        }
        debug!(declared, "Ignoring malformed media type");
    }

    file_name
        .and_then(|name| mime_guess::from_path(name).first())
        .map(|mime| mime.to_string())
        .unwrap_or_else(|| FALLBACK_MEDIA_TYPE.to_string())
}

/// Translate a storage failure, logging the ones that are our fault.
fn storage_failure(
    student_id: i32,
    path: &Path,
    size: Option<u64>,
    limit: u64,
    err: StorageError,
) -> AvatarError {
    let err = match err {
        // The transport's body limit fired before ours did.
        StorageError::Source(e) if e.kind() == ErrorKind::FileTooLarge => {
            AvatarError::PayloadTooLarge { limit }
        }
        other => AvatarError::from(other),
    };

    if err.is_server_fault() {
        error!(
            student_id,
            path = %path.display(),
            size = ?size,
            error = %err,
            "Avatar storage failure"
        );
    } else {
        debug!(student_id, error = %err, "Avatar upload rejected");
    }

    err
}

/// Delete an avatar file no record points at. Failures are only logged.
async fn remove_unreferenced_file(blobs: &dyn BlobStore, student_id: i32, file_path: &str) {
    match blobs.delete(Path::new(file_path)).await {
        Ok(_) => debug!(student_id, path = %file_path, "Removed unreferenced avatar file"),
        Err(e) => warn!(
            student_id,
            path = %file_path,
            error = %e,
            "Failed to remove unreferenced avatar file"
        ),
    }
}
