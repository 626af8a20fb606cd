use std::path::Path;

use tracing::{error, instrument};

use super::service::AvatarService;
use super::{AvatarDownload, AvatarError, AvatarPage, AvatarPreview, AvatarRecord};

impl AvatarService {
    pub async fn find_avatar(&self, student_id: i32) -> Result<Option<AvatarRecord>, AvatarError> {
        Ok(self.avatars.find_by_student_id(student_id).await?)
    }

    /// The cached copy of a student's avatar. Never touches the disk.
    pub async fn get_preview(&self, student_id: i32) -> Result<AvatarPreview, AvatarError> {
        let record = self.require_avatar(student_id).await?;
        Ok(AvatarPreview {
            media_type: record.media_type,
            bytes: record.cached_blob,
        })
    }

    /// Open the full-resolution file of a student's avatar.
    ///
    /// A record whose file is gone or has a different size than recorded is
    /// reported as [`AvatarError::Io`]; the cached copy is not used as a
    /// fallback.
    #[instrument(skip(self))]
    pub async fn get_full_download(&self, student_id: i32) -> Result<AvatarDownload, AvatarError> {
        let record = self.require_avatar(student_id).await?;
        let path = Path::new(&record.file_path);
        let expected = u64::try_from(record.file_size).unwrap_or_default();

        let drift = |detail: String| {
            error!(
                student_id,
                path = %record.file_path,
                size = record.file_size,
                detail = %detail,
                "Avatar record and file disagree"
            );
            AvatarError::Io(detail)
        };

        let actual = self
            .blobs
            .size(path)
            .await
            .map_err(|e| drift(e.to_string()))?;
        if actual != expected {
            return Err(drift(format!(
                "{} is {actual} bytes, record says {expected}",
                record.file_path
            )));
        }

        let reader = self
            .blobs
            .get_stream(path)
            .await
            .map_err(|e| drift(e.to_string()))?;

        Ok(AvatarDownload {
            media_type: record.media_type,
            length: expected,
            reader,
        })
    }

    /// One page of avatar metadata; `page` is zero-based.
    pub async fn list_avatars(&self, page: u64, size: u64) -> Result<AvatarPage, AvatarError> {
        let total = self.avatars.count().await?;
        let items = self
            .avatars
            .list_page(page.saturating_mul(size), size)
            .await?;

        Ok(AvatarPage {
            items,
            page,
            size,
            total,
        })
    }

    async fn require_avatar(&self, student_id: i32) -> Result<AvatarRecord, AvatarError> {
        self.avatars
            .find_by_student_id(student_id)
            .await?
            .ok_or_else(|| AvatarError::NotFound(format!("Student {student_id} has no avatar")))
    }
}
