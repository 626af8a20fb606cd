use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::avatar::{AvatarPage, AvatarSummary};

pub use super::shared::Pagination;

/// Response DTO for a single avatar's metadata.
#[derive(Serialize, utoipa::ToSchema)]
pub struct AvatarResponse {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = 42)]
    pub student_id: i32,
    /// Location of the full-resolution file on the server.
    #[schema(example = "/srv/school/avatars/avatar_42.png")]
    pub file_path: String,
    /// File size in bytes.
    #[schema(example = 142857)]
    pub file_size: i64,
    /// MIME type declared at upload.
    #[schema(example = "image/png")]
    pub media_type: String,
    pub updated_at: DateTime<Utc>,
}

impl From<AvatarSummary> for AvatarResponse {
    fn from(summary: AvatarSummary) -> Self {
        Self {
            id: summary.id,
            student_id: summary.student_id,
            file_path: summary.file_path,
            file_size: summary.file_size,
            media_type: summary.media_type,
            updated_at: summary.updated_at,
        }
    }
}

/// Response DTO for listing avatars.
#[derive(Serialize, utoipa::ToSchema)]
pub struct AvatarListResponse {
    pub data: Vec<AvatarResponse>,
    pub pagination: Pagination,
}

impl From<AvatarPage> for AvatarListResponse {
    fn from(page: AvatarPage) -> Self {
        Self {
            pagination: Pagination::new(page.page, page.size, page.total),
            data: page.items.into_iter().map(AvatarResponse::from).collect(),
        }
    }
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AvatarListQuery {
    /// Zero-based page number. Default: 0.
    pub page: Option<i64>,
    /// Page size, 1-100. Default: 10.
    pub size: Option<i64>,
}

impl AvatarListQuery {
    /// Clamp to `(page >= 0, 1 <= size <= 100)`.
    pub fn normalized(&self) -> (u64, u64) {
        let page = self.page.unwrap_or(0).max(0) as u64;
        let size = self.size.unwrap_or(10).clamp(1, 100) as u64;
        (page, size)
    }
}
