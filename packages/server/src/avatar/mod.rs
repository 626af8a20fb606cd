//! Avatar storage: one uploaded image per student, kept both on disk and as a
//! cached copy in the avatar record.

mod error;
mod lock;
mod query;
mod repository;
mod service;

use chrono::{DateTime, Utc};
use common::storage::BoxReader;
use sea_orm::FromQueryResult;

use crate::entity::avatar;

pub use error::AvatarError;
pub use lock::{KeyedGuard, KeyedLock};
pub use repository::{AvatarRepository, SeaOrmAvatarRepository, SeaOrmStudentLookup, StudentLookup};
pub use service::AvatarService;

/// The stored avatar of a single student, including the cached bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarRecord {
    pub id: i32,
    pub student_id: i32,
    pub file_path: String,
    pub file_size: i64,
    pub media_type: String,
    pub cached_blob: Vec<u8>,
    pub updated_at: DateTime<Utc>,
}

impl From<avatar::Model> for AvatarRecord {
    fn from(model: avatar::Model) -> Self {
        Self {
            id: model.id,
            student_id: model.student_id,
            file_path: model.file_path,
            file_size: model.file_size,
            media_type: model.media_type,
            cached_blob: model.cached_blob,
            updated_at: model.updated_at,
        }
    }
}

/// Avatar metadata without the cached bytes, as returned by listings.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct AvatarSummary {
    pub id: i32,
    pub student_id: i32,
    pub file_path: String,
    pub file_size: i64,
    pub media_type: String,
    pub updated_at: DateTime<Utc>,
}

impl From<&AvatarRecord> for AvatarSummary {
    fn from(record: &AvatarRecord) -> Self {
        Self {
            id: record.id,
            student_id: record.student_id,
            file_path: record.file_path.clone(),
            file_size: record.file_size,
            media_type: record.media_type.clone(),
            updated_at: record.updated_at,
        }
    }
}

/// Field values for an insert-or-replace of a student's avatar record.
#[derive(Debug, Clone)]
pub struct NewAvatar {
    pub student_id: i32,
    pub file_path: String,
    pub file_size: i64,
    pub media_type: String,
    pub cached_blob: Vec<u8>,
}

/// Client-supplied metadata accompanying an upload stream.
#[derive(Debug, Clone, Default)]
pub struct AvatarUpload {
    pub student_id: i32,
    /// Original file name, used only to derive the extension.
    pub file_name: Option<String>,
    pub media_type: Option<String>,
    /// Size announced up front, if the transport provides one.
    pub declared_size: Option<u64>,
}

/// Cached copy of an avatar.
#[derive(Debug, Clone)]
pub struct AvatarPreview {
    pub media_type: String,
    pub bytes: Vec<u8>,
}

/// Open handle on the full-resolution file.
pub struct AvatarDownload {
    pub media_type: String,
    /// Recorded file size in bytes.
    pub length: u64,
    pub reader: BoxReader,
}

#[derive(Debug, Clone)]
pub struct AvatarPage {
    pub items: Vec<AvatarSummary>,
    /// Zero-based page index.
    pub page: u64,
    pub size: u64,
    pub total: u64,
}
