//! In-memory implementations of the avatar persistence contracts.
//!
//! Used by the test suites; enable the `test-utils` feature to reach them
//! from outside this crate. Records live only as long as the value.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::DbErr;
use tokio::sync::RwLock;

use crate::avatar::{AvatarRecord, AvatarRepository, AvatarSummary, NewAvatar, StudentLookup};

#[derive(Default)]
pub struct InMemoryStudentLookup {
    students: RwLock<HashSet<i32>>,
}

impl InMemoryStudentLookup {
    pub fn with_students(ids: impl IntoIterator<Item = i32>) -> Self {
        Self {
            students: RwLock::new(ids.into_iter().collect()),
        }
    }

    pub async fn insert(&self, student_id: i32) {
        self.students.write().await.insert(student_id);
    }

    pub async fn remove(&self, student_id: i32) {
        self.students.write().await.remove(&student_id);
    }
}

#[async_trait]
impl StudentLookup for InMemoryStudentLookup {
    async fn exists_by_id(&self, student_id: i32) -> Result<bool, DbErr> {
        Ok(self.students.read().await.contains(&student_id))
    }
}

/// Avatar records kept in insertion order.
#[derive(Default)]
pub struct InMemoryAvatarRepository {
    records: RwLock<Vec<AvatarRecord>>,
    fail_upserts: AtomicBool,
}

impl InMemoryAvatarRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent upsert fail with a database error.
    pub fn fail_upserts(&self, fail: bool) {
        self.fail_upserts.store(fail, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl AvatarRepository for InMemoryAvatarRepository {
    async fn find_by_student_id(&self, student_id: i32) -> Result<Option<AvatarRecord>, DbErr> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .find(|r| r.student_id == student_id)
            .cloned())
    }

    async fn upsert(&self, avatar: NewAvatar) -> Result<AvatarRecord, DbErr> {
        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(DbErr::Custom("upsert disabled".into()));
        }

        let mut records = self.records.write().await;
        let now = Utc::now();

        if let Some(existing) = records
            .iter_mut()
            .find(|r| r.student_id == avatar.student_id)
        {
            existing.file_path = avatar.file_path;
            existing.file_size = avatar.file_size;
            existing.media_type = avatar.media_type;
            existing.cached_blob = avatar.cached_blob;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let id = records.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let record = AvatarRecord {
            id,
            student_id: avatar.student_id,
            file_path: avatar.file_path,
            file_size: avatar.file_size,
            media_type: avatar.media_type,
            cached_blob: avatar.cached_blob,
            updated_at: now,
        };
        records.push(record.clone());
        Ok(record)
    }

    async fn list_page(&self, offset: u64, limit: u64) -> Result<Vec<AvatarSummary>, DbErr> {
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(self
            .records
            .read()
            .await
            .iter()
            .skip(offset)
            .take(limit)
            .map(AvatarSummary::from)
            .collect())
    }

    async fn count(&self) -> Result<u64, DbErr> {
        Ok(self.records.read().await.len() as u64)
    }
}
