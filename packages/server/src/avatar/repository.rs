use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use super::{AvatarRecord, AvatarSummary, NewAvatar};
use crate::entity::{avatar, student};

/// Persistence for avatar records. At most one record exists per student.
#[async_trait]
pub trait AvatarRepository: Send + Sync {
    async fn find_by_student_id(&self, student_id: i32) -> Result<Option<AvatarRecord>, DbErr>;

    /// Insert the record, or replace every field of the student's existing one.
    /// The record id is preserved on replace.
    async fn upsert(&self, avatar: NewAvatar) -> Result<AvatarRecord, DbErr>;

    /// A window of records in insertion order.
    async fn list_page(&self, offset: u64, limit: u64) -> Result<Vec<AvatarSummary>, DbErr>;

    async fn count(&self) -> Result<u64, DbErr>;
}

/// Read access to the student subsystem.
#[async_trait]
pub trait StudentLookup: Send + Sync {
    async fn exists_by_id(&self, student_id: i32) -> Result<bool, DbErr>;
}

pub struct SeaOrmAvatarRepository {
    db: DatabaseConnection,
}

impl SeaOrmAvatarRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AvatarRepository for SeaOrmAvatarRepository {
    async fn find_by_student_id(&self, student_id: i32) -> Result<Option<AvatarRecord>, DbErr> {
        let model = avatar::Entity::find()
            .filter(avatar::Column::StudentId.eq(student_id))
            .one(&self.db)
            .await?;
        Ok(model.map(AvatarRecord::from))
    }

    async fn upsert(&self, new_avatar: NewAvatar) -> Result<AvatarRecord, DbErr> {
        let student_id = new_avatar.student_id;
        let model = avatar::ActiveModel {
            student_id: Set(student_id),
            file_path: Set(new_avatar.file_path),
            file_size: Set(new_avatar.file_size),
            media_type: Set(new_avatar.media_type),
            cached_blob: Set(new_avatar.cached_blob),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };

        avatar::Entity::insert(model)
            .on_conflict(
                OnConflict::column(avatar::Column::StudentId)
                    .update_columns([
                        avatar::Column::FilePath,
                        avatar::Column::FileSize,
                        avatar::Column::MediaType,
                        avatar::Column::CachedBlob,
                        avatar::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        self.find_by_student_id(student_id)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound("avatar missing after upsert".into()))
    }

    async fn list_page(&self, offset: u64, limit: u64) -> Result<Vec<AvatarSummary>, DbErr> {
        avatar::Entity::find()
            .select_only()
            .column(avatar::Column::Id)
            .column(avatar::Column::StudentId)
            .column(avatar::Column::FilePath)
            .column(avatar::Column::FileSize)
            .column(avatar::Column::MediaType)
            .column(avatar::Column::UpdatedAt)
            .order_by_asc(avatar::Column::Id)
            .offset(Some(offset))
            .limit(Some(limit))
            .into_model::<AvatarSummary>()
            .all(&self.db)
            .await
    }

    async fn count(&self) -> Result<u64, DbErr> {
        avatar::Entity::find().count(&self.db).await
    }
}

pub struct SeaOrmStudentLookup {
    db: DatabaseConnection,
}

impl SeaOrmStudentLookup {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl StudentLookup for SeaOrmStudentLookup {
    async fn exists_by_id(&self, student_id: i32) -> Result<bool, DbErr> {
        let found = student::Entity::find_by_id(student_id)
            .one(&self.db)
            .await?;
        Ok(found.is_some())
    }
}
