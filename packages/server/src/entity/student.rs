use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Student record owned by the student subsystem.
///
/// Only the columns the avatar subsystem touches are mapped here.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "student")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,
    pub age: i32,

    #[sea_orm(has_one)]
    pub avatar: HasOne<super::avatar::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
