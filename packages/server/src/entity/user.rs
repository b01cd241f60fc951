use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub email: Option<String>,
    #[sea_orm(unique)]
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,

    pub is_admin: bool,
    /// Uploads by this user are public without review.
    pub is_uploader: bool,
    pub is_verified: bool,

    #[sea_orm(has_many)]
    pub samples: HasMany<super::sample::Entity>,

    pub join_date: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
