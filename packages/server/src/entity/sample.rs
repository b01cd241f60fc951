use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sample")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Display name, editable by the uploader.
    pub filename: String,
    /// Name of the video file under the samples directory.
    #[sea_orm(unique)]
    pub stored_as: String,
    pub upload_date: DateTimeUtc,
    pub thumbnail_filename: String,

    pub uploader_id: i32,
    #[sea_orm(belongs_to, from = "uploader_id", to = "id")]
    pub uploader: HasOne<super::user::Entity>,

    pub source_id: Option<i32>,
    #[sea_orm(belongs_to, from = "source_id", to = "id")]
    pub source: HasOne<super::source::Entity>,

    pub is_public: bool,

    #[sea_orm(has_one)]
    pub metadata: HasOne<super::metadata::Entity>,

    #[sea_orm(has_many, via = "sample_tag")]
    pub tags: HasMany<super::tag::Entity>,

    #[sea_orm(has_many)]
    pub likes: HasMany<super::sample_like::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
