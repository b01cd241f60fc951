use media::VideoMetadata;
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Technical properties of a sample's video file. One row per sample.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "metadata")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub sample_id: i32,
    #[sea_orm(belongs_to, from = "sample_id", to = "id")]
    pub sample: HasOne<super::sample::Entity>,

    pub filesize: i64,
    pub width: i32,
    pub height: i32,
    pub aspect_ratio: String,
    #[sea_orm(column_type = "Double")]
    pub framerate: f64,
    pub codec: String,
}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub fn from_video(sample_id: i32, meta: VideoMetadata) -> Self {
        Self {
            sample_id: Set(sample_id),
            filesize: Set(meta.filesize),
            width: Set(meta.width),
            height: Set(meta.height),
            aspect_ratio: Set(meta.aspect_ratio),
            framerate: Set(meta.framerate),
            codec: Set(meta.codec),
            ..Default::default()
        }
    }
}
