use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::entity::{metadata, sample};
use crate::ingest::{SampleEdit, UploadedSample};
use crate::models::source::SourceResponse;
use crate::models::tag::TagResponse;

pub use super::shared::{Pagination, double_option, escape_like, validate_bulk_ids};

/// Listing entry for a sample.
#[derive(Serialize, ToSchema)]
pub struct SampleSummary {
    #[schema(example = 17)]
    pub id: i32,
    #[schema(example = "kick_drum.mp4")]
    pub filename: String,
    pub upload_date: DateTime<Utc>,
    #[schema(example = "kick_drum_3f2a9c0d1e4b5a6c7d8e.png")]
    pub thumbnail: String,
    pub uploader_id: i32,
    pub source_id: Option<i32>,
    pub is_public: bool,
    pub likes: i64,
    /// Tag names, alphabetical.
    pub tags: Vec<String>,
}

impl SampleSummary {
    pub fn new(sample: sample::Model, likes: i64, tags: Vec<String>) -> Self {
        Self {
            id: sample.id,
            filename: sample.filename,
            upload_date: sample.upload_date,
            thumbnail: sample.thumbnail_filename,
            uploader_id: sample.uploader_id,
            source_id: sample.source_id,
            is_public: sample.is_public,
            likes,
            tags,
        }
    }
}

/// Technical properties of a sample's video.
#[derive(Serialize, ToSchema)]
pub struct MetadataResponse {
    pub sample_id: i32,
    /// Size in bytes.
    pub filesize: i64,
    pub width: i32,
    pub height: i32,
    #[schema(example = "16:9")]
    pub aspect_ratio: String,
    #[schema(example = 29.97)]
    pub framerate: f64,
    #[schema(example = "h264")]
    pub codec: String,
}

impl From<metadata::Model> for MetadataResponse {
    fn from(m: metadata::Model) -> Self {
        Self {
            sample_id: m.sample_id,
            filesize: m.filesize,
            width: m.width,
            height: m.height,
            aspect_ratio: m.aspect_ratio,
            framerate: m.framerate,
            codec: m.codec,
        }
    }
}

/// Full sample page.
#[derive(Serialize, ToSchema)]
pub struct SampleDetail {
    pub id: i32,
    pub filename: String,
    pub stored_as: String,
    pub upload_date: DateTime<Utc>,
    pub thumbnail: String,
    pub uploader_id: i32,
    pub uploader: String,
    pub source: Option<SourceResponse>,
    pub is_public: bool,
    pub likes: i64,
    /// Whether the requesting user likes this sample.
    pub liked: bool,
    pub tags: Vec<TagResponse>,
    pub metadata: Option<MetadataResponse>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SampleListQuery {
    /// One of `latest`, `oldest`, `liked`, `none`. Default: `liked`.
    pub sort: Option<String>,
    /// 1-based page number. Default: 1.
    pub page: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct SampleListResponse {
    pub data: Vec<SampleSummary>,
    pub pagination: Pagination,
}

#[derive(Serialize, ToSchema)]
pub struct PageCountResponse {
    pub pages: u64,
    pub total: u64,
    pub per_page: u64,
}

#[derive(Serialize, ToSchema)]
pub struct SampleCollection {
    pub data: Vec<SampleSummary>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Case-insensitive substring.
    pub q: Option<String>,
}

/// One stored file of an upload.
#[derive(Serialize, ToSchema)]
pub struct UploadedItem {
    pub id: i32,
    pub filename: String,
    pub stored_as: String,
    pub thumbnail: String,
    pub is_public: bool,
    /// The next edit of this sample re-encodes it regardless of the request.
    pub force_reencode: bool,
}

impl From<UploadedSample> for UploadedItem {
    fn from(u: UploadedSample) -> Self {
        Self {
            id: u.sample.id,
            filename: u.sample.filename,
            stored_as: u.sample.stored_as,
            thumbnail: u.sample.thumbnail_filename,
            is_public: u.sample.is_public,
            force_reencode: u.force_reencode,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct UploadResponse {
    pub samples: Vec<UploadedItem>,
}

/// Edit of a sample. Absent fields are left unchanged.
#[derive(Deserialize, ToSchema, Default)]
pub struct UpdateSampleRequest {
    #[schema(example = "kick drum")]
    pub filename: Option<String>,
    /// `null` detaches the source.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i32>)]
    pub source_id: Option<Option<i32>>,
    /// Whitespace-separated tag names; replaces the current tags.
    #[schema(example = "drums one_shot")]
    pub tags: Option<String>,
    /// Only honoured for an upload that has not been edited yet.
    #[serde(default)]
    pub reencode: bool,
}

impl From<UpdateSampleRequest> for SampleEdit {
    fn from(req: UpdateSampleRequest) -> Self {
        Self {
            filename: req.filename,
            source_id: req.source_id,
            tags: req.tags,
            reencode: req.reencode,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct BatchEditRequest {
    pub ids: Vec<i32>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i32>)]
    pub source_id: Option<Option<i32>>,
    #[serde(default)]
    pub reencode: bool,
}

#[derive(Serialize, ToSchema)]
pub struct DeleteResponse {
    #[schema(example = "Sample deleted successfully.")]
    pub message: String,
    pub warnings: Vec<String>,
}

#[derive(Serialize, ToSchema)]
pub struct LikeResponse {
    pub likes: i64,
    pub liked: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct VisibilityRequest {
    pub is_public: bool,
}
