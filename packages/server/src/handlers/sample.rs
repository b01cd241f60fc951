use std::path::Path as FsPath;

use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use sea_orm::*;
use tokio_util::io::ReaderStream;
use tracing::instrument;

use crate::config::AppConfig;
use crate::entity::{sample, sample_like, source, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::{AuthUser, MaybeAuthUser};
use crate::extractors::json::AppJson;
use crate::ingest::pipeline;
use crate::models::sample::{
    BatchEditRequest, DeleteResponse, LikeResponse, MetadataResponse, PageCountResponse,
    Pagination, SampleCollection, SampleDetail, SampleListQuery, SampleListResponse,
    SampleSummary, SearchQuery, UpdateSampleRequest, UploadResponse, UploadedItem,
    validate_bulk_ids,
};
use crate::models::source::SourceResponse;
use crate::query::{self, HOME_LIST_LEN, SampleSort};
use crate::state::AppState;
use crate::utils::filename::content_disposition_value;

/// Room for every file at the size limit plus multipart framing. Oversized
/// files are caught per field with a precise 413 before this limit hits.
pub fn upload_body_limit(config: &AppConfig) -> DefaultBodyLimit {
    let files = config.upload.max_files as u64 + 1;
    let limit = config.upload.max_bytes().saturating_mul(files) + 1024 * 1024;
    DefaultBodyLimit::max(usize::try_from(limit).unwrap_or(usize::MAX))
}

/// Load a sample the viewer may see. Private samples are reported as missing
/// to anyone but their owner and admins.
pub(crate) async fn find_visible(
    db: &DatabaseConnection,
    viewer: &MaybeAuthUser,
    id: i32,
) -> Result<sample::Model, AppError> {
    let sample = sample::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Sample not found".into()))?;

    if !sample.is_public && !viewer.can_see_private(sample.uploader_id) {
        return Err(AppError::NotFound("Sample not found".into()));
    }
    Ok(sample)
}

async fn stream_file(path: &FsPath, disposition: Option<String>) -> Result<Response, AppError> {
    let file = match tokio::fs::File::open(path).await {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound("File not found".into()));
        }
        Err(e) => return Err(AppError::Internal(format!("Failed to open file: {e}"))),
    };
    let size = file
        .metadata()
        .await
        .map_err(|e| AppError::Internal(format!("Failed to stat file: {e}")))?
        .len();

    let content_type = mime_guess::from_path(path)
        .first()
        .map(|m| m.to_string())
        .unwrap_or_else(|| "application/octet-stream".into());

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, size.to_string());
    if let Some(value) = disposition {
        builder = builder.header(header::CONTENT_DISPOSITION, value);
    }

    builder
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Samples",
    operation_id = "listSamples",
    summary = "List public samples",
    description = "Returns one page of public samples. `sort` is `latest`, `oldest`, `liked` \
        (default) or `none`; ties in `liked` are broken by ascending id. Page 0 is rejected.",
    params(SampleListQuery),
    responses(
        (status = 200, description = "One page of samples", body = SampleListResponse),
        (status = 400, description = "Invalid page (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_samples(
    State(state): State<AppState>,
    Query(query): Query<SampleListQuery>,
) -> Result<Json<SampleListResponse>, AppError> {
    let sort = query
        .sort
        .as_deref()
        .map(SampleSort::parse)
        .unwrap_or_default();
    let page = query.page.unwrap_or(1);
    let per_page = state.config.listing.samples_per_page;

    let samples = query::list_samples(&state.db, sort, page, per_page).await?;
    let total = query::count_public_samples(&state.db).await?;

    Ok(Json(SampleListResponse {
        data: query::summarize(&state.db, samples).await?,
        pagination: Pagination {
            page,
            per_page,
            total,
            total_pages: query::page_count(total, per_page),
        },
    }))
}

#[utoipa::path(
    get,
    path = "/pages",
    tag = "Samples",
    operation_id = "countSamplePages",
    summary = "Number of listing pages",
    responses((status = 200, description = "Page count", body = PageCountResponse)),
)]
#[instrument(skip(state))]
pub async fn page_count(State(state): State<AppState>) -> Result<Json<PageCountResponse>, AppError> {
    let per_page = state.config.listing.samples_per_page;
    let total = query::count_public_samples(&state.db).await?;
    Ok(Json(PageCountResponse {
        pages: query::page_count(total, per_page),
        total,
        per_page,
    }))
}

#[utoipa::path(
    get,
    path = "/recent",
    tag = "Samples",
    operation_id = "recentSamples",
    summary = "Newest public samples",
    responses((status = 200, description = "Up to 8 samples", body = SampleCollection)),
)]
#[instrument(skip(state))]
pub async fn recent(State(state): State<AppState>) -> Result<Json<SampleCollection>, AppError> {
    let samples = query::recent_samples(&state.db, HOME_LIST_LEN).await?;
    Ok(Json(SampleCollection {
        data: query::summarize(&state.db, samples).await?,
    }))
}

#[utoipa::path(
    get,
    path = "/top",
    tag = "Samples",
    operation_id = "topSamples",
    summary = "Most liked public samples",
    responses((status = 200, description = "Up to 8 samples", body = SampleCollection)),
)]
#[instrument(skip(state))]
pub async fn top(State(state): State<AppState>) -> Result<Json<SampleCollection>, AppError> {
    let samples = query::top_samples(&state.db, HOME_LIST_LEN).await?;
    Ok(Json(SampleCollection {
        data: query::summarize(&state.db, samples).await?,
    }))
}

#[utoipa::path(
    post,
    path = "/upload",
    tag = "Samples",
    operation_id = "uploadSamples",
    summary = "Upload video files",
    description = "Accepts up to 10 `file` fields. Each file is checked by content, probed, \
        thumbnailed and stored. Samples are public right away for uploaders and otherwise wait \
        for approval. Every stored sample becomes a pending upload whose first edit may \
        re-encode it.",
    request_body(content_type = "multipart/form-data", description = "One or more `file` fields"),
    responses(
        (status = 201, description = "Samples stored", body = UploadResponse),
        (status = 400, description = "Invalid or missing file (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 413, description = "File too large (PAYLOAD_TOO_LARGE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(user_id = auth_user.user_id))]
pub async fn upload(
    auth_user: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let spooled = pipeline::receive_files(&state, &mut multipart).await?;
    let validated = pipeline::validate_all(&state, spooled).await?;
    let stored = pipeline::commit_all(&state, &auth_user, validated).await?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            samples: stored.into_iter().map(UploadedItem::from).collect(),
        }),
    ))
}

#[utoipa::path(
    patch,
    path = "/batch",
    tag = "Samples",
    operation_id = "batchEditSamples",
    summary = "Edit several pending uploads at once",
    description = "Sets the source and optionally re-encodes each listed sample. Every id must \
        be a pending upload of the caller.",
    request_body = BatchEditRequest,
    responses(
        (status = 200, description = "Updated samples", body = SampleCollection),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn batch_edit(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<BatchEditRequest>,
) -> Result<Json<SampleCollection>, AppError> {
    validate_bulk_ids(&payload.ids, "samples", state.config.upload.max_files)?;

    let updated = pipeline::batch_edit(
        &state,
        &auth_user,
        &payload.ids,
        payload.source_id,
        payload.reencode,
    )
    .await?;

    Ok(Json(SampleCollection {
        data: query::summarize(&state.db, updated).await?,
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Samples",
    operation_id = "getSample",
    summary = "Sample details",
    description = "Private samples are only visible to their uploader and admins.",
    params(("id" = i32, Path, description = "Sample ID")),
    responses(
        (status = 200, description = "Sample", body = SampleDetail),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, viewer), fields(id))]
pub async fn get_sample(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<SampleDetail>, AppError> {
    let sample = find_visible(&state.db, &viewer, id).await?;

    let uploader = user::Entity::find_by_id(sample.uploader_id)
        .one(&state.db)
        .await?
        .map(|u| u.username)
        .unwrap_or_default();
    let source = match sample.source_id {
        Some(source_id) => source::Entity::find_by_id(source_id)
            .one(&state.db)
            .await?
            .map(SourceResponse::from),
        None => None,
    };
    let likes = query::like_count(&state.db, id).await?;
    let liked = match viewer.user_id() {
        Some(user_id) => query::has_liked(&state.db, user_id, id).await?,
        None => false,
    };
    let tags = query::tags_for(&state.db, &[id])
        .await?
        .remove(&id)
        .unwrap_or_default();
    let metadata = crate::entity::metadata::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .map(MetadataResponse::from);

    Ok(Json(SampleDetail {
        id: sample.id,
        filename: sample.filename,
        stored_as: sample.stored_as,
        upload_date: sample.upload_date,
        thumbnail: sample.thumbnail_filename,
        uploader_id: sample.uploader_id,
        uploader,
        source,
        is_public: sample.is_public,
        likes,
        liked,
        tags,
        metadata,
    }))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Samples",
    operation_id = "updateSample",
    summary = "Edit a sample",
    description = "Renames the sample, sets its source and replaces its tags. Unknown tags are \
        created in the default category. `reencode` only applies to the first edit after \
        upload, and is implied when the upload needed conversion.",
    params(("id" = i32, Path, description = "Sample ID")),
    request_body = UpdateSampleRequest,
    responses(
        (status = 200, description = "Updated sample", body = SampleSummary),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_sample(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateSampleRequest>,
) -> Result<Json<SampleSummary>, AppError> {
    let updated = pipeline::edit_sample(&state, &auth_user, id, payload.into()).await?;
    let mut summaries = query::summarize(&state.db, vec![updated]).await?;
    summaries
        .pop()
        .map(Json)
        .ok_or_else(|| AppError::Internal("summary missing after update".into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Samples",
    operation_id = "deleteSample",
    summary = "Delete a sample",
    description = "Removes the sample with its likes, tags and metadata, then its files. Files \
        that are already gone are reported in `warnings`.",
    params(("id" = i32, Path, description = "Sample ID")),
    responses(
        (status = 200, description = "Deleted", body = DeleteResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_sample(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<DeleteResponse>, AppError> {
    let sample = sample::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Sample not found".into()))?;

    if !auth_user.owns_or_admin(sample.uploader_id) {
        return Err(AppError::PermissionDenied);
    }

    let warnings = pipeline::delete_sample(&state, &sample).await?;
    Ok(Json(DeleteResponse {
        message: "Sample deleted successfully.".into(),
        warnings,
    }))
}

#[utoipa::path(
    post,
    path = "/{id}/like",
    tag = "Samples",
    operation_id = "toggleLike",
    summary = "Like or unlike a sample",
    description = "Toggles the caller's like. Requires a verified account.",
    params(("id" = i32, Path, description = "Sample ID")),
    responses(
        (status = 200, description = "New like state", body = LikeResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Unverified account (ACCOUNT_UNVERIFIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id, user_id = auth_user.user_id))]
pub async fn toggle_like(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<LikeResponse>, AppError> {
    if !auth_user.is_verified {
        return Err(AppError::Unverified(
            "Please verify your account to like samples.".into(),
        ));
    }
    let viewer = MaybeAuthUser(Some(auth_user.clone()));
    find_visible(&state.db, &viewer, id).await?;

    let liked = if query::has_liked(&state.db, auth_user.user_id, id).await? {
        sample_like::Entity::delete_by_id((auth_user.user_id, id))
            .exec(&state.db)
            .await?;
        false
    } else {
        let inserted = sample_like::Entity::insert(sample_like::ActiveModel {
            user_id: Set(auth_user.user_id),
            sample_id: Set(id),
            created_at: Set(Utc::now()),
        })
        .exec_without_returning(&state.db)
        .await;
        match inserted {
            Ok(_) => {}
            // A concurrent request already liked it.
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {}
            Err(e) => return Err(e.into()),
        }
        true
    };

    Ok(Json(LikeResponse {
        likes: query::like_count(&state.db, id).await?,
        liked,
    }))
}

#[utoipa::path(
    get,
    path = "/{id}/metadata",
    tag = "Samples",
    operation_id = "getSampleMetadata",
    summary = "Technical metadata of a sample",
    description = "Probes the stored file and saves the result when no metadata is recorded yet.",
    params(("id" = i32, Path, description = "Sample ID")),
    responses(
        (status = 200, description = "Metadata", body = MetadataResponse),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, viewer), fields(id))]
pub async fn get_metadata(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MetadataResponse>, AppError> {
    let sample = find_visible(&state.db, &viewer, id).await?;
    let metadata = pipeline::ensure_metadata(&state, &sample).await?;
    Ok(Json(MetadataResponse::from(metadata)))
}

#[utoipa::path(
    get,
    path = "/{id}/download",
    tag = "Samples",
    operation_id = "downloadSample",
    summary = "Download the video file",
    description = "Streams the video as an attachment named after the display filename.",
    params(("id" = i32, Path, description = "Sample ID")),
    responses(
        (status = 200, description = "Video content", content_type = "video/mp4"),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, viewer), fields(id))]
pub async fn download(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    let sample = find_visible(&state.db, &viewer, id).await?;
    let path = pipeline::sample_path(&state.config, &sample);
    stream_file(&path, Some(content_disposition_value(&sample.filename))).await
}

#[utoipa::path(
    get,
    path = "/{id}/thumbnail",
    tag = "Samples",
    operation_id = "getSampleThumbnail",
    summary = "Thumbnail image",
    params(("id" = i32, Path, description = "Sample ID")),
    responses(
        (status = 200, description = "PNG image", content_type = "image/png"),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, viewer), fields(id))]
pub async fn thumbnail(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    let sample = find_visible(&state.db, &viewer, id).await?;
    let path = pipeline::thumbnail_path(&state.config, &sample);
    stream_file(&path, None).await
}

#[utoipa::path(
    get,
    path = "/search",
    tag = "Samples",
    operation_id = "searchSamples",
    summary = "Search samples by name",
    description = "Case-insensitive substring match on the display filename of public samples, \
        newest first, at most 50 results. An empty query returns nothing.",
    params(SearchQuery),
    responses((status = 200, description = "Matches", body = SampleCollection)),
)]
#[instrument(skip(state, query))]
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SampleCollection>, AppError> {
    let q = query.q.unwrap_or_default();
    if q.trim().is_empty() {
        return Ok(Json(SampleCollection { data: Vec::new() }));
    }
    let samples = query::search_samples(&state.db, &q).await?;
    Ok(Json(SampleCollection {
        data: query::summarize(&state.db, samples).await?,
    }))
}
