use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use axum::extract::Multipart;
use axum::extract::multipart::{Field, MultipartError};
use axum::http::StatusCode;
use chrono::Utc;
use media::VideoMetadata;
use sea_orm::sea_query::OnConflict;
use sea_orm::*;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{info, warn};

use super::naming::{self, StoredNames};
use super::pending::PendingUpload;
use crate::config::{AppConfig, UploadConfig};
use crate::entity::{metadata, sample, sample_like, sample_tag, source, tag, tag_category};
use crate::error::AppError;
use crate::extractors::auth::AuthUser;
use crate::state::AppState;

const INVALID_FILE: &str =
    "There is an error in one of your files. Please make sure it is a valid .mp4 file.";
const SNIFF_BYTES: u64 = 8192;
const MAX_TAG_LEN: usize = 64;

/// An upload written to the samples directory, not yet validated.
#[derive(Debug)]
pub struct SpooledFile {
    pub names: StoredNames,
    pub path: PathBuf,
}

/// A spooled file that passed content and probe checks.
#[derive(Debug)]
pub struct ValidatedFile {
    pub spooled: SpooledFile,
    pub metadata: VideoMetadata,
    pub force_reencode: bool,
}

/// A persisted upload.
#[derive(Debug)]
pub struct UploadedSample {
    pub sample: sample::Model,
    pub force_reencode: bool,
}

/// Changes requested by an edit. `None` leaves a field untouched.
#[derive(Debug, Default)]
pub struct SampleEdit {
    pub filename: Option<String>,
    /// `Some(None)` detaches the source.
    pub source_id: Option<Option<i32>>,
    /// Whitespace-separated tag names replacing the current set.
    pub tags: Option<String>,
    pub reencode: bool,
}

pub fn sample_path(config: &AppConfig, sample: &sample::Model) -> PathBuf {
    config.storage.samples_dir.join(&sample.stored_as)
}

pub fn thumbnail_path(config: &AppConfig, sample: &sample::Model) -> PathBuf {
    config.storage.thumbnails_dir.join(&sample.thumbnail_filename)
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await
        && e.kind() != ErrorKind::NotFound
    {
        warn!(path = %path.display(), error = %e, "Failed to remove file");
    }
}

fn no_files() -> AppError {
    AppError::Validation("No files selected".into())
}

fn too_large(upload: &UploadConfig) -> AppError {
    AppError::PayloadTooLarge(format!(
        "One or more of your samples exceeded the file limit. Max supported filesize is {}MB per file.",
        upload.mb_limit
    ))
}

fn multipart_error(e: MultipartError, upload: &UploadConfig) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large(upload)
    } else {
        AppError::Validation(format!("Multipart error: {}", e.body_text()))
    }
}

/// Stream one multipart field to `path`, enforcing the size limit.
/// The partial file is removed on any failure.
async fn spool_field(
    mut field: Field<'_>,
    path: &Path,
    upload: &UploadConfig,
) -> Result<u64, AppError> {
    let max_size = upload.max_bytes();

    let result = async {
        let mut file = tokio::fs::File::create(path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create upload file: {e}")))?;

        let mut total_size: u64 = 0;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| multipart_error(e, upload))?
        {
            total_size += chunk.len() as u64;
            if total_size > max_size {
                return Err(too_large(upload));
            }
            file.write_all(&chunk)
                .await
                .map_err(|e| AppError::Internal(format!("Upload write failed: {e}")))?;
        }

        file.flush()
            .await
            .map_err(|e| AppError::Internal(format!("Upload flush failed: {e}")))?;
        Ok(total_size)
    }
    .await;

    if result.is_err() {
        remove_quietly(path).await;
    }
    result
}

/// Write every `file` field of the request into the samples directory.
///
/// Nothing is left on disk when this returns an error.
pub async fn receive_files(
    state: &AppState,
    multipart: &mut Multipart,
) -> Result<Vec<SpooledFile>, AppError> {
    let upload = &state.config.upload;
    let dir = &state.config.storage.samples_dir;
    let mut spooled: Vec<SpooledFile> = Vec::new();

    let result = async {
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| multipart_error(e, upload))?
        {
            if field.name() != Some("file") {
                continue;
            }
            let original = field.file_name().unwrap_or_default().to_string();
            if original.is_empty() {
                return Err(no_files());
            }
            if spooled.len() >= upload.max_files {
                return Err(AppError::Validation(format!(
                    "Too many files: at most {} per upload",
                    upload.max_files
                )));
            }

            let names =
                naming::stored_names(&original, &naming::upload_token(), upload.max_name_len)?;
            let path = dir.join(&names.stored_as);
            let size = spool_field(field, &path, upload).await?;
            tracing::debug!(stored_as = %names.stored_as, size, "Spooled upload");
            spooled.push(SpooledFile { names, path });
        }
        Ok(())
    }
    .await;

    if let Err(e) = result {
        for file in &spooled {
            remove_quietly(&file.path).await;
        }
        return Err(e);
    }
    if spooled.is_empty() {
        return Err(no_files());
    }
    Ok(spooled)
}

/// Decide from magic bytes whether the file is accepted, and whether it
/// must be re-encoded. Returns the force-re-encode flag.
async fn sniff_container(path: &Path, upload: &UploadConfig) -> Result<bool, AppError> {
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to reopen upload: {e}")))?;
    let mut head = Vec::with_capacity(SNIFF_BYTES as usize);
    file.take(SNIFF_BYTES)
        .read_to_end(&mut head)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to read upload: {e}")))?;

    let Some(kind) = infer::get(&head) else {
        return Err(AppError::Validation(INVALID_FILE.into()));
    };
    let ext = kind.extension();

    if upload.allowed_extensions.iter().any(|a| a == ext) {
        Ok(false)
    } else if upload.reencode_extensions.iter().any(|a| a == ext) {
        Ok(true)
    } else {
        warn!(detected = ext, "Rejected upload with disallowed content type");
        Err(AppError::Validation(INVALID_FILE.into()))
    }
}

async fn validate_one(state: &AppState, file: &SpooledFile) -> Result<(VideoMetadata, bool), AppError> {
    let force_reencode = sniff_container(&file.path, &state.config.upload).await?;

    let rejected = |e: media::MediaError| {
        warn!(stored_as = %file.names.stored_as, error = %e, "Probe rejected upload");
        AppError::Validation(INVALID_FILE.into())
    };
    let probe = state.media.probe(&file.path).await.map_err(rejected)?;
    let metadata = VideoMetadata::from_probe(&probe).map_err(rejected)?;

    Ok((metadata, force_reencode))
}

/// Validate every spooled file. If any file is rejected, all of them are
/// removed from disk.
pub async fn validate_all(
    state: &AppState,
    files: Vec<SpooledFile>,
) -> Result<Vec<ValidatedFile>, AppError> {
    let mut checked = Vec::with_capacity(files.len());
    for file in &files {
        match validate_one(state, file).await {
            Ok(result) => checked.push(result),
            Err(e) => {
                for f in &files {
                    remove_quietly(&f.path).await;
                }
                return Err(e);
            }
        }
    }

    Ok(files
        .into_iter()
        .zip(checked)
        .map(|(spooled, (metadata, force_reencode))| ValidatedFile {
            spooled,
            metadata,
            force_reencode,
        })
        .collect())
}

async fn insert_sample(
    db: &DatabaseConnection,
    uploader: &AuthUser,
    file: &ValidatedFile,
) -> Result<sample::Model, AppError> {
    let txn = db.begin().await?;

    let sample = sample::ActiveModel {
        filename: Set(file.spooled.names.display.clone()),
        stored_as: Set(file.spooled.names.stored_as.clone()),
        upload_date: Set(Utc::now()),
        thumbnail_filename: Set(file.spooled.names.thumbnail.clone()),
        uploader_id: Set(uploader.user_id),
        source_id: Set(None),
        is_public: Set(uploader.is_uploader),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    metadata::Entity::insert(metadata::ActiveModel::from_video(
        sample.id,
        file.metadata.clone(),
    ))
    .exec_without_returning(&txn)
    .await?;

    txn.commit().await?;
    Ok(sample)
}

/// Thumbnail and persist one validated file, then register it as pending.
///
/// A failed thumbnail is tolerated. A failed insert removes both files.
pub async fn commit(
    state: &AppState,
    uploader: &AuthUser,
    file: ValidatedFile,
) -> Result<UploadedSample, AppError> {
    let thumb = state
        .config
        .storage
        .thumbnails_dir
        .join(&file.spooled.names.thumbnail);

    if let Err(e) = state.media.thumbnail(&file.spooled.path, &thumb).await {
        warn!(stored_as = %file.spooled.names.stored_as, error = %e, "Thumbnail generation failed");
    }

    match insert_sample(&state.db, uploader, &file).await {
        Ok(sample) => {
            state.pending.register(
                sample.id,
                PendingUpload {
                    user_id: uploader.user_id,
                    filename: sample.filename.clone(),
                    force_reencode: file.force_reencode,
                },
            );
            info!(sample_id = sample.id, stored_as = %sample.stored_as, "Stored new sample");
            Ok(UploadedSample {
                sample,
                force_reencode: file.force_reencode,
            })
        }
        Err(e) => {
            remove_quietly(&file.spooled.path).await;
            remove_quietly(&thumb).await;
            Err(e)
        }
    }
}

/// Commit files in order. When one fails, the files not yet committed are
/// removed; samples already stored stay.
pub async fn commit_all(
    state: &AppState,
    uploader: &AuthUser,
    files: Vec<ValidatedFile>,
) -> Result<Vec<UploadedSample>, AppError> {
    let mut stored = Vec::with_capacity(files.len());
    let mut iter = files.into_iter();
    while let Some(file) = iter.next() {
        match commit(state, uploader, file).await {
            Ok(uploaded) => stored.push(uploaded),
            Err(e) => {
                for rest in iter {
                    remove_quietly(&rest.spooled.path).await;
                }
                return Err(e);
            }
        }
    }
    Ok(stored)
}

async fn find_or_create_tag<C: ConnectionTrait>(conn: &C, name: &str) -> Result<tag::Model, AppError> {
    if let Some(existing) = tag::Entity::find()
        .filter(tag::Column::Name.eq(name))
        .one(conn)
        .await?
    {
        return Ok(existing);
    }

    let category = match tag_category::Entity::find()
        .filter(tag_category::Column::Name.eq(tag_category::DEFAULT_CATEGORY))
        .one(conn)
        .await?
    {
        Some(c) => c,
        None => {
            tag_category::ActiveModel {
                name: Set(tag_category::DEFAULT_CATEGORY.to_string()),
                ..Default::default()
            }
            .insert(conn)
            .await?
        }
    };

    let created = tag::ActiveModel {
        name: Set(name.to_string()),
        category_id: Set(category.id),
        ..Default::default()
    }
    .insert(conn)
    .await?;
    Ok(created)
}

/// Replace the tag set of a sample with the whitespace-separated `raw` names.
async fn replace_tags<C: ConnectionTrait>(conn: &C, sample_id: i32, raw: &str) -> Result<(), AppError> {
    let names: BTreeSet<&str> = raw.split_whitespace().collect();
    if let Some(long) = names.iter().find(|n| n.chars().count() > MAX_TAG_LEN) {
        return Err(AppError::Validation(format!(
            "Tag '{long}' exceeds {MAX_TAG_LEN} characters"
        )));
    }

    sample_tag::Entity::delete_many()
        .filter(sample_tag::Column::SampleId.eq(sample_id))
        .exec(conn)
        .await?;

    for name in names {
        let tag = find_or_create_tag(conn, name).await?;
        sample_tag::Entity::insert(sample_tag::ActiveModel {
            sample_id: Set(sample_id),
            tag_id: Set(tag.id),
            ..Default::default()
        })
        .exec_without_returning(conn)
        .await?;
    }
    Ok(())
}

async fn upsert_metadata<C: ConnectionTrait>(
    conn: &C,
    sample_id: i32,
    meta: VideoMetadata,
) -> Result<(), AppError> {
    metadata::Entity::insert(metadata::ActiveModel::from_video(sample_id, meta))
        .on_conflict(
            OnConflict::column(metadata::Column::SampleId)
                .update_columns([
                    metadata::Column::Filesize,
                    metadata::Column::Width,
                    metadata::Column::Height,
                    metadata::Column::AspectRatio,
                    metadata::Column::Framerate,
                    metadata::Column::Codec,
                ])
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

async fn probe_stored(state: &AppState, sample: &sample::Model) -> Result<VideoMetadata, AppError> {
    let path = sample_path(&state.config, sample);
    if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        return Err(AppError::NotFound("Sample file is missing".into()));
    }
    let probe = state.media.probe(&path).await?;
    Ok(VideoMetadata::from_probe(&probe)?)
}

/// Metadata for a sample, probing and storing it first if the row is missing.
pub async fn ensure_metadata(
    state: &AppState,
    sample: &sample::Model,
) -> Result<metadata::Model, AppError> {
    if let Some(existing) = metadata::Entity::find_by_id(sample.id).one(&state.db).await? {
        return Ok(existing);
    }

    info!(sample_id = sample.id, "Recomputing missing metadata");
    let meta = probe_stored(state, sample).await?;
    upsert_metadata(&state.db, sample.id, meta).await?;

    metadata::Entity::find_by_id(sample.id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Internal("metadata missing after insert".into()))
}

async fn apply_edit(
    state: &AppState,
    sample: sample::Model,
    pending: Option<&PendingUpload>,
    edit: SampleEdit,
) -> Result<sample::Model, AppError> {
    let filename = edit
        .filename
        .as_deref()
        .map(naming::normalize_display_name)
        .transpose()?;

    if let Some(Some(source_id)) = edit.source_id
        && source::Entity::find_by_id(source_id).one(&state.db).await?.is_none()
    {
        return Err(AppError::Validation(format!(
            "Source {source_id} does not exist"
        )));
    }

    let reencode = pending.is_some_and(|p| p.force_reencode || edit.reencode);
    let refreshed = if reencode {
        let path = sample_path(&state.config, &sample);
        info!(sample_id = sample.id, "Re-encoding sample");
        state.media.reencode(&path).await?;
        Some(probe_stored(state, &sample).await?)
    } else {
        None
    };

    let txn = state.db.begin().await?;
    let sample_id = sample.id;

    let mut active: sample::ActiveModel = sample.into();
    if let Some(name) = filename {
        active.filename = Set(name);
    }
    if let Some(source_id) = edit.source_id {
        active.source_id = Set(source_id);
    }
    let updated = active.update(&txn).await?;

    if let Some(ref raw) = edit.tags {
        replace_tags(&txn, sample_id, raw).await?;
    }
    if let Some(meta) = refreshed {
        upsert_metadata(&txn, sample_id, meta).await?;
    }

    txn.commit().await?;
    Ok(updated)
}

/// Edit a sample. The caller must own it, be an admin, or hold the pending
/// upload for it. The pending upload is claimed before any work starts, so
/// it is consumed whatever the outcome and a re-encode runs at most once.
pub async fn edit_sample(
    state: &AppState,
    user: &AuthUser,
    sample_id: i32,
    edit: SampleEdit,
) -> Result<sample::Model, AppError> {
    let sample = sample::Entity::find_by_id(sample_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Sample not found".into()))?;

    let pending = state.pending.take_for(sample_id, user.user_id);
    if pending.is_none() && !user.owns_or_admin(sample.uploader_id) {
        return Err(AppError::PermissionDenied);
    }

    apply_edit(state, sample, pending.as_ref(), edit).await
}

/// Apply a source and re-encode choice to several pending uploads of the
/// caller, keeping each sample's filename and tags.
pub async fn batch_edit(
    state: &AppState,
    user: &AuthUser,
    ids: &[i32],
    source_id: Option<Option<i32>>,
    reencode: bool,
) -> Result<Vec<sample::Model>, AppError> {
    if let Some(id) = ids
        .iter()
        .find(|id| state.pending.get_for(**id, user.user_id).is_none())
    {
        return Err(AppError::Validation(format!(
            "Sample {id} is not one of your pending uploads"
        )));
    }

    let mut updated = Vec::with_capacity(ids.len());
    for &id in ids {
        let edit = SampleEdit {
            source_id,
            reencode,
            ..Default::default()
        };
        updated.push(edit_sample(state, user, id, edit).await?);
    }
    Ok(updated)
}

/// Delete a sample's rows in one transaction, then its files. Missing files
/// are reported as warnings.
pub async fn delete_sample(state: &AppState, sample: &sample::Model) -> Result<Vec<String>, AppError> {
    let txn = state.db.begin().await?;

    sample_like::Entity::delete_many()
        .filter(sample_like::Column::SampleId.eq(sample.id))
        .exec(&txn)
        .await?;
    sample_tag::Entity::delete_many()
        .filter(sample_tag::Column::SampleId.eq(sample.id))
        .exec(&txn)
        .await?;
    metadata::Entity::delete_by_id(sample.id).exec(&txn).await?;
    sample::Entity::delete_by_id(sample.id).exec(&txn).await?;

    txn.commit().await?;
    state.pending.clear(sample.id);

    let mut warnings = Vec::new();
    let files = [
        (
            thumbnail_path(&state.config, sample),
            "Thumbnail file wasn't found, couldn't be deleted",
        ),
        (
            sample_path(&state.config, sample),
            "Sample file wasn't found, couldn't be deleted",
        ),
    ];
    for (path, message) in files {
        if let Err(e) = tokio::fs::remove_file(&path).await {
            if e.kind() != ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "Failed to remove file");
            }
            warnings.push(message.to_string());
        }
    }

    info!(sample_id = sample.id, warnings = warnings.len(), "Deleted sample");
    Ok(warnings)
}
