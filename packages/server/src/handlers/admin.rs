use axum::{
    Json,
    extract::{Path, State},
};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{sample, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::sample::{SampleCollection, SampleSummary, VisibilityRequest};
use crate::models::user::{UpdateUserRequest, UserResponse};
use crate::query;
use crate::state::AppState;

#[utoipa::path(
    patch,
    path = "/users/{id}",
    tag = "Admin",
    operation_id = "updateUserFlags",
    summary = "Change account flags",
    description = "Grants or revokes admin and uploader rights and verifies accounts. Absent \
        fields are left unchanged. Requires admin.",
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated account", body = UserResponse),
        (status = 400, description = "Nothing to update (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id, admin_id = auth_user.user_id))]
pub async fn update_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    auth_user.require_admin()?;
    if payload.is_empty() {
        return Err(AppError::Validation("No fields to update".into()));
    }

    let existing = user::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let mut active: user::ActiveModel = existing.into();
    if let Some(v) = payload.is_admin {
        active.is_admin = Set(v);
    }
    if let Some(v) = payload.is_uploader {
        active.is_uploader = Set(v);
    }
    if let Some(v) = payload.is_verified {
        active.is_verified = Set(v);
    }
    let updated = active.update(&state.db).await?;

    tracing::info!(
        is_admin = updated.is_admin,
        is_uploader = updated.is_uploader,
        is_verified = updated.is_verified,
        "User flags updated"
    );
    Ok(Json(UserResponse::from(updated)))
}

#[utoipa::path(
    get,
    path = "/samples/review",
    tag = "Admin",
    operation_id = "listSamplesUnderReview",
    summary = "Samples awaiting approval",
    description = "All private samples, oldest first. Requires admin.",
    responses(
        (status = 200, description = "Private samples", body = SampleCollection),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn list_under_review(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<SampleCollection>, AppError> {
    auth_user.require_admin()?;

    let samples = sample::Entity::find()
        .filter(sample::Column::IsPublic.eq(false))
        .order_by_asc(sample::Column::UploadDate)
        .order_by_asc(sample::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(SampleCollection {
        data: query::summarize(&state.db, samples).await?,
    }))
}

#[utoipa::path(
    put,
    path = "/samples/{id}/visibility",
    tag = "Admin",
    operation_id = "setSampleVisibility",
    summary = "Approve or hide a sample",
    params(("id" = i32, Path, description = "Sample ID")),
    request_body = VisibilityRequest,
    responses(
        (status = 200, description = "Updated sample", body = SampleSummary),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Sample not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id, is_public = payload.is_public))]
pub async fn set_visibility(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<VisibilityRequest>,
) -> Result<Json<SampleSummary>, AppError> {
    auth_user.require_admin()?;

    let existing = sample::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Sample not found".into()))?;

    let mut active: sample::ActiveModel = existing.into();
    active.is_public = Set(payload.is_public);
    let updated = active.update(&state.db).await?;

    query::summarize(&state.db, vec![updated])
        .await?
        .pop()
        .map(Json)
        .ok_or_else(|| AppError::Internal("summary missing after update".into()))
}
