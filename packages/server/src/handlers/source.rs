use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use sea_orm::*;
use tracing::instrument;

use crate::entity::source;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::source::{
    CreateSourceRequest, SourceDetail, SourceListResponse, SourceResponse, SourceSearchQuery,
    validate_source_name,
};
use crate::query;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/",
    tag = "Sources",
    operation_id = "listSources",
    summary = "List sources",
    description = "All sources in alphabetical order.",
    responses((status = 200, description = "Sources", body = SourceListResponse)),
)]
#[instrument(skip(state))]
pub async fn list_sources(
    State(state): State<AppState>,
) -> Result<Json<SourceListResponse>, AppError> {
    let sources = query::list_sources(&state.db).await?;
    Ok(Json(SourceListResponse {
        data: sources.into_iter().map(SourceResponse::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Sources",
    operation_id = "createSource",
    summary = "Create a source",
    request_body = CreateSourceRequest,
    responses(
        (status = 201, description = "Source created", body = SourceResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not an uploader (PERMISSION_DENIED)", body = ErrorBody),
        (status = 409, description = "Name already exists (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn create_source(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateSourceRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_uploader()?;
    let name = validate_source_name(&payload.name)?;

    let created = source::ActiveModel {
        name: Set(name),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("A source with this name already exists".into())
        }
        _ => AppError::from(e),
    })?;

    tracing::info!(source_id = created.id, "Source created");
    Ok((StatusCode::CREATED, Json(SourceResponse::from(created))))
}

#[utoipa::path(
    get,
    path = "/search",
    tag = "Sources",
    operation_id = "searchSources",
    summary = "Source autocomplete",
    description = "Up to 10 sources whose name contains `q`, ignoring case.",
    params(SourceSearchQuery),
    responses((status = 200, description = "Matches", body = SourceListResponse)),
)]
#[instrument(skip(state, query))]
pub async fn search_sources(
    State(state): State<AppState>,
    Query(query): Query<SourceSearchQuery>,
) -> Result<Json<SourceListResponse>, AppError> {
    let q = query.q.unwrap_or_default();
    if q.trim().is_empty() {
        return Ok(Json(SourceListResponse { data: Vec::new() }));
    }
    let sources = query::search_sources(&state.db, &q).await?;
    Ok(Json(SourceListResponse {
        data: sources.into_iter().map(SourceResponse::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Sources",
    operation_id = "getSource",
    summary = "Source with its public samples",
    params(("id" = i32, Path, description = "Source ID")),
    responses(
        (status = 200, description = "Source", body = SourceDetail),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id))]
pub async fn get_source(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<SourceDetail>, AppError> {
    let source = source::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Source not found".into()))?;

    let samples = query::source_samples(&state.db, id).await?;
    Ok(Json(SourceDetail {
        id: source.id,
        name: source.name,
        samples: query::summarize(&state.db, samples).await?,
    }))
}
