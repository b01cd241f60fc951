use axum::Json;
use axum::extract::{Path, State};
use sea_orm::*;
use tracing::instrument;

use crate::entity::user;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::MaybeAuthUser;
use crate::models::user::UserProfile;
use crate::query;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Users",
    operation_id = "getUserProfile",
    summary = "User profile",
    description = "Public samples of the user, newest first. Samples still under review are \
        listed only for the user themselves and admins.",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Profile", body = UserProfile),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, viewer), fields(id))]
pub async fn get_profile(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<UserProfile>, AppError> {
    let user = user::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let include_private = viewer.can_see_private(user.id);
    let (public, private): (Vec<_>, Vec<_>) = query::user_samples(&state.db, user.id, include_private)
        .await?
        .into_iter()
        .partition(|s| s.is_public);

    Ok(Json(UserProfile {
        id: user.id,
        username: user.username,
        is_admin: user.is_admin,
        is_uploader: user.is_uploader,
        join_date: user.join_date,
        samples: query::summarize(&state.db, public).await?,
        under_review: query::summarize(&state.db, private).await?,
    }))
}
