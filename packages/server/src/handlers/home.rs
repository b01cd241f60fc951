use std::io::ErrorKind;

use axum::Json;
use axum::extract::State;
use tracing::instrument;

use crate::error::AppError;
use crate::models::home::HomeResponse;
use crate::query::{self, HOME_LIST_LEN};
use crate::state::AppState;

/// Changelog of the running version, if a file for it exists.
async fn read_changelog(state: &AppState) -> Option<String> {
    let version = &state.config.site.version;
    let path = state.config.storage.changelog_dir.join(format!("{version}.md"));
    match tokio::fs::read_to_string(&path).await {
        Ok(text) => Some(text),
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read changelog");
            None
        }
    }
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Home",
    operation_id = "home",
    summary = "Landing page data",
    description = "The 8 newest and 8 most liked public samples, the running version and its \
        changelog.",
    responses((status = 200, description = "Home page", body = HomeResponse)),
)]
#[instrument(skip(state))]
pub async fn home(State(state): State<AppState>) -> Result<Json<HomeResponse>, AppError> {
    let recent = query::recent_samples(&state.db, HOME_LIST_LEN).await?;
    let top = query::top_samples(&state.db, HOME_LIST_LEN).await?;

    Ok(Json(HomeResponse {
        recent: query::summarize(&state.db, recent).await?,
        top: query::summarize(&state.db, top).await?,
        version: state.config.site.version.clone(),
        changelog: read_changelog(&state).await,
    }))
}
