use std::io::ErrorKind;

use axum::Json;
use axum::extract::{Path, State};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::models::wiki::{WikiIndexResponse, WikiPageResponse, WikiPageSummary};
use crate::state::AppState;
use crate::utils::filename::validate_flat_filename;

const PAGE_EXTENSION: &str = "md";

/// Title is the first line with its heading marker removed; pages without
/// one are titled by their slug.
fn page_title(slug: &str, markdown: &str) -> String {
    let first = markdown.lines().next().unwrap_or_default();
    let title = first.trim_start_matches('#').trim();
    if title.is_empty() {
        slug.to_string()
    } else {
        title.to_string()
    }
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Wiki",
    operation_id = "listWikiPages",
    summary = "List wiki pages",
    description = "Every markdown page in the wiki directory, sorted by slug.",
    responses((status = 200, description = "Pages", body = WikiIndexResponse)),
)]
#[instrument(skip(state))]
pub async fn list_pages(State(state): State<AppState>) -> Result<Json<WikiIndexResponse>, AppError> {
    let dir = &state.config.storage.wiki_dir;
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Ok(Json(WikiIndexResponse { pages: Vec::new() }));
        }
        Err(e) => return Err(AppError::Internal(format!("Failed to read wiki directory: {e}"))),
    };

    let mut pages = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| AppError::Internal(format!("Failed to read wiki directory: {e}")))?
    {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(PAGE_EXTENSION) {
            continue;
        }
        let Some(slug) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if validate_flat_filename(slug).is_err() {
            continue;
        }
        let markdown = match tokio::fs::read_to_string(&path).await {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable wiki page");
                continue;
            }
        };
        pages.push(WikiPageSummary {
            title: page_title(slug, &markdown),
            slug: slug.to_string(),
        });
    }
    pages.sort_by(|a, b| a.slug.cmp(&b.slug));

    Ok(Json(WikiIndexResponse { pages }))
}

#[utoipa::path(
    get,
    path = "/{page}",
    tag = "Wiki",
    operation_id = "getWikiPage",
    summary = "Raw markdown of a wiki page",
    params(("page" = String, Path, description = "Page slug")),
    responses(
        (status = 200, description = "Page", body = WikiPageResponse),
        (status = 400, description = "Invalid slug (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(page))]
pub async fn get_page(
    State(state): State<AppState>,
    Path(page): Path<String>,
) -> Result<Json<WikiPageResponse>, AppError> {
    let slug = validate_flat_filename(&page)
        .map_err(|e| AppError::Validation(e.message().into()))?
        .to_string();

    let path = state
        .config
        .storage
        .wiki_dir
        .join(format!("{slug}.{PAGE_EXTENSION}"));
    let markdown = match tokio::fs::read_to_string(&path).await {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(AppError::NotFound("Wiki page not found".into()));
        }
        Err(e) => return Err(AppError::Internal(format!("Failed to read wiki page: {e}"))),
    };

    Ok(Json(WikiPageResponse {
        title: page_title(&slug, &markdown),
        slug,
        markdown,
    }))
}
