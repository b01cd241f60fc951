use std::collections::HashMap;

use axum::Json;
use axum::extract::State;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{tag, tag_category};
use crate::error::AppError;
use crate::models::tag::{TagCategoryGroup, TagListResponse, TagResponse};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/",
    tag = "Tags",
    operation_id = "listTags",
    summary = "All tags grouped by category",
    description = "Categories in creation order, each with its tags sorted by name. Categories \
        without tags are included with an empty list.",
    responses((status = 200, description = "Tags", body = TagListResponse)),
)]
#[instrument(skip(state))]
pub async fn list_tags(State(state): State<AppState>) -> Result<Json<TagListResponse>, AppError> {
    let categories = tag_category::Entity::find()
        .order_by_asc(tag_category::Column::Id)
        .all(&state.db)
        .await?;
    let tags = tag::Entity::find()
        .order_by_asc(tag::Column::Name)
        .all(&state.db)
        .await?;

    let mut by_category: HashMap<i32, Vec<TagResponse>> = HashMap::new();
    for t in tags {
        by_category.entry(t.category_id).or_default().push(TagResponse {
            id: t.id,
            name: t.name,
        });
    }

    Ok(Json(TagListResponse {
        categories: categories
            .into_iter()
            .map(|c| TagCategoryGroup {
                tags: by_category.remove(&c.id).unwrap_or_default(),
                category: c.name,
            })
            .collect(),
    }))
}
