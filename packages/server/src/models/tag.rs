use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema, Clone, PartialEq, Eq, Debug)]
pub struct TagResponse {
    pub id: i32,
    #[schema(example = "drums")]
    pub name: String,
}

#[derive(Serialize, ToSchema)]
pub struct TagCategoryGroup {
    #[schema(example = "instrument")]
    pub category: String,
    pub tags: Vec<TagResponse>,
}

#[derive(Serialize, ToSchema)]
pub struct TagListResponse {
    pub categories: Vec<TagCategoryGroup>,
}
