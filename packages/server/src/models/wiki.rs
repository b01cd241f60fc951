use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct WikiPageSummary {
    #[schema(example = "getting-started")]
    pub slug: String,
    #[schema(example = "Getting started")]
    pub title: String,
}

#[derive(Serialize, ToSchema)]
pub struct WikiIndexResponse {
    pub pages: Vec<WikiPageSummary>,
}

/// A wiki page as stored, without rendering.
#[derive(Serialize, ToSchema)]
pub struct WikiPageResponse {
    pub slug: String,
    pub title: String,
    pub markdown: String,
}
