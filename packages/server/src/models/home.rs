use serde::Serialize;
use utoipa::ToSchema;

use crate::models::sample::SampleSummary;

#[derive(Serialize, ToSchema)]
pub struct HomeResponse {
    pub recent: Vec<SampleSummary>,
    pub top: Vec<SampleSummary>,
    #[schema(example = "0.1.0")]
    pub version: String,
    /// Markdown changelog for the running version, if one exists.
    pub changelog: Option<String>,
}
