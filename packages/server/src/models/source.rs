use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::entity::source;
use crate::error::AppError;
use crate::models::sample::SampleSummary;

#[derive(Serialize, ToSchema)]
pub struct SourceResponse {
    #[schema(example = 3)]
    pub id: i32,
    #[schema(example = "Super Mario 64")]
    pub name: String,
}

impl From<source::Model> for SourceResponse {
    fn from(s: source::Model) -> Self {
        Self {
            id: s.id,
            name: s.name,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SourceListResponse {
    pub data: Vec<SourceResponse>,
}

#[derive(Serialize, ToSchema)]
pub struct SourceDetail {
    pub id: i32,
    pub name: String,
    /// Public samples from this source, newest first.
    pub samples: Vec<SampleSummary>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateSourceRequest {
    #[schema(example = "Super Mario 64")]
    pub name: String,
}

pub fn validate_source_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > 256 {
        return Err(AppError::Validation(
            "Source name must be 1-256 characters".into(),
        ));
    }
    Ok(name.to_string())
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SourceSearchQuery {
    pub q: Option<String>,
}
