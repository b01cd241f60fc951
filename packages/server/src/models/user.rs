use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::user;
use crate::models::sample::SampleSummary;

/// Account details visible to the account owner and admins.
#[derive(Serialize, utoipa::ToSchema)]
pub struct UserResponse {
    #[schema(example = 42)]
    pub id: i32,
    #[schema(example = "alice_wonder")]
    pub username: String,
    pub email: Option<String>,
    pub is_admin: bool,
    pub is_uploader: bool,
    pub is_verified: bool,
    pub join_date: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            is_admin: user.is_admin,
            is_uploader: user.is_uploader,
            is_verified: user.is_verified,
            join_date: user.join_date,
        }
    }
}

/// Public profile page.
#[derive(Serialize, utoipa::ToSchema)]
pub struct UserProfile {
    pub id: i32,
    pub username: String,
    pub is_admin: bool,
    pub is_uploader: bool,
    pub join_date: DateTime<Utc>,
    /// Public samples, newest first.
    pub samples: Vec<SampleSummary>,
    /// Samples awaiting approval. Only shown to the owner and admins.
    pub under_review: Vec<SampleSummary>,
}

/// Admin update of account flags. Absent fields are left unchanged.
#[derive(Deserialize, utoipa::ToSchema, Default)]
pub struct UpdateUserRequest {
    pub is_admin: Option<bool>,
    pub is_uploader: Option<bool>,
    pub is_verified: Option<bool>,
}

impl UpdateUserRequest {
    pub fn is_empty(&self) -> bool {
        self.is_admin.is_none() && self.is_uploader.is_none() && self.is_verified.is_none()
    }
}
