use axum::{extract::FromRequestParts, http::request::Parts};
use sea_orm::EntityTrait;

use crate::entity::user;
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::jwt;

/// Authenticated user extracted from the `Authorization: Bearer <token>` header.
///
/// Flags are read from the database on every request, so role changes made by
/// an admin take effect without a new login.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i32,
    pub username: String,
    pub is_admin: bool,
    pub is_uploader: bool,
    pub is_verified: bool,
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(AppError::PermissionDenied)
        }
    }

    /// Uploaders and admins may curate shared data such as sources.
    pub fn require_uploader(&self) -> Result<(), AppError> {
        if self.is_uploader || self.is_admin {
            Ok(())
        } else {
            Err(AppError::PermissionDenied)
        }
    }

    /// Whether this user may see or modify something owned by `owner_id`.
    pub fn owns_or_admin(&self, owner_id: i32) -> bool {
        self.is_admin || self.user_id == owner_id
    }
}

impl From<user::Model> for AuthUser {
    fn from(user: user::Model) -> Self {
        Self {
            user_id: user.id,
            username: user.username,
            is_admin: user.is_admin,
            is_uploader: user.is_uploader,
            is_verified: user.is_verified,
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::TokenMissing)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AppError::TokenInvalid)?;

        let claims = jwt::verify(token, &state.config.auth.jwt_secret)
            .map_err(|_| AppError::TokenInvalid)?;

        // Deleted accounts invalidate outstanding tokens.
        let user = user::Entity::find_by_id(claims.uid)
            .one(&state.db)
            .await?
            .ok_or(AppError::TokenInvalid)?;

        Ok(AuthUser::from(user))
    }
}

/// Optional authentication for public endpoints. A missing header yields
/// `None`; a present but invalid token is still rejected.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl MaybeAuthUser {
    /// True when the viewer is the owner or an admin.
    pub fn can_see_private(&self, owner_id: i32) -> bool {
        self.0.as_ref().is_some_and(|u| u.owns_or_admin(owner_id))
    }

    pub fn user_id(&self) -> Option<i32> {
        self.0.as_ref().map(|u| u.user_id)
    }
}

impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key("Authorization") {
            return Ok(MaybeAuthUser(None));
        }
        AuthUser::from_request_parts(parts, state)
            .await
            .map(|u| MaybeAuthUser(Some(u)))
    }
}
