// handlers/protected/auth.rs - GET /api/auth/me

use axum::Extension;
use serde::Serialize;

use crate::authz::Requester;
use crate::database::models::{Organization, User};
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Serialize)]
pub struct Profile {
    pub user: User,
    pub organization: Option<Organization>,
}

/// GET /api/auth/me - the authenticated identity and its organization
pub async fn me(Extension(requester): Extension<Requester>) -> ApiResult<Profile> {
    Ok(ApiResponse::success(Profile {
        user: requester.identity,
        organization: requester.organization,
    }))
}
