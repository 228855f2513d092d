// handlers/public/auth/register.rs - POST /api/auth/register handler

use axum::{extract::State, Json};
use serde::Deserialize;

use super::{required, TokenGrant};
use crate::auth::PasswordHasher;
use crate::database::models::{user::normalize_email, NewOrganization, NewUser};
use crate::database::DatabaseError;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;
use crate::types::{BoardId, Role, Subscription};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub organization_name: Option<String>,
    pub domain: Option<String>,
    pub board_id: Option<String>,
}

/**
 * POST /api/auth/register - create an organization together with its first admin
 *
 * Expected Input:
 * ```json
 * {
 *   "name": "Admin User",
 *   "email": "admin@campus.edu",
 *   "password": "at least 8 chars",
 *   "organizationName": "Campus Facilities",
 *   "domain": "campus.edu",
 *   "boardId": "optional"
 * }
 * ```
 *
 * The new user is an `admin` with `permissions = ["all"]`. Responds 201 with a
 * token, or 409 when the domain or email is already registered.
 */
pub async fn register_post(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> ApiResult<TokenGrant> {
    if !state.allow_registration {
        return Err(ApiError::forbidden("Registration is disabled"));
    }

    let name = required(body.name).ok_or_else(|| ApiError::field("name", "Please provide your name"))?;
    let email = required(body.email)
        .filter(|e| e.contains('@'))
        .ok_or_else(|| ApiError::field("email", "Please provide a valid email"))?;
    let organization_name = required(body.organization_name)
        .ok_or_else(|| ApiError::field("organizationName", "Please provide an organization name"))?;
    let domain = required(body.domain).ok_or_else(|| ApiError::field("domain", "Please provide a domain"))?;
    let password = body
        .password
        .ok_or_else(|| ApiError::field("password", "Please provide a password"))?;
    PasswordHasher::check_policy(&password)?;

    if state.store.find_organization_by_domain(&domain).await?.is_some() {
        return Err(ApiError::conflict("Organization with this domain already exists"));
    }
    if state
        .store
        .find_identity_by_email(&normalize_email(&email))
        .await?
        .is_some()
    {
        return Err(ApiError::conflict("An account with this email already exists"));
    }

    let password_hash = state.passwords.hash(&password)?;

    let (organization, user) = state
        .store
        .register_organization(
            NewOrganization {
                name: organization_name,
                domain,
                board_id: BoardId::parse_param(body.board_id.as_deref()),
                subscription: Subscription::Free,
                created_by: None,
            },
            NewUser {
                name,
                email,
                password_hash,
                role: Role::Admin,
                organization_id: None,
                permissions: vec!["all".to_string()],
            },
        )
        .await
        .map_err(|err| match err {
            DatabaseError::Conflict(_) => ApiError::conflict("Organization or account already exists"),
            other => other.into(),
        })?;

    tracing::info!("Registered organization {} ({}) with admin {}", organization.id, organization.domain, user.id);

    let token = state.tokens.issue(&user)?;
    Ok(ApiResponse::created(TokenGrant {
        token,
        expires_in: state.tokens.ttl_seconds(),
        user,
        organization: Some(organization),
    }))
}
