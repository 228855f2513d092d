// handlers/public/auth/login.rs - POST /api/auth/login handler

use axum::{extract::State, Json};
use serde::Deserialize;

use super::{required, TokenGrant};
use crate::auth::PasswordError;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// POST /api/auth/login - exchange email and password for a bearer token
///
/// Unknown email and wrong password produce the same 401 so the endpoint
/// cannot be used to enumerate accounts. Unknown emails still pay for one
/// Argon2 verification.
pub async fn login_post(State(state): State<AppState>, Json(body): Json<LoginRequest>) -> ApiResult<TokenGrant> {
    let (Some(email), Some(password)) = (required(body.email), body.password.filter(|p| !p.is_empty())) else {
        return Err(ApiError::bad_request("Please provide email and password!"));
    };

    let user = state.store.find_identity_by_email(&email).await?;

    let verified = match &user {
        Some(user) => match state.passwords.verify(&password, &user.password_hash) {
            Err(PasswordError::MalformedHash(reason)) => {
                tracing::warn!("Stored password hash for {} is unreadable: {}", user.id, reason);
                false
            }
            other => other?,
        },
        None => state.passwords.verify_decoy(&password)?,
    };

    let user = match user {
        Some(user) if verified => user,
        _ => {
            tracing::info!("Failed login for {}", email);
            return Err(ApiError::unauthorized("Incorrect email or password"));
        }
    };

    if !user.is_active {
        return Err(ApiError::unauthorized("This account has been deactivated."));
    }

    let organization = match user.organization_id.as_ref() {
        Some(org_id) => state.store.find_organization_by_id(org_id).await?,
        None => None,
    };

    let token = state.tokens.issue(&user)?;
    tracing::info!("User {} logged in as {}", user.id, user.role);

    Ok(ApiResponse::success(TokenGrant {
        token,
        expires_in: state.tokens.ttl_seconds(),
        user,
        organization,
    }))
}
