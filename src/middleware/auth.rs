use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::authz::Requester;
use crate::error::ApiError;
use crate::state::AppState;

/// Bearer authentication for protected routes.
///
/// Verifies the token, reloads the identity and its organization, and inserts
/// a [`Requester`] into request extensions. The token's role and organization
/// must still match the stored record.
pub async fn authenticate(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(&headers).map_err(ApiError::unauthorized)?;
    let claims = state.tokens.verify(token)?;

    let identity = state
        .store
        .find_identity_by_id(&claims.subject())
        .await?
        .ok_or_else(|| {
            tracing::warn!("Token subject {} no longer exists", claims.sub);
            ApiError::unauthorized("The user belonging to this token no longer exists.")
        })?;

    if !identity.is_active {
        tracing::warn!("Inactive user {} presented a token", identity.id);
        return Err(ApiError::unauthorized("This account has been deactivated."));
    }

    if identity.role != claims.role || identity.organization_id != claims.organization_id() {
        tracing::warn!(
            "Token for {} is stale: token role/org {}/{:?}, stored {}/{:?}",
            identity.id,
            claims.role,
            claims.org,
            identity.role,
            identity.organization_id
        );
        return Err(ApiError::unauthorized("Token no longer matches this account. Please log in again."));
    }

    if identity.changed_password_after(claims.iat) {
        return Err(ApiError::unauthorized("User recently changed password! Please log in again."));
    }

    let organization = match identity.organization_id.as_ref() {
        Some(org_id) => state.store.find_organization_by_id(org_id).await?,
        None => None,
    };

    tracing::debug!("Authenticated {} as {}", identity.id, identity.role);

    request.extensions_mut().insert(Requester::new(identity, organization));
    Ok(next.run(request).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, &'static str> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or("You are not logged in! Please log in to get access.")?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format")?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        Some(_) => Err("Empty bearer token"),
        None => Err("Authorization header must use Bearer token format"),
    }
}
