use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::authz::{AuthzError, Requester, RoleGuard};
use crate::error::ApiError;

/// Per-route role restriction. Runs after [`authenticate`](super::authenticate)
/// and before the handler's organization check.
pub async fn enforce_roles(
    State(guard): State<RoleGuard>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let role = request
        .extensions()
        .get::<Requester>()
        .map(Requester::role)
        .ok_or(AuthzError::Unauthenticated)?;

    if let Err(err) = guard.check(role) {
        tracing::info!("Role {} rejected on {} {}", role, request.method(), request.uri().path());
        return Err(err.into());
    }

    Ok(next.run(request).await)
}
