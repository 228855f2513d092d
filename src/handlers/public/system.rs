// handlers/public/system.rs - GET /, GET /health, GET /api/ping

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET / - service description
pub async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Helpdesk API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Multi-tenant helpdesk API with organization and board scoped access",
            "endpoints": {
                "public_auth": "/api/auth/register, /api/auth/login (public)",
                "auth": "/api/auth/me (protected)",
                "organizations": "/api/organizations[/:id] (protected)",
                "org_data": "/api/orgs/:org_id/data[?boardId=] (protected)",
                "boards": "/api/boards/:board_id/organizations (board_admin, superadmin)",
                "tickets": "/api/tickets[/:id][/assign] (protected)",
                "users": "/api/users/staff (admin, board_admin, superadmin)",
            }
        }
    }))
}

/// GET /api/ping
pub async fn ping() -> Json<Value> {
    Json(json!({ "pong": true }))
}

/// GET /health - store connectivity
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}
