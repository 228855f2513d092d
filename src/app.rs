use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post, MethodRouter},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::authz::{restrict_to, RoleGuard};
use crate::config::{self, AppConfig};
use crate::error::ApiError;
use crate::handlers::{protected, public};
use crate::middleware::{authenticate, enforce_roles};
use crate::state::AppState;
use crate::types::Role;

const ADMINS: RoleGuard = restrict_to(&[Role::Admin, Role::Superadmin]);
const SUPERADMIN: RoleGuard = restrict_to(&[Role::Superadmin]);
const TICKET_EDITORS: RoleGuard = restrict_to(&[Role::Staff, Role::Admin, Role::Superadmin]);
const BOARD_ADMINS: RoleGuard = restrict_to(&[Role::BoardAdmin, Role::Superadmin]);
const STAFF_DIRECTORY: RoleGuard = restrict_to(&[Role::Admin, Role::BoardAdmin, Role::Superadmin]);

/// Full router with middleware, ready to serve
pub fn app(state: AppState) -> Router {
    let settings = config::config();

    Router::new()
        // Public
        .route("/", get(public::system::root))
        .route("/health", get(public::system::health))
        .route("/api/ping", get(public::system::ping))
        .merge(auth_public_routes())
        // Protected: authenticate → role guard → handler
        .merge(protected_routes().route_layer(from_fn_with_state(state.clone(), authenticate)))
        .fallback(|| async { ApiError::not_found("Route not found") })
        // Global middleware
        .layer(DefaultBodyLimit::max(settings.api.max_request_size_bytes))
        .layer(cors_layer(settings))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Restricts a method router to the roles in `guard`
fn guarded(guard: RoleGuard, route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.route_layer(from_fn_with_state(guard, enforce_roles))
}

fn auth_public_routes() -> Router<AppState> {
    use public::auth;

    Router::new()
        .route("/api/auth/register", post(auth::register_post))
        .route("/api/auth/login", post(auth::login_post))
}

fn protected_routes() -> Router<AppState> {
    use protected::{auth, boards, organizations, tickets, users};

    Router::new()
        .route("/api/auth/me", get(auth::me))
        // Organizations
        .route("/api/organizations", guarded(ADMINS, post(organizations::create)))
        .route(
            "/api/organizations/:id",
            guarded(ADMINS, get(organizations::show))
                .merge(guarded(SUPERADMIN, patch(organizations::update)))
                .merge(guarded(SUPERADMIN, delete(organizations::delete))),
        )
        .route("/api/orgs/:org_id/data", get(organizations::scoped_data))
        // Boards
        .route(
            "/api/boards/:board_id/organizations",
            guarded(BOARD_ADMINS, get(boards::organizations)),
        )
        // Tickets
        .route("/api/tickets", get(tickets::list).post(tickets::create))
        .route("/api/tickets/stats", get(tickets::stats))
        .route(
            "/api/tickets/:id",
            get(tickets::show)
                .merge(guarded(TICKET_EDITORS, patch(tickets::update)))
                .merge(guarded(ADMINS, delete(tickets::delete))),
        )
        .route("/api/tickets/:id/assign", guarded(ADMINS, post(tickets::assign)))
        // Users
        .route("/api/users/staff", guarded(STAFF_DIRECTORY, get(users::staff)))
}

fn cors_layer(settings: &AppConfig) -> CorsLayer {
    if !settings.security.enable_cors {
        return CorsLayer::new();
    }

    let origins: Vec<HeaderValue> = settings
        .security
        .cors_origins
        .iter()
        .filter(|o| o.as_str() != "*")
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    if origins.is_empty() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Binds the configured port and serves until the process is stopped
pub async fn serve(settings: &AppConfig) -> anyhow::Result<()> {
    let state = AppState::from_config(settings).await?;

    let bind_addr = format!("0.0.0.0:{}", settings.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Helpdesk API listening on http://{}", bind_addr);

    axum::serve(listener, app(state)).await.context("server error")?;
    Ok(())
}
