// handlers/protected/tickets.rs - ticket lifecycle
//
// GET    /api/tickets               any role, scoped by role
// POST   /api/tickets               any role
// GET    /api/tickets/stats         any role, same scope as the list
// GET    /api/tickets/:id           any role, students only their own
// PATCH  /api/tickets/:id           staff, admin, superadmin
// POST   /api/tickets/:id/assign    admin, superadmin
// DELETE /api/tickets/:id           admin, superadmin

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::authz::{ticket_target, AccessTarget, AuthzError, BoardHint, DenyReason, Requester};
use crate::database::models::{NewTicket, Ticket, TicketAssignment, TicketFilter, TicketPatch, TicketStats};
use crate::error::ApiError;
use crate::handlers::public::auth::required;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;
use crate::types::{OrganizationId, Role, TicketId, TicketPriority, TicketStatus, UserId};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub organization_id: Option<String>,
}

/// Translates the requester's role into the set of tickets it may list.
///
/// An explicit `?organizationId=` goes through the access decision first; the
/// role-specific narrowing (own tickets, assigned tickets) applies on top.
fn scoped_filter(
    state: &AppState,
    requester: &Requester,
    query: &ListQuery,
    hint: BoardHint,
) -> Result<TicketFilter, ApiError> {
    let mut filter = TicketFilter {
        status: parse_opt::<TicketStatus>(query.status.as_deref(), "status")?,
        priority: parse_opt::<TicketPriority>(query.priority.as_deref(), "priority")?,
        ..Default::default()
    };

    let requested = OrganizationId::parse_param(query.organization_id.as_deref());
    filter.organization_id = match (requested, requester.role()) {
        (Some(org_id), _) => {
            state.authorize(requester, &AccessTarget::organization(org_id.clone()).with_board(hint.into_inner()))?;
            Some(org_id)
        }
        (None, Role::Superadmin) => None,
        (None, _) => Some(
            requester
                .organization_id()
                .cloned()
                .ok_or(AuthzError::Forbidden(DenyReason::NotOnboarded))?,
        ),
    };

    match requester.role() {
        Role::Student => filter.created_by = Some(requester.id().clone()),
        Role::Staff => filter.assigned_to = Some(requester.id().clone()),
        Role::Admin | Role::BoardAdmin | Role::Superadmin => {}
    }

    Ok(filter)
}

fn parse_opt<T: std::str::FromStr<Err = String>>(raw: Option<&str>, field: &str) -> Result<Option<T>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => value.parse().map(Some).map_err(|e: String| ApiError::field(field, e)),
        None => Ok(None),
    }
}

/// GET /api/tickets
pub async fn list(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Query(query): Query<ListQuery>,
    hint: BoardHint,
) -> ApiResult<Vec<Ticket>> {
    let filter = scoped_filter(&state, &requester, &query, hint)?;
    let tickets = state.store.list_tickets(&filter).await?;
    let count = tickets.len();
    Ok(ApiResponse::list(tickets, count))
}

/// GET /api/tickets/stats
pub async fn stats(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Query(query): Query<ListQuery>,
    hint: BoardHint,
) -> ApiResult<TicketStats> {
    let filter = scoped_filter(&state, &requester, &query, hint)?;
    let tickets = state.store.list_tickets(&filter).await?;
    Ok(ApiResponse::success(TicketStats::from_tickets(&tickets)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicket {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub priority: Option<TicketPriority>,
    pub organization_id: Option<String>,
    pub board_id: Option<String>,
}

/// POST /api/tickets - ticket owned by the requester's organization unless
/// `organizationId` names another one the requester may access
pub async fn create(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    hint: BoardHint,
    Json(body): Json<CreateTicket>,
) -> ApiResult<Ticket> {
    let title = required(body.title).ok_or_else(|| ApiError::field("title", "Title is required"))?;
    let description =
        required(body.description).ok_or_else(|| ApiError::field("description", "Description is required"))?;

    let organization_id = OrganizationId::parse_param(body.organization_id.as_deref())
        .or_else(|| requester.organization_id().cloned());
    let target = AccessTarget {
        organization_id,
        board_id: hint.with_body(body.board_id.as_deref()).into_inner(),
    };
    state.authorize(&requester, &target)?;
    let organization_id = target.organization_id.ok_or(AuthzError::Indeterminate)?;
    if state.store.find_organization_by_id(&organization_id).await?.is_none() {
        return Err(ApiError::not_found("Organization not found"));
    }

    let ticket = state
        .store
        .insert_ticket(NewTicket {
            organization_id,
            title,
            description,
            category: required(body.category).unwrap_or_else(|| "General".to_string()),
            location: required(body.location),
            priority: body.priority.unwrap_or(TicketPriority::Medium),
            created_by: requester.id().clone(),
        })
        .await?;

    tracing::info!("{} opened ticket {} in {}", requester.id(), ticket.id, ticket.organization_id);
    Ok(ApiResponse::created(ticket))
}

/// Resolves a ticket's owning organization and runs the access decision
async fn authorize_ticket(
    state: &AppState,
    requester: &Requester,
    raw_id: &str,
    hint: BoardHint,
) -> Result<AccessTarget, ApiError> {
    let target = ticket_target(state.store.as_ref(), raw_id, hint)
        .await?
        .ok_or_else(|| ApiError::not_found("Ticket not found"))?;
    state.authorize(requester, &target)?;
    Ok(target)
}

/// GET /api/tickets/:id
pub async fn show(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Path(id): Path<String>,
    hint: BoardHint,
) -> ApiResult<Ticket> {
    authorize_ticket(&state, &requester, &id, hint).await?;

    let ticket = state
        .store
        .find_ticket_by_id(&TicketId::from(id.trim()))
        .await?
        .ok_or_else(|| ApiError::not_found("Ticket not found"))?;

    match requester.role() {
        Role::Student if &ticket.created_by != requester.id() => {
            return Err(ApiError::forbidden("You can only view tickets you created"));
        }
        Role::Student | Role::Staff | Role::Admin | Role::BoardAdmin | Role::Superadmin => {}
    }

    Ok(ApiResponse::success(ticket))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTicket {
    #[serde(flatten)]
    pub patch: TicketPatch,
    pub board_id: Option<String>,
}

/// PATCH /api/tickets/:id - staff may only update tickets assigned to them
pub async fn update(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Path(id): Path<String>,
    hint: BoardHint,
    Json(body): Json<UpdateTicket>,
) -> ApiResult<Ticket> {
    if body.patch.is_empty() {
        return Err(ApiError::bad_request("No updatable fields supplied"));
    }

    authorize_ticket(&state, &requester, &id, hint.with_body(body.board_id.as_deref())).await?;
    let ticket_id = TicketId::from(id.trim());

    if requester.role() == Role::Staff {
        let ticket = state
            .store
            .find_ticket_by_id(&ticket_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Ticket not found"))?;
        if ticket.assigned_to.as_ref() != Some(requester.id()) {
            return Err(ApiError::forbidden("You can only update tickets assigned to you"));
        }
    }

    let ticket = state
        .store
        .update_ticket(&ticket_id, body.patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Ticket not found"))?;

    tracing::info!("{} updated ticket {} (status {})", requester.id(), ticket.id, ticket.status.as_str());
    Ok(ApiResponse::success(ticket))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignTicket {
    pub assigned_to: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Option<TicketPriority>,
    pub board_id: Option<String>,
}

/// POST /api/tickets/:id/assign - assignee must be active staff of the ticket's organization
pub async fn assign(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Path(id): Path<String>,
    hint: BoardHint,
    Json(body): Json<AssignTicket>,
) -> ApiResult<Ticket> {
    let assignee_id = UserId::parse_param(body.assigned_to.as_deref())
        .ok_or_else(|| ApiError::field("assignedTo", "assignedTo is required"))?;

    let target = authorize_ticket(&state, &requester, &id, hint.with_body(body.board_id.as_deref())).await?;

    let assignee = state
        .store
        .find_identity_by_id(&assignee_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Assignee not found"))?;

    let eligible = assignee.is_active
        && assignee.role == Role::Staff
        && assignee.organization_id.is_some()
        && assignee.organization_id == target.organization_id;
    if !eligible {
        return Err(ApiError::field(
            "assignedTo",
            "Assignee must be an active staff member of the ticket's organization",
        ));
    }

    let ticket = state
        .store
        .assign_ticket(
            &TicketId::from(id.trim()),
            TicketAssignment {
                assigned_to: assignee.id,
                due_date: body.due_date,
                priority: body.priority,
            },
        )
        .await?
        .ok_or_else(|| ApiError::not_found("Ticket not found"))?;

    tracing::info!("{} assigned ticket {} to {}", requester.id(), ticket.id, assignee_id);
    Ok(ApiResponse::success(ticket))
}

/// DELETE /api/tickets/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Path(id): Path<String>,
    hint: BoardHint,
) -> ApiResult<()> {
    authorize_ticket(&state, &requester, &id, hint).await?;

    if !state.store.delete_ticket(&TicketId::from(id.trim())).await? {
        return Err(ApiError::not_found("Ticket not found"));
    }

    tracing::info!("{} deleted ticket {}", requester.id(), id.trim());
    Ok(ApiResponse::no_content())
}
