// handlers/protected/organizations.rs - organization CRUD and the scoped data read
//
// POST   /api/organizations            admin, superadmin
// GET    /api/organizations/:id        admin, superadmin
// PATCH  /api/organizations/:id        superadmin
// DELETE /api/organizations/:id        superadmin
// GET    /api/orgs/:org_id/data        any role

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::authz::{organization_target, AccessTarget, AuthzError, BoardHint, Grant, Requester};
use crate::database::models::{NewOrganization, Organization, OrganizationPatch};
use crate::database::DatabaseError;
use crate::error::ApiError;
use crate::handlers::public::auth::required;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;
use crate::types::{BoardId, OrganizationId, Subscription};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrganization {
    pub name: Option<String>,
    pub domain: Option<String>,
    pub board_id: Option<String>,
    #[serde(default)]
    pub subscription: Subscription,
}

/// POST /api/organizations
pub async fn create(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Json(body): Json<CreateOrganization>,
) -> ApiResult<Organization> {
    let name = required(body.name).ok_or_else(|| ApiError::field("name", "Organization name is required"))?;
    let domain = required(body.domain).ok_or_else(|| ApiError::field("domain", "Domain is required"))?;

    let organization = state
        .store
        .insert_organization(NewOrganization {
            name,
            domain,
            board_id: BoardId::parse_param(body.board_id.as_deref()),
            subscription: body.subscription,
            created_by: Some(requester.id().clone()),
        })
        .await
        .map_err(|err| match err {
            DatabaseError::Conflict(_) => ApiError::conflict("Organization with this domain already exists"),
            other => other.into(),
        })?;

    tracing::info!("{} created organization {} ({})", requester.id(), organization.id, organization.domain);
    Ok(ApiResponse::created(organization))
}

/// GET /api/organizations/:id
pub async fn show(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Path(id): Path<String>,
    hint: BoardHint,
) -> ApiResult<Organization> {
    let target = organization_target(&id, hint);
    state.authorize(&requester, &target)?;

    let org_id = target.organization_id.as_ref().ok_or(AuthzError::Indeterminate)?;
    let organization = state
        .store
        .find_organization_by_id(org_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Organization not found"))?;

    Ok(ApiResponse::success(organization))
}

/// PATCH /api/organizations/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Path(id): Path<String>,
    hint: BoardHint,
    Json(patch): Json<OrganizationPatch>,
) -> ApiResult<Organization> {
    let target = organization_target(&id, hint);
    state.authorize(&requester, &target)?;

    let org_id = target.organization_id.as_ref().ok_or(AuthzError::Indeterminate)?;
    let organization = state
        .store
        .update_organization(org_id, patch)
        .await
        .map_err(|err| match err {
            DatabaseError::Conflict(_) => ApiError::conflict("Organization with this domain already exists"),
            other => other.into(),
        })?
        .ok_or_else(|| ApiError::not_found("Organization not found"))?;

    tracing::info!("{} updated organization {}", requester.id(), organization.id);
    Ok(ApiResponse::success(organization))
}

/// DELETE /api/organizations/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Path(id): Path<String>,
    hint: BoardHint,
) -> ApiResult<()> {
    let target = organization_target(&id, hint);
    state.authorize(&requester, &target)?;

    let org_id = target.organization_id.as_ref().ok_or(AuthzError::Indeterminate)?;
    if !state.store.delete_organization(org_id).await? {
        return Err(ApiError::not_found("Organization not found"));
    }

    tracing::info!("{} deleted organization {}", requester.id(), org_id);
    Ok(ApiResponse::no_content())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationData {
    pub organization: Organization,
    pub granted_by: Grant,
}

/// GET /api/orgs/:org_id/data - organization-scoped read reporting which rule granted access.
///
/// The board rule is evaluated against the target organization's own board,
/// so a caller-supplied `?boardId=` has no effect here.
pub async fn scoped_data(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Path(org_id): Path<String>,
) -> ApiResult<OrganizationData> {
    let org_id = OrganizationId::parse_param(Some(org_id.as_str())).ok_or(AuthzError::Indeterminate)?;
    let organization = state
        .store
        .find_organization_by_id(&org_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Organization not found"))?;

    let target = AccessTarget::organization(org_id).with_board(organization.board_id.clone());
    let granted_by = state.authorize(&requester, &target)?;

    Ok(ApiResponse::success(OrganizationData {
        organization,
        granted_by,
    }))
}
