// handlers/protected/users.rs - GET /api/users/staff

use axum::{
    extract::{Query, State},
    Extension,
};
use serde::Deserialize;

use crate::authz::{AccessTarget, AuthzError, BoardHint, Requester};
use crate::database::models::User;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;
use crate::types::{OrganizationId, Role};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffQuery {
    pub organization_id: Option<String>,
}

/// Staff members of the requester's organization, or of `?organizationId=` when access allows
pub async fn staff(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Query(query): Query<StaffQuery>,
    hint: BoardHint,
) -> ApiResult<Vec<User>> {
    let organization_id = OrganizationId::parse_param(query.organization_id.as_deref())
        .or_else(|| requester.organization_id().cloned());
    let target = AccessTarget {
        organization_id,
        board_id: hint.into_inner(),
    };
    state.authorize(&requester, &target)?;

    let org_id = target.organization_id.as_ref().ok_or(AuthzError::Indeterminate)?;
    let mut staff = state.store.list_identities_by_role(org_id, Role::Staff).await?;
    staff.retain(|u| u.is_active);

    let count = staff.len();
    Ok(ApiResponse::list(staff, count))
}
