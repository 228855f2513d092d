// handlers/protected/boards.rs - GET /api/boards/:board_id/organizations

use axum::{
    extract::{Path, State},
    Extension,
};

use crate::authz::Requester;
use crate::database::models::Organization;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;
use crate::types::{BoardId, Role};

/// Organizations grouped under a board. A board_admin may only list the board
/// its own organization belongs to.
pub async fn organizations(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Path(board_id): Path<String>,
) -> ApiResult<Vec<Organization>> {
    let board_id = BoardId::parse_param(Some(&board_id)).ok_or_else(|| ApiError::bad_request("Board id is required"))?;

    // The route guard admits only board_admin and superadmin
    if requester.role() != Role::Superadmin && requester.board_id() != Some(&board_id) {
        tracing::info!("{} denied listing of board {}", requester.id(), board_id);
        return Err(ApiError::forbidden("Forbidden: board mismatch"));
    }

    let organizations = state.store.list_organizations_by_board(&board_id).await?;
    let count = organizations.len();
    Ok(ApiResponse::list(organizations, count))
}
