//! Per-route extraction of the access target.
//!
//! Each route states where its organization id comes from: a path segment, the
//! requester's own organization, or the owning organization of a ticket. An id
//! that cannot be found leaves the target unresolved, which `decide` reports as
//! indeterminate.

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use serde::Deserialize;
use std::convert::Infallible;

use crate::authz::decision::AccessTarget;
use crate::database::{DatabaseError, TicketStore};
use crate::types::{BoardId, OrganizationId, TicketId};

#[derive(Debug, Default, Deserialize)]
struct BoardQuery {
    #[serde(rename = "boardId", alias = "board_id")]
    board_id: Option<String>,
}

/// Optional `?boardId=` hint. A malformed query string is treated as no hint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardHint(pub Option<BoardId>);

impl BoardHint {
    /// A board id sent in the request body takes precedence over the query string
    pub fn with_body(self, body: Option<&str>) -> Self {
        match BoardId::parse_param(body) {
            Some(board) => BoardHint(Some(board)),
            None => self,
        }
    }

    pub fn into_inner(self) -> Option<BoardId> {
        self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for BoardHint
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let query = Query::<BoardQuery>::try_from_uri(&parts.uri)
            .map(|Query(q)| q)
            .unwrap_or_default();
        Ok(BoardHint(BoardId::parse_param(query.board_id.as_deref())))
    }
}

/// Target for a route addressing an organization by a raw path segment
pub fn organization_target(raw_id: &str, hint: BoardHint) -> AccessTarget {
    AccessTarget {
        organization_id: OrganizationId::parse_param(Some(raw_id)),
        board_id: hint.into_inner(),
    }
}

/// Target for a ticket route. `Ok(None)` means the ticket does not exist.
pub async fn ticket_target<S>(
    store: &S,
    raw_id: &str,
    hint: BoardHint,
) -> Result<Option<AccessTarget>, DatabaseError>
where
    S: TicketStore + ?Sized,
{
    let Some(ticket_id) = TicketId::parse_param(Some(raw_id)) else {
        return Ok(Some(AccessTarget::unresolved().with_board(hint.into_inner())));
    };

    Ok(store
        .resolve_owning_organization(&ticket_id)
        .await?
        .map(|org| AccessTarget::organization(org).with_board(hint.into_inner())))
}
