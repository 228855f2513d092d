//! Organization-scoped access decision.
//!
//! `decide` is pure: it only looks at the requester snapshot loaded by the
//! authentication middleware and the target built by the route. Rules are
//! evaluated in order and the first match wins:
//!
//! 1. superadmin
//! 2. same organization
//! 3. board_admin whose organization's board equals the supplied board id
//!
//! Anything else is denied.

use serde::Serialize;
use thiserror::Error;

use crate::database::models::{Organization, User};
use crate::types::{BoardId, OrganizationId, Role, UserId};

/// Identity plus its organization, as loaded once per request
#[derive(Debug, Clone)]
pub struct Requester {
    pub identity: User,
    pub organization: Option<Organization>,
}

impl Requester {
    /// An organization that is not the identity's own is discarded.
    pub fn new(identity: User, organization: Option<Organization>) -> Self {
        let organization = organization.filter(|org| identity.organization_id.as_ref() == Some(&org.id));
        Self { identity, organization }
    }

    pub fn id(&self) -> &UserId {
        &self.identity.id
    }

    pub fn role(&self) -> Role {
        self.identity.role
    }

    pub fn organization_id(&self) -> Option<&OrganizationId> {
        self.identity.organization_id.as_ref()
    }

    /// Board of the requester's own organization
    pub fn board_id(&self) -> Option<&BoardId> {
        self.organization.as_ref().and_then(|org| org.board_id.as_ref())
    }

    pub fn is_active(&self) -> bool {
        self.identity.is_active
    }
}

/// What a request wants to touch. Built per route by the extractors in `target`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessTarget {
    pub organization_id: Option<OrganizationId>,
    /// Board hint. Routes that load the target fill it from the target record;
    /// others take it from the caller and it is not cross-checked.
    pub board_id: Option<BoardId>,
}

impl AccessTarget {
    pub fn organization(organization_id: OrganizationId) -> Self {
        Self {
            organization_id: Some(organization_id),
            board_id: None,
        }
    }

    pub fn unresolved() -> Self {
        Self::default()
    }

    pub fn with_board(mut self, board_id: Option<BoardId>) -> Self {
        self.board_id = board_id;
        self
    }
}

/// Which rule granted access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Grant {
    Superadmin,
    OrganizationMember,
    BoardAdmin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    OrganizationMismatch,
    NotOnboarded,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::OrganizationMismatch => "organization mismatch",
            DenyReason::NotOnboarded => "identity has no organization",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow(Grant),
    Deny(DenyReason),
    Unauthenticated,
    Indeterminate,
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allow(_))
    }

    pub fn into_result(self) -> Result<Grant, AuthzError> {
        match self {
            AccessDecision::Allow(grant) => Ok(grant),
            AccessDecision::Deny(reason) => Err(AuthzError::Forbidden(reason)),
            AccessDecision::Unauthenticated => Err(AuthzError::Unauthenticated),
            AccessDecision::Indeterminate => Err(AuthzError::Indeterminate),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthzError {
    #[error("You are not logged in! Please log in to get access.")]
    Unauthenticated,

    #[error("Organization id could not be determined for authorization")]
    Indeterminate,

    #[error("Forbidden: {}", .0.as_str())]
    Forbidden(DenyReason),

    #[error("You do not have permission to perform this action")]
    RoleNotPermitted { role: Role },
}

pub fn decide(requester: Option<&Requester>, target: &AccessTarget) -> AccessDecision {
    let requester = match requester {
        Some(r) if r.is_active() => r,
        _ => return AccessDecision::Unauthenticated,
    };

    let Some(target_org) = target.organization_id.as_ref() else {
        return AccessDecision::Indeterminate;
    };

    match requester.role() {
        Role::Superadmin => return AccessDecision::Allow(Grant::Superadmin),
        Role::Student | Role::Staff | Role::Admin | Role::BoardAdmin => {}
    }

    let Some(own_org) = requester.organization_id() else {
        return AccessDecision::Deny(DenyReason::NotOnboarded);
    };

    if own_org == target_org {
        return AccessDecision::Allow(Grant::OrganizationMember);
    }

    match requester.role() {
        Role::BoardAdmin => match (requester.board_id(), target.board_id.as_ref()) {
            (Some(own_board), Some(hint)) if own_board == hint => AccessDecision::Allow(Grant::BoardAdmin),
            _ => AccessDecision::Deny(DenyReason::OrganizationMismatch),
        },
        Role::Student | Role::Staff | Role::Admin | Role::Superadmin => {
            AccessDecision::Deny(DenyReason::OrganizationMismatch)
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::database::models::{NewOrganization, NewUser};
    use crate::types::Subscription;
    use chrono::Utc;

    pub fn organization(id: &str, board: Option<&str>) -> Organization {
        let mut org = NewOrganization {
            name: format!("Organization {id}"),
            domain: format!("{id}.example.edu"),
            board_id: board.map(BoardId::from),
            subscription: Subscription::Free,
            created_by: None,
        }
        .into_organization(Utc::now());
        org.id = OrganizationId::from(id);
        org
    }

    pub fn requester(role: Role, org: Option<&str>, board: Option<&str>) -> Requester {
        let identity = NewUser {
            name: "Test User".into(),
            email: "test@example.edu".into(),
            password_hash: String::new(),
            role,
            organization_id: org.map(OrganizationId::from),
            permissions: vec![],
        }
        .into_user(Utc::now());
        Requester::new(identity, org.map(|id| organization(id, board)))
    }

    pub fn target(org: Option<&str>, board: Option<&str>) -> AccessTarget {
        AccessTarget {
            organization_id: org.map(OrganizationId::from),
            board_id: board.map(BoardId::from),
        }
    }
}
