pub mod decision;
pub mod role_guard;
pub mod target;

pub use decision::{decide, AccessDecision, AccessTarget, AuthzError, DenyReason, Grant, Requester};
pub use role_guard::{restrict_to, RoleGuard};
pub use target::{organization_target, ticket_target, BoardHint};
