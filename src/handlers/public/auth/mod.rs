// handlers/public/auth/mod.rs - Public authentication handlers
//
// Token acquisition endpoints that do not require authentication.

use serde::Serialize;

use crate::database::models::{Organization, User};

pub mod login; // POST /api/auth/login - authenticate and get a bearer token
pub mod register; // POST /api/auth/register - create organization and first admin

pub use login::login_post;
pub use register::register_post;

/// Body returned by every token-issuing endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenGrant {
    pub token: String,
    pub expires_in: i64,
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<Organization>,
}

/// Trims and drops empty strings from an optional request field
pub(crate) fn required(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
