use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{BoardId, OrganizationId, Subscription, UserId};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    pub domain: String,
    pub board_id: Option<BoardId>,
    pub is_active: bool,
    pub subscription: Subscription,
    pub subscription_expires: Option<DateTime<Utc>>,
    pub theme: String,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOrganization {
    pub name: String,
    pub domain: String,
    pub board_id: Option<BoardId>,
    pub subscription: Subscription,
    pub created_by: Option<UserId>,
}

impl NewOrganization {
    pub fn into_organization(self, now: DateTime<Utc>) -> Organization {
        Organization {
            id: OrganizationId::generate(),
            name: self.name.trim().to_string(),
            domain: normalize_domain(&self.domain),
            board_id: self.board_id,
            is_active: true,
            subscription: self.subscription,
            subscription_expires: None,
            theme: "light".to_string(),
            created_by: self.created_by,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update; `None` leaves the field untouched.
///
/// `board_id` distinguishes an absent key (keep) from an explicit `null`
/// (`Some(None)`, detach from the board).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationPatch {
    pub name: Option<String>,
    pub domain: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub board_id: Option<Option<BoardId>>,
    pub is_active: Option<bool>,
    pub subscription: Option<Subscription>,
    pub subscription_expires: Option<DateTime<Utc>>,
    pub theme: Option<String>,
}

impl OrganizationPatch {
    pub fn apply(self, org: &mut Organization, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            org.name = name.trim().to_string();
        }
        if let Some(domain) = self.domain {
            org.domain = normalize_domain(&domain);
        }
        if let Some(board_id) = self.board_id {
            org.board_id = board_id;
        }
        if let Some(is_active) = self.is_active {
            org.is_active = is_active;
        }
        if let Some(subscription) = self.subscription {
            org.subscription = subscription;
        }
        if let Some(expires) = self.subscription_expires {
            org.subscription_expires = Some(expires);
        }
        if let Some(theme) = self.theme {
            org.theme = theme;
        }
        org.updated_at = now;
    }
}

pub fn normalize_domain(domain: &str) -> String {
    domain.trim().to_ascii_lowercase()
}

/// Marks a key that was present in the body, even when its value is `null`
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
