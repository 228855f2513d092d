use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{OrganizationId, TicketId, TicketPriority, TicketStatus, UserId};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: TicketId,
    pub organization_id: OrganizationId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: Option<String>,
    pub priority: TicketPriority,
    pub status: TicketStatus,
    pub created_by: UserId,
    pub assigned_to: Option<UserId>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTicket {
    pub organization_id: OrganizationId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: Option<String>,
    pub priority: TicketPriority,
    pub created_by: UserId,
}

impl NewTicket {
    pub fn into_ticket(self, now: DateTime<Utc>) -> Ticket {
        Ticket {
            id: TicketId::generate(),
            organization_id: self.organization_id,
            title: self.title.trim().to_string(),
            description: self.description,
            category: self.category,
            location: self.location,
            priority: self.priority,
            status: TicketStatus::Open,
            created_by: self.created_by,
            assigned_to: None,
            due_date: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub priority: Option<TicketPriority>,
    pub status: Option<TicketStatus>,
    pub due_date: Option<DateTime<Utc>>,
}

impl TicketPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.location.is_none()
            && self.priority.is_none()
            && self.status.is_none()
            && self.due_date.is_none()
    }

    pub fn apply(self, ticket: &mut Ticket, now: DateTime<Utc>) {
        if let Some(title) = self.title {
            ticket.title = title.trim().to_string();
        }
        if let Some(description) = self.description {
            ticket.description = description;
        }
        if let Some(category) = self.category {
            ticket.category = category;
        }
        if let Some(location) = self.location {
            ticket.location = Some(location);
        }
        if let Some(priority) = self.priority {
            ticket.priority = priority;
        }
        if let Some(status) = self.status {
            ticket.status = status;
        }
        if let Some(due_date) = self.due_date {
            ticket.due_date = Some(due_date);
        }
        ticket.updated_at = now;
    }
}

/// Assignment always moves the ticket to `Assigned`.
#[derive(Debug, Clone)]
pub struct TicketAssignment {
    pub assigned_to: UserId,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Option<TicketPriority>,
}

impl TicketAssignment {
    pub fn apply(self, ticket: &mut Ticket, now: DateTime<Utc>) {
        ticket.assigned_to = Some(self.assigned_to);
        if let Some(due_date) = self.due_date {
            ticket.due_date = Some(due_date);
        }
        if let Some(priority) = self.priority {
            ticket.priority = priority;
        }
        ticket.status = TicketStatus::Assigned;
        ticket.updated_at = now;
    }
}

/// Every populated field narrows the result set.
#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    pub organization_id: Option<OrganizationId>,
    pub created_by: Option<UserId>,
    pub assigned_to: Option<UserId>,
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
}

impl TicketFilter {
    pub fn matches(&self, ticket: &Ticket) -> bool {
        self.organization_id.as_ref().map_or(true, |o| &ticket.organization_id == o)
            && self.created_by.as_ref().map_or(true, |u| &ticket.created_by == u)
            && self
                .assigned_to
                .as_ref()
                .map_or(true, |u| ticket.assigned_to.as_ref() == Some(u))
            && self.status.map_or(true, |s| ticket.status == s)
            && self.priority.map_or(true, |p| ticket.priority == p)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketStats {
    pub total: usize,
    /// Open or Pending
    pub pending: usize,
    pub assigned: usize,
    pub in_progress: usize,
    pub resolved: usize,
    pub completed: usize,
}

impl TicketStats {
    pub fn from_tickets(tickets: &[Ticket]) -> Self {
        let mut stats = TicketStats { total: tickets.len(), ..Default::default() };
        for ticket in tickets {
            match ticket.status {
                TicketStatus::Open | TicketStatus::Pending => stats.pending += 1,
                TicketStatus::Assigned => stats.assigned += 1,
                TicketStatus::InProgress => stats.in_progress += 1,
                TicketStatus::Resolved => stats.resolved += 1,
                TicketStatus::Completed => stats.completed += 1,
            }
        }
        stats
    }
}
