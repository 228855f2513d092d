use async_trait::async_trait;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    NewOrganization, NewTicket, NewUser, Organization, OrganizationPatch, Ticket, TicketAssignment,
    TicketFilter, TicketPatch, User,
};
use crate::types::{BoardId, OrganizationId, Role, TicketId, UserId};

#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_identity_by_id(&self, id: &UserId) -> Result<Option<User>, DatabaseError>;

    /// Email comparison is case-insensitive
    async fn find_identity_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;

    async fn insert_identity(&self, user: NewUser) -> Result<User, DatabaseError>;

    async fn list_identities_by_role(
        &self,
        organization_id: &OrganizationId,
        role: Role,
    ) -> Result<Vec<User>, DatabaseError>;
}

#[async_trait]
pub trait OrganizationStore: Send + Sync {
    async fn find_organization_by_id(&self, id: &OrganizationId) -> Result<Option<Organization>, DatabaseError>;

    async fn find_organization_by_domain(&self, domain: &str) -> Result<Option<Organization>, DatabaseError>;

    /// Fails with `Conflict` when the domain is taken
    async fn insert_organization(&self, org: NewOrganization) -> Result<Organization, DatabaseError>;

    async fn update_organization(
        &self,
        id: &OrganizationId,
        patch: OrganizationPatch,
    ) -> Result<Option<Organization>, DatabaseError>;

    async fn delete_organization(&self, id: &OrganizationId) -> Result<bool, DatabaseError>;

    async fn list_organizations_by_board(&self, board_id: &BoardId) -> Result<Vec<Organization>, DatabaseError>;
}

#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn insert_ticket(&self, ticket: NewTicket) -> Result<Ticket, DatabaseError>;

    async fn find_ticket_by_id(&self, id: &TicketId) -> Result<Option<Ticket>, DatabaseError>;

    async fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, DatabaseError>;

    async fn update_ticket(&self, id: &TicketId, patch: TicketPatch) -> Result<Option<Ticket>, DatabaseError>;

    async fn assign_ticket(
        &self,
        id: &TicketId,
        assignment: TicketAssignment,
    ) -> Result<Option<Ticket>, DatabaseError>;

    async fn delete_ticket(&self, id: &TicketId) -> Result<bool, DatabaseError>;

    /// Owning organization of a ticket, `None` when the ticket does not exist
    async fn resolve_owning_organization(&self, id: &TicketId) -> Result<Option<OrganizationId>, DatabaseError> {
        Ok(self.find_ticket_by_id(id).await?.map(|t| t.organization_id))
    }
}

/// Everything the HTTP layer needs from persistence
#[async_trait]
pub trait Store: IdentityStore + OrganizationStore + TicketStore {
    /// Creates an organization and its first admin in one unit of work.
    /// The admin's `organization_id` is overwritten with the new organization.
    async fn register_organization(
        &self,
        org: NewOrganization,
        admin: NewUser,
    ) -> Result<(Organization, User), DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError>;
}
