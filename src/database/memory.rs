use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::database::manager::DatabaseError;
use crate::database::models::organization::normalize_domain;
use crate::database::models::user::normalize_email;
use crate::database::models::{
    NewOrganization, NewTicket, NewUser, Organization, OrganizationPatch, Ticket, TicketAssignment,
    TicketFilter, TicketPatch, User,
};
use crate::database::store::{IdentityStore, OrganizationStore, Store, TicketStore};
use crate::types::{BoardId, OrganizationId, Role, TicketId, UserId};

#[derive(Default)]
struct MemoryState {
    users: HashMap<UserId, User>,
    organizations: HashMap<OrganizationId, Organization>,
    tickets: HashMap<TicketId, Ticket>,
}

impl MemoryState {
    fn email_taken(&self, email: &str) -> bool {
        self.users.values().any(|u| u.email == email)
    }

    fn domain_taken(&self, domain: &str, except: Option<&OrganizationId>) -> bool {
        self.organizations
            .values()
            .any(|o| o.domain == domain && Some(&o.id) != except)
    }
}

/// Process-local store used by tests and `HELPDESK_STORE=memory`
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fully formed user, bypassing id generation (fixtures)
    pub async fn put_user(&self, user: User) {
        self.state.write().await.users.insert(user.id.clone(), user);
    }

    pub async fn put_organization(&self, org: Organization) {
        self.state.write().await.organizations.insert(org.id.clone(), org);
    }

    pub async fn put_ticket(&self, ticket: Ticket) {
        self.state.write().await.tickets.insert(ticket.id.clone(), ticket);
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn find_identity_by_id(&self, id: &UserId) -> Result<Option<User>, DatabaseError> {
        Ok(self.state.read().await.users.get(id).cloned())
    }

    async fn find_identity_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let email = normalize_email(email);
        Ok(self
            .state
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn insert_identity(&self, user: NewUser) -> Result<User, DatabaseError> {
        let user = user.into_user(Utc::now());
        let mut state = self.state.write().await;
        if state.email_taken(&user.email) {
            return Err(DatabaseError::Conflict(format!("email '{}' already registered", user.email)));
        }
        state.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn list_identities_by_role(
        &self,
        organization_id: &OrganizationId,
        role: Role,
    ) -> Result<Vec<User>, DatabaseError> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state
            .users
            .values()
            .filter(|u| u.role == role && u.organization_id.as_ref() == Some(organization_id))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }
}

#[async_trait]
impl OrganizationStore for MemoryStore {
    async fn find_organization_by_id(&self, id: &OrganizationId) -> Result<Option<Organization>, DatabaseError> {
        Ok(self.state.read().await.organizations.get(id).cloned())
    }

    async fn find_organization_by_domain(&self, domain: &str) -> Result<Option<Organization>, DatabaseError> {
        let domain = normalize_domain(domain);
        Ok(self
            .state
            .read()
            .await
            .organizations
            .values()
            .find(|o| o.domain == domain)
            .cloned())
    }

    async fn insert_organization(&self, org: NewOrganization) -> Result<Organization, DatabaseError> {
        let org = org.into_organization(Utc::now());
        let mut state = self.state.write().await;
        if state.domain_taken(&org.domain, None) {
            return Err(DatabaseError::Conflict(format!("domain '{}' already exists", org.domain)));
        }
        state.organizations.insert(org.id.clone(), org.clone());
        Ok(org)
    }

    async fn update_organization(
        &self,
        id: &OrganizationId,
        patch: OrganizationPatch,
    ) -> Result<Option<Organization>, DatabaseError> {
        let mut state = self.state.write().await;
        if let Some(domain) = patch.domain.as_deref() {
            if state.domain_taken(&normalize_domain(domain), Some(id)) {
                return Err(DatabaseError::Conflict(format!("domain '{}' already exists", domain)));
            }
        }
        let Some(org) = state.organizations.get_mut(id) else {
            return Ok(None);
        };
        patch.apply(org, Utc::now());
        Ok(Some(org.clone()))
    }

    async fn delete_organization(&self, id: &OrganizationId) -> Result<bool, DatabaseError> {
        let mut state = self.state.write().await;
        if state.organizations.remove(id).is_none() {
            return Ok(false);
        }

        // Same effect as the foreign keys: tickets cascade, members are detached
        state.tickets.retain(|_, ticket| &ticket.organization_id != id);
        for user in state.users.values_mut() {
            if user.organization_id.as_ref() == Some(id) {
                user.organization_id = None;
            }
        }
        Ok(true)
    }

    async fn list_organizations_by_board(&self, board_id: &BoardId) -> Result<Vec<Organization>, DatabaseError> {
        let state = self.state.read().await;
        let mut orgs: Vec<Organization> = state
            .organizations
            .values()
            .filter(|o| o.board_id.as_ref() == Some(board_id))
            .cloned()
            .collect();
        orgs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(orgs)
    }
}

#[async_trait]
impl TicketStore for MemoryStore {
    async fn insert_ticket(&self, ticket: NewTicket) -> Result<Ticket, DatabaseError> {
        let ticket = ticket.into_ticket(Utc::now());
        self.state.write().await.tickets.insert(ticket.id.clone(), ticket.clone());
        Ok(ticket)
    }

    async fn find_ticket_by_id(&self, id: &TicketId) -> Result<Option<Ticket>, DatabaseError> {
        Ok(self.state.read().await.tickets.get(id).cloned())
    }

    async fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, DatabaseError> {
        let state = self.state.read().await;
        let mut tickets: Vec<Ticket> = state.tickets.values().filter(|t| filter.matches(t)).cloned().collect();
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(tickets)
    }

    async fn update_ticket(&self, id: &TicketId, patch: TicketPatch) -> Result<Option<Ticket>, DatabaseError> {
        let mut state = self.state.write().await;
        Ok(state.tickets.get_mut(id).map(|ticket| {
            patch.apply(ticket, Utc::now());
            ticket.clone()
        }))
    }

    async fn assign_ticket(
        &self,
        id: &TicketId,
        assignment: TicketAssignment,
    ) -> Result<Option<Ticket>, DatabaseError> {
        let mut state = self.state.write().await;
        Ok(state.tickets.get_mut(id).map(|ticket| {
            assignment.apply(ticket, Utc::now());
            ticket.clone()
        }))
    }

    async fn delete_ticket(&self, id: &TicketId) -> Result<bool, DatabaseError> {
        Ok(self.state.write().await.tickets.remove(id).is_some())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn register_organization(
        &self,
        org: NewOrganization,
        admin: NewUser,
    ) -> Result<(Organization, User), DatabaseError> {
        let now = Utc::now();
        let org = org.into_organization(now);
        let mut admin = admin.into_user(now);
        admin.organization_id = Some(org.id.clone());

        // Single write guard so both checks and both inserts are atomic
        let mut state = self.state.write().await;
        if state.domain_taken(&org.domain, None) {
            return Err(DatabaseError::Conflict(format!("domain '{}' already exists", org.domain)));
        }
        if state.email_taken(&admin.email) {
            return Err(DatabaseError::Conflict(format!("email '{}' already registered", admin.email)));
        }
        state.organizations.insert(org.id.clone(), org.clone());
        state.users.insert(admin.id.clone(), admin.clone());
        Ok((org, admin))
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Subscription, TicketPriority};

    fn new_org(domain: &str) -> NewOrganization {
        NewOrganization {
            name: "Campus".into(),
            domain: domain.into(),
            board_id: None,
            subscription: Subscription::Free,
            created_by: None,
        }
    }

    fn new_user(email: &str, role: Role) -> NewUser {
        NewUser {
            name: "Someone".into(),
            email: email.into(),
            password_hash: "hash".into(),
            role,
            organization_id: None,
            permissions: vec![],
        }
    }

    #[tokio::test]
    async fn register_links_admin_to_new_org() {
        let store = MemoryStore::new();
        let (org, admin) = store
            .register_organization(new_org("campus.edu"), new_user("admin@campus.edu", Role::Admin))
            .await
            .unwrap();
        assert_eq!(admin.organization_id, Some(org.id.clone()));
        assert!(store.find_identity_by_email("ADMIN@campus.edu").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn duplicate_domain_conflicts() {
        let store = MemoryStore::new();
        store.insert_organization(new_org("campus.edu")).await.unwrap();
        let err = store.insert_organization(new_org(" Campus.EDU ")).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));

        let err = store
            .register_organization(new_org("campus.edu"), new_user("x@campus.edu", Role::Admin))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));
        assert!(store.find_identity_by_email("x@campus.edu").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn resolves_ticket_owner() {
        let store = MemoryStore::new();
        let ticket = store
            .insert_ticket(NewTicket {
                organization_id: OrganizationId::new("org1"),
                title: "Water leak".into(),
                description: "Dripping from ceiling".into(),
                category: "Plumbing".into(),
                location: None,
                priority: TicketPriority::Critical,
                created_by: UserId::new("u1"),
            })
            .await
            .unwrap();

        assert_eq!(
            store.resolve_owning_organization(&ticket.id).await.unwrap(),
            Some(OrganizationId::new("org1"))
        );
        assert_eq!(store.resolve_owning_organization(&TicketId::new("nope")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn deleting_organization_cascades_tickets_and_detaches_members() {
        let store = MemoryStore::new();
        let (org, admin) = store
            .register_organization(new_org("campus.edu"), new_user("admin@campus.edu", Role::Admin))
            .await
            .unwrap();
        let ticket = store
            .insert_ticket(NewTicket {
                organization_id: org.id.clone(),
                title: "Broken AC".into(),
                description: "Room 101".into(),
                category: "HVAC".into(),
                location: None,
                priority: TicketPriority::High,
                created_by: admin.id.clone(),
            })
            .await
            .unwrap();

        assert!(store.delete_organization(&org.id).await.unwrap());
        assert!(store.find_ticket_by_id(&ticket.id).await.unwrap().is_none());
        let admin = store.find_identity_by_id(&admin.id).await.unwrap().unwrap();
        assert_eq!(admin.organization_id, None);

        assert!(!store.delete_organization(&org.id).await.unwrap());
    }
}
