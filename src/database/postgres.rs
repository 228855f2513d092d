use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};

use crate::database::manager::DatabaseError;
use crate::database::models::organization::normalize_domain;
use crate::database::models::user::normalize_email;
use crate::database::models::{
    NewOrganization, NewTicket, NewUser, Organization, OrganizationPatch, Ticket, TicketAssignment,
    TicketFilter, TicketPatch, User,
};
use crate::database::store::{IdentityStore, OrganizationStore, Store, TicketStore};
use crate::types::{BoardId, OrganizationId, Role, TicketId, UserId};

const SELECT_USER: &str = "SELECT id, name, email, password_hash, role, organization_id, permissions, \
     is_active, password_changed_at, created_at, updated_at FROM users";

const SELECT_ORGANIZATION: &str = "SELECT id, name, domain, board_id, is_active, subscription, \
     subscription_expires, theme, created_by, created_at, updated_at FROM organizations";

const SELECT_TICKET: &str = "SELECT id, organization_id, title, description, category, location, priority, \
     status, created_by, assigned_to, due_date, created_at, updated_at FROM tickets";

#[derive(FromRow)]
struct UserRow {
    id: String,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    organization_id: Option<String>,
    permissions: Vec<String>,
    is_active: bool,
    password_changed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = DatabaseError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role: Role = row
            .role
            .parse()
            .map_err(|e| DatabaseError::Corrupt(format!("user {}: {}", row.id, e)))?;
        Ok(User {
            id: UserId::new(row.id),
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role,
            organization_id: row.organization_id.map(OrganizationId::new),
            permissions: row.permissions,
            is_active: row.is_active,
            password_changed_at: row.password_changed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct OrganizationRow {
    id: String,
    name: String,
    domain: String,
    board_id: Option<String>,
    is_active: bool,
    subscription: String,
    subscription_expires: Option<DateTime<Utc>>,
    theme: String,
    created_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrganizationRow> for Organization {
    type Error = DatabaseError;

    fn try_from(row: OrganizationRow) -> Result<Self, Self::Error> {
        let subscription = row
            .subscription
            .parse()
            .map_err(|e| DatabaseError::Corrupt(format!("organization {}: {}", row.id, e)))?;
        Ok(Organization {
            id: OrganizationId::new(row.id),
            name: row.name,
            domain: row.domain,
            board_id: row.board_id.map(BoardId::new),
            is_active: row.is_active,
            subscription,
            subscription_expires: row.subscription_expires,
            theme: row.theme,
            created_by: row.created_by.map(UserId::new),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct TicketRow {
    id: String,
    organization_id: String,
    title: String,
    description: String,
    category: String,
    location: Option<String>,
    priority: String,
    status: String,
    created_by: String,
    assigned_to: Option<String>,
    due_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TicketRow> for Ticket {
    type Error = DatabaseError;

    fn try_from(row: TicketRow) -> Result<Self, Self::Error> {
        let priority = row
            .priority
            .parse()
            .map_err(|e| DatabaseError::Corrupt(format!("ticket {}: {}", row.id, e)))?;
        let status = row
            .status
            .parse()
            .map_err(|e| DatabaseError::Corrupt(format!("ticket {}: {}", row.id, e)))?;
        Ok(Ticket {
            id: TicketId::new(row.id),
            organization_id: OrganizationId::new(row.organization_id),
            title: row.title,
            description: row.description,
            category: row.category,
            location: row.location,
            priority,
            status,
            created_by: UserId::new(row.created_by),
            assigned_to: row.assigned_to.map(UserId::new),
            due_date: row.due_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn write_user(conn: &mut PgConnection, user: &User) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, role, organization_id, permissions, \
             is_active, password_changed_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(user.id.as_str())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.organization_id.as_ref().map(|o| o.as_str()))
        .bind(&user.permissions)
        .bind(user.is_active)
        .bind(user.password_changed_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(conn)
        .await
        .map_err(|e| DatabaseError::from_write(e, format!("email '{}' already registered", user.email)))?;
        Ok(())
    }

    async fn write_organization(conn: &mut PgConnection, org: &Organization) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO organizations (id, name, domain, board_id, is_active, subscription, \
             subscription_expires, theme, created_by, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(org.id.as_str())
        .bind(&org.name)
        .bind(&org.domain)
        .bind(org.board_id.as_ref().map(|b| b.as_str()))
        .bind(org.is_active)
        .bind(org.subscription.as_str())
        .bind(org.subscription_expires)
        .bind(&org.theme)
        .bind(org.created_by.as_ref().map(|u| u.as_str()))
        .bind(org.created_at)
        .bind(org.updated_at)
        .execute(conn)
        .await
        .map_err(|e| DatabaseError::from_write(e, format!("domain '{}' already exists", org.domain)))?;
        Ok(())
    }

    async fn rewrite_ticket(conn: &mut PgConnection, ticket: &Ticket) -> Result<(), DatabaseError> {
        sqlx::query(
            "UPDATE tickets SET title = $2, description = $3, category = $4, location = $5, priority = $6, \
             status = $7, assigned_to = $8, due_date = $9, updated_at = $10 WHERE id = $1",
        )
        .bind(ticket.id.as_str())
        .bind(&ticket.title)
        .bind(&ticket.description)
        .bind(&ticket.category)
        .bind(ticket.location.as_deref())
        .bind(ticket.priority.as_str())
        .bind(ticket.status.as_str())
        .bind(ticket.assigned_to.as_ref().map(|u| u.as_str()))
        .bind(ticket.due_date)
        .bind(ticket.updated_at)
        .execute(conn)
        .await?;
        Ok(())
    }

    async fn lock_ticket(conn: &mut PgConnection, id: &TicketId) -> Result<Option<Ticket>, DatabaseError> {
        let sql = format!("{} WHERE id = $1 FOR UPDATE", SELECT_TICKET);
        sqlx::query_as::<_, TicketRow>(&sql)
            .bind(id.as_str())
            .fetch_optional(conn)
            .await?
            .map(Ticket::try_from)
            .transpose()
    }
}

#[async_trait]
impl IdentityStore for PgStore {
    async fn find_identity_by_id(&self, id: &UserId) -> Result<Option<User>, DatabaseError> {
        let sql = format!("{} WHERE id = $1", SELECT_USER);
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_identity_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let sql = format!("{} WHERE email = $1", SELECT_USER);
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn insert_identity(&self, user: NewUser) -> Result<User, DatabaseError> {
        let user = user.into_user(Utc::now());
        let mut conn = self.pool.acquire().await?;
        Self::write_user(&mut conn, &user).await?;
        Ok(user)
    }

    async fn list_identities_by_role(
        &self,
        organization_id: &OrganizationId,
        role: Role,
    ) -> Result<Vec<User>, DatabaseError> {
        let sql = format!("{} WHERE organization_id = $1 AND role = $2 ORDER BY name", SELECT_USER);
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(organization_id.as_str())
            .bind(role.as_str())
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(User::try_from)
            .collect()
    }
}

#[async_trait]
impl OrganizationStore for PgStore {
    async fn find_organization_by_id(&self, id: &OrganizationId) -> Result<Option<Organization>, DatabaseError> {
        let sql = format!("{} WHERE id = $1", SELECT_ORGANIZATION);
        sqlx::query_as::<_, OrganizationRow>(&sql)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(Organization::try_from)
            .transpose()
    }

    async fn find_organization_by_domain(&self, domain: &str) -> Result<Option<Organization>, DatabaseError> {
        let sql = format!("{} WHERE domain = $1", SELECT_ORGANIZATION);
        sqlx::query_as::<_, OrganizationRow>(&sql)
            .bind(normalize_domain(domain))
            .fetch_optional(&self.pool)
            .await?
            .map(Organization::try_from)
            .transpose()
    }

    async fn insert_organization(&self, org: NewOrganization) -> Result<Organization, DatabaseError> {
        let org = org.into_organization(Utc::now());
        let mut conn = self.pool.acquire().await?;
        Self::write_organization(&mut conn, &org).await?;
        Ok(org)
    }

    async fn update_organization(
        &self,
        id: &OrganizationId,
        patch: OrganizationPatch,
    ) -> Result<Option<Organization>, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("{} WHERE id = $1 FOR UPDATE", SELECT_ORGANIZATION);
        let row = sqlx::query_as::<_, OrganizationRow>(&sql)
            .bind(id.as_str())
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let mut org = Organization::try_from(row)?;
        patch.apply(&mut org, Utc::now());

        sqlx::query(
            "UPDATE organizations SET name = $2, domain = $3, board_id = $4, is_active = $5, subscription = $6, \
             subscription_expires = $7, theme = $8, updated_at = $9 WHERE id = $1",
        )
        .bind(org.id.as_str())
        .bind(&org.name)
        .bind(&org.domain)
        .bind(org.board_id.as_ref().map(|b| b.as_str()))
        .bind(org.is_active)
        .bind(org.subscription.as_str())
        .bind(org.subscription_expires)
        .bind(&org.theme)
        .bind(org.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| DatabaseError::from_write(e, format!("domain '{}' already exists", org.domain)))?;

        tx.commit().await?;
        Ok(Some(org))
    }

    async fn delete_organization(&self, id: &OrganizationId) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM organizations WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_organizations_by_board(&self, board_id: &BoardId) -> Result<Vec<Organization>, DatabaseError> {
        let sql = format!("{} WHERE board_id = $1 ORDER BY name", SELECT_ORGANIZATION);
        sqlx::query_as::<_, OrganizationRow>(&sql)
            .bind(board_id.as_str())
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Organization::try_from)
            .collect()
    }
}

#[async_trait]
impl TicketStore for PgStore {
    async fn insert_ticket(&self, ticket: NewTicket) -> Result<Ticket, DatabaseError> {
        let ticket = ticket.into_ticket(Utc::now());
        sqlx::query(
            "INSERT INTO tickets (id, organization_id, title, description, category, location, priority, \
             status, created_by, assigned_to, due_date, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(ticket.id.as_str())
        .bind(ticket.organization_id.as_str())
        .bind(&ticket.title)
        .bind(&ticket.description)
        .bind(&ticket.category)
        .bind(ticket.location.as_deref())
        .bind(ticket.priority.as_str())
        .bind(ticket.status.as_str())
        .bind(ticket.created_by.as_str())
        .bind(ticket.assigned_to.as_ref().map(|u| u.as_str()))
        .bind(ticket.due_date)
        .bind(ticket.created_at)
        .bind(ticket.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(ticket)
    }

    async fn find_ticket_by_id(&self, id: &TicketId) -> Result<Option<Ticket>, DatabaseError> {
        let sql = format!("{} WHERE id = $1", SELECT_TICKET);
        sqlx::query_as::<_, TicketRow>(&sql)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(Ticket::try_from)
            .transpose()
    }

    async fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, DatabaseError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(SELECT_TICKET);
        qb.push(" WHERE TRUE");
        if let Some(org) = &filter.organization_id {
            qb.push(" AND organization_id = ").push_bind(org.as_str().to_string());
        }
        if let Some(user) = &filter.created_by {
            qb.push(" AND created_by = ").push_bind(user.as_str().to_string());
        }
        if let Some(user) = &filter.assigned_to {
            qb.push(" AND assigned_to = ").push_bind(user.as_str().to_string());
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(priority) = filter.priority {
            qb.push(" AND priority = ").push_bind(priority.as_str());
        }
        qb.push(" ORDER BY created_at DESC, id");

        qb.build_query_as::<TicketRow>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Ticket::try_from)
            .collect()
    }

    async fn update_ticket(&self, id: &TicketId, patch: TicketPatch) -> Result<Option<Ticket>, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let Some(mut ticket) = Self::lock_ticket(&mut tx, id).await? else {
            return Ok(None);
        };
        patch.apply(&mut ticket, Utc::now());
        Self::rewrite_ticket(&mut tx, &ticket).await?;
        tx.commit().await?;
        Ok(Some(ticket))
    }

    async fn assign_ticket(
        &self,
        id: &TicketId,
        assignment: TicketAssignment,
    ) -> Result<Option<Ticket>, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let Some(mut ticket) = Self::lock_ticket(&mut tx, id).await? else {
            return Ok(None);
        };
        assignment.apply(&mut ticket, Utc::now());
        Self::rewrite_ticket(&mut tx, &ticket).await?;
        tx.commit().await?;
        Ok(Some(ticket))
    }

    async fn delete_ticket(&self, id: &TicketId) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM tickets WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn resolve_owning_organization(&self, id: &TicketId) -> Result<Option<OrganizationId>, DatabaseError> {
        let owner: Option<String> = sqlx::query_scalar("SELECT organization_id FROM tickets WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(owner.map(OrganizationId::new))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn register_organization(
        &self,
        org: NewOrganization,
        admin: NewUser,
    ) -> Result<(Organization, User), DatabaseError> {
        let now = Utc::now();
        let org = org.into_organization(now);
        let mut admin = admin.into_user(now);
        admin.organization_id = Some(org.id.clone());

        let mut tx = self.pool.begin().await?;
        Self::write_organization(&mut tx, &org).await?;
        Self::write_user(&mut tx, &admin).await?;
        tx.commit().await?;

        Ok((org, admin))
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
