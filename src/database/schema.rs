use sqlx::PgPool;
use tracing::info;

use crate::database::manager::DatabaseError;

/// Idempotent DDL, applied in order at startup when `bootstrap_schema` is on
const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS organizations (
        id                   TEXT PRIMARY KEY,
        name                 TEXT NOT NULL,
        domain               TEXT NOT NULL UNIQUE,
        board_id             TEXT,
        is_active            BOOLEAN NOT NULL DEFAULT TRUE,
        subscription         TEXT NOT NULL DEFAULT 'free',
        subscription_expires TIMESTAMPTZ,
        theme                TEXT NOT NULL DEFAULT 'light',
        created_by           TEXT,
        created_at           TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at           TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS organizations_board_id_idx ON organizations (board_id)",
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id                  TEXT PRIMARY KEY,
        name                TEXT NOT NULL,
        email               TEXT NOT NULL UNIQUE,
        password_hash       TEXT NOT NULL,
        role                TEXT NOT NULL,
        organization_id     TEXT REFERENCES organizations (id) ON DELETE SET NULL,
        permissions         TEXT[] NOT NULL DEFAULT '{}',
        is_active           BOOLEAN NOT NULL DEFAULT TRUE,
        password_changed_at TIMESTAMPTZ,
        created_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at          TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS users_organization_role_idx ON users (organization_id, role)",
    r#"
    CREATE TABLE IF NOT EXISTS tickets (
        id              TEXT PRIMARY KEY,
        organization_id TEXT NOT NULL REFERENCES organizations (id) ON DELETE CASCADE,
        title           TEXT NOT NULL,
        description     TEXT NOT NULL,
        category        TEXT NOT NULL,
        location        TEXT,
        priority        TEXT NOT NULL,
        status          TEXT NOT NULL DEFAULT 'Open',
        created_by      TEXT NOT NULL,
        assigned_to     TEXT,
        due_date        TIMESTAMPTZ,
        created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS tickets_organization_id_idx ON tickets (organization_id)",
    "CREATE INDEX IF NOT EXISTS tickets_assigned_to_idx ON tickets (assigned_to)",
];

pub async fn bootstrap(pool: &PgPool) -> Result<(), DatabaseError> {
    for statement in STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    info!("Database schema is up to date ({} statements)", STATEMENTS.len());
    Ok(())
}
