use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::{PasswordConfig, PasswordHasher, TokenService};
use crate::authz::{decide, AccessDecision, AccessTarget, Grant, Requester};
use crate::config::{AppConfig, StoreBackend};
use crate::database::{schema, DatabaseManager, MemoryStore, PgStore, Store};
use crate::error::ApiError;

/// Shared handles passed to every handler through axum `State`
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tokens: TokenService,
    pub passwords: PasswordHasher,
    pub audit: bool,
    pub allow_registration: bool,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, tokens: TokenService, passwords: PasswordHasher) -> Self {
        Self {
            store,
            tokens,
            passwords,
            audit: false,
            allow_registration: true,
        }
    }

    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn Store> = match config.database.backend {
            StoreBackend::Postgres => {
                let pool = DatabaseManager::connect(&config.database)
                    .await
                    .context("connecting to PostgreSQL")?;
                if config.database.bootstrap_schema {
                    schema::bootstrap(&pool).await.context("bootstrapping schema")?;
                }
                Arc::new(PgStore::new(pool))
            }
            StoreBackend::Memory => {
                warn!("Using in-memory store; data is lost on shutdown");
                Arc::new(MemoryStore::new())
            }
        };

        let tokens = TokenService::from_config(&config.security).context("configuring token service")?;
        let passwords = PasswordHasher::new(PasswordConfig::from_security(&config.security));

        info!("Application state ready ({:?} store)", config.database.backend);

        Ok(Self {
            store,
            tokens,
            passwords,
            audit: config.security.enable_audit_logging,
            allow_registration: config.security.allow_registration,
        })
    }

    pub fn with_audit(mut self, audit: bool) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_registration(mut self, allow: bool) -> Self {
        self.allow_registration = allow;
        self
    }

    /// Runs the access decision and records the outcome on the `audit` target
    pub fn authorize(&self, requester: &Requester, target: &AccessTarget) -> Result<Grant, ApiError> {
        let decision = decide(Some(requester), target);

        if self.audit {
            let user = requester.id().as_str();
            let role = requester.role().as_str();
            let org = target.organization_id.as_ref().map(|o| o.as_str()).unwrap_or("-");
            let board = target.board_id.as_ref().map(|b| b.as_str()).unwrap_or("-");
            match decision {
                AccessDecision::Allow(grant) => {
                    tracing::info!(target: "audit", user, role, org, board, ?grant, "access allowed")
                }
                AccessDecision::Deny(reason) => {
                    tracing::warn!(target: "audit", user, role, org, board, reason = reason.as_str(), "access denied")
                }
                AccessDecision::Unauthenticated | AccessDecision::Indeterminate => {
                    tracing::warn!(target: "audit", user, role, org, board, ?decision, "access not evaluated")
                }
            }
        }

        Ok(decision.into_result()?)
    }
}
