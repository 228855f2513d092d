#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Duration;
use serde_json::Value;
use tower::ServiceExt;

use helpdesk_api::auth::{PasswordConfig, PasswordHasher, TokenService};
use helpdesk_api::database::models::{NewOrganization, NewTicket, NewUser, Organization, Ticket, User};
use helpdesk_api::database::{IdentityStore, MemoryStore, OrganizationStore, TicketStore};
use helpdesk_api::types::{BoardId, OrganizationId, Role, Subscription, TicketPriority};
use helpdesk_api::{app, AppState};

pub const PASSWORD: &str = "password123";

/// In-process application over a fresh in-memory store
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub state: AppState,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let tokens = TokenService::new("test-secret", "helpdesk-test", Duration::hours(1))
            .expect("test token service");
        let passwords = PasswordHasher::new(PasswordConfig::fast());
        let state = AppState::new(store.clone(), tokens, passwords).with_audit(true);
        let router = app(state.clone());
        Self { store, state, router }
    }

    pub async fn organization(&self, name: &str, domain: &str, board: Option<&str>) -> Organization {
        self.store
            .insert_organization(NewOrganization {
                name: name.into(),
                domain: domain.into(),
                board_id: board.map(BoardId::from),
                subscription: Subscription::Free,
                created_by: None,
            })
            .await
            .expect("insert organization")
    }

    pub async fn user(&self, email: &str, role: Role, org: Option<&OrganizationId>) -> User {
        let password_hash = self.state.passwords.hash(PASSWORD).expect("hash");
        self.store
            .insert_identity(NewUser {
                name: email.split('@').next().unwrap_or(email).into(),
                email: email.into(),
                password_hash,
                role,
                organization_id: org.cloned(),
                permissions: vec![],
            })
            .await
            .expect("insert user")
    }

    pub async fn ticket(&self, title: &str, org: &OrganizationId, creator: &User) -> Ticket {
        self.store
            .insert_ticket(NewTicket {
                organization_id: org.clone(),
                title: title.into(),
                description: "Needs attention".into(),
                category: "General".into(),
                location: None,
                priority: TicketPriority::Medium,
                created_by: creator.id.clone(),
            })
            .await
            .expect("insert ticket")
    }

    pub fn token(&self, user: &User) -> String {
        self.state.tokens.issue(user).expect("issue token")
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&json)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await.context("router call")?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).with_context(|| format!("non-JSON body for {}", status))?
        };
        Ok((status, value))
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        self.request(Method::PATCH, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        self.request(Method::DELETE, uri, token, None).await
    }
}
