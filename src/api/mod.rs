//! API module - HTTP handlers and middleware.

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;

use std::sync::Arc;

use sqlx::PgPool;

use crate::authz::Grants;
use crate::config::Config;
use crate::notify::{LogNotifier, Notifier, WebhookNotifier};
use crate::services::audit_service::AuditService;
use crate::services::auth_service::AuthService;
use crate::services::case_service::CaseService;
use crate::services::user_service::UserService;
use crate::store::{CaseStore, PgCaseStore};

/// Application state shared across handlers
pub struct AppState {
    pub config: Config,
    pub db: PgPool,
    pub store: Arc<dyn CaseStore>,
    pub grants: Arc<Grants>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn new(config: Config, db: PgPool) -> Self {
        let notifier: Arc<dyn Notifier> = match &config.notify_webhook_url {
            Some(url) => Arc::new(WebhookNotifier::new(url.clone())),
            None => Arc::new(LogNotifier),
        };
        Self {
            store: Arc::new(PgCaseStore::new(db.clone())),
            grants: Arc::new(Grants::seeded()),
            notifier,
            config,
            db,
        }
    }

    /// Create the workflow engine over the shared collaborators.
    pub fn case_service(&self) -> CaseService {
        CaseService::new(
            Arc::clone(&self.store),
            Arc::clone(&self.grants),
            Arc::clone(&self.notifier),
        )
    }

    pub fn auth_service(&self) -> AuthService {
        AuthService::new(self.db.clone(), Arc::new(self.config.clone()))
    }

    pub fn user_service(&self) -> UserService {
        UserService::new(self.db.clone(), Arc::new(self.config.clone()))
    }

    pub fn audit_service(&self) -> AuditService {
        AuditService::new(self.db.clone())
    }
}

pub type SharedState = Arc<AppState>;
