//! User model.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::authz::UserRole;

/// User entity. Accounts are created by invitation and stay inactive
/// (no password hash) until the invitation token is redeemed.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub role: UserRole,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub invitation_token: Option<Uuid>,
    #[serde(skip_serializing)]
    pub invitation_expires_at: Option<DateTime<Utc>>,
    pub notify_on_stage_change: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// An account is active once its invitation was accepted and a
    /// password was set.
    pub fn is_active(&self) -> bool {
        self.password_hash.is_some()
    }
}
