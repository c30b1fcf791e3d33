//! User management: invitations, activation, role changes.

use std::sync::Arc;

use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::authz::UserRole;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::user::User;
use crate::services::auth_service::AuthService;

/// User management service
pub struct UserService {
    db: PgPool,
    config: Arc<Config>,
}

impl UserService {
    pub fn new(db: PgPool, config: Arc<Config>) -> Self {
        Self { db, config }
    }

    /// Create an inactive account with a fresh invitation token. Mail
    /// delivery is an external concern; the token is surfaced in the log
    /// stream for the delivery pipeline to pick up.
    pub async fn invite(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
        role: UserRole,
    ) -> Result<User> {
        let token = Uuid::new_v4();
        let expires_at = Utc::now() + Duration::hours(self.config.invitation_expiry_hours);

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, role, first_name, last_name, invitation_token, invitation_expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(role)
        .bind(first_name)
        .bind(last_name)
        .bind(token)
        .bind(expires_at)
        .fetch_one(&self.db)
        .await
        .map_err(|e: sqlx::Error| {
            if e.to_string().contains("duplicate key") {
                AppError::Conflict(format!("A user with email {} already exists", email))
            } else {
                AppError::Database(e)
            }
        })?;

        tracing::info!(
            email = email,
            role = role.as_str(),
            invitation_token = %token,
            "User invited"
        );
        Ok(user)
    }

    /// Redeem an invitation token: set the password and activate the
    /// account. The token is single-use.
    pub async fn accept_invitation(&self, token: Uuid, password: &str) -> Result<User> {
        if password.len() < 8 {
            return Err(AppError::Validation(
                "Password must be at least 8 characters".to_string(),
            ));
        }

        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE invitation_token = $1")
            .bind(token)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| {
                AppError::NotFound("Invitation not found or already used".to_string())
            })?;

        match user.invitation_expires_at {
            Some(expires_at) if expires_at >= Utc::now() => {}
            _ => {
                return Err(AppError::Authentication(
                    "Invitation has expired".to_string(),
                ))
            }
        }

        let password_hash = AuthService::hash_password(password)?;
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET password_hash = $1, invitation_token = NULL,
                invitation_expires_at = NULL, updated_at = NOW()
            WHERE email = $2
            RETURNING *
            "#,
        )
        .bind(&password_hash)
        .bind(&user.email)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(email = %user.email, "Invitation accepted, account activated");
        Ok(user)
    }

    /// All users, for the admin page.
    pub async fn list(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY email")
            .fetch_all(&self.db)
            .await?;
        Ok(users)
    }

    /// Reassign a user's role.
    pub async fn set_role(&self, email: &str, role: UserRole) -> Result<User> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET role = $1, updated_at = NOW() WHERE email = $2 RETURNING *",
        )
        .bind(role)
        .bind(email)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", email)))
    }
}
