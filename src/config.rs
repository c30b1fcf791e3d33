//! Application configuration loaded from environment variables.

use crate::error::{AppError, Result};
use std::env;

/// Application configuration
#[derive(Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Server bind address (host:port)
    pub bind_address: String,

    /// JWT secret key for signing tokens
    pub jwt_secret: String,

    /// JWT access token expiry in hours
    pub jwt_expiry_hours: i64,

    /// How long a user invitation stays valid, in hours
    pub invitation_expiry_hours: i64,

    /// Allowed CORS origin (any origin when unset)
    pub cors_origin: Option<String>,

    /// Webhook URL that receives workflow events (log-only when unset)
    pub notify_webhook_url: Option<String>,

    /// Bootstrap admin account, created at startup when both are set
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| AppError::Config("DATABASE_URL not set".into()))?,
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| AppError::Config("JWT_SECRET not set".into()))?,
            jwt_expiry_hours: env::var("JWT_EXPIRY_HOURS")
                .unwrap_or_else(|_| "2".into())
                .parse()
                .unwrap_or(2),
            invitation_expiry_hours: env::var("INVITATION_EXPIRY_HOURS")
                .unwrap_or_else(|_| "72".into())
                .parse()
                .unwrap_or(72),
            cors_origin: env::var("CORS_ORIGIN").ok(),
            notify_webhook_url: env::var("NOTIFY_WEBHOOK_URL").ok(),
            admin_email: env::var("ADMIN_EMAIL").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
        })
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &self.database_url)
            .field("bind_address", &self.bind_address)
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_expiry_hours", &self.jwt_expiry_hours)
            .field("invitation_expiry_hours", &self.invitation_expiry_hours)
            .field("cors_origin", &self.cors_origin)
            .field("notify_webhook_url", &self.notify_webhook_url)
            .field("admin_email", &self.admin_email)
            .field(
                "admin_password",
                &self.admin_password.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_does_not_leak_secrets() {
        let config = Config {
            database_url: "postgres://localhost/returns".into(),
            bind_address: "0.0.0.0:8080".into(),
            jwt_secret: "super-secret-value".into(),
            jwt_expiry_hours: 2,
            invitation_expiry_hours: 72,
            cors_origin: None,
            notify_webhook_url: None,
            admin_email: Some("admin@example.com".into()),
            admin_password: Some("another-secret".into()),
        };
        let output = format!("{:?}", config);
        assert!(!output.contains("super-secret-value"));
        assert!(!output.contains("another-secret"));
        assert!(output.contains("[REDACTED]"));
    }
}
