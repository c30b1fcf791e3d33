//! Audit log model.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// One recorded user action. Best-effort: written after the action
/// succeeded, never blocks it.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuditLog {
    pub id: i64,
    pub actor: String,
    pub action: String,
    pub case_id: Option<i32>,
    pub detail: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}
