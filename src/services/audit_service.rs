//! Audit trail of user actions.

use sqlx::PgPool;

use crate::error::Result;
use crate::models::audit_log::AuditLog;
use crate::store::PageRequest;

/// Records who did what to which case. Writing is best-effort: a failed
/// insert is logged and the request proceeds.
pub struct AuditService {
    db: PgPool,
}

impl AuditService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn record(
        &self,
        actor: &str,
        action: &str,
        case_id: Option<i32>,
        detail: serde_json::Value,
    ) {
        let result = sqlx::query(
            "INSERT INTO audit_logs (actor, action, case_id, detail) VALUES ($1, $2, $3, $4)",
        )
        .bind(actor)
        .bind(action)
        .bind(case_id)
        .bind(detail)
        .execute(&self.db)
        .await;

        if let Err(err) = result {
            tracing::warn!(actor = actor, action = action, error = %err, "Failed to record audit entry");
        }
    }

    /// Newest-first page of the audit trail.
    pub async fn list(&self, page: PageRequest) -> Result<(Vec<AuditLog>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM audit_logs")
            .fetch_one(&self.db)
            .await?;

        let entries = sqlx::query_as::<_, AuditLog>(
            "SELECT * FROM audit_logs ORDER BY id DESC LIMIT $1 OFFSET $2",
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.db)
        .await?;

        Ok((entries, total))
    }
}
