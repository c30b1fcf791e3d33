//! Outbound notification boundary.
//!
//! Consumers are informed after a workflow change has been durably
//! committed. Delivery is fire-and-forget: implementations swallow and log
//! their own failures, which never reach the caller.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Kind of workflow event being announced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    CaseCreated,
    StageCompleted,
    CaseDeleted,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CaseCreated => "case_created",
            Self::StageCompleted => "stage_completed",
            Self::CaseDeleted => "case_deleted",
        }
    }
}

/// A workflow event published after a successful transition.
#[derive(Debug, Clone, Serialize)]
pub struct CaseEvent {
    pub kind: EventKind,
    pub case_id: i32,
    pub extra: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl CaseEvent {
    /// Create an event timestamped to now.
    pub fn now(kind: EventKind, case_id: i32, extra: serde_json::Value) -> Self {
        Self {
            kind,
            case_id,
            extra,
            timestamp: Utc::now(),
        }
    }
}

/// Notification sink invoked after committed workflow transitions.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: CaseEvent);
}

/// Notifier that only writes a structured log record. The default when no
/// webhook is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: CaseEvent) {
        tracing::info!(
            kind = event.kind.as_str(),
            case_id = event.case_id,
            extra = %event.extra,
            "Workflow event"
        );
    }
}

/// Notifier that POSTs each event as JSON to a configured endpoint.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();
        Self { client, url }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, event: CaseEvent) {
        let result = self.client.post(&self.url).json(&event).send().await;
        match result {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(
                    kind = event.kind.as_str(),
                    case_id = event.case_id,
                    "Workflow event delivered"
                );
            }
            Ok(response) => {
                tracing::warn!(
                    kind = event.kind.as_str(),
                    case_id = event.case_id,
                    status = %response.status(),
                    "Workflow event rejected by webhook"
                );
            }
            Err(err) => {
                tracing::warn!(
                    kind = event.kind.as_str(),
                    case_id = event.case_id,
                    error = %err,
                    "Workflow event delivery failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serializes_snake_case_kind() {
        let event = CaseEvent::now(EventKind::StageCompleted, 7, serde_json::json!({}));
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""kind":"stage_completed""#));
        assert!(json.contains(r#""case_id":7"#));
    }

    #[tokio::test]
    async fn log_notifier_never_fails() {
        LogNotifier
            .notify(CaseEvent::now(EventKind::CaseCreated, 1, serde_json::json!({})))
            .await;
    }
}
