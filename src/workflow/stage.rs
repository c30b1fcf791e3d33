//! The five-stage case state machine.
//!
//! Stages form a single linear chain; transitions only ever move forward by
//! one step and COMPLETED has no successor.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::authz::AppPermission;

/// Workflow stage of a return case. The single source of truth for what may
/// be edited right now.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    sqlx::Type,
    ToSchema,
)]
#[sqlx(type_name = "workflow_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Delivered,
    TechnicalReview,
    PaymentCollection,
    Shipping,
    Completed,
}

/// Canonical forward order of the stages.
pub const STAGE_ORDER: [WorkflowStatus; 5] = [
    WorkflowStatus::Delivered,
    WorkflowStatus::TechnicalReview,
    WorkflowStatus::PaymentCollection,
    WorkflowStatus::Shipping,
    WorkflowStatus::Completed,
];

impl WorkflowStatus {
    /// The stage that follows this one, or `None` for the terminal stage.
    pub fn next(self) -> Option<WorkflowStatus> {
        match self {
            Self::Delivered => Some(Self::TechnicalReview),
            Self::TechnicalReview => Some(Self::PaymentCollection),
            Self::PaymentCollection => Some(Self::Shipping),
            Self::Shipping => Some(Self::Completed),
            Self::Completed => None,
        }
    }

    /// Position in the canonical order, for forward-only assertions.
    pub fn position(self) -> usize {
        STAGE_ORDER
            .iter()
            .position(|s| *s == self)
            .expect("stage present in canonical order")
    }

    /// Canonical machine key, identical to the serde/sqlx encoding.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::TechnicalReview => "technical_review",
            Self::PaymentCollection => "payment_collection",
            Self::Shipping => "shipping",
            Self::Completed => "completed",
        }
    }

    /// Human-facing display label. Business logic never parses these;
    /// the canonical keys above are the only machine representation.
    pub fn label(self) -> &'static str {
        match self {
            Self::Delivered => "Delivered",
            Self::TechnicalReview => "Technical Review",
            Self::PaymentCollection => "Payment Collection",
            Self::Shipping => "Shipping",
            Self::Completed => "Completed",
        }
    }

    /// Permission required to complete this stage.
    pub fn complete_permission(self) -> AppPermission {
        match self {
            Self::Delivered => AppPermission::CaseCompleteDelivered,
            Self::TechnicalReview => AppPermission::CaseCompleteTechnicalReview,
            Self::PaymentCollection => AppPermission::CaseCompletePaymentCollection,
            Self::Shipping => AppPermission::CaseCompleteShipping,
            Self::Completed => AppPermission::CaseCompleteCompleted,
        }
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_walks_the_canonical_order_without_skipping() {
        let mut stage = WorkflowStatus::Delivered;
        let mut seen = vec![stage];
        while let Some(next) = stage.next() {
            assert_eq!(next.position(), stage.position() + 1);
            seen.push(next);
            stage = next;
        }
        assert_eq!(seen, STAGE_ORDER);
    }

    #[test]
    fn completed_is_terminal() {
        assert_eq!(WorkflowStatus::Completed.next(), None);
    }

    #[test]
    fn every_stage_has_a_completion_permission() {
        assert_eq!(
            WorkflowStatus::Completed.complete_permission(),
            AppPermission::CaseCompleteCompleted
        );
        assert_eq!(
            WorkflowStatus::Delivered.complete_permission(),
            AppPermission::CaseCompleteDelivered
        );
    }

    #[test]
    fn order_is_strictly_forward() {
        for pair in STAGE_ORDER.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn serde_round_trips_canonical_keys() {
        let json = serde_json::to_string(&WorkflowStatus::TechnicalReview).unwrap();
        assert_eq!(json, "\"technical_review\"");
        let parsed: WorkflowStatus = serde_json::from_str("\"payment_collection\"").unwrap();
        assert_eq!(parsed, WorkflowStatus::PaymentCollection);
    }
}
