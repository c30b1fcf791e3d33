//! Case workflow engine.
//!
//! Owns the stage state machine: stage-scoped edits, gated completions,
//! creation, deletion and listing. Every operation takes the caller's role
//! explicitly and runs the authorization guard before touching any state.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;

use crate::authz::{AppPermission, Grants, UserRole};
use crate::error::{AppError, Result};
use crate::models::case::{CaseItem, IntakePatch, ReturnCase, StagePatch};
use crate::notify::{CaseEvent, EventKind, Notifier};
use crate::store::{CaseFilter, CasePage, CaseStore, PageRequest};
use crate::workflow::{gates, WorkflowStatus};

/// A case together with its items.
#[derive(Debug, Clone)]
pub struct CaseDetail {
    pub case: ReturnCase,
    pub items: Vec<CaseItem>,
}

/// The workflow engine. Stateless apart from its collaborators; all case
/// state lives behind the store.
pub struct CaseService {
    store: Arc<dyn CaseStore>,
    grants: Arc<Grants>,
    notifier: Arc<dyn Notifier>,
}

impl CaseService {
    pub fn new(store: Arc<dyn CaseStore>, grants: Arc<Grants>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            grants,
            notifier,
        }
    }

    /// Create a case in DELIVERED with the given intake fields.
    pub async fn create_case(
        &self,
        role: Option<UserRole>,
        intake: IntakePatch,
    ) -> Result<CaseDetail> {
        self.grants.authorize(role, AppPermission::CaseCreate)?;
        if let Some(customer_id) = intake.customer_id {
            self.store.get_customer(customer_id).await?;
        }

        let case = self.store.create_case(&intake).await?;
        tracing::info!(case_id = case.id, "Return case created");
        self.emit(EventKind::CaseCreated, case.id, json!({}));

        Ok(CaseDetail {
            case,
            items: Vec::new(),
        })
    }

    /// Fetch one case with its items.
    pub async fn get_case(&self, role: Option<UserRole>, id: i32) -> Result<CaseDetail> {
        self.grants
            .authorize(role, AppPermission::PageViewCaseTracking)?;
        self.detail(id).await
    }

    /// Filtered, paginated listing.
    pub async fn list_cases(
        &self,
        role: Option<UserRole>,
        filter: &CaseFilter,
        page: PageRequest,
    ) -> Result<CasePage> {
        self.grants
            .authorize(role, AppPermission::PageViewCaseTracking)?;
        self.store.list_cases(filter, page).await
    }

    /// Apply a stage-scoped edit. Rejected unless the case is currently in
    /// the patch's stage; never changes `workflow_status`.
    pub async fn edit_stage(
        &self,
        role: Option<UserRole>,
        id: i32,
        patch: StagePatch,
    ) -> Result<CaseDetail> {
        self.grants.authorize(role, patch.edit_permission())?;
        validate_patch(&patch)?;
        self.check_references(&patch).await?;

        let stage = patch.stage();
        let case = self.store.get_case(id).await?;
        if case.workflow_status != stage {
            return Err(stage_conflict(&case, stage));
        }

        // The store re-checks the stage inside the write, so a concurrent
        // completion between the read above and this update loses cleanly.
        let case = self.store.update_stage(id, &patch).await?;
        let items = self.store.get_items(id).await?;
        tracing::info!(case_id = id, stage = stage.as_str(), "Stage data saved");

        Ok(CaseDetail { case, items })
    }

    /// Run the stage gate and advance to the next stage on success.
    pub async fn complete_stage(
        &self,
        role: Option<UserRole>,
        id: i32,
        stage: WorkflowStatus,
    ) -> Result<CaseDetail> {
        self.grants.authorize(role, stage.complete_permission())?;

        let case = self.store.get_case(id).await?;
        if case.workflow_status != stage {
            return Err(stage_conflict(&case, stage));
        }
        let next = stage
            .next()
            .ok_or_else(|| AppError::StateConflict(format!("case {} is already completed", id)))?;

        let items = self.store.get_items(id).await?;
        gates::can_complete(&case, &items, Utc::now().date_naive())
            .map_err(|missing| AppError::StageIncomplete { missing })?;

        self.store.advance_status(id, stage, next).await?;
        tracing::info!(
            case_id = id,
            from = stage.as_str(),
            to = next.as_str(),
            "Case advanced"
        );
        self.emit(
            EventKind::StageCompleted,
            id,
            json!({
                "from": stage,
                "to": next,
                "from_label": stage.label(),
                "to_label": next.label(),
            }),
        );

        self.detail(id).await
    }

    /// Delete a case. Only Support may delete, and only while the case is
    /// still in intake; downstream work is never destroyed.
    pub async fn delete_case(&self, role: Option<UserRole>, id: i32) -> Result<()> {
        self.grants.authorize(role, AppPermission::CaseDelete)?;
        if role != Some(UserRole::Support) {
            return Err(AppError::Forbidden);
        }

        let case = self.store.get_case(id).await?;
        if case.workflow_status != WorkflowStatus::Delivered {
            return Err(AppError::StateConflict(format!(
                "case {} has left intake (now in the {} stage) and can no longer be deleted",
                id,
                case.workflow_status.label()
            )));
        }

        self.store.delete_case(id).await?;
        tracing::info!(case_id = id, "Return case deleted");
        self.emit(EventKind::CaseDeleted, id, json!({}));
        Ok(())
    }

    async fn detail(&self, id: i32) -> Result<CaseDetail> {
        let case = self.store.get_case(id).await?;
        let items = self.store.get_items(id).await?;
        Ok(CaseDetail { case, items })
    }

    /// Referenced customers and product models must exist before the write.
    async fn check_references(&self, patch: &StagePatch) -> Result<()> {
        match patch {
            StagePatch::Delivered(p) => {
                if let Some(customer_id) = p.customer_id {
                    self.store.get_customer(customer_id).await?;
                }
            }
            StagePatch::TechnicalReview(p) => {
                for item in &p.items {
                    self.store.get_product_model(item.product_model_id).await?;
                }
            }
            StagePatch::PaymentCollection(_) | StagePatch::Shipping(_) => {}
        }
        Ok(())
    }

    /// Notify after the commit; delivery failures never reach the caller.
    fn emit(&self, kind: EventKind, case_id: i32, extra: serde_json::Value) {
        let notifier = Arc::clone(&self.notifier);
        let event = CaseEvent::now(kind, case_id, extra);
        tokio::spawn(async move {
            notifier.notify(event).await;
        });
    }
}

fn stage_conflict(case: &ReturnCase, requested: WorkflowStatus) -> AppError {
    AppError::StateConflict(format!(
        "case {} is in the {} stage, not {}",
        case.id,
        case.workflow_status.label(),
        requested.label()
    ))
}

/// Model invariants checked at write time. Completeness stays with the
/// stage gates; only values that are invalid in any state are rejected here.
fn validate_patch(patch: &StagePatch) -> Result<()> {
    if let StagePatch::TechnicalReview(p) = patch {
        for item in &p.items {
            if item.quantity < 1 {
                return Err(AppError::Validation(
                    "item quantity must be at least 1".into(),
                ));
            }
        }
        for (label, cost) in [
            ("parts cost", p.parts_cost),
            ("maintenance cost", p.maintenance_cost),
            ("labor cost", p.labor_cost),
        ] {
            if let Some(value) = cost {
                if value < Decimal::ZERO {
                    return Err(AppError::Validation(format!("{label} must not be negative")));
                }
            }
        }
    }
    Ok(())
}

impl StagePatch {
    /// Permission required to apply this patch.
    pub fn edit_permission(&self) -> AppPermission {
        match self {
            Self::Delivered(_) => AppPermission::CaseEditDelivered,
            Self::TechnicalReview(_) => AppPermission::CaseEditTechnicalReview,
            Self::PaymentCollection(_) => AppPermission::CaseEditPaymentCollection,
            Self::Shipping(_) => AppPermission::CaseEditShipping,
        }
    }
}
