//! End-to-end workflow tests over the in-memory store.
//!
//! These drive the workflow engine the way the HTTP layer does: explicit
//! caller roles, stage-scoped patches, gated completions.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;

use defect_tracker_backend::authz::{Grants, UserRole};
use defect_tracker_backend::error::AppError;
use defect_tracker_backend::models::case::{
    CollectionPatch, IntakePatch, NewItem, PaymentStatus, ReceiptMethod, ReviewPatch,
    ShippingPatch, StagePatch, WarrantyStatus,
};
use defect_tracker_backend::models::case::{FaultResponsibility, ResolutionMethod};
use defect_tracker_backend::models::product::ProductType;
use defect_tracker_backend::notify::{CaseEvent, EventKind, Notifier};
use defect_tracker_backend::services::case_service::CaseService;
use defect_tracker_backend::store::{CaseFilter, MemoryStore, PageRequest};
use defect_tracker_backend::workflow::WorkflowStatus;

/// Notifier that records every event it receives.
#[derive(Default)]
struct RecordingNotifier {
    events: Mutex<Vec<CaseEvent>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: CaseEvent) {
        self.events.lock().unwrap().push(event);
    }
}

struct Harness {
    store: Arc<MemoryStore>,
    notifier: Arc<RecordingNotifier>,
    service: CaseService,
    customer_id: i32,
    product_id: i32,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let customer_id = store.add_customer("Hasan Elevators").id;
    let product_id = store
        .add_product_model("DT42", ProductType::DoorDetector)
        .id;
    let notifier = Arc::new(RecordingNotifier::default());
    let service = CaseService::new(
        store.clone(),
        Arc::new(Grants::seeded()),
        notifier.clone(),
    );
    Harness {
        store,
        notifier,
        service,
        customer_id,
        product_id,
    }
}

fn support() -> Option<UserRole> {
    Some(UserRole::Support)
}

fn technician() -> Option<UserRole> {
    Some(UserRole::Technician)
}

fn sales() -> Option<UserRole> {
    Some(UserRole::Sales)
}

fn logistics() -> Option<UserRole> {
    Some(UserRole::Logistics)
}

fn intake(customer_id: i32) -> IntakePatch {
    IntakePatch {
        customer_id: Some(customer_id),
        arrival_date: NaiveDate::from_ymd_opt(2024, 3, 1),
        receipt_method: Some(ReceiptMethod::Shipment),
        notes: Some("Unit dead on arrival".into()),
    }
}

fn full_item(product_id: i32) -> NewItem {
    NewItem {
        product_model_id: product_id,
        quantity: 1,
        production_date: NaiveDate::from_ymd_opt(2023, 5, 1),
        warranty_status: Some(WarrantyStatus::InWarranty),
        fault_responsibility: Some(FaultResponsibility::Technical),
        resolution_method: Some(ResolutionMethod::Repair),
        has_control_unit: false,
        cable_checked: true,
        profile_checked: true,
        packaged: true,
    }
}

fn full_review(product_id: i32) -> ReviewPatch {
    ReviewPatch {
        parts_cost: Some(Decimal::new(1500, 2)),
        maintenance_cost: Some(Decimal::ZERO),
        labor_cost: Some(Decimal::new(3000, 2)),
        performed_service: Some("Replaced emitter board and recalibrated".into()),
        items: vec![full_item(product_id)],
    }
}

/// Walk a freshly created case to the given stage using each owning role.
async fn advance_to(h: &Harness, case_id: i32, target: WorkflowStatus) {
    let steps: &[(WorkflowStatus, Option<UserRole>)] = &[
        (WorkflowStatus::Delivered, support()),
        (WorkflowStatus::TechnicalReview, technician()),
        (WorkflowStatus::PaymentCollection, sales()),
        (WorkflowStatus::Shipping, logistics()),
    ];
    for (stage, role) in steps {
        if *stage == target {
            return;
        }
        match stage {
            WorkflowStatus::TechnicalReview => {
                h.service
                    .edit_stage(
                        *role,
                        case_id,
                        StagePatch::TechnicalReview(full_review(h.product_id)),
                    )
                    .await
                    .unwrap();
            }
            WorkflowStatus::PaymentCollection => {
                h.service
                    .edit_stage(
                        *role,
                        case_id,
                        StagePatch::PaymentCollection(CollectionPatch {
                            payment_status: Some(PaymentStatus::Paid),
                        }),
                    )
                    .await
                    .unwrap();
            }
            WorkflowStatus::Shipping => {
                h.service
                    .edit_stage(
                        *role,
                        case_id,
                        StagePatch::Shipping(ShippingPatch {
                            shipping_info: Some("Aras Kargo".into()),
                            tracking_number: Some("TRK-99".into()),
                            shipping_date: NaiveDate::from_ymd_opt(2024, 4, 2),
                        }),
                    )
                    .await
                    .unwrap();
            }
            _ => {}
        }
        h.service
            .complete_stage(*role, case_id, *stage)
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn scenario_a_full_intake_completes_immediately() {
    let h = harness();
    let detail = h
        .service
        .create_case(support(), intake(h.customer_id))
        .await
        .unwrap();
    assert_eq!(detail.case.workflow_status, WorkflowStatus::Delivered);
    assert!(detail.items.is_empty());

    // No items are required at intake.
    let detail = h
        .service
        .complete_stage(support(), detail.case.id, WorkflowStatus::Delivered)
        .await
        .unwrap();
    assert_eq!(detail.case.workflow_status, WorkflowStatus::TechnicalReview);
}

#[tokio::test]
async fn scenario_b_review_needs_an_item_before_completing() {
    let h = harness();
    let case_id = h
        .service
        .create_case(support(), intake(h.customer_id))
        .await
        .unwrap()
        .case
        .id;
    h.service
        .complete_stage(support(), case_id, WorkflowStatus::Delivered)
        .await
        .unwrap();

    // Costs and description saved, but zero items: the gate must refuse and
    // say so.
    let mut review = full_review(h.product_id);
    review.items.clear();
    h.service
        .edit_stage(technician(), case_id, StagePatch::TechnicalReview(review))
        .await
        .unwrap();
    let err = h
        .service
        .complete_stage(technician(), case_id, WorkflowStatus::TechnicalReview)
        .await
        .unwrap_err();
    match err {
        AppError::StageIncomplete { missing } => {
            assert!(missing.contains(&"at least one item required".to_string()));
        }
        other => panic!("expected StageIncomplete, got {other:?}"),
    }

    // One fully specified item later, the same call succeeds.
    h.service
        .edit_stage(
            technician(),
            case_id,
            StagePatch::TechnicalReview(full_review(h.product_id)),
        )
        .await
        .unwrap();
    let detail = h
        .service
        .complete_stage(technician(), case_id, WorkflowStatus::TechnicalReview)
        .await
        .unwrap();
    assert_eq!(detail.case.workflow_status, WorkflowStatus::PaymentCollection);
    assert_eq!(detail.case.total_cost(), Some(Decimal::new(4500, 2)));
}

#[tokio::test]
async fn scenario_c_unpaid_blocks_collection_paid_advances() {
    let h = harness();
    let case_id = h
        .service
        .create_case(support(), intake(h.customer_id))
        .await
        .unwrap()
        .case
        .id;
    advance_to(&h, case_id, WorkflowStatus::PaymentCollection).await;

    h.service
        .edit_stage(
            sales(),
            case_id,
            StagePatch::PaymentCollection(CollectionPatch {
                payment_status: Some(PaymentStatus::Unpaid),
            }),
        )
        .await
        .unwrap();
    let err = h
        .service
        .complete_stage(sales(), case_id, WorkflowStatus::PaymentCollection)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::StageIncomplete { .. }));

    h.service
        .edit_stage(
            sales(),
            case_id,
            StagePatch::PaymentCollection(CollectionPatch {
                payment_status: Some(PaymentStatus::Paid),
            }),
        )
        .await
        .unwrap();
    let detail = h
        .service
        .complete_stage(sales(), case_id, WorkflowStatus::PaymentCollection)
        .await
        .unwrap();
    assert_eq!(detail.case.workflow_status, WorkflowStatus::Shipping);
}

#[tokio::test]
async fn scenario_d_technician_may_not_touch_payment_collection() {
    let h = harness();
    let case_id = h
        .service
        .create_case(support(), intake(h.customer_id))
        .await
        .unwrap()
        .case
        .id;

    // Denied regardless of the case's actual stage.
    let err = h
        .service
        .edit_stage(
            technician(),
            case_id,
            StagePatch::PaymentCollection(CollectionPatch {
                payment_status: Some(PaymentStatus::Paid),
            }),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    advance_to(&h, case_id, WorkflowStatus::PaymentCollection).await;
    let err = h
        .service
        .edit_stage(
            technician(),
            case_id,
            StagePatch::PaymentCollection(CollectionPatch {
                payment_status: Some(PaymentStatus::Paid),
            }),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
}

#[tokio::test]
async fn scenario_e_no_deletion_once_downstream_work_started() {
    let h = harness();
    let case_id = h
        .service
        .create_case(support(), intake(h.customer_id))
        .await
        .unwrap()
        .case
        .id;
    advance_to(&h, case_id, WorkflowStatus::Shipping).await;

    let err = h
        .service
        .delete_case(support(), case_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::StateConflict(_)));

    // The case is unchanged and still queryable.
    let detail = h.service.get_case(support(), case_id).await.unwrap();
    assert_eq!(detail.case.workflow_status, WorkflowStatus::Shipping);
}

#[tokio::test]
async fn support_may_delete_only_in_intake() {
    let h = harness();
    let case_id = h
        .service
        .create_case(support(), intake(h.customer_id))
        .await
        .unwrap()
        .case
        .id;

    // Sales holds no delete grant; Support in DELIVERED may delete.
    let err = h.service.delete_case(sales(), case_id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
    h.service.delete_case(support(), case_id).await.unwrap();
    let err = h.service.get_case(support(), case_id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn statuses_only_ever_move_forward_one_step() {
    let h = harness();
    let case_id = h
        .service
        .create_case(support(), intake(h.customer_id))
        .await
        .unwrap()
        .case
        .id;

    let mut observed = vec![WorkflowStatus::Delivered];
    advance_to(&h, case_id, WorkflowStatus::Shipping).await;
    h.service
        .edit_stage(
            logistics(),
            case_id,
            StagePatch::Shipping(ShippingPatch {
                shipping_info: Some("Aras Kargo".into()),
                tracking_number: Some("TRK-99".into()),
                shipping_date: NaiveDate::from_ymd_opt(2024, 4, 2),
            }),
        )
        .await
        .unwrap();
    h.service
        .complete_stage(logistics(), case_id, WorkflowStatus::Shipping)
        .await
        .unwrap();
    let detail = h.service.get_case(support(), case_id).await.unwrap();
    observed.push(detail.case.workflow_status);
    assert_eq!(detail.case.workflow_status, WorkflowStatus::Completed);
    assert!(observed.windows(2).all(|w| w[0] < w[1]));

    // Terminal: a further completion attempt conflicts rather than looping.
    let err = h
        .service
        .complete_stage(Some(UserRole::Manager), case_id, WorkflowStatus::Completed)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::StateConflict(_)));
}

#[tokio::test]
async fn double_completion_conflicts_instead_of_double_advancing() {
    let h = harness();
    let case_id = h
        .service
        .create_case(support(), intake(h.customer_id))
        .await
        .unwrap()
        .case
        .id;

    h.service
        .complete_stage(support(), case_id, WorkflowStatus::Delivered)
        .await
        .unwrap();
    let err = h
        .service
        .complete_stage(support(), case_id, WorkflowStatus::Delivered)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::StateConflict(_)));

    let detail = h.service.get_case(support(), case_id).await.unwrap();
    assert_eq!(detail.case.workflow_status, WorkflowStatus::TechnicalReview);
}

#[tokio::test]
async fn edits_are_rejected_outside_the_owning_stage() {
    let h = harness();
    let case_id = h
        .service
        .create_case(support(), intake(h.customer_id))
        .await
        .unwrap()
        .case
        .id;

    // Shipping data cannot be written while the case sits in intake.
    let err = h
        .service
        .edit_stage(
            logistics(),
            case_id,
            StagePatch::Shipping(ShippingPatch::default()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::StateConflict(_)));

    // And intake can no longer be edited once the case moved on.
    h.service
        .complete_stage(support(), case_id, WorkflowStatus::Delivered)
        .await
        .unwrap();
    let err = h
        .service
        .edit_stage(
            support(),
            case_id,
            StagePatch::Delivered(intake(h.customer_id)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::StateConflict(_)));
}

#[tokio::test]
async fn missing_intake_fields_are_reported_by_name() {
    let h = harness();
    let case_id = h
        .service
        .create_case(
            support(),
            IntakePatch {
                customer_id: Some(h.customer_id),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .case
        .id;

    let err = h
        .service
        .complete_stage(support(), case_id, WorkflowStatus::Delivered)
        .await
        .unwrap_err();
    match err {
        AppError::StageIncomplete { missing } => {
            assert_eq!(missing, vec!["arrival date", "receipt method"]);
        }
        other => panic!("expected StageIncomplete, got {other:?}"),
    }
}

#[tokio::test]
async fn future_production_period_blocks_review() {
    let h = harness();
    let case_id = h
        .service
        .create_case(support(), intake(h.customer_id))
        .await
        .unwrap()
        .case
        .id;
    h.service
        .complete_stage(support(), case_id, WorkflowStatus::Delivered)
        .await
        .unwrap();

    let mut review = full_review(h.product_id);
    let next_year = Utc::now().date_naive().year() + 1;
    review.items[0].production_date = NaiveDate::from_ymd_opt(next_year, 1, 1);
    h.service
        .edit_stage(technician(), case_id, StagePatch::TechnicalReview(review))
        .await
        .unwrap();

    let err = h
        .service
        .complete_stage(technician(), case_id, WorkflowStatus::TechnicalReview)
        .await
        .unwrap_err();
    match err {
        AppError::StageIncomplete { missing } => {
            assert!(missing
                .iter()
                .any(|m| m.contains("production period is in the future")));
        }
        other => panic!("expected StageIncomplete, got {other:?}"),
    }
}

#[tokio::test]
async fn no_role_is_always_denied() {
    let h = harness();
    let err = h
        .service
        .create_case(None, intake(h.customer_id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
}

#[tokio::test]
async fn review_edit_replaces_items_wholesale() {
    let h = harness();
    let second_product = h
        .store
        .add_product_model("Redstar", ProductType::Overload)
        .id;
    let case_id = h
        .service
        .create_case(support(), intake(h.customer_id))
        .await
        .unwrap()
        .case
        .id;
    h.service
        .complete_stage(support(), case_id, WorkflowStatus::Delivered)
        .await
        .unwrap();

    let mut review = full_review(h.product_id);
    review.items.push(full_item(second_product));
    let detail = h
        .service
        .edit_stage(technician(), case_id, StagePatch::TechnicalReview(review))
        .await
        .unwrap();
    assert_eq!(detail.items.len(), 2);

    // The next save carries one item; the previous two are gone.
    let detail = h
        .service
        .edit_stage(
            technician(),
            case_id,
            StagePatch::TechnicalReview(full_review(second_product)),
        )
        .await
        .unwrap();
    assert_eq!(detail.items.len(), 1);
    assert_eq!(detail.items[0].product_model_id, second_product);
}

#[tokio::test]
async fn negative_costs_are_rejected_at_write_time() {
    let h = harness();
    let case_id = h
        .service
        .create_case(support(), intake(h.customer_id))
        .await
        .unwrap()
        .case
        .id;
    h.service
        .complete_stage(support(), case_id, WorkflowStatus::Delivered)
        .await
        .unwrap();

    let mut review = full_review(h.product_id);
    review.labor_cost = Some(Decimal::new(-100, 2));
    let err = h
        .service
        .edit_stage(technician(), case_id, StagePatch::TechnicalReview(review))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn unknown_product_reference_is_a_not_found() {
    let h = harness();
    let case_id = h
        .service
        .create_case(support(), intake(h.customer_id))
        .await
        .unwrap()
        .case
        .id;
    h.service
        .complete_stage(support(), case_id, WorkflowStatus::Delivered)
        .await
        .unwrap();

    let mut review = full_review(h.product_id);
    review.items[0].product_model_id = 999;
    let err = h
        .service
        .edit_stage(technician(), case_id, StagePatch::TechnicalReview(review))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn listing_filters_by_status_and_customer() {
    let h = harness();
    let other_customer = h.store.add_customer("Derya Lifts").id;

    let first = h
        .service
        .create_case(support(), intake(h.customer_id))
        .await
        .unwrap()
        .case
        .id;
    h.service
        .create_case(support(), intake(other_customer))
        .await
        .unwrap();
    h.service
        .complete_stage(support(), first, WorkflowStatus::Delivered)
        .await
        .unwrap();

    let page = PageRequest::default();
    let by_status = h
        .service
        .list_cases(
            support(),
            &CaseFilter {
                status: Some(WorkflowStatus::TechnicalReview),
                ..Default::default()
            },
            page,
        )
        .await
        .unwrap();
    assert_eq!(by_status.total, 1);
    assert_eq!(by_status.cases[0].id, first);

    let by_customer = h
        .service
        .list_cases(
            support(),
            &CaseFilter {
                customer: Some("derya".into()),
                ..Default::default()
            },
            page,
        )
        .await
        .unwrap();
    assert_eq!(by_customer.total, 1);
    assert_eq!(by_customer.cases[0].customer_id, Some(other_customer));
}

#[tokio::test]
async fn completion_notifies_after_commit() {
    let h = harness();
    let case_id = h
        .service
        .create_case(support(), intake(h.customer_id))
        .await
        .unwrap()
        .case
        .id;
    h.service
        .complete_stage(support(), case_id, WorkflowStatus::Delivered)
        .await
        .unwrap();

    // Notification is fire-and-forget on a spawned task; give it a beat.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let events = h.notifier.events.lock().unwrap();
    assert!(events
        .iter()
        .any(|e| e.kind == EventKind::CaseCreated && e.case_id == case_id));
    assert!(events
        .iter()
        .any(|e| e.kind == EventKind::StageCompleted && e.case_id == case_id));
}

#[tokio::test]
async fn revoked_grant_denies_on_the_next_call() {
    let h = harness();
    let grants = Arc::new(Grants::seeded());
    let service = CaseService::new(
        h.store.clone(),
        grants.clone(),
        Arc::new(RecordingNotifier::default()),
    );

    service
        .create_case(support(), intake(h.customer_id))
        .await
        .unwrap();
    grants.revoke(
        UserRole::Support,
        defect_tracker_backend::authz::AppPermission::CaseCreate,
    );
    let err = service
        .create_case(support(), intake(h.customer_id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
}
