//! Return case handlers: creation, listing, deletion, and the stage-scoped
//! edit/complete endpoints of the workflow.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::dto::{MessageResponse, Pagination};
use crate::api::middleware::auth::AuthExtension;
use crate::api::SharedState;
use crate::error::Result;
use crate::models::case::{
    CaseItem, CollectionPatch, IntakePatch, ReceiptMethod, ReturnCase, ReviewPatch, ShippingPatch,
    StagePatch,
};
use crate::models::product::ProductType;
use crate::services::case_service::CaseDetail;
use crate::store::{CaseFilter, PageRequest};
use crate::workflow::WorkflowStatus;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", post(create_case).get(list_cases))
        .route("/:id", get(get_case).delete(delete_case))
        .route("/:id/stages/delivered", put(edit_delivered))
        .route("/:id/stages/delivered/complete", post(complete_delivered))
        .route("/:id/stages/technical-review", put(edit_technical_review))
        .route(
            "/:id/stages/technical-review/complete",
            post(complete_technical_review),
        )
        .route("/:id/stages/payment-collection", put(edit_payment_collection))
        .route(
            "/:id/stages/payment-collection/complete",
            post(complete_payment_collection),
        )
        .route("/:id/stages/shipping", put(edit_shipping))
        .route("/:id/stages/shipping/complete", post(complete_shipping))
        // Terminal stage: confirmation endpoint exists for Manager/Admin but
        // always reports a state conflict, COMPLETED has no successor.
        .route("/:id/stages/completed/complete", post(complete_completed))
}

#[derive(Debug, Deserialize)]
pub struct CaseListQuery {
    /// Substring match on the customer name
    pub customer: Option<String>,
    pub status: Option<WorkflowStatus>,
    pub arrival_from: Option<NaiveDate>,
    pub arrival_to: Option<NaiveDate>,
    pub receipt_method: Option<ReceiptMethod>,
    pub product_model_id: Option<i32>,
    pub product_type: Option<ProductType>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct CaseResponse {
    #[serde(flatten)]
    pub case: ReturnCase,
    pub total_cost: Option<Decimal>,
    pub status_label: &'static str,
    pub items: Vec<CaseItem>,
}

impl From<CaseDetail> for CaseResponse {
    fn from(detail: CaseDetail) -> Self {
        Self {
            total_cost: detail.case.total_cost(),
            status_label: detail.case.workflow_status.label(),
            case: detail.case,
            items: detail.items,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CaseSummary {
    #[serde(flatten)]
    pub case: ReturnCase,
    pub total_cost: Option<Decimal>,
    pub status_label: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CaseListResponse {
    pub cases: Vec<CaseSummary>,
    pub pagination: Pagination,
}

pub async fn create_case(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Json(intake): Json<IntakePatch>,
) -> Result<(StatusCode, Json<CaseResponse>)> {
    let detail = state.case_service().create_case(auth.role, intake).await?;
    state
        .audit_service()
        .record(&auth.email, "case.create", Some(detail.case.id), json!({}))
        .await;
    Ok((StatusCode::CREATED, Json(detail.into())))
}

pub async fn list_cases(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Query(query): Query<CaseListQuery>,
) -> Result<Json<CaseListResponse>> {
    let filter = CaseFilter {
        customer: query.customer,
        status: query.status,
        arrival_from: query.arrival_from,
        arrival_to: query.arrival_to,
        receipt_method: query.receipt_method,
        product_model_id: query.product_model_id,
        product_type: query.product_type,
    };
    let page = PageRequest {
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(20),
    }
    .clamped();

    let result = state
        .case_service()
        .list_cases(auth.role, &filter, page)
        .await?;

    Ok(Json(CaseListResponse {
        pagination: Pagination::new(page.page, page.per_page, result.total),
        cases: result
            .cases
            .into_iter()
            .map(|case| CaseSummary {
                total_cost: case.total_cost(),
                status_label: case.workflow_status.label(),
                case,
            })
            .collect(),
    }))
}

pub async fn get_case(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<i32>,
) -> Result<Json<CaseResponse>> {
    let detail = state.case_service().get_case(auth.role, id).await?;
    Ok(Json(detail.into()))
}

pub async fn delete_case(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<i32>,
) -> Result<Json<MessageResponse>> {
    state.case_service().delete_case(auth.role, id).await?;
    state
        .audit_service()
        .record(&auth.email, "case.delete", Some(id), json!({}))
        .await;
    Ok(Json(MessageResponse::new(format!(
        "Return case {} has been deleted",
        id
    ))))
}

async fn edit_stage(
    state: SharedState,
    auth: AuthExtension,
    id: i32,
    patch: StagePatch,
) -> Result<Json<CaseResponse>> {
    let stage = patch.stage();
    let detail = state.case_service().edit_stage(auth.role, id, patch).await?;
    state
        .audit_service()
        .record(
            &auth.email,
            &format!("case.edit.{}", stage),
            Some(id),
            json!({}),
        )
        .await;
    Ok(Json(detail.into()))
}

async fn complete_stage(
    state: SharedState,
    auth: AuthExtension,
    id: i32,
    stage: WorkflowStatus,
) -> Result<Json<CaseResponse>> {
    let detail = state
        .case_service()
        .complete_stage(auth.role, id, stage)
        .await?;
    state
        .audit_service()
        .record(
            &auth.email,
            &format!("case.complete.{}", stage),
            Some(id),
            json!({ "advanced_to": detail.case.workflow_status }),
        )
        .await;
    Ok(Json(detail.into()))
}

pub async fn edit_delivered(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<i32>,
    Json(patch): Json<IntakePatch>,
) -> Result<Json<CaseResponse>> {
    edit_stage(state, auth, id, StagePatch::Delivered(patch)).await
}

pub async fn edit_technical_review(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<i32>,
    Json(patch): Json<ReviewPatch>,
) -> Result<Json<CaseResponse>> {
    edit_stage(state, auth, id, StagePatch::TechnicalReview(patch)).await
}

pub async fn edit_payment_collection(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<i32>,
    Json(patch): Json<CollectionPatch>,
) -> Result<Json<CaseResponse>> {
    edit_stage(state, auth, id, StagePatch::PaymentCollection(patch)).await
}

pub async fn edit_shipping(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<i32>,
    Json(patch): Json<ShippingPatch>,
) -> Result<Json<CaseResponse>> {
    edit_stage(state, auth, id, StagePatch::Shipping(patch)).await
}

pub async fn complete_delivered(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<i32>,
) -> Result<Json<CaseResponse>> {
    complete_stage(state, auth, id, WorkflowStatus::Delivered).await
}

pub async fn complete_technical_review(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<i32>,
) -> Result<Json<CaseResponse>> {
    complete_stage(state, auth, id, WorkflowStatus::TechnicalReview).await
}

pub async fn complete_payment_collection(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<i32>,
) -> Result<Json<CaseResponse>> {
    complete_stage(state, auth, id, WorkflowStatus::PaymentCollection).await
}

pub async fn complete_shipping(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<i32>,
) -> Result<Json<CaseResponse>> {
    complete_stage(state, auth, id, WorkflowStatus::Shipping).await
}

pub async fn complete_completed(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<i32>,
) -> Result<Json<CaseResponse>> {
    complete_stage(state, auth, id, WorkflowStatus::Completed).await
}
