//! Return case and case item models, plus the per-stage patch types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::workflow::WorkflowStatus;

/// How the returned unit arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "receipt_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReceiptMethod {
    Shipment,
    HandDelivered,
}

impl ReceiptMethod {
    pub fn label(self) -> &'static str {
        match self {
            Self::Shipment => "Shipment",
            Self::HandDelivered => "Hand-delivered",
        }
    }
}

/// Payment state recorded during collection. `Unpaid` blocks completion of
/// the collection stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Unpaid,
    Waived,
}

impl PaymentStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Paid => "Paid",
            Self::Unpaid => "Unpaid",
            Self::Waived => "Waived",
        }
    }
}

/// Warranty verdict for one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "warranty_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WarrantyStatus {
    InWarranty,
    OutOfWarranty,
    Unknown,
}

/// Who is responsible for the fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "fault_responsibility", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FaultResponsibility {
    UserCaused,
    Technical,
    Mixed,
    Unknown,
}

/// How the technician resolved the item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "resolution_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    Repair,
    FreeReplacement,
    NoneAvailable,
    Unknown,
}

/// One returned-unit intake moving through the workflow.
///
/// Field groups are owned by exactly one stage; `workflow_status` decides
/// which group is currently editable.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct ReturnCase {
    pub id: i32,
    pub workflow_status: WorkflowStatus,
    // Intake (DELIVERED)
    pub customer_id: Option<i32>,
    pub arrival_date: Option<NaiveDate>,
    pub receipt_method: Option<ReceiptMethod>,
    pub notes: Option<String>,
    // Technical review
    pub parts_cost: Option<Decimal>,
    pub maintenance_cost: Option<Decimal>,
    pub labor_cost: Option<Decimal>,
    pub performed_service: Option<String>,
    // Payment collection
    pub payment_status: Option<PaymentStatus>,
    // Shipping
    pub shipping_info: Option<String>,
    pub tracking_number: Option<String>,
    pub shipping_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReturnCase {
    /// Derived total: sum of the three cost components once all are set.
    pub fn total_cost(&self) -> Option<Decimal> {
        match (self.parts_cost, self.maintenance_cost, self.labor_cost) {
            (Some(parts), Some(maintenance), Some(labor)) => Some(parts + maintenance + labor),
            _ => None,
        }
    }
}

/// One physical unit inside a case. Owned by the case; the whole item list
/// is replaced on every technical-review edit and deleted with the case.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct CaseItem {
    pub id: i32,
    pub case_id: i32,
    pub product_model_id: i32,
    pub quantity: i32,
    pub production_date: Option<NaiveDate>,
    pub warranty_status: Option<WarrantyStatus>,
    pub fault_responsibility: Option<FaultResponsibility>,
    pub resolution_method: Option<ResolutionMethod>,
    pub has_control_unit: bool,
    pub cable_checked: bool,
    pub profile_checked: bool,
    pub packaged: bool,
}

fn default_quantity() -> i32 {
    1
}

/// Incoming item payload; persisted ids are assigned by the store.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewItem {
    pub product_model_id: i32,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    pub production_date: Option<NaiveDate>,
    pub warranty_status: Option<WarrantyStatus>,
    pub fault_responsibility: Option<FaultResponsibility>,
    pub resolution_method: Option<ResolutionMethod>,
    #[serde(default)]
    pub has_control_unit: bool,
    #[serde(default)]
    pub cable_checked: bool,
    #[serde(default)]
    pub profile_checked: bool,
    #[serde(default)]
    pub packaged: bool,
}

/// Intake fields owned by the DELIVERED stage. Also the creation payload.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct IntakePatch {
    pub customer_id: Option<i32>,
    pub arrival_date: Option<NaiveDate>,
    pub receipt_method: Option<ReceiptMethod>,
    pub notes: Option<String>,
}

/// Review fields owned by TECHNICAL_REVIEW. The item list replaces the
/// stored one wholesale.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ReviewPatch {
    pub parts_cost: Option<Decimal>,
    pub maintenance_cost: Option<Decimal>,
    pub labor_cost: Option<Decimal>,
    pub performed_service: Option<String>,
    #[serde(default)]
    pub items: Vec<NewItem>,
}

/// Collection field owned by PAYMENT_COLLECTION.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CollectionPatch {
    pub payment_status: Option<PaymentStatus>,
}

/// Shipping fields owned by SHIPPING.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ShippingPatch {
    pub shipping_info: Option<String>,
    pub tracking_number: Option<String>,
    pub shipping_date: Option<NaiveDate>,
}

/// A stage-scoped edit: carries exactly the fields the stage owns, so an
/// edit can never touch another department's data. Each payload is the full
/// stage form; the stage's columns are set to exactly these values.
#[derive(Debug, Clone)]
pub enum StagePatch {
    Delivered(IntakePatch),
    TechnicalReview(ReviewPatch),
    PaymentCollection(CollectionPatch),
    Shipping(ShippingPatch),
}

impl StagePatch {
    /// The stage whose fields this patch owns.
    pub fn stage(&self) -> WorkflowStatus {
        match self {
            Self::Delivered(_) => WorkflowStatus::Delivered,
            Self::TechnicalReview(_) => WorkflowStatus::TechnicalReview,
            Self::PaymentCollection(_) => WorkflowStatus::PaymentCollection,
            Self::Shipping(_) => WorkflowStatus::Shipping,
        }
    }
}
