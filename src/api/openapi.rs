//! OpenAPI document served at `/api/v1/openapi.json`.

use utoipa::OpenApi;

use crate::api::dto::{MessageResponse, Pagination};
use crate::authz::{AppPermission, UserRole};
use crate::models::case::{
    CaseItem, CollectionPatch, FaultResponsibility, IntakePatch, NewItem, PaymentStatus,
    ReceiptMethod, ResolutionMethod, ReturnCase, ReviewPatch, ShippingPatch, WarrantyStatus,
};
use crate::models::customer::Customer;
use crate::models::product::{ProductModel, ProductType};
use crate::workflow::WorkflowStatus;

/// Top-level OpenAPI document for the return-case tracking API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Return Case Tracker API",
        description = "Tracks returned hardware units through the five-stage repair-and-reimbursement workflow.",
        version = "0.1.0",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "/", description = "Current server"),
    ),
    tags(
        (name = "auth", description = "Login and invitation acceptance"),
        (name = "cases", description = "Return cases and the stage workflow"),
        (name = "customers", description = "Customer directory"),
        (name = "products", description = "Product model catalog"),
        (name = "admin", description = "Users, role grants and the audit trail"),
    ),
    components(schemas(
        WorkflowStatus,
        ReceiptMethod,
        PaymentStatus,
        WarrantyStatus,
        FaultResponsibility,
        ResolutionMethod,
        ProductType,
        UserRole,
        AppPermission,
        ReturnCase,
        CaseItem,
        NewItem,
        IntakePatch,
        ReviewPatch,
        CollectionPatch,
        ShippingPatch,
        Customer,
        ProductModel,
        Pagination,
        MessageResponse,
    ))
)]
pub struct ApiDoc;

/// Build the OpenAPI spec once at startup.
pub fn build_openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
