//! Case persistence boundary.
//!
//! The workflow engine only ever talks to the [`CaseStore`] trait; the
//! Postgres implementation backs the running service and the in-memory one
//! drives the integration suite with identical semantics.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::models::case::{CaseItem, IntakePatch, ReceiptMethod, ReturnCase, StagePatch};
use crate::models::customer::Customer;
use crate::models::product::{ProductModel, ProductType};
use crate::workflow::WorkflowStatus;

pub use memory::MemoryStore;
pub use postgres::PgCaseStore;

/// Filters accepted by the case listing.
#[derive(Debug, Clone, Default)]
pub struct CaseFilter {
    /// Substring match on the customer name
    pub customer: Option<String>,
    pub status: Option<WorkflowStatus>,
    pub arrival_from: Option<NaiveDate>,
    pub arrival_to: Option<NaiveDate>,
    pub receipt_method: Option<ReceiptMethod>,
    pub product_model_id: Option<i32>,
    pub product_type: Option<ProductType>,
}

/// Page window for listings.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
        }
    }
}

impl PageRequest {
    /// Page clamped to sane bounds (page ≥ 1, 1 ≤ per_page ≤ 100).
    pub fn clamped(self) -> Self {
        Self {
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, 100),
        }
    }

    pub fn offset(self) -> i64 {
        let p = self.clamped();
        ((p.page - 1) * p.per_page) as i64
    }

    pub fn limit(self) -> i64 {
        self.clamped().per_page as i64
    }
}

/// One page of cases plus the unpaged total.
#[derive(Debug, Clone)]
pub struct CasePage {
    pub cases: Vec<ReturnCase>,
    pub total: i64,
}

/// Persistence operations the workflow engine consumes.
///
/// Mutations are single-row read-modify-write transactions: the stage
/// precondition travels in the write itself, so two concurrent attempts on
/// one case cannot both succeed.
#[async_trait]
pub trait CaseStore: Send + Sync {
    /// Create a case in DELIVERED with whatever intake fields were given.
    async fn create_case(&self, intake: &IntakePatch) -> Result<ReturnCase>;

    async fn get_case(&self, id: i32) -> Result<ReturnCase>;

    async fn get_items(&self, case_id: i32) -> Result<Vec<CaseItem>>;

    async fn list_cases(&self, filter: &CaseFilter, page: PageRequest) -> Result<CasePage>;

    /// Apply a stage-scoped edit. Fails with a state conflict if the case
    /// has left the patch's stage; the item list (technical review) is
    /// replaced wholesale in the same transaction.
    async fn update_stage(&self, id: i32, patch: &StagePatch) -> Result<ReturnCase>;

    /// Advance `from` → `to` iff the case is still in `from`.
    async fn advance_status(&self, id: i32, from: WorkflowStatus, to: WorkflowStatus)
        -> Result<()>;

    /// Delete the case and, transitively, its items.
    async fn delete_case(&self, id: i32) -> Result<()>;

    async fn get_customer(&self, id: i32) -> Result<Customer>;

    async fn get_product_model(&self, id: i32) -> Result<ProductModel>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_clamps_out_of_range_values() {
        let page = PageRequest {
            page: 0,
            per_page: 10_000,
        };
        let clamped = page.clamped();
        assert_eq!(clamped.page, 1);
        assert_eq!(clamped.per_page, 100);
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn offset_accounts_for_page_number() {
        let page = PageRequest {
            page: 3,
            per_page: 20,
        };
        assert_eq!(page.offset(), 40);
        assert_eq!(page.limit(), 20);
    }
}
