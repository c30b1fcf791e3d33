//! In-memory case store.
//!
//! Mirrors the Postgres store's semantics, including the stage
//! compare-and-swap on every mutation. Backs the integration test suite and
//! local experiments that do not need a database.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::{AppError, Result};
use crate::models::case::{CaseItem, IntakePatch, NewItem, ReturnCase, StagePatch};
use crate::models::customer::Customer;
use crate::models::product::{ProductModel, ProductType};
use crate::workflow::WorkflowStatus;

use super::{CaseFilter, CasePage, CaseStore, PageRequest};

#[derive(Default)]
struct Inner {
    cases: BTreeMap<i32, ReturnCase>,
    items: HashMap<i32, Vec<CaseItem>>,
    customers: BTreeMap<i32, Customer>,
    products: BTreeMap<i32, ProductModel>,
    next_case_id: i32,
    next_item_id: i32,
    next_customer_id: i32,
    next_product_id: i32,
}

/// Mutex-held in-memory store. No await happens while the lock is held.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a customer, returning it with its assigned id.
    pub fn add_customer(&self, name: &str) -> Customer {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        inner.next_customer_id += 1;
        let customer = Customer {
            id: inner.next_customer_id,
            name: name.to_string(),
            representative: None,
            contact_info: None,
            address: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        inner.customers.insert(customer.id, customer.clone());
        customer
    }

    /// Insert a product model, returning it with its assigned id.
    pub fn add_product_model(&self, name: &str, product_type: ProductType) -> ProductModel {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        inner.next_product_id += 1;
        let product = ProductModel {
            id: inner.next_product_id,
            name: name.to_string(),
            product_type,
            created_at: Utc::now(),
        };
        inner.products.insert(product.id, product.clone());
        product
    }

    fn materialize_items(inner: &mut Inner, case_id: i32, items: &[NewItem]) -> Vec<CaseItem> {
        items
            .iter()
            .map(|item| {
                inner.next_item_id += 1;
                CaseItem {
                    id: inner.next_item_id,
                    case_id,
                    product_model_id: item.product_model_id,
                    quantity: item.quantity,
                    production_date: item.production_date,
                    warranty_status: item.warranty_status,
                    fault_responsibility: item.fault_responsibility,
                    resolution_method: item.resolution_method,
                    has_control_unit: item.has_control_unit,
                    cable_checked: item.cable_checked,
                    profile_checked: item.profile_checked,
                    packaged: item.packaged,
                }
            })
            .collect()
    }

    fn matches(inner: &Inner, case: &ReturnCase, filter: &CaseFilter) -> bool {
        if let Some(customer) = &filter.customer {
            let needle = customer.to_lowercase();
            let hit = case
                .customer_id
                .and_then(|id| inner.customers.get(&id))
                .map(|c| c.name.to_lowercase().contains(&needle))
                .unwrap_or(false);
            if !hit {
                return false;
            }
        }
        if let Some(status) = filter.status {
            if case.workflow_status != status {
                return false;
            }
        }
        if let Some(from) = filter.arrival_from {
            if case.arrival_date.map(|d| d < from).unwrap_or(true) {
                return false;
            }
        }
        if let Some(to) = filter.arrival_to {
            if case.arrival_date.map(|d| d > to).unwrap_or(true) {
                return false;
            }
        }
        if let Some(method) = filter.receipt_method {
            if case.receipt_method != Some(method) {
                return false;
            }
        }
        if filter.product_model_id.is_some() || filter.product_type.is_some() {
            let items = inner.items.get(&case.id).map(Vec::as_slice).unwrap_or(&[]);
            let hit = items.iter().any(|item| {
                if let Some(model_id) = filter.product_model_id {
                    if item.product_model_id != model_id {
                        return false;
                    }
                }
                if let Some(product_type) = filter.product_type {
                    match inner.products.get(&item.product_model_id) {
                        Some(p) if p.product_type == product_type => {}
                        _ => return false,
                    }
                }
                true
            });
            if !hit {
                return false;
            }
        }
        true
    }
}

#[async_trait]
impl CaseStore for MemoryStore {
    async fn create_case(&self, intake: &IntakePatch) -> Result<ReturnCase> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        inner.next_case_id += 1;
        let case = ReturnCase {
            id: inner.next_case_id,
            workflow_status: WorkflowStatus::Delivered,
            customer_id: intake.customer_id,
            arrival_date: intake.arrival_date,
            receipt_method: intake.receipt_method,
            notes: intake.notes.clone(),
            parts_cost: None,
            maintenance_cost: None,
            labor_cost: None,
            performed_service: None,
            payment_status: None,
            shipping_info: None,
            tracking_number: None,
            shipping_date: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        inner.cases.insert(case.id, case.clone());
        inner.items.insert(case.id, Vec::new());
        Ok(case)
    }

    async fn get_case(&self, id: i32) -> Result<ReturnCase> {
        let inner = self.inner.lock().expect("store lock poisoned");
        inner
            .cases
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Case {} not found", id)))
    }

    async fn get_items(&self, case_id: i32) -> Result<Vec<CaseItem>> {
        let inner = self.inner.lock().expect("store lock poisoned");
        Ok(inner.items.get(&case_id).cloned().unwrap_or_default())
    }

    async fn list_cases(&self, filter: &CaseFilter, page: PageRequest) -> Result<CasePage> {
        let inner = self.inner.lock().expect("store lock poisoned");
        let mut matching: Vec<ReturnCase> = inner
            .cases
            .values()
            .filter(|case| Self::matches(&inner, case, filter))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.id.cmp(&a.id));

        let total = matching.len() as i64;
        let cases = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect();

        Ok(CasePage { cases, total })
    }

    async fn update_stage(&self, id: i32, patch: &StagePatch) -> Result<ReturnCase> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let current = inner
            .cases
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Case {} not found", id)))?
            .clone();

        let stage = patch.stage();
        if current.workflow_status != stage {
            return Err(AppError::StateConflict(format!(
                "case {} is in the {} stage, not {}",
                id,
                current.workflow_status.label(),
                stage.label()
            )));
        }

        let mut case = current;
        match patch {
            StagePatch::Delivered(p) => {
                case.customer_id = p.customer_id;
                case.arrival_date = p.arrival_date;
                case.receipt_method = p.receipt_method;
                case.notes = p.notes.clone();
            }
            StagePatch::TechnicalReview(p) => {
                case.parts_cost = p.parts_cost;
                case.maintenance_cost = p.maintenance_cost;
                case.labor_cost = p.labor_cost;
                case.performed_service = p.performed_service.clone();
                let items = Self::materialize_items(&mut inner, id, &p.items);
                inner.items.insert(id, items);
            }
            StagePatch::PaymentCollection(p) => {
                case.payment_status = p.payment_status;
            }
            StagePatch::Shipping(p) => {
                case.shipping_info = p.shipping_info.clone();
                case.tracking_number = p.tracking_number.clone();
                case.shipping_date = p.shipping_date;
            }
        }
        case.updated_at = Utc::now();
        inner.cases.insert(id, case.clone());
        Ok(case)
    }

    async fn advance_status(
        &self,
        id: i32,
        from: WorkflowStatus,
        to: WorkflowStatus,
    ) -> Result<()> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let case = inner
            .cases
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Case {} not found", id)))?;

        if case.workflow_status != from {
            return Err(AppError::StateConflict(format!(
                "case {} is in the {} stage, not {}",
                id,
                case.workflow_status.label(),
                from.label()
            )));
        }
        case.workflow_status = to;
        case.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_case(&self, id: i32) -> Result<()> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        if inner.cases.remove(&id).is_none() {
            return Err(AppError::NotFound(format!("Case {} not found", id)));
        }
        inner.items.remove(&id);
        Ok(())
    }

    async fn get_customer(&self, id: i32) -> Result<Customer> {
        let inner = self.inner.lock().expect("store lock poisoned");
        inner
            .customers
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Customer {} not found", id)))
    }

    async fn get_product_model(&self, id: i32) -> Result<ProductModel> {
        let inner = self.inner.lock().expect("store lock poisoned");
        inner
            .products
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Product model {} not found", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn advance_status_is_a_compare_and_swap() {
        let store = MemoryStore::new();
        let case = store.create_case(&IntakePatch::default()).await.unwrap();

        store
            .advance_status(
                case.id,
                WorkflowStatus::Delivered,
                WorkflowStatus::TechnicalReview,
            )
            .await
            .unwrap();

        // A second attempt from the old stage observes the advance and fails.
        let err = store
            .advance_status(
                case.id,
                WorkflowStatus::Delivered,
                WorkflowStatus::TechnicalReview,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::StateConflict(_)));
    }

    #[tokio::test]
    async fn update_stage_rejects_a_stage_the_case_left() {
        let store = MemoryStore::new();
        let case = store.create_case(&IntakePatch::default()).await.unwrap();
        store
            .advance_status(
                case.id,
                WorkflowStatus::Delivered,
                WorkflowStatus::TechnicalReview,
            )
            .await
            .unwrap();

        let err = store
            .update_stage(case.id, &StagePatch::Delivered(IntakePatch::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::StateConflict(_)));
    }

    #[tokio::test]
    async fn deleting_a_case_removes_its_items() {
        let store = MemoryStore::new();
        let product = store.add_product_model("DT42", ProductType::DoorDetector);
        let case = store.create_case(&IntakePatch::default()).await.unwrap();
        store
            .update_stage(
                case.id,
                &StagePatch::Delivered(IntakePatch::default()),
            )
            .await
            .unwrap();
        // Move to review and attach an item, then delete.
        store
            .advance_status(
                case.id,
                WorkflowStatus::Delivered,
                WorkflowStatus::TechnicalReview,
            )
            .await
            .unwrap();
        store
            .update_stage(
                case.id,
                &StagePatch::TechnicalReview(crate::models::case::ReviewPatch {
                    items: vec![NewItem {
                        product_model_id: product.id,
                        quantity: 1,
                        production_date: None,
                        warranty_status: None,
                        fault_responsibility: None,
                        resolution_method: None,
                        has_control_unit: false,
                        cable_checked: false,
                        profile_checked: false,
                        packaged: false,
                    }],
                    ..Default::default()
                }),
            )
            .await
            .unwrap();
        assert_eq!(store.get_items(case.id).await.unwrap().len(), 1);

        store.delete_case(case.id).await.unwrap();
        assert!(store.get_case(case.id).await.is_err());
        assert!(store.get_items(case.id).await.unwrap().is_empty());
    }
}
