//! Stage gates: per-stage completeness checks run at the transition
//! boundary.
//!
//! Departments save partial data freely while a stage is open; the gate is
//! what guarantees the next department never receives incomplete work.
//! Gates are pure functions of the case and item data (plus the reference
//! date for the production-period check), so the same input always yields
//! the same verdict.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use crate::models::case::{CaseItem, PaymentStatus, ReturnCase};

use super::WorkflowStatus;

/// Check whether `case` may leave its current stage. Returns the list of
/// missing or invalid fields when it may not.
pub fn can_complete(case: &ReturnCase, items: &[CaseItem], today: NaiveDate) -> Result<(), Vec<String>> {
    let missing = match case.workflow_status {
        WorkflowStatus::Delivered => delivered_gate(case),
        WorkflowStatus::TechnicalReview => technical_review_gate(case, items, today),
        WorkflowStatus::PaymentCollection => payment_collection_gate(case),
        WorkflowStatus::Shipping => shipping_gate(case),
        // Terminal stage: the engine rejects the transition before any gate
        // runs, so there is nothing to check here.
        WorkflowStatus::Completed => Vec::new(),
    };

    if missing.is_empty() {
        Ok(())
    } else {
        Err(missing)
    }
}

fn delivered_gate(case: &ReturnCase) -> Vec<String> {
    let mut missing = Vec::new();
    if case.customer_id.is_none() {
        missing.push("customer".into());
    }
    if case.arrival_date.is_none() {
        missing.push("arrival date".into());
    }
    if case.receipt_method.is_none() {
        missing.push("receipt method".into());
    }
    missing
}

fn technical_review_gate(case: &ReturnCase, items: &[CaseItem], today: NaiveDate) -> Vec<String> {
    let mut missing = Vec::new();

    if items.is_empty() {
        missing.push("at least one item required".into());
    }
    for (index, item) in items.iter().enumerate() {
        let n = index + 1;
        if item.quantity < 1 {
            missing.push(format!("item {n}: quantity must be at least 1"));
        }
        match item.production_date {
            None => missing.push(format!("item {n}: production period")),
            Some(date) if (date.year(), date.month()) > (today.year(), today.month()) => {
                missing.push(format!("item {n}: production period is in the future"));
            }
            Some(_) => {}
        }
        if item.warranty_status.is_none() {
            missing.push(format!("item {n}: warranty status"));
        }
        if item.fault_responsibility.is_none() {
            missing.push(format!("item {n}: fault responsibility"));
        }
        if item.resolution_method.is_none() {
            missing.push(format!("item {n}: resolution method"));
        }
        if !item.cable_checked {
            missing.push(format!("item {n}: cable check not confirmed"));
        }
        if !item.profile_checked {
            missing.push(format!("item {n}: profile check not confirmed"));
        }
        if !item.packaged {
            missing.push(format!("item {n}: packaging not confirmed"));
        }
    }

    if case
        .performed_service
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .is_empty()
    {
        missing.push("performed service description".into());
    }
    for (label, cost) in [
        ("parts cost", case.parts_cost),
        ("maintenance cost", case.maintenance_cost),
        ("labor cost", case.labor_cost),
    ] {
        match cost {
            None => missing.push(label.into()),
            Some(value) if value < Decimal::ZERO => {
                missing.push(format!("{label} must not be negative"));
            }
            Some(_) => {}
        }
    }

    missing
}

fn payment_collection_gate(case: &ReturnCase) -> Vec<String> {
    match case.payment_status {
        None => vec!["payment status".into()],
        // An explicit unpaid state blocks the handover to shipping.
        Some(PaymentStatus::Unpaid) => vec!["payment is still unpaid".into()],
        Some(PaymentStatus::Paid) | Some(PaymentStatus::Waived) => Vec::new(),
    }
}

fn shipping_gate(case: &ReturnCase) -> Vec<String> {
    let mut missing = Vec::new();
    if case
        .shipping_info
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .is_empty()
    {
        missing.push("shipping information".into());
    }
    if case
        .tracking_number
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .is_empty()
    {
        missing.push("tracking number".into());
    }
    if case.shipping_date.is_none() {
        missing.push("shipping date".into());
    }
    missing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::case::{FaultResponsibility, ReceiptMethod, ResolutionMethod, WarrantyStatus};
    use chrono::Utc;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn blank_case(status: WorkflowStatus) -> ReturnCase {
        ReturnCase {
            id: 1,
            workflow_status: status,
            customer_id: None,
            arrival_date: None,
            receipt_method: None,
            notes: None,
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
        }
    }

    fn complete_item() -> CaseItem {
        CaseItem {
            id: 1,
            case_id: 1,
            product_model_id: 1,
            quantity: 2,
            production_date: NaiveDate::from_ymd_opt(2023, 11, 1),
            warranty_status: Some(WarrantyStatus::InWarranty),
            fault_responsibility: Some(FaultResponsibility::Technical),
            resolution_method: Some(ResolutionMethod::Repair),
            has_control_unit: false,
            cable_checked: true,
            profile_checked: true,
            packaged: true,
        }
    }

    fn reviewed_case() -> ReturnCase {
        let mut case = blank_case(WorkflowStatus::TechnicalReview);
        case.parts_cost = Some(Decimal::new(1000, 2));
        case.maintenance_cost = Some(Decimal::ZERO);
        case.labor_cost = Some(Decimal::new(2550, 2));
        case.performed_service = Some("Replaced emitter board".into());
        case
    }

    #[test]
    fn delivered_gate_lists_every_missing_intake_field() {
        let case = blank_case(WorkflowStatus::Delivered);
        let missing = can_complete(&case, &[], today()).unwrap_err();
        assert_eq!(missing, vec!["customer", "arrival date", "receipt method"]);
    }

    #[test]
    fn delivered_gate_passes_with_full_intake() {
        let mut case = blank_case(WorkflowStatus::Delivered);
        case.customer_id = Some(42);
        case.arrival_date = NaiveDate::from_ymd_opt(2024, 3, 1);
        case.receipt_method = Some(ReceiptMethod::Shipment);
        assert!(can_complete(&case, &[], today()).is_ok());
    }

    #[test]
    fn review_gate_requires_at_least_one_item() {
        let case = reviewed_case();
        let missing = can_complete(&case, &[], today()).unwrap_err();
        assert!(missing.contains(&"at least one item required".to_string()));
    }

    #[test]
    fn review_gate_passes_with_fully_specified_item() {
        let case = reviewed_case();
        assert!(can_complete(&case, &[complete_item()], today()).is_ok());
    }

    #[test]
    fn review_gate_flags_unconfirmed_checks_per_item() {
        let case = reviewed_case();
        let mut item = complete_item();
        item.cable_checked = false;
        item.packaged = false;
        let missing = can_complete(&case, &[item], today()).unwrap_err();
        assert!(missing.contains(&"item 1: cable check not confirmed".to_string()));
        assert!(missing.contains(&"item 1: packaging not confirmed".to_string()));
    }

    #[test]
    fn review_gate_rejects_future_production_period() {
        let case = reviewed_case();
        let mut item = complete_item();
        item.production_date = NaiveDate::from_ymd_opt(2024, 7, 1);
        let missing = can_complete(&case, &[item], today()).unwrap_err();
        assert_eq!(missing, vec!["item 1: production period is in the future"]);
    }

    #[test]
    fn review_gate_accepts_current_month_production() {
        let case = reviewed_case();
        let mut item = complete_item();
        item.production_date = NaiveDate::from_ymd_opt(2024, 6, 1);
        assert!(can_complete(&case, &[item], today()).is_ok());
    }

    #[test]
    fn review_gate_flags_missing_and_negative_costs() {
        let mut case = reviewed_case();
        case.maintenance_cost = None;
        case.labor_cost = Some(Decimal::new(-1, 0));
        let missing = can_complete(&case, &[complete_item()], today()).unwrap_err();
        assert!(missing.contains(&"maintenance cost".to_string()));
        assert!(missing.contains(&"labor cost must not be negative".to_string()));
    }

    #[test]
    fn review_gate_requires_service_description() {
        let mut case = reviewed_case();
        case.performed_service = Some("   ".into());
        let missing = can_complete(&case, &[complete_item()], today()).unwrap_err();
        assert!(missing.contains(&"performed service description".to_string()));
    }

    #[test]
    fn unpaid_blocks_payment_collection() {
        let mut case = blank_case(WorkflowStatus::PaymentCollection);
        case.payment_status = Some(PaymentStatus::Unpaid);
        let missing = can_complete(&case, &[], today()).unwrap_err();
        assert_eq!(missing, vec!["payment is still unpaid"]);
    }

    #[test]
    fn paid_and_waived_pass_payment_collection() {
        let mut case = blank_case(WorkflowStatus::PaymentCollection);
        case.payment_status = Some(PaymentStatus::Paid);
        assert!(can_complete(&case, &[], today()).is_ok());
        case.payment_status = Some(PaymentStatus::Waived);
        assert!(can_complete(&case, &[], today()).is_ok());
    }

    #[test]
    fn shipping_gate_requires_all_three_fields() {
        let mut case = blank_case(WorkflowStatus::Shipping);
        case.tracking_number = Some("TRK-123".into());
        let missing = can_complete(&case, &[], today()).unwrap_err();
        assert_eq!(missing, vec!["shipping information", "shipping date"]);
    }

    #[test]
    fn gate_verdict_is_deterministic() {
        let case = blank_case(WorkflowStatus::Delivered);
        let first = can_complete(&case, &[], today());
        let second = can_complete(&case, &[], today());
        assert_eq!(first, second);
    }
}
