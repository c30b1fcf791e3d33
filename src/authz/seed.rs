//! Bootstrap grant table.
//!
//! Each department owns the edit and completion rights of exactly one
//! stage; the final confirmation right belongs to management.

use super::{AppPermission, UserRole};

use AppPermission::*;

/// The fixed role → permission assignment loaded at startup.
pub const DEFAULT_GRANTS: &[(UserRole, &[AppPermission])] = &[
    (
        UserRole::Admin,
        &[
            PageViewAdmin,
            PageViewCustomerList,
            PageViewProductList,
            PageViewCaseTracking,
            PageViewStatistics,
            CaseCompleteCompleted,
        ],
    ),
    (
        UserRole::Manager,
        &[
            PageViewProductList,
            PageViewCaseTracking,
            PageViewStatistics,
            CaseCompleteCompleted,
        ],
    ),
    (
        UserRole::Support,
        &[
            PageViewCaseTracking,
            CaseCreate,
            CaseDelete,
            CaseEditDelivered,
            CaseCompleteDelivered,
            CustomerGet,
        ],
    ),
    (
        UserRole::Technician,
        &[
            PageViewCaseTracking,
            CaseEditTechnicalReview,
            CaseCompleteTechnicalReview,
        ],
    ),
    (
        UserRole::Sales,
        &[
            PageViewCustomerList,
            PageViewCaseTracking,
            CustomerCreate,
            CustomerGet,
            CustomerEdit,
            CustomerDelete,
            CaseEditPaymentCollection,
            CaseCompletePaymentCollection,
        ],
    ),
    (
        UserRole::Logistics,
        &[
            PageViewCaseTracking,
            CaseEditShipping,
            CaseCompleteShipping,
        ],
    ),
];
