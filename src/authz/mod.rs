//! Role/permission authorization layer.
//!
//! Roles and permissions are closed enums; grants are held in one
//! process-wide set seeded at startup and mutated only through the admin
//! endpoints. Every authorization check is a plain set-membership read, so
//! admin changes are visible to the next request immediately.

pub mod seed;

use std::collections::HashSet;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, Result};

/// Organizational roles. Fixed at bootstrap; a user holds exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Manager,
    Technician,
    Support,
    Sales,
    Logistics,
}

impl UserRole {
    /// Parse the role claim carried by an identity token. Anything
    /// unrecognized maps to `None`, which every authorization check denies.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Self::Admin),
            "manager" => Some(Self::Manager),
            "technician" => Some(Self::Technician),
            "support" => Some(Self::Support),
            "sales" => Some(Self::Sales),
            "logistics" => Some(Self::Logistics),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Technician => "technician",
            Self::Support => "support",
            Self::Sales => "sales",
            Self::Logistics => "logistics",
        }
    }

    /// All roles, for seeding and admin listings.
    pub const ALL: [UserRole; 6] = [
        Self::Admin,
        Self::Manager,
        Self::Technician,
        Self::Support,
        Self::Sales,
        Self::Logistics,
    ];
}

/// Fine-grained capabilities: page views, per-stage edit/complete rights,
/// and entity CRUD. Closed set, immutable after bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AppPermission {
    // Page views
    PageViewAdmin,
    PageViewCustomerList,
    PageViewProductList,
    PageViewCaseTracking,
    PageViewStatistics,

    // Case lifecycle
    CaseCreate,
    CaseDelete,

    // Per-stage edit/complete
    CaseEditDelivered,
    CaseCompleteDelivered,
    CaseEditTechnicalReview,
    CaseCompleteTechnicalReview,
    CaseEditPaymentCollection,
    CaseCompletePaymentCollection,
    CaseEditShipping,
    CaseCompleteShipping,
    CaseCompleteCompleted,

    // Customer directory
    CustomerCreate,
    CustomerGet,
    CustomerEdit,
    CustomerDelete,
}

/// The role → permission assignment, queried on every authorization check.
///
/// A role with zero grants is representable and simply denies everything.
pub struct Grants {
    inner: RwLock<HashSet<(UserRole, AppPermission)>>,
}

impl Grants {
    /// Empty grant set; every check denies.
    pub fn empty() -> Self {
        Self {
            inner: RwLock::new(HashSet::new()),
        }
    }

    /// Grant set seeded from the fixed bootstrap table.
    pub fn seeded() -> Self {
        let grants = Self::empty();
        for (role, permissions) in seed::DEFAULT_GRANTS {
            for permission in *permissions {
                grants.grant(*role, *permission);
            }
        }
        grants
    }

    /// Pure membership test: does `role` hold `permission` right now?
    pub fn allow(&self, role: UserRole, permission: AppPermission) -> bool {
        self.inner
            .read()
            .expect("grants lock poisoned")
            .contains(&(role, permission))
    }

    /// Authorization guard. `None` means the caller presented no usable
    /// role, which always denies. Runs before any state mutation.
    pub fn authorize(&self, role: Option<UserRole>, permission: AppPermission) -> Result<()> {
        match role {
            Some(role) if self.allow(role, permission) => Ok(()),
            _ => Err(AppError::Forbidden),
        }
    }

    /// Add a grant. Returns false if it was already present.
    pub fn grant(&self, role: UserRole, permission: AppPermission) -> bool {
        self.inner
            .write()
            .expect("grants lock poisoned")
            .insert((role, permission))
    }

    /// Remove a grant. Returns false if it was not present.
    pub fn revoke(&self, role: UserRole, permission: AppPermission) -> bool {
        self.inner
            .write()
            .expect("grants lock poisoned")
            .remove(&(role, permission))
    }

    /// All permissions currently granted to `role`.
    pub fn permissions_for(&self, role: UserRole) -> Vec<AppPermission> {
        self.inner
            .read()
            .expect("grants lock poisoned")
            .iter()
            .filter(|(r, _)| *r == role)
            .map(|(_, p)| *p)
            .collect()
    }
}
