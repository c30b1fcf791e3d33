//! Business logic services.

pub mod audit_service;
pub mod auth_service;
pub mod case_service;
pub mod user_service;
