//! Customer model.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

/// Customer entity
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Customer {
    pub id: i32,
    pub name: String,
    pub representative: Option<String>,
    pub contact_info: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
