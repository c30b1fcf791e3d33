//! Product catalog model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Product category enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "product_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    DoorDetector,
    ControlUnit,
    Overload,
}

/// Product model entity
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct ProductModel {
    pub id: i32,
    pub name: String,
    pub product_type: ProductType,
    pub created_at: DateTime<Utc>,
}
