//! Customer directory handlers.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::dto::{MessageResponse, Pagination, PaginationQuery};
use crate::api::middleware::auth::AuthExtension;
use crate::api::SharedState;
use crate::authz::AppPermission;
use crate::error::{AppError, Result};
use crate::models::customer::Customer;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_customers).post(create_customer))
        .route(
            "/:id",
            get(get_customer).put(update_customer).delete(delete_customer),
        )
}

#[derive(Debug, Deserialize)]
pub struct CustomerListQuery {
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CustomerPayload {
    pub name: String,
    pub representative: Option<String>,
    pub contact_info: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CustomerListResponse {
    pub customers: Vec<Customer>,
    pub pagination: Pagination,
}

pub async fn list_customers(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Query(query): Query<CustomerListQuery>,
) -> Result<Json<CustomerListResponse>> {
    state
        .grants
        .authorize(auth.role, AppPermission::CustomerGet)?;

    let paging = PaginationQuery {
        page: query.page,
        per_page: query.per_page,
    };
    let pattern = format!("%{}%", query.search.as_deref().unwrap_or(""));

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers WHERE name ILIKE $1")
        .bind(&pattern)
        .fetch_one(&state.db)
        .await?;

    let customers = sqlx::query_as::<_, Customer>(
        "SELECT * FROM customers WHERE name ILIKE $1 ORDER BY name LIMIT $2 OFFSET $3",
    )
    .bind(&pattern)
    .bind(paging.per_page() as i64)
    .bind(((paging.page() - 1) * paging.per_page()) as i64)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(CustomerListResponse {
        pagination: Pagination::new(paging.page(), paging.per_page(), total),
        customers,
    }))
}

pub async fn get_customer(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<i32>,
) -> Result<Json<Customer>> {
    state
        .grants
        .authorize(auth.role, AppPermission::CustomerGet)?;
    let customer = state.store.get_customer(id).await?;
    Ok(Json(customer))
}

pub async fn create_customer(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Json(payload): Json<CustomerPayload>,
) -> Result<(StatusCode, Json<Customer>)> {
    state
        .grants
        .authorize(auth.role, AppPermission::CustomerCreate)?;
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Customer name is required".into()));
    }

    let customer = sqlx::query_as::<_, Customer>(
        r#"
        INSERT INTO customers (name, representative, contact_info, address)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(name)
    .bind(payload.representative.as_deref())
    .bind(payload.contact_info.as_deref())
    .bind(payload.address.as_deref())
    .fetch_one(&state.db)
    .await?;

    state
        .audit_service()
        .record(&auth.email, "customer.create", None, json!({"customer_id": customer.id}))
        .await;

    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn update_customer(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<i32>,
    Json(payload): Json<CustomerPayload>,
) -> Result<Json<Customer>> {
    state
        .grants
        .authorize(auth.role, AppPermission::CustomerEdit)?;
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Customer name is required".into()));
    }

    let customer = sqlx::query_as::<_, Customer>(
        r#"
        UPDATE customers
        SET name = $1, representative = $2, contact_info = $3, address = $4, updated_at = NOW()
        WHERE id = $5
        RETURNING *
        "#,
    )
    .bind(name)
    .bind(payload.representative.as_deref())
    .bind(payload.contact_info.as_deref())
    .bind(payload.address.as_deref())
    .bind(id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Customer {} not found", id)))?;

    Ok(Json(customer))
}

pub async fn delete_customer(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<i32>,
) -> Result<Json<MessageResponse>> {
    state
        .grants
        .authorize(auth.role, AppPermission::CustomerDelete)?;

    let result = sqlx::query("DELETE FROM customers WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await
        .map_err(|e: sqlx::Error| {
            if e.to_string().contains("foreign key") {
                AppError::Conflict(
                    "Customer has return cases and cannot be deleted".to_string(),
                )
            } else {
                AppError::Database(e)
            }
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Customer {} not found", id)));
    }

    state
        .audit_service()
        .record(&auth.email, "customer.delete", None, json!({"customer_id": id}))
        .await;

    Ok(Json(MessageResponse::new("Customer deleted")))
}
