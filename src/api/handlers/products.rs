//! Product catalog handlers.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::dto::{MessageResponse, Pagination, PaginationQuery};
use crate::api::middleware::auth::AuthExtension;
use crate::api::SharedState;
use crate::authz::AppPermission;
use crate::error::{AppError, Result};
use crate::models::product::{ProductModel, ProductType};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/:id", delete(delete_product))
}

#[derive(Debug, Deserialize)]
pub struct ProductListQuery {
    pub search: Option<String>,
    pub product_type: Option<ProductType>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ProductPayload {
    pub name: String,
    pub product_type: ProductType,
}

#[derive(Debug, Serialize)]
pub struct ProductListResponse {
    pub products: Vec<ProductModel>,
    pub pagination: Pagination,
}

pub async fn list_products(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Query(query): Query<ProductListQuery>,
) -> Result<Json<ProductListResponse>> {
    state
        .grants
        .authorize(auth.role, AppPermission::PageViewProductList)?;

    let paging = PaginationQuery {
        page: query.page,
        per_page: query.per_page,
    };
    let pattern = format!("%{}%", query.search.as_deref().unwrap_or(""));

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM product_models WHERE name ILIKE $1 AND ($2::product_type IS NULL OR product_type = $2)",
    )
    .bind(&pattern)
    .bind(query.product_type)
    .fetch_one(&state.db)
    .await?;

    let products = sqlx::query_as::<_, ProductModel>(
        r#"
        SELECT * FROM product_models
        WHERE name ILIKE $1 AND ($2::product_type IS NULL OR product_type = $2)
        ORDER BY name
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(&pattern)
    .bind(query.product_type)
    .bind(paging.per_page() as i64)
    .bind(((paging.page() - 1) * paging.per_page()) as i64)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ProductListResponse {
        pagination: Pagination::new(paging.page(), paging.per_page(), total),
        products,
    }))
}

pub async fn create_product(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Json(payload): Json<ProductPayload>,
) -> Result<(StatusCode, Json<ProductModel>)> {
    state
        .grants
        .authorize(auth.role, AppPermission::PageViewProductList)?;
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Product name is required".into()));
    }

    let product = sqlx::query_as::<_, ProductModel>(
        "INSERT INTO product_models (name, product_type) VALUES ($1, $2) RETURNING *",
    )
    .bind(name)
    .bind(payload.product_type)
    .fetch_one(&state.db)
    .await
    .map_err(|e: sqlx::Error| {
        if e.to_string().contains("duplicate key") {
            AppError::Conflict(format!("A product model named {} already exists", name))
        } else {
            AppError::Database(e)
        }
    })?;

    state
        .audit_service()
        .record(&auth.email, "product.create", None, json!({"product_id": product.id}))
        .await;

    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn delete_product(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<i32>,
) -> Result<Json<MessageResponse>> {
    state
        .grants
        .authorize(auth.role, AppPermission::PageViewProductList)?;

    let result = sqlx::query("DELETE FROM product_models WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await
        .map_err(|e: sqlx::Error| {
            if e.to_string().contains("foreign key") {
                AppError::Conflict(
                    "Product model is referenced by return case items and cannot be deleted"
                        .to_string(),
                )
            } else {
                AppError::Database(e)
            }
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Product model {} not found", id)));
    }

    state
        .audit_service()
        .record(&auth.email, "product.delete", None, json!({"product_id": id}))
        .await;

    Ok(Json(MessageResponse::new("Product model deleted")))
}
