//! Postgres-backed case store.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::error::{AppError, Result};
use crate::models::case::{CaseItem, IntakePatch, NewItem, ReturnCase, StagePatch};
use crate::models::customer::Customer;
use crate::models::product::ProductModel;
use crate::workflow::WorkflowStatus;

use super::{CaseFilter, CasePage, CaseStore, PageRequest};

/// Case store backed by the relational database. Every mutation is one
/// transaction whose WHERE clause carries the stage precondition.
pub struct PgCaseStore {
    pool: PgPool,
}

impl PgCaseStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Distinguish "case gone" from "case moved on" after a guarded update
    /// matched zero rows.
    async fn stage_mismatch(&self, id: i32, expected: WorkflowStatus) -> AppError {
        match self.get_case(id).await {
            Ok(case) => AppError::StateConflict(format!(
                "case {} is in the {} stage, not {}",
                id,
                case.workflow_status.label(),
                expected.label()
            )),
            Err(err) => err,
        }
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &CaseFilter) {
    builder.push(" WHERE TRUE");
    if let Some(customer) = &filter.customer {
        builder
            .push(
                " AND EXISTS (SELECT 1 FROM customers cu \
                 WHERE cu.id = c.customer_id AND cu.name ILIKE ",
            )
            .push_bind(format!("%{}%", customer))
            .push(")");
    }
    if let Some(status) = filter.status {
        builder.push(" AND c.workflow_status = ").push_bind(status);
    }
    if let Some(from) = filter.arrival_from {
        builder.push(" AND c.arrival_date >= ").push_bind(from);
    }
    if let Some(to) = filter.arrival_to {
        builder.push(" AND c.arrival_date <= ").push_bind(to);
    }
    if let Some(method) = filter.receipt_method {
        builder.push(" AND c.receipt_method = ").push_bind(method);
    }
    if filter.product_model_id.is_some() || filter.product_type.is_some() {
        builder.push(
            " AND EXISTS (SELECT 1 FROM return_case_items i \
             JOIN product_models pm ON pm.id = i.product_model_id \
             WHERE i.case_id = c.id",
        );
        if let Some(model_id) = filter.product_model_id {
            builder.push(" AND i.product_model_id = ").push_bind(model_id);
        }
        if let Some(product_type) = filter.product_type {
            builder.push(" AND pm.product_type = ").push_bind(product_type);
        }
        builder.push(")");
    }
}

async fn insert_items(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    case_id: i32,
    items: &[NewItem],
) -> Result<()> {
    for item in items {
        sqlx::query(
            r#"
            INSERT INTO return_case_items (
                case_id, product_model_id, quantity, production_date,
                warranty_status, fault_responsibility, resolution_method,
                has_control_unit, cable_checked, profile_checked, packaged
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(case_id)
        .bind(item.product_model_id)
        .bind(item.quantity)
        .bind(item.production_date)
        .bind(item.warranty_status)
        .bind(item.fault_responsibility)
        .bind(item.resolution_method)
        .bind(item.has_control_unit)
        .bind(item.cable_checked)
        .bind(item.profile_checked)
        .bind(item.packaged)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

#[async_trait]
impl CaseStore for PgCaseStore {
    async fn create_case(&self, intake: &IntakePatch) -> Result<ReturnCase> {
        let case = sqlx::query_as::<_, ReturnCase>(
            r#"
            INSERT INTO return_cases (customer_id, arrival_date, receipt_method, notes)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(intake.customer_id)
        .bind(intake.arrival_date)
        .bind(intake.receipt_method)
        .bind(intake.notes.as_deref())
        .fetch_one(&self.pool)
        .await?;

        Ok(case)
    }

    async fn get_case(&self, id: i32) -> Result<ReturnCase> {
        sqlx::query_as::<_, ReturnCase>("SELECT * FROM return_cases WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Case {} not found", id)))
    }

    async fn get_items(&self, case_id: i32) -> Result<Vec<CaseItem>> {
        let items = sqlx::query_as::<_, CaseItem>(
            "SELECT * FROM return_case_items WHERE case_id = $1 ORDER BY id",
        )
        .bind(case_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    async fn list_cases(&self, filter: &CaseFilter, page: PageRequest) -> Result<CasePage> {
        let mut count_builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM return_cases c");
        push_filters(&mut count_builder, filter);
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("SELECT c.* FROM return_cases c");
        push_filters(&mut builder, filter);
        builder
            .push(" ORDER BY c.id DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let cases = builder
            .build_query_as::<ReturnCase>()
            .fetch_all(&self.pool)
            .await?;

        Ok(CasePage { cases, total })
    }

    async fn update_stage(&self, id: i32, patch: &StagePatch) -> Result<ReturnCase> {
        let stage = patch.stage();
        let mut tx = self.pool.begin().await?;

        let updated = match patch {
            StagePatch::Delivered(p) => {
                sqlx::query_as::<_, ReturnCase>(
                    r#"
                    UPDATE return_cases
                    SET customer_id = $1, arrival_date = $2, receipt_method = $3,
                        notes = $4, updated_at = NOW()
                    WHERE id = $5 AND workflow_status = $6
                    RETURNING *
                    "#,
                )
                .bind(p.customer_id)
                .bind(p.arrival_date)
                .bind(p.receipt_method)
                .bind(p.notes.as_deref())
                .bind(id)
                .bind(stage)
                .fetch_optional(&mut *tx)
                .await?
            }
            StagePatch::TechnicalReview(p) => {
                let updated = sqlx::query_as::<_, ReturnCase>(
                    r#"
                    UPDATE return_cases
                    SET parts_cost = $1, maintenance_cost = $2, labor_cost = $3,
                        performed_service = $4, updated_at = NOW()
                    WHERE id = $5 AND workflow_status = $6
                    RETURNING *
                    "#,
                )
                .bind(p.parts_cost)
                .bind(p.maintenance_cost)
                .bind(p.labor_cost)
                .bind(p.performed_service.as_deref())
                .bind(id)
                .bind(stage)
                .fetch_optional(&mut *tx)
                .await?;

                // Replace-not-patch: the item list is the unit of update.
                if updated.is_some() {
                    sqlx::query("DELETE FROM return_case_items WHERE case_id = $1")
                        .bind(id)
                        .execute(&mut *tx)
                        .await?;
                    insert_items(&mut tx, id, &p.items).await?;
                }
                updated
            }
            StagePatch::PaymentCollection(p) => {
                sqlx::query_as::<_, ReturnCase>(
                    r#"
                    UPDATE return_cases
                    SET payment_status = $1, updated_at = NOW()
                    WHERE id = $2 AND workflow_status = $3
                    RETURNING *
                    "#,
                )
                .bind(p.payment_status)
                .bind(id)
                .bind(stage)
                .fetch_optional(&mut *tx)
                .await?
            }
            StagePatch::Shipping(p) => {
                sqlx::query_as::<_, ReturnCase>(
                    r#"
                    UPDATE return_cases
                    SET shipping_info = $1, tracking_number = $2, shipping_date = $3,
                        updated_at = NOW()
                    WHERE id = $4 AND workflow_status = $5
                    RETURNING *
                    "#,
                )
                .bind(p.shipping_info.as_deref())
                .bind(p.tracking_number.as_deref())
                .bind(p.shipping_date)
                .bind(id)
                .bind(stage)
                .fetch_optional(&mut *tx)
                .await?
            }
        };

        match updated {
            Some(case) => {
                tx.commit().await?;
                Ok(case)
            }
            None => {
                tx.rollback().await?;
                Err(self.stage_mismatch(id, stage).await)
            }
        }
    }

    async fn advance_status(
        &self,
        id: i32,
        from: WorkflowStatus,
        to: WorkflowStatus,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE return_cases
            SET workflow_status = $1, updated_at = NOW()
            WHERE id = $2 AND workflow_status = $3
            "#,
        )
        .bind(to)
        .bind(id)
        .bind(from)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.stage_mismatch(id, from).await);
        }
        Ok(())
    }

    async fn delete_case(&self, id: i32) -> Result<()> {
        // Items go with the case via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM return_cases WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Case {} not found", id)));
        }
        Ok(())
    }

    async fn get_customer(&self, id: i32) -> Result<Customer> {
        sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Customer {} not found", id)))
    }

    async fn get_product_model(&self, id: i32) -> Result<ProductModel> {
        sqlx::query_as::<_, ProductModel>("SELECT * FROM product_models WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product model {} not found", id)))
    }
}
