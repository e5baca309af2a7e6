//! Purchase repository for database operations.
//!
//! A purchase and its snapshotted lines are written in one transaction;
//! receipts are immutable once committed.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use quench_core::{BeverageId, PurchaseId, UserId};

use super::{PurchaseStore, StoreError};
use crate::models::{Purchase, PurchaseLine};

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `PostgreSQL` purchase queries.
#[derive(Debug, sqlx::FromRow)]
struct PurchaseRow {
    id: Uuid,
    user_id: i32,
    total: Decimal,
    created_at: DateTime<Utc>,
}

/// Internal row type for `PostgreSQL` purchase line queries.
#[derive(Debug, sqlx::FromRow)]
struct PurchaseLineRow {
    purchase_id: Uuid,
    beverage_id: i32,
    name: String,
    quantity: i32,
    unit_price: Decimal,
    line_total: Decimal,
}

impl From<PurchaseLineRow> for PurchaseLine {
    fn from(row: PurchaseLineRow) -> Self {
        Self {
            beverage_id: BeverageId::new(row.beverage_id),
            name: row.name,
            quantity: row.quantity,
            unit_price: row.unit_price,
            line_total: row.line_total,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for purchase database operations.
pub struct PurchaseRepository {
    pool: PgPool,
}

impl PurchaseRepository {
    /// Create a new purchase repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PurchaseStore for PurchaseRepository {
    async fn create(
        &self,
        user_id: UserId,
        lines: Vec<PurchaseLine>,
        total: Decimal,
    ) -> Result<Purchase, StoreError> {
        let id = PurchaseId::generate();

        let mut tx = self.pool.begin().await?;

        let created_at = sqlx::query_scalar::<_, DateTime<Utc>>(
            r"
            INSERT INTO storefront.purchase (id, user_id, total)
            VALUES ($1, $2, $3)
            RETURNING created_at
            ",
        )
        .bind(id)
        .bind(user_id.as_i32())
        .bind(total)
        .fetch_one(&mut *tx)
        .await?;

        for line in &lines {
            sqlx::query(
                r"
                INSERT INTO storefront.purchase_line
                    (purchase_id, beverage_id, name, quantity, unit_price, line_total)
                VALUES ($1, $2, $3, $4, $5, $6)
                ",
            )
            .bind(id)
            .bind(line.beverage_id.as_i32())
            .bind(&line.name)
            .bind(line.quantity)
            .bind(line.unit_price)
            .bind(line.line_total)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(Purchase {
            id,
            user_id,
            total,
            lines,
            created_at,
        })
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Purchase>, StoreError> {
        let rows = sqlx::query_as::<_, PurchaseRow>(
            r"
            SELECT id, user_id, total, created_at
            FROM storefront.purchase
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(user_id.as_i32())
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let line_rows = sqlx::query_as::<_, PurchaseLineRow>(
            r"
            SELECT purchase_id, beverage_id, name, quantity, unit_price, line_total
            FROM storefront.purchase_line
            WHERE purchase_id = ANY($1)
            ORDER BY id ASC
            ",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut lines_by_purchase: HashMap<Uuid, Vec<PurchaseLine>> = HashMap::new();
        for row in line_rows {
            lines_by_purchase
                .entry(row.purchase_id)
                .or_default()
                .push(row.into());
        }

        Ok(rows
            .into_iter()
            .map(|row| Purchase {
                id: PurchaseId::new(row.id),
                user_id: UserId::new(row.user_id),
                total: row.total,
                lines: lines_by_purchase.remove(&row.id).unwrap_or_default(),
                created_at: row.created_at,
            })
            .collect())
    }
}
