//! Line item repository for database operations.
//!
//! The `UNIQUE (user_id, beverage_id)` constraint is the authority on
//! duplicate line items; racing creates surface as [`StoreError::Conflict`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use quench_core::{BeverageId, LineItemId, UserId};

use super::{LineItemStore, StoreError};
use crate::models::{CreateLineItemInput, LineItem};

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `PostgreSQL` line item queries.
#[derive(Debug, sqlx::FromRow)]
struct LineItemRow {
    id: i32,
    user_id: i32,
    beverage_id: i32,
    quantity: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<LineItemRow> for LineItem {
    fn from(row: LineItemRow) -> Self {
        Self {
            id: LineItemId::new(row.id),
            user_id: UserId::new(row.user_id),
            beverage_id: BeverageId::new(row.beverage_id),
            quantity: row.quantity,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for line item database operations.
pub struct LineItemRepository {
    pool: PgPool,
}

impl LineItemRepository {
    /// Create a new line item repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LineItemStore for LineItemRepository {
    async fn create(&self, input: CreateLineItemInput) -> Result<LineItem, StoreError> {
        let row = sqlx::query_as::<_, LineItemRow>(
            r"
            INSERT INTO storefront.line_item (user_id, beverage_id, quantity)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, beverage_id, quantity, created_at, updated_at
            ",
        )
        .bind(input.user_id.as_i32())
        .bind(input.beverage_id.as_i32())
        .bind(input.quantity)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StoreError::Conflict(
                    "line item already exists for user and beverage".to_owned(),
                );
            }
            StoreError::Database(e)
        })?;

        Ok(row.into())
    }

    async fn get(&self, id: LineItemId) -> Result<Option<LineItem>, StoreError> {
        let row = sqlx::query_as::<_, LineItemRow>(
            r"
            SELECT id, user_id, beverage_id, quantity, created_at, updated_at
            FROM storefront.line_item
            WHERE id = $1
            ",
        )
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn find_by_user_and_beverage(
        &self,
        user_id: UserId,
        beverage_id: BeverageId,
    ) -> Result<Option<LineItem>, StoreError> {
        let row = sqlx::query_as::<_, LineItemRow>(
            r"
            SELECT id, user_id, beverage_id, quantity, created_at, updated_at
            FROM storefront.line_item
            WHERE user_id = $1 AND beverage_id = $2
            ",
        )
        .bind(user_id.as_i32())
        .bind(beverage_id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn update_quantity(&self, id: LineItemId, quantity: i32) -> Result<LineItem, StoreError> {
        let row = sqlx::query_as::<_, LineItemRow>(
            r"
            UPDATE storefront.line_item
            SET quantity = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, user_id, beverage_id, quantity, created_at, updated_at
            ",
        )
        .bind(id.as_i32())
        .bind(quantity)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Into::into).ok_or(StoreError::NotFound)
    }

    async fn increment_quantity(&self, id: LineItemId, delta: i32) -> Result<LineItem, StoreError> {
        // Relative update, same shape as the stock adjustment: the database
        // serializes concurrent increments.
        let row = sqlx::query_as::<_, LineItemRow>(
            r"
            UPDATE storefront.line_item
            SET quantity = quantity + $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, user_id, beverage_id, quantity, created_at, updated_at
            ",
        )
        .bind(id.as_i32())
        .bind(delta)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Into::into).ok_or(StoreError::NotFound)
    }

    async fn delete(&self, id: LineItemId) -> Result<LineItem, StoreError> {
        let row = sqlx::query_as::<_, LineItemRow>(
            r"
            DELETE FROM storefront.line_item
            WHERE id = $1
            RETURNING id, user_id, beverage_id, quantity, created_at, updated_at
            ",
        )
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Into::into).ok_or(StoreError::NotFound)
    }
}
