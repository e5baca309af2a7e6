//! Beverage repository for catalog and stock operations.
//!
//! Stock is adjusted with a single conditional UPDATE so concurrent cart
//! mutations serialize at the database and cannot lose updates.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use quench_core::BeverageId;

use super::{BeverageStore, StoreError};
use crate::models::{Beverage, CreateBeverageInput};

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `PostgreSQL` beverage queries.
#[derive(Debug, sqlx::FromRow)]
struct BeverageRow {
    id: i32,
    name: String,
    brand_name: String,
    price: Decimal,
    stock: i32,
    volume: String,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BeverageRow> for Beverage {
    fn from(row: BeverageRow) -> Self {
        Self {
            id: BeverageId::new(row.id),
            name: row.name,
            brand_name: row.brand_name,
            price: row.price,
            stock: row.stock,
            volume: row.volume,
            image_url: row.image_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for beverage database operations.
pub struct BeverageRepository {
    pool: PgPool,
}

impl BeverageRepository {
    /// Create a new beverage repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BeverageStore for BeverageRepository {
    async fn create(&self, input: CreateBeverageInput) -> Result<Beverage, StoreError> {
        let row = sqlx::query_as::<_, BeverageRow>(
            r"
            INSERT INTO storefront.beverage (name, brand_name, price, stock, volume, image_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, brand_name, price, stock, volume, image_url,
                      created_at, updated_at
            ",
        )
        .bind(&input.name)
        .bind(&input.brand_name)
        .bind(input.price)
        .bind(input.stock)
        .bind(&input.volume)
        .bind(&input.image_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn get(&self, id: BeverageId) -> Result<Option<Beverage>, StoreError> {
        let row = sqlx::query_as::<_, BeverageRow>(
            r"
            SELECT id, name, brand_name, price, stock, volume, image_url,
                   created_at, updated_at
            FROM storefront.beverage
            WHERE id = $1
            ",
        )
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn adjust_stock(&self, id: BeverageId, delta: i32) -> Result<i32, StoreError> {
        // The WHERE clause rejects adjustments that would go below zero; the
        // schema-level CHECK constraint backstops it.
        let new_stock = sqlx::query_scalar::<_, i32>(
            r"
            UPDATE storefront.beverage
            SET stock = stock + $2, updated_at = NOW()
            WHERE id = $1 AND stock + $2 >= 0
            RETURNING stock
            ",
        )
        .bind(id.as_i32())
        .bind(delta)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(stock) = new_stock {
            return Ok(stock);
        }

        // No row updated: either the beverage is missing or the adjustment
        // was rejected. The re-read is diagnostic only.
        let available = sqlx::query_scalar::<_, i32>(
            r"
            SELECT stock
            FROM storefront.beverage
            WHERE id = $1
            ",
        )
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        match available {
            Some(available) => Err(StoreError::InsufficientStock { available }),
            None => Err(StoreError::NotFound),
        }
    }
}
