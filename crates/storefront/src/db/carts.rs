//! Cart repository for database operations.
//!
//! Cart creation is a race-safe upsert keyed on the `UNIQUE (user_id)`
//! constraint; membership writes are idempotent set operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use quench_core::{BeverageId, CartId, LineItemId, UserId};

use super::{CartStore, StoreError};
use crate::models::{Cart, CartItemView, CartView};

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `PostgreSQL` cart queries.
#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    id: i32,
    user_id: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CartRow> for Cart {
    fn from(row: CartRow) -> Self {
        Self {
            id: CartId::new(row.id),
            user_id: UserId::new(row.user_id),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Internal row type for the cart view join across line items and beverages.
#[derive(Debug, sqlx::FromRow)]
struct CartItemRow {
    line_item_id: i32,
    beverage_id: i32,
    name: String,
    brand_name: String,
    price: Decimal,
    stock: i32,
    volume: String,
    image_url: Option<String>,
    quantity: i32,
}

impl From<CartItemRow> for CartItemView {
    fn from(row: CartItemRow) -> Self {
        let line_total = row.price * Decimal::from(row.quantity);
        Self {
            line_item_id: LineItemId::new(row.line_item_id),
            beverage_id: BeverageId::new(row.beverage_id),
            name: row.name,
            brand_name: row.brand_name,
            unit_price: row.price,
            volume: row.volume,
            image_url: row.image_url,
            stock: row.stock,
            quantity: row.quantity,
            line_total,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for cart database operations.
pub struct CartRepository {
    pool: PgPool,
}

impl CartRepository {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Option<CartRow>, StoreError> {
        let row = sqlx::query_as::<_, CartRow>(
            r"
            SELECT id, user_id, created_at, updated_at
            FROM storefront.cart
            WHERE user_id = $1
            ",
        )
        .bind(user_id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}

#[async_trait]
impl CartStore for CartRepository {
    async fn ensure_cart_for_user(&self, user_id: UserId) -> Result<Cart, StoreError> {
        // DO NOTHING keeps the insert race-safe; the follow-up select reads
        // whichever row won.
        sqlx::query(
            r"
            INSERT INTO storefront.cart (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO NOTHING
            ",
        )
        .bind(user_id.as_i32())
        .execute(&self.pool)
        .await?;

        let row = sqlx::query_as::<_, CartRow>(
            r"
            SELECT id, user_id, created_at, updated_at
            FROM storefront.cart
            WHERE user_id = $1
            ",
        )
        .bind(user_id.as_i32())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn add_line_item_ref(
        &self,
        user_id: UserId,
        line_item_id: LineItemId,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let cart_id = sqlx::query_scalar::<_, i32>(
            r"
            SELECT id
            FROM storefront.cart
            WHERE user_id = $1
            ",
        )
        .bind(user_id.as_i32())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound)?;

        sqlx::query(
            r"
            INSERT INTO storefront.cart_line_item (cart_id, line_item_id)
            VALUES ($1, $2)
            ON CONFLICT (cart_id, line_item_id) DO NOTHING
            ",
        )
        .bind(cart_id)
        .bind(line_item_id.as_i32())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn remove_line_item_ref(
        &self,
        user_id: UserId,
        line_item_id: LineItemId,
    ) -> Result<(), StoreError> {
        // Idempotent: removing an absent reference (or from an absent cart)
        // affects zero rows and succeeds.
        sqlx::query(
            r"
            DELETE FROM storefront.cart_line_item
            WHERE cart_id = (SELECT id FROM storefront.cart WHERE user_id = $1)
              AND line_item_id = $2
            ",
        )
        .bind(user_id.as_i32())
        .bind(line_item_id.as_i32())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn cart_view(&self, user_id: UserId) -> Result<Option<CartView>, StoreError> {
        let Some(cart) = self.find_by_user(user_id).await? else {
            return Ok(None);
        };

        let rows = sqlx::query_as::<_, CartItemRow>(
            r"
            SELECT li.id AS line_item_id, li.beverage_id, b.name, b.brand_name,
                   b.price, b.stock, b.volume, b.image_url, li.quantity
            FROM storefront.cart_line_item cli
            JOIN storefront.line_item li ON li.id = cli.line_item_id
            JOIN storefront.beverage b ON b.id = li.beverage_id
            WHERE cli.cart_id = $1
            ORDER BY li.created_at ASC, li.id ASC
            ",
        )
        .bind(cart.id)
        .fetch_all(&self.pool)
        .await?;

        let items: Vec<CartItemView> = rows.into_iter().map(Into::into).collect();
        let item_count = items.iter().map(|i| i64::from(i.quantity)).sum();
        let subtotal = items.iter().map(|i| i.line_total).sum();

        Ok(Some(CartView {
            cart_id: CartId::new(cart.id),
            user_id: UserId::new(cart.user_id),
            items,
            item_count,
            subtotal,
        }))
    }

    async fn clear(&self, cart_id: CartId) -> Result<(), StoreError> {
        sqlx::query(
            r"
            DELETE FROM storefront.cart_line_item
            WHERE cart_id = $1
            ",
        )
        .bind(cart_id.as_i32())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
