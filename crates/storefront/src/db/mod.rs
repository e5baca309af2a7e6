//! Storage layer for the storefront `PostgreSQL` database.
//!
//! # Database: `quench_storefront`
//!
//! ## Tables (schema `storefront`)
//!
//! - `beverage` - Catalog entries with live stock counters
//! - `line_item` - Per-user claims on beverage quantities
//! - `cart` - One cart per user
//! - `cart_line_item` - Cart membership references (idempotent set)
//! - `purchase` / `purchase_line` - Immutable checkout snapshots
//!
//! # Contracts
//!
//! Each table group is fronted by a store trait so the cart service can run
//! against `PostgreSQL` in production and [`memory::InMemoryStore`] in tests.
//! Queries use the runtime query API; stock adjustments are single
//! conditional UPDATEs, never read-modify-write.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p quench-cli -- migrate
//! ```

pub mod beverages;
pub mod carts;
pub mod line_items;
pub mod memory;
pub mod purchases;

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use quench_core::{BeverageId, CartId, LineItemId, UserId};

use crate::models::{
    Beverage, Cart, CartView, CreateBeverageInput, CreateLineItemInput, LineItem, Purchase,
    PurchaseLine,
};

pub use beverages::BeverageRepository;
pub use carts::CartRepository;
pub use line_items::LineItemRepository;
pub use memory::InMemoryStore;
pub use purchases::PurchaseRepository;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The storage backend failed outside a database error (e.g., a poisoned
    /// lock in the in-memory store).
    #[error("storage backend error: {0}")]
    Backend(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate line item for a (user, beverage) pair).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A stock adjustment would have taken the counter below zero.
    #[error("insufficient stock: {available} available")]
    InsufficientStock {
        /// Units on hand when the adjustment was rejected.
        available: i32,
    },
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    use secrecy::ExposeSecret;

    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

// =============================================================================
// Store Contracts
// =============================================================================

/// Catalog entries and their stock counters.
#[async_trait]
pub trait BeverageStore: Send + Sync {
    /// Add a beverage to the catalog.
    async fn create(&self, input: CreateBeverageInput) -> Result<Beverage, StoreError>;

    /// Fetch a beverage by ID.
    async fn get(&self, id: BeverageId) -> Result<Option<Beverage>, StoreError>;

    /// Apply `stock += delta` atomically and return the new stock level.
    ///
    /// Fails with [`StoreError::NotFound`] if the beverage does not exist and
    /// [`StoreError::InsufficientStock`] if the adjustment would take stock
    /// below zero. Concurrent adjustments to the same beverage serialize at
    /// the storage layer.
    async fn adjust_stock(&self, id: BeverageId, delta: i32) -> Result<i32, StoreError>;
}

/// Per-user claims on beverage quantities.
#[async_trait]
pub trait LineItemStore: Send + Sync {
    /// Create a line item.
    ///
    /// Fails with [`StoreError::Conflict`] if one already exists for the
    /// (user, beverage) pair; the uniqueness guard is the store's, so two
    /// racing creates cannot both succeed.
    async fn create(&self, input: CreateLineItemInput) -> Result<LineItem, StoreError>;

    /// Fetch a line item by ID.
    async fn get(&self, id: LineItemId) -> Result<Option<LineItem>, StoreError>;

    /// Fetch the line item for a (user, beverage) pair, if any.
    async fn find_by_user_and_beverage(
        &self,
        user_id: UserId,
        beverage_id: BeverageId,
    ) -> Result<Option<LineItem>, StoreError>;

    /// Set a line item's quantity, returning the updated record.
    ///
    /// Fails with [`StoreError::NotFound`] if the line item does not exist.
    async fn update_quantity(&self, id: LineItemId, quantity: i32) -> Result<LineItem, StoreError>;

    /// Apply `quantity += delta` atomically and return the updated record.
    ///
    /// Fails with [`StoreError::NotFound`] if the line item does not exist.
    /// Concurrent increments to the same line item serialize at the storage
    /// layer, like stock adjustments.
    async fn increment_quantity(&self, id: LineItemId, delta: i32)
    -> Result<LineItem, StoreError>;

    /// Delete a line item, returning the deleted record so callers can
    /// reverse the stock it claimed.
    ///
    /// Fails with [`StoreError::NotFound`] if the line item does not exist.
    async fn delete(&self, id: LineItemId) -> Result<LineItem, StoreError>;
}

/// Per-user carts and their membership sets.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Return the user's cart, creating an empty one if absent.
    ///
    /// Safe under concurrent calls for the same user; exactly one cart
    /// results.
    async fn ensure_cart_for_user(&self, user_id: UserId) -> Result<Cart, StoreError>;

    /// Add a membership reference to the user's cart. Adding a reference
    /// that is already present is a no-op.
    ///
    /// Fails with [`StoreError::NotFound`] if the user has no cart.
    async fn add_line_item_ref(
        &self,
        user_id: UserId,
        line_item_id: LineItemId,
    ) -> Result<(), StoreError>;

    /// Remove a membership reference from the user's cart. Removing an
    /// absent reference is a no-op, as is removing from an absent cart.
    async fn remove_line_item_ref(
        &self,
        user_id: UserId,
        line_item_id: LineItemId,
    ) -> Result<(), StoreError>;

    /// Expand the user's cart into a display view, or `None` if the user has
    /// no cart. An existing cart with no line items yields an empty view.
    async fn cart_view(&self, user_id: UserId) -> Result<Option<CartView>, StoreError>;

    /// Remove every membership reference from a cart.
    async fn clear(&self, cart_id: CartId) -> Result<(), StoreError>;
}

/// Immutable checkout snapshots.
#[async_trait]
pub trait PurchaseStore: Send + Sync {
    /// Record a purchase with its snapshotted lines.
    async fn create(
        &self,
        user_id: UserId,
        lines: Vec<PurchaseLine>,
        total: Decimal,
    ) -> Result<Purchase, StoreError>;

    /// List a user's purchases, newest first.
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Purchase>, StoreError>;
}
