//! Cart line item domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quench_core::{BeverageId, LineItemId, UserId};

/// A user's claim on a quantity of one beverage.
///
/// At most one line item exists per (user, beverage) pair; adding the same
/// beverage again merges into the existing row. The claimed quantity has
/// already been deducted from the beverage's stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    /// Unique line item ID.
    pub id: LineItemId,
    /// User who owns this line item.
    pub user_id: UserId,
    /// Beverage being claimed.
    pub beverage_id: BeverageId,
    /// Units claimed. Always positive.
    pub quantity: i32,
    /// When the line item was created.
    pub created_at: DateTime<Utc>,
    /// When the line item was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a line item.
#[derive(Debug, Clone)]
pub struct CreateLineItemInput {
    /// User who owns the line item.
    pub user_id: UserId,
    /// Beverage being claimed.
    pub beverage_id: BeverageId,
    /// Units claimed. Must be positive.
    pub quantity: i32,
}
