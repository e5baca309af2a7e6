//! Purchase record domain models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use quench_core::{BeverageId, PurchaseId, UserId};

/// An immutable record of a completed checkout.
///
/// Lines are snapshots taken at purchase time; later catalog edits do not
/// rewrite receipts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Purchase {
    /// Unique purchase ID.
    pub id: PurchaseId,
    /// User who checked out.
    pub user_id: UserId,
    /// Sum of all line totals at purchase time.
    pub total: Decimal,
    /// Purchased lines.
    pub lines: Vec<PurchaseLine>,
    /// When the purchase was made.
    pub created_at: DateTime<Utc>,
}

/// One purchased line, snapshotted from the cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseLine {
    /// Beverage that was purchased.
    pub beverage_id: BeverageId,
    /// Beverage name at purchase time.
    pub name: String,
    /// Units purchased.
    pub quantity: i32,
    /// Unit price at purchase time.
    pub unit_price: Decimal,
    /// Unit price multiplied by quantity.
    pub line_total: Decimal,
}
