//! Cart domain models and display views.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use quench_core::{BeverageId, CartId, LineItemId, UserId};

/// A user's cart: the set of line items currently claimed.
///
/// The cart itself stores references only; quantities and beverage details
/// live on the line items and the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    /// Unique cart ID.
    pub id: CartId,
    /// User the cart belongs to. One cart per user.
    pub user_id: UserId,
    /// When the cart was created.
    pub created_at: DateTime<Utc>,
    /// When the cart was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A cart line expanded with beverage display attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItemView {
    /// Line item this row was expanded from.
    pub line_item_id: LineItemId,
    /// Beverage being claimed.
    pub beverage_id: BeverageId,
    /// Beverage display name.
    pub name: String,
    /// Brand the beverage is sold under.
    pub brand_name: String,
    /// Unit price at display time.
    pub unit_price: Decimal,
    /// Packaging description (e.g., "330 ml can").
    pub volume: String,
    /// Product image URL, if one exists.
    pub image_url: Option<String>,
    /// Units still available in the catalog.
    pub stock: i32,
    /// Units claimed by this line.
    pub quantity: i32,
    /// Unit price multiplied by quantity.
    pub line_total: Decimal,
}

/// A fully expanded cart ready for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartView {
    /// Cart the view was built from.
    pub cart_id: CartId,
    /// User the cart belongs to.
    pub user_id: UserId,
    /// Expanded cart lines.
    pub items: Vec<CartItemView>,
    /// Total units across all lines.
    pub item_count: i64,
    /// Sum of all line totals.
    pub subtotal: Decimal,
}

impl CartView {
    /// True when the cart holds no line items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
