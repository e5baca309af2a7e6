//! Beverage catalog domain models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use quench_core::BeverageId;

/// A beverage in the catalog, together with its live stock counter.
///
/// Stock is the single source of truth for availability. It is only ever
/// changed through atomic adjustments, never read-modify-write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Beverage {
    /// Unique beverage ID.
    pub id: BeverageId,
    /// Display name (e.g., "Yuzu Sparkling Water").
    pub name: String,
    /// Brand the beverage is sold under.
    pub brand_name: String,
    /// Unit price.
    pub price: Decimal,
    /// Units currently available. Never negative after a committed operation.
    pub stock: i32,
    /// Packaging description (e.g., "330 ml can").
    pub volume: String,
    /// Product image URL, if one exists.
    pub image_url: Option<String>,
    /// When the beverage was created.
    pub created_at: DateTime<Utc>,
    /// When the beverage was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Input for adding a beverage to the catalog.
#[derive(Debug, Clone)]
pub struct CreateBeverageInput {
    /// Display name.
    pub name: String,
    /// Brand the beverage is sold under.
    pub brand_name: String,
    /// Unit price.
    pub price: Decimal,
    /// Initial stock on hand.
    pub stock: i32,
    /// Packaging description.
    pub volume: String,
    /// Product image URL, if one exists.
    pub image_url: Option<String>,
}
