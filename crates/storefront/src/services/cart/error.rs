//! Cart service error types.

use thiserror::Error;

use quench_core::BeverageId;

use crate::db::StoreError;

/// Errors that can occur during cart and purchase operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Beverage not found in the catalog.
    #[error("beverage not found")]
    BeverageNotFound,

    /// Line item not found (or owned by another user).
    #[error("line item not found")]
    LineItemNotFound,

    /// The user has no cart.
    #[error("cart not found")]
    CartNotFound,

    /// Quantity was zero or negative.
    #[error("quantity must be positive, got {0}")]
    InvalidQuantity(i32),

    /// Not enough stock to satisfy the request.
    #[error("insufficient stock for beverage {beverage_id}: {available} available, {requested} requested")]
    InsufficientStock {
        /// Beverage whose stock ran short.
        beverage_id: BeverageId,
        /// Units on hand when the request was rejected.
        available: i32,
        /// Units the request asked for.
        requested: i32,
    },

    /// A concurrent cart mutation won; the caller should retry.
    #[error("cart changed concurrently: {0}")]
    Conflict(String),

    /// The cart has no line items to purchase.
    #[error("cart is empty")]
    EmptyCart,

    /// Storage backend error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}
