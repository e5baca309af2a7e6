//! Cart and checkout route handlers.
//!
//! Thin JSON layer over [`crate::services::CartService`]; every domain
//! decision lives in the service. Identifier path segments are plain
//! integers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use quench_core::{BeverageId, LineItemId, UserId};

use crate::error::Result;
use crate::models::{CartView, LineItem, Purchase};
use crate::state::AppState;

/// Request to add a beverage to a user's cart.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    /// Beverage to claim.
    pub beverage_id: BeverageId,
    /// Units to claim. Must be positive.
    pub quantity: i32,
}

/// Request to set a line item's quantity.
#[derive(Debug, Deserialize)]
pub struct UpdateLineItemRequest {
    /// New quantity. Must be positive.
    pub quantity: i32,
}

/// Add a beverage to the user's cart.
///
/// POST /users/{user_id}/cart
///
/// Merges into the user's existing line item for this beverage if one
/// exists. Responds with the resulting line item.
#[instrument(skip(state))]
pub async fn add(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Json(req): Json<AddToCartRequest>,
) -> Result<Json<LineItem>> {
    let line_item = state
        .cart_service()
        .add_to_cart(user_id, req.beverage_id, req.quantity)
        .await?;
    Ok(Json(line_item))
}

/// Set a line item to a new quantity.
///
/// PUT /cart/line-items/{line_item_id}
#[instrument(skip(state))]
pub async fn update(
    State(state): State<AppState>,
    Path(line_item_id): Path<LineItemId>,
    Json(req): Json<UpdateLineItemRequest>,
) -> Result<Json<LineItem>> {
    let line_item = state
        .cart_service()
        .update_cart(line_item_id, req.quantity)
        .await?;
    Ok(Json(line_item))
}

/// Remove a line item from the user's cart, restoring its stock.
///
/// DELETE /users/{user_id}/cart/line-items/{line_item_id}
#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    Path((user_id, line_item_id)): Path<(UserId, LineItemId)>,
) -> Result<StatusCode> {
    state
        .cart_service()
        .remove_from_cart(user_id, line_item_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Show the user's cart expanded for display.
///
/// GET /users/{user_id}/cart
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<CartView>> {
    let view = state.cart_service().show_cart(user_id).await?;
    Ok(Json(view))
}

/// Check out the user's cart into an immutable purchase record.
///
/// POST /users/{user_id}/purchase
#[instrument(skip(state))]
pub async fn purchase(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<(StatusCode, Json<Purchase>)> {
    let purchase = state.cart_service().purchase(user_id).await?;
    Ok((StatusCode::CREATED, Json(purchase)))
}

/// List the user's purchases, newest first.
///
/// GET /users/{user_id}/purchases
#[instrument(skip(state))]
pub async fn purchases(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<Vec<Purchase>>> {
    let purchases = state.cart_service().list_purchases(user_id).await?;
    Ok(Json(purchases))
}
