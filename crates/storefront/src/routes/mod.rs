//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                  - Liveness check (in main.rs)
//! GET  /health/ready            - Readiness check, pings the database (in main.rs)
//!
//! # Cart
//! POST   /users/{user_id}/cart                             - Add a beverage to the cart
//! GET    /users/{user_id}/cart                             - Show the expanded cart
//! PUT    /cart/line-items/{line_item_id}                   - Set a line item quantity
//! DELETE /users/{user_id}/cart/line-items/{line_item_id}   - Remove a line item
//!
//! # Checkout
//! POST /users/{user_id}/purchase    - Snapshot the cart into a purchase
//! GET  /users/{user_id}/purchases   - List past purchases, newest first
//! ```

pub mod cart;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::state::AppState;

/// Create the per-user cart and checkout routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/{user_id}/cart", post(cart::add).get(cart::show))
        .route(
            "/{user_id}/cart/line-items/{line_item_id}",
            delete(cart::remove),
        )
        .route("/{user_id}/purchase", post(cart::purchase))
        .route("/{user_id}/purchases", get(cart::purchases))
}

/// Create the line item routes router.
pub fn line_item_routes() -> Router<AppState> {
    Router::new().route("/line-items/{line_item_id}", put(cart::update))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Per-user cart and checkout
        .nest("/users", user_routes())
        // Line item updates are addressed by line item ID alone
        .nest("/cart", line_item_routes())
}
