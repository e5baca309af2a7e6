//! Integration tests for Quench.
//!
//! # Running Tests
//!
//! ```bash
//! # Service and route tests run entirely on the in-memory store
//! cargo test -p quench-integration-tests
//!
//! # Postgres-backed store tests are ignored by default
//! QUENCH_TEST_DATABASE_URL=postgres://localhost/quench_test \
//!     cargo test -p quench-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `cart_service` - Cart service properties and storefront scenarios
//! - `cart_routes` - HTTP surface driven in-process via `tower::ServiceExt`
//! - `postgres_store` - Store contracts against a real database
//!
//! This crate itself only carries the shared harness: builders for a cart
//! service and a router wired to an [`InMemoryStore`], plus catalog seeding
//! helpers.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use axum::Router;
use rust_decimal::Decimal;
use secrecy::SecretString;
use sqlx::PgPool;

use quench_core::BeverageId;
use quench_storefront::config::StorefrontConfig;
use quench_storefront::db::{BeverageStore, InMemoryStore};
use quench_storefront::models::{Beverage, CreateBeverageInput};
use quench_storefront::routes;
use quench_storefront::services::CartService;
use quench_storefront::state::AppState;

/// Build a cart service running entirely on the given in-memory store.
///
/// The store handle stays usable for seeding and inspection; clones share
/// storage.
#[must_use]
pub fn cart_service(store: &InMemoryStore) -> CartService {
    let shared = Arc::new(store.clone());
    CartService::new(shared.clone(), shared.clone(), shared.clone(), shared)
}

/// Build the storefront router over the given in-memory store.
///
/// The carried pool is lazy and never connects; every handler under test
/// runs on the in-memory store.
///
/// # Panics
///
/// Panics if the placeholder connection string fails to parse.
#[must_use]
pub fn test_router(store: &InMemoryStore) -> Router {
    let config = StorefrontConfig {
        database_url: SecretString::from("postgres://localhost/quench_test_unused"),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
    };
    let pool = PgPool::connect_lazy("postgres://localhost/quench_test_unused")
        .expect("lazy pool construction should not fail");
    let state = AppState::with_cart_service(config, pool, cart_service(store));
    routes::routes().with_state(state)
}

/// Insert a catalog row with the given price and opening stock.
///
/// # Panics
///
/// Panics if the store rejects the insert.
pub async fn seed_beverage(
    store: &InMemoryStore,
    name: &str,
    price: Decimal,
    stock: i32,
) -> Beverage {
    BeverageStore::create(
        store,
        CreateBeverageInput {
            name: name.to_owned(),
            brand_name: "Quench".to_owned(),
            price,
            stock,
            volume: "330 ml can".to_owned(),
            image_url: None,
        },
    )
    .await
    .expect("seed beverage")
}

/// Current stock for a beverage.
///
/// # Panics
///
/// Panics if the beverage does not exist.
pub async fn stock_of(store: &InMemoryStore, id: BeverageId) -> i32 {
    BeverageStore::get(store, id)
        .await
        .expect("load beverage")
        .expect("beverage exists")
        .stock
}
