//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::db::{BeverageRepository, CartRepository, LineItemRepository, PurchaseRepository};
use crate::services::CartService;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    cart_service: CartService,
}

impl AppState {
    /// Create application state wired to the `PostgreSQL` repositories.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        let cart_service = CartService::new(
            Arc::new(BeverageRepository::new(pool.clone())),
            Arc::new(LineItemRepository::new(pool.clone())),
            Arc::new(CartRepository::new(pool.clone())),
            Arc::new(PurchaseRepository::new(pool.clone())),
        );
        Self::with_cart_service(config, pool, cart_service)
    }

    /// Create application state over an explicit cart service.
    ///
    /// Tests use this to run the router against the in-memory store; the pool
    /// is still carried for the readiness probe.
    #[must_use]
    pub fn with_cart_service(
        config: StorefrontConfig,
        pool: PgPool,
        cart_service: CartService,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                cart_service,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the cart service.
    #[must_use]
    pub fn cart_service(&self) -> &CartService {
        &self.inner.cart_service
    }
}
