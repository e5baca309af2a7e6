//! Cart service.
//!
//! Orchestrates the beverage, line item, cart, and purchase stores into the
//! public cart operations. Stock is the contended resource, so every mutation
//! claims or releases it through a single atomic adjustment before touching
//! line items or membership; if a later step fails, the already-applied
//! changes are compensated and the error is returned. Operations are never
//! retried internally.

mod error;

pub use error::CartError;

use std::sync::Arc;

use tracing::{error, info, instrument};

use quench_core::{BeverageId, LineItemId, UserId};

use crate::db::{BeverageStore, CartStore, LineItemStore, PurchaseStore, StoreError};
use crate::models::{CartView, CreateLineItemInput, LineItem, Purchase, PurchaseLine};

/// Cart service.
///
/// Runs against any set of store implementations; production wires the
/// `PostgreSQL` repositories, tests wire [`crate::db::InMemoryStore`].
pub struct CartService {
    beverages: Arc<dyn BeverageStore>,
    line_items: Arc<dyn LineItemStore>,
    carts: Arc<dyn CartStore>,
    purchases: Arc<dyn PurchaseStore>,
}

/// Line item write applied during an add, tracked so a failed later step can
/// reverse it.
enum LineItemChange {
    Created(LineItemId),
    Merged { id: LineItemId, delta: i32 },
}

impl CartService {
    /// Create a new cart service over the given stores.
    #[must_use]
    pub const fn new(
        beverages: Arc<dyn BeverageStore>,
        line_items: Arc<dyn LineItemStore>,
        carts: Arc<dyn CartStore>,
        purchases: Arc<dyn PurchaseStore>,
    ) -> Self {
        Self {
            beverages,
            line_items,
            carts,
            purchases,
        }
    }

    // =========================================================================
    // Cart Mutations
    // =========================================================================

    /// Add a quantity of a beverage to the user's cart.
    ///
    /// Merges into the existing line item if the user already has one for this
    /// beverage (an atomic increment, never an absolute write), creating it
    /// otherwise. The quantity is deducted from the beverage's stock before
    /// the cart is touched, so two buyers cannot both claim the last units.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` if `quantity` is not positive.
    /// Returns `CartError::BeverageNotFound` if the beverage does not exist.
    /// Returns `CartError::InsufficientStock` if fewer than `quantity` units remain.
    /// Returns `CartError::Conflict` if a concurrent mutation won; the caller should retry.
    #[instrument(skip(self), fields(user_id = %user_id, beverage_id = %beverage_id, quantity = %quantity))]
    pub async fn add_to_cart(
        &self,
        user_id: UserId,
        beverage_id: BeverageId,
        quantity: i32,
    ) -> Result<LineItem, CartError> {
        if quantity <= 0 {
            return Err(CartError::InvalidQuantity(quantity));
        }

        // Claim the stock first; everything after this point must either
        // complete or give it back.
        self.beverages
            .adjust_stock(beverage_id, -quantity)
            .await
            .map_err(|e| stock_error(e, beverage_id, quantity))?;

        let existing = match self
            .line_items
            .find_by_user_and_beverage(user_id, beverage_id)
            .await
        {
            Ok(found) => found,
            Err(e) => {
                self.compensate_stock(beverage_id, quantity).await;
                return Err(e.into());
            }
        };

        let (line_item, change) = match existing {
            Some(current) => {
                // Relative increment: a concurrent merge between the lookup
                // and this write still lands both quantities.
                match self
                    .line_items
                    .increment_quantity(current.id, quantity)
                    .await
                {
                    Ok(updated) => (
                        updated,
                        LineItemChange::Merged {
                            id: current.id,
                            delta: quantity,
                        },
                    ),
                    Err(StoreError::NotFound) => {
                        // The line item vanished between lookup and increment.
                        self.compensate_stock(beverage_id, quantity).await;
                        return Err(CartError::Conflict(
                            "line item changed during add; retry".to_owned(),
                        ));
                    }
                    Err(e) => {
                        self.compensate_stock(beverage_id, quantity).await;
                        return Err(e.into());
                    }
                }
            }
            None => {
                let input = CreateLineItemInput {
                    user_id,
                    beverage_id,
                    quantity,
                };
                match self.line_items.create(input).await {
                    Ok(created) => {
                        let id = created.id;
                        (created, LineItemChange::Created(id))
                    }
                    Err(StoreError::Conflict(_)) => {
                        // Another add for the same (user, beverage) pair won
                        // the insert race.
                        self.compensate_stock(beverage_id, quantity).await;
                        return Err(CartError::Conflict(
                            "concurrent add for this beverage; retry".to_owned(),
                        ));
                    }
                    Err(e) => {
                        self.compensate_stock(beverage_id, quantity).await;
                        return Err(e.into());
                    }
                }
            }
        };

        if let Err(e) = self.attach_to_cart(user_id, line_item.id).await {
            self.rollback_line_item(change).await;
            self.compensate_stock(beverage_id, quantity).await;
            return Err(e.into());
        }

        info!(
            line_item_id = %line_item.id,
            quantity = line_item.quantity,
            "Added beverage to cart"
        );
        Ok(line_item)
    }

    /// Set a line item to a new quantity.
    ///
    /// The stock delta is computed from the quantity the line item held before
    /// the update, so raising the quantity deducts further stock and lowering
    /// it restores stock.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` if `new_quantity` is not positive.
    /// Returns `CartError::LineItemNotFound` if the line item does not exist.
    /// Returns `CartError::BeverageNotFound` if its beverage no longer exists.
    /// Returns `CartError::InsufficientStock` if the increase exceeds remaining stock.
    #[instrument(skip(self), fields(line_item_id = %line_item_id, new_quantity = %new_quantity))]
    pub async fn update_cart(
        &self,
        line_item_id: LineItemId,
        new_quantity: i32,
    ) -> Result<LineItem, CartError> {
        if new_quantity <= 0 {
            return Err(CartError::InvalidQuantity(new_quantity));
        }

        let current = self
            .line_items
            .get(line_item_id)
            .await?
            .ok_or(CartError::LineItemNotFound)?;

        let delta = new_quantity - current.quantity;
        if delta == 0 {
            return Ok(current);
        }

        self.beverages
            .adjust_stock(current.beverage_id, -delta)
            .await
            .map_err(|e| stock_error(e, current.beverage_id, delta))?;

        match self.line_items.update_quantity(line_item_id, new_quantity).await {
            Ok(updated) => {
                info!(
                    beverage_id = %updated.beverage_id,
                    quantity = updated.quantity,
                    "Updated line item quantity"
                );
                Ok(updated)
            }
            Err(StoreError::NotFound) => {
                // Removed concurrently after we adjusted stock.
                self.compensate_stock(current.beverage_id, delta).await;
                Err(CartError::LineItemNotFound)
            }
            Err(e) => {
                self.compensate_stock(current.beverage_id, delta).await;
                Err(e.into())
            }
        }
    }

    /// Remove a line item from the user's cart, restoring its stock.
    ///
    /// # Errors
    ///
    /// Returns `CartError::LineItemNotFound` if the line item does not exist
    /// or belongs to a different user.
    /// Returns `CartError::BeverageNotFound` if its beverage no longer exists.
    #[instrument(skip(self), fields(user_id = %user_id, line_item_id = %line_item_id))]
    pub async fn remove_from_cart(
        &self,
        user_id: UserId,
        line_item_id: LineItemId,
    ) -> Result<(), CartError> {
        let line_item = self
            .line_items
            .get(line_item_id)
            .await?
            .ok_or(CartError::LineItemNotFound)?;

        // A line item in another user's cart is reported exactly like a
        // missing one.
        if line_item.user_id != user_id {
            return Err(CartError::LineItemNotFound);
        }

        self.beverages
            .adjust_stock(line_item.beverage_id, line_item.quantity)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => CartError::BeverageNotFound,
                other => CartError::Store(other),
            })?;

        match self.line_items.delete(line_item_id).await {
            Ok(_) => {}
            Err(StoreError::NotFound) => {
                // A concurrent remove won after we restored the stock.
                self.compensate_stock(line_item.beverage_id, -line_item.quantity)
                    .await;
                return Err(CartError::LineItemNotFound);
            }
            Err(e) => {
                self.compensate_stock(line_item.beverage_id, -line_item.quantity)
                    .await;
                return Err(e.into());
            }
        }

        self.carts.remove_line_item_ref(user_id, line_item_id).await?;

        info!(
            beverage_id = %line_item.beverage_id,
            restored = line_item.quantity,
            "Removed line item from cart"
        );
        Ok(())
    }

    // =========================================================================
    // Views and Checkout
    // =========================================================================

    /// Return the user's cart expanded for display.
    ///
    /// # Errors
    ///
    /// Returns `CartError::CartNotFound` if the user has no cart. A cart with
    /// no line items is returned as an empty view, not an error.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn show_cart(&self, user_id: UserId) -> Result<CartView, CartError> {
        self.carts
            .cart_view(user_id)
            .await?
            .ok_or(CartError::CartNotFound)
    }

    /// Check out the user's cart.
    ///
    /// Snapshots the current cart lines into an immutable purchase record,
    /// then retires the line items and membership references. Stock is left
    /// untouched; it was already claimed when the lines entered the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::CartNotFound` if the user has no cart.
    /// Returns `CartError::EmptyCart` if the cart holds no line items.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn purchase(&self, user_id: UserId) -> Result<Purchase, CartError> {
        let view = self
            .carts
            .cart_view(user_id)
            .await?
            .ok_or(CartError::CartNotFound)?;
        if view.is_empty() {
            return Err(CartError::EmptyCart);
        }

        let lines: Vec<PurchaseLine> = view
            .items
            .iter()
            .map(|item| PurchaseLine {
                beverage_id: item.beverage_id,
                name: item.name.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
                line_total: item.line_total,
            })
            .collect();

        let purchase = self.purchases.create(user_id, lines, view.subtotal).await?;

        for item in &view.items {
            match self.line_items.delete(item.line_item_id).await {
                Ok(_) => {}
                // A concurrent remove already retired this line.
                Err(StoreError::NotFound) => {}
                Err(e) => {
                    error!(
                        purchase_id = %purchase.id,
                        line_item_id = %item.line_item_id,
                        error = %e,
                        "Purchase recorded but cart cleanup failed"
                    );
                    return Err(e.into());
                }
            }
        }
        self.carts.clear(view.cart_id).await?;

        info!(
            purchase_id = %purchase.id,
            total = %purchase.total,
            lines = purchase.lines.len(),
            "Recorded purchase"
        );
        Ok(purchase)
    }

    /// List the user's purchases, newest first.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Store` if the storage backend fails.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn list_purchases(&self, user_id: UserId) -> Result<Vec<Purchase>, CartError> {
        let purchases = self.purchases.list_for_user(user_id).await?;
        Ok(purchases)
    }

    // =========================================================================
    // Rollback Helpers
    // =========================================================================

    /// Ensure the user's cart exists and reference the line item from it.
    async fn attach_to_cart(
        &self,
        user_id: UserId,
        line_item_id: LineItemId,
    ) -> Result<(), StoreError> {
        self.carts.ensure_cart_for_user(user_id).await?;
        self.carts.add_line_item_ref(user_id, line_item_id).await
    }

    /// Re-apply a stock delta after a later step failed.
    ///
    /// Runs on paths that are already returning an error, so a failure here is
    /// logged rather than returned.
    async fn compensate_stock(&self, beverage_id: BeverageId, delta: i32) {
        if let Err(e) = self.beverages.adjust_stock(beverage_id, delta).await {
            error!(
                beverage_id = %beverage_id,
                delta,
                error = %e,
                "Stock compensation failed after an interrupted cart operation"
            );
        }
    }

    /// Reverse the line item write made earlier in a failed add.
    ///
    /// A merge is reversed by incrementing with the negated delta, not by
    /// restoring the quantity read before the merge; concurrent merges may
    /// have landed since, and their increments must survive the rollback.
    async fn rollback_line_item(&self, change: LineItemChange) {
        let outcome = match change {
            LineItemChange::Created(id) => self.line_items.delete(id).await.map(|_| ()),
            LineItemChange::Merged { id, delta } => self
                .line_items
                .increment_quantity(id, -delta)
                .await
                .map(|_| ()),
        };
        if let Err(e) = outcome {
            error!(error = %e, "Line item rollback failed after an interrupted add");
        }
    }
}

/// Translate a stock adjustment failure into its domain error.
fn stock_error(e: StoreError, beverage_id: BeverageId, requested: i32) -> CartError {
    match e {
        StoreError::NotFound => CartError::BeverageNotFound,
        StoreError::InsufficientStock { available } => CartError::InsufficientStock {
            beverage_id,
            available,
            requested,
        },
        other => CartError::Store(other),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use tokio::sync::Barrier;

    use quench_core::CartId;

    use crate::db::InMemoryStore;
    use crate::models::{Beverage, Cart, CreateBeverageInput};

    fn service(store: &InMemoryStore) -> CartService {
        let store = Arc::new(store.clone());
        CartService::new(store.clone(), store.clone(), store.clone(), store)
    }

    async fn seed_beverage(
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
        .unwrap()
    }

    async fn stock_of(store: &InMemoryStore, id: BeverageId) -> i32 {
        BeverageStore::get(store, id).await.unwrap().unwrap().stock
    }

    /// `CartStore` wrapper whose `ensure_cart_for_user` always fails, for
    /// exercising the add rollback paths.
    struct FailingCartStore {
        inner: InMemoryStore,
    }

    #[async_trait]
    impl CartStore for FailingCartStore {
        async fn ensure_cart_for_user(&self, _user_id: UserId) -> Result<Cart, StoreError> {
            Err(StoreError::Backend("injected failure".to_owned()))
        }

        async fn add_line_item_ref(
            &self,
            user_id: UserId,
            line_item_id: LineItemId,
        ) -> Result<(), StoreError> {
            self.inner.add_line_item_ref(user_id, line_item_id).await
        }

        async fn remove_line_item_ref(
            &self,
            user_id: UserId,
            line_item_id: LineItemId,
        ) -> Result<(), StoreError> {
            self.inner.remove_line_item_ref(user_id, line_item_id).await
        }

        async fn cart_view(&self, user_id: UserId) -> Result<Option<CartView>, StoreError> {
            self.inner.cart_view(user_id).await
        }

        async fn clear(&self, cart_id: CartId) -> Result<(), StoreError> {
            self.inner.clear(cart_id).await
        }
    }

    fn service_with_failing_cart_store(store: &InMemoryStore) -> CartService {
        let shared = Arc::new(store.clone());
        let failing = Arc::new(FailingCartStore {
            inner: store.clone(),
        });
        CartService::new(shared.clone(), shared.clone(), failing, shared)
    }

    /// `LineItemStore` wrapper that holds each lookup until every racer has
    /// read, so concurrent merges all observe the same prior quantity.
    struct SyncedLineItemStore {
        inner: InMemoryStore,
        read_barrier: Barrier,
    }

    #[async_trait]
    impl LineItemStore for SyncedLineItemStore {
        async fn create(&self, input: CreateLineItemInput) -> Result<LineItem, StoreError> {
            LineItemStore::create(&self.inner, input).await
        }

        async fn get(&self, id: LineItemId) -> Result<Option<LineItem>, StoreError> {
            LineItemStore::get(&self.inner, id).await
        }

        async fn find_by_user_and_beverage(
            &self,
            user_id: UserId,
            beverage_id: BeverageId,
        ) -> Result<Option<LineItem>, StoreError> {
            let found = self
                .inner
                .find_by_user_and_beverage(user_id, beverage_id)
                .await;
            self.read_barrier.wait().await;
            found
        }

        async fn update_quantity(
            &self,
            id: LineItemId,
            quantity: i32,
        ) -> Result<LineItem, StoreError> {
            self.inner.update_quantity(id, quantity).await
        }

        async fn increment_quantity(
            &self,
            id: LineItemId,
            delta: i32,
        ) -> Result<LineItem, StoreError> {
            self.inner.increment_quantity(id, delta).await
        }

        async fn delete(&self, id: LineItemId) -> Result<LineItem, StoreError> {
            self.inner.delete(id).await
        }
    }

    #[tokio::test]
    async fn test_add_validates_quantity() {
        let store = InMemoryStore::default();
        let beverage = seed_beverage(&store, "Cola", dec!(2.50), 10).await;
        let svc = service(&store);

        let err = svc
            .add_to_cart(UserId::new(1), beverage.id, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::InvalidQuantity(0)));

        let err = svc
            .add_to_cart(UserId::new(1), beverage.id, -2)
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::InvalidQuantity(-2)));

        assert_eq!(stock_of(&store, beverage.id).await, 10);
    }

    #[tokio::test]
    async fn test_add_unknown_beverage_is_not_found() {
        let store = InMemoryStore::default();
        let svc = service(&store);

        let err = svc
            .add_to_cart(UserId::new(1), BeverageId::new(99), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::BeverageNotFound));
    }

    #[tokio::test]
    async fn test_add_claims_stock_and_builds_cart() {
        let store = InMemoryStore::default();
        let beverage = seed_beverage(&store, "Cola", dec!(2.50), 10).await;
        let svc = service(&store);
        let user = UserId::new(1);

        let line_item = svc.add_to_cart(user, beverage.id, 3).await.unwrap();
        assert_eq!(line_item.quantity, 3);
        assert_eq!(stock_of(&store, beverage.id).await, 7);

        let view = svc.show_cart(user).await.unwrap();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].quantity, 3);
        assert_eq!(view.items[0].line_total, dec!(7.50));
        assert_eq!(view.item_count, 3);
        assert_eq!(view.subtotal, dec!(7.50));
    }

    #[tokio::test]
    async fn test_add_same_beverage_merges() {
        let store = InMemoryStore::default();
        let beverage = seed_beverage(&store, "Cola", dec!(2.50), 10).await;
        let svc = service(&store);
        let user = UserId::new(1);

        let first = svc.add_to_cart(user, beverage.id, 3).await.unwrap();
        let second = svc.add_to_cart(user, beverage.id, 2).await.unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.quantity, 5);
        assert_eq!(stock_of(&store, beverage.id).await, 5);

        let view = svc.show_cart(user).await.unwrap();
        assert_eq!(view.items.len(), 1);
    }

    #[tokio::test]
    async fn test_add_rejects_insufficient_stock() {
        let store = InMemoryStore::default();
        let beverage = seed_beverage(&store, "Cola", dec!(2.50), 2).await;
        let svc = service(&store);

        let err = svc
            .add_to_cart(UserId::new(1), beverage.id, 5)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CartError::InsufficientStock {
                available: 2,
                requested: 5,
                ..
            }
        ));
        assert_eq!(stock_of(&store, beverage.id).await, 2);
        assert!(matches!(
            svc.show_cart(UserId::new(1)).await,
            Err(CartError::CartNotFound)
        ));
    }

    #[tokio::test]
    async fn test_update_sets_quantity_and_adjusts_stock() {
        let store = InMemoryStore::default();
        let beverage = seed_beverage(&store, "Cola", dec!(2.50), 10).await;
        let svc = service(&store);
        let user = UserId::new(1);

        let line_item = svc.add_to_cart(user, beverage.id, 3).await.unwrap();
        assert_eq!(stock_of(&store, beverage.id).await, 7);

        let lowered = svc.update_cart(line_item.id, 1).await.unwrap();
        assert_eq!(lowered.quantity, 1);
        assert_eq!(stock_of(&store, beverage.id).await, 9);

        let raised = svc.update_cart(line_item.id, 4).await.unwrap();
        assert_eq!(raised.quantity, 4);
        assert_eq!(stock_of(&store, beverage.id).await, 6);
    }

    #[tokio::test]
    async fn test_update_validates_quantity() {
        let store = InMemoryStore::default();
        let beverage = seed_beverage(&store, "Cola", dec!(2.50), 10).await;
        let svc = service(&store);

        let line_item = svc
            .add_to_cart(UserId::new(1), beverage.id, 3)
            .await
            .unwrap();
        let err = svc.update_cart(line_item.id, 0).await.unwrap_err();
        assert!(matches!(err, CartError::InvalidQuantity(0)));
        assert_eq!(stock_of(&store, beverage.id).await, 7);
    }

    #[tokio::test]
    async fn test_update_unknown_line_item_is_not_found() {
        let store = InMemoryStore::default();
        let svc = service(&store);

        let err = svc.update_cart(LineItemId::new(404), 2).await.unwrap_err();
        assert!(matches!(err, CartError::LineItemNotFound));
    }

    #[tokio::test]
    async fn test_update_beyond_available_stock_is_rejected() {
        let store = InMemoryStore::default();
        let beverage = seed_beverage(&store, "Cola", dec!(2.50), 10).await;
        let svc = service(&store);
        let user = UserId::new(1);

        let line_item = svc.add_to_cart(user, beverage.id, 8).await.unwrap();
        assert_eq!(stock_of(&store, beverage.id).await, 2);

        let err = svc.update_cart(line_item.id, 11).await.unwrap_err();
        assert!(matches!(
            err,
            CartError::InsufficientStock {
                available: 2,
                requested: 3,
                ..
            }
        ));
        assert_eq!(stock_of(&store, beverage.id).await, 2);

        let view = svc.show_cart(user).await.unwrap();
        assert_eq!(view.items[0].quantity, 8);
    }

    #[tokio::test]
    async fn test_update_to_same_quantity_is_a_no_op() {
        let store = InMemoryStore::default();
        let beverage = seed_beverage(&store, "Cola", dec!(2.50), 10).await;
        let svc = service(&store);

        let line_item = svc
            .add_to_cart(UserId::new(1), beverage.id, 3)
            .await
            .unwrap();
        let unchanged = svc.update_cart(line_item.id, 3).await.unwrap();
        assert_eq!(unchanged.quantity, 3);
        assert_eq!(stock_of(&store, beverage.id).await, 7);
    }

    #[tokio::test]
    async fn test_remove_restores_stock_and_unlinks() {
        let store = InMemoryStore::default();
        let beverage = seed_beverage(&store, "Cola", dec!(2.50), 10).await;
        let svc = service(&store);
        let user = UserId::new(1);

        let line_item = svc.add_to_cart(user, beverage.id, 3).await.unwrap();
        svc.remove_from_cart(user, line_item.id).await.unwrap();

        assert_eq!(stock_of(&store, beverage.id).await, 10);
        let view = svc.show_cart(user).await.unwrap();
        assert!(view.is_empty());
        assert_eq!(view.subtotal, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_remove_checks_ownership() {
        let store = InMemoryStore::default();
        let beverage = seed_beverage(&store, "Cola", dec!(2.50), 10).await;
        let svc = service(&store);
        let owner = UserId::new(1);

        let line_item = svc.add_to_cart(owner, beverage.id, 3).await.unwrap();
        let err = svc
            .remove_from_cart(UserId::new(2), line_item.id)
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::LineItemNotFound));

        assert_eq!(stock_of(&store, beverage.id).await, 7);
        let view = svc.show_cart(owner).await.unwrap();
        assert_eq!(view.items.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_unknown_line_item_is_not_found() {
        let store = InMemoryStore::default();
        let svc = service(&store);

        let err = svc
            .remove_from_cart(UserId::new(1), LineItemId::new(404))
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::LineItemNotFound));
    }

    #[tokio::test]
    async fn test_show_cart_without_cart_is_not_found() {
        let store = InMemoryStore::default();
        let svc = service(&store);

        let err = svc.show_cart(UserId::new(7)).await.unwrap_err();
        assert!(matches!(err, CartError::CartNotFound));
    }

    #[tokio::test]
    async fn test_purchase_snapshots_and_clears() {
        let store = InMemoryStore::default();
        let cola = seed_beverage(&store, "Cola", dec!(2.50), 10).await;
        let yuzu = seed_beverage(&store, "Yuzu Soda", dec!(4.00), 4).await;
        let svc = service(&store);
        let user = UserId::new(1);

        let first = svc.add_to_cart(user, cola.id, 3).await.unwrap();
        svc.add_to_cart(user, yuzu.id, 1).await.unwrap();

        let purchase = svc.purchase(user).await.unwrap();
        assert_eq!(purchase.user_id, user);
        assert_eq!(purchase.lines.len(), 2);
        assert_eq!(purchase.lines[0].name, "Cola");
        assert_eq!(purchase.lines[0].quantity, 3);
        assert_eq!(purchase.lines[0].line_total, dec!(7.50));
        assert_eq!(purchase.lines[1].name, "Yuzu Soda");
        assert_eq!(purchase.total, dec!(11.50));

        // Stock stays claimed; the cart and its line items are retired.
        assert_eq!(stock_of(&store, cola.id).await, 7);
        assert_eq!(stock_of(&store, yuzu.id).await, 3);
        assert!(svc.show_cart(user).await.unwrap().is_empty());
        assert!(
            LineItemStore::get(&store, first.id).await.unwrap().is_none(),
            "purchased line items should be deleted"
        );

        let history = svc.list_purchases(user).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, purchase.id);
    }

    #[tokio::test]
    async fn test_purchase_without_cart_is_not_found() {
        let store = InMemoryStore::default();
        let svc = service(&store);

        let err = svc.purchase(UserId::new(1)).await.unwrap_err();
        assert!(matches!(err, CartError::CartNotFound));
    }

    #[tokio::test]
    async fn test_purchase_empty_cart_conflicts() {
        let store = InMemoryStore::default();
        let beverage = seed_beverage(&store, "Cola", dec!(2.50), 10).await;
        let svc = service(&store);
        let user = UserId::new(1);

        let line_item = svc.add_to_cart(user, beverage.id, 2).await.unwrap();
        svc.remove_from_cart(user, line_item.id).await.unwrap();

        let err = svc.purchase(user).await.unwrap_err();
        assert!(matches!(err, CartError::EmptyCart));
    }

    #[tokio::test]
    async fn test_failed_attach_rolls_back_new_line_item() {
        let store = InMemoryStore::default();
        let beverage = seed_beverage(&store, "Cola", dec!(2.50), 10).await;
        let svc = service_with_failing_cart_store(&store);
        let user = UserId::new(1);

        let err = svc.add_to_cart(user, beverage.id, 3).await.unwrap_err();
        assert!(matches!(err, CartError::Store(StoreError::Backend(_))));

        assert_eq!(stock_of(&store, beverage.id).await, 10);
        assert!(
            LineItemStore::find_by_user_and_beverage(&store, user, beverage.id)
                .await
                .unwrap()
                .is_none(),
            "line item should be rolled back"
        );
    }

    #[tokio::test]
    async fn test_failed_attach_restores_merged_quantity() {
        let store = InMemoryStore::default();
        let beverage = seed_beverage(&store, "Cola", dec!(2.50), 10).await;
        let user = UserId::new(1);

        let line_item = service(&store)
            .add_to_cart(user, beverage.id, 3)
            .await
            .unwrap();

        let failing = service_with_failing_cart_store(&store);
        let err = failing.add_to_cart(user, beverage.id, 2).await.unwrap_err();
        assert!(matches!(err, CartError::Store(StoreError::Backend(_))));

        assert_eq!(stock_of(&store, beverage.id).await, 7);
        let unchanged = LineItemStore::get(&store, line_item.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(unchanged.quantity, 3);
    }

    #[tokio::test]
    async fn test_concurrent_merges_do_not_lose_increments() {
        let store = InMemoryStore::default();
        let beverage = seed_beverage(&store, "Cola", dec!(2.50), 50).await;
        let user = UserId::new(1);

        // Seed the merge target through a plain service.
        service(&store)
            .add_to_cart(user, beverage.id, 1)
            .await
            .unwrap();

        let shared = Arc::new(store.clone());
        let synced = Arc::new(SyncedLineItemStore {
            inner: store.clone(),
            read_barrier: Barrier::new(2),
        });
        let svc = Arc::new(CartService::new(
            shared.clone(),
            synced,
            shared.clone(),
            shared,
        ));

        // Both racers read quantity 1 before either writes.
        let mut handles = Vec::new();
        for _ in 0..2 {
            let svc = Arc::clone(&svc);
            let beverage_id = beverage.id;
            handles.push(tokio::spawn(
                async move { svc.add_to_cart(user, beverage_id, 1).await },
            ));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let merged = LineItemStore::find_by_user_and_beverage(&store, user, beverage.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(merged.quantity, 3, "both increments must stick");
        assert_eq!(
            stock_of(&store, beverage.id).await,
            47,
            "line quantity equals the stock deducted for it"
        );
    }
}
