//! Cart service behavior over the in-memory store.
//!
//! Exercises the cross-store guarantees end to end: adds merge into one line
//! item, stock is conserved across add/remove cycles, updates move stock by
//! the exact delta, membership is a set, and checkout snapshots then clears.

use std::sync::Arc;

use rust_decimal_macros::dec;

use quench_core::UserId;
use quench_integration_tests::{cart_service, seed_beverage, stock_of};
use quench_storefront::db::{CartStore, InMemoryStore, LineItemStore};
use quench_storefront::models::CreateLineItemInput;
use quench_storefront::services::CartError;

// =============================================================================
// Line Item Merging
// =============================================================================

#[tokio::test]
async fn test_repeated_adds_merge_into_one_line_item() {
    let store = InMemoryStore::new();
    let service = cart_service(&store);
    let beverage = seed_beverage(&store, "Cola Classic", dec!(2.50), 20).await;
    let user = UserId::new(1);

    for quantity in [1, 2, 3] {
        service
            .add_to_cart(user, beverage.id, quantity)
            .await
            .expect("add to cart");
    }

    let view = service.show_cart(user).await.expect("cart view");
    assert_eq!(view.items.len(), 1, "adds for one beverage must merge");
    assert_eq!(view.items.first().expect("one item").quantity, 6);
    assert_eq!(stock_of(&store, beverage.id).await, 14);
}

// =============================================================================
// Stock Conservation
// =============================================================================

#[tokio::test]
async fn test_stock_returns_after_add_then_remove() {
    let store = InMemoryStore::new();
    let service = cart_service(&store);
    let beverage = seed_beverage(&store, "Sparkling Water", dec!(1.20), 10).await;
    let user = UserId::new(2);

    let line_item = service
        .add_to_cart(user, beverage.id, 4)
        .await
        .expect("add to cart");
    assert_eq!(stock_of(&store, beverage.id).await, 6);

    service
        .remove_from_cart(user, line_item.id)
        .await
        .expect("remove from cart");

    assert_eq!(stock_of(&store, beverage.id).await, 10);
    assert!(service.show_cart(user).await.expect("cart view").is_empty());
}

#[tokio::test]
async fn test_update_moves_stock_by_exact_delta() {
    let store = InMemoryStore::new();
    let service = cart_service(&store);
    let beverage = seed_beverage(&store, "Cold Brew Coffee", dec!(4.50), 10).await;
    let user = UserId::new(3);

    let line_item = service
        .add_to_cart(user, beverage.id, 5)
        .await
        .expect("add to cart");
    assert_eq!(stock_of(&store, beverage.id).await, 5);

    let lowered = service
        .update_cart(line_item.id, 2)
        .await
        .expect("lower quantity");
    assert_eq!(lowered.quantity, 2);
    assert_eq!(stock_of(&store, beverage.id).await, 8);

    let raised = service
        .update_cart(line_item.id, 7)
        .await
        .expect("raise quantity");
    assert_eq!(raised.quantity, 7);
    assert_eq!(stock_of(&store, beverage.id).await, 3);
}

// =============================================================================
// Membership Idempotency
// =============================================================================

#[tokio::test]
async fn test_cart_membership_is_idempotent() {
    let store = InMemoryStore::new();
    let user = UserId::new(4);

    let first = store.ensure_cart_for_user(user).await.expect("ensure cart");
    let second = store
        .ensure_cart_for_user(user)
        .await
        .expect("ensure cart again");
    assert_eq!(first.id, second.id, "one cart per user");

    let beverage = seed_beverage(&store, "Ginger Beer", dec!(3.10), 10).await;
    let line_item = LineItemStore::create(
        &store,
        CreateLineItemInput {
            user_id: user,
            beverage_id: beverage.id,
            quantity: 2,
        },
    )
    .await
    .expect("create line item");

    store
        .add_line_item_ref(user, line_item.id)
        .await
        .expect("first link");
    store
        .add_line_item_ref(user, line_item.id)
        .await
        .expect("relink is a no-op");

    let view = store.cart_view(user).await.expect("view").expect("cart");
    assert_eq!(view.items.len(), 1, "references are a set");
}

// =============================================================================
// Remove Integrity
// =============================================================================

#[tokio::test]
async fn test_remove_erases_item_reference_and_restores_stock() {
    let store = InMemoryStore::new();
    let service = cart_service(&store);
    let beverage = seed_beverage(&store, "Yuzu Soda", dec!(4.00), 10).await;
    let user = UserId::new(5);

    let line_item = service
        .add_to_cart(user, beverage.id, 3)
        .await
        .expect("add to cart");

    service
        .remove_from_cart(user, line_item.id)
        .await
        .expect("remove from cart");

    assert!(
        LineItemStore::get(&store, line_item.id)
            .await
            .expect("lookup")
            .is_none(),
        "line item must be deleted"
    );
    assert!(
        service.show_cart(user).await.expect("cart view").is_empty(),
        "cart must no longer reference the line item"
    );
    assert_eq!(stock_of(&store, beverage.id).await, 10);
}

// =============================================================================
// Storefront Scenarios
// =============================================================================

#[tokio::test]
async fn test_cart_lifecycle_matches_storefront_flow() {
    let store = InMemoryStore::new();
    let service = cart_service(&store);
    let beverage = seed_beverage(&store, "Cola Classic", dec!(2.50), 10).await;
    let user = UserId::new(7);

    // First add creates the cart and claims stock.
    let line_item = service
        .add_to_cart(user, beverage.id, 3)
        .await
        .expect("first add");
    assert_eq!(line_item.quantity, 3);
    assert_eq!(stock_of(&store, beverage.id).await, 7);

    // A second add merges instead of duplicating.
    let merged = service
        .add_to_cart(user, beverage.id, 2)
        .await
        .expect("second add");
    assert_eq!(merged.id, line_item.id);
    assert_eq!(merged.quantity, 5);
    assert_eq!(stock_of(&store, beverage.id).await, 5);

    // Lowering the quantity gives the difference back.
    let lowered = service
        .update_cart(line_item.id, 1)
        .await
        .expect("update quantity");
    assert_eq!(lowered.quantity, 1);
    assert_eq!(stock_of(&store, beverage.id).await, 9);

    // Removing the line restores the rest and empties the cart.
    service
        .remove_from_cart(user, line_item.id)
        .await
        .expect("remove from cart");
    assert_eq!(stock_of(&store, beverage.id).await, 10);
    assert!(service.show_cart(user).await.expect("cart view").is_empty());
}

#[tokio::test]
async fn test_show_cart_for_unknown_user_is_not_found() {
    let store = InMemoryStore::new();
    let service = cart_service(&store);

    let err = service
        .show_cart(UserId::new(404))
        .await
        .expect_err("no cart");
    assert!(matches!(err, CartError::CartNotFound));
}

#[tokio::test]
async fn test_purchase_snapshots_cart_and_leaves_stock_deducted() {
    let store = InMemoryStore::new();
    let service = cart_service(&store);
    let cola = seed_beverage(&store, "Cola Classic", dec!(2.50), 10).await;
    let yuzu = seed_beverage(&store, "Yuzu Soda", dec!(4.00), 5).await;
    let user = UserId::new(8);

    service
        .add_to_cart(user, cola.id, 3)
        .await
        .expect("add cola");
    service
        .add_to_cart(user, yuzu.id, 1)
        .await
        .expect("add yuzu");

    let receipt = service.purchase(user).await.expect("purchase");
    assert_eq!(receipt.total, dec!(11.50));
    assert_eq!(receipt.lines.len(), 2);

    // Checkout consumes the cart but not the stock; that was claimed at add
    // time.
    assert_eq!(stock_of(&store, cola.id).await, 7);
    assert_eq!(stock_of(&store, yuzu.id).await, 4);
    assert!(service.show_cart(user).await.expect("cart view").is_empty());

    let history = service.list_purchases(user).await.expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history.first().expect("one receipt").id, receipt.id);

    let err = service.purchase(user).await.expect_err("nothing left to buy");
    assert!(matches!(err, CartError::EmptyCart));
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_adds_never_duplicate_line_items() {
    let store = InMemoryStore::new();
    let service = Arc::new(cart_service(&store));
    let beverage = seed_beverage(&store, "Cola Classic", dec!(2.50), 50).await;
    let user = UserId::new(9);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = Arc::clone(&service);
        let beverage_id = beverage.id;
        handles.push(tokio::spawn(async move {
            service.add_to_cart(user, beverage_id, 1).await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.expect("task completes") {
            Ok(_) => successes += 1,
            // A losing racer compensates its stock claim and asks the caller
            // to retry.
            Err(CartError::Conflict(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert!(successes >= 1, "at least one add must win");

    let view = service.show_cart(user).await.expect("cart view");
    assert_eq!(view.items.len(), 1, "concurrent adds must merge");
    assert_eq!(view.items.first().expect("one item").quantity, successes);
    assert_eq!(
        stock_of(&store, beverage.id).await,
        50 - successes,
        "stock reflects exactly the claims that stuck"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_adds_stop_at_the_stock_floor() {
    let store = InMemoryStore::new();
    let service = Arc::new(cart_service(&store));
    let beverage = seed_beverage(&store, "Elderflower Tonic", dec!(2.90), 5).await;

    let mut handles = Vec::new();
    for n in 0..8_i32 {
        let service = Arc::clone(&service);
        let beverage_id = beverage.id;
        handles.push(tokio::spawn(async move {
            service.add_to_cart(UserId::new(n), beverage_id, 1).await
        }));
    }

    let mut successes = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.expect("task completes") {
            Ok(_) => successes += 1,
            Err(CartError::InsufficientStock { .. }) => rejected += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(successes, 5, "every unit on hand gets claimed exactly once");
    assert_eq!(rejected, 3);
    assert_eq!(stock_of(&store, beverage.id).await, 0);
}
