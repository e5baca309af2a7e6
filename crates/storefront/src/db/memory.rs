//! In-memory store backend for tests and local development.
//!
//! One [`InMemoryStore`] implements every store trait over a single shared
//! lock, so multi-step checks (stock floor, line item uniqueness, cart
//! upsert) hold under the same linearizability contract as the `PostgreSQL`
//! backend. Clones share the underlying storage.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use quench_core::{BeverageId, CartId, LineItemId, PurchaseId, UserId};

use super::{
    BeverageStore, CartStore, LineItemStore, PurchaseStore, StoreError,
};
use crate::models::{
    Beverage, Cart, CartItemView, CartView, CreateBeverageInput, CreateLineItemInput, LineItem,
    Purchase, PurchaseLine,
};

#[derive(Debug, Default)]
struct MemoryInner {
    beverages: HashMap<BeverageId, Beverage>,
    line_items: HashMap<LineItemId, LineItem>,
    line_item_index: HashMap<(UserId, BeverageId), LineItemId>,
    carts: HashMap<CartId, Cart>,
    cart_ids_by_user: HashMap<UserId, CartId>,
    memberships: HashMap<CartId, BTreeSet<i32>>,
    purchases: Vec<Purchase>,
    next_beverage_id: i32,
    next_line_item_id: i32,
    next_cart_id: i32,
}

/// Shared in-memory backend implementing all store traits.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    inner: Arc<RwLock<MemoryInner>>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryInner>, StoreError> {
        self.inner
            .read()
            .map_err(|e| StoreError::Backend(format!("poisoned lock: {e}")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryInner>, StoreError> {
        self.inner
            .write()
            .map_err(|e| StoreError::Backend(format!("poisoned lock: {e}")))
    }
}

impl MemoryInner {
    fn expand_item(&self, line_item: &LineItem) -> Option<CartItemView> {
        let beverage = self.beverages.get(&line_item.beverage_id)?;
        let line_total = beverage.price * Decimal::from(line_item.quantity);
        Some(CartItemView {
            line_item_id: line_item.id,
            beverage_id: beverage.id,
            name: beverage.name.clone(),
            brand_name: beverage.brand_name.clone(),
            unit_price: beverage.price,
            volume: beverage.volume.clone(),
            image_url: beverage.image_url.clone(),
            stock: beverage.stock,
            quantity: line_item.quantity,
            line_total,
        })
    }
}

#[async_trait]
impl BeverageStore for InMemoryStore {
    async fn create(&self, input: CreateBeverageInput) -> Result<Beverage, StoreError> {
        let mut inner = self.write()?;
        inner.next_beverage_id += 1;
        let now = Utc::now();
        let beverage = Beverage {
            id: BeverageId::new(inner.next_beverage_id),
            name: input.name,
            brand_name: input.brand_name,
            price: input.price,
            stock: input.stock,
            volume: input.volume,
            image_url: input.image_url,
            created_at: now,
            updated_at: now,
        };
        inner.beverages.insert(beverage.id, beverage.clone());
        Ok(beverage)
    }

    async fn get(&self, id: BeverageId) -> Result<Option<Beverage>, StoreError> {
        let inner = self.read()?;
        Ok(inner.beverages.get(&id).cloned())
    }

    async fn adjust_stock(&self, id: BeverageId, delta: i32) -> Result<i32, StoreError> {
        let mut inner = self.write()?;
        let beverage = inner.beverages.get_mut(&id).ok_or(StoreError::NotFound)?;
        let new_stock = beverage.stock + delta;
        if new_stock < 0 {
            return Err(StoreError::InsufficientStock {
                available: beverage.stock,
            });
        }
        beverage.stock = new_stock;
        beverage.updated_at = Utc::now();
        Ok(new_stock)
    }
}

#[async_trait]
impl LineItemStore for InMemoryStore {
    async fn create(&self, input: CreateLineItemInput) -> Result<LineItem, StoreError> {
        let mut inner = self.write()?;
        let key = (input.user_id, input.beverage_id);
        if inner.line_item_index.contains_key(&key) {
            return Err(StoreError::Conflict(
                "line item already exists for user and beverage".to_owned(),
            ));
        }
        inner.next_line_item_id += 1;
        let now = Utc::now();
        let line_item = LineItem {
            id: LineItemId::new(inner.next_line_item_id),
            user_id: input.user_id,
            beverage_id: input.beverage_id,
            quantity: input.quantity,
            created_at: now,
            updated_at: now,
        };
        inner.line_item_index.insert(key, line_item.id);
        inner.line_items.insert(line_item.id, line_item.clone());
        Ok(line_item)
    }

    async fn get(&self, id: LineItemId) -> Result<Option<LineItem>, StoreError> {
        let inner = self.read()?;
        Ok(inner.line_items.get(&id).cloned())
    }

    async fn find_by_user_and_beverage(
        &self,
        user_id: UserId,
        beverage_id: BeverageId,
    ) -> Result<Option<LineItem>, StoreError> {
        let inner = self.read()?;
        let id = inner.line_item_index.get(&(user_id, beverage_id));
        Ok(id.and_then(|id| inner.line_items.get(id)).cloned())
    }

    async fn update_quantity(&self, id: LineItemId, quantity: i32) -> Result<LineItem, StoreError> {
        let mut inner = self.write()?;
        let line_item = inner.line_items.get_mut(&id).ok_or(StoreError::NotFound)?;
        line_item.quantity = quantity;
        line_item.updated_at = Utc::now();
        Ok(line_item.clone())
    }

    async fn increment_quantity(&self, id: LineItemId, delta: i32) -> Result<LineItem, StoreError> {
        let mut inner = self.write()?;
        let line_item = inner.line_items.get_mut(&id).ok_or(StoreError::NotFound)?;
        line_item.quantity += delta;
        line_item.updated_at = Utc::now();
        Ok(line_item.clone())
    }

    async fn delete(&self, id: LineItemId) -> Result<LineItem, StoreError> {
        let mut inner = self.write()?;
        let line_item = inner.line_items.remove(&id).ok_or(StoreError::NotFound)?;
        inner
            .line_item_index
            .remove(&(line_item.user_id, line_item.beverage_id));
        // Mirror the database's ON DELETE CASCADE on membership references.
        if let Some(cart_id) = inner.cart_ids_by_user.get(&line_item.user_id).copied()
            && let Some(members) = inner.memberships.get_mut(&cart_id)
        {
            members.remove(&id.as_i32());
        }
        Ok(line_item)
    }
}

#[async_trait]
impl CartStore for InMemoryStore {
    async fn ensure_cart_for_user(&self, user_id: UserId) -> Result<Cart, StoreError> {
        let mut inner = self.write()?;
        if let Some(cart_id) = inner.cart_ids_by_user.get(&user_id)
            && let Some(cart) = inner.carts.get(cart_id)
        {
            return Ok(cart.clone());
        }
        inner.next_cart_id += 1;
        let now = Utc::now();
        let cart = Cart {
            id: CartId::new(inner.next_cart_id),
            user_id,
            created_at: now,
            updated_at: now,
        };
        inner.cart_ids_by_user.insert(user_id, cart.id);
        inner.memberships.insert(cart.id, BTreeSet::new());
        inner.carts.insert(cart.id, cart.clone());
        Ok(cart)
    }

    async fn add_line_item_ref(
        &self,
        user_id: UserId,
        line_item_id: LineItemId,
    ) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        let cart_id = inner
            .cart_ids_by_user
            .get(&user_id)
            .copied()
            .ok_or(StoreError::NotFound)?;
        inner
            .memberships
            .entry(cart_id)
            .or_default()
            .insert(line_item_id.as_i32());
        Ok(())
    }

    async fn remove_line_item_ref(
        &self,
        user_id: UserId,
        line_item_id: LineItemId,
    ) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        if let Some(cart_id) = inner.cart_ids_by_user.get(&user_id).copied()
            && let Some(members) = inner.memberships.get_mut(&cart_id)
        {
            members.remove(&line_item_id.as_i32());
        }
        Ok(())
    }

    async fn cart_view(&self, user_id: UserId) -> Result<Option<CartView>, StoreError> {
        let inner = self.read()?;
        let Some(cart_id) = inner.cart_ids_by_user.get(&user_id).copied() else {
            return Ok(None);
        };
        let Some(cart) = inner.carts.get(&cart_id) else {
            return Ok(None);
        };

        // Membership ids ascend in creation order, matching the SQL backend's
        // ORDER BY (created_at, id).
        let items: Vec<CartItemView> = inner
            .memberships
            .get(&cart_id)
            .map(|members| {
                members
                    .iter()
                    .filter_map(|id| inner.line_items.get(&LineItemId::new(*id)))
                    .filter_map(|line_item| inner.expand_item(line_item))
                    .collect()
            })
            .unwrap_or_default();

        let item_count = items.iter().map(|i| i64::from(i.quantity)).sum();
        let subtotal = items.iter().map(|i| i.line_total).sum();

        Ok(Some(CartView {
            cart_id: cart.id,
            user_id: cart.user_id,
            items,
            item_count,
            subtotal,
        }))
    }

    async fn clear(&self, cart_id: CartId) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        if let Some(members) = inner.memberships.get_mut(&cart_id) {
            members.clear();
        }
        Ok(())
    }
}

#[async_trait]
impl PurchaseStore for InMemoryStore {
    async fn create(
        &self,
        user_id: UserId,
        lines: Vec<PurchaseLine>,
        total: Decimal,
    ) -> Result<Purchase, StoreError> {
        let mut inner = self.write()?;
        let purchase = Purchase {
            id: PurchaseId::generate(),
            user_id,
            total,
            lines,
            created_at: Utc::now(),
        };
        inner.purchases.push(purchase.clone());
        Ok(purchase)
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Purchase>, StoreError> {
        let inner = self.read()?;
        // Insertion order is chronological; reverse for newest first.
        Ok(inner
            .purchases
            .iter()
            .rev()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }
}
