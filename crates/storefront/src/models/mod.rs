//! Domain models for the storefront.

pub mod beverage;
pub mod cart;
pub mod line_item;
pub mod purchase;

pub use beverage::{Beverage, CreateBeverageInput};
pub use cart::{Cart, CartItemView, CartView};
pub use line_item::{CreateLineItemInput, LineItem};
pub use purchase::{Purchase, PurchaseLine};
