//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `cart` - Cart and checkout orchestration over the stores

pub mod cart;

pub use cart::{CartError, CartService};
