//! Domain models for the API crate.
//!
//! Row decoding lives in `db`; these are the shapes the services and route
//! handlers work with. Cart merge rules live here so both cart backends share
//! one implementation.

pub mod cart;
pub mod order;
pub mod product;
pub mod session;
pub mod user;

pub use cart::{Cart, CartItem, CartModelError, LineSnapshot};
pub use order::{NewOrder, Order, OrderItem, ShippingAddress};
pub use product::{MAX_PRODUCT_IMAGES, Product};
pub use session::{CurrentIdentity, session_keys};
pub use user::{Admin, User};
