//! Business logic services.
//!
//! Services sit between the route handlers and the repositories. The cart,
//! inventory, order, and payment seams are traits so the checkout pipeline
//! can be exercised without a live database or payment provider.

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod inventory;
pub mod orders;
pub mod payment;
pub mod sweeper;

pub use auth::{AuthError, AuthService, Authenticated};
pub use cart::{CartError, CartStore, DbCartStore, SessionCartStore};
pub use checkout::{CheckoutError, CheckoutReceipt, CheckoutService};
pub use inventory::{InventoryStore, PgInventoryStore, Reservation};
pub use orders::{OrderError, OrderService, OrderStore, PgOrderStore};
pub use payment::{GatewayError, PaymentGateway, PaymentSession, VerifiedPayment};
pub use sweeper::spawn_fulfillment_sweeper;
