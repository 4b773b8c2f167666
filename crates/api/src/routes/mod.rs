//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                              - Liveness check
//! GET  /health/ready                        - Readiness check (database ping)
//!
//! # Accounts
//! POST /api/users                           - Register shopper
//! POST /api/users/auth                      - Login (shopper or admin)
//! POST /api/users/logout                    - Logout
//! GET  /api/users/profile                   - Current shopper profile
//! PUT  /api/users/profile                   - Update profile
//!
//! # Catalog
//! GET  /api/products                        - Product listing
//! GET  /api/products/{id}                   - Product detail
//!
//! # Cart (logged-in shoppers and guests)
//! GET    /api/users/cart                    - Cart contents
//! POST   /api/users/cart                    - Add item
//! PUT    /api/users/cart                    - Update item quantity
//! DELETE /api/users/cart/remove/{id}        - Remove item
//! DELETE /api/users/cart/clear              - Empty the cart
//!
//! # Checkout and payment
//! POST /api/users/checkout                  - Place order, open payment session
//! GET  /api/users/payment/callback/{id}     - Payment provider return URL
//!
//! # Orders
//! GET  /api/users/orders                    - Caller's orders
//! GET  /api/users/orders/{id}               - Order detail
//! POST /api/users/orders/{id}/cancel        - Cancel a pending order
//!
//! # Admin
//! POST   /api/admin                         - Register admin
//! GET    /api/admin/products                - Own products
//! POST   /api/admin/products                - Create product
//! PUT    /api/admin/products/{id}           - Update own product
//! DELETE /api/admin/products/{id}           - Delete own product
//! GET    /api/admin/orders                  - All orders
//! GET    /api/admin/orders/{id}             - Order detail
//! PUT    /api/admin/orders/{id}/status      - Advance fulfillment status
//! DELETE /api/admin/orders/{id}             - Delete an order
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod orders;
pub mod products;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, post, put},
};

use crate::state::AppState;

/// Create the shopper-facing routes under `/api/users`.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(auth::register))
        .route("/auth", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/profile", get(auth::profile).put(auth::update_profile))
        .route(
            "/cart",
            get(cart::read).post(cart::add).put(cart::update_quantity),
        )
        .route("/cart/remove/{product_id}", delete(cart::remove))
        .route("/cart/clear", delete(cart::clear))
        .route("/checkout", post(checkout::checkout))
        .route(
            "/payment/callback/{order_id}",
            get(checkout::payment_callback),
        )
        .route("/orders", get(orders::list))
        .route("/orders/{id}", get(orders::detail))
        .route("/orders/{id}/cancel", post(orders::cancel))
}

/// Create the public catalog routes under `/api/products`.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::list))
        .route("/{id}", get(products::detail))
}

/// Create the admin routes under `/api/admin`.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(admin::register))
        .route(
            "/products",
            get(admin::products::list).post(admin::products::create),
        )
        .route(
            "/products/{id}",
            put(admin::products::update).delete(admin::products::remove),
        )
        .route("/orders", get(admin::orders::list))
        .route(
            "/orders/{id}",
            get(admin::orders::detail).delete(admin::orders::remove),
        )
        .route("/orders/{id}/status", put(admin::orders::set_status))
}

/// Create the complete application router. State is attached in `main`.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(health_ready))
        .nest("/api/users", user_routes())
        .nest("/api/products", product_routes())
        .nest("/api/admin", admin_routes())
}

/// Liveness check.
async fn health() -> &'static str {
    "OK"
}

/// Readiness check: verifies the database answers.
async fn health_ready(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").execute(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::error!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
