//! Integration tests for Okra.
//!
//! The checkout, payment, and order flows are exercised end to end against
//! in-memory implementations of the cart, inventory, order, and payment
//! seams, so no `PostgreSQL` instance or payment provider is required.
//!
//! ```bash
//! cargo test -p okra-integration-tests
//! ```

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Notify;

use okra_api::db::{RepositoryError, ReserveOutcome, SweepOutcome};
use okra_api::models::{Cart, LineSnapshot, NewOrder, Order, Product};
use okra_api::services::{
    CartError, CartStore, GatewayError, InventoryStore, OrderStore, PaymentGateway,
    PaymentSession, Reservation, VerifiedPayment,
};
use okra_core::{
    Email, OrderId, OrderStatus, Owner, PaymentStatus, Price, ProductId, next_fulfillment,
};

/// In-memory cart: one cart, guarded by a mutex like the session backend's
/// per-session serialization.
#[derive(Default)]
pub struct MemoryCart {
    cart: Mutex<Cart>,
}

impl MemoryCart {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn apply<F>(&self, mutate: F) -> Result<Cart, CartError>
    where
        F: FnOnce(&mut Cart) -> Result<(), CartError>,
    {
        let mut cart = self.cart.lock().expect("cart lock");
        mutate(&mut cart)?;
        Ok(cart.clone())
    }
}

#[async_trait]
impl CartStore for MemoryCart {
    async fn read(&self) -> Result<Cart, CartError> {
        Ok(self.cart.lock().expect("cart lock").clone())
    }

    async fn add_line(
        &self,
        snapshot: LineSnapshot,
        quantity: i32,
        size: Option<String>,
        color: Option<String>,
    ) -> Result<Cart, CartError> {
        self.apply(|cart| {
            cart.add_line(snapshot, quantity, size, color)
                .map_err(CartError::from)
        })
    }

    async fn update_quantity(
        &self,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<Cart, CartError> {
        self.apply(|cart| {
            cart.update_quantity(product_id, quantity)
                .map_err(CartError::from)
        })
    }

    async fn remove(&self, product_id: ProductId) -> Result<Cart, CartError> {
        self.apply(|cart| cart.remove(product_id).map_err(CartError::from))
    }

    async fn clear(&self) -> Result<Cart, CartError> {
        self.apply(|cart| {
            cart.clear();
            Ok(())
        })
    }
}

/// In-memory catalog with the same all-or-nothing reservation contract as
/// the conditional SQL decrement.
#[derive(Default)]
pub struct MemoryInventory {
    products: Mutex<HashMap<ProductId, Product>>,
}

impl MemoryInventory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, product: Product) {
        self.products
            .lock()
            .expect("inventory lock")
            .insert(product.id, product);
    }

    /// Current stock for a product.
    #[must_use]
    pub fn stock(&self, id: ProductId) -> Option<i32> {
        self.products
            .lock()
            .expect("inventory lock")
            .get(&id)
            .map(|p| p.quantity)
    }

    /// Hard-delete a product from the catalog.
    pub fn remove(&self, id: ProductId) {
        self.products.lock().expect("inventory lock").remove(&id);
    }

    /// Change a product's catalog price (to show cart lines don't follow).
    pub fn reprice(&self, id: ProductId, price: Price) {
        if let Some(p) = self.products.lock().expect("inventory lock").get_mut(&id) {
            p.price = price;
        }
    }
}

#[async_trait]
impl InventoryStore for MemoryInventory {
    async fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self
            .products
            .lock()
            .expect("inventory lock")
            .get(&id)
            .cloned())
    }

    async fn reserve(&self, demands: &[Reservation]) -> Result<ReserveOutcome, RepositoryError> {
        let mut products = self.products.lock().expect("inventory lock");

        // Check everything under the lock before mutating anything.
        for demand in demands {
            match products.get(&demand.product_id) {
                Some(p) if p.quantity >= demand.quantity => {}
                Some(_) | None => return Ok(ReserveOutcome::Short(demand.product_id)),
            }
        }
        for demand in demands {
            if let Some(p) = products.get_mut(&demand.product_id) {
                p.quantity -= demand.quantity;
            }
        }
        Ok(ReserveOutcome::Reserved)
    }

    async fn release(&self, demands: &[Reservation]) -> Result<(), RepositoryError> {
        let mut products = self.products.lock().expect("inventory lock");
        for demand in demands {
            if let Some(p) = products.get_mut(&demand.product_id) {
                p.quantity += demand.quantity;
            }
        }
        Ok(())
    }
}

/// In-memory order ledger mirroring the conditional status updates of the
/// SQL repository.
#[derive(Default)]
pub struct MemoryOrders {
    orders: Mutex<HashMap<OrderId, Order>>,
    next_id: AtomicI32,
    fail_create: AtomicBool,
    create_held: AtomicBool,
    create_gate: Notify,
}

impl MemoryOrders {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend an order last changed at `when` (for sweep tests).
    pub fn backdate(&self, id: OrderId, when: DateTime<Utc>) {
        if let Some(order) = self.orders.lock().expect("orders lock").get_mut(&id) {
            order.updated_at = when;
        }
    }

    /// Fail the order-create step to exercise the compensation path.
    pub fn fail_next_create(&self) {
        self.fail_create.store(true, Ordering::SeqCst);
    }

    /// Park `create` calls until [`MemoryOrders::release_create`], leaving
    /// checkout suspended between the reservation and the order write.
    pub fn hold_create(&self) {
        self.create_held.store(true, Ordering::SeqCst);
    }

    /// Let parked `create` calls proceed.
    pub fn release_create(&self) {
        self.create_held.store(false, Ordering::SeqCst);
        self.create_gate.notify_waiters();
    }
}

#[async_trait]
impl OrderStore for MemoryOrders {
    async fn create(&self, draft: &NewOrder) -> Result<Order, RepositoryError> {
        if self.create_held.load(Ordering::SeqCst) {
            self.create_gate.notified().await;
        }
        if self.fail_create.swap(false, Ordering::SeqCst) {
            return Err(RepositoryError::Conflict("scripted create failure".into()));
        }

        let id = OrderId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let now = Utc::now();
        let order = Order {
            id,
            owner: draft.owner.clone(),
            items: draft.items.clone(),
            total_amount: draft.total_amount,
            payment_status: PaymentStatus::Pending,
            order_status: OrderStatus::Pending,
            payment_reference: None,
            shipping_address: draft.shipping_address.clone(),
            created_at: now,
            updated_at: now,
        };
        self.orders
            .lock()
            .expect("orders lock")
            .insert(id, order.clone());
        Ok(order)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.orders.lock().expect("orders lock").get(&id).cloned())
    }

    async fn list_for_owner(&self, owner: &Owner) -> Result<Vec<Order>, RepositoryError> {
        let orders = self.orders.lock().expect("orders lock");
        let mut matched: Vec<Order> = orders
            .values()
            .filter(|o| o.owned_by(owner))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matched)
    }

    async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let orders = self.orders.lock().expect("orders lock");
        let mut all: Vec<Order> = orders.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn set_payment_reference(
        &self,
        id: OrderId,
        reference: &str,
    ) -> Result<(), RepositoryError> {
        if let Some(order) = self.orders.lock().expect("orders lock").get_mut(&id) {
            order.payment_reference = Some(reference.to_owned());
            order.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn confirm_paid(&self, id: OrderId) -> Result<bool, RepositoryError> {
        let mut orders = self.orders.lock().expect("orders lock");
        match orders.get_mut(&id) {
            Some(order) if order.payment_status == PaymentStatus::Pending => {
                order.payment_status = PaymentStatus::Paid;
                order.order_status = OrderStatus::Processing;
                order.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_payment_failed(&self, id: OrderId) -> Result<bool, RepositoryError> {
        let mut orders = self.orders.lock().expect("orders lock");
        match orders.get_mut(&id) {
            Some(order) if order.payment_status == PaymentStatus::Pending => {
                order.payment_status = PaymentStatus::Failed;
                order.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn cancel(&self, id: OrderId) -> Result<bool, RepositoryError> {
        let mut orders = self.orders.lock().expect("orders lock");
        match orders.get_mut(&id) {
            Some(order) if order.order_status == OrderStatus::Pending => {
                order.order_status = OrderStatus::Cancelled;
                order.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn advance(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, RepositoryError> {
        let mut orders = self.orders.lock().expect("orders lock");
        match orders.get_mut(&id) {
            Some(order) if order.order_status == from => {
                order.order_status = to;
                order.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, id: OrderId) -> Result<(), RepositoryError> {
        self.orders
            .lock()
            .expect("orders lock")
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn sweep_fulfillment(&self, now: DateTime<Utc>) -> Result<SweepOutcome, RepositoryError> {
        let mut orders = self.orders.lock().expect("orders lock");
        let mut outcome = SweepOutcome::default();
        for order in orders.values_mut() {
            if let Some(next) = next_fulfillment(
                order.order_status,
                order.payment_status,
                order.updated_at,
                now,
            ) {
                match next {
                    OrderStatus::Shipped => outcome.shipped += 1,
                    OrderStatus::Delivered => outcome.delivered += 1,
                    _ => {}
                }
                order.order_status = next;
                order.updated_at = now;
            }
        }
        Ok(outcome)
    }
}

/// Scripted payment gateway.
///
/// `initialize` hands out sequential references; `verify` answers from a
/// script keyed by reference, defaulting to success.
#[derive(Default)]
pub struct MockGateway {
    counter: AtomicU32,
    fail_initialize: AtomicBool,
    verdicts: Mutex<HashMap<String, VerifiedPayment>>,
}

impl MockGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `initialize` call fail with a rejection.
    pub fn fail_next_initialize(&self) {
        self.fail_initialize.store(true, Ordering::SeqCst);
    }

    /// Script the verdict `verify` returns for `reference`.
    pub fn script_verdict(&self, reference: &str, verdict: VerifiedPayment) {
        self.verdicts
            .lock()
            .expect("verdicts lock")
            .insert(reference.to_owned(), verdict);
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn initialize(
        &self,
        _amount: Price,
        _email: &Email,
        _callback_url: &str,
    ) -> Result<PaymentSession, GatewayError> {
        if self.fail_initialize.swap(false, Ordering::SeqCst) {
            return Err(GatewayError::Rejected("scripted failure".to_owned()));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let reference = format!("ref-{n}");
        Ok(PaymentSession {
            authorization_url: format!("https://pay.example.com/{reference}"),
            reference,
        })
    }

    async fn verify(&self, reference: &str) -> Result<VerifiedPayment, GatewayError> {
        Ok(self
            .verdicts
            .lock()
            .expect("verdicts lock")
            .get(reference)
            .copied()
            .unwrap_or(VerifiedPayment::Success))
    }
}

/// A catalog product for tests.
#[must_use]
pub fn product(id: i32, name: &str, quantity: i32, price_minor: i64) -> Product {
    Product {
        id: ProductId::new(id),
        admin_id: okra_core::AdminId::new(1),
        name: name.to_owned(),
        description: String::new(),
        quantity,
        price: Price::from_minor(price_minor).expect("price"),
        sizes: Vec::new(),
        colors: Vec::new(),
        images: Vec::new(),
        created_at: Utc::now(),
    }
}

/// A filled-in shipping address.
#[must_use]
pub fn address() -> okra_api::models::ShippingAddress {
    okra_api::models::ShippingAddress {
        street: "12 Allen Avenue".to_owned(),
        city: "Ikeja".to_owned(),
        state: "Lagos".to_owned(),
        postal_code: "100001".to_owned(),
        country: "NG".to_owned(),
    }
}
