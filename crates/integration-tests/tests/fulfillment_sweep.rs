//! Integration tests for the time-based fulfillment sweep.
//!
//! Paid orders age through processing -> shipped -> delivered; unpaid
//! orders never move.

use std::sync::Arc;

use chrono::{Duration, Utc};

use okra_api::models::{LineSnapshot, NewOrder, OrderItem};
use okra_api::services::{CartStore, CheckoutService, OrderService, OrderStore};
use okra_core::{
    DELIVER_AFTER_DAYS, OrderId, OrderStatus, Owner, PaymentStatus, Price, ProductId,
    SHIP_AFTER_DAYS, UserId,
};
use okra_integration_tests::{MemoryCart, MemoryInventory, MemoryOrders, MockGateway, address, product};

async fn seeded_order(orders: &MemoryOrders) -> OrderId {
    let draft = NewOrder {
        owner: Owner::User(UserId::new(1)),
        items: vec![OrderItem {
            product_id: ProductId::new(1),
            name: "Ankara Tote".to_owned(),
            unit_price: Price::from_minor(500).expect("price"),
            quantity: 1,
            size: None,
            color: None,
        }],
        total_amount: Price::from_minor(500).expect("price"),
        shipping_address: address(),
    };
    orders.create(&draft).await.expect("create").id
}

// =============================================================================
// Promotion Rules
// =============================================================================

#[tokio::test]
async fn test_stale_processing_order_ships() {
    let orders = MemoryOrders::new();
    let id = seeded_order(&orders).await;
    orders.confirm_paid(id).await.expect("confirm");
    orders.backdate(id, Utc::now() - Duration::days(SHIP_AFTER_DAYS));

    let outcome = orders.sweep_fulfillment(Utc::now()).await.expect("sweep");

    assert_eq!(outcome.shipped, 1);
    assert_eq!(outcome.delivered, 0);
    let order = orders.get(id).await.expect("get").expect("order");
    assert_eq!(order.order_status, OrderStatus::Shipped);
}

#[tokio::test]
async fn test_stale_shipped_order_delivers() {
    let orders = MemoryOrders::new();
    let id = seeded_order(&orders).await;
    orders.confirm_paid(id).await.expect("confirm");
    orders
        .advance(id, OrderStatus::Processing, OrderStatus::Shipped)
        .await
        .expect("ship");
    orders.backdate(id, Utc::now() - Duration::days(DELIVER_AFTER_DAYS));

    let outcome = orders.sweep_fulfillment(Utc::now()).await.expect("sweep");

    assert_eq!(outcome.delivered, 1);
    let order = orders.get(id).await.expect("get").expect("order");
    assert_eq!(order.order_status, OrderStatus::Delivered);
}

#[tokio::test]
async fn test_fresh_orders_do_not_move() {
    let orders = MemoryOrders::new();
    let id = seeded_order(&orders).await;
    orders.confirm_paid(id).await.expect("confirm");
    // Just under the threshold.
    orders.backdate(id, Utc::now() - Duration::days(SHIP_AFTER_DAYS) + Duration::hours(1));

    let outcome = orders.sweep_fulfillment(Utc::now()).await.expect("sweep");

    assert_eq!(outcome.shipped, 0);
    let order = orders.get(id).await.expect("get").expect("order");
    assert_eq!(order.order_status, OrderStatus::Processing);
}

#[tokio::test]
async fn test_unpaid_orders_never_move() {
    let orders = MemoryOrders::new();

    // Pending payment, however stale.
    let pending = seeded_order(&orders).await;
    orders.backdate(pending, Utc::now() - Duration::days(30));

    // Failed payment too.
    let failed = seeded_order(&orders).await;
    orders.mark_payment_failed(failed).await.expect("fail");
    orders.backdate(failed, Utc::now() - Duration::days(30));

    let outcome = orders.sweep_fulfillment(Utc::now()).await.expect("sweep");

    assert_eq!(outcome.shipped, 0);
    assert_eq!(outcome.delivered, 0);
    for id in [pending, failed] {
        let order = orders.get(id).await.expect("get").expect("order");
        assert_eq!(order.order_status, OrderStatus::Pending);
    }
}

#[tokio::test]
async fn test_one_pass_moves_each_order_a_single_step() {
    // An order stale enough for both thresholds only ships on this pass;
    // delivery starts counting from the ship time.
    let orders = MemoryOrders::new();
    let id = seeded_order(&orders).await;
    orders.confirm_paid(id).await.expect("confirm");
    orders.backdate(id, Utc::now() - Duration::days(SHIP_AFTER_DAYS + DELIVER_AFTER_DAYS));

    let outcome = orders.sweep_fulfillment(Utc::now()).await.expect("sweep");

    assert_eq!(outcome.shipped, 1);
    assert_eq!(outcome.delivered, 0);
    let order = orders.get(id).await.expect("get").expect("order");
    assert_eq!(order.order_status, OrderStatus::Shipped);

    // A second immediate pass does nothing; the clock restarted.
    let again = orders.sweep_fulfillment(Utc::now()).await.expect("sweep");
    assert_eq!(again.shipped + again.delivered, 0);
}

// =============================================================================
// End to End
// =============================================================================

#[tokio::test]
async fn test_order_lifecycle_from_cart_to_delivered() {
    let inventory = Arc::new(MemoryInventory::new());
    inventory.insert(product(1, "Ankara Tote", 10, 500));

    let orders = Arc::new(MemoryOrders::new());
    let gateway = Arc::new(MockGateway::new());

    // Two units at 500 minor each.
    let cart = Arc::new(MemoryCart::new());
    cart.add_line(
        LineSnapshot {
            product_id: ProductId::new(1),
            name: "Ankara Tote".to_owned(),
            unit_price: Price::from_minor(500).expect("price"),
            image_url: None,
        },
        2,
        None,
        None,
    )
    .await
    .expect("add");

    let email = "shopper@example.com".parse().expect("email");
    let receipt = CheckoutService::new(inventory.clone(), orders.clone(), gateway.clone())
        .checkout(cart, Owner::User(UserId::new(1)), &email, address(), |id| {
            format!("https://shop.example.com/cb/{id}")
        })
        .await
        .expect("checkout");
    assert_eq!(receipt.total_amount.minor_units(), 1_000);

    // Shopper pays; the callback settles the order.
    let service = OrderService::new(orders.as_ref(), gateway.as_ref());
    let order = service
        .confirm_payment(receipt.order_id, &receipt.reference)
        .await
        .expect("confirm");
    assert_eq!(order.payment_status, PaymentStatus::Paid);
    assert_eq!(order.order_status, OrderStatus::Processing);

    // Three days later the sweep ships it.
    orders.backdate(receipt.order_id, Utc::now() - Duration::days(SHIP_AFTER_DAYS));
    orders.sweep_fulfillment(Utc::now()).await.expect("sweep");

    // Two more days and it is delivered.
    orders.backdate(receipt.order_id, Utc::now() - Duration::days(DELIVER_AFTER_DAYS));
    orders.sweep_fulfillment(Utc::now()).await.expect("sweep");

    let order = orders
        .get(receipt.order_id)
        .await
        .expect("get")
        .expect("order");
    assert_eq!(order.order_status, OrderStatus::Delivered);
    assert_eq!(inventory.stock(ProductId::new(1)), Some(8));
}
