//! Integration tests for payment confirmation.
//!
//! Exercises the callback contract: provider verification, the
//! pending-only conditional writes, replay idempotency, and the
//! reference check.

use std::sync::Arc;

use okra_api::models::LineSnapshot;
use okra_api::services::{
    CartStore, CheckoutReceipt, CheckoutService, OrderError, OrderService, OrderStore,
    VerifiedPayment,
};
use okra_core::{OrderStatus, Owner, PaymentStatus, Price, ProductId, UserId};
use okra_integration_tests::{MemoryCart, MemoryInventory, MemoryOrders, MockGateway, address, product};

/// Checkout one order and hand back the receipt.
async fn place_order(
    inventory: &Arc<MemoryInventory>,
    orders: &Arc<MemoryOrders>,
    gateway: &Arc<MockGateway>,
) -> CheckoutReceipt {
    inventory.insert(product(1, "Ankara Tote", 5, 500));
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
    CheckoutService::new(inventory.clone(), orders.clone(), gateway.clone())
        .checkout(cart, Owner::User(UserId::new(1)), &email, address(), |id| {
            format!("https://shop.example.com/cb/{id}")
        })
        .await
        .expect("checkout")
}

// =============================================================================
// Settlement
// =============================================================================

#[tokio::test]
async fn test_successful_callback_moves_order_to_paid_processing() {
    let inventory = Arc::new(MemoryInventory::new());
    let orders = Arc::new(MemoryOrders::new());
    let gateway = Arc::new(MockGateway::new());
    let receipt = place_order(&inventory, &orders, &gateway).await;

    let service = OrderService::new(orders.as_ref(), gateway.as_ref());
    let order = service
        .confirm_payment(receipt.order_id, &receipt.reference)
        .await
        .expect("confirm");

    assert_eq!(order.payment_status, PaymentStatus::Paid);
    assert_eq!(order.order_status, OrderStatus::Processing);
}

#[tokio::test]
async fn test_failed_verification_marks_payment_failed_only() {
    let inventory = Arc::new(MemoryInventory::new());
    let orders = Arc::new(MemoryOrders::new());
    let gateway = Arc::new(MockGateway::new());
    let receipt = place_order(&inventory, &orders, &gateway).await;
    gateway.script_verdict(&receipt.reference, VerifiedPayment::Failed);

    let service = OrderService::new(orders.as_ref(), gateway.as_ref());
    let order = service
        .confirm_payment(receipt.order_id, &receipt.reference)
        .await
        .expect("confirm");

    // Payment failed; fulfillment never started.
    assert_eq!(order.payment_status, PaymentStatus::Failed);
    assert_eq!(order.order_status, OrderStatus::Pending);
}

// =============================================================================
// Idempotency
// =============================================================================

#[tokio::test]
async fn test_replayed_callback_changes_nothing() {
    let inventory = Arc::new(MemoryInventory::new());
    let orders = Arc::new(MemoryOrders::new());
    let gateway = Arc::new(MockGateway::new());
    let receipt = place_order(&inventory, &orders, &gateway).await;

    let service = OrderService::new(orders.as_ref(), gateway.as_ref());
    let first = service
        .confirm_payment(receipt.order_id, &receipt.reference)
        .await
        .expect("first");
    let replay = service
        .confirm_payment(receipt.order_id, &receipt.reference)
        .await
        .expect("replay");

    assert_eq!(first.payment_status, PaymentStatus::Paid);
    assert_eq!(replay.payment_status, PaymentStatus::Paid);
    assert_eq!(replay.order_status, OrderStatus::Processing);
}

#[tokio::test]
async fn test_failed_then_replayed_success_does_not_resurrect_payment() {
    let inventory = Arc::new(MemoryInventory::new());
    let orders = Arc::new(MemoryOrders::new());
    let gateway = Arc::new(MockGateway::new());
    let receipt = place_order(&inventory, &orders, &gateway).await;

    let service = OrderService::new(orders.as_ref(), gateway.as_ref());
    gateway.script_verdict(&receipt.reference, VerifiedPayment::Failed);
    service
        .confirm_payment(receipt.order_id, &receipt.reference)
        .await
        .expect("first");

    // A later callback with a success verdict finds the payment settled.
    gateway.script_verdict(&receipt.reference, VerifiedPayment::Success);
    let order = service
        .confirm_payment(receipt.order_id, &receipt.reference)
        .await
        .expect("replay");

    assert_eq!(order.payment_status, PaymentStatus::Failed);
    assert_eq!(order.order_status, OrderStatus::Pending);
}

// =============================================================================
// Reference Check
// =============================================================================

#[tokio::test]
async fn test_foreign_reference_settles_nothing() {
    let inventory = Arc::new(MemoryInventory::new());
    let orders = Arc::new(MemoryOrders::new());
    let gateway = Arc::new(MockGateway::new());
    let receipt = place_order(&inventory, &orders, &gateway).await;

    let service = OrderService::new(orders.as_ref(), gateway.as_ref());
    let err = service
        .confirm_payment(receipt.order_id, "ref-from-some-other-order")
        .await
        .expect_err("foreign reference");

    assert!(matches!(err, OrderError::NotFound));

    let order = orders
        .get(receipt.order_id)
        .await
        .expect("get")
        .expect("order");
    assert_eq!(order.payment_status, PaymentStatus::Pending);
}

#[tokio::test]
async fn test_unknown_order_is_not_found() {
    let orders = Arc::new(MemoryOrders::new());
    let gateway = Arc::new(MockGateway::new());

    let service = OrderService::new(orders.as_ref(), gateway.as_ref());
    let err = service
        .confirm_payment(okra_core::OrderId::new(404), "ref-1")
        .await
        .expect_err("missing order");

    assert!(matches!(err, OrderError::NotFound));
}
