//! Integration tests for order cancellation and admin status changes.

use okra_api::models::{NewOrder, OrderItem};
use okra_api::services::{OrderError, OrderService, OrderStore};
use okra_core::{GuestId, OrderId, OrderStatus, Owner, Price, ProductId, UserId};
use okra_integration_tests::{MemoryOrders, MockGateway, address};

fn draft(owner: Owner) -> NewOrder {
    NewOrder {
        owner,
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
    }
}

async fn seeded_order(orders: &MemoryOrders, owner: Owner) -> OrderId {
    orders.create(&draft(owner)).await.expect("create").id
}

// =============================================================================
// Cancellation
// =============================================================================

#[tokio::test]
async fn test_owner_can_cancel_while_pending() {
    let orders = MemoryOrders::new();
    let gateway = MockGateway::new();
    let owner = Owner::User(UserId::new(1));
    let id = seeded_order(&orders, owner.clone()).await;

    let service = OrderService::new(&orders, &gateway);
    let order = service.cancel(id, &owner).await.expect("cancel");

    assert_eq!(order.order_status, OrderStatus::Cancelled);
}

#[tokio::test]
async fn test_guest_can_cancel_own_order() {
    let orders = MemoryOrders::new();
    let gateway = MockGateway::new();
    let owner = Owner::Guest(GuestId::generate());
    let id = seeded_order(&orders, owner.clone()).await;

    let service = OrderService::new(&orders, &gateway);
    let order = service.cancel(id, &owner).await.expect("cancel");

    assert_eq!(order.order_status, OrderStatus::Cancelled);
}

#[tokio::test]
async fn test_non_owner_cannot_cancel() {
    let orders = MemoryOrders::new();
    let gateway = MockGateway::new();
    let id = seeded_order(&orders, Owner::User(UserId::new(1))).await;

    let service = OrderService::new(&orders, &gateway);
    let err = service
        .cancel(id, &Owner::User(UserId::new(2)))
        .await
        .expect_err("wrong owner");

    assert!(matches!(err, OrderError::Forbidden));
}

#[tokio::test]
async fn test_cancel_is_rejected_once_processing() {
    let orders = MemoryOrders::new();
    let gateway = MockGateway::new();
    let owner = Owner::User(UserId::new(1));
    let id = seeded_order(&orders, owner.clone()).await;
    orders.confirm_paid(id).await.expect("confirm");

    let service = OrderService::new(&orders, &gateway);
    let err = service.cancel(id, &owner).await.expect_err("too late");

    match err {
        OrderError::InvalidTransition { from, to } => {
            assert_eq!(from, OrderStatus::Processing);
            assert_eq!(to, OrderStatus::Cancelled);
        }
        other => panic!("expected InvalidTransition, got {other:?}"),
    }
}

// =============================================================================
// Ownership Reads
// =============================================================================

#[tokio::test]
async fn test_order_listing_is_scoped_to_owner() {
    let orders = MemoryOrders::new();
    let gateway = MockGateway::new();
    let mine = Owner::User(UserId::new(1));
    let theirs = Owner::User(UserId::new(2));
    seeded_order(&orders, mine.clone()).await;
    seeded_order(&orders, theirs.clone()).await;
    seeded_order(&orders, mine.clone()).await;

    let service = OrderService::new(&orders, &gateway);
    assert_eq!(service.list_for_owner(&mine).await.expect("list").len(), 2);
    assert_eq!(service.list_for_owner(&theirs).await.expect("list").len(), 1);
    assert_eq!(orders.list_all().await.expect("all").len(), 3);
}

#[tokio::test]
async fn test_get_for_owner_hides_foreign_orders() {
    let orders = MemoryOrders::new();
    let gateway = MockGateway::new();
    let id = seeded_order(&orders, Owner::User(UserId::new(1))).await;

    let service = OrderService::new(&orders, &gateway);
    let err = service
        .get_for_owner(id, &Owner::Guest(GuestId::generate()))
        .await
        .expect_err("foreign order");

    assert!(matches!(err, OrderError::Forbidden));
}

// =============================================================================
// Admin Status Changes
// =============================================================================

#[tokio::test]
async fn test_admin_advances_through_legal_transitions() {
    let orders = MemoryOrders::new();
    let gateway = MockGateway::new();
    let id = seeded_order(&orders, Owner::User(UserId::new(1))).await;
    orders.confirm_paid(id).await.expect("confirm");

    let service = OrderService::new(&orders, &gateway);
    let shipped = service
        .set_status(id, OrderStatus::Shipped)
        .await
        .expect("ship");
    assert_eq!(shipped.order_status, OrderStatus::Shipped);

    let delivered = service
        .set_status(id, OrderStatus::Delivered)
        .await
        .expect("deliver");
    assert_eq!(delivered.order_status, OrderStatus::Delivered);
}

#[tokio::test]
async fn test_admin_cannot_skip_states() {
    let orders = MemoryOrders::new();
    let gateway = MockGateway::new();
    let id = seeded_order(&orders, Owner::User(UserId::new(1))).await;

    let service = OrderService::new(&orders, &gateway);

    // pending -> shipped skips processing.
    let err = service
        .set_status(id, OrderStatus::Shipped)
        .await
        .expect_err("skip");
    assert!(matches!(
        err,
        OrderError::InvalidTransition {
            from: OrderStatus::Pending,
            to: OrderStatus::Shipped,
        }
    ));
}

#[tokio::test]
async fn test_delivered_is_terminal() {
    let orders = MemoryOrders::new();
    let gateway = MockGateway::new();
    let id = seeded_order(&orders, Owner::User(UserId::new(1))).await;
    orders.confirm_paid(id).await.expect("confirm");
    orders
        .advance(id, OrderStatus::Processing, OrderStatus::Shipped)
        .await
        .expect("ship");
    orders
        .advance(id, OrderStatus::Shipped, OrderStatus::Delivered)
        .await
        .expect("deliver");

    let service = OrderService::new(&orders, &gateway);
    for to in [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Cancelled,
    ] {
        let err = service.set_status(id, to).await.expect_err("terminal");
        assert!(matches!(err, OrderError::InvalidTransition { .. }));
    }
}
