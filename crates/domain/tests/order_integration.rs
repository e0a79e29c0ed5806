//! Integration tests for orders built from catalog products.

use chrono::Utc;
use domain::{
    BuyerId, DomainError, Money, Order, OrderItem, OrderStatus, Product, ProductId, SupplierId,
};

fn product(supplier_id: SupplierId, price_cents: i64) -> Product {
    Product::new(
        ProductId::new(),
        supplier_id,
        "Widget",
        Money::from_cents(price_cents),
        10,
    )
}

#[test]
fn test_order_snapshots_prices_from_products() {
    let supplier = SupplierId::new();
    let lamp = product(supplier, 1999);
    let bulb = product(supplier, 250);

    let order = Order::new(
        BuyerId::new(),
        supplier,
        vec![
            OrderItem::new(lamp.id, 2, lamp.price),
            OrderItem::new(bulb.id, 4, bulb.price),
        ],
        Utc::now(),
    )
    .unwrap();

    assert_eq!(order.total_amount, Money::from_cents(4998));
    assert_eq!(order.total_amount.to_string(), "$49.98");
    assert_eq!(order.unit_count(), 6);
    assert_eq!(order.status, OrderStatus::Pending);
}

#[test]
fn test_order_json_shape() {
    let supplier = SupplierId::new();
    let lamp = product(supplier, 1000);
    let order = Order::new(
        BuyerId::new(),
        supplier,
        vec![OrderItem::new(lamp.id, 1, lamp.price)],
        Utc::now(),
    )
    .unwrap();

    let json = serde_json::to_value(&order).unwrap();
    assert_eq!(json["status"], "PENDING");
    assert_eq!(json["total_amount"]["cents"], 1000);
    assert_eq!(json["supplier_id"], supplier.to_string());
    assert_eq!(json["items"][0]["product_id"], lamp.id.to_string());

    let back: Order = serde_json::from_value(json).unwrap();
    assert_eq!(back, order);
}

#[test]
fn test_every_lifecycle_path_starts_at_pending() {
    let happy = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
    ];
    for pair in happy.windows(2) {
        assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
    }
    assert!(OrderStatus::Delivered.is_terminal());
    assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Pending));
}

#[test]
fn test_order_rejects_bad_items() {
    let supplier = SupplierId::new();
    let lamp = product(supplier, 1000);

    let err = Order::new(BuyerId::new(), supplier, Vec::new(), Utc::now()).unwrap_err();
    assert_eq!(err, DomainError::NoItems);

    let err = Order::new(
        BuyerId::new(),
        supplier,
        vec![OrderItem::new(lamp.id, 0, lamp.price)],
        Utc::now(),
    )
    .unwrap_err();
    assert!(matches!(err, DomainError::InvalidQuantity { quantity: 0, .. }));
}
