//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p order-store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::{BuyerId, ProductId, SupplierId};
use domain::{DomainError, Money, Order, OrderItem, OrderStatus, Product};
use order_store::{
    OrderStore, PostgresOrderStore, StoreError, StoreTransaction, TransactionState,
};
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_orders_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresOrderStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE order_items, orders, products")
        .execute(&pool)
        .await
        .unwrap();

    PostgresOrderStore::new(pool)
}

async fn seed_product(store: &PostgresOrderStore, price_cents: i64, stock: u32) -> Product {
    let product = Product::new(
        ProductId::new(),
        SupplierId::new(),
        "Widget",
        Money::from_cents(price_cents),
        stock,
    );
    store.upsert_product(&product).await.unwrap();
    product
}

fn order_for(product: &Product, quantity: u32) -> Order {
    Order::new(
        BuyerId::new(),
        product.supplier_id,
        vec![OrderItem::new(product.id, quantity, product.price)],
        Utc::now(),
    )
    .unwrap()
}

#[tokio::test]
async fn upsert_and_read_product() {
    let store = get_test_store().await;
    let product = seed_product(&store, 1000, 5).await;

    let loaded = store.get_product(product.id).await.unwrap();
    assert_eq!(loaded, Some(product.clone()));

    let missing = store.get_product(ProductId::new()).await.unwrap();
    assert!(missing.is_none());

    let batch = store
        .get_products(&[product.id, ProductId::new()])
        .await
        .unwrap();
    assert_eq!(batch, vec![product]);
}

#[tokio::test]
async fn committed_transaction_persists_order_and_stock() {
    let store = get_test_store().await;
    let product = seed_product(&store, 1000, 5).await;
    let order = order_for(&product, 2);

    let mut tx = store.begin().await.unwrap();
    let locked = tx.lock_product(product.id).await.unwrap().unwrap();
    tx.set_stock(product.id, locked.stock - 2).await.unwrap();
    tx.insert_order(&order).await.unwrap();
    tx.commit().await.unwrap();
    assert_eq!(tx.state(), TransactionState::Committed);

    let stored = store.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(stored.items, order.items);
    assert_eq!(stored.total_amount, Money::from_cents(2000));
    assert_eq!(stored.status, OrderStatus::Pending);
    assert_eq!(
        store.get_product(product.id).await.unwrap().unwrap().stock,
        3
    );
}

#[tokio::test]
async fn rolled_back_transaction_leaves_nothing_behind() {
    let store = get_test_store().await;
    let product = seed_product(&store, 1000, 5).await;
    let order = order_for(&product, 5);

    let mut tx = store.begin().await.unwrap();
    tx.lock_product(product.id).await.unwrap();
    tx.set_stock(product.id, 0).await.unwrap();
    tx.insert_order(&order).await.unwrap();
    tx.rollback().await.unwrap();
    assert_eq!(tx.state(), TransactionState::Aborted);

    assert!(store.get_order(order.id).await.unwrap().is_none());
    assert_eq!(
        store.get_product(product.id).await.unwrap().unwrap().stock,
        5
    );
}

#[tokio::test]
async fn dropped_transaction_rolls_back() {
    let store = get_test_store().await;
    let product = seed_product(&store, 1000, 5).await;

    {
        let mut tx = store.begin().await.unwrap();
        tx.set_stock(product.id, 0).await.unwrap();
    }

    assert_eq!(
        store.get_product(product.id).await.unwrap().unwrap().stock,
        5
    );
}

#[tokio::test]
async fn row_lock_serializes_concurrent_decrements() {
    let store = get_test_store().await;
    let product = seed_product(&store, 1000, 3).await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        let product_id = product.id;
        handles.push(tokio::spawn(async move {
            let mut tx = store.begin().await.unwrap();
            let locked = tx.lock_product(product_id).await.unwrap().unwrap();
            if locked.stock == 0 {
                tx.rollback().await.unwrap();
                return false;
            }
            tx.set_stock(product_id, locked.stock - 1).await.unwrap();
            tx.commit().await.unwrap();
            true
        }));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap() {
            successes += 1;
        }
    }

    assert_eq!(successes, 3);
    assert_eq!(
        store.get_product(product.id).await.unwrap().unwrap().stock,
        0
    );
}

#[tokio::test]
async fn lock_timeout_surfaces_as_conflict() {
    let store = get_test_store()
        .await
        .with_lock_timeout(Duration::from_millis(100));
    let product = seed_product(&store, 1000, 3).await;

    let mut holder = store.begin().await.unwrap();
    holder.lock_product(product.id).await.unwrap();

    let mut waiter = store.begin().await.unwrap();
    let err = waiter.lock_product(product.id).await.unwrap_err();
    assert!(err.is_conflict(), "expected conflict, got {err:?}");

    holder.rollback().await.unwrap();
}

#[tokio::test]
async fn negative_stock_is_rejected_by_the_schema() {
    let store = get_test_store().await;
    let product = seed_product(&store, 1000, 1).await;

    let result = sqlx::query("UPDATE products SET stock = -1 WHERE id = $1")
        .bind(product.id.as_uuid())
        .execute(store.pool())
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn quantity_above_i32_range_round_trips() {
    let store = get_test_store().await;
    let product = seed_product(&store, 1, 3_000_000_000).await;
    let order = order_for(&product, 2_200_000_000);

    let mut tx = store.begin().await.unwrap();
    let locked = tx.lock_product(product.id).await.unwrap().unwrap();
    tx.set_stock(product.id, locked.stock - 2_200_000_000)
        .await
        .unwrap();
    tx.insert_order(&order).await.unwrap();
    tx.commit().await.unwrap();

    let stored = store.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(stored.items[0].quantity, 2_200_000_000);
    assert_eq!(stored.total_amount, Money::from_cents(2_200_000_000));
    assert_eq!(
        store.get_product(product.id).await.unwrap().unwrap().stock,
        800_000_000
    );
}

#[tokio::test]
async fn out_of_range_stored_quantity_is_reported_as_corrupt() {
    let store = get_test_store().await;
    let product = seed_product(&store, 1, 5).await;
    let order = order_for(&product, 1);

    let mut tx = store.begin().await.unwrap();
    tx.insert_order(&order).await.unwrap();
    tx.commit().await.unwrap();

    sqlx::query("UPDATE order_items SET quantity = $2 WHERE order_id = $1")
        .bind(order.id.as_uuid())
        .bind(i64::from(u32::MAX) + 1)
        .execute(store.pool())
        .await
        .unwrap();

    let err = store.get_order(order.id).await.unwrap_err();
    assert!(
        matches!(
            err,
            StoreError::Corrupt(DomainError::InvalidStoredQuantity { product_id, .. })
                if product_id == product.id
        ),
        "expected corrupt record, got {err:?}"
    );
}

#[tokio::test]
async fn price_change_does_not_touch_existing_orders() {
    let store = get_test_store().await;
    let mut product = seed_product(&store, 1000, 5).await;
    let order = order_for(&product, 1);

    let mut tx = store.begin().await.unwrap();
    tx.insert_order(&order).await.unwrap();
    tx.commit().await.unwrap();

    product.price = Money::from_cents(9999);
    store.upsert_product(&product).await.unwrap();

    let stored = store.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(stored.items[0].unit_price, Money::from_cents(1000));
    assert_eq!(stored.total_amount, Money::from_cents(1000));
}

#[tokio::test]
async fn listings_are_scoped_and_newest_first() {
    let store = get_test_store().await;
    let product = seed_product(&store, 500, 10).await;
    let buyer = BuyerId::new();

    let mut older = order_for(&product, 1);
    older.buyer_id = buyer;
    older.created_at = Utc::now() - chrono::Duration::minutes(1);
    let mut newer = order_for(&product, 2);
    newer.buyer_id = buyer;
    let unrelated = order_for(&product, 3);

    let mut tx = store.begin().await.unwrap();
    for order in [&older, &newer, &unrelated] {
        tx.insert_order(order).await.unwrap();
    }
    tx.commit().await.unwrap();

    let mine = store.orders_for_buyer(buyer).await.unwrap();
    assert_eq!(
        mine.iter().map(|o| o.id).collect::<Vec<_>>(),
        vec![newer.id, older.id]
    );
    assert_eq!(mine[0].items.len(), 1);

    let supplier_orders = store.orders_for_supplier(product.supplier_id).await.unwrap();
    assert_eq!(supplier_orders.len(), 3);
}
