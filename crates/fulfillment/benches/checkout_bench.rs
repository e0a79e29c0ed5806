use std::sync::Arc;

use common::{BuyerId, ProductId, SupplierId};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{Money, OrderRequestItem, Product};
use fulfillment::{
    CheckoutService, FulfillmentCoordinator, InMemoryNotificationSink, NotificationDispatcher,
    OrderQueryService, OrderSplitter, StoreCatalog,
};
use order_store::InMemoryOrderStore;

fn catalog(suppliers: usize, per_supplier: usize) -> Vec<Product> {
    (0..suppliers)
        .flat_map(|_| {
            let supplier_id = SupplierId::new();
            (0..per_supplier).map(move |i| {
                Product::new(
                    ProductId::new(),
                    supplier_id,
                    format!("Bench Item {i}"),
                    Money::from_cents(1000),
                    u32::MAX,
                )
            })
        })
        .collect()
}

fn bench_split(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let products = catalog(5, 4);
    let splitter = rt.block_on(async {
        let store = InMemoryOrderStore::with_products(products.iter().cloned()).await;
        OrderSplitter::new(StoreCatalog::new(store))
    });
    let request: Vec<_> = products
        .iter()
        .map(|p| OrderRequestItem::new(p.id, 1))
        .collect();
    let buyer = BuyerId::new();

    c.bench_function("fulfillment/split_20_lines_5_suppliers", |b| {
        b.iter(|| {
            rt.block_on(async {
                splitter.split(buyer, &request).await.unwrap();
            });
        });
    });
}

fn bench_checkout(c: &mut Criterion, name: &str, suppliers: usize, per_supplier: usize) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let products = catalog(suppliers, per_supplier);
    let service = rt.block_on(async {
        let store = InMemoryOrderStore::with_products(products.iter().cloned()).await;
        let (dispatcher, _worker) =
            NotificationDispatcher::spawn(Arc::new(InMemoryNotificationSink::new()));
        CheckoutService::new(
            OrderSplitter::new(StoreCatalog::new(store.clone())),
            FulfillmentCoordinator::new(store),
            dispatcher,
        )
    });
    let request: Vec<_> = products
        .iter()
        .map(|p| OrderRequestItem::new(p.id, 1))
        .collect();

    c.bench_function(name, |b| {
        b.iter(|| {
            rt.block_on(async {
                service.checkout(BuyerId::new(), &request).await.unwrap();
            });
        });
    });
}

fn bench_single_supplier(c: &mut Criterion) {
    bench_checkout(c, "fulfillment/checkout_1_supplier", 1, 3);
}

fn bench_many_suppliers(c: &mut Criterion) {
    bench_checkout(c, "fulfillment/checkout_5_suppliers", 5, 3);
}

fn bench_list_for_buyer(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let products = catalog(3, 2);
    let buyer = BuyerId::new();
    let (service, queries) = rt.block_on(async {
        let store = InMemoryOrderStore::with_products(products.iter().cloned()).await;
        let (dispatcher, _worker) =
            NotificationDispatcher::spawn(Arc::new(InMemoryNotificationSink::new()));
        let service = CheckoutService::new(
            OrderSplitter::new(StoreCatalog::new(store.clone())),
            FulfillmentCoordinator::new(store.clone()),
            dispatcher,
        );
        (service, OrderQueryService::new(store))
    });
    let request: Vec<_> = products
        .iter()
        .map(|p| OrderRequestItem::new(p.id, 1))
        .collect();
    rt.block_on(async {
        for _ in 0..50 {
            service.checkout(buyer, &request).await.unwrap();
        }
    });

    c.bench_function("fulfillment/list_for_buyer_150_orders", |b| {
        b.iter(|| {
            rt.block_on(async {
                queries.list_for_buyer(buyer).await.unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_split,
    bench_single_supplier,
    bench_many_suppliers,
    bench_list_for_buyer
);
criterion_main!(benches);
