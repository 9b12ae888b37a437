use std::sync::Arc;

use common::{Money, Principal, UserId};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{CartService, CheckoutEngine, CheckoutRequest, NoopScheduler};
use store::{MemoryStore, NewProduct, ShopStore};

fn request() -> CheckoutRequest {
    CheckoutRequest {
        payment_method: "card".to_string(),
        delivery_address: "123 Main St".to_string(),
        delivery_type: "delivery".to_string(),
    }
}

async fn seed_products(store: &MemoryStore, count: usize) -> Vec<common::ProductId> {
    let mut ids = Vec::with_capacity(count);
    for i in 0..count {
        let id = store
            .insert_product(NewProduct {
                name: format!("Product {i}"),
                description: None,
                brand: None,
                category: None,
                image_url: None,
                price: Money::from_cents(1000 + i as i64),
                stock: u32::MAX,
                active: true,
            })
            .await
            .unwrap();
        ids.push(id);
    }
    ids
}

fn bench_add_to_cart(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = MemoryStore::new();
    let cart = CartService::new(store.clone());
    let principal = Principal::customer(UserId::new());
    let product_id = rt.block_on(seed_products(&store, 1))[0];

    c.bench_function("domain/add_to_cart", |b| {
        b.iter(|| {
            rt.block_on(async {
                cart.add_to_cart(principal, product_id, 1).await.unwrap();
            });
        });
    });
}

fn bench_checkout_ten_lines(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("domain/checkout_ten_lines", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = MemoryStore::new();
                let cart = CartService::new(store.clone());
                let engine = CheckoutEngine::new(store.clone(), Arc::new(NoopScheduler));
                let principal = Principal::customer(UserId::new());

                for product_id in seed_products(&store, 10).await {
                    cart.add_to_cart(principal, product_id, 2).await.unwrap();
                }
                engine.checkout(principal, request()).await.unwrap();
            });
        });
    });
}

criterion_group!(benches, bench_add_to_cart, bench_checkout_ten_lines);
criterion_main!(benches);
