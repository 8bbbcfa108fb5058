use core::time::Duration;
use std::sync::Arc;

use rust_decimal::Decimal;
use storefront_client::testing::MockRemoteStore;
use storefront_primitives::product::{Product, ProductId};

use crate::config::CartConfig;
use crate::CartReconciler;

mod lines;
mod whole_cart;

fn product(id: &str, price: i64, stock: u32) -> Product {
    Product::new(id, format!("Item {id}"), Decimal::from(price))
        .with_category("Vintage")
        .with_stock(stock)
        .with_images([format!("/img/{id}.jpg")])
}

fn pid(id: &str) -> ProductId {
    ProductId::from(id)
}

fn setup() -> (MockRemoteStore, CartReconciler<MockRemoteStore>) {
    let remote = MockRemoteStore::new();
    let cart = CartReconciler::new(Arc::new(remote.clone()), CartConfig::default());

    (remote, cart)
}

/// `(product id, quantity)` pairs of the local cart.
fn quantities(cart: &CartReconciler<MockRemoteStore>) -> Vec<(String, u32)> {
    cart.lines()
        .into_iter()
        .map(|line| (line.product_id.to_string(), line.quantity()))
        .collect()
}

fn server_quantities(remote: &MockRemoteStore) -> Vec<(String, u32)> {
    remote
        .cart()
        .into_iter()
        .map(|line| (line.product_id.to_string(), line.quantity()))
        .collect()
}

/// Polls `check` until it holds, failing the test after about two seconds.
async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..400 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    panic!("condition not reached in time");
}
