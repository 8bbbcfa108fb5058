use core::time::Duration;

use rust_decimal::Decimal;
use storefront_primitives::product::Product;


fn product(id: &str, name: &str, price: i64, stock: u32) -> Product {
    Product::new(id, name, Decimal::from(price))
        .with_category("Vintage")
        .with_stock(stock)
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
