use core::num::NonZeroU32;

use rust_decimal::Decimal;
use serde_json::json;

use crate::cart::CartLine;
use crate::product::Product;

#[test]
fn test_line_snapshots_product_fields() {
    let product = Product::new("p1", "Formal Suit", Decimal::new(12900, 2))
        .with_category("Formal")
        .with_images(["/a.jpeg", "/b.jpeg"]);

    let line = CartLine::from_product(&product, NonZeroU32::MIN.saturating_add(2));

    assert_eq!(line.quantity(), 3);
    assert_eq!(line.name, "Formal Suit");
    assert_eq!(line.image.as_deref(), Some("/a.jpeg"));
    assert_eq!(line.total(), Decimal::new(38700, 2));
}

#[test]
fn test_zero_quantity_lines_are_rejected() {
    let result = serde_json::from_value::<CartLine>(json!({
        "productId": "p1",
        "quantity": 0,
        "price": 10
    }));

    assert!(result.is_err());
}
