use crate::product::ProductId;
use crate::stock::StockDelta;

#[test]
fn test_parse_delta() {
    let delta = StockDelta::parse(r#"{"productId":"p1","newStock":4}"#).unwrap();
    assert_eq!(delta.product_id, ProductId::from("p1"));
    assert_eq!(delta.new_stock, 4);
}

#[test]
fn test_parse_legacy_stock_field() {
    let delta = StockDelta::parse(r#"{"productId":"p1","stock":0}"#).unwrap();
    assert_eq!(delta, StockDelta::new("p1", 0));
}

#[test]
fn test_parse_rejects_malformed_payloads() {
    assert!(StockDelta::parse("not json").is_err());
    assert!(StockDelta::parse(r#"{"productId":"p1"}"#).is_err());
    assert!(StockDelta::parse(r#"{"productId":"p1","newStock":-2}"#).is_err());
    assert!(StockDelta::parse(r#"{"newStock":2}"#).is_err());
}
