use core::time::Duration;

use rust_decimal::Decimal;
use storefront_client::testing::Operation;
use storefront_primitives::product::Product;

use super::{eventually, pid, product, quantities, server_quantities, setup};
use crate::{CartError, CartNotice};

#[tokio::test]
async fn test_add_creates_then_increments_line() {
    let (remote, cart) = setup();
    let lamp = product("p1", 25, 10);

    cart.add_or_increment(&lamp, 2).await.unwrap();
    cart.add_or_increment(&lamp, 3).await.unwrap();

    let line = cart.line(&pid("p1")).unwrap();
    assert_eq!(line.quantity(), 5);
    assert_eq!(line.name, "Item p1");
    assert_eq!(line.image.as_deref(), Some("/img/p1.jpg"));
    assert_eq!(line.price, Decimal::from(25));

    assert_eq!(quantities(&cart), server_quantities(&remote));
}

#[tokio::test]
async fn test_add_beyond_stock_is_refused_without_mutation() {
    let (remote, cart) = setup();

    let err = cart
        .add_or_increment(&product("p1", 10, 3), 5)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CartError::OutOfStock {
            requested: 5,
            available: 3,
            ..
        }
    ));
    assert!(err.is_validation());
    assert!(cart.is_empty());
    assert_eq!(remote.call_count(Operation::CartAdd), 0);
}

#[tokio::test]
async fn test_stock_check_counts_quantity_already_in_cart() {
    let (_remote, cart) = setup();
    let lamp = product("p1", 10, 3);

    cart.add_or_increment(&lamp, 2).await.unwrap();

    let err = cart.add_or_increment(&lamp, 2).await.unwrap_err();

    assert!(matches!(err, CartError::OutOfStock { available: 1, .. }));
    assert_eq!(cart.line(&pid("p1")).unwrap().quantity(), 2);
}

#[tokio::test]
async fn test_unknown_stock_is_left_to_the_server() {
    let (remote, cart) = setup();
    let mug = Product::new("p9", "Mug", Decimal::from(12));
    assert_eq!(mug.stock, None);

    cart.add_or_increment(&mug, 1).await.unwrap();
    cart.add_or_increment(&mug, 4).await.unwrap();

    assert_eq!(cart.line(&pid("p9")).unwrap().quantity(), 5);
    assert_eq!(quantities(&cart), server_quantities(&remote));

    remote.set_failing(Operation::CartAdd, true);

    assert!(matches!(
        cart.add_or_increment(&mug, 1).await,
        Err(CartError::RemoteSyncFailed { .. })
    ));
    assert_eq!(cart.line(&pid("p9")).unwrap().quantity(), 5);
}

#[tokio::test]
async fn test_zero_quantity_is_rejected() {
    let (remote, cart) = setup();
    cart.add_or_increment(&product("p1", 10, 5), 2).await.unwrap();

    assert!(matches!(
        cart.add_or_increment(&product("p1", 10, 5), 0).await,
        Err(CartError::InvalidQuantity(0))
    ));
    assert!(matches!(
        cart.set_quantity(&pid("p1"), 0).await,
        Err(CartError::InvalidQuantity(0))
    ));

    assert_eq!(cart.line(&pid("p1")).unwrap().quantity(), 2);
    assert_eq!(remote.call_count(Operation::CartSetQuantity), 0);
}

#[tokio::test]
async fn test_failed_add_restores_previous_line() {
    let (remote, cart) = setup();
    let mut notices = cart.notices();
    let lamp = product("p1", 10, 9);

    cart.add_or_increment(&lamp, 2).await.unwrap();
    remote.set_failing(Operation::CartAdd, true);

    let err = cart.add_or_increment(&lamp, 3).await.unwrap_err();
    assert!(matches!(err, CartError::RemoteSyncFailed { .. }));
    assert!(!err.is_validation());
    assert_eq!(quantities(&cart), [("p1".to_owned(), 2)]);

    let err = cart
        .add_or_increment(&product("p2", 5, 9), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::RemoteSyncFailed { .. }));
    assert!(cart.line(&pid("p2")).is_none());

    assert!(matches!(
        notices.recv().await.unwrap(),
        CartNotice::SyncFailed { product_id: Some(id), .. } if id == pid("p1")
    ));
}

#[tokio::test]
async fn test_set_quantity_round_trip_and_rollback() {
    let (remote, cart) = setup();
    cart.add_or_increment(&product("p1", 10, 9), 1).await.unwrap();

    cart.set_quantity(&pid("p1"), 4).await.unwrap();
    assert_eq!(server_quantities(&remote), [("p1".to_owned(), 4)]);

    remote.set_failing(Operation::CartSetQuantity, true);

    assert!(matches!(
        cart.set_quantity(&pid("p1"), 7).await,
        Err(CartError::RemoteSyncFailed { .. })
    ));
    assert_eq!(quantities(&cart), [("p1".to_owned(), 4)]);

    assert!(matches!(
        cart.set_quantity(&pid("zz"), 1).await,
        Err(CartError::LineNotFound(_))
    ));
}

#[tokio::test]
async fn test_adjust_quantity_removes_at_zero() {
    let (remote, cart) = setup();
    cart.add_or_increment(&product("p1", 10, 9), 2).await.unwrap();

    cart.adjust_quantity(&pid("p1"), 1).await.unwrap();
    assert_eq!(quantities(&cart), [("p1".to_owned(), 3)]);

    cart.adjust_quantity(&pid("p1"), -5).await.unwrap();
    assert!(cart.is_empty());
    assert!(remote.cart().is_empty());
    assert_eq!(cart.pending_removal().unwrap().line.quantity(), 3);

    assert!(matches!(
        cart.adjust_quantity(&pid("p1"), 0).await,
        Err(CartError::InvalidQuantity(0))
    ));
}

#[tokio::test]
async fn test_edits_to_one_line_serialize() {
    let (remote, cart) = setup();
    cart.add_or_increment(&product("p1", 10, 9), 1).await.unwrap();
    cart.add_or_increment(&product("p2", 10, 9), 1).await.unwrap();

    remote.hold_cart();

    let first = tokio::spawn({
        let cart = cart.clone();
        async move { cart.set_quantity(&pid("p1"), 3).await }
    });
    let second = tokio::spawn({
        let cart = cart.clone();
        async move { cart.set_quantity(&pid("p1"), 5).await }
    });
    let other = tokio::spawn({
        let cart = cart.clone();
        async move { cart.set_quantity(&pid("p2"), 4).await }
    });

    // One call per line reaches the server; the second p1 edit waits.
    eventually(|| remote.call_count(Operation::CartSetQuantity) == 2).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(remote.call_count(Operation::CartSetQuantity), 2);
    assert_eq!(cart.line(&pid("p1")).unwrap().quantity(), 3);

    remote.release_cart();

    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();
    other.await.unwrap().unwrap();

    assert_eq!(quantities(&cart), [("p1".to_owned(), 5), ("p2".to_owned(), 4)]);
    assert_eq!(quantities(&cart), server_quantities(&remote));
}

#[tokio::test]
async fn test_rollback_completes_after_caller_gives_up() {
    let (remote, cart) = setup();
    let mut notices = cart.notices();
    cart.add_or_increment(&product("p1", 10, 9), 2).await.unwrap();

    remote.set_failing(Operation::CartSetQuantity, true);
    remote.hold_cart();

    let abandoned =
        tokio::time::timeout(Duration::from_millis(20), cart.set_quantity(&pid("p1"), 8)).await;
    assert!(abandoned.is_err());
    assert_eq!(cart.line(&pid("p1")).unwrap().quantity(), 8);

    remote.release_cart();

    eventually(|| cart.line(&pid("p1")).map(|line| line.quantity()) == Some(2)).await;
    assert!(matches!(
        notices.recv().await.unwrap(),
        CartNotice::SyncFailed { .. }
    ));
}

#[tokio::test]
async fn test_totals() {
    let (_remote, cart) = setup();

    cart.add_or_increment(&product("p1", 10, 9), 2).await.unwrap();
    cart.add_or_increment(&product("p2", 3, 9), 3).await.unwrap();

    assert_eq!(cart.subtotal(), Decimal::from(29));
    assert_eq!(cart.item_count(), 5);
}
