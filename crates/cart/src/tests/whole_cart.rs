use core::num::NonZeroU32;

use rust_decimal::Decimal;
use storefront_client::testing::Operation;
use storefront_primitives::cart::CartLine;

use super::{eventually, pid, product, quantities, server_quantities, setup};
use crate::{CartError, CartNotice};

#[tokio::test]
async fn test_clear_waits_for_server() {
    let (remote, cart) = setup();
    cart.add_or_increment(&product("p1", 10, 9), 2).await.unwrap();

    remote.hold_cart();

    let clearing = tokio::spawn({
        let cart = cart.clone();
        async move { cart.clear().await }
    });

    eventually(|| remote.call_count(Operation::CartClear) == 1).await;
    assert_eq!(quantities(&cart), [("p1".to_owned(), 2)]);

    remote.release_cart();
    clearing.await.unwrap().unwrap();

    assert!(cart.is_empty());
    assert!(remote.cart().is_empty());
}

#[tokio::test]
async fn test_failed_clear_leaves_cart() {
    let (remote, cart) = setup();
    let mut notices = cart.notices();
    cart.add_or_increment(&product("p1", 10, 9), 2).await.unwrap();
    cart.remove(&pid("p1")).await.unwrap();
    cart.add_or_increment(&product("p2", 10, 9), 1).await.unwrap();

    remote.set_failing(Operation::CartClear, true);

    assert!(matches!(
        cart.clear().await,
        Err(CartError::RemoteSyncFailed {
            product_id: None,
            ..
        })
    ));
    assert_eq!(quantities(&cart), [("p2".to_owned(), 1)]);
    assert!(cart.pending_removal().is_some());
    assert!(matches!(
        notices.recv().await.unwrap(),
        CartNotice::SyncFailed {
            product_id: None,
            ..
        }
    ));
}

#[tokio::test]
async fn test_rollback_never_resurrects_into_cleared_cart() {
    let (remote, cart) = setup();
    cart.add_or_increment(&product("p1", 10, 9), 1).await.unwrap();

    remote.set_failing(Operation::CartAdd, true);
    remote.hold_cart();

    let edit = tokio::spawn({
        let cart = cart.clone();
        async move { cart.add_or_increment(&product("p2", 10, 9), 1).await }
    });
    eventually(|| remote.call_count(Operation::CartAdd) == 2).await;

    let clearing = tokio::spawn({
        let cart = cart.clone();
        async move { cart.clear().await }
    });

    remote.release_cart();

    assert!(matches!(
        edit.await.unwrap(),
        Err(CartError::RemoteSyncFailed { .. })
    ));
    clearing.await.unwrap().unwrap();

    assert!(cart.is_empty());
    assert_eq!(
        remote.calls(),
        [
            Operation::CartAdd,
            Operation::CartAdd,
            Operation::CartClear
        ]
    );
}

#[tokio::test]
async fn test_checkout_empties_cart() {
    let (remote, cart) = setup();
    cart.add_or_increment(&product("p1", 10, 9), 2).await.unwrap();

    let receipt = cart.checkout().await.unwrap();

    assert_eq!(receipt.order_id.as_deref(), Some("order-1"));
    assert!(cart.is_empty());
    assert!(remote.cart().is_empty());
}

#[tokio::test]
async fn test_failed_checkout_changes_nothing() {
    let (remote, cart) = setup();
    cart.add_or_increment(&product("p1", 10, 9), 2).await.unwrap();
    let before = cart.lines();

    remote.set_failing(Operation::CartCheckout, true);

    assert!(matches!(
        cart.checkout().await,
        Err(CartError::CheckoutFailed(_))
    ));
    assert_eq!(cart.lines(), before);
    assert_eq!(quantities(&cart), server_quantities(&remote));
}

#[tokio::test]
async fn test_load_replaces_local_lines() {
    let (remote, cart) = setup();
    cart.add_or_increment(&product("p1", 10, 9), 2).await.unwrap();
    cart.remove(&pid("p1")).await.unwrap();

    remote.set_cart([CartLine::from_product(
        &product("p9", 12, 9),
        NonZeroU32::new(3).unwrap(),
    )]);

    let changes = cart.changes();
    cart.load().await.unwrap();

    assert!(changes.has_changed().unwrap());
    assert_eq!(quantities(&cart), [("p9".to_owned(), 3)]);
    assert_eq!(cart.subtotal(), Decimal::from(36));
    assert!(cart.pending_removal().is_none());

    remote.set_failing(Operation::CartGet, true);
    assert!(matches!(
        cart.load().await,
        Err(CartError::RemoteSyncFailed { .. })
    ));
    assert_eq!(quantities(&cart), [("p9".to_owned(), 3)]);
}
