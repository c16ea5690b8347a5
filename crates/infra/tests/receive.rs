//! Goods receipt: stock, price history, status and rollback behaviour.

mod common;

use std::time::Duration;

use kopontren_core::{DomainError, PageRequest};
use kopontren_infra::services::{MovementFilter, ServiceError};
use kopontren_inventory::{MovementType, PriceSource, ReferenceType};
use kopontren_purchasing::{PurchaseOrderStatus, ReceiveOverride};

use common::{harness, harness_with_notifications};

fn purchase_movements() -> MovementFilter {
    MovementFilter {
        reference_type: Some(ReferenceType::Purchase),
        ..Default::default()
    }
}

#[tokio::test]
async fn receive_books_stock_price_history_and_status() {
    let h = harness().await;
    let semen = h.product("SMN-01", 5, 60_000, 65_000, 0).await;
    let paku = h.product("PKU-02", 0, 20_000, 25_000, 0).await;
    let supplier = h.supplier("TB Sumber Makmur").await;
    let po = h
        .purchase_order(&supplier, &[(&semen, 10, Some(62_000)), (&paku, 4, None)])
        .await;
    assert_eq!(po.status, PurchaseOrderStatus::Draft);
    assert_eq!(po.total_amount, 10 * 62_000 + 4 * 20_000);

    let received = h.services.receive_purchase_order(&h.admin, po.id, Vec::new()).await.unwrap();
    assert_eq!(received.status, PurchaseOrderStatus::Received);
    assert_eq!(received.received_by, Some(h.admin.user_id));
    assert!(received.items.iter().all(|i| i.received_quantity == i.quantity));

    let semen_now = h.services.get_product(semen.id).await.unwrap();
    assert_eq!(semen_now.stock, 15);
    assert_eq!(semen_now.buy_price, 62_000);
    assert_eq!(semen_now.sell_price, 65_000, "sell price is left alone");
    assert_eq!(h.stock_of(&paku).await, 4);

    let movements = h.services.list_movements(&purchase_movements(), PageRequest::default()).await;
    assert_eq!(movements.total, 2);
    for m in &movements.items {
        assert_eq!(m.movement_type, MovementType::In);
        assert_eq!(m.reference_id, Some(po.id.into()));
        assert_eq!(m.reference_number.as_deref(), Some(po.number.as_str()));
        assert_eq!(m.new_stock, m.previous_stock + m.quantity);
    }

    let history = h.services.price_history(semen.id, PageRequest::default()).await.unwrap();
    assert_eq!(history.total, 1);
    let row = &history.items[0];
    assert_eq!(row.source, PriceSource::PurchaseOrder);
    assert_eq!((row.old_buy_price, row.new_buy_price), (60_000, 62_000));
    assert_eq!(row.reference_id, Some(po.id.into()));

    let unchanged = h.services.price_history(paku.id, PageRequest::default()).await.unwrap();
    assert_eq!(unchanged.total, 0, "same price writes no history");
}

#[tokio::test]
async fn sent_orders_can_be_received_with_overrides() {
    let h = harness().await;
    let a = h.product("A-1", 0, 1_000, 1_500, 0).await;
    let b = h.product("B-1", 3, 2_000, 2_500, 0).await;
    let supplier = h.supplier("CV Bangun").await;
    let po = h.purchase_order(&supplier, &[(&a, 10, None), (&b, 5, Some(2_100))]).await;
    h.services.send_purchase_order(&h.admin, po.id).await.unwrap();

    let received = h
        .services
        .receive_purchase_order(
            &h.admin,
            po.id,
            vec![
                ReceiveOverride { product_id: a.id, quantity: 12 },
                ReceiveOverride { product_id: b.id, quantity: 0 },
            ],
        )
        .await
        .unwrap();

    let line_b = received.items.iter().find(|i| i.product_id == b.id).unwrap();
    assert_eq!(line_b.received_quantity, 0);
    assert_eq!(h.stock_of(&a).await, 12, "over-receipt is accepted");
    assert_eq!(h.stock_of(&b).await, 3);

    let movements = h.services.list_movements(&purchase_movements(), PageRequest::default()).await;
    assert_eq!(movements.total, 1, "zero-quantity lines produce no movement");

    let b_now = h.services.get_product(b.id).await.unwrap();
    assert_eq!(b_now.buy_price, 2_000, "zero-quantity lines keep the old buy price");
    let history = h.services.price_history(b.id, PageRequest::default()).await.unwrap();
    assert_eq!(history.total, 0);
}

#[tokio::test]
async fn closed_orders_are_rejected_without_side_effects() {
    let h = harness().await;
    let p = h.product("P-1", 1, 1_000, 1_200, 0).await;
    let supplier = h.supplier("UD Jaya").await;

    let done = h.purchase_order(&supplier, &[(&p, 2, Some(1_100))]).await;
    h.services.receive_purchase_order(&h.admin, done.id, Vec::new()).await.unwrap();
    let cancelled = h.purchase_order(&supplier, &[(&p, 7, Some(900))]).await;
    h.services
        .cancel_purchase_order(&h.admin, cancelled.id, Some("salah pesan".into()))
        .await
        .unwrap();

    let before = h.services.get_product(p.id).await.unwrap();
    for id in [done.id, cancelled.id] {
        let err = h.services.receive_purchase_order(&h.admin, id, Vec::new()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::InvalidState(_))), "{err:?}");
    }
    assert_eq!(h.services.get_product(p.id).await.unwrap(), before);
    let movements = h.services.list_movements(&purchase_movements(), PageRequest::default()).await;
    assert_eq!(movements.total, 1);
    let history = h.services.price_history(p.id, PageRequest::default()).await.unwrap();
    assert_eq!(history.total, 1);
}

#[tokio::test]
async fn invalid_overrides_are_validation_errors() {
    let h = harness().await;
    let p = h.product("P-1", 0, 1_000, 1_200, 0).await;
    let stranger = h.product("P-2", 0, 1_000, 1_200, 0).await;
    let supplier = h.supplier("UD Jaya").await;
    let po = h.purchase_order(&supplier, &[(&p, 2, None)]).await;

    for overrides in [
        vec![ReceiveOverride { product_id: stranger.id, quantity: 1 }],
        vec![ReceiveOverride { product_id: p.id, quantity: -1 }],
    ] {
        let err = h.services.receive_purchase_order(&h.admin, po.id, overrides).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))), "{err:?}");
    }
    let po = h.services.get_purchase_order(po.id).await.unwrap();
    assert_eq!(po.status, PurchaseOrderStatus::Draft);
}

#[tokio::test]
async fn journal_failure_rolls_back_everything() {
    let h = harness().await;
    let p = h.product("P-1", 5, 1_000, 1_200, 0).await;
    let supplier = h.supplier("UD Jaya").await;
    let po = h.purchase_order(&supplier, &[(&p, 3, Some(1_500))]).await;
    let before = h.services.get_product(p.id).await.unwrap();

    h.journal.fail(true);
    let err = h.services.receive_purchase_order(&h.admin, po.id, Vec::new()).await.unwrap_err();
    assert!(matches!(err, ServiceError::Store(_)), "{err:?}");

    assert_eq!(h.services.get_product(p.id).await.unwrap(), before);
    assert_eq!(
        h.services.get_purchase_order(po.id).await.unwrap().status,
        PurchaseOrderStatus::Draft
    );
    assert_eq!(h.services.list_movements(&purchase_movements(), PageRequest::default()).await.total, 0);
    assert_eq!(h.services.price_history(p.id, PageRequest::default()).await.unwrap().total, 0);

    h.journal.fail(false);
    h.services.receive_purchase_order(&h.admin, po.id, Vec::new()).await.unwrap();
    assert_eq!(h.stock_of(&p).await, 8);
}

#[tokio::test]
async fn concurrent_receives_book_stock_once() {
    let h = harness().await;
    let p = h.product("P-1", 0, 1_000, 1_200, 0).await;
    let supplier = h.supplier("UD Jaya").await;
    let po = h.purchase_order(&supplier, &[(&p, 6, None)]).await;

    let (first, second) = tokio::join!(
        h.services.receive_purchase_order(&h.admin, po.id, Vec::new()),
        h.services.receive_purchase_order(&h.admin, po.id, Vec::new()),
    );
    assert_eq!([first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count(), 1);
    assert_eq!(h.stock_of(&p).await, 6);
}

#[tokio::test]
async fn admins_are_notified_after_receive() {
    let h = harness_with_notifications().await;
    let mut realtime = h.services.subscribe();
    let p = h.product("P-1", 0, 1_000, 1_200, 0).await;
    let supplier = h.supplier("UD Jaya").await;
    let po = h.purchase_order(&supplier, &[(&p, 1, None)]).await;

    h.services.receive_purchase_order(&h.admin, po.id, Vec::new()).await.unwrap();

    let message = tokio::time::timeout(Duration::from_secs(2), realtime.recv())
        .await
        .expect("notification in time")
        .unwrap();
    assert_eq!(message.user_id, h.admin.user_id);
    assert_eq!(message.topic, "notification.created");

    let mine = h
        .services
        .list_notifications(&h.admin, Default::default(), PageRequest::default())
        .await;
    assert_eq!(mine.total, 1);
    assert_eq!(mine.items[0].title, "Purchase order received");
    assert_eq!(mine.items[0].reference_id, Some(po.id.into()));
}
