mod common;

use assert_matches::assert_matches;
use common::{date, TestApp};
use fulfillment_api::errors::ServiceError;
use fulfillment_api::models::status::{BatchStatus, CollectionSource, CollectionStatus, Stage};
use fulfillment_api::services::collections::CollectionApprovalRequest;
use fulfillment_api::services::deliveries::{
    CreateDeliveryRequest, DeliveryApprovalRequest, MemoOutcome,
};
use rust_decimal_macros::dec;

/// Two orders on one loading: a picked 60-unit promo order and an unpicked plain one.
struct Loading {
    app: TestApp,
    promo_order: i32,
    promo_memo: String,
    plain_order: i32,
    plain_memo: String,
    loading_number: String,
    early_batch: i32,
    late_batch: i32,
}

async fn loaded_orders() -> Loading {
    let app = TestApp::new().await;
    let seed = app.seed;
    let early = app
        .receive(seed.promo_product, seed.main_depot, "1001", 30, Some(date(2030, 6, 30)))
        .await;
    let late = app
        .receive(seed.promo_product, seed.main_depot, "1002", 100, Some(date(2030, 9, 30)))
        .await;
    app.receive(seed.plain_product, seed.main_depot, "2001", 100, None)
        .await;

    let promo = app
        .validated_order(seed.north_route, &[(seed.promo_product, 60)])
        .await;
    let plain = app
        .validated_order(seed.north_route, &[(seed.plain_product, 40)])
        .await;
    app.services()
        .deliveries
        .create_delivery(CreateDeliveryRequest {
            order_id: promo.id,
            vehicle_id: Some(seed.vehicle),
        })
        .await
        .expect("pick promo order");
    let assignment = app.load(&[promo.id, plain.id]).await;

    Loading {
        promo_order: promo.id,
        promo_memo: promo.memo_number.expect("promo memo"),
        plain_order: plain.id,
        plain_memo: plain.memo_number.expect("plain memo"),
        loading_number: assignment.loading_number,
        early_batch: early.id,
        late_batch: late.id,
        app,
    }
}

fn memo(memo_number: &str, delivered: i32, returned: i32) -> MemoOutcome {
    MemoOutcome {
        memo_number: memo_number.to_string(),
        delivered,
        returned,
    }
}

#[tokio::test]
async fn approval_prorates_cash_and_settles_picked_stock() {
    let loading = loaded_orders().await;
    let app = &loading.app;
    let seed = app.seed;

    let outcome = app
        .services()
        .deliveries
        .approve_delivery(DeliveryApprovalRequest {
            loading_number: loading.loading_number.clone(),
            source: CollectionSource::Web,
            memos: vec![
                memo(&loading.promo_memo, 45, 15),
                memo(&loading.plain_memo, 40, 0),
            ],
        })
        .await
        .unwrap();
    assert_eq!(outcome.orders.len(), 2);

    let promo = outcome
        .orders
        .iter()
        .find(|o| o.order_id == loading.promo_order)
        .unwrap();
    // 60 x 12.50 + 10% VAT = 825.00, three quarters delivered
    assert_eq!(promo.collection_status, CollectionStatus::PartiallyCollected);
    assert_eq!(promo.collected_amount, dec!(618.75));
    assert_eq!(promo.pending_amount, dec!(206.25));
    assert!(promo.stock_settled);

    let plain = outcome
        .orders
        .iter()
        .find(|o| o.order_id == loading.plain_order)
        .unwrap();
    assert_eq!(plain.collection_status, CollectionStatus::Pending);
    assert_eq!(plain.collected_amount, dec!(90.00));
    assert_eq!(plain.pending_amount, dec!(0));
    assert!(!plain.stock_settled);

    // Delivered units fill picks in FEFO order, the rest go back to available
    let early = app.batch(loading.early_batch).await;
    assert_eq!((early.quantity, early.available_quantity, early.reserved_quantity), (0, 0, 0));
    assert_eq!(early.status, BatchStatus::Depleted.to_string());
    let late = app.batch(loading.late_batch).await;
    assert_eq!((late.quantity, late.available_quantity, late.reserved_quantity), (85, 85, 0));

    let stock = app
        .services()
        .inventory
        .stock(seed.promo_product, seed.main_depot)
        .await
        .unwrap();
    assert_eq!(stock.stock_qty, 85);
    assert_eq!(stock.total_issued, 45);

    let order = app.services().orders.get_order(loading.promo_order).await.unwrap();
    assert_eq!(order.state.stage(), Stage::Delivered);
    assert!(!order.postponed);
    assert_eq!(
        order.collected_amount.unwrap() + order.pending_amount.unwrap(),
        order.total_amount
    );

    let queue = app.services().collections.remaining_cash_queue().await.unwrap();
    assert_eq!(queue.len(), 2);
    assert!(app.services().collections.mobile_queue().await.unwrap().is_empty());
}

#[tokio::test]
async fn approval_needs_outcomes_for_exactly_the_loading() {
    let loading = loaded_orders().await;
    let deliveries = &loading.app.services().deliveries;

    let missing = deliveries
        .approve_delivery(DeliveryApprovalRequest {
            loading_number: loading.loading_number.clone(),
            source: CollectionSource::Web,
            memos: vec![memo(&loading.promo_memo, 60, 0)],
        })
        .await;
    assert_matches!(missing, Err(ServiceError::ValidationError(msg)) if msg.contains("missing"));

    let foreign = deliveries
        .approve_delivery(DeliveryApprovalRequest {
            loading_number: loading.loading_number.clone(),
            source: CollectionSource::Web,
            memos: vec![
                memo(&loading.promo_memo, 60, 0),
                memo(&loading.plain_memo, 40, 0),
                memo("99999999", 1, 0),
            ],
        })
        .await;
    assert_matches!(foreign, Err(ServiceError::ValidationError(_)));

    // Picked units must be fully accounted for
    let unbalanced = deliveries
        .approve_delivery(DeliveryApprovalRequest {
            loading_number: loading.loading_number.clone(),
            source: CollectionSource::Web,
            memos: vec![
                memo(&loading.promo_memo, 50, 5),
                memo(&loading.plain_memo, 40, 0),
            ],
        })
        .await;
    assert_matches!(unbalanced, Err(ServiceError::ValidationError(msg)) if msg.contains("picked"));

    let unknown = deliveries
        .approve_delivery(DeliveryApprovalRequest {
            loading_number: "19990101-0001".into(),
            source: CollectionSource::Web,
            memos: vec![memo(&loading.plain_memo, 40, 0)],
        })
        .await;
    assert_matches!(unknown, Err(ServiceError::NotFound(_)));

    let order = loading
        .app
        .services()
        .orders
        .get_order(loading.plain_order)
        .await
        .unwrap();
    assert_eq!(order.state.stage(), Stage::Assigned);
}

#[tokio::test]
async fn collection_approval_and_later_cash() {
    let loading = loaded_orders().await;
    let app = &loading.app;
    let seed = app.seed;
    app.services()
        .deliveries
        .approve_delivery(DeliveryApprovalRequest {
            loading_number: loading.loading_number.clone(),
            source: CollectionSource::Web,
            memos: vec![
                memo(&loading.promo_memo, 45, 15),
                memo(&loading.plain_memo, 40, 0),
            ],
        })
        .await
        .unwrap();

    let collections = &app.services().collections;
    let approved = collections
        .approve_collections(CollectionApprovalRequest {
            order_ids: vec![loading.promo_order, loading.plain_order],
            approved_by: seed.office,
        })
        .await
        .unwrap();
    let status_of = |id: i32| {
        approved
            .iter()
            .find(|e| e.order_id == id)
            .map(|e| (e.collection_status, e.collection_approved))
    };
    assert_eq!(
        status_of(loading.promo_order),
        Some((CollectionStatus::PartiallyCollected, true))
    );
    assert_eq!(
        status_of(loading.plain_order),
        Some((CollectionStatus::FullyCollected, true))
    );
    assert!(collections.remaining_cash_queue().await.unwrap().is_empty());

    assert_matches!(
        collections
            .approve_collections(CollectionApprovalRequest {
                order_ids: vec![loading.plain_order],
                approved_by: seed.office,
            })
            .await,
        Err(ServiceError::InvalidState { .. })
    );

    assert_matches!(
        collections.collect_pending(loading.promo_order, dec!(300)).await,
        Err(ServiceError::ValidationError(_))
    );
    assert_matches!(
        collections.collect_pending(loading.promo_order, dec!(0)).await,
        Err(ServiceError::ValidationError(_))
    );
    let part = collections
        .collect_pending(loading.promo_order, dec!(6.25))
        .await
        .unwrap();
    assert_eq!(part.pending_amount, dec!(200));
    assert_eq!(part.collection_status, CollectionStatus::PartiallyCollected);

    let rest = collections
        .collect_pending(loading.promo_order, dec!(200))
        .await
        .unwrap();
    assert_eq!(rest.collection_status, CollectionStatus::FullyCollected);
    assert_eq!(rest.collected_amount, dec!(825));
    assert_matches!(
        collections.collect_pending(loading.plain_order, dec!(1)).await,
        Err(ServiceError::ValidationError(_))
    );
}

#[tokio::test]
async fn mobile_postponement_releases_every_pick() {
    let app = TestApp::new().await;
    let seed = app.seed;
    let batch = app
        .receive(seed.plain_product, seed.main_depot, "2001", 30, None)
        .await;
    let order = app
        .validated_order(seed.south_route, &[(seed.plain_product, 10)])
        .await;
    app.services()
        .deliveries
        .create_delivery(CreateDeliveryRequest {
            order_id: order.id,
            vehicle_id: None,
        })
        .await
        .unwrap();
    let loading = app.load(&[order.id]).await;

    let outcome = app
        .services()
        .deliveries
        .approve_delivery(DeliveryApprovalRequest {
            loading_number: loading.loading_number,
            source: CollectionSource::MobileApp,
            memos: vec![memo(order.memo_number.as_deref().unwrap(), 0, 10)],
        })
        .await
        .unwrap();
    assert_eq!(outcome.orders[0].collection_status, CollectionStatus::Postponed);
    assert_eq!(outcome.orders[0].collected_amount, dec!(0));
    assert_eq!(outcome.orders[0].pending_amount, dec!(22.50));

    let batch = app.batch(batch.id).await;
    assert_eq!((batch.quantity, batch.available_quantity, batch.reserved_quantity), (30, 30, 0));

    let order = app.services().orders.get_order(order.id).await.unwrap();
    assert!(order.postponed);
    assert!(order.mobile_accepted);

    let collections = &app.services().collections;
    let queue = collections.mobile_queue().await.unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].order_id, order.id);
    assert!(collections.remaining_cash_queue().await.unwrap().is_empty());

    let approved = collections
        .approve_collections(CollectionApprovalRequest {
            order_ids: vec![order.id],
            approved_by: seed.office,
        })
        .await
        .unwrap();
    assert_eq!(approved[0].collection_status, CollectionStatus::Postponed);
}
