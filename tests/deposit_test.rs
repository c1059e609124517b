mod common;

use assert_matches::assert_matches;
use chrono::{Days, Utc};
use common::TestApp;
use fulfillment_api::errors::ServiceError;
use fulfillment_api::models::status::{CollectionSource, DepositChannel};
use fulfillment_api::services::collections::CollectionApprovalRequest;
use fulfillment_api::services::deliveries::{DeliveryApprovalRequest, MemoOutcome};
use fulfillment_api::services::deposits::{CreateDepositRequest, ReceiveRemainingRequest};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Delivers 40 plain units (90.00) on a loading driven by the seeded driver.
async fn delivered_cash(app: &TestApp) -> i32 {
    let seed = app.seed;
    app.receive(seed.plain_product, seed.main_depot, "2001", 100, None)
        .await;
    let order = app
        .validated_order(seed.north_route, &[(seed.plain_product, 40)])
        .await;
    let loading = app.load(&[order.id]).await;
    app.services()
        .deliveries
        .approve_delivery(DeliveryApprovalRequest {
            loading_number: loading.loading_number,
            source: CollectionSource::Web,
            memos: vec![MemoOutcome {
                memo_number: order.memo_number.clone().unwrap(),
                delivered: 30,
                returned: 10,
            }],
        })
        .await
        .unwrap();
    order.id
}

fn deposit(collector_id: i32, amount: Decimal) -> CreateDepositRequest {
    CreateDepositRequest {
        collector_id,
        deposit_date: Utc::now().date_naive(),
        deposited_amount: amount,
        channel: DepositChannel::Cash,
    }
}

#[tokio::test]
async fn deposit_reconciles_the_days_collections() {
    let app = TestApp::new().await;
    let seed = app.seed;
    let order_id = delivered_cash(&app).await;

    // Collected 67.50 at delivery, the remaining 22.50 after approval
    app.services()
        .collections
        .approve_collections(CollectionApprovalRequest {
            order_ids: vec![order_id],
            approved_by: seed.office,
        })
        .await
        .unwrap();
    app.services()
        .collections
        .collect_pending(order_id, dec!(22.50))
        .await
        .unwrap();

    let deposits = &app.services().deposits;
    assert_matches!(
        deposits.create_deposit(deposit(seed.driver, dec!(90.01))).await,
        Err(ServiceError::ValidationError(msg)) if msg.contains("exceeds")
    );

    let created = deposits
        .create_deposit(deposit(seed.driver, dec!(60)))
        .await
        .unwrap();
    assert_eq!(created.total_collected, dec!(90));
    assert_eq!(created.remaining_amount, dec!(30));
    assert_eq!(created.transaction_ids.len(), 2);
    assert!(!created.approved);

    // Every open transaction of the day is now reconciled
    assert_matches!(
        deposits.create_deposit(deposit(seed.driver, dec!(1))).await,
        Err(ServiceError::ValidationError(_))
    );
}

#[tokio::test]
async fn collectors_without_collections_cannot_deposit() {
    let app = TestApp::new().await;
    let seed = app.seed;
    delivered_cash(&app).await;
    let deposits = &app.services().deposits;

    assert_matches!(
        deposits.create_deposit(deposit(seed.salesperson, dec!(10))).await,
        Err(ServiceError::ValidationError(_))
    );

    let mut tomorrow = deposit(seed.driver, dec!(10));
    tomorrow.deposit_date = Utc::now().date_naive() + Days::new(1);
    assert_matches!(
        deposits.create_deposit(tomorrow).await,
        Err(ServiceError::ValidationError(_))
    );
    assert_matches!(
        deposits.create_deposit(deposit(seed.driver, dec!(-1))).await,
        Err(ServiceError::ValidationError(_))
    );
    assert_matches!(
        deposits.create_deposit(deposit(9_999, dec!(1))).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn approval_is_one_shot_and_remaining_cash_never_overpays() {
    let app = TestApp::new().await;
    let seed = app.seed;
    delivered_cash(&app).await;
    let deposits = &app.services().deposits;

    let created = deposits
        .create_deposit(deposit(seed.driver, dec!(40)))
        .await
        .unwrap();
    assert_eq!(created.total_collected, dec!(67.50));
    assert_eq!(created.remaining_amount, dec!(27.50));

    let approved = deposits.approve_deposit(created.id, seed.office).await.unwrap();
    assert!(approved.approved);
    assert_eq!(approved.approved_by, Some(seed.office));
    assert_matches!(
        deposits.approve_deposit(created.id, seed.office).await,
        Err(ServiceError::InvalidState { .. })
    );

    let receive = |amount: Decimal| ReceiveRemainingRequest {
        amount,
        note: Some("handed in at the counter".into()),
    };
    assert_matches!(
        deposits.receive_remaining(created.id, receive(dec!(30))).await,
        Err(ServiceError::ValidationError(_))
    );
    let partial = deposits
        .receive_remaining(created.id, receive(dec!(20)))
        .await
        .unwrap();
    assert_eq!(partial.remaining_amount, dec!(7.50));
    let settled = deposits
        .receive_remaining(created.id, receive(dec!(7.50)))
        .await
        .unwrap();
    assert_eq!(settled.remaining_amount, dec!(0));
    assert_eq!(settled.receipts.len(), 2);
    assert_eq!(settled.receipts[1].remaining_after, dec!(0));
    assert_matches!(
        deposits.receive_remaining(created.id, receive(dec!(0.01))).await,
        Err(ServiceError::ValidationError(_))
    );

    let fetched = deposits.get_deposit(created.id).await.unwrap();
    assert_eq!(fetched.deposited_amount, dec!(40));
    assert_eq!(fetched.transaction_ids, created.transaction_ids);
    assert_matches!(deposits.get_deposit(777).await, Err(ServiceError::NotFound(_)));
}
