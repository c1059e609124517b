mod common;

use assert_matches::assert_matches;
use chrono::Utc;
use common::{date, TestApp};
use fulfillment_api::errors::ServiceError;
use fulfillment_api::models::status::TransferStatus;
use fulfillment_api::services::transfers::{CreateTransferRequest, TransferItemRequest};

fn transfer(from: i32, to: i32, items: &[(i32, i32)]) -> CreateTransferRequest {
    CreateTransferRequest {
        source_depot_id: from,
        destination_depot_id: to,
        items: items
            .iter()
            .map(|(batch_id, quantity)| TransferItemRequest {
                batch_id: *batch_id,
                quantity: *quantity,
            })
            .collect(),
        remarks: Some("branch replenishment".into()),
    }
}

#[tokio::test]
async fn transfer_moves_stock_between_depots() {
    let app = TestApp::new().await;
    let seed = app.seed;
    let source = app
        .receive(seed.plain_product, seed.main_depot, "5001", 50, Some(date(2031, 5, 31)))
        .await;
    let transfers = &app.services().transfers;

    let created = transfers
        .create_transfer(transfer(seed.main_depot, seed.branch_depot, &[(source.id, 20)]))
        .await
        .unwrap();
    assert_eq!(created.status, TransferStatus::Pending);
    let prefix = format!("TRF-{}-", Utc::now().date_naive().format("%Y%m%d"));
    assert_eq!(created.transfer_number, format!("{}0001", prefix));
    let held = app.batch(source.id).await;
    assert_eq!((held.available_quantity, held.reserved_quantity), (30, 20));

    assert_matches!(
        transfers.receive_transfer(created.id).await,
        Err(ServiceError::InvalidState { .. })
    );

    let in_transit = transfers.approve_transfer(created.id).await.unwrap();
    assert_eq!(in_transit.status, TransferStatus::InTransit);
    let held = app.batch(source.id).await;
    assert_eq!(
        (held.quantity, held.available_quantity, held.reserved_quantity),
        (30, 30, 0)
    );
    let main = app
        .services()
        .inventory
        .stock(seed.plain_product, seed.main_depot)
        .await
        .unwrap();
    assert_eq!((main.stock_qty, main.total_issued), (30, 20));

    let received = transfers.receive_transfer(created.id).await.unwrap();
    assert_eq!(received.status, TransferStatus::Received);
    assert!(received.received_at.is_some());

    let branch = app
        .services()
        .inventory
        .stock(seed.plain_product, seed.branch_depot)
        .await
        .unwrap();
    assert_eq!(branch.stock_qty, 20);
    assert_eq!(branch.batches.len(), 1);
    assert_eq!(branch.batches[0].batch_number, "5001");
    assert_eq!(branch.batches[0].expiry_date, Some(date(2031, 5, 31)));

    assert_matches!(
        transfers.reject_transfer(created.id).await,
        Err(ServiceError::InvalidState { .. })
    );
    let fetched = transfers.get_transfer(created.id).await.unwrap();
    assert_eq!(fetched.items.len(), 1);
    assert_eq!(fetched.items[0].quantity, 20);
}

#[tokio::test]
async fn rejection_releases_the_reservation() {
    let app = TestApp::new().await;
    let seed = app.seed;
    let source = app
        .receive(seed.promo_product, seed.main_depot, "6001", 40, None)
        .await;
    let transfers = &app.services().transfers;

    let created = transfers
        .create_transfer(transfer(seed.main_depot, seed.branch_depot, &[(source.id, 15)]))
        .await
        .unwrap();
    let rejected = transfers.reject_transfer(created.id).await.unwrap();
    assert_eq!(rejected.status, TransferStatus::Rejected);

    let held = app.batch(source.id).await;
    assert_eq!(
        (held.quantity, held.available_quantity, held.reserved_quantity),
        (40, 40, 0)
    );
    assert_matches!(
        transfers.approve_transfer(created.id).await,
        Err(ServiceError::InvalidState { .. })
    );

    let second = transfers
        .create_transfer(transfer(seed.main_depot, seed.branch_depot, &[(source.id, 5)]))
        .await
        .unwrap();
    assert!(second.transfer_number.ends_with("-0002"));
}

#[tokio::test]
async fn invalid_transfers_are_refused() {
    let app = TestApp::new().await;
    let seed = app.seed;
    let main_batch = app
        .receive(seed.plain_product, seed.main_depot, "7001", 10, None)
        .await;
    let branch_batch = app
        .receive(seed.plain_product, seed.branch_depot, "7002", 10, None)
        .await;
    let legacy = app
        .insert_legacy_batch(seed.plain_product, seed.main_depot, "LOT-Z", 10)
        .await;
    let transfers = &app.services().transfers;

    assert_matches!(
        transfers
            .create_transfer(transfer(seed.main_depot, seed.main_depot, &[(main_batch.id, 1)]))
            .await,
        Err(ServiceError::ValidationError(_))
    );
    assert_matches!(
        transfers
            .create_transfer(transfer(seed.main_depot, seed.branch_depot, &[(branch_batch.id, 1)]))
            .await,
        Err(ServiceError::ValidationError(msg)) if msg.contains("not held")
    );
    assert_matches!(
        transfers
            .create_transfer(transfer(seed.main_depot, seed.branch_depot, &[(legacy.id, 1)]))
            .await,
        Err(ServiceError::ValidationError(msg)) if msg.contains("non-numeric")
    );
    assert_matches!(
        transfers
            .create_transfer(transfer(
                seed.main_depot,
                seed.branch_depot,
                &[(main_batch.id, 1), (main_batch.id, 2)]
            ))
            .await,
        Err(ServiceError::ValidationError(_))
    );
    assert_matches!(
        transfers
            .create_transfer(transfer(seed.main_depot, seed.branch_depot, &[(main_batch.id, 11)]))
            .await,
        Err(ServiceError::InsufficientStock { requested: 11, available: 10, .. })
    );
    assert_matches!(
        transfers.get_transfer(404).await,
        Err(ServiceError::NotFound(_))
    );
    assert_eq!(app.batch(main_batch.id).await.reserved_quantity, 0);
}
