mod common;

use assert_matches::assert_matches;
use chrono::Utc;
use common::TestApp;
use fulfillment_api::errors::ServiceError;
use fulfillment_api::models::status::{OrderStatus, Stage};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use rstest::rstest;

async fn stocked_app() -> TestApp {
    let app = TestApp::new().await;
    let seed = app.seed;
    app.receive(seed.promo_product, seed.main_depot, "1001", 500, None)
        .await;
    app.receive(seed.plain_product, seed.main_depot, "2001", 500, None)
        .await;
    app
}

#[tokio::test]
async fn create_prices_items_and_starts_in_draft() {
    let app = stocked_app().await;
    let seed = app.seed;

    let order = app
        .services()
        .orders
        .create_order(app.order_request(
            seed.north_route,
            &[(seed.promo_product, 10), (seed.plain_product, 4)],
        ))
        .await
        .unwrap();

    assert_eq!(order.state.stage(), Stage::Draft);
    assert_eq!(order.status, OrderStatus::Draft);
    assert!(!order.validated && !order.printed && !order.loaded);
    assert!(order.items.iter().all(|i| i.selected));
    // 10 x 12.50 + 10% VAT, plus 4 x 2.25
    assert_eq!(order.total_amount, dec!(146.50));
    assert_eq!(order.memo_number, None);
}

#[rstest]
#[case(Some(dec!(-1)), None)]
#[case(Some(dec!(100.5)), None)]
#[case(None, Some("B-12"))]
#[tokio::test]
async fn create_rejects_bad_item_terms(
    #[case] discount: Option<Decimal>,
    #[case] hint: Option<&str>,
) {
    let app = stocked_app().await;
    let seed = app.seed;
    let mut request = app.order_request(seed.north_route, &[(seed.plain_product, 1)]);
    request.items[0].discount_percent = discount;
    request.items[0].batch_hint = hint.map(str::to_string);

    assert_matches!(
        app.services().orders.create_order(request).await,
        Err(ServiceError::ValidationError(_))
    );
}

#[tokio::test]
async fn validation_issues_one_memo_and_is_idempotent() {
    let app = stocked_app().await;
    let seed = app.seed;
    let order = app
        .validated_order(seed.north_route, &[(seed.plain_product, 3)])
        .await;

    assert_eq!(order.state.stage(), Stage::Validated);
    assert_eq!(order.status, OrderStatus::Approved);
    let memo = order.memo_number.clone().expect("memo issued");
    assert_eq!(memo.len(), 8);
    assert!(memo.bytes().all(|b| b.is_ascii_digit()));

    let again = app
        .services()
        .orders
        .validate_orders(vec![order.id], None)
        .await
        .unwrap();
    assert_eq!(again.len(), 1);
    assert!(!again[0].changed);
    assert_eq!(again[0].memo_number.as_deref(), Some(memo.as_str()));
}

#[tokio::test]
async fn draft_orders_cannot_be_validated() {
    let app = stocked_app().await;
    let seed = app.seed;
    let orders = &app.services().orders;
    let order = orders
        .create_order(app.order_request(seed.north_route, &[(seed.plain_product, 3)]))
        .await
        .unwrap();

    assert_matches!(
        orders.validate_orders(vec![order.id], None).await,
        Err(ServiceError::InvalidState { .. })
    );
    assert_matches!(
        orders.submit_order(order.id).await.map(|o| o.state.stage()),
        Ok(Stage::Submitted)
    );
    assert_matches!(
        orders.submit_order(order.id).await,
        Err(ServiceError::InvalidState { .. })
    );
}

#[tokio::test]
async fn partial_selection_keeps_its_memo_through_full_validation() {
    let app = stocked_app().await;
    let seed = app.seed;
    let orders = &app.services().orders;
    let order = orders
        .create_order(app.order_request(
            seed.north_route,
            &[(seed.promo_product, 10), (seed.plain_product, 4)],
        ))
        .await
        .unwrap();
    orders.submit_order(order.id).await.unwrap();
    let first_item = order.items[0].id;

    assert_matches!(
        orders.select_items(order.id, vec![first_item, 9_999]).await,
        Err(ServiceError::ValidationError(_))
    );
    orders.select_items(order.id, vec![first_item]).await.unwrap();

    let partial = orders.validate_orders(vec![order.id], None).await.unwrap();
    assert_eq!(partial[0].stage, Stage::PartiallyApproved);
    let memo = partial[0].memo_number.clone().expect("memo on partial approval");
    let reloaded = orders.get_order(order.id).await.unwrap();
    assert_eq!(reloaded.status, OrderStatus::PartiallyApproved);
    assert_eq!(reloaded.total_amount, dec!(137.50));

    // Same partial selection again changes nothing
    let repeat = orders.validate_orders(vec![order.id], None).await.unwrap();
    assert!(!repeat[0].changed);

    // A different partial selection keeps the stage and memo but reprices
    let second_item = order.items[1].id;
    orders.select_items(order.id, vec![second_item]).await.unwrap();
    let reselected = orders.validate_orders(vec![order.id], None).await.unwrap();
    assert!(!reselected[0].changed);
    assert_eq!(reselected[0].stage, Stage::PartiallyApproved);
    assert_eq!(reselected[0].memo_number.as_deref(), Some(memo.as_str()));
    assert_eq!(orders.get_order(order.id).await.unwrap().total_amount, dec!(9.00));

    let all_items: Vec<i32> = order.items.iter().map(|i| i.id).collect();
    orders.select_items(order.id, all_items).await.unwrap();
    let full = orders.validate_orders(vec![order.id], None).await.unwrap();
    assert_eq!(full[0].stage, Stage::Validated);
    assert_eq!(full[0].memo_number.as_deref(), Some(memo.as_str()));
    assert_eq!(orders.get_order(order.id).await.unwrap().total_amount, dec!(146.50));

    // Orders with a memo are no longer deletable
    assert_matches!(
        orders.delete_order(order.id).await,
        Err(ServiceError::InvalidState { .. })
    );
}

#[tokio::test]
async fn requested_memo_goes_to_the_first_order_only() {
    let app = stocked_app().await;
    let seed = app.seed;
    let orders = &app.services().orders;
    let mut ids = Vec::new();
    for _ in 0..2 {
        let order = orders
            .create_order(app.order_request(seed.north_route, &[(seed.plain_product, 1)]))
            .await
            .unwrap();
        orders.submit_order(order.id).await.unwrap();
        ids.push(order.id);
    }

    let outcomes = orders
        .validate_orders(ids.clone(), Some("12345678".into()))
        .await
        .unwrap();
    assert_eq!(outcomes[0].memo_number.as_deref(), Some("12345678"));
    let second = outcomes[1].memo_number.clone().unwrap();
    assert_ne!(second, "12345678");

    assert_matches!(
        orders.validate_orders(ids, Some("1234".into())).await,
        Err(ServiceError::ValidationError(_))
    );
}

#[tokio::test]
async fn drafts_can_be_deleted() {
    let app = stocked_app().await;
    let seed = app.seed;
    let orders = &app.services().orders;
    let order = orders
        .create_order(app.order_request(seed.north_route, &[(seed.plain_product, 1)]))
        .await
        .unwrap();

    orders.delete_order(order.id).await.unwrap();
    assert_matches!(orders.get_order(order.id).await, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn printing_reports_skipped_and_ineligible_orders() {
    let app = stocked_app().await;
    let seed = app.seed;
    let orders = &app.services().orders;
    let validated = app
        .validated_order(seed.north_route, &[(seed.plain_product, 2)])
        .await;
    let submitted = orders
        .create_order(app.order_request(seed.north_route, &[(seed.plain_product, 2)]))
        .await
        .unwrap();
    orders.submit_order(submitted.id).await.unwrap();

    let outcome = orders
        .print_orders(vec![validated.id, submitted.id])
        .await
        .unwrap();
    assert_eq!(outcome.printed, vec![validated.id]);
    assert_eq!(outcome.ineligible, vec![submitted.id]);
    assert!(outcome.skipped.is_empty());

    let outcome = orders.print_orders(vec![validated.id]).await.unwrap();
    assert_eq!(outcome.skipped, vec![validated.id]);
    assert!(orders.get_order(validated.id).await.unwrap().printed);
}

#[tokio::test]
async fn loading_numbers_count_up_within_a_day() {
    let app = stocked_app().await;
    let seed = app.seed;
    let prefix = Utc::now().date_naive().format("%Y%m%d").to_string();

    let first = app
        .validated_order(seed.north_route, &[(seed.plain_product, 2)])
        .await;
    let second = app
        .validated_order(seed.north_route, &[(seed.plain_product, 2)])
        .await;

    let a = app.load(&[first.id]).await;
    let b = app.load(&[second.id]).await;
    assert_eq!(a.loading_number, format!("{}-0001", prefix));
    assert_eq!(b.loading_number, format!("{}-0002", prefix));

    let loaded = app.services().orders.get_order(first.id).await.unwrap();
    assert_eq!(loaded.state.stage(), Stage::Assigned);
    assert!(loaded.loaded);
    assert_eq!(loaded.loading_number, Some(a.loading_number));
}

#[tokio::test]
async fn multi_route_loading_carries_sorted_route_codes() {
    let app = stocked_app().await;
    let seed = app.seed;
    let south = app
        .validated_order(seed.south_route, &[(seed.plain_product, 2)])
        .await;
    let north = app
        .validated_order(seed.north_route, &[(seed.plain_product, 2)])
        .await;

    let outcome = app.load(&[south.id, north.id]).await;
    assert!(
        outcome.loading_number.ends_with("-0001-N1-S2"),
        "unexpected loading number {}",
        outcome.loading_number
    );
}

#[tokio::test]
async fn multi_route_loading_needs_every_route_code() {
    let app = stocked_app().await;
    let seed = app.seed;
    let orders = &app.services().orders;
    let north = app
        .validated_order(seed.north_route, &[(seed.plain_product, 2)])
        .await;
    let rural = app
        .validated_order(seed.rural_route, &[(seed.plain_product, 2)])
        .await;
    orders.print_orders(vec![north.id, rural.id]).await.unwrap();

    let err = orders
        .assign_orders(vec![north.id, rural.id], seed.driver, seed.vehicle)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(msg) if msg.contains("route code"));
    assert_eq!(
        orders.get_order(north.id).await.unwrap().state.stage(),
        Stage::Printed
    );

    // A single uncoded route needs no suffix
    let outcome = orders
        .assign_orders(vec![rural.id], seed.driver, seed.vehicle)
        .await
        .unwrap();
    assert!(outcome.loading_number.ends_with("-0001"));
}

#[tokio::test]
async fn only_printed_orders_can_be_assigned() {
    let app = stocked_app().await;
    let seed = app.seed;
    let order = app
        .validated_order(seed.north_route, &[(seed.plain_product, 2)])
        .await;

    assert_matches!(
        app.services()
            .orders
            .assign_orders(vec![order.id], seed.driver, seed.vehicle)
            .await,
        Err(ServiceError::InvalidState { .. })
    );
    assert_matches!(
        app.services()
            .orders
            .assign_orders(vec![order.id, 4_242], seed.driver, seed.vehicle)
            .await,
        Err(ServiceError::NotFound(_))
    );
}
