#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request},
    Router,
};
use chrono::{NaiveDate, Utc};
use fulfillment_api::{
    config::AppConfig,
    db,
    entities::{batch_detail, customer, depot, employee, product, route, vehicle},
    events::{self, EventSender},
    handlers::AppServices,
    services::{
        inventory::{BatchResponse, ReceiveStockRequest},
        order_lifecycle::{
            AssignmentOutcome, CreateOrderItemRequest, CreateOrderRequest, OrderResponse,
        },
    },
    AppState,
};
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;

/// Master data ids created for every test application.
#[derive(Clone, Copy, Debug)]
pub struct Seed {
    pub customer: i32,
    pub north_route: i32,
    pub south_route: i32,
    /// Route without a short code
    pub rural_route: i32,
    pub salesperson: i32,
    pub driver: i32,
    pub office: i32,
    pub vehicle: i32,
    pub main_depot: i32,
    pub branch_depot: i32,
    /// 12.50 a unit, 10% VAT, 5 free units per 50 ordered
    pub promo_product: i32,
    /// 2.25 a unit, no VAT, no promotion
    pub plain_product: i32,
    pub inactive_product: i32,
}

/// Helper harness for spinning up an application state backed by an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub seed: Seed,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::new(db_arc, cfg, event_sender);
        let seed = seed_master_data(&state).await;
        let router = fulfillment_api::app_router(state.clone());

        Self {
            router,
            state,
            seed,
            _event_task: event_task,
        }
    }

    pub fn services(&self) -> &AppServices {
        &self.state.services
    }

    /// Books a numeric batch through the inventory service.
    pub async fn receive(
        &self,
        product_id: i32,
        depot_id: i32,
        batch_number: &str,
        quantity: i32,
        expiry: Option<NaiveDate>,
    ) -> BatchResponse {
        self.services()
            .inventory
            .receive_stock(ReceiveStockRequest {
                product_id,
                depot_id,
                batch_number: batch_number.to_string(),
                quantity,
                expiry_date: expiry,
                manufacturing_date: None,
            })
            .await
            .expect("receive stock for tests")
    }

    /// Inserts a batch row directly; receipts refuse non-numeric batch numbers.
    pub async fn insert_legacy_batch(
        &self,
        product_id: i32,
        depot_id: i32,
        batch_number: &str,
        quantity: i32,
    ) -> batch_detail::Model {
        batch_detail::ActiveModel {
            product_id: Set(product_id),
            depot_id: Set(depot_id),
            batch_number: Set(batch_number.to_string()),
            quantity: Set(quantity),
            available_quantity: Set(quantity),
            reserved_quantity: Set(0),
            expiry_date: Set(None),
            manufacturing_date: Set(None),
            status: Set("Active".to_string()),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&*self.state.db)
        .await
        .expect("insert legacy batch")
    }

    pub async fn batch(&self, batch_id: i32) -> batch_detail::Model {
        batch_detail::Entity::find_by_id(batch_id)
            .one(&*self.state.db)
            .await
            .expect("load batch")
            .expect("batch exists")
    }

    pub fn order_request(&self, route_id: i32, items: &[(i32, i32)]) -> CreateOrderRequest {
        CreateOrderRequest {
            customer_id: self.seed.customer,
            route_id,
            salesperson_id: self.seed.salesperson,
            depot_id: self.seed.main_depot,
            delivery_date: Utc::now().date_naive(),
            items: items
                .iter()
                .map(|(product_id, quantity)| CreateOrderItemRequest {
                    product_id: *product_id,
                    quantity: *quantity,
                    discount_percent: None,
                    batch_hint: None,
                })
                .collect(),
            remarks: None,
        }
    }

    /// Creates, submits and fully validates an order.
    pub async fn validated_order(&self, route_id: i32, items: &[(i32, i32)]) -> OrderResponse {
        let orders = &self.services().orders;
        let created = orders
            .create_order(self.order_request(route_id, items))
            .await
            .expect("create order");
        orders.submit_order(created.id).await.expect("submit order");
        orders
            .validate_orders(vec![created.id], None)
            .await
            .expect("validate order");
        orders.get_order(created.id).await.expect("reload order")
    }

    /// Prints the orders and puts them on one loading for the seeded driver and vehicle.
    pub async fn load(&self, order_ids: &[i32]) -> AssignmentOutcome {
        let orders = &self.services().orders;
        let printed = orders
            .print_orders(order_ids.to_vec())
            .await
            .expect("print orders");
        assert_eq!(printed.printed.len(), order_ids.len());
        orders
            .assign_orders(order_ids.to_vec(), self.seed.driver, self.seed.vehicle)
            .await
            .expect("assign orders")
    }

    /// Send a request against the full application router.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("response body is json")
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

async fn seed_master_data(state: &AppState) -> Seed {
    let db = &*state.db;

    let customer = customer::ActiveModel {
        code: Set("C-100".into()),
        name: Set("Green Cross Pharmacy".into()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed customer");

    let mut routes = Vec::new();
    for (code, name) in [(Some("N1"), "North"), (Some("S2"), "South"), (None, "Rural")] {
        let route = route::ActiveModel {
            code: Set(code.map(str::to_string)),
            name: Set(name.into()),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("seed route");
        routes.push(route.id);
    }

    let mut employees = Vec::new();
    for (code, name) in [("E-1", "Sales Rep"), ("E-2", "Driver"), ("E-3", "Office Clerk")] {
        let employee = employee::ActiveModel {
            code: Set(code.into()),
            name: Set(name.into()),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("seed employee");
        employees.push(employee.id);
    }

    let vehicle = vehicle::ActiveModel {
        registration_number: Set("DHA-11-2233".into()),
        description: Set(Some("Covered van".into())),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed vehicle");

    let mut depots = Vec::new();
    for (code, name) in [("D-MAIN", "Main depot"), ("D-BR", "Branch depot")] {
        let depot = depot::ActiveModel {
            code: Set(code.into()),
            name: Set(name.into()),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("seed depot");
        depots.push(depot.id);
    }

    let mut products = Vec::new();
    for (code, price, vat, threshold, bonus, active) in [
        ("AMX-500", dec!(12.50), dec!(10), 50, 5, true),
        ("PCM-250", dec!(2.25), dec!(0), 0, 0, true),
        ("OLD-001", dec!(1.00), dec!(0), 0, 0, false),
    ] {
        let product = product::ActiveModel {
            code: Set(code.into()),
            name: Set(format!("Product {}", code)),
            trade_price: Set(price),
            vat_percent: Set(vat),
            free_goods_threshold: Set(threshold),
            free_goods_quantity: Set(bonus),
            active: Set(active),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("seed product");
        products.push(product.id);
    }

    Seed {
        customer: customer.id,
        north_route: routes[0],
        south_route: routes[1],
        rural_route: routes[2],
        salesperson: employees[0],
        driver: employees[1],
        office: employees[2],
        vehicle: vehicle.id,
        main_depot: depots[0],
        branch_depot: depots[1],
        promo_product: products[0],
        plain_product: products[1],
        inactive_product: products[2],
    }
}
