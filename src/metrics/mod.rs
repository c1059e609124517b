/*!
 * # Metrics Module
 *
 * Prometheus counters and histograms for the fulfillment engine, exported in
 * text format at `/metrics`.
 */

use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Failed to export metrics: {0}")]
    ExportError(String),
}

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new_custom(Some("fulfillment".into()), None)
        .expect("registry can be created");

    pub static ref ALLOCATIONS: IntCounter =
        IntCounter::new("allocations_total", "Successful FEFO allocations")
            .expect("metric can be created");
    pub static ref ALLOCATED_UNITS: IntCounter =
        IntCounter::new("allocated_units_total", "Units reserved by FEFO allocation")
            .expect("metric can be created");
    pub static ref ALLOCATION_SHORTFALLS: IntCounter = IntCounter::new(
        "allocation_shortfalls_total",
        "Allocations rejected for insufficient stock"
    )
    .expect("metric can be created");
    pub static ref ALLOCATION_CONFLICTS: IntCounter = IntCounter::new(
        "allocation_conflicts_total",
        "Reservations lost to a concurrent writer"
    )
    .expect("metric can be created");
    pub static ref ORDER_TRANSITIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("order_transitions_total", "Order lifecycle transitions"),
        &["transition"]
    )
    .expect("metric can be created");
    pub static ref NUMBERS_GENERATED: IntCounterVec = IntCounterVec::new(
        Opts::new("numbers_generated_total", "Memo, loading and transfer numbers issued"),
        &["kind"]
    )
    .expect("metric can be created");
    pub static ref NUMBER_COLLISIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("number_collisions_total", "Candidate numbers rejected as duplicates"),
        &["kind"]
    )
    .expect("metric can be created");
    pub static ref LEDGER_MOVEMENTS: IntCounterVec = IntCounterVec::new(
        Opts::new("ledger_movements_total", "Inventory ledger mutations"),
        &["movement"]
    )
    .expect("metric can be created");
    pub static ref TRANSACTIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("transactions_total", "Engine transactions by outcome"),
        &["operation", "outcome"]
    )
    .expect("metric can be created");
    pub static ref TRANSACTION_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "transaction_duration_seconds",
            "Wall time of engine transactions"
        ),
        &["operation"]
    )
    .expect("metric can be created");
}

/// Registers every collector exactly once; later calls are no-ops.
pub fn init_metrics() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(ALLOCATIONS.clone()),
            Box::new(ALLOCATED_UNITS.clone()),
            Box::new(ALLOCATION_SHORTFALLS.clone()),
            Box::new(ALLOCATION_CONFLICTS.clone()),
            Box::new(ORDER_TRANSITIONS.clone()),
            Box::new(NUMBERS_GENERATED.clone()),
            Box::new(NUMBER_COLLISIONS.clone()),
            Box::new(LEDGER_MOVEMENTS.clone()),
            Box::new(TRANSACTIONS.clone()),
            Box::new(TRANSACTION_DURATION.clone()),
        ];
        for collector in collectors {
            if let Err(e) = REGISTRY.register(collector) {
                tracing::warn!("Failed to register metric: {}", e);
            }
        }
    });
}

pub fn record_transition(transition: &str, count: u64) {
    ORDER_TRANSITIONS
        .with_label_values(&[transition])
        .inc_by(count);
}

pub fn record_transaction(operation: &str, outcome: &str, seconds: f64) {
    TRANSACTIONS.with_label_values(&[operation, outcome]).inc();
    TRANSACTION_DURATION
        .with_label_values(&[operation])
        .observe(seconds);
}

/// Prometheus text exposition of the registry.
pub async fn metrics_handler() -> Result<String, MetricsError> {
    init_metrics();
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&REGISTRY.gather(), &mut buffer)
        .map_err(|e| MetricsError::ExportError(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| MetricsError::ExportError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn export_contains_recorded_counters() {
        init_metrics();
        ALLOCATIONS.inc();
        record_transition("validate", 2);
        let body = metrics_handler().await.unwrap();
        assert!(body.contains("fulfillment_allocations_total"));
        assert!(body.contains("fulfillment_order_transitions_total{transition=\"validate\"}"));
    }
}
