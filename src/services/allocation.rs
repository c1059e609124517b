//! FEFO Allocation Engine
//!
//! Turns a required quantity of a product into batch picks: earliest expiry
//! first, batches without expiry last, ties broken by an order line's batch
//! hint and then by numeric batch number.
//! Planning is pure; [`allocate`] locks the candidate batches, plans, and
//! reserves every pick on the caller's transaction.

use chrono::NaiveDate;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use serde::Serialize;
use std::cmp::Ordering;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::entities::batch_detail::{self, Entity as BatchDetail};
use crate::errors::ServiceError;
use crate::metrics::{ALLOCATED_UNITS, ALLOCATIONS, ALLOCATION_CONFLICTS, ALLOCATION_SHORTFALLS};
use crate::services::free_goods::distribute_bonus;
use crate::services::inventory_ledger;

/// Units taken from one batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct Pick {
    pub batch_id: i32,
    pub batch_number: String,
    pub expiry_date: Option<NaiveDate>,
    pub quantity: i32,
    /// Bonus units awarded from this batch's share
    pub free_goods: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct AllocationPlan {
    pub product_id: i32,
    pub requested: i32,
    pub picks: Vec<Pick>,
}

impl AllocationPlan {
    pub fn allocated(&self) -> i32 {
        self.picks.iter().map(|p| p.quantity).sum()
    }

    pub fn free_goods(&self) -> i32 {
        self.picks.iter().map(|p| p.free_goods).sum()
    }
}

/// Compares digit strings by value without parsing into a fixed-width integer.
fn compare_numeric(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn expiry_cmp(a: &batch_detail::Model, b: &batch_detail::Model) -> Ordering {
    match (a.expiry_date, b.expiry_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// FEFO order: expiry ascending with undated batches last, then batch number.
pub fn fefo_cmp(a: &batch_detail::Model, b: &batch_detail::Model) -> Ordering {
    expiry_cmp(a, b).then_with(|| compare_numeric(&a.batch_number, &b.batch_number))
}

/// FEFO order where the hinted batch wins among batches expiring on the same day.
fn hinted_fefo_cmp(
    a: &batch_detail::Model,
    b: &batch_detail::Model,
    hint: Option<&str>,
) -> Ordering {
    let is_hinted = |m: &batch_detail::Model| Some(m.batch_number.as_str()) == hint;
    expiry_cmp(a, b)
        .then_with(|| is_hinted(b).cmp(&is_hinted(a)))
        .then_with(|| compare_numeric(&a.batch_number, &b.batch_number))
}

/// Sum of available units, widened so large batches cannot overflow.
fn total_available<'a>(batches: impl IntoIterator<Item = &'a batch_detail::Model>) -> i64 {
    batches
        .into_iter()
        .map(|b| i64::from(b.available_quantity))
        .sum()
}

fn not_orderable(product_id: i32) -> ServiceError {
    ServiceError::ValidationError(format!(
        "product {} is not orderable: no batch with a numeric batch number has stock",
        product_id
    ))
}

/// Plans picks for `required` units from `candidates`.
///
/// A batch hint only breaks ties between batches with the same expiry; it never
/// moves a later-expiring batch ahead. Nothing is mutated; a shortfall is
/// reported as `InsufficientStock` with the full available total.
pub fn plan_fefo(
    product_id: i32,
    candidates: Vec<batch_detail::Model>,
    required: i32,
    batch_hint: Option<&str>,
    bonus: i32,
) -> Result<AllocationPlan, ServiceError> {
    if required <= 0 {
        return Err(ServiceError::ValidationError(format!(
            "required quantity must be positive, got {}",
            required
        )));
    }

    let mut eligible: Vec<batch_detail::Model> = candidates
        .into_iter()
        .filter(|b| b.available_quantity > 0 && b.has_numeric_batch_number())
        .collect();
    if eligible.is_empty() {
        return Err(not_orderable(product_id));
    }
    eligible.sort_by(|a, b| hinted_fefo_cmp(a, b, batch_hint));

    let available = total_available(&eligible);
    if available < i64::from(required) {
        // Below `required`, so the total fits an i32
        return Err(ServiceError::InsufficientStock {
            product_id,
            requested: required,
            available: available as i32,
        });
    }

    let mut remaining = required;
    let mut picks = Vec::new();
    for batch in eligible {
        if remaining == 0 {
            break;
        }
        let take = batch.available_quantity.min(remaining);
        remaining -= take;
        picks.push(Pick {
            batch_id: batch.id,
            batch_number: batch.batch_number,
            expiry_date: batch.expiry_date,
            quantity: take,
            free_goods: 0,
        });
    }

    let quantities: Vec<i32> = picks.iter().map(|p| p.quantity).collect();
    for (pick, award) in picks.iter_mut().zip(distribute_bonus(bonus, &quantities)) {
        pick.free_goods = award;
    }

    Ok(AllocationPlan {
        product_id,
        requested: required,
        picks,
    })
}

/// Plans and reserves `required` units of a product on the caller's transaction.
#[instrument(skip(conn))]
pub async fn allocate<C: ConnectionTrait>(
    conn: &C,
    product_id: i32,
    depot_id: Option<i32>,
    required: i32,
    batch_hint: Option<&str>,
    bonus: i32,
) -> Result<AllocationPlan, ServiceError> {
    let candidates = inventory_ledger::lock_available_batches(conn, product_id, depot_id).await?;

    let plan = match plan_fefo(product_id, candidates, required, batch_hint, bonus) {
        Ok(plan) => plan,
        Err(e) => {
            if let ServiceError::InsufficientStock { .. } = e {
                ALLOCATION_SHORTFALLS.inc();
                warn!(product_id, required, deficit = e.deficit(), "Allocation short");
            }
            return Err(e);
        }
    };

    reserve_plan(conn, &plan).await?;

    ALLOCATIONS.inc();
    ALLOCATED_UNITS.inc_by(plan.allocated() as u64);
    info!(
        product_id,
        required,
        picks = plan.picks.len(),
        free_goods = plan.free_goods(),
        "Allocated stock"
    );
    Ok(plan)
}

/// Reserves every pick of `plan`. A batch that no longer holds its planned
/// units is a lost race, reported as a retryable `Conflict`; the caller's
/// transaction must then be rolled back.
pub async fn reserve_plan<C: ConnectionTrait>(
    conn: &C,
    plan: &AllocationPlan,
) -> Result<(), ServiceError> {
    for pick in &plan.picks {
        match inventory_ledger::reserve(conn, pick.batch_id, pick.quantity).await {
            Ok(()) => {}
            Err(ServiceError::InsufficientStock { available, .. }) => {
                ALLOCATION_CONFLICTS.inc();
                return Err(ServiceError::Conflict(format!(
                    "batch {} changed concurrently: {} units planned, {} available",
                    pick.batch_number, pick.quantity, available
                )));
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Free units of a product across eligible batches; errors when none can be allocated.
#[instrument(skip(conn))]
pub async fn check_orderable<C: ConnectionTrait>(
    conn: &C,
    product_id: i32,
    depot_id: Option<i32>,
) -> Result<i64, ServiceError> {
    let mut query = BatchDetail::find()
        .filter(batch_detail::Column::ProductId.eq(product_id))
        .filter(batch_detail::Column::AvailableQuantity.gt(0));
    if let Some(depot_id) = depot_id {
        query = query.filter(batch_detail::Column::DepotId.eq(depot_id));
    }
    let batches = query.all(conn).await?;
    let available = total_available(batches.iter().filter(|b| b.has_numeric_batch_number()));

    if available == 0 {
        return Err(not_orderable(product_id));
    }
    Ok(available)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Utc;

    fn batch(id: i32, number: &str, expiry: Option<(i32, u32, u32)>, available: i32) -> batch_detail::Model {
        batch_detail::Model {
            id,
            product_id: 7,
            depot_id: 1,
            batch_number: number.into(),
            quantity: available,
            available_quantity: available,
            reserved_quantity: 0,
            expiry_date: expiry.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            manufacturing_date: None,
            status: "Active".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn two_batch_example_splits_bonus() {
        let candidates = vec![
            batch(2, "1002", Some((2025, 9, 30)), 100),
            batch(1, "1001", Some((2025, 6, 30)), 30),
        ];
        let plan = plan_fefo(7, candidates, 60, None, 5).unwrap();

        let picks: Vec<(&str, i32, i32)> = plan
            .picks
            .iter()
            .map(|p| (p.batch_number.as_str(), p.quantity, p.free_goods))
            .collect();
        assert_eq!(picks, vec![("1001", 30, 2), ("1002", 30, 3)]);
        assert_eq!(plan.allocated(), 60);
        assert_eq!(plan.free_goods(), 5);
    }

    #[test]
    fn undated_batches_go_last_and_numbers_break_ties() {
        let candidates = vec![
            batch(1, "900", None, 10),
            batch(2, "1000", Some((2026, 1, 1)), 10),
            batch(3, "99", Some((2026, 1, 1)), 10),
        ];
        let plan = plan_fefo(7, candidates, 25, None, 0).unwrap();
        let order: Vec<&str> = plan.picks.iter().map(|p| p.batch_number.as_str()).collect();
        assert_eq!(order, vec!["99", "1000", "900"]);
        assert_eq!(plan.picks[2].quantity, 5);
    }

    #[test]
    fn legacy_batches_never_allocate() {
        let candidates = vec![batch(1, "LOT-A", Some((2025, 1, 1)), 500)];
        assert_matches!(
            plan_fefo(7, candidates, 10, None, 0),
            Err(ServiceError::ValidationError(msg)) if msg.contains("not orderable")
        );
    }

    #[test]
    fn shortfall_reports_the_deficit() {
        let candidates = vec![
            batch(1, "1", Some((2025, 1, 1)), 20),
            batch(2, "LOT-B", Some((2024, 1, 1)), 100),
            batch(3, "2", None, 28),
        ];
        let err = plan_fefo(7, candidates, 60, None, 0).unwrap_err();
        assert_matches!(
            err,
            ServiceError::InsufficientStock {
                product_id: 7,
                requested: 60,
                available: 48
            }
        );
        assert_eq!(err.deficit(), 12);
    }

    #[test]
    fn hint_never_overrides_expiry_order() {
        let candidates = vec![
            batch(1, "1", Some((2025, 1, 1)), 30),
            batch(2, "2", Some((2025, 6, 1)), 50),
            batch(3, "3", Some((2025, 9, 1)), 50),
        ];
        let plan = plan_fefo(7, candidates, 60, Some("3"), 0).unwrap();
        let picks: Vec<(&str, i32)> = plan
            .picks
            .iter()
            .map(|p| (p.batch_number.as_str(), p.quantity))
            .collect();
        assert_eq!(picks, vec![("1", 30), ("2", 30)]);
    }

    #[test]
    fn hint_breaks_ties_within_one_expiry() {
        let candidates = vec![
            batch(1, "1001", Some((2025, 6, 30)), 30),
            batch(2, "1002", Some((2025, 6, 30)), 100),
            batch(3, "1003", None, 100),
        ];
        let plan = plan_fefo(7, candidates.clone(), 40, Some("1002"), 0).unwrap();
        assert_eq!(plan.picks.len(), 1);
        assert_eq!(plan.picks[0].batch_number, "1002");

        let plan = plan_fefo(7, candidates.clone(), 40, Some("1003"), 0).unwrap();
        assert_eq!(plan.picks[0].batch_number, "1001");

        let plan = plan_fefo(7, candidates, 40, Some("LOT-X"), 0).unwrap();
        assert_eq!(plan.picks[0].batch_number, "1001");
    }

    #[test]
    fn huge_batches_do_not_overflow_the_total() {
        let candidates = vec![
            batch(1, "1", Some((2025, 1, 1)), 2_000_000_000),
            batch(2, "2", Some((2025, 2, 1)), 2_000_000_000),
        ];
        let plan = plan_fefo(7, candidates.clone(), 10, None, 0).unwrap();
        assert_eq!(plan.picks.len(), 1);
        assert_eq!((plan.picks[0].batch_id, plan.picks[0].quantity), (1, 10));

        let plan = plan_fefo(7, candidates, i32::MAX, None, 0).unwrap();
        assert_eq!(plan.allocated(), i32::MAX);
        assert_eq!(plan.picks[1].quantity, i32::MAX - 2_000_000_000);

        let full = [batch(1, "1", None, i32::MAX), batch(2, "2", None, i32::MAX)];
        assert_eq!(total_available(&full), 2 * i64::from(i32::MAX));
    }

    #[test]
    fn numeric_comparison_ignores_leading_zeros() {
        assert_eq!(compare_numeric("0099", "100"), Ordering::Less);
        assert_eq!(compare_numeric("0100", "100"), Ordering::Equal);
        assert_eq!(
            compare_numeric("184467440737095516160", "9"),
            Ordering::Greater
        );
    }
}
