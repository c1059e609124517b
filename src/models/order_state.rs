/*!
 * Order lifecycle as a sum type.
 *
 * Each variant carries exactly the data that exists at that point of the
 * lifecycle, so combinations such as "printed but not validated" cannot be
 * built. Rows are flattened into the `orders` table through
 * [`OrderState::write_to`] and read back with `TryFrom<&order::Model>`.
 */

use crate::entities::order;
use crate::errors::ServiceError;
use crate::models::pricing::round2;
use crate::models::status::{CollectionSource, CollectionStatus, OrderStatus, Stage};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::Set;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Unique 8-digit numeric memo assigned on first validation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(transparent)]
pub struct MemoNumber(String);

impl MemoNumber {
    pub const LEN: usize = 8;

    pub fn parse(raw: &str) -> Result<Self, ServiceError> {
        let raw = raw.trim();
        if raw.len() == Self::LEN && raw.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(raw.to_string()))
        } else {
            Err(ServiceError::ValidationError(format!(
                "memo number must be {} digits, got '{}'",
                Self::LEN,
                raw
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemoNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Delivery employee, vehicle and loading group of an assigned order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct Assignment {
    pub employee_id: i32,
    pub vehicle_id: i32,
    pub loading_number: String,
    pub loading_date: NaiveDate,
}

/// Cash outcome recorded at delivery approval.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct Collection {
    pub status: CollectionStatus,
    pub source: CollectionSource,
    pub collected: Decimal,
    pub pending: Decimal,
}

impl Collection {
    /// Classifies a delivery outcome and prorates `total` by delivered units.
    pub fn from_delivery(
        total: Decimal,
        delivered: i32,
        returned: i32,
        source: CollectionSource,
    ) -> Result<Self, ServiceError> {
        if delivered < 0 || returned < 0 || delivered + returned == 0 {
            return Err(ServiceError::ValidationError(format!(
                "delivered ({}) and returned ({}) must be non-negative and not both zero",
                delivered, returned
            )));
        }

        let (status, collected) = if returned == 0 {
            (CollectionStatus::Pending, total)
        } else if delivered == 0 {
            (CollectionStatus::Postponed, Decimal::ZERO)
        } else {
            let ratio = Decimal::from(delivered) / Decimal::from(delivered + returned);
            (CollectionStatus::PartiallyCollected, round2(total * ratio))
        };

        Ok(Self {
            status,
            source,
            collected,
            pending: total - collected,
        })
    }

    pub fn total(&self) -> Decimal {
        self.collected + self.pending
    }
}

/// What `validate` should do with one order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationStep {
    /// Already validated with every item selected, or partially approved with
    /// a memo and still partial; the caller only reprices the selection
    NoOp,
    /// Move to `Validated` (`full`) or `PartiallyApproved`
    Apply { full: bool, needs_memo: bool },
}

/// What `print` should do with one order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrintDecision {
    Print,
    AlreadyPrinted,
    NotValidated,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "stage")]
pub enum OrderState {
    Draft,
    Submitted,
    PartiallyApproved {
        memo: Option<MemoNumber>,
    },
    Validated {
        memo: MemoNumber,
    },
    Printed {
        memo: MemoNumber,
        printed_at: DateTime<Utc>,
    },
    Assigned {
        memo: MemoNumber,
        printed_at: DateTime<Utc>,
        assignment: Assignment,
    },
    Delivered {
        memo: MemoNumber,
        printed_at: DateTime<Utc>,
        assignment: Assignment,
        collection: Collection,
    },
    CollectionApproved {
        memo: MemoNumber,
        printed_at: DateTime<Utc>,
        assignment: Assignment,
        collection: Collection,
        approved_at: DateTime<Utc>,
        approved_by: i32,
    },
}

impl OrderState {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Draft => Stage::Draft,
            Self::Submitted => Stage::Submitted,
            Self::PartiallyApproved { .. } => Stage::PartiallyApproved,
            Self::Validated { .. } => Stage::Validated,
            Self::Printed { .. } => Stage::Printed,
            Self::Assigned { .. } => Stage::Assigned,
            Self::Delivered { .. } => Stage::Delivered,
            Self::CollectionApproved { .. } => Stage::CollectionApproved,
        }
    }

    pub fn memo(&self) -> Option<&MemoNumber> {
        match self {
            Self::Draft | Self::Submitted => None,
            Self::PartiallyApproved { memo } => memo.as_ref(),
            Self::Validated { memo }
            | Self::Printed { memo, .. }
            | Self::Assigned { memo, .. }
            | Self::Delivered { memo, .. }
            | Self::CollectionApproved { memo, .. } => Some(memo),
        }
    }

    pub fn printed_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Printed { printed_at, .. }
            | Self::Assigned { printed_at, .. }
            | Self::Delivered { printed_at, .. }
            | Self::CollectionApproved { printed_at, .. } => Some(*printed_at),
            _ => None,
        }
    }

    pub fn assignment(&self) -> Option<&Assignment> {
        match self {
            Self::Assigned { assignment, .. }
            | Self::Delivered { assignment, .. }
            | Self::CollectionApproved { assignment, .. } => Some(assignment),
            _ => None,
        }
    }

    pub fn collection(&self) -> Option<&Collection> {
        match self {
            Self::Delivered { collection, .. } | Self::CollectionApproved { collection, .. } => {
                Some(collection)
            }
            _ => None,
        }
    }

    // Legacy flag views

    pub fn status(&self) -> OrderStatus {
        match self {
            Self::Draft => OrderStatus::Draft,
            Self::Submitted => OrderStatus::Submitted,
            Self::PartiallyApproved { .. } => OrderStatus::PartiallyApproved,
            _ => OrderStatus::Approved,
        }
    }

    pub fn is_validated(&self) -> bool {
        self.stage_at_least(Stage::Validated)
    }

    pub fn is_printed(&self) -> bool {
        self.printed_at().is_some()
    }

    pub fn is_loaded(&self) -> bool {
        self.assignment().is_some()
    }

    pub fn is_collection_approved(&self) -> bool {
        matches!(self, Self::CollectionApproved { .. })
    }

    /// Orders may only be deleted before a memo number exists.
    pub fn is_deletable(&self) -> bool {
        match self {
            Self::Draft | Self::Submitted => true,
            Self::PartiallyApproved { memo } => memo.is_none(),
            _ => false,
        }
    }

    fn stage_at_least(&self, stage: Stage) -> bool {
        rank(self.stage()) >= rank(stage)
    }

    fn rejected(&self, entity: &str, expected: &str) -> ServiceError {
        ServiceError::invalid_state(entity, self.stage().to_string(), expected)
    }

    // Transitions

    pub fn submit(self, entity: &str) -> Result<Self, ServiceError> {
        match self {
            Self::Draft => Ok(Self::Submitted),
            other => Err(other.rejected(entity, "Draft")),
        }
    }

    /// Item selection is only open while the order awaits (re)validation.
    pub fn ensure_selectable(&self, entity: &str) -> Result<(), ServiceError> {
        match self {
            Self::Submitted | Self::PartiallyApproved { .. } => Ok(()),
            other => Err(other.rejected(entity, "Submitted or PartiallyApproved")),
        }
    }

    /// Decides the validation step for the current selection.
    pub fn plan_validation(
        &self,
        entity: &str,
        selected: usize,
        total: usize,
    ) -> Result<ValidationStep, ServiceError> {
        if selected == 0 {
            return Err(ServiceError::ValidationError(format!(
                "{} has no selected items",
                entity
            )));
        }
        let full = selected == total;

        match self {
            Self::Submitted => Ok(ValidationStep::Apply {
                full,
                needs_memo: true,
            }),
            Self::PartiallyApproved { memo } => {
                if !full && memo.is_some() {
                    Ok(ValidationStep::NoOp)
                } else {
                    Ok(ValidationStep::Apply {
                        full,
                        needs_memo: memo.is_none(),
                    })
                }
            }
            Self::Draft => Err(self.rejected(entity, "Submitted or PartiallyApproved")),
            _ if full => Ok(ValidationStep::NoOp),
            other => Err(other.rejected(entity, "Submitted or PartiallyApproved")),
        }
    }

    /// Applies a planned validation; `memo` is the newly issued number, if one was needed.
    pub fn validate(
        self,
        entity: &str,
        full: bool,
        memo: Option<MemoNumber>,
    ) -> Result<Self, ServiceError> {
        let existing = match self {
            Self::Submitted => None,
            Self::PartiallyApproved { memo } => memo,
            other => return Err(other.rejected(entity, "Submitted or PartiallyApproved")),
        };
        let memo = existing.or(memo);

        if full {
            let memo = memo.ok_or_else(|| {
                ServiceError::InternalError(format!("{} validated without a memo number", entity))
            })?;
            Ok(Self::Validated { memo })
        } else {
            Ok(Self::PartiallyApproved { memo })
        }
    }

    pub fn print_decision(&self) -> PrintDecision {
        match self {
            Self::Validated { .. } => PrintDecision::Print,
            _ if self.is_printed() => PrintDecision::AlreadyPrinted,
            _ => PrintDecision::NotValidated,
        }
    }

    pub fn print(self, entity: &str, printed_at: DateTime<Utc>) -> Result<Self, ServiceError> {
        match self {
            Self::Validated { memo } => Ok(Self::Printed { memo, printed_at }),
            other => Err(other.rejected(entity, "Validated")),
        }
    }

    pub fn assign(self, entity: &str, assignment: Assignment) -> Result<Self, ServiceError> {
        match self {
            Self::Printed { memo, printed_at } => Ok(Self::Assigned {
                memo,
                printed_at,
                assignment,
            }),
            other => Err(other.rejected(entity, "Printed")),
        }
    }

    pub fn deliver(self, entity: &str, collection: Collection) -> Result<Self, ServiceError> {
        match self {
            Self::Assigned {
                memo,
                printed_at,
                assignment,
            } => Ok(Self::Delivered {
                memo,
                printed_at,
                assignment,
                collection,
            }),
            other => Err(other.rejected(entity, "Assigned")),
        }
    }

    /// Office approval of a delivered order's cash outcome.
    pub fn approve_collection(
        self,
        entity: &str,
        approved_at: DateTime<Utc>,
        approved_by: i32,
    ) -> Result<Self, ServiceError> {
        match self {
            Self::Delivered {
                memo,
                printed_at,
                assignment,
                mut collection,
            } => {
                match collection.status {
                    CollectionStatus::Pending if collection.pending.is_zero() => {
                        collection.status = CollectionStatus::FullyCollected;
                    }
                    CollectionStatus::Pending
                    | CollectionStatus::PartiallyCollected
                    | CollectionStatus::Postponed => {}
                    CollectionStatus::FullyCollected => {
                        return Err(ServiceError::invalid_state(
                            entity,
                            "FullyCollected",
                            "Pending, PartiallyCollected or Postponed",
                        ))
                    }
                }
                Ok(Self::CollectionApproved {
                    memo,
                    printed_at,
                    assignment,
                    collection,
                    approved_at,
                    approved_by,
                })
            }
            other => Err(other.rejected(entity, "Delivered")),
        }
    }

    /// Moves `amount` of cash received after approval from pending to collected.
    pub fn collect_pending(self, entity: &str, amount: Decimal) -> Result<Self, ServiceError> {
        let apply = |mut collection: Collection| -> Result<Collection, ServiceError> {
            if amount <= Decimal::ZERO || amount > collection.pending {
                return Err(ServiceError::ValidationError(format!(
                    "amount {} must be positive and at most the pending {} of {}",
                    amount, collection.pending, entity
                )));
            }
            collection.collected += amount;
            collection.pending -= amount;
            if collection.pending.is_zero() {
                collection.status = CollectionStatus::FullyCollected;
            }
            Ok(collection)
        };

        match self {
            Self::CollectionApproved {
                memo,
                printed_at,
                assignment,
                collection,
                approved_at,
                approved_by,
            } => Ok(Self::CollectionApproved {
                memo,
                printed_at,
                assignment,
                collection: apply(collection)?,
                approved_at,
                approved_by,
            }),
            other => Err(other.rejected(entity, "CollectionApproved")),
        }
    }

    /// Writes every state column; columns the variant does not use are cleared.
    pub fn write_to(&self, active: &mut order::ActiveModel) {
        active.stage = Set(self.stage().to_string());
        active.memo_number = Set(self.memo().map(|m| m.as_str().to_string()));
        active.printed_at = Set(self.printed_at());

        let assignment = self.assignment();
        active.assigned_employee_id = Set(assignment.map(|a| a.employee_id));
        active.assigned_vehicle_id = Set(assignment.map(|a| a.vehicle_id));
        active.loading_number = Set(assignment.map(|a| a.loading_number.clone()));
        active.loading_date = Set(assignment.map(|a| a.loading_date));

        let collection = self.collection();
        active.collection_status = Set(collection.map(|c| c.status.to_string()));
        active.collection_source = Set(collection.map(|c| c.source.to_string()));
        active.collected_amount = Set(collection.map(|c| c.collected));
        active.pending_amount = Set(collection.map(|c| c.pending));

        match self {
            Self::CollectionApproved {
                approved_at,
                approved_by,
                ..
            } => {
                active.collection_approved_at = Set(Some(*approved_at));
                active.collection_approved_by = Set(Some(*approved_by));
            }
            _ => {
                active.collection_approved_at = Set(None);
                active.collection_approved_by = Set(None);
            }
        }
    }
}

fn rank(stage: Stage) -> u8 {
    match stage {
        Stage::Draft => 0,
        Stage::Submitted => 1,
        Stage::PartiallyApproved => 2,
        Stage::Validated => 3,
        Stage::Printed => 4,
        Stage::Assigned => 5,
        Stage::Delivered => 6,
        Stage::CollectionApproved => 7,
    }
}

fn corrupt(model: &order::Model, detail: &str) -> ServiceError {
    ServiceError::InternalError(format!(
        "order {} has inconsistent state columns (stage {}): {}",
        model.id, model.stage, detail
    ))
}

impl TryFrom<&order::Model> for OrderState {
    type Error = ServiceError;

    fn try_from(model: &order::Model) -> Result<Self, Self::Error> {
        let stage = Stage::from_str(&model.stage)
            .map_err(|_| corrupt(model, "unknown stage"))?;
        let at = rank(stage);

        let memo = model
            .memo_number
            .as_deref()
            .map(MemoNumber::parse)
            .transpose()
            .map_err(|_| corrupt(model, "malformed memo number"))?;

        // Payload columns must be present exactly from the stage that introduces them
        let expect = |present: bool, from: Stage, what: &str| -> Result<(), ServiceError> {
            if present == (at >= rank(from)) {
                Ok(())
            } else if present {
                Err(corrupt(model, &format!("{} set before {}", what, from)))
            } else {
                Err(corrupt(model, &format!("{} missing", what)))
            }
        };

        if stage != Stage::PartiallyApproved {
            expect(memo.is_some(), Stage::Validated, "memo number")?;
        }
        expect(model.printed_at.is_some(), Stage::Printed, "printed_at")?;
        let assignment_cols = [
            model.assigned_employee_id.is_some(),
            model.assigned_vehicle_id.is_some(),
            model.loading_number.is_some(),
            model.loading_date.is_some(),
        ];
        for present in assignment_cols {
            expect(present, Stage::Assigned, "assignment")?;
        }
        let collection_cols = [
            model.collection_status.is_some(),
            model.collection_source.is_some(),
            model.collected_amount.is_some(),
            model.pending_amount.is_some(),
        ];
        for present in collection_cols {
            expect(present, Stage::Delivered, "collection")?;
        }
        expect(
            model.collection_approved_at.is_some() && model.collection_approved_by.is_some(),
            Stage::CollectionApproved,
            "collection approval",
        )?;

        let require_memo = || memo.clone().ok_or_else(|| corrupt(model, "memo number missing"));
        let printed_at = || {
            model
                .printed_at
                .ok_or_else(|| corrupt(model, "printed_at missing"))
        };
        let assignment = || -> Result<Assignment, ServiceError> {
            match (
                model.assigned_employee_id,
                model.assigned_vehicle_id,
                model.loading_number.clone(),
                model.loading_date,
            ) {
                (Some(employee_id), Some(vehicle_id), Some(loading_number), Some(loading_date)) => {
                    Ok(Assignment {
                        employee_id,
                        vehicle_id,
                        loading_number,
                        loading_date,
                    })
                }
                _ => Err(corrupt(model, "assignment incomplete")),
            }
        };
        let collection = || -> Result<Collection, ServiceError> {
            let status = model
                .collection_status
                .as_deref()
                .and_then(|s| CollectionStatus::from_str(s).ok())
                .ok_or_else(|| corrupt(model, "collection status invalid"))?;
            let source = model
                .collection_source
                .as_deref()
                .and_then(|s| CollectionSource::from_str(s).ok())
                .ok_or_else(|| corrupt(model, "collection source invalid"))?;
            match (model.collected_amount, model.pending_amount) {
                (Some(collected), Some(pending)) => Ok(Collection {
                    status,
                    source,
                    collected,
                    pending,
                }),
                _ => Err(corrupt(model, "collection amounts missing")),
            }
        };

        let state = match stage {
            Stage::Draft => Self::Draft,
            Stage::Submitted => Self::Submitted,
            Stage::PartiallyApproved => Self::PartiallyApproved { memo },
            Stage::Validated => Self::Validated {
                memo: require_memo()?,
            },
            Stage::Printed => Self::Printed {
                memo: require_memo()?,
                printed_at: printed_at()?,
            },
            Stage::Assigned => Self::Assigned {
                memo: require_memo()?,
                printed_at: printed_at()?,
                assignment: assignment()?,
            },
            Stage::Delivered => Self::Delivered {
                memo: require_memo()?,
                printed_at: printed_at()?,
                assignment: assignment()?,
                collection: collection()?,
            },
            Stage::CollectionApproved => Self::CollectionApproved {
                memo: require_memo()?,
                printed_at: printed_at()?,
                assignment: assignment()?,
                collection: collection()?,
                approved_at: model
                    .collection_approved_at
                    .ok_or_else(|| corrupt(model, "approval time missing"))?,
                approved_by: model
                    .collection_approved_by
                    .ok_or_else(|| corrupt(model, "approver missing"))?,
            },
        };
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;
    use sea_orm::ActiveValue;

    fn memo() -> MemoNumber {
        MemoNumber::parse("12345678").unwrap()
    }

    fn assignment() -> Assignment {
        Assignment {
            employee_id: 4,
            vehicle_id: 2,
            loading_number: "20250309-0001".into(),
            loading_date: NaiveDate::from_ymd_opt(2025, 3, 9).unwrap(),
        }
    }

    fn base_model() -> order::Model {
        order::Model {
            id: 1,
            customer_id: 1,
            route_id: 1,
            salesperson_id: 1,
            depot_id: 1,
            customer_name: "Green Pharmacy".into(),
            customer_code: "C-001".into(),
            route_name: "North".into(),
            route_code: Some("N1".into()),
            salesperson_name: "Rahim".into(),
            salesperson_code: "E-010".into(),
            delivery_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            stage: "Draft".into(),
            memo_number: None,
            total_amount: dec!(0),
            printed_at: None,
            assigned_employee_id: None,
            assigned_vehicle_id: None,
            loading_number: None,
            loading_date: None,
            collection_status: None,
            collection_source: None,
            collected_amount: None,
            pending_amount: None,
            collection_approved_at: None,
            collection_approved_by: None,
            postponed: false,
            mobile_accepted: false,
            remarks: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn take<T: Into<sea_orm::Value>>(value: ActiveValue<T>) -> T {
        match value {
            ActiveValue::Set(x) | ActiveValue::Unchanged(x) => x,
            ActiveValue::NotSet => panic!("column not written"),
        }
    }

    fn persist(state: &OrderState) -> order::Model {
        let mut active: order::ActiveModel = base_model().into();
        state.write_to(&mut active);
        let mut model = base_model();
        model.stage = take(active.stage);
        model.memo_number = take(active.memo_number);
        model.printed_at = take(active.printed_at);
        model.assigned_employee_id = take(active.assigned_employee_id);
        model.assigned_vehicle_id = take(active.assigned_vehicle_id);
        model.loading_number = take(active.loading_number);
        model.loading_date = take(active.loading_date);
        model.collection_status = take(active.collection_status);
        model.collection_source = take(active.collection_source);
        model.collected_amount = take(active.collected_amount);
        model.pending_amount = take(active.pending_amount);
        model.collection_approved_at = take(active.collection_approved_at);
        model.collection_approved_by = take(active.collection_approved_by);
        model
    }

    #[test]
    fn memo_numbers_are_eight_digits() {
        assert!(MemoNumber::parse("00001234").is_ok());
        assert!(MemoNumber::parse("1234567").is_err());
        assert!(MemoNumber::parse("1234567a").is_err());
    }

    #[test]
    fn full_lifecycle_survives_persistence() {
        let now = Utc::now();
        let delivered = OrderState::Submitted
            .validate("order 1", true, Some(memo()))
            .unwrap()
            .print("order 1", now)
            .unwrap()
            .assign("order 1", assignment())
            .unwrap()
            .deliver(
                "order 1",
                Collection::from_delivery(dec!(100.00), 3, 1, CollectionSource::Web).unwrap(),
            )
            .unwrap();

        let restored = OrderState::try_from(&persist(&delivered)).unwrap();
        assert_eq!(restored, delivered);
        assert!(restored.is_loaded());
        assert_eq!(restored.status(), OrderStatus::Approved);
    }

    #[test]
    fn partial_validation_keeps_flags_apart() {
        let partial = OrderState::Submitted
            .validate("order 1", false, Some(memo()))
            .unwrap();
        assert_eq!(partial.status(), OrderStatus::PartiallyApproved);
        assert!(!partial.is_validated());
        assert_eq!(partial.memo(), Some(&memo()));
        assert!(!partial.is_deletable());
    }

    #[test]
    fn validation_plan_is_idempotent_for_validated_orders() {
        let validated = OrderState::Validated { memo: memo() };
        assert_eq!(
            validated.plan_validation("order 1", 3, 3).unwrap(),
            ValidationStep::NoOp
        );
        assert_matches!(
            validated.plan_validation("order 1", 2, 3),
            Err(ServiceError::InvalidState { .. })
        );
        assert_matches!(
            OrderState::Submitted.plan_validation("order 1", 0, 3),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn partially_approved_promotion_reuses_memo() {
        let partial = OrderState::PartiallyApproved { memo: Some(memo()) };
        assert_eq!(
            partial.plan_validation("order 1", 3, 3).unwrap(),
            ValidationStep::Apply {
                full: true,
                needs_memo: false
            }
        );
        let promoted = partial.validate("order 1", true, None).unwrap();
        assert_eq!(promoted, OrderState::Validated { memo: memo() });
    }

    #[test]
    fn print_decisions() {
        let now = Utc::now();
        assert_eq!(
            OrderState::Validated { memo: memo() }.print_decision(),
            PrintDecision::Print
        );
        assert_eq!(
            OrderState::Printed {
                memo: memo(),
                printed_at: now
            }
            .print_decision(),
            PrintDecision::AlreadyPrinted
        );
        assert_eq!(
            OrderState::Submitted.print_decision(),
            PrintDecision::NotValidated
        );
    }

    #[test]
    fn assign_requires_printed() {
        let err = OrderState::Validated { memo: memo() }
            .assign("order 9", assignment())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid state: order 9 is Validated, expected Printed"
        );
    }

    #[test]
    fn collection_classification_keeps_amount_identity() {
        let full = Collection::from_delivery(dec!(250.00), 10, 0, CollectionSource::Web).unwrap();
        assert_eq!(full.status, CollectionStatus::Pending);
        assert_eq!((full.collected, full.pending), (dec!(250.00), dec!(0)));

        let none =
            Collection::from_delivery(dec!(250.00), 0, 10, CollectionSource::MobileApp).unwrap();
        assert_eq!(none.status, CollectionStatus::Postponed);
        assert_eq!((none.collected, none.pending), (dec!(0), dec!(250.00)));

        let part = Collection::from_delivery(dec!(100.00), 1, 2, CollectionSource::Web).unwrap();
        assert_eq!(part.status, CollectionStatus::PartiallyCollected);
        assert_eq!(part.collected, dec!(33.33));
        assert_eq!(part.pending, dec!(66.67));
        assert_eq!(part.total(), dec!(100.00));

        assert!(Collection::from_delivery(dec!(1), 0, 0, CollectionSource::Web).is_err());
    }

    #[test]
    fn approval_promotes_settled_pending_orders() {
        let now = Utc::now();
        let delivered = OrderState::Delivered {
            memo: memo(),
            printed_at: now,
            assignment: assignment(),
            collection: Collection::from_delivery(dec!(80), 4, 0, CollectionSource::Web).unwrap(),
        };
        let approved = delivered.approve_collection("order 1", now, 7).unwrap();
        assert_eq!(
            approved.collection().unwrap().status,
            CollectionStatus::FullyCollected
        );
        assert!(approved.is_collection_approved());
    }

    #[test]
    fn collect_pending_moves_cash_and_settles() {
        let now = Utc::now();
        let delivered = OrderState::Delivered {
            memo: memo(),
            printed_at: now,
            assignment: assignment(),
            collection: Collection::from_delivery(dec!(90), 0, 3, CollectionSource::MobileApp)
                .unwrap(),
        };
        assert_matches!(
            delivered.clone().collect_pending("order 1", dec!(10)),
            Err(ServiceError::InvalidState { .. })
        );
        let approved = delivered.approve_collection("order 1", now, 7).unwrap();
        assert_eq!(
            approved.collection().unwrap().status,
            CollectionStatus::Postponed
        );
        let partly = approved.collect_pending("order 1", dec!(40)).unwrap();
        let c = partly.collection().unwrap();
        assert_eq!((c.collected, c.pending), (dec!(40), dec!(50)));
        assert!(partly.clone().collect_pending("order 1", dec!(60)).is_err());

        let settled = partly.collect_pending("order 1", dec!(50)).unwrap();
        assert_eq!(
            settled.collection().unwrap().status,
            CollectionStatus::FullyCollected
        );
    }

    #[test]
    fn impossible_rows_are_rejected() {
        let mut model = base_model();
        model.stage = "Printed".into();
        model.memo_number = Some("12345678".into());
        assert_matches!(
            OrderState::try_from(&model),
            Err(ServiceError::InternalError(_))
        );

        let mut model = base_model();
        model.stage = "Submitted".into();
        model.printed_at = Some(Utc::now());
        assert_matches!(
            OrderState::try_from(&model),
            Err(ServiceError::InternalError(_))
        );

        let mut model = base_model();
        model.stage = "Shipped".into();
        assert_matches!(
            OrderState::try_from(&model),
            Err(ServiceError::InternalError(_))
        );
    }
}
