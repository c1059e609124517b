//! Number sequences for memo, loading and transfer numbers.
//!
//! A candidate is claimed by inserting it into `number_registry` inside a
//! savepoint. The unique (kind, value) index decides races: a violation rolls
//! back the savepoint only and a fresh candidate is tried.

use chrono::{NaiveDate, Utc};
use rand::Rng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter,
    Set, TransactionTrait,
};
use strum::{AsRefStr, Display};
use tracing::{debug, instrument, warn};

use crate::config::AppConfig;
use crate::entities::{number_registry, order};
use crate::errors::ServiceError;
use crate::metrics::{NUMBERS_GENERATED, NUMBER_COLLISIONS};
use crate::models::MemoNumber;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum NumberKind {
    Memo,
    Loading,
    Transfer,
}

/// Outcome of one claim attempt.
enum Claim {
    Claimed,
    Taken,
}

#[derive(Clone, Debug)]
pub struct SequenceService {
    memo_max_attempts: u32,
    sequence_max_attempts: u32,
}

impl SequenceService {
    pub fn new(memo_max_attempts: u32, sequence_max_attempts: u32) -> Self {
        Self {
            memo_max_attempts: memo_max_attempts.max(1),
            sequence_max_attempts: sequence_max_attempts.max(1),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.memo_max_attempts, config.sequence_max_attempts)
    }

    async fn claim(
        &self,
        txn: &DatabaseTransaction,
        kind: NumberKind,
        value: &str,
    ) -> Result<Claim, ServiceError> {
        let savepoint = txn.begin().await?;
        let inserted = number_registry::ActiveModel {
            kind: Set(kind.to_string()),
            value: Set(value.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&savepoint)
        .await;

        match inserted {
            Ok(_) => {
                savepoint.commit().await?;
                NUMBERS_GENERATED.with_label_values(&[kind.as_ref()]).inc();
                debug!(%kind, value, "Claimed number");
                Ok(Claim::Claimed)
            }
            Err(e) => {
                savepoint.rollback().await?;
                let err = ServiceError::DatabaseError(e);
                if err.is_unique_violation() {
                    NUMBER_COLLISIONS.with_label_values(&[kind.as_ref()]).inc();
                    Ok(Claim::Taken)
                } else {
                    Err(err)
                }
            }
        }
    }

    /// Memos written to orders before the registry existed also count as taken.
    async fn memo_in_use(txn: &DatabaseTransaction, memo: &str) -> Result<bool, ServiceError> {
        let count = order::Entity::find()
            .filter(order::Column::MemoNumber.eq(memo))
            .count(txn)
            .await?;
        Ok(count > 0)
    }

    async fn try_memo(
        &self,
        txn: &DatabaseTransaction,
        candidate: &str,
    ) -> Result<Option<MemoNumber>, ServiceError> {
        if Self::memo_in_use(txn, candidate).await? {
            NUMBER_COLLISIONS
                .with_label_values(&[NumberKind::Memo.as_ref()])
                .inc();
            return Ok(None);
        }
        match self.claim(txn, NumberKind::Memo, candidate).await? {
            Claim::Claimed => Ok(Some(MemoNumber::parse(candidate)?)),
            Claim::Taken => Ok(None),
        }
    }

    /// Claims a memo number, honouring `preferred` when it is still unused.
    ///
    /// After `memo_max_attempts` random collisions a timestamp-derived
    /// candidate is tried once before giving up with `Conflict`.
    #[instrument(skip(self, txn))]
    pub async fn next_memo(
        &self,
        txn: &DatabaseTransaction,
        preferred: Option<&MemoNumber>,
    ) -> Result<MemoNumber, ServiceError> {
        if let Some(preferred) = preferred {
            if let Some(memo) = self.try_memo(txn, preferred.as_str()).await? {
                return Ok(memo);
            }
            debug!(memo = %preferred, "Requested memo number already used");
        }

        for _ in 0..self.memo_max_attempts {
            let candidate = random_memo();
            if let Some(memo) = self.try_memo(txn, &candidate).await? {
                return Ok(memo);
            }
        }

        let fallback = timestamp_memo(Utc::now().timestamp_millis());
        warn!(fallback, "Random memo candidates exhausted, using timestamp memo");
        self.try_memo(txn, &fallback).await?.ok_or_else(|| {
            ServiceError::Conflict("could not allocate a unique memo number".to_string())
        })
    }

    async fn next_sequential(
        &self,
        txn: &DatabaseTransaction,
        kind: NumberKind,
        prefix: &str,
    ) -> Result<String, ServiceError> {
        for _ in 0..self.sequence_max_attempts {
            let claimed = number_registry::Entity::find()
                .filter(number_registry::Column::Kind.eq(kind.to_string()))
                .filter(number_registry::Column::Value.starts_with(prefix))
                .all(txn)
                .await?;
            let last = claimed
                .iter()
                .filter_map(|row| sequence_suffix(&row.value, prefix))
                .max()
                .unwrap_or(0);

            let candidate = format!("{}{:04}", prefix, last + 1);
            if let Claim::Claimed = self.claim(txn, kind, &candidate).await? {
                return Ok(candidate);
            }
        }
        Err(ServiceError::Conflict(format!(
            "could not allocate a {} number after {} attempts",
            kind, self.sequence_max_attempts
        )))
    }

    /// Next `YYYYMMDD-NNNN` loading number of `date`; route suffixes are appended by the caller.
    #[instrument(skip(self, txn))]
    pub async fn next_loading_number(
        &self,
        txn: &DatabaseTransaction,
        date: NaiveDate,
    ) -> Result<String, ServiceError> {
        let prefix = format!("{}-", date.format("%Y%m%d"));
        self.next_sequential(txn, NumberKind::Loading, &prefix).await
    }

    /// Next `TRF-YYYYMMDD-NNNN` transfer number of `date`.
    #[instrument(skip(self, txn))]
    pub async fn next_transfer_number(
        &self,
        txn: &DatabaseTransaction,
        date: NaiveDate,
    ) -> Result<String, ServiceError> {
        let prefix = format!("TRF-{}-", date.format("%Y%m%d"));
        self.next_sequential(txn, NumberKind::Transfer, &prefix).await
    }
}

fn random_memo() -> String {
    rand::thread_rng()
        .gen_range(10_000_000u32..=99_999_999)
        .to_string()
}

fn timestamp_memo(millis: i64) -> String {
    format!("{:08}", millis.rem_euclid(100_000_000))
}

/// Numeric counter following `prefix`, ignoring any route suffix.
fn sequence_suffix(value: &str, prefix: &str) -> Option<u32> {
    let rest = value.strip_prefix(prefix)?;
    let digits = rest.split('-').next()?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Appends the sorted distinct route codes when a loading spans several routes.
pub fn with_route_suffix(base: &str, route_codes: &[String]) -> String {
    let mut codes: Vec<&str> = route_codes.iter().map(String::as_str).collect();
    codes.sort_unstable();
    codes.dedup();
    if codes.len() > 1 {
        format!("{}-{}", base, codes.join("-"))
    } else {
        base.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memo_candidates_are_eight_digits() {
        for _ in 0..100 {
            assert!(MemoNumber::parse(&random_memo()).is_ok());
        }
        assert_eq!(timestamp_memo(1_741_512_345_678), "12345678");
        assert_eq!(timestamp_memo(42), "00000042");
    }

    #[test]
    fn suffix_parsing_skips_route_codes() {
        assert_eq!(sequence_suffix("20250309-0007", "20250309-"), Some(7));
        assert_eq!(sequence_suffix("20250309-0012-N1-S2", "20250309-"), Some(12));
        assert_eq!(sequence_suffix("TRF-20250309-0003", "TRF-20250309-"), Some(3));
        assert_eq!(sequence_suffix("20250310-0001", "20250309-"), None);
        assert_eq!(sequence_suffix("20250309-abc", "20250309-"), None);
    }

    #[test]
    fn route_suffix_only_for_multi_route_loads() {
        let single = vec!["N1".to_string(), "N1".to_string()];
        assert_eq!(with_route_suffix("20250309-0001", &single), "20250309-0001");

        let multi = vec!["S2".to_string(), "N1".to_string(), "S2".to_string()];
        assert_eq!(
            with_route_suffix("20250309-0001", &multi),
            "20250309-0001-N1-S2"
        );
    }

    #[test]
    fn kinds_are_snake_case() {
        assert_eq!(NumberKind::Memo.to_string(), "memo");
        assert_eq!(NumberKind::Transfer.as_ref(), "transfer");
    }
}
