/*!
 * Bounded transactions for engine operations.
 *
 * Every business operation opens its transaction through [`begin`] and runs
 * its whole body under [`bounded`], so lock waits and slow statements end in a
 * retryable `LockTimeout` instead of hanging the request. Dropping the
 * transaction on any error path rolls it back.
 */

use crate::errors::ServiceError;
use crate::metrics;
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, Statement,
    TransactionTrait,
};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Opens a transaction; on PostgreSQL lock waits are capped at `timeout`.
pub async fn begin(
    db: &DatabaseConnection,
    timeout: Duration,
) -> Result<DatabaseTransaction, ServiceError> {
    let txn = db.begin().await.map_err(ServiceError::DatabaseError)?;
    if txn.get_database_backend() == DbBackend::Postgres {
        let sql = format!("SET LOCAL lock_timeout = '{}ms'", timeout.as_millis());
        txn.execute(Statement::from_string(DbBackend::Postgres, sql))
            .await
            .map_err(ServiceError::DatabaseError)?;
    }
    Ok(txn)
}

/// Runs `work` with a deadline, translating lock failures into `LockTimeout`.
pub async fn bounded<T, Fut>(
    operation: &'static str,
    timeout: Duration,
    work: Fut,
) -> Result<T, ServiceError>
where
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let started = Instant::now();
    let result = match tokio::time::timeout(timeout, work).await {
        Ok(result) => result.map_err(|err| {
            if matches!(err, ServiceError::DatabaseError(_)) && err.is_retryable() {
                ServiceError::LockTimeout(format!("{} could not acquire its locks", operation))
            } else {
                err
            }
        }),
        Err(_) => Err(ServiceError::LockTimeout(format!(
            "{} exceeded {} ms",
            operation,
            timeout.as_millis()
        ))),
    };

    let elapsed = started.elapsed();
    let outcome = match &result {
        Ok(_) => "committed",
        Err(ServiceError::LockTimeout(_)) => "timed_out",
        Err(_) => "rolled_back",
    };
    metrics::record_transaction(operation, outcome, elapsed.as_secs_f64());
    match &result {
        Ok(_) => debug!(operation, duration = ?elapsed, "Transaction committed"),
        Err(e) => warn!(operation, duration = ?elapsed, error = %e, "Transaction rolled back"),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::DbErr;

    #[tokio::test]
    async fn elapsed_deadline_is_a_lock_timeout() {
        let result: Result<(), _> = bounded("test.sleep", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(())
        })
        .await;
        let err = result.unwrap_err();
        assert!(matches!(err, ServiceError::LockTimeout(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn lock_failures_are_translated() {
        let result: Result<(), _> = bounded("test.lock", Duration::from_secs(1), async {
            Err(ServiceError::DatabaseError(DbErr::Custom(
                "database is locked".into(),
            )))
        })
        .await;
        assert!(matches!(result, Err(ServiceError::LockTimeout(_))));
    }

    #[tokio::test]
    async fn business_errors_pass_through() {
        let result: Result<(), _> = bounded("test.validation", Duration::from_secs(1), async {
            Err(ServiceError::ValidationError("no items".into()))
        })
        .await;
        assert!(matches!(result, Err(ServiceError::ValidationError(_))));
    }
}
