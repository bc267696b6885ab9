//! All-or-nothing write batches over one pooled connection.
//!
//! # Responsibility
//! - Acquire an exclusive connection, open an immediate transaction, run an
//!   ordered batch of dependent writes, then commit or roll back.
//! - Classify failures into one [`WriteError`] for the caller.
//!
//! # Invariants
//! - Either every write of the batch is committed or none is visible.
//! - The connection is released on every exit path, after commit/rollback.
//! - Commit and rollback failures are surfaced, never swallowed.
//! - No retries happen here; retry policy belongs to callers.

use super::pool::{ConnectionPool, PoolError};
use super::is_constraint_violation;
use log::{debug, error, info, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Transaction step that failed in [`WriteError::Transaction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStage {
    Commit,
    Rollback,
}

impl Display for TransactionStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Commit => write!(f, "commit"),
            Self::Rollback => write!(f, "rollback"),
        }
    }
}

/// Failure of one unit of work.
#[derive(Debug)]
pub enum WriteError {
    /// Input rejected before any transaction was started.
    Validation(String),
    /// The store rejected a write (foreign key, unique, check, not-null).
    Constraint(rusqlite::Error),
    /// No connection could be acquired.
    Pool(PoolError),
    /// The working session failed while the transaction was open.
    Connection(rusqlite::Error),
    /// Commit or rollback itself failed; store state must be treated as
    /// unknown by the caller.
    Transaction {
        stage: TransactionStage,
        source: rusqlite::Error,
        /// Failure that triggered the rollback, when `stage` is `Rollback`.
        aborted_by: Option<Box<WriteError>>,
    },
}

impl WriteError {
    /// True for [`WriteError::Pool`] and [`WriteError::Connection`].
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, Self::Pool(_) | Self::Connection(_))
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Constraint(_) => "constraint",
            Self::Pool(_) => "pool",
            Self::Connection(_) => "connection",
            Self::Transaction { .. } => "transaction",
        }
    }
}

impl Display for WriteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(message) => write!(f, "invalid write input: {message}"),
            Self::Constraint(err) => write!(f, "store constraint rejected write: {err}"),
            Self::Pool(err) => write!(f, "connection unavailable: {err}"),
            Self::Connection(err) => write!(f, "connection failed during write: {err}"),
            Self::Transaction {
                stage,
                source,
                aborted_by: Some(cause),
            } => write!(f, "{stage} failed after `{cause}`: {source}"),
            Self::Transaction {
                stage,
                source,
                aborted_by: None,
            } => write!(f, "{stage} failed: {source}"),
        }
    }
}

impl Error for WriteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(_) => None,
            Self::Constraint(err) => Some(err),
            Self::Pool(err) => Some(err),
            Self::Connection(err) => Some(err),
            Self::Transaction { source, .. } => Some(source),
        }
    }
}

impl From<rusqlite::Error> for WriteError {
    fn from(value: rusqlite::Error) -> Self {
        if is_constraint_violation(&value) {
            Self::Constraint(value)
        } else {
            Self::Connection(value)
        }
    }
}

impl From<PoolError> for WriteError {
    fn from(value: PoolError) -> Self {
        Self::Pool(value)
    }
}

/// Runs `work` inside one immediate transaction on a pooled connection.
///
/// `op` names the batch in log events. `work` receives the open transaction
/// and should issue its statements in order, returning on the first error;
/// the whole batch is then rolled back.
///
/// # Errors
/// - [`WriteError::Pool`] when no connection can be acquired.
/// - Whatever `work` returns, after a successful rollback.
/// - [`WriteError::Transaction`] when commit or rollback fails.
pub fn run_unit_of_work<T, F>(
    pool: &ConnectionPool,
    op: &'static str,
    work: F,
) -> Result<T, WriteError>
where
    F: FnOnce(&Transaction<'_>) -> Result<T, WriteError>,
{
    let started_at = Instant::now();
    debug!("event=unit_of_work module=db status=start op={op}");

    let mut conn = match pool.acquire() {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=unit_of_work module=db status=error op={} duration_ms={} error_code=pool error={}",
                op,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    let result = execute_in_transaction(&mut conn, work);
    drop(conn);

    match &result {
        Ok(_) => info!(
            "event=unit_of_work module=db status=ok op={} duration_ms={}",
            op,
            started_at.elapsed().as_millis()
        ),
        Err(err @ WriteError::Transaction { .. }) => error!(
            "event=unit_of_work module=db status=error op={} duration_ms={} error_code={} error={}",
            op,
            started_at.elapsed().as_millis(),
            err.code(),
            err
        ),
        Err(err) => warn!(
            "event=unit_of_work module=db status=rolled_back op={} duration_ms={} error_code={}",
            op,
            started_at.elapsed().as_millis(),
            err.code()
        ),
    }

    result
}

fn execute_in_transaction<T, F>(conn: &mut Connection, work: F) -> Result<T, WriteError>
where
    F: FnOnce(&Transaction<'_>) -> Result<T, WriteError>,
{
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    match work(&tx) {
        Ok(value) => {
            tx.commit().map_err(|source| WriteError::Transaction {
                stage: TransactionStage::Commit,
                source,
                aborted_by: None,
            })?;
            Ok(value)
        }
        Err(err) => match tx.rollback() {
            Ok(()) => Err(err),
            Err(source) => Err(WriteError::Transaction {
                stage: TransactionStage::Rollback,
                source,
                aborted_by: Some(Box::new(err)),
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{run_unit_of_work, WriteError};
    use crate::db::{ConnectionPool, PoolConfig};

    fn pool() -> (tempfile::TempDir, ConnectionPool) {
        let dir = tempfile::tempdir().unwrap();
        let pool = ConnectionPool::open(dir.path().join("uow.db"), PoolConfig::default()).unwrap();
        (dir, pool)
    }

    fn user_count(pool: &ConnectionPool) -> i64 {
        let conn = pool.acquire().unwrap();
        conn.query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))
            .unwrap()
    }

    fn insert_user(tx: &rusqlite::Transaction<'_>, email: &str) -> Result<(), WriteError> {
        tx.execute(
            "INSERT INTO users (email, cpf, full_name, password_hash, role)
             VALUES (?1, '12345678901', 'Someone', 'hash', 'citizen');",
            [email],
        )?;
        Ok(())
    }

    #[test]
    fn commits_every_write_on_success() {
        let (_dir, pool) = pool();
        run_unit_of_work(&pool, "test_batch", |tx| {
            insert_user(tx, "a@example.com")?;
            insert_user(tx, "b@example.com")
        })
        .unwrap();
        assert_eq!(user_count(&pool), 2);
    }

    #[test]
    fn constraint_failure_rolls_back_earlier_writes() {
        let (_dir, pool) = pool();
        let err = run_unit_of_work(&pool, "test_batch", |tx| {
            insert_user(tx, "dup@example.com")?;
            insert_user(tx, "DUP@example.com")
        })
        .unwrap_err();
        assert!(matches!(err, WriteError::Constraint(_)));
        assert_eq!(user_count(&pool), 0);
        assert_eq!(pool.stats().outstanding(), 0);
    }

    #[test]
    fn caller_error_rolls_back_and_is_returned_unchanged() {
        let (_dir, pool) = pool();
        let err = run_unit_of_work(&pool, "test_batch", |tx| -> Result<(), WriteError> {
            insert_user(tx, "a@example.com")?;
            Err(WriteError::Validation("stop".to_string()))
        })
        .unwrap_err();
        assert!(matches!(err, WriteError::Validation(message) if message == "stop"));
        assert_eq!(user_count(&pool), 0);
    }
}
