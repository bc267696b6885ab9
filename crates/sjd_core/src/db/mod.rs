//! SQLite storage bootstrap, pooling and transactional write entry points.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the SJD core.
//! - Apply schema migrations in deterministic order.
//! - Hand out exclusive pooled connections and run units of work on them.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Core code must not read/write application data before migrations succeed.
//! - A pooled connection is never returned to the pool inside a transaction.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;
pub mod pool;
pub mod unit_of_work;

pub use open::{open_db, open_db_in_memory};
pub use pool::{ConnectionPool, PoolConfig, PoolError, PoolStats, PooledConnection};
pub use unit_of_work::{run_unit_of_work, TransactionStage, WriteError};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Returns whether the error is a SQLite constraint violation
/// (foreign key, unique, check or not-null).
pub fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    err.sqlite_error_code() == Some(rusqlite::ErrorCode::ConstraintViolation)
}
