//! Fixed-size SQLite connection pool backed by `r2d2`.
//!
//! # Responsibility
//! - Migrate the database once, then open every pooled connection at startup.
//! - Lend connections exclusively through [`PooledConnection`] guards.
//! - Roll back abandoned transactions when a guard is dropped.
//!
//! # Invariants
//! - A connection is held by at most one guard at a time.
//! - Every successful `acquire` is matched by exactly one release.
//! - Idle connections are always in autocommit mode; a connection that
//!   cannot be rolled back is discarded by the pool and replaced.

use super::open::{configure_connection, open_db};
use super::DbError;
use log::{error, info, warn};
use r2d2::ManageConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

const DEFAULT_POOL_SIZE: usize = 4;
const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Pool sizing and wait policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of connections opened at startup.
    pub size: usize,
    /// Longest time `acquire` waits for an idle connection.
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_POOL_SIZE,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
        }
    }
}

/// Errors from pool startup and acquisition.
#[derive(Debug)]
pub enum PoolError {
    /// Pool size must be between one and `u32::MAX` connections.
    InvalidSize(usize),
    /// Acquire timeout must be longer than zero.
    InvalidTimeout,
    /// Opening or migrating the database failed.
    Db(DbError),
    /// The pool could not open its initial connections.
    Build(r2d2::Error),
    /// No connection became idle before the acquire timeout elapsed.
    Timeout { waited: Duration, source: r2d2::Error },
}

impl Display for PoolError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSize(size) => write!(f, "invalid pool size {size}"),
            Self::InvalidTimeout => write!(f, "pool acquire timeout must be positive"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Build(err) => write!(f, "failed to open pooled connections: {err}"),
            Self::Timeout { waited, source } => write!(
                f,
                "timed out after {}ms waiting for a pooled connection: {source}",
                waited.as_millis()
            ),
        }
    }
}

impl Error for PoolError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Build(err) | Self::Timeout { source: err, .. } => Some(err),
            Self::InvalidSize(_) | Self::InvalidTimeout => None,
        }
    }
}

impl From<DbError> for PoolError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

/// Point-in-time pool counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Configured number of connections.
    pub size: usize,
    /// Connections currently waiting in the pool.
    pub idle: usize,
    /// Total successful acquisitions since startup.
    pub acquired: u64,
    /// Total releases since startup.
    pub released: u64,
}

impl PoolStats {
    /// Connections currently lent out.
    pub fn outstanding(&self) -> u64 {
        self.acquired.saturating_sub(self.released)
    }
}

/// `r2d2_sqlite` manager that refuses connections left inside a transaction.
struct SqliteManager {
    inner: SqliteConnectionManager,
}

impl ManageConnection for SqliteManager {
    type Connection = Connection;
    type Error = rusqlite::Error;

    fn connect(&self) -> Result<Connection, rusqlite::Error> {
        self.inner.connect()
    }

    fn is_valid(&self, conn: &mut Connection) -> Result<(), rusqlite::Error> {
        self.inner.is_valid(conn)
    }

    fn has_broken(&self, conn: &mut Connection) -> bool {
        !conn.is_autocommit()
    }
}

/// Process-wide pool of migrated SQLite connections to one database file.
///
/// Created once at startup and passed by reference to the components that
/// need exclusive connections.
pub struct ConnectionPool {
    path: PathBuf,
    size: usize,
    inner: r2d2::Pool<SqliteManager>,
    acquired: AtomicU64,
    released: AtomicU64,
}

impl ConnectionPool {
    /// Applies pending migrations to `path`, then opens `config.size`
    /// connections that only receive connection pragmas.
    pub fn open(path: impl AsRef<Path>, config: PoolConfig) -> Result<Self, PoolError> {
        let max_size = match u32::try_from(config.size) {
            Ok(size) if size > 0 => size,
            _ => return Err(PoolError::InvalidSize(config.size)),
        };
        if config.acquire_timeout.is_zero() {
            return Err(PoolError::InvalidTimeout);
        }

        let path = path.as_ref().to_path_buf();
        drop(open_db(&path)?);

        let manager = SqliteManager {
            inner: SqliteConnectionManager::file(&path).with_init(configure_connection),
        };
        let inner = r2d2::Pool::builder()
            .max_size(max_size)
            .min_idle(Some(max_size))
            .idle_timeout(None)
            .max_lifetime(None)
            .connection_timeout(config.acquire_timeout)
            .build(manager)
            .map_err(|err| {
                error!(
                    "event=pool_open module=db status=error error_code=pool_build_failed error={}",
                    err
                );
                PoolError::Build(err)
            })?;

        info!(
            "event=pool_open module=db status=ok size={} acquire_timeout_ms={}",
            config.size,
            config.acquire_timeout.as_millis()
        );

        Ok(Self {
            path,
            size: config.size,
            inner,
            acquired: AtomicU64::new(0),
            released: AtomicU64::new(0),
        })
    }

    /// Database file served by this pool.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Borrows one connection exclusively, waiting up to the configured
    /// timeout when every connection is in use.
    pub fn acquire(&self) -> Result<PooledConnection<'_>, PoolError> {
        let started_at = Instant::now();
        match self.inner.get() {
            Ok(conn) => {
                self.acquired.fetch_add(1, Ordering::SeqCst);
                Ok(PooledConnection { pool: self, conn })
            }
            Err(source) => {
                let waited = started_at.elapsed();
                warn!(
                    "event=pool_acquire module=db status=error error_code=pool_timeout waited_ms={}",
                    waited.as_millis()
                );
                Err(PoolError::Timeout { waited, source })
            }
        }
    }

    /// Returns current counters.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            size: self.size,
            idle: self.inner.state().idle_connections as usize,
            acquired: self.acquired.load(Ordering::SeqCst),
            released: self.released.load(Ordering::SeqCst),
        }
    }
}

/// Exclusive loan of one pooled connection.
///
/// Dereferences to [`rusqlite::Connection`]; the connection goes back to the
/// pool exactly once, when the guard is dropped.
pub struct PooledConnection<'pool> {
    pool: &'pool ConnectionPool,
    conn: r2d2::PooledConnection<SqliteManager>,
}

impl Deref for PooledConnection<'_> {
    type Target = Connection;

    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl DerefMut for PooledConnection<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}

impl Drop for PooledConnection<'_> {
    // Runs before the inner r2d2 guard hands the connection back.
    fn drop(&mut self) {
        self.pool.released.fetch_add(1, Ordering::SeqCst);
        if self.conn.is_autocommit() {
            return;
        }

        warn!("event=pool_release module=db status=rollback reason=open_transaction");
        if let Err(err) = self.conn.execute_batch("ROLLBACK;") {
            error!(
                "event=pool_release module=db status=error error_code=rollback_failed action=discard error={}",
                err
            );
        }
    }
}
