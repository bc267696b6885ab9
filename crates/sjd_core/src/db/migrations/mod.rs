//! Schema history of the SJD database, tracked in `PRAGMA user_version`.
//!
//! Three steps exist today:
//! 1. `users`: accounts with a role and a case-insensitive unique email.
//! 2. `hearings`: hearings owned by a judge plus ordered participant links.
//! 3. `case_documents`: folders, file metadata, notes and the `notes_fts` index.
//!
//! [`crate::db::ConnectionPool::open`] runs the pending steps once, through a
//! single bootstrap connection, before any pooled connection exists.
//!
//! # Invariants
//! - Step numbers start at 1 and grow by one; each file is never edited after
//!   release, only followed by a new step.
//! - All pending steps commit together or not at all.
//! - A database newer than this binary is refused, never downgraded.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        name: "users",
        sql: include_str!("0001_users.sql"),
    },
    SchemaStep {
        version: 2,
        name: "hearings",
        sql: include_str!("0002_hearings.sql"),
    },
    SchemaStep {
        version: 3,
        name: "case_documents",
        sql: include_str!("0003_case_documents.sql"),
    },
];

/// Highest schema version this build can create.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |step| step.version)
}

/// Brings `conn` up to [`latest_version`] inside one transaction.
///
/// Returns [`DbError::UnsupportedSchemaVersion`] when the file was written by
/// a newer build.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from_version = current_user_version(conn)?;
    let latest = latest_version();
    if from_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from_version,
            latest_supported: latest,
        });
    }

    let mut pending = SCHEMA_STEPS
        .iter()
        .filter(|step| step.version > from_version)
        .peekable();
    if pending.peek().is_none() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for step in pending {
        debug!(
            "event=db_migrate module=db status=step version={} name={}",
            step.version, step.name
        );
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", step.version)?;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={}",
        from_version, latest
    );
    Ok(())
}

/// Schema version recorded in the database file; 0 for a fresh file.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::SCHEMA_STEPS;

    #[test]
    fn steps_are_numbered_consecutively_from_one() {
        for (index, step) in SCHEMA_STEPS.iter().enumerate() {
            assert_eq!(step.version as usize, index + 1, "step {}", step.name);
        }
    }
}
