//! Hearing repository: transactional creation plus read/delete paths.
//!
//! # Responsibility
//! - Persist a hearing and all of its participant links as one unit of work.
//! - Load hearings with their participants for judges and participants.
//!
//! # Invariants
//! - A hearing row is never committed without its participant links.
//! - An empty participant list is rejected before a connection is acquired.
//! - Participant order is kept in `hearing_participants.position`.

use crate::db::{run_unit_of_work, ConnectionPool, WriteError};
use crate::model::hearing::{Hearing, HearingId, HearingInput, SCHEDULED_AT_FORMAT};
use crate::model::user::{Role, UserId};
use crate::repo::user_repo::user_role as load_user_role;
use crate::repo::{RepoError, RepoResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Row, Transaction};
use std::collections::HashSet;

const HEARING_SELECT_SQL: &str = "SELECT
    h.id AS id,
    h.scheduled_at AS scheduled_at,
    h.location AS location,
    h.description AS description,
    h.judge_id AS judge_id,
    h.participant_kind AS participant_kind
FROM hearings h";

/// Individual statements issued inside the hearing unit of work.
///
/// Split out so the unit of work can run against a faulty store in tests.
pub trait HearingStatements {
    /// Inserts the parent row and returns its generated id.
    fn insert_hearing(
        &self,
        tx: &Transaction<'_>,
        input: &HearingInput,
    ) -> rusqlite::Result<HearingId>;

    /// Inserts one participant link at `position` (0-based input order).
    fn insert_participant(
        &self,
        tx: &Transaction<'_>,
        hearing_id: HearingId,
        participant_id: UserId,
        position: usize,
    ) -> rusqlite::Result<()>;
}

/// Plain SQLite statements.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteHearingStatements;

impl HearingStatements for SqliteHearingStatements {
    fn insert_hearing(
        &self,
        tx: &Transaction<'_>,
        input: &HearingInput,
    ) -> rusqlite::Result<HearingId> {
        tx.execute(
            "INSERT INTO hearings (
                scheduled_at,
                location,
                description,
                judge_id,
                participant_kind
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                input.scheduled_at.format(SCHEDULED_AT_FORMAT).to_string(),
                input.location.trim(),
                input.description.as_deref(),
                input.judge_id,
                input.participant_kind.trim(),
            ],
        )?;
        Ok(tx.last_insert_rowid())
    }

    fn insert_participant(
        &self,
        tx: &Transaction<'_>,
        hearing_id: HearingId,
        participant_id: UserId,
        position: usize,
    ) -> rusqlite::Result<()> {
        tx.execute(
            "INSERT INTO hearing_participants (hearing_id, participant_id, position)
             VALUES (?1, ?2, ?3);",
            params![hearing_id, participant_id, position as i64],
        )?;
        Ok(())
    }
}

/// Repository interface for hearings.
pub trait HearingRepository {
    /// Creates a hearing and its participant links atomically.
    ///
    /// Not idempotent: identical calls create distinct hearings.
    fn create_with_participants(
        &self,
        input: &HearingInput,
        participant_ids: &[UserId],
    ) -> Result<HearingId, WriteError>;
    fn get_hearing(&self, id: HearingId) -> RepoResult<Option<Hearing>>;
    /// Hearings owned by one judge, earliest first.
    fn list_for_judge(&self, judge_id: UserId) -> RepoResult<Vec<Hearing>>;
    /// Hearings one user takes part in, earliest first.
    fn list_for_participant(&self, participant_id: UserId) -> RepoResult<Vec<Hearing>>;
    /// Deletes one hearing; participant links go with it.
    fn delete_hearing(&self, id: HearingId) -> RepoResult<()>;
    /// Loads the role of one user, if the user exists.
    fn user_role(&self, user_id: UserId) -> RepoResult<Option<Role>>;
}

/// Pool-backed hearing repository.
pub struct SqliteHearingRepository<'pool, S = SqliteHearingStatements> {
    pool: &'pool ConnectionPool,
    statements: S,
}

impl<'pool> SqliteHearingRepository<'pool> {
    pub fn new(pool: &'pool ConnectionPool) -> Self {
        Self::with_statements(pool, SqliteHearingStatements)
    }
}

impl<'pool, S: HearingStatements> SqliteHearingRepository<'pool, S> {
    /// Creates a repository issuing writes through custom statements.
    pub fn with_statements(pool: &'pool ConnectionPool, statements: S) -> Self {
        Self { pool, statements }
    }
}

impl<S: HearingStatements> HearingRepository for SqliteHearingRepository<'_, S> {
    fn create_with_participants(
        &self,
        input: &HearingInput,
        participant_ids: &[UserId],
    ) -> Result<HearingId, WriteError> {
        input.validate().map_err(WriteError::Validation)?;
        validate_participant_ids(participant_ids)?;

        run_unit_of_work(self.pool, "hearing_create", |tx| {
            let hearing_id = self.statements.insert_hearing(tx, input)?;
            for (position, participant_id) in participant_ids.iter().enumerate() {
                self.statements
                    .insert_participant(tx, hearing_id, *participant_id, position)?;
            }
            Ok(hearing_id)
        })
    }

    fn get_hearing(&self, id: HearingId) -> RepoResult<Option<Hearing>> {
        let conn = self.pool.acquire()?;
        let mut stmt = conn.prepare(&format!("{HEARING_SELECT_SQL} WHERE h.id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_hearing_row(&conn, row)?));
        }
        Ok(None)
    }

    fn list_for_judge(&self, judge_id: UserId) -> RepoResult<Vec<Hearing>> {
        let conn = self.pool.acquire()?;
        let mut stmt = conn.prepare(&format!(
            "{HEARING_SELECT_SQL}
             WHERE h.judge_id = ?1
             ORDER BY h.scheduled_at ASC, h.id ASC;"
        ))?;
        let mut rows = stmt.query([judge_id])?;
        let mut hearings = Vec::new();
        while let Some(row) = rows.next()? {
            hearings.push(parse_hearing_row(&conn, row)?);
        }
        Ok(hearings)
    }

    fn list_for_participant(&self, participant_id: UserId) -> RepoResult<Vec<Hearing>> {
        let conn = self.pool.acquire()?;
        let mut stmt = conn.prepare(&format!(
            "{HEARING_SELECT_SQL}
             INNER JOIN hearing_participants hp ON hp.hearing_id = h.id
             WHERE hp.participant_id = ?1
             ORDER BY h.scheduled_at ASC, h.id ASC;"
        ))?;
        let mut rows = stmt.query([participant_id])?;
        let mut hearings = Vec::new();
        while let Some(row) = rows.next()? {
            hearings.push(parse_hearing_row(&conn, row)?);
        }
        Ok(hearings)
    }

    fn delete_hearing(&self, id: HearingId) -> RepoResult<()> {
        let conn = self.pool.acquire()?;
        let changed = conn.execute("DELETE FROM hearings WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "hearing",
                id,
            });
        }
        Ok(())
    }

    fn user_role(&self, user_id: UserId) -> RepoResult<Option<Role>> {
        let conn = self.pool.acquire()?;
        load_user_role(&conn, user_id)
    }
}

fn validate_participant_ids(participant_ids: &[UserId]) -> Result<(), WriteError> {
    if participant_ids.is_empty() {
        return Err(WriteError::Validation(
            "a hearing needs at least one participant".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(participant_ids.len());
    for participant_id in participant_ids {
        if !seen.insert(*participant_id) {
            return Err(WriteError::Validation(format!(
                "participant {participant_id} is listed more than once"
            )));
        }
    }
    Ok(())
}

fn parse_hearing_row(conn: &Connection, row: &Row<'_>) -> RepoResult<Hearing> {
    let id: HearingId = row.get("id")?;
    let scheduled_text: String = row.get("scheduled_at")?;
    let scheduled_at = NaiveDateTime::parse_from_str(&scheduled_text, SCHEDULED_AT_FORMAT)
        .map_err(|_| {
            RepoError::InvalidData(format!(
                "invalid timestamp `{scheduled_text}` in hearings.scheduled_at"
            ))
        })?;

    Ok(Hearing {
        id,
        scheduled_at,
        location: row.get("location")?,
        description: row.get("description")?,
        judge_id: row.get("judge_id")?,
        participant_kind: row.get("participant_kind")?,
        participant_ids: load_participant_ids(conn, id)?,
    })
}

fn load_participant_ids(conn: &Connection, hearing_id: HearingId) -> RepoResult<Vec<UserId>> {
    let mut stmt = conn.prepare(
        "SELECT participant_id
         FROM hearing_participants
         WHERE hearing_id = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([hearing_id])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        ids.push(row.get(0)?);
    }
    Ok(ids)
}
