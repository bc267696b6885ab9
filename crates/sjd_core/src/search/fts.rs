//! SQLite FTS5-based note search.
//!
//! # Responsibility
//! - Provide keyword search over case note content.
//! - Return typed hits with folder context and a highlighted snippet.
//!
//! # Invariants
//! - Result ordering is deterministic by rank, `updated_at`, then id.
//! - Without raw syntax, every term is quoted so user text never breaks MATCH.

use crate::db::DbError;
use crate::model::document::{FolderId, NoteId};
use crate::model::user::UserId;
use crate::search::{clamp_limit, SearchError, SearchResult, DEFAULT_SEARCH_LIMIT};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};

/// Search options for full-text note queries.
#[derive(Debug, Clone)]
pub struct NoteSearchQuery {
    /// User query text.
    pub text: String,
    /// Restricts hits to one folder.
    pub folder_id: Option<FolderId>,
    /// Maximum number of hits to return.
    pub limit: u32,
    /// Whether to pass text directly as raw FTS5 expression.
    pub raw_fts_syntax: bool,
}

impl NoteSearchQuery {
    /// Creates a query with default pagination and no folder filter.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            folder_id: None,
            limit: DEFAULT_SEARCH_LIMIT,
            raw_fts_syntax: false,
        }
    }
}

/// Single hit returned by [`search_notes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteHit {
    pub note_id: NoteId,
    pub folder_id: FolderId,
    pub author_id: UserId,
    pub snippet: String,
}

/// Searches notes via FTS5 and returns ranked results.
///
/// Returns an empty list for blank queries.
pub fn search_notes(conn: &Connection, query: &NoteSearchQuery) -> SearchResult<Vec<NoteHit>> {
    let Some(match_expr) = build_match_expression(query) else {
        return Ok(Vec::new());
    };

    let limit = clamp_limit(query.limit);
    if limit == 0 {
        return Ok(Vec::new());
    }

    let mut sql = String::from(
        "SELECT
            notes.id AS id,
            notes.folder_id AS folder_id,
            notes.author_id AS author_id,
            snippet(notes_fts, 0, '[', ']', ' ... ', 10) AS snippet
         FROM notes_fts
         JOIN notes ON notes.id = notes_fts.rowid
         WHERE notes_fts MATCH ?",
    );
    let mut bind_values: Vec<Value> = vec![Value::Text(match_expr.clone())];

    if let Some(folder_id) = query.folder_id {
        sql.push_str(" AND notes.folder_id = ?");
        bind_values.push(Value::Integer(folder_id));
    }

    sql.push_str(" ORDER BY bm25(notes_fts), notes.updated_at DESC, notes.id ASC LIMIT ?");
    bind_values.push(Value::Integer(i64::from(limit)));

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt
        .query(params_from_iter(bind_values))
        .map_err(|err| map_query_error(err, &match_expr))?;
    let mut hits = Vec::new();

    while let Some(row) = rows
        .next()
        .map_err(|err| map_query_error(err, &match_expr))?
    {
        hits.push(parse_note_hit(row)?);
    }

    Ok(hits)
}

fn parse_note_hit(row: &Row<'_>) -> SearchResult<NoteHit> {
    Ok(NoteHit {
        note_id: row.get("id")?,
        folder_id: row.get("folder_id")?,
        author_id: row.get("author_id")?,
        snippet: row.get("snippet")?,
    })
}

fn build_match_expression(query: &NoteSearchQuery) -> Option<String> {
    let text = query.text.trim();
    if text.is_empty() {
        return None;
    }

    if query.raw_fts_syntax {
        return Some(text.to_string());
    }

    let terms = text
        .split_whitespace()
        .map(escape_fts_term)
        .collect::<Vec<_>>();
    Some(terms.join(" AND "))
}

fn escape_fts_term(raw: &str) -> String {
    let escaped = raw.replace('"', "\"\"");
    format!("\"{escaped}\"")
}

fn map_query_error(err: rusqlite::Error, query: &str) -> SearchError {
    if is_match_syntax_error(&err) {
        return SearchError::InvalidQuery {
            query: query.to_string(),
            message: err.to_string(),
        };
    }

    SearchError::Db(DbError::Sqlite(err))
}

fn is_match_syntax_error(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => {
            let msg = message.to_lowercase();
            (msg.contains("fts5") && msg.contains("syntax"))
                || msg.contains("malformed match expression")
                || msg.contains("unterminated")
        }
        _ => false,
    }
}
