//! User directory lookup.
//!
//! # Responsibility
//! - Find accounts by partial name, email or CPF.
//!
//! # Invariants
//! - `%` and `_` in user text match literally.
//! - Results are ordered by `full_name COLLATE NOCASE`, then id.

use crate::model::user::{Role, UserProfile};
use crate::repo::user_repo::parse_profile_row;
use crate::search::{clamp_limit, SearchResult, DEFAULT_SEARCH_LIMIT};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

/// Directory query options.
#[derive(Debug, Clone)]
pub struct UserSearchQuery {
    pub text: String,
    /// Restricts hits to one role.
    pub role: Option<Role>,
    /// Clamped to [`crate::search::MAX_SEARCH_LIMIT`].
    pub limit: u32,
}

impl UserSearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            role: None,
            limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

/// Substring search over users. Blank text returns no hits.
pub fn search_users(conn: &Connection, query: &UserSearchQuery) -> SearchResult<Vec<UserProfile>> {
    let text = query.text.trim();
    let limit = clamp_limit(query.limit);
    if text.is_empty() || limit == 0 {
        return Ok(Vec::new());
    }

    let mut sql = String::from(
        "SELECT id, email, cpf, phone, full_name, role
         FROM users
         WHERE (full_name LIKE ? ESCAPE '\\' OR email LIKE ? ESCAPE '\\'",
    );
    let pattern = like_pattern(text);
    let mut bind_values: Vec<Value> = vec![
        Value::Text(pattern.clone()),
        Value::Text(pattern),
    ];

    if let Some(digits) = cpf_fragment(text) {
        sql.push_str(" OR cpf LIKE ?");
        bind_values.push(Value::Text(format!("%{digits}%")));
    }
    sql.push(')');

    if let Some(role) = query.role {
        sql.push_str(" AND role = ?");
        bind_values.push(Value::Text(role.as_str().to_string()));
    }

    sql.push_str(" ORDER BY full_name COLLATE NOCASE ASC, id ASC LIMIT ?");
    bind_values.push(Value::Integer(i64::from(limit)));

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut users = Vec::new();
    while let Some(row) = rows.next()? {
        users.push(parse_profile_row(row)?);
    }
    Ok(users)
}

/// Digits of `text` when it reads as a partial CPF (digits, `.`, `-`, spaces).
fn cpf_fragment(text: &str) -> Option<String> {
    let only_cpf_chars = text
        .chars()
        .all(|ch| ch.is_ascii_digit() || matches!(ch, '.' | '-' | ' '));
    let digits: String = text.chars().filter(|ch| ch.is_ascii_digit()).collect();
    (only_cpf_chars && !digits.is_empty()).then_some(digits)
}

fn like_pattern(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    escaped.push('%');
    for ch in text.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::{cpf_fragment, like_pattern};

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(like_pattern("ana"), "%ana%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn only_cpf_shaped_text_searches_the_cpf_column() {
        assert_eq!(cpf_fragment("111.222-33").as_deref(), Some("11122233"));
        assert_eq!(cpf_fragment("555 666").as_deref(), Some("555666"));
        assert_eq!(cpf_fragment("Ana 1"), None);
        assert_eq!(cpf_fragment("..-"), None);
    }
}
