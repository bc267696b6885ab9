//! User repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist accounts and their password hashes.
//! - Serve profile and credential lookups.
//!
//! # Invariants
//! - Email lookups are case-insensitive.
//! - Profile reads never carry the password hash.

use crate::db::is_constraint_violation;
use crate::model::user::{NewUser, Role, UserId, UserProfile};
use crate::repo::{ensure_schema_ready, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

const PROFILE_SELECT_SQL: &str = "SELECT
    id,
    email,
    cpf,
    phone,
    full_name,
    role
FROM users";

/// Profile plus the stored hash, used only for password checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCredentials {
    pub profile: UserProfile,
    pub password_hash: String,
}

/// Repository interface for account persistence.
pub trait UserRepository {
    /// Inserts one user; a taken email is reported as `Conflict`.
    fn create_user(&self, user: &NewUser) -> RepoResult<UserId>;
    fn email_exists(&self, email: &str) -> RepoResult<bool>;
    fn find_credentials_by_email(&self, email: &str) -> RepoResult<Option<StoredCredentials>>;
    fn find_credentials_by_id(&self, id: UserId) -> RepoResult<Option<StoredCredentials>>;
    fn get_profile(&self, id: UserId) -> RepoResult<Option<UserProfile>>;
    fn update_password_hash(&self, id: UserId, password_hash: &str) -> RepoResult<()>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, user: &NewUser) -> RepoResult<UserId> {
        let inserted = self.conn.execute(
            "INSERT INTO users (
                email,
                cpf,
                phone,
                full_name,
                password_hash,
                role
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                user.email.as_str(),
                user.cpf.as_str(),
                user.phone.as_deref(),
                user.full_name.as_str(),
                user.password_hash.as_str(),
                user.role.as_str(),
            ],
        );

        match inserted {
            Ok(_) => Ok(self.conn.last_insert_rowid()),
            Err(err) if is_constraint_violation(&err) => Err(RepoError::Conflict(format!(
                "email `{}` is already registered",
                user.email
            ))),
            Err(err) => Err(err.into()),
        }
    }

    fn email_exists(&self, email: &str) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1 COLLATE NOCASE);",
            [email],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn find_credentials_by_email(&self, email: &str) -> RepoResult<Option<StoredCredentials>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, email, cpf, phone, full_name, role, password_hash
             FROM users
             WHERE email = ?1 COLLATE NOCASE;",
        )?;
        let mut rows = stmt.query([email])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_credentials_row(row)?));
        }
        Ok(None)
    }

    fn find_credentials_by_id(&self, id: UserId) -> RepoResult<Option<StoredCredentials>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, email, cpf, phone, full_name, role, password_hash
             FROM users
             WHERE id = ?1;",
        )?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_credentials_row(row)?));
        }
        Ok(None)
    }

    fn get_profile(&self, id: UserId) -> RepoResult<Option<UserProfile>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PROFILE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_profile_row(row)?));
        }
        Ok(None)
    }

    fn update_password_hash(&self, id: UserId, password_hash: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE users
             SET password_hash = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id, password_hash],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "user", id });
        }
        Ok(())
    }
}

/// Loads the role of one user, if the user exists.
pub fn user_role(conn: &Connection, id: UserId) -> RepoResult<Option<Role>> {
    let value: Option<String> = conn
        .query_row("SELECT role FROM users WHERE id = ?1;", [id], |row| {
            row.get(0)
        })
        .optional()?;
    value.map(|text| parse_role(&text)).transpose()
}

pub(crate) fn parse_profile_row(row: &Row<'_>) -> RepoResult<UserProfile> {
    let role_text: String = row.get("role")?;
    Ok(UserProfile {
        id: row.get("id")?,
        email: row.get("email")?,
        cpf: row.get("cpf")?,
        phone: row.get("phone")?,
        full_name: row.get("full_name")?,
        role: parse_role(&role_text)?,
    })
}

fn parse_credentials_row(row: &Row<'_>) -> RepoResult<StoredCredentials> {
    Ok(StoredCredentials {
        profile: parse_profile_row(row)?,
        password_hash: row.get("password_hash")?,
    })
}

fn parse_role(value: &str) -> RepoResult<Role> {
    match value {
        "citizen" => Ok(Role::Citizen),
        "judge" => Ok(Role::Judge),
        "legal_entity" => Ok(Role::LegalEntity),
        "public_servant" => Ok(Role::PublicServant),
        other => Err(RepoError::InvalidData(format!(
            "invalid role `{other}` in users.role"
        ))),
    }
}
