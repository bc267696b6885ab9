//! Account use-case service.
//!
//! # Responsibility
//! - Validate and normalize registration input.
//! - Check credentials for login and password change.
//! - Map each role to its front-end landing route.
//!
//! # Invariants
//! - Emails are stored trimmed and lowercased.
//! - CPF is stored as 11 digits without punctuation.
//! - The old password is verified before a new one is stored.
//! - Log events carry ids and roles only, never emails or passwords.

use crate::auth::password::{hash_password, verify_password, PasswordError};
use crate::model::user::{NewUser, Role, UserId, UserProfile};
use crate::repo::user_repo::UserRepository;
use crate::repo::RepoError;
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Shortest accepted password, in characters.
pub const MIN_PASSWORD_CHARS: usize = 6;
const CPF_DIGITS: usize = 11;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Errors from account use-cases.
#[derive(Debug)]
pub enum AccountError {
    InvalidEmail(String),
    /// CPF does not contain exactly 11 digits.
    InvalidCpf(String),
    /// Full name is blank after trim.
    InvalidName,
    WeakPassword {
        min_chars: usize,
    },
    EmailTaken(String),
    /// Login email is not registered.
    UnknownEmail(String),
    UserNotFound(UserId),
    WrongPassword,
    Password(PasswordError),
    Repo(RepoError),
}

impl Display for AccountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidEmail(value) => write!(f, "invalid email: `{value}`"),
            Self::InvalidCpf(value) => write!(f, "invalid CPF: `{value}`"),
            Self::InvalidName => write!(f, "full name must not be blank"),
            Self::WeakPassword { min_chars } => {
                write!(f, "password must have at least {min_chars} characters")
            }
            Self::EmailTaken(email) => write!(f, "email already registered: {email}"),
            Self::UnknownEmail(email) => write!(f, "no account for email: {email}"),
            Self::UserNotFound(id) => write!(f, "user not found: {id}"),
            Self::WrongPassword => write!(f, "wrong password"),
            Self::Password(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AccountError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Password(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for AccountError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity: "user", id } => Self::UserNotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<PasswordError> for AccountError {
    fn from(value: PasswordError) -> Self {
        Self::Password(value)
    }
}

/// Raw registration input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterRequest {
    pub email: String,
    pub cpf: String,
    pub phone: Option<String>,
    pub full_name: String,
    pub password: String,
    pub role: Role,
}

/// Authenticated account plus where the front-end should send it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountLanding {
    pub profile: UserProfile,
    pub home_route: &'static str,
}

impl AccountLanding {
    fn for_profile(profile: UserProfile) -> Self {
        let home_route = profile.role.home_route();
        Self {
            profile,
            home_route,
        }
    }
}

/// Account service facade over a user repository.
pub struct AccountService<R: UserRepository> {
    repo: R,
}

impl<R: UserRepository> AccountService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Registers a new account.
    pub fn register(&self, request: RegisterRequest) -> Result<AccountLanding, AccountError> {
        let email = normalize_email(&request.email)?;
        let cpf = normalize_cpf(&request.cpf)?;
        let full_name = request.full_name.trim();
        if full_name.is_empty() {
            return Err(AccountError::InvalidName);
        }
        ensure_password_strength(&request.password)?;

        if self.repo.email_exists(&email)? {
            return Err(AccountError::EmailTaken(email));
        }

        let user = NewUser {
            email: email.clone(),
            cpf,
            phone: normalize_phone(request.phone),
            full_name: full_name.to_string(),
            password_hash: hash_password(&request.password)?,
            role: request.role,
        };
        let id = match self.repo.create_user(&user) {
            Ok(id) => id,
            Err(RepoError::Conflict(_)) => return Err(AccountError::EmailTaken(email)),
            Err(err) => return Err(err.into()),
        };

        info!(
            "event=account_register module=service status=ok user_id={} role={}",
            id, user.role
        );
        let profile = self.repo.get_profile(id)?.ok_or(AccountError::UserNotFound(id))?;
        Ok(AccountLanding::for_profile(profile))
    }

    /// Checks email/password and returns the account landing.
    pub fn login(&self, email: &str, password: &str) -> Result<AccountLanding, AccountError> {
        let email = email.trim().to_lowercase();
        let credentials = self
            .repo
            .find_credentials_by_email(&email)?
            .ok_or_else(|| AccountError::UnknownEmail(email.clone()))?;

        if !verify_password(password, &credentials.password_hash)? {
            warn!(
                "event=account_login module=service status=denied user_id={}",
                credentials.profile.id
            );
            return Err(AccountError::WrongPassword);
        }

        info!(
            "event=account_login module=service status=ok user_id={} role={}",
            credentials.profile.id, credentials.profile.role
        );
        Ok(AccountLanding::for_profile(credentials.profile))
    }

    /// Loads the account details shown on the profile page.
    pub fn profile(&self, user_id: UserId) -> Result<UserProfile, AccountError> {
        self.repo
            .get_profile(user_id)?
            .ok_or(AccountError::UserNotFound(user_id))
    }

    /// Replaces the password after verifying the current one.
    pub fn change_password(
        &self,
        user_id: UserId,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AccountError> {
        let credentials = self
            .repo
            .find_credentials_by_id(user_id)?
            .ok_or(AccountError::UserNotFound(user_id))?;

        if !verify_password(old_password, &credentials.password_hash)? {
            warn!("event=password_change module=service status=denied user_id={user_id}");
            return Err(AccountError::WrongPassword);
        }
        ensure_password_strength(new_password)?;

        self.repo
            .update_password_hash(user_id, &hash_password(new_password)?)?;
        info!("event=password_change module=service status=ok user_id={user_id}");
        Ok(())
    }
}

/// Trims and lowercases an email, rejecting malformed values.
pub fn normalize_email(value: &str) -> Result<String, AccountError> {
    let normalized = value.trim().to_lowercase();
    if !EMAIL_RE.is_match(&normalized) {
        return Err(AccountError::InvalidEmail(value.to_string()));
    }
    Ok(normalized)
}

/// Strips CPF punctuation (`123.456.789-01` -> `12345678901`).
pub fn normalize_cpf(value: &str) -> Result<String, AccountError> {
    let digits: String = value.chars().filter(|ch| ch.is_ascii_digit()).collect();
    let only_cpf_chars = value
        .chars()
        .all(|ch| ch.is_ascii_digit() || matches!(ch, '.' | '-' | ' '));
    if digits.len() != CPF_DIGITS || !only_cpf_chars {
        return Err(AccountError::InvalidCpf(value.to_string()));
    }
    Ok(digits)
}

fn normalize_phone(value: Option<String>) -> Option<String> {
    value
        .map(|phone| phone.trim().to_string())
        .filter(|phone| !phone.is_empty())
}

fn ensure_password_strength(password: &str) -> Result<(), AccountError> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AccountError::WeakPassword {
            min_chars: MIN_PASSWORD_CHARS,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{normalize_cpf, normalize_email, AccountError};

    #[test]
    fn cpf_punctuation_is_stripped() {
        assert_eq!(normalize_cpf("123.456.789-01").unwrap(), "12345678901");
        assert!(matches!(
            normalize_cpf("1234"),
            Err(AccountError::InvalidCpf(_))
        ));
        assert!(matches!(
            normalize_cpf("123456789ab"),
            Err(AccountError::InvalidCpf(_))
        ));
    }

    #[test]
    fn email_is_lowercased_and_checked() {
        assert_eq!(
            normalize_email("  Maria@Example.COM ").unwrap(),
            "maria@example.com"
        );
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("a@b").is_err());
    }
}
