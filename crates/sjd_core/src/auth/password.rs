//! Argon2 password hashing.
//!
//! Hashes are PHC strings (`$argon2id$v=19$...`) carrying their own salt and
//! parameters, so verification needs nothing but the stored text.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Password hashing failure.
#[derive(Debug)]
pub enum PasswordError {
    /// Hashing backend failed.
    Hash(String),
    /// Stored hash is not a valid PHC string.
    MalformedHash(String),
}

impl Display for PasswordError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hash(message) => write!(f, "password hashing failed: {message}"),
            Self::MalformedHash(message) => write!(f, "stored password hash is malformed: {message}"),
        }
    }
}

impl Error for PasswordError {}

/// Hashes `password` with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| PasswordError::Hash(err.to_string()))
}

/// Returns whether `password` matches `stored_hash`.
///
/// A mismatch is `Ok(false)`; only unreadable hashes are errors.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, PasswordError> {
    let parsed =
        PasswordHash::new(stored_hash).map_err(|err| PasswordError::MalformedHash(err.to_string()))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(err) => Err(PasswordError::Hash(err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::{hash_password, verify_password, PasswordError};

    #[test]
    fn hash_verifies_only_the_original_password() {
        let hash = hash_password("s3cret!").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("s3cret!", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn same_password_hashes_differently() {
        let first = hash_password("repeat").unwrap();
        let second = hash_password("repeat").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn malformed_hash_is_an_error() {
        let err = verify_password("x", "not-a-hash").unwrap_err();
        assert!(matches!(err, PasswordError::MalformedHash(_)));
    }
}
