//! Credential handling.
//!
//! # Responsibility
//! - Hash and verify account passwords.
//!
//! # Invariants
//! - Plain-text passwords are never stored or logged.

pub mod password;
