//! Domain model for accounts, hearings and case documents.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Own enum <-> storage text mappings so every layer agrees on them.
//!
//! # Invariants
//! - Identifiers are generated by the store (`INTEGER PRIMARY KEY`).
//! - A hearing is only ever persisted together with its participant links.

pub mod document;
pub mod hearing;
pub mod user;
