//! Core domain logic for the SJD judicial case-management backend.
//! This crate is the single source of truth for business invariants.

pub mod auth;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use db::{
    open_db, open_db_in_memory, ConnectionPool, PoolConfig, PoolError, WriteError,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::hearing::{Hearing, HearingId, HearingInput};
pub use model::user::{Role, UserId, UserProfile};
pub use repo::hearing_repo::{HearingRepository, SqliteHearingRepository};
pub use repo::{RepoError, RepoResult};
pub use search::{SearchError, SearchResult};
pub use service::account_service::AccountService;
pub use service::document_service::DocumentService;
pub use service::hearing_service::HearingService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
