//! Core domain logic for the board and catalog backend.
//! Aggregate consistency, fetch strategies and paginated listings live here.

pub mod config;
pub mod db;
pub mod fetch;
pub mod logging;
pub mod model;
pub mod pagination;
pub mod repo;
pub mod service;
pub mod sync;

pub use config::{BoardConfig, ConfigError};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use fetch::{Association, FetchMode, RelationKind, Relationship, RoundTrips};
pub use logging::{init_from_config, init_logging, logging_status, LoggingError};
pub use pagination::{compute_page_window, Page, PageError, PageRequest, PageWindow, SortKey};
pub use repo::{RepoError, RepoResult};
pub use service::{ListingPolicy, ServiceError, ServiceResult};
pub use sync::{attach_member, detach_member, reassign_member, AggregateRoot, Member, SyncError};

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
