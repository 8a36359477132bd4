//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls and in-memory synchronization into
//!   use-case level APIs.
//! - Validate page requests before any storage call.
//!
//! # Invariants
//! - Services never leave a root's loaded collection disagreeing with the
//!   foreign keys they persisted.

use crate::config::{BoardConfig, ConfigError, DEFAULT_MAX_PAGE_SIZE, DEFAULT_PAGE_SIZE};
use crate::model::ValidationError;
use crate::pagination::{PageError, PageRequest, DEFAULT_WINDOW_SIZE};
use crate::repo::RepoError;
use crate::sync::SyncError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod department_service;
pub mod post_service;
pub mod student_service;

/// Service error shared by board use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Target entity does not exist.
    NotFound { entity: &'static str, id: String },
    /// Page, page size or window size below 1.
    InvalidPageRequest(PageError),
    /// Member owner disagrees with the root the caller supplied.
    InconsistentState(SyncError),
    Validation(ValidationError),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl ServiceError {
    pub(crate) fn not_found(entity: &'static str, id: impl Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::InvalidPageRequest(err) => write!(f, "{err}"),
            Self::InconsistentState(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotFound { .. } => None,
            Self::InvalidPageRequest(err) => Some(err),
            Self::InconsistentState(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<PageError> for ServiceError {
    fn from(value: PageError) -> Self {
        Self::InvalidPageRequest(value)
    }
}

impl From<SyncError> for ServiceError {
    fn from(value: SyncError) -> Self {
        Self::InconsistentState(value)
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Paging defaults applied to list endpoints.
///
/// Built only from a validated `BoardConfig`, so every size is at least 1 and
/// the default page size never exceeds the maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingPolicy {
    window_size: u32,
    default_page_size: u32,
    max_page_size: u32,
}

impl Default for ListingPolicy {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

impl TryFrom<&BoardConfig> for ListingPolicy {
    type Error = ConfigError;

    fn try_from(config: &BoardConfig) -> Result<Self, Self::Error> {
        config.validate()?;
        Ok(Self {
            window_size: config.page_window_size,
            default_page_size: config.default_page_size,
            max_page_size: config.max_page_size,
        })
    }
}

impl ListingPolicy {
    /// Resolves optional client paging input.
    ///
    /// Missing values fall back to page 1 and the default size; sizes above
    /// the maximum are clamped.
    ///
    /// # Errors
    /// - `InvalidPageRequest` for a page or size below 1.
    pub fn page_request(&self, page: Option<i64>, size: Option<i64>) -> Result<PageRequest, PageError> {
        let size = size
            .unwrap_or(i64::from(self.default_page_size))
            .min(i64::from(self.max_page_size));
        PageRequest::new(page.unwrap_or(1), size)
    }

    pub fn window_size(&self) -> u32 {
        self.window_size
    }

    pub fn default_page_size(&self) -> u32 {
        self.default_page_size
    }

    pub fn max_page_size(&self) -> u32 {
        self.max_page_size
    }
}

#[cfg(test)]
mod tests {
    use super::ListingPolicy;
    use crate::config::{BoardConfig, ConfigError};
    use crate::pagination::PageError;

    #[test]
    fn missing_input_uses_defaults() {
        let request = ListingPolicy::default().page_request(None, None).unwrap();
        assert_eq!(request.page(), 1);
        assert_eq!(request.size(), 10);
    }

    #[test]
    fn oversize_request_is_clamped() {
        let request = ListingPolicy::default()
            .page_request(Some(2), Some(500))
            .unwrap();
        assert_eq!(request.size(), 50);
    }

    #[test]
    fn page_zero_is_rejected() {
        let err = ListingPolicy::default()
            .page_request(Some(0), None)
            .unwrap_err();
        assert_eq!(
            err,
            PageError::InvalidPageRequest {
                field: "page",
                value: 0
            }
        );
    }

    #[test]
    fn policy_follows_valid_config() {
        let config = BoardConfig {
            page_window_size: 5,
            default_page_size: 20,
            max_page_size: 30,
            ..BoardConfig::default()
        };
        let policy = ListingPolicy::try_from(&config).unwrap();
        assert_eq!(policy.window_size(), 5);
        assert_eq!(policy.page_request(None, None).unwrap().size(), 20);
        assert_eq!(policy.page_request(None, Some(99)).unwrap().size(), 30);
    }

    #[test]
    fn zero_window_config_is_rejected_not_coerced() {
        let config = BoardConfig {
            page_window_size: 0,
            ..BoardConfig::default()
        };
        match ListingPolicy::try_from(&config).unwrap_err() {
            ConfigError::Invalid { field, .. } => assert_eq!(field, "page_window_size"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn default_above_max_config_is_rejected() {
        let config = BoardConfig {
            default_page_size: 60,
            max_page_size: 50,
            ..BoardConfig::default()
        };
        match ListingPolicy::try_from(&config).unwrap_err() {
            ConfigError::Invalid { field, .. } => assert_eq!(field, "default_page_size"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn default_policy_matches_default_config() {
        let from_config = ListingPolicy::try_from(&BoardConfig::default()).unwrap();
        assert_eq!(ListingPolicy::default(), from_config);
    }
}
