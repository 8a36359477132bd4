//! Page window calculation for paginated list responses.
//!
//! # Responsibility
//! - Validate one-based page requests before any storage call.
//! - Turn `(current_page, total_count, page_size, window_size)` into the
//!   bounded set of page buttons a list screen renders.
//!
//! # Invariants
//! - `start_page >= 1`, even for empty result sets.
//! - `end_page` never exceeds the real last page.
//! - Requests past the last page still yield a window (`has_next == false`)
//!   instead of an error, so stale pagination links keep working.
//! - Windows are recomputed per request and never cached.

use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Number of page buttons shown per window (`1..=10`, `11..=20`, ...).
pub const DEFAULT_WINDOW_SIZE: u32 = 10;

/// Rejected page request input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageError {
    /// A page, page size or window size below 1.
    InvalidPageRequest { field: &'static str, value: i64 },
}

impl Display for PageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPageRequest { field, value } => {
                write!(f, "invalid page request: `{field}` must be >= 1, got {value}")
            }
        }
    }
}

impl Error for PageError {}

/// Validated one-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    size: u32,
}

impl PageRequest {
    /// Validates a one-based page number and a page size.
    pub fn new(page: i64, size: i64) -> Result<Self, PageError> {
        Ok(Self {
            page: positive("page", page)?,
            size: positive("page_size", size)?,
        })
    }

    /// One-based page number.
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Rows per page.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Number of rows to skip in storage.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.size)
    }
}

/// Sort direction for one sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// One `field direction` entry of an `ORDER BY` list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey<F> {
    pub field: F,
    pub direction: SortDirection,
}

impl<F> SortKey<F> {
    pub fn asc(field: F) -> Self {
        Self {
            field,
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: F) -> Self {
        Self {
            field,
            direction: SortDirection::Desc,
        }
    }
}

/// Page button rendering model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageWindow {
    pub start_page: u64,
    pub end_page: u64,
    pub current_page: u64,
    pub total_count: u64,
    #[serde(rename = "prev")]
    pub has_prev: bool,
    #[serde(rename = "next")]
    pub has_next: bool,
}

impl PageWindow {
    /// Page numbers to render; empty when the window lies past the last page.
    pub fn pages(&self) -> std::ops::RangeInclusive<u64> {
        self.start_page..=self.end_page
    }

    /// Whether no page button should be rendered.
    pub fn is_empty(&self) -> bool {
        self.start_page > self.end_page
    }
}

/// Item slice of one page plus its rendering window.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub window: PageWindow,
}

/// Computes the page window for a list response.
///
/// # Errors
/// - `InvalidPageRequest` when `current_page`, `page_size` or `window_size`
///   is below 1.
pub fn compute_page_window(
    current_page: i64,
    total_count: u64,
    page_size: i64,
    window_size: i64,
) -> Result<PageWindow, PageError> {
    let current = u64::from(positive("page", current_page)?);
    let size = u64::from(positive("page_size", page_size)?);
    let window = u64::from(positive("window_size", window_size)?);
    Ok(build_window(current, size, window, total_count))
}

/// Shorthand for an already-validated request.
pub fn window_for(request: &PageRequest, total_count: u64, window_size: u32) -> PageWindow {
    build_window(
        u64::from(request.page()),
        u64::from(request.size()),
        u64::from(window_size.max(1)),
        total_count,
    )
}

fn build_window(current: u64, size: u64, window: u64, total_count: u64) -> PageWindow {
    let raw_end = current.div_ceil(window) * window;
    let start_page = raw_end - window + 1;
    let real_last_page = total_count.div_ceil(size);
    let end_page = raw_end.min(real_last_page);

    PageWindow {
        start_page,
        end_page,
        current_page: current,
        total_count,
        has_prev: start_page > 1,
        has_next: end_page < real_last_page,
    }
}

fn positive(field: &'static str, value: i64) -> Result<u32, PageError> {
    if value < 1 {
        return Err(PageError::InvalidPageRequest { field, value });
    }
    u32::try_from(value).map_err(|_| PageError::InvalidPageRequest { field, value })
}

#[cfg(test)]
mod tests {
    use super::{compute_page_window, window_for, PageError, PageRequest};

    #[test]
    fn interior_page_keeps_full_window() {
        let window = compute_page_window(15, 237, 10, 10).unwrap();
        assert_eq!(window.start_page, 11);
        assert_eq!(window.end_page, 20);
        assert!(window.has_prev);
        assert!(window.has_next);
    }

    #[test]
    fn empty_result_clamps_start_and_end() {
        let window = compute_page_window(1, 0, 10, 10).unwrap();
        assert_eq!(window.start_page, 1);
        assert_eq!(window.end_page, 0);
        assert!(!window.has_prev);
        assert!(!window.has_next);
        assert!(window.is_empty());
    }

    #[test]
    fn last_window_is_clamped_to_real_last_page() {
        let window = compute_page_window(25, 237, 10, 10).unwrap();
        assert_eq!(window.start_page, 21);
        assert_eq!(window.end_page, 24);
        assert!(window.has_prev);
        assert!(!window.has_next);
        assert_eq!(window.pages().count(), 4);
    }

    #[test]
    fn page_past_the_end_yields_window_without_next() {
        let window = compute_page_window(40, 237, 10, 10).unwrap();
        assert_eq!(window.start_page, 31);
        assert_eq!(window.end_page, 24);
        assert!(window.is_empty());
        assert!(!window.has_next);
    }

    #[test]
    fn exact_multiple_has_no_next() {
        let window = compute_page_window(10, 100, 10, 10).unwrap();
        assert_eq!(window.end_page, 10);
        assert!(!window.has_next);
    }

    #[test]
    fn rejects_non_positive_inputs() {
        assert_eq!(
            compute_page_window(1, 10, 0, 10).unwrap_err(),
            PageError::InvalidPageRequest {
                field: "page_size",
                value: 0
            }
        );
        assert!(compute_page_window(1, 10, 10, 0).is_err());
        assert!(compute_page_window(-3, 10, 10, 10).is_err());
        assert!(PageRequest::new(0, 10).is_err());
    }

    #[test]
    fn request_offset_is_zero_based() {
        let request = PageRequest::new(3, 20).unwrap();
        assert_eq!(request.offset(), 40);
        assert_eq!(
            window_for(&request, 237, 10),
            compute_page_window(3, 237, 20, 10).unwrap()
        );
    }
}
