//! Student search service.

use super::{ListingPolicy, ServiceResult};
use crate::model::student::Student;
use crate::pagination::{window_for, Page, SortKey};
use crate::repo::student_repo::{StudentRepository, StudentSort};
use log::debug;

pub struct StudentService<R: StudentRepository> {
    repo: R,
    policy: ListingPolicy,
}

impl<R: StudentRepository> StudentService<R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            policy: ListingPolicy::default(),
        }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Students whose name contains `keyword`, one page at a time.
    ///
    /// An empty `sort` falls back to name ascending.
    pub fn search_by_name(
        &self,
        keyword: &str,
        sort: &[SortKey<StudentSort>],
        page: Option<i64>,
        size: Option<i64>,
    ) -> ServiceResult<Page<Student>> {
        let request = self.policy.page_request(page, size)?;
        let default_sort = [SortKey::asc(StudentSort::Name)];
        let sort = if sort.is_empty() { &default_sort[..] } else { sort };

        let (items, total) = self.repo.find_by_name_containing(keyword, sort, &request)?;
        let window = window_for(&request, total, self.policy.window_size());
        debug!(
            "event=page_window module=service list=students page={} start={} end={} total={}",
            window.current_page, window.start_page, window.end_page, total
        );
        Ok(Page { items, window })
    }
}
