//! Fetch strategy declarations for entity relationships.
//!
//! # Responsibility
//! - Declare, per relationship, whether traversal joins eagerly or defers
//!   to an explicit load.
//! - Model not-yet-loaded associations as values instead of hidden queries.
//! - Count storage statements so callers can observe N+1 amplification.
//!
//! # Invariants
//! - Fetch mode is a static property of a relationship, never a per-call flag.
//! - Reading an [`Association`] never touches storage; repositories expose
//!   explicit `load_*` methods for that.
//! - Batched join-fetch is an opt-in query shape
//!   (`query_*_with_*` repository methods), not a global setting.

use log::debug;
use std::cell::Cell;

/// Lifecycle coupling between an aggregate root and its members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// Root controls member lifecycle; detached members are deleted.
    Owned,
    /// Member lifecycle is independent; the root collection is a projection.
    Linked,
}

/// When a linked entity is read from storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Joined into every fetch of the owning entity.
    Eager,
    /// Deferred until an explicit load keyed by the foreign key.
    Lazy,
}

/// Static descriptor of one relationship traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relationship {
    pub name: &'static str,
    pub kind: RelationKind,
    pub fetch: FetchMode,
}

impl Relationship {
    /// Whether a member detached from its root is deleted from storage.
    pub fn removes_orphans(&self) -> bool {
        matches!(self.kind, RelationKind::Owned)
    }
}

/// `Post -> HashTag` (one-to-many, orphan removal).
///
/// `PostService::remove_hash_tag` deletes the detached row; moving a tag
/// reassigns it instead, so a tag never outlives every post.
pub const POST_HASH_TAGS: Relationship = Relationship {
    name: "post.hash_tags",
    kind: RelationKind::Owned,
    fetch: FetchMode::Lazy,
};

/// `Department -> Employee` (one-to-many, read projection).
pub const DEPARTMENT_EMPLOYEES: Relationship = Relationship {
    name: "department.employees",
    kind: RelationKind::Linked,
    fetch: FetchMode::Lazy,
};

/// `Employee -> Department` (many-to-one).
///
/// Most employee lookups never read the department, so joining here would
/// couple every simple lookup to `tbl_dept`.
pub const EMPLOYEE_DEPARTMENT: Relationship = Relationship {
    name: "employee.department",
    kind: RelationKind::Linked,
    fetch: FetchMode::Lazy,
};

/// Association slot that is either loaded or explicitly not loaded yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Association<T> {
    #[default]
    Unloaded,
    Loaded(T),
}

impl<T> Association<T> {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    /// Returns the loaded value, or `None` when a load is still required.
    pub fn get(&self) -> Option<&T> {
        match self {
            Self::Loaded(value) => Some(value),
            Self::Unloaded => None,
        }
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        match self {
            Self::Loaded(value) => Some(value),
            Self::Unloaded => None,
        }
    }

    pub fn set(&mut self, value: T) {
        *self = Self::Loaded(value);
    }

    pub fn reset(&mut self) {
        *self = Self::Unloaded;
    }

    pub fn into_loaded(self) -> Option<T> {
        match self {
            Self::Loaded(value) => Some(value),
            Self::Unloaded => None,
        }
    }
}

/// Per-repository count of statements sent to storage.
#[derive(Debug, Default)]
pub struct RoundTrips {
    count: Cell<u64>,
}

impl RoundTrips {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one statement about to be executed.
    pub fn record(&self, statement: &'static str) {
        let next = self.count.get() + 1;
        self.count.set(next);
        debug!("event=storage_query module=fetch statement={statement} round_trip={next}");
    }

    pub fn count(&self) -> u64 {
        self.count.get()
    }

    pub fn reset(&self) {
        self.count.set(0);
    }
}
