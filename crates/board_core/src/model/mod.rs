//! Domain model for the board and catalog entities.
//!
//! # Responsibility
//! - Define persisted entities and their unsaved draft counterparts.
//! - Keep root/member links as explicit foreign-key ids, never back-pointers.
//!
//! # Invariants
//! - Storage-assigned identifiers only exist on persisted types; drafts
//!   (`New*`) carry none.
//! - Entity equality for collection membership is decided by id.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod department;
pub mod post;
pub mod product;
pub mod student;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// `tbl_post.post_no`.
    PostId
);
entity_id!(
    /// `tbl_hash_tag.tag_no`.
    HashTagId
);
entity_id!(
    /// `tbl_dept.dept_id`.
    DepartmentId
);
entity_id!(
    /// `tbl_emp.emp_id`.
    EmployeeId
);
entity_id!(
    /// `tbl_product.prod_id`.
    ProductId
);

/// Field-level validation failure for drafts and updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required text field is empty or whitespace only.
    Blank { field: &'static str },
    /// Text length (in chars) outside the allowed range.
    Length {
        field: &'static str,
        min: usize,
        max: usize,
        actual: usize,
    },
    /// Numeric value outside the allowed range.
    Negative { field: &'static str, value: i64 },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank { field } => write!(f, "`{field}` must not be blank"),
            Self::Length {
                field,
                min,
                max,
                actual,
            } => write!(
                f,
                "`{field}` must be {min}..={max} characters, got {actual}"
            ),
            Self::Negative { field, value } => {
                write!(f, "`{field}` must not be negative, got {value}")
            }
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn require_text(
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Blank { field });
    }
    let actual = value.chars().count();
    if actual < min || actual > max {
        return Err(ValidationError::Length {
            field,
            min,
            max,
            actual,
        });
    }
    Ok(())
}
