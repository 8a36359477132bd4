//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define per-aggregate storage contracts (persist, find, delete, sorted
//!   offset/limit query, join query).
//! - Isolate SQL details from service orchestration.
//!
//! # Invariants
//! - Paged queries return the page slice and the total count from a single
//!   statement, including pages past the end.
//! - Sort columns come from per-entity whitelists, never from raw input.
//! - Every statement is recorded on the repository's `RoundTrips`.

use crate::db::DbError;
use crate::model::ValidationError;
use crate::pagination::{PageRequest, SortDirection, SortKey};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod department_repo;
pub mod post_repo;
pub mod product_repo;
pub mod student_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    NotFound { entity: &'static str, id: String },
    InvalidData(String),
}

impl RepoError {
    pub(crate) fn not_found(entity: &'static str, id: impl Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound { .. } => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Whitelisted sort column of one entity.
pub trait SortField: Copy {
    fn column(self) -> &'static str;
}

/// Resolves sort keys to `(column, direction)` pairs and appends the primary
/// key as a tiebreaker so offset paging is deterministic.
pub(crate) fn resolve_order<F: SortField>(
    sort: &[SortKey<F>],
    primary_key: &'static str,
    default_direction: SortDirection,
) -> Vec<(&'static str, SortDirection)> {
    let mut order: Vec<(&'static str, SortDirection)> = sort
        .iter()
        .map(|key| (key.field.column(), key.direction))
        .collect();
    if !order.iter().any(|(column, _)| *column == primary_key) {
        order.push((primary_key, default_direction));
    }
    order
}

fn order_clause(order: &[(&'static str, SortDirection)], qualifier: &str) -> String {
    order
        .iter()
        .map(|(column, direction)| format!("{qualifier}{column} {}", direction.as_sql()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Member table joined into a paged root query.
pub(crate) struct MemberJoin<'a> {
    pub table: &'a str,
    /// Member column referencing the root key.
    pub foreign_key: &'a str,
    /// Member primary key; also orders members within a root.
    pub member_key: &'a str,
    /// Member columns, exposed as `m_<column>` in result rows.
    pub columns: &'a [&'a str],
}

/// Single-statement paged select over one root table.
pub(crate) struct PagedSelect<'a> {
    /// `SELECT <root columns> FROM ... [WHERE ...]` using anonymous `?` params.
    pub filtered: &'a str,
    pub root_key: &'a str,
    pub root_columns: &'a [&'a str],
    pub order: &'a [(&'static str, SortDirection)],
    pub join: Option<MemberJoin<'a>>,
}

impl PagedSelect<'_> {
    /// Builds the statement.
    ///
    /// `total LEFT JOIN page` always yields at least one row, so the total
    /// count survives an empty page without a second query.
    pub(crate) fn to_sql(&self) -> String {
        let mut columns = vec!["total.total_count AS total_count".to_string()];
        columns.extend(
            self.root_columns
                .iter()
                .map(|column| format!("page.{column} AS {column}")),
        );
        let mut joins = String::new();
        let mut outer_order = order_clause(self.order, "page.");

        if let Some(join) = &self.join {
            columns.extend(
                join.columns
                    .iter()
                    .map(|column| format!("m.{column} AS m_{column}")),
            );
            joins = format!(
                " LEFT JOIN {table} m ON m.{fk} = page.{root_key}",
                table = join.table,
                fk = join.foreign_key,
                root_key = self.root_key
            );
            outer_order.push_str(&format!(", m.{} ASC", join.member_key));
        }

        format!(
            "WITH filtered AS ({filtered}),
             total AS (SELECT COUNT(*) AS total_count FROM filtered),
             page AS (SELECT * FROM filtered ORDER BY {inner_order} LIMIT ? OFFSET ?)
             SELECT {columns}
             FROM total
             LEFT JOIN page ON 1 = 1{joins}
             ORDER BY {outer_order};",
            filtered = self.filtered,
            inner_order = order_clause(self.order, ""),
            columns = columns.join(", "),
        )
    }
}

/// Runs a paged select and feeds every row that carries a root to `on_row`.
///
/// Returns the total count of roots matching the filter.
pub(crate) fn run_paged(
    conn: &Connection,
    select: &PagedSelect<'_>,
    mut bind_values: Vec<Value>,
    page: &PageRequest,
    mut on_row: impl FnMut(&Row<'_>) -> RepoResult<()>,
) -> RepoResult<u64> {
    bind_values.push(Value::Integer(i64::from(page.size())));
    bind_values.push(Value::Integer(
        i64::try_from(page.offset()).unwrap_or(i64::MAX),
    ));

    let mut stmt = conn.prepare(&select.to_sql())?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut total: u64 = 0;
    while let Some(row) = rows.next()? {
        let count: i64 = row.get("total_count")?;
        total = u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative total count {count}")))?;
        if !matches!(row.get_ref(select.root_key)?, ValueRef::Null) {
            on_row(row)?;
        }
    }
    Ok(total)
}

/// Escapes `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` substring pattern.
pub(crate) fn contains_pattern(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('%');
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::{contains_pattern, resolve_order, MemberJoin, PagedSelect, SortField};
    use crate::pagination::{SortDirection, SortKey};

    #[derive(Clone, Copy)]
    enum Field {
        Name,
        Id,
    }

    impl SortField for Field {
        fn column(self) -> &'static str {
            match self {
                Self::Name => "name",
                Self::Id => "id",
            }
        }
    }

    #[test]
    fn order_appends_primary_key_tiebreaker_once() {
        let order = resolve_order(&[SortKey::desc(Field::Name)], "id", SortDirection::Asc);
        assert_eq!(
            order,
            vec![("name", SortDirection::Desc), ("id", SortDirection::Asc)]
        );

        let explicit = resolve_order(&[SortKey::desc(Field::Id)], "id", SortDirection::Asc);
        assert_eq!(explicit, vec![("id", SortDirection::Desc)]);
    }

    #[test]
    fn join_select_aliases_member_columns_and_orders_members() {
        let order = [("id", SortDirection::Asc)];
        let select = PagedSelect {
            filtered: "SELECT id, name FROM roots",
            root_key: "id",
            root_columns: &["id", "name"],
            order: &order,
            join: Some(MemberJoin {
                table: "members",
                foreign_key: "root_id",
                member_key: "id",
                columns: &["id", "label"],
            }),
        };
        let sql = select.to_sql();
        assert!(sql.contains("m.label AS m_label"));
        assert!(sql.contains("LEFT JOIN members m ON m.root_id = page.id"));
        assert!(sql.contains("ORDER BY page.id ASC, m.id ASC"));
    }

    #[test]
    fn contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("a%b_c"), "%a\\%b\\_c%");
    }
}
