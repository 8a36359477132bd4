//! Student query repository.
//!
//! # Responsibility
//! - Derived lookups by name, city and major.
//! - Substring search with caller-chosen multi-column sort and paging.
//!
//! # Invariants
//! - Student ids are generated here (UUID v4) and stored as hyphenated text.
//! - Substring filters escape `%`, `_` and `\` so user input never acts as a
//!   wildcard.

use super::{contains_pattern, resolve_order, run_paged, PagedSelect, RepoError, RepoResult, SortField};
use crate::model::student::{NewStudent, Student, StudentId};
use crate::model::require_text;
use crate::pagination::{PageRequest, SortDirection, SortKey};
use rusqlite::types::Value;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

const STUDENT_COLUMNS: &[&str] = &["stu_id", "stu_name", "city", "major"];
const SELECT_STUDENTS: &str = "SELECT stu_id, stu_name, city, major FROM tbl_student";

/// Sortable student columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudentSort {
    Id,
    Name,
    City,
    Major,
}

impl SortField for StudentSort {
    fn column(self) -> &'static str {
        match self {
            Self::Id => "stu_id",
            Self::Name => "stu_name",
            Self::City => "city",
            Self::Major => "major",
        }
    }
}

pub trait StudentRepository {
    fn persist_student(&self, student: &NewStudent) -> RepoResult<Student>;
    fn find_by_name(&self, name: &str) -> RepoResult<Vec<Student>>;
    fn find_by_city_and_major(&self, city: &str, major: &str) -> RepoResult<Vec<Student>>;
    fn find_by_major_containing(&self, major: &str) -> RepoResult<Vec<Student>>;
    /// Substring match on the name, ordered by name.
    fn search_by_name(&self, keyword: &str) -> RepoResult<Vec<Student>>;
    /// Returns the number of deleted students.
    fn delete_by_name_containing(&self, keyword: &str) -> RepoResult<usize>;
    fn find_by_name_containing(
        &self,
        keyword: &str,
        sort: &[SortKey<StudentSort>],
        page: &PageRequest,
    ) -> RepoResult<(Vec<Student>, u64)>;
}

pub struct SqliteStudentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStudentRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn select_where(&self, clause: &str, bind_values: Vec<Value>) -> RepoResult<Vec<Student>> {
        let sql = format!("{SELECT_STUDENTS} WHERE {clause};");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(rusqlite::params_from_iter(bind_values))?;
        let mut students = Vec::new();
        while let Some(row) = rows.next()? {
            students.push(parse_student_row(row)?);
        }
        Ok(students)
    }
}

impl StudentRepository for SqliteStudentRepository<'_> {
    fn persist_student(&self, student: &NewStudent) -> RepoResult<Student> {
        require_text("name", &student.name, 1, usize::MAX)?;

        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO tbl_student (stu_id, stu_name, city, major) VALUES (?1, ?2, ?3, ?4);",
            params![id.to_string(), student.name, student.city, student.major],
        )?;
        Ok(Student {
            id,
            name: student.name.clone(),
            city: student.city.clone(),
            major: student.major.clone(),
        })
    }

    fn find_by_name(&self, name: &str) -> RepoResult<Vec<Student>> {
        self.select_where(
            "stu_name = ? ORDER BY stu_id",
            vec![Value::Text(name.to_string())],
        )
    }

    fn find_by_city_and_major(&self, city: &str, major: &str) -> RepoResult<Vec<Student>> {
        self.select_where(
            "city = ? AND major = ? ORDER BY stu_id",
            vec![Value::Text(city.to_string()), Value::Text(major.to_string())],
        )
    }

    fn find_by_major_containing(&self, major: &str) -> RepoResult<Vec<Student>> {
        self.select_where(
            "major LIKE ? ESCAPE '\\' ORDER BY stu_id",
            vec![Value::Text(contains_pattern(major))],
        )
    }

    fn search_by_name(&self, keyword: &str) -> RepoResult<Vec<Student>> {
        self.select_where(
            "stu_name LIKE ? ESCAPE '\\' ORDER BY stu_name, stu_id",
            vec![Value::Text(contains_pattern(keyword))],
        )
    }

    fn delete_by_name_containing(&self, keyword: &str) -> RepoResult<usize> {
        let deleted = self.conn.execute(
            "DELETE FROM tbl_student WHERE stu_name LIKE ?1 ESCAPE '\\';",
            [contains_pattern(keyword)],
        )?;
        Ok(deleted)
    }

    fn find_by_name_containing(
        &self,
        keyword: &str,
        sort: &[SortKey<StudentSort>],
        page: &PageRequest,
    ) -> RepoResult<(Vec<Student>, u64)> {
        let filtered = format!("{SELECT_STUDENTS} WHERE stu_name LIKE ? ESCAPE '\\'");
        let order = resolve_order(sort, "stu_id", SortDirection::Asc);
        let select = PagedSelect {
            filtered: &filtered,
            root_key: "stu_id",
            root_columns: STUDENT_COLUMNS,
            order: &order,
            join: None,
        };

        let mut students = Vec::new();
        let total = run_paged(
            self.conn,
            &select,
            vec![Value::Text(contains_pattern(keyword))],
            page,
            |row| {
                students.push(parse_student_row(row)?);
                Ok(())
            },
        )?;
        Ok((students, total))
    }
}

fn parse_student_row(row: &Row<'_>) -> RepoResult<Student> {
    let raw_id: String = row.get("stu_id")?;
    let id: StudentId = Uuid::parse_str(&raw_id)
        .map_err(|err| RepoError::InvalidData(format!("invalid student id `{raw_id}`: {err}")))?;
    Ok(Student {
        id,
        name: row.get("stu_name")?,
        city: row.get("city")?,
        major: row.get("major")?,
    })
}
