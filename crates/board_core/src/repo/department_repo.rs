//! Department/employee repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist departments and employees as independent rows linked by
//!   `tbl_emp.dept_id`.
//! - Resolve `Employee -> Department` according to its declared fetch mode.
//!
//! # Invariants
//! - `find_employee` joins `tbl_dept` only when `EMPLOYEE_DEPARTMENT` is eager.
//! - `query_departments` leaves `employees` unloaded; callers pay one
//!   `load_employees` statement per department.
//! - `query_departments_with_employees` returns the same departments in one
//!   statement with every collection loaded.

use super::{
    contains_pattern, resolve_order, run_paged, MemberJoin, PagedSelect, RepoError, RepoResult,
    SortField,
};
use crate::fetch::{Association, FetchMode, RoundTrips, EMPLOYEE_DEPARTMENT};
use crate::model::department::{Department, Employee, NewDepartment, NewEmployee};
use crate::model::{DepartmentId, EmployeeId};
use crate::pagination::{PageRequest, SortDirection, SortKey};
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension, Row};

const DEPARTMENT_COLUMNS: &[&str] = &["dept_id", "dept_name"];
const EMPLOYEE_COLUMNS: &[&str] = &["emp_id", "emp_name", "dept_id"];

/// Sortable department columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepartmentSort {
    Id,
    Name,
}

impl SortField for DepartmentSort {
    fn column(self) -> &'static str {
        match self {
            Self::Id => "dept_id",
            Self::Name => "dept_name",
        }
    }
}

/// Filter for department listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepartmentCriteria {
    /// Case-sensitive substring of the department name.
    pub name_contains: Option<String>,
}

/// Storage contract for departments.
pub trait DepartmentRepository {
    fn persist_department(&self, department: &NewDepartment) -> RepoResult<Department>;
    fn find_department(&self, id: DepartmentId) -> RepoResult<Option<Department>>;
    fn rename_department(&self, id: DepartmentId, name: &str) -> RepoResult<()>;
    /// Fails with a storage error while employees still reference the row.
    fn delete_department(&self, id: DepartmentId) -> RepoResult<()>;
    fn query_departments(
        &self,
        criteria: &DepartmentCriteria,
        sort: &[SortKey<DepartmentSort>],
        page: &PageRequest,
    ) -> RepoResult<(Vec<Department>, u64)>;
    fn query_departments_with_employees(
        &self,
        criteria: &DepartmentCriteria,
        sort: &[SortKey<DepartmentSort>],
        page: &PageRequest,
    ) -> RepoResult<(Vec<Department>, u64)>;
    /// Explicit lazy load of one department's employees.
    fn load_employees(&self, department: &mut Department) -> RepoResult<()>;
    fn round_trips(&self) -> &RoundTrips;
}

/// Storage contract for employees.
pub trait EmployeeRepository {
    fn persist_employee(&self, employee: &NewEmployee) -> RepoResult<Employee>;
    /// Reads one employee using the declared `employee.department` fetch mode.
    fn find_employee(&self, id: EmployeeId) -> RepoResult<Option<Employee>>;
    /// Reads one employee with an explicit fetch mode.
    fn find_employee_with(&self, id: EmployeeId, fetch: FetchMode)
        -> RepoResult<Option<Employee>>;
    /// Explicit lazy load of the employee's department.
    fn load_department(&self, employee: &mut Employee) -> RepoResult<()>;
    /// Persists a new `dept_id` for an existing employee.
    fn update_employee_department(
        &self,
        id: EmployeeId,
        department_id: DepartmentId,
    ) -> RepoResult<()>;
    fn delete_employee(&self, id: EmployeeId) -> RepoResult<()>;
    fn round_trips(&self) -> &RoundTrips;
}

/// SQLite-backed department repository.
pub struct SqliteDepartmentRepository<'conn> {
    conn: &'conn Connection,
    round_trips: RoundTrips,
}

impl<'conn> SqliteDepartmentRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            round_trips: RoundTrips::new(),
        }
    }

    fn query_page(
        &self,
        criteria: &DepartmentCriteria,
        sort: &[SortKey<DepartmentSort>],
        page: &PageRequest,
        with_employees: bool,
    ) -> RepoResult<(Vec<Department>, u64)> {
        let mut filtered = String::from("SELECT dept_id, dept_name FROM tbl_dept");
        let mut bind_values: Vec<Value> = Vec::new();
        if let Some(name) = criteria.name_contains.as_ref() {
            filtered.push_str(" WHERE dept_name LIKE ? ESCAPE '\\'");
            bind_values.push(Value::Text(contains_pattern(name)));
        }

        let order = resolve_order(sort, "dept_id", SortDirection::Asc);
        let select = PagedSelect {
            filtered: &filtered,
            root_key: "dept_id",
            root_columns: DEPARTMENT_COLUMNS,
            order: &order,
            join: with_employees.then_some(MemberJoin {
                table: "tbl_emp",
                foreign_key: "dept_id",
                member_key: "emp_id",
                columns: EMPLOYEE_COLUMNS,
            }),
        };

        self.round_trips.record(if with_employees {
            "query_departments_with_employees"
        } else {
            "query_departments"
        });

        let mut departments: Vec<Department> = Vec::new();
        let total = run_paged(self.conn, &select, bind_values, page, |row| {
            let department_id = DepartmentId(row.get("dept_id")?);
            if departments.last().map(|department| department.id) != Some(department_id) {
                let mut department = parse_department_row(row)?;
                if with_employees {
                    department.employees = Association::Loaded(Vec::new());
                }
                departments.push(department);
            }
            if with_employees {
                if let Some(emp_id) = row.get::<_, Option<i64>>("m_emp_id")? {
                    let employee = Employee {
                        id: EmployeeId(emp_id),
                        name: row.get("m_emp_name")?,
                        department_id: DepartmentId(row.get("m_dept_id")?),
                        department: Association::Unloaded,
                    };
                    if let Some(employees) = departments
                        .last_mut()
                        .and_then(|department| department.employees.get_mut())
                    {
                        employees.push(employee);
                    }
                }
            }
            Ok(())
        })?;

        Ok((departments, total))
    }
}

impl DepartmentRepository for SqliteDepartmentRepository<'_> {
    fn persist_department(&self, department: &NewDepartment) -> RepoResult<Department> {
        department.validate()?;

        self.round_trips.record("persist_department");
        let id: i64 = self.conn.query_row(
            "INSERT INTO tbl_dept (dept_name) VALUES (?1) RETURNING dept_id;",
            [department.name.as_str()],
            |row| row.get(0),
        )?;
        Ok(Department {
            id: DepartmentId(id),
            name: department.name.clone(),
            employees: Association::Loaded(Vec::new()),
        })
    }

    fn find_department(&self, id: DepartmentId) -> RepoResult<Option<Department>> {
        self.round_trips.record("find_department");
        let mut stmt = self
            .conn
            .prepare("SELECT dept_id, dept_name FROM tbl_dept WHERE dept_id = ?1;")?;
        let mut rows = stmt.query([id.0])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_department_row(row)?));
        }
        Ok(None)
    }

    fn rename_department(&self, id: DepartmentId, name: &str) -> RepoResult<()> {
        NewDepartment::new(name).validate()?;

        self.round_trips.record("rename_department");
        let changed = self.conn.execute(
            "UPDATE tbl_dept SET dept_name = ?1 WHERE dept_id = ?2;",
            params![name, id.0],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("department", id));
        }
        Ok(())
    }

    fn delete_department(&self, id: DepartmentId) -> RepoResult<()> {
        self.round_trips.record("delete_department");
        let changed = self
            .conn
            .execute("DELETE FROM tbl_dept WHERE dept_id = ?1;", [id.0])?;
        if changed == 0 {
            return Err(RepoError::not_found("department", id));
        }
        Ok(())
    }

    fn query_departments(
        &self,
        criteria: &DepartmentCriteria,
        sort: &[SortKey<DepartmentSort>],
        page: &PageRequest,
    ) -> RepoResult<(Vec<Department>, u64)> {
        self.query_page(criteria, sort, page, false)
    }

    fn query_departments_with_employees(
        &self,
        criteria: &DepartmentCriteria,
        sort: &[SortKey<DepartmentSort>],
        page: &PageRequest,
    ) -> RepoResult<(Vec<Department>, u64)> {
        self.query_page(criteria, sort, page, true)
    }

    fn load_employees(&self, department: &mut Department) -> RepoResult<()> {
        self.round_trips.record("load_employees");
        let mut stmt = self.conn.prepare(
            "SELECT emp_id, emp_name, dept_id
             FROM tbl_emp
             WHERE dept_id = ?1
             ORDER BY emp_id ASC;",
        )?;
        let employees = stmt
            .query_map([department.id.0], parse_employee_row)?
            .collect::<Result<Vec<_>, _>>()?;
        department.employees.set(employees);
        Ok(())
    }

    fn round_trips(&self) -> &RoundTrips {
        &self.round_trips
    }
}

/// SQLite-backed employee repository.
pub struct SqliteEmployeeRepository<'conn> {
    conn: &'conn Connection,
    round_trips: RoundTrips,
}

impl<'conn> SqliteEmployeeRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            round_trips: RoundTrips::new(),
        }
    }
}

impl EmployeeRepository for SqliteEmployeeRepository<'_> {
    fn persist_employee(&self, employee: &NewEmployee) -> RepoResult<Employee> {
        employee.validate()?;

        self.round_trips.record("persist_employee");
        let id: i64 = self.conn.query_row(
            "INSERT INTO tbl_emp (emp_name, dept_id) VALUES (?1, ?2) RETURNING emp_id;",
            params![employee.name, employee.department_id.0],
            |row| row.get(0),
        )?;
        Ok(Employee {
            id: EmployeeId(id),
            name: employee.name.clone(),
            department_id: employee.department_id,
            department: Association::Unloaded,
        })
    }

    fn find_employee(&self, id: EmployeeId) -> RepoResult<Option<Employee>> {
        self.find_employee_with(id, EMPLOYEE_DEPARTMENT.fetch)
    }

    fn find_employee_with(
        &self,
        id: EmployeeId,
        fetch: FetchMode,
    ) -> RepoResult<Option<Employee>> {
        match fetch {
            FetchMode::Lazy => {
                self.round_trips.record("find_employee");
                let employee = self
                    .conn
                    .query_row(
                        "SELECT emp_id, emp_name, dept_id FROM tbl_emp WHERE emp_id = ?1;",
                        [id.0],
                        parse_employee_row,
                    )
                    .optional()?;
                Ok(employee)
            }
            FetchMode::Eager => {
                self.round_trips.record("find_employee_with_department");
                let employee = self
                    .conn
                    .query_row(
                        "SELECT e.emp_id AS emp_id, e.emp_name AS emp_name, e.dept_id AS dept_id,
                                d.dept_name AS dept_name
                         FROM tbl_emp e
                         JOIN tbl_dept d ON d.dept_id = e.dept_id
                         WHERE e.emp_id = ?1;",
                        [id.0],
                        |row| {
                            let mut employee = parse_employee_row(row)?;
                            employee.department.set(Box::new(Department {
                                id: employee.department_id,
                                name: row.get("dept_name")?,
                                employees: Association::Unloaded,
                            }));
                            Ok(employee)
                        },
                    )
                    .optional()?;
                Ok(employee)
            }
        }
    }

    fn load_department(&self, employee: &mut Employee) -> RepoResult<()> {
        self.round_trips.record("load_department");
        let name: Option<String> = self
            .conn
            .query_row(
                "SELECT dept_name FROM tbl_dept WHERE dept_id = ?1;",
                [employee.department_id.0],
                |row| row.get(0),
            )
            .optional()?;
        let Some(name) = name else {
            return Err(RepoError::InvalidData(format!(
                "employee {} references missing department {}",
                employee.id, employee.department_id
            )));
        };
        employee.department.set(Box::new(Department {
            id: employee.department_id,
            name,
            employees: Association::Unloaded,
        }));
        Ok(())
    }

    fn update_employee_department(
        &self,
        id: EmployeeId,
        department_id: DepartmentId,
    ) -> RepoResult<()> {
        self.round_trips.record("update_employee_department");
        let changed = self.conn.execute(
            "UPDATE tbl_emp SET dept_id = ?1 WHERE emp_id = ?2;",
            params![department_id.0, id.0],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("employee", id));
        }
        Ok(())
    }

    fn delete_employee(&self, id: EmployeeId) -> RepoResult<()> {
        self.round_trips.record("delete_employee");
        let changed = self
            .conn
            .execute("DELETE FROM tbl_emp WHERE emp_id = ?1;", [id.0])?;
        if changed == 0 {
            return Err(RepoError::not_found("employee", id));
        }
        Ok(())
    }

    fn round_trips(&self) -> &RoundTrips {
        &self.round_trips
    }
}

fn parse_department_row(row: &Row<'_>) -> RepoResult<Department> {
    Ok(Department {
        id: DepartmentId(row.get("dept_id")?),
        name: row.get("dept_name")?,
        employees: Association::Unloaded,
    })
}

fn parse_employee_row(row: &Row<'_>) -> rusqlite::Result<Employee> {
    Ok(Employee {
        id: EmployeeId(row.get("emp_id")?),
        name: row.get("emp_name")?,
        department_id: DepartmentId(row.get("dept_id")?),
        department: Association::Unloaded,
    })
}
