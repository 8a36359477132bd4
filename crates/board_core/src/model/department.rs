//! Organization aggregate: `Department` root with linked `Employee` members.
//!
//! # Invariants
//! - Employees reference exactly one department through `department_id`.
//! - The department's `employees` collection is a read projection; removing an
//!   employee from it never deletes the employee.
//! - `Employee::department`, when loaded, always matches `department_id`.

use super::{require_text, DepartmentId, EmployeeId, ValidationError};
use crate::fetch::{Association, Relationship, DEPARTMENT_EMPLOYEES};
use crate::sync::{AggregateRoot, Member};

const NAME_MAX_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
    pub employees: Association<Vec<Employee>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDepartment {
    pub name: String,
}

impl NewDepartment {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    pub department_id: DepartmentId,
    /// Many-to-one side; `Unloaded` unless fetched eagerly or loaded explicitly.
    pub department: Association<Box<Department>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEmployee {
    pub name: String,
    pub department_id: DepartmentId,
}

impl NewEmployee {
    pub fn new(name: impl Into<String>, department_id: DepartmentId) -> Self {
        Self {
            name: name.into(),
            department_id,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name(&self.name)
    }
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    require_text("name", name, 1, NAME_MAX_CHARS)
}

impl AggregateRoot for Department {
    type Id = DepartmentId;
    type Member = Employee;

    const RELATIONSHIP: Relationship = DEPARTMENT_EMPLOYEES;

    fn root_id(&self) -> DepartmentId {
        self.id
    }

    fn members(&self) -> &Association<Vec<Employee>> {
        &self.employees
    }

    fn members_mut(&mut self) -> &mut Association<Vec<Employee>> {
        &mut self.employees
    }
}

impl Member for Employee {
    type Id = EmployeeId;
    type RootId = DepartmentId;

    fn member_id(&self) -> EmployeeId {
        self.id
    }

    fn owner_id(&self) -> DepartmentId {
        self.department_id
    }

    fn set_owner_id(&mut self, owner: DepartmentId) {
        self.department_id = owner;
        let stale = self
            .department
            .get()
            .is_some_and(|department| department.id != owner);
        if stale {
            self.department.reset();
        }
    }
}
