//! Department/employee use-case service.
//!
//! # Responsibility
//! - Create departments and employees and keep held department
//!   collections in step with new employees.
//! - Expose lazy and batched department listings.
//! - Move employees between departments.
//!
//! # Invariants
//! - `change_department` persists the new `dept_id` before touching any
//!   in-memory aggregate.

use super::{ListingPolicy, ServiceError, ServiceResult};
use crate::model::department::{Department, Employee, NewDepartment, NewEmployee};
use crate::model::{DepartmentId, EmployeeId};
use crate::pagination::{window_for, Page, PageRequest, SortKey};
use crate::repo::department_repo::{
    DepartmentCriteria, DepartmentRepository, DepartmentSort, EmployeeRepository,
};
use crate::repo::RepoResult;
use crate::sync::{attach_member, detach_member, ensure_owned_by, reassign_member};
use log::{debug, info};

pub struct DepartmentService<D: DepartmentRepository, E: EmployeeRepository> {
    departments: D,
    employees: E,
    policy: ListingPolicy,
}

impl<D: DepartmentRepository, E: EmployeeRepository> DepartmentService<D, E> {
    pub fn new(departments: D, employees: E) -> Self {
        Self::with_policy(departments, employees, ListingPolicy::default())
    }

    pub fn with_policy(departments: D, employees: E, policy: ListingPolicy) -> Self {
        Self {
            departments,
            employees,
            policy,
        }
    }

    pub fn department_repo(&self) -> &D {
        &self.departments
    }

    pub fn employee_repo(&self) -> &E {
        &self.employees
    }

    pub fn create_department(&self, name: impl Into<String>) -> ServiceResult<Department> {
        let department = self
            .departments
            .persist_department(&NewDepartment::new(name))?;
        info!(
            "event=department_create module=service status=ok dept_id={}",
            department.id
        );
        Ok(department)
    }

    /// Persists an employee of `department` and links it into the held
    /// department's loaded collection.
    pub fn create_employee(
        &self,
        department: &mut Department,
        name: impl Into<String>,
    ) -> ServiceResult<Employee> {
        let mut employee = self
            .employees
            .persist_employee(&NewEmployee::new(name, department.id))?;
        attach_member(department, &mut employee);
        info!(
            "event=employee_create module=service status=ok emp_id={} dept_id={}",
            employee.id, department.id
        );
        Ok(employee)
    }

    /// Department with `employees` left unloaded.
    pub fn get_department(&self, id: DepartmentId) -> ServiceResult<Department> {
        self.departments
            .find_department(id)?
            .ok_or_else(|| ServiceError::not_found("department", id))
    }

    pub fn load_employees_of(&self, department: &mut Department) -> ServiceResult<()> {
        self.departments.load_employees(department)?;
        Ok(())
    }

    /// Employee read with the declared department fetch mode.
    pub fn get_employee(&self, id: EmployeeId) -> ServiceResult<Employee> {
        self.employees
            .find_employee(id)?
            .ok_or_else(|| ServiceError::not_found("employee", id))
    }

    pub fn load_department_of(&self, employee: &mut Employee) -> ServiceResult<()> {
        self.employees.load_department(employee)?;
        Ok(())
    }

    /// Departments with unloaded collections; each later `load_employees_of`
    /// costs one more statement.
    pub fn list_departments(
        &self,
        page: Option<i64>,
        size: Option<i64>,
    ) -> ServiceResult<Page<Department>> {
        self.list_with(page, size, |request| {
            self.departments.query_departments(
                &DepartmentCriteria::default(),
                &[SortKey::asc(DepartmentSort::Id)],
                request,
            )
        })
    }

    /// Departments with every employee collection loaded in one statement.
    pub fn list_departments_with_employees(
        &self,
        page: Option<i64>,
        size: Option<i64>,
    ) -> ServiceResult<Page<Department>> {
        self.list_with(page, size, |request| {
            self.departments.query_departments_with_employees(
                &DepartmentCriteria::default(),
                &[SortKey::asc(DepartmentSort::Id)],
                request,
            )
        })
    }

    /// Moves a stored employee to another stored department.
    pub fn change_department(
        &self,
        employee_id: EmployeeId,
        department_id: DepartmentId,
    ) -> ServiceResult<Employee> {
        let mut employee = self.get_employee(employee_id)?;
        let mut to = self.get_department(department_id)?;
        if employee.department_id == to.id {
            return Ok(employee);
        }
        let mut from = self.get_department(employee.department_id)?;
        self.departments.load_employees(&mut from)?;
        self.departments.load_employees(&mut to)?;

        self.reassign_employee(&mut employee, &mut from, &mut to)?;
        Ok(employee)
    }

    /// Moves a held employee between held departments.
    ///
    /// # Errors
    /// - `InconsistentState` when `employee` is not owned by `from`; nothing
    ///   is persisted or mutated in that case.
    pub fn reassign_employee(
        &self,
        employee: &mut Employee,
        from: &mut Department,
        to: &mut Department,
    ) -> ServiceResult<()> {
        ensure_owned_by::<Department>(employee, from)?;
        self.employees
            .update_employee_department(employee.id, to.id)?;

        reassign_member::<Department>(employee, from, to)?;
        detach_member(from, employee.id);
        info!(
            "event=employee_reassign module=service status=ok emp_id={} from={} to={}",
            employee.id, from.id, to.id
        );
        Ok(())
    }

    fn list_with(
        &self,
        page: Option<i64>,
        size: Option<i64>,
        query: impl FnOnce(&PageRequest) -> RepoResult<(Vec<Department>, u64)>,
    ) -> ServiceResult<Page<Department>> {
        let request = self.policy.page_request(page, size)?;
        let (items, total) = query(&request)?;
        let window = window_for(&request, total, self.policy.window_size());
        debug!(
            "event=page_window module=service list=departments page={} start={} end={} total={}",
            window.current_page, window.start_page, window.end_page, total
        );
        Ok(Page { items, window })
    }
}
