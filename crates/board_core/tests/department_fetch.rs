use board_core::db::open_db_in_memory;
use board_core::fetch::{FetchMode, EMPLOYEE_DEPARTMENT};
use board_core::model::department::Department;
use board_core::model::{DepartmentId, EmployeeId};
use board_core::pagination::{PageRequest, SortKey};
use board_core::repo::department_repo::{
    DepartmentCriteria, DepartmentRepository, DepartmentSort, EmployeeRepository,
    SqliteDepartmentRepository, SqliteEmployeeRepository,
};
use board_core::service::department_service::DepartmentService;
use board_core::{ServiceError, SyncError};
use rusqlite::Connection;

type Service<'conn> =
    DepartmentService<SqliteDepartmentRepository<'conn>, SqliteEmployeeRepository<'conn>>;

fn service(conn: &Connection) -> Service<'_> {
    DepartmentService::new(
        SqliteDepartmentRepository::new(conn),
        SqliteEmployeeRepository::new(conn),
    )
}

/// Three departments with 2, 0 and 1 employees.
fn seed(service: &Service<'_>) -> Vec<Department> {
    let mut sales = service.create_department("Sales").unwrap();
    let dev = service.create_department("Development").unwrap();
    let mut ops = service.create_department("Operations").unwrap();
    service.create_employee(&mut sales, "Alice").unwrap();
    service.create_employee(&mut sales, "Bob").unwrap();
    service.create_employee(&mut ops, "Carol").unwrap();
    vec![sales, dev, ops]
}

fn stored_department_of(conn: &Connection, employee: EmployeeId) -> i64 {
    conn.query_row(
        "SELECT dept_id FROM tbl_emp WHERE emp_id = ?1;",
        [employee.0],
        |row| row.get(0),
    )
    .unwrap()
}

#[test]
fn created_employee_is_linked_into_held_department() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let departments = seed(&service);

    let sales = departments[0].employees.get().unwrap();
    assert_eq!(sales.len(), 2);
    assert!(sales.iter().all(|employee| employee.department_id == departments[0].id));
}

#[test]
fn employee_department_is_lazy_by_default() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    seed(&service);
    let trips = service.employee_repo().round_trips();
    trips.reset();

    let mut employee = service.get_employee(EmployeeId(1)).unwrap();

    assert_eq!(EMPLOYEE_DEPARTMENT.fetch, FetchMode::Lazy);
    assert!(!employee.department.is_loaded());
    assert_eq!(trips.count(), 1);

    service.load_department_of(&mut employee).unwrap();
    assert_eq!(trips.count(), 2);
    assert_eq!(employee.department.get().unwrap().name, "Sales");
}

#[test]
fn eager_employee_fetch_joins_department_in_one_statement() {
    let conn = open_db_in_memory().unwrap();
    seed(&service(&conn));
    let repo = SqliteEmployeeRepository::new(&conn);

    let employee = repo
        .find_employee_with(EmployeeId(3), FetchMode::Eager)
        .unwrap()
        .unwrap();

    assert_eq!(repo.round_trips().count(), 1);
    let department = employee.department.get().unwrap();
    assert_eq!(department.name, "Operations");
    assert_eq!(department.id, employee.department_id);
}

#[test]
fn batched_listing_equals_lazy_listing_with_fewer_statements() {
    let conn = open_db_in_memory().unwrap();
    seed(&service(&conn));
    let repo = SqliteDepartmentRepository::new(&conn);
    let page = PageRequest::new(1, 10).unwrap();
    let sort = [SortKey::asc(DepartmentSort::Id)];

    let (mut lazy, total) = repo
        .query_departments(&DepartmentCriteria::default(), &sort, &page)
        .unwrap();
    assert!(lazy.iter().all(|department| !department.employees.is_loaded()));
    for department in &mut lazy {
        repo.load_employees(department).unwrap();
    }
    assert_eq!(repo.round_trips().count(), 1 + 3);

    repo.round_trips().reset();
    let (joined, joined_total) = repo
        .query_departments_with_employees(&DepartmentCriteria::default(), &sort, &page)
        .unwrap();

    assert_eq!(repo.round_trips().count(), 1);
    assert_eq!(joined_total, total);
    assert_eq!(joined, lazy);
}

#[test]
fn join_paging_counts_departments_not_employee_rows() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    seed(&service);

    let first = service.list_departments_with_employees(Some(1), Some(1)).unwrap();
    assert_eq!(first.items.len(), 1);
    assert_eq!(first.items[0].employees.get().map(Vec::len), Some(2));
    assert_eq!(first.window.total_count, 3);
    assert_eq!(first.window.end_page, 3);

    let second = service.list_departments_with_employees(Some(2), Some(1)).unwrap();
    assert_eq!(second.items[0].name, "Development");
    assert_eq!(second.items[0].employees.get().map(Vec::len), Some(0));
}

#[test]
fn name_filter_escapes_wildcards() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    seed(&service);
    service.create_department("R&D_100%").unwrap();
    let page = PageRequest::new(1, 10).unwrap();

    let (matched, total) = service
        .department_repo()
        .query_departments(
            &DepartmentCriteria {
                name_contains: Some("_100%".to_string()),
            },
            &[SortKey::asc(DepartmentSort::Name)],
            &page,
        )
        .unwrap();

    assert_eq!(total, 1);
    assert_eq!(matched[0].name, "R&D_100%");
}

#[test]
fn change_department_persists_and_returns_moved_employee() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let departments = seed(&service);
    let alice = departments[0].employees.get().unwrap()[0].id;

    let moved = service.change_department(alice, departments[1].id).unwrap();

    assert_eq!(moved.department_id, departments[1].id);
    assert_eq!(stored_department_of(&conn, alice), departments[1].id.0);

    let mut sales = service.get_department(departments[0].id).unwrap();
    service.load_employees_of(&mut sales).unwrap();
    assert_eq!(sales.employees.get().map(Vec::len), Some(1));
}

#[test]
fn reassign_with_stale_source_is_rejected_without_writes() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let mut departments = seed(&service);
    let mut carol = departments[2].employees.get().unwrap()[0].clone();
    let (left, right) = departments.split_at_mut(1);
    let sales = &mut left[0];
    let dev = &mut right[0];

    let err = service.reassign_employee(&mut carol, sales, dev).unwrap_err();

    assert!(matches!(
        err,
        ServiceError::InconsistentState(SyncError::InconsistentState { .. })
    ));
    assert_eq!(carol.department_id, departments[2].id);
    assert_eq!(stored_department_of(&conn, carol.id), departments[2].id.0);
    assert_eq!(departments[1].employees.get().map(Vec::len), Some(0));
}

#[test]
fn reassign_updates_member_and_both_held_departments() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let mut departments = seed(&service);
    let mut bob = departments[0].employees.get().unwrap()[1].clone();
    let (left, right) = departments.split_at_mut(1);

    service
        .reassign_employee(&mut bob, &mut left[0], &mut right[0])
        .unwrap();

    assert_eq!(bob.department_id, departments[1].id);
    assert_eq!(departments[0].employees.get().map(Vec::len), Some(1));
    assert_eq!(departments[1].employees.get().unwrap()[0].id, bob.id);
    assert_eq!(stored_department_of(&conn, bob.id), departments[1].id.0);
}

#[test]
fn missing_entities_are_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    seed(&service);

    assert!(matches!(
        service.get_employee(EmployeeId(99)).unwrap_err(),
        ServiceError::NotFound { entity: "employee", .. }
    ));
    assert!(matches!(
        service
            .change_department(EmployeeId(1), DepartmentId(99))
            .unwrap_err(),
        ServiceError::NotFound { entity: "department", .. }
    ));
}

#[test]
fn department_with_employees_cannot_be_deleted() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let departments = seed(&service);
    let repo = service.department_repo();

    assert!(repo.delete_department(departments[0].id).is_err());
    repo.delete_department(departments[1].id).unwrap();
    assert!(repo.find_department(departments[1].id).unwrap().is_none());
}
