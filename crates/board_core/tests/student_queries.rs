use board_core::db::open_db_in_memory;
use board_core::model::student::NewStudent;
use board_core::pagination::SortKey;
use board_core::repo::student_repo::{SqliteStudentRepository, StudentRepository, StudentSort};
use board_core::service::student_service::StudentService;
use board_core::ServiceError;
use rusqlite::Connection;

fn seed(conn: &Connection) {
    let repo = SqliteStudentRepository::new(conn);
    for (name, city, major) in [
        ("Spring", "Seoul", "Computer Science"),
        ("Summer", "Busan", "Mathematics"),
        ("Spring", "Busan", "Computer Engineering"),
        ("Autumn", "Seoul", "Computer Science"),
        ("Winter", "Jeju", "Physics"),
    ] {
        repo.persist_student(
            &NewStudent::new(name)
                .with_city(city)
                .with_major(major),
        )
        .unwrap();
    }
}

#[test]
fn derived_lookups_match_exact_and_partial_values() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let repo = SqliteStudentRepository::new(&conn);

    assert_eq!(repo.find_by_name("Spring").unwrap().len(), 2);
    let seoul_cs = repo
        .find_by_city_and_major("Seoul", "Computer Science")
        .unwrap();
    assert_eq!(seoul_cs.len(), 2);
    assert_eq!(repo.find_by_major_containing("Computer").unwrap().len(), 3);

    let names: Vec<String> = repo
        .search_by_name("er")
        .unwrap()
        .into_iter()
        .map(|student| student.name)
        .collect();
    assert_eq!(names, vec!["Summer", "Winter"]);
}

#[test]
fn generated_ids_are_unique() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::new(&conn);

    let first = repo.persist_student(&NewStudent::new("Kim")).unwrap();
    let second = repo.persist_student(&NewStudent::new("Kim")).unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(repo.find_by_name("Kim").unwrap().len(), 2);
}

#[test]
fn delete_by_name_containing_reports_count() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let repo = SqliteStudentRepository::new(&conn);

    assert_eq!(repo.delete_by_name_containing("Spr").unwrap(), 2);
    assert!(repo.find_by_name("Spring").unwrap().is_empty());
    assert_eq!(repo.delete_by_name_containing("%").unwrap(), 0);
}

#[test]
fn paged_search_applies_multi_column_sort_and_window() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let service = StudentService::new(SqliteStudentRepository::new(&conn));
    let sort = [
        SortKey::desc(StudentSort::Name),
        SortKey::asc(StudentSort::City),
    ];

    let first = service.search_by_name("r", &sort, Some(1), Some(2)).unwrap();
    let names: Vec<(&str, Option<&str>)> = first
        .items
        .iter()
        .map(|student| (student.name.as_str(), student.city.as_deref()))
        .collect();
    assert_eq!(names, vec![("Winter", Some("Jeju")), ("Summer", Some("Busan"))]);
    assert_eq!(first.window.total_count, 4);
    assert_eq!(first.window.end_page, 2);
    assert!(!first.window.has_next);

    let second = service.search_by_name("r", &sort, Some(2), Some(2)).unwrap();
    let cities: Vec<Option<&str>> = second
        .items
        .iter()
        .map(|student| student.city.as_deref())
        .collect();
    assert_eq!(cities, vec![Some("Busan"), Some("Seoul")]);
}

#[test]
fn paged_search_rejects_invalid_page() {
    let conn = open_db_in_memory().unwrap();
    let service = StudentService::new(SqliteStudentRepository::new(&conn));

    assert!(matches!(
        service.search_by_name("a", &[], Some(0), None),
        Err(ServiceError::InvalidPageRequest(_))
    ));
}
