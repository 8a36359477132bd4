//! CLI smoke entry point.
//!
//! Usage: `board_cli [--config <path>] [posts|departments] [page]`
//!
//! Opens the configured database (in-memory when none is set), prints one
//! page of the requested listing and its page window.

use board_core::repo::department_repo::{SqliteDepartmentRepository, SqliteEmployeeRepository};
use board_core::repo::post_repo::{SqliteHashTagRepository, SqlitePostRepository};
use board_core::service::department_service::DepartmentService;
use board_core::service::post_service::PostService;
use board_core::{BoardConfig, ListingPolicy, PageWindow};
use log::error;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run(std::env::args().skip(1).collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("event=cli_run module=cli status=error error={message}");
            eprintln!("board_cli: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(mut args: Vec<String>) -> Result<(), String> {
    let config = match args.iter().position(|arg| arg == "--config") {
        Some(index) => {
            let path = args
                .get(index + 1)
                .cloned()
                .ok_or("--config requires a path")?;
            args.remove(index + 1);
            args.remove(index);
            BoardConfig::load(path).map_err(|err| err.to_string())?
        }
        None => BoardConfig::default(),
    };
    board_core::init_from_config(&config).map_err(|err| err.to_string())?;

    let listing = args.first().map(String::as_str).unwrap_or("posts");
    let page = match args.get(1) {
        Some(raw) => Some(
            raw.parse::<i64>()
                .map_err(|_| format!("page must be a number, got `{raw}`"))?,
        ),
        None => None,
    };

    let conn = match config.database_path.as_ref() {
        Some(path) => board_core::open_db(path),
        None => board_core::open_db_in_memory(),
    }
    .map_err(|err| err.to_string())?;
    let policy = ListingPolicy::try_from(&config).map_err(|err| err.to_string())?;

    println!("board_core version={}", board_core::core_version());
    match listing {
        "posts" => {
            let service = PostService::with_policy(
                SqlitePostRepository::new(&conn),
                SqliteHashTagRepository::new(&conn),
                policy,
            );
            let response = service.list_posts(page, None).map_err(|err| err.to_string())?;
            for post in &response.posts {
                println!(
                    "#{} [{}] {} tags={}",
                    post.post_no,
                    post.writer,
                    post.title,
                    post.hash_tags.join(",")
                );
            }
            print_window(&response.page_info);
        }
        "departments" => {
            let service = DepartmentService::with_policy(
                SqliteDepartmentRepository::new(&conn),
                SqliteEmployeeRepository::new(&conn),
                policy,
            );
            let page = service
                .list_departments_with_employees(page, None)
                .map_err(|err| err.to_string())?;
            for department in &page.items {
                let employees = department.employees.get().map(Vec::len).unwrap_or(0);
                println!(
                    "#{} {} employees={employees}",
                    department.id, department.name
                );
            }
            print_window(&page.window);
        }
        other => return Err(format!("unknown listing `{other}`; expected posts|departments")),
    }
    Ok(())
}

fn print_window(window: &PageWindow) {
    let pages: Vec<String> = window.pages().map(|page| page.to_string()).collect();
    println!(
        "page {} of window [{}] total={} prev={} next={}",
        window.current_page,
        pages.join(" "),
        window.total_count,
        window.has_prev,
        window.has_next
    );
}
