//! Ordered schema steps for the catalog, board and organization tables.
//!
//! # Invariants
//! - Step versions are contiguous from 1; `PRAGMA user_version` holds the last
//!   applied step.
//! - All pending steps commit in one transaction.
//! - After migrating, every table a step declares must exist; a database that
//!   claims the latest version without them is rejected.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::{Connection, Transaction};

/// One schema step and the tables it is responsible for.
#[derive(Debug, Clone, Copy)]
pub struct SchemaStep {
    pub version: u32,
    pub name: &'static str,
    pub tables: &'static [&'static str],
    sql: &'static str,
}

pub const SCHEMA_STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        name: "catalog",
        tables: &["tbl_product", "tbl_student"],
        sql: include_str!("0001_catalog.sql"),
    },
    SchemaStep {
        version: 2,
        name: "board",
        tables: &["tbl_post", "tbl_hash_tag"],
        sql: include_str!("0002_board.sql"),
    },
    SchemaStep {
        version: 3,
        name: "organization",
        tables: &["tbl_dept", "tbl_emp"],
        sql: include_str!("0003_organization.sql"),
    },
];

pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |step| step.version)
}

/// Brings the schema to `latest_version()` and checks the board tables exist.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from_version = schema_version(conn)?;
    let latest = latest_version();
    if from_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from_version,
            latest_supported: latest,
        });
    }

    let pending: Vec<&SchemaStep> = SCHEMA_STEPS
        .iter()
        .filter(|step| step.version > from_version)
        .collect();
    if !pending.is_empty() {
        let tx = conn.transaction()?;
        for step in &pending {
            run_step(&tx, step)?;
        }
        tx.commit()?;
        info!(
            "event=db_migrate module=db status=ok from_version={from_version} to_version={latest} steps={}",
            pending.len()
        );
    }

    verify_tables(conn)
}

fn run_step(tx: &Transaction<'_>, step: &SchemaStep) -> DbResult<()> {
    tx.execute_batch(step.sql)?;
    tx.pragma_update(None, "user_version", step.version)?;
    debug!(
        "event=db_migrate_step module=db status=ok version={} name={}",
        step.version, step.name
    );
    Ok(())
}

fn verify_tables(conn: &Connection) -> DbResult<()> {
    let mut stmt = conn.prepare(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1);",
    )?;
    for step in SCHEMA_STEPS {
        for &table in step.tables {
            let exists: bool = stmt.query_row([table], |row| row.get(0))?;
            if !exists {
                return Err(DbError::MissingTable {
                    table,
                    step: step.name,
                });
            }
        }
    }
    Ok(())
}

fn schema_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
