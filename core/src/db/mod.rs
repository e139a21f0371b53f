use anyhow::{Context, Result};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::path::PathBuf;

use crate::config;

pub type DbPool = Pool<SqliteConnectionManager>;

pub fn init_db(workspace_dir: PathBuf) -> Result<DbPool> {
    std::fs::create_dir_all(&workspace_dir)?;
    let db_path = workspace_dir.join("assistdesk.db");
    let mgr = SqliteConnectionManager::file(&db_path);
    let pool = Pool::new(mgr)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;
    prepare(&pool)?;
    Ok(pool)
}

/// Single-connection in-memory database, used by tests and dry runs.
pub fn init_memory_db() -> Result<DbPool> {
    let mgr = SqliteConnectionManager::memory();
    let pool = Pool::builder().max_size(1).build(mgr)?;
    prepare(&pool)?;
    Ok(pool)
}

fn prepare(pool: &DbPool) -> Result<()> {
    let conn = pool.get()?;
    apply_migrations(&conn)?;
    config::seed_defaults(&conn)?;
    Ok(())
}

fn apply_migrations(conn: &Connection) -> Result<()> {
    let migrations: &[(&str, &str)] = &[(
        "0001_init.sql",
        include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../migrations/0001_init.sql"
        )),
    )];

    for (name, sql) in migrations {
        conn.execute_batch(sql)
            .with_context(|| format!("failed to apply migration {name}"))?;
    }
    Ok(())
}
