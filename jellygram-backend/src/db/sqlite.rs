//! SQLite connection pool and schema bootstrap for the account ledger.

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Result as SqliteResult;
use std::path::Path;

pub type DbConn = PooledConnection<SqliteConnectionManager>;

pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    pub fn new(path: &str) -> SqliteResult<Self> {
        if let Some(dir) = Path::new(path).parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                log::info!("[DB] Creating database directory: {}", dir.display());
                std::fs::create_dir_all(dir).map_err(|e| {
                    rusqlite::Error::InvalidPath(format!("{}: {}", dir.display(), e).into())
                })?;
            }
        }

        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder()
            .max_size(8)
            .build(manager)
            .expect("Failed to create SQLite connection pool");

        let db = Self { pool };
        db.migrate()?;
        Ok(db)
    }

    #[cfg(test)]
    pub fn new_in_memory() -> SqliteResult<Self> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .expect("Failed to create SQLite connection pool");
        let db = Self { pool };
        db.migrate()?;
        Ok(db)
    }

    pub fn conn(&self) -> DbConn {
        self.pool.get().expect("Failed to get connection from pool")
    }

    fn migrate(&self) -> SqliteResult<()> {
        let conn = self.conn();
        conn.execute(
            "CREATE TABLE IF NOT EXISTS linked_accounts (
                chat_user_id TEXT PRIMARY KEY,
                request_user_id TEXT,
                media_user_id TEXT,
                username TEXT,
                created_at TEXT,
                expires_at TEXT,
                guild_id TEXT,
                role_name TEXT
            )",
            [],
        )?;
        Ok(())
    }
}
