//! Database connection manager backed by an r2d2 SQLite pool.

use std::path::{Path, PathBuf};

use my500_domain::{DatabaseConfig, My500Error, Result};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use tracing::info;

use crate::errors::InfraError;

const SCHEMA_VERSION: i32 = 1;
const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Database manager that owns the connection pool.
pub struct DbManager {
    pool: Pool<SqliteConnectionManager>,
    path: PathBuf,
}

impl DbManager {
    /// Create a new manager with the given pool size.
    pub fn new<P: AsRef<Path>>(db_path: P, pool_size: u32) -> Result<Self> {
        let path = db_path.as_ref().to_path_buf();

        let manager = SqliteConnectionManager::file(&path).with_init(|conn| {
            conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
        });

        let pool = Pool::builder()
            .max_size(pool_size.max(1))
            .build(manager)
            .map_err(|err| My500Error::from(InfraError::from(err)))?;

        info!(db_path = %path.display(), max_connections = pool.max_size(), "database pool initialised");

        Ok(Self { pool, path })
    }

    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        Self::new(&config.path, config.pool_size)
    }

    /// Acquire a connection from the pool.
    pub fn get_connection(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(|err| My500Error::from(InfraError::from(err)))
    }

    /// Ensure the full schema exists on the current database.
    pub fn run_migrations(&self) -> Result<()> {
        let conn = self.get_connection()?;
        conn.execute_batch(SCHEMA_SQL).map_err(map_sql_error)?;
        conn.execute(
            "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?, CAST(strftime('%s','now') AS INTEGER))",
            params![SCHEMA_VERSION],
        )
        .map_err(map_sql_error)?;
        Ok(())
    }

    /// Return the configured database path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Verify the database is reachable and responding.
    pub fn health_check(&self) -> Result<()> {
        let conn = self.get_connection()?;
        conn.query_row("SELECT 1", params![], |row| row.get::<_, i32>(0)).map_err(map_sql_error)?;
        Ok(())
    }
}

pub(crate) fn map_sql_error(err: rusqlite::Error) -> My500Error {
    My500Error::from(InfraError::from(err))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn migrations_record_schema_version() {
        let temp_dir = TempDir::new().expect("temp dir created");
        let db_path = temp_dir.path().join("test.db");

        let manager = DbManager::new(&db_path, 4).expect("manager created");
        manager.run_migrations().expect("migrations run");

        let conn = manager.get_connection().expect("connection");
        let version: i32 = conn
            .query_row("SELECT MAX(version) FROM schema_version", params![], |row| row.get(0))
            .expect("schema version row");
        assert_eq!(version, 1);
    }

    #[test]
    fn migrations_are_idempotent() {
        let temp_dir = TempDir::new().expect("temp dir created");
        let manager = DbManager::new(temp_dir.path().join("test.db"), 2).expect("manager");

        manager.run_migrations().expect("first run");
        manager.run_migrations().expect("second run");
        manager.health_check().expect("healthy");
    }

    #[test]
    fn foreign_keys_are_enforced() {
        let temp_dir = TempDir::new().expect("temp dir created");
        let manager = DbManager::new(temp_dir.path().join("test.db"), 2).expect("manager");
        manager.run_migrations().expect("migrations");

        let conn = manager.get_connection().expect("connection");
        let result = conn.execute(
            "INSERT INTO contacts (id, user_id, name, created_at, updated_at) VALUES ('c1', 'missing-user', 'x', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
            params![],
        );
        assert!(result.is_err());
    }
}
