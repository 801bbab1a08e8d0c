//! Database connection management

use anyhow::{Context, Result};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::Path;
use tokio::fs;
use tracing::info;

use crate::types::IsolationLevel;
use gigboard_config::DatabaseConfig;

/// Prepare and establish a database connection
pub async fn prepare_database(config: &DatabaseConfig) -> Result<SqlitePool> {
    ensure_sqlite_path(&config.url).await?;

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await
        .with_context(|| format!("failed to connect to database {}", config.url))?;

    // Enable foreign keys for SQLite
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await
        .context("failed to enable foreign keys for sqlite")?;

    // Enable WAL mode for better performance
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await
        .context("failed to enable WAL mode for sqlite")?;

    // Set busy timeout to prevent database locked errors
    sqlx::query(&format!("PRAGMA busy_timeout = {}", config.busy_timeout_ms))
        .execute(&pool)
        .await
        .context("failed to set busy timeout for sqlite")?;

    info!(url = %config.url, "database connection established");
    Ok(pool)
}

/// Ensure the SQLite database file and directory exist
async fn ensure_sqlite_path(url: &str) -> Result<()> {
    let Some(sqlite_path) = url.strip_prefix("sqlite://") else {
        return Ok(());
    };

    if sqlite_path == ":memory:" {
        return Ok(());
    }

    let path = Path::new(sqlite_path);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("failed to create sqlite directory {}", parent.display())
            })?;
        }
    }

    if fs::metadata(path).await.is_err() {
        fs::OpenOptions::new()
            .create(true)
            .write(true)
            .open(path)
            .await
            .with_context(|| format!("failed to create sqlite database file {}", path.display()))?;
    }

    Ok(())
}

/// Database connection wrapper for easier management
#[derive(Clone)]
pub struct DatabaseConnection {
    pub pool: SqlitePool,
}

impl DatabaseConnection {
    /// Create a new database connection from configuration
    pub async fn from_config(config: &DatabaseConfig) -> Result<Self> {
        let pool = prepare_database(config).await?;
        Ok(Self { pool })
    }

    /// Create a new database connection from an existing pool
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Begin an interactive transaction
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        self.pool
            .begin()
            .await
            .context("failed to begin transaction")
    }

    /// Begin a transaction with a requested isolation level.
    ///
    /// SQLite only honours read-uncommitted; every other level runs under its
    /// default serializable behaviour.
    pub async fn begin_with(
        &self,
        level: IsolationLevel,
    ) -> Result<Transaction<'static, Sqlite>> {
        let mut tx = self.begin().await?;
        if level == IsolationLevel::ReadUncommitted {
            sqlx::query("PRAGMA read_uncommitted = true")
                .execute(&mut *tx)
                .await
                .context("failed to set read_uncommitted pragma")?;
        }
        Ok(tx)
    }

    /// Execute a raw SQL statement, returning the number of affected rows
    pub async fn execute_raw(&self, sql: &str) -> Result<u64> {
        let result = sqlx::query(sql)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to execute raw statement: {sql}"))?;
        Ok(result.rows_affected())
    }

    /// Run a raw SQL query, returning the untyped result rows
    pub async fn fetch_raw(&self, sql: &str) -> Result<Vec<SqliteRow>> {
        sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("failed to run raw query: {sql}"))
    }

    /// Close the database connection pool
    pub async fn close(self) {
        self.pool.close().await;
    }

    /// Test the database connection
    pub async fn test_connection(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("failed to test database connection")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Row;
    use tempfile::TempDir;

    fn test_config(url: String) -> DatabaseConfig {
        DatabaseConfig {
            url,
            max_connections: 1,
            busy_timeout_ms: 5_000,
        }
    }

    #[tokio::test]
    async fn test_database_connection_creation() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let config = test_config(format!("sqlite://{}", db_path.display()));

        let conn = DatabaseConnection::from_config(&config).await.unwrap();
        conn.test_connection().await.unwrap();
    }

    #[tokio::test]
    async fn test_in_memory_database() {
        let config = test_config("sqlite://:memory:".to_string());

        let conn = DatabaseConnection::from_config(&config).await.unwrap();
        conn.test_connection().await.unwrap();
    }

    #[tokio::test]
    async fn test_raw_passthrough() {
        let config = test_config("sqlite://:memory:".to_string());
        let conn = DatabaseConnection::from_config(&config).await.unwrap();

        conn.execute_raw("CREATE TABLE scratch (value INTEGER)")
            .await
            .unwrap();
        let affected = conn
            .execute_raw("INSERT INTO scratch (value) VALUES (1), (2)")
            .await
            .unwrap();
        assert_eq!(affected, 2);

        let rows = conn
            .fetch_raw("SELECT value FROM scratch ORDER BY value")
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get::<i64, _>("value"), 1);
    }

    #[tokio::test]
    async fn test_transaction_rollback_discards_changes() {
        let config = test_config("sqlite://:memory:".to_string());
        let conn = DatabaseConnection::from_config(&config).await.unwrap();
        conn.execute_raw("CREATE TABLE scratch (value INTEGER)")
            .await
            .unwrap();

        let mut tx = conn.begin().await.unwrap();
        sqlx::query("INSERT INTO scratch (value) VALUES (1)")
            .execute(&mut *tx)
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        let rows = conn.fetch_raw("SELECT value FROM scratch").await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_begin_with_isolation_level() {
        let config = test_config("sqlite://:memory:".to_string());
        let conn = DatabaseConnection::from_config(&config).await.unwrap();

        let tx = conn
            .begin_with(IsolationLevel::ReadUncommitted)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let tx = conn.begin_with(IsolationLevel::Serializable).await.unwrap();
        tx.commit().await.unwrap();
    }
}
