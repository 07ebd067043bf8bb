//! Database manager implementation
//!
//! This module provides database connection management with:
//! - SQLite connection pool using r2d2
//! - Async wrapper for database operations
//! - Transaction support
//! - Error handling integration with BugtrackError

use crate::core::error::{BugtrackError, Result};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;
use tokio::task;

/// Database manager with connection pool
pub struct DatabaseManager {
    pool: Pool<SqliteConnectionManager>,
}

impl DatabaseManager {
    /// Create a new DatabaseManager with the specified database path and pool size
    pub fn new(db_path: &Path, pool_size: u32, busy_timeout: Duration) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|_e| {
                BugtrackError::DatabaseError(rusqlite::Error::InvalidPath(parent.to_path_buf()))
            })?;
        }

        let manager = SqliteConnectionManager::file(db_path).with_init(move |conn| {
            // Foreign keys enforce the role/plan references on users
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            conn.busy_timeout(busy_timeout)?;
            // WAL mode for better concurrency under parallel requests
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
            Ok(())
        });

        let pool = Pool::builder()
            .max_size(pool_size)
            .connection_timeout(Duration::from_secs(30))
            .build(manager)
            .map_err(|e| BugtrackError::Internal(format!("Failed to build pool: {}", e)))?;

        let manager = Self { pool };

        // Run migrations on initialization
        manager.migrate()?;

        Ok(manager)
    }

    /// Create a new DatabaseManager with an in-memory database for testing
    pub fn new_in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory().with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            Ok(())
        });

        // In-memory databases must use a single connection: every pooled
        // connection would otherwise see its own empty database.
        let pool = Pool::builder()
            .max_size(1)
            .connection_timeout(Duration::from_secs(30))
            .build(manager)
            .map_err(|e| BugtrackError::Internal(format!("Failed to build pool: {}", e)))?;

        let manager = Self { pool };

        manager.migrate()?;

        Ok(manager)
    }

    /// Get a connection from the pool
    pub fn get_connection(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| BugtrackError::Internal(format!("Failed to get connection: {}", e)))
    }

    /// Execute a database operation asynchronously
    ///
    /// This wraps synchronous database operations in tokio::task::spawn_blocking
    /// to avoid blocking the async runtime.
    pub async fn execute<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();

        task::spawn_blocking(move || {
            let conn = pool
                .get()
                .map_err(|e| BugtrackError::Internal(format!("Failed to get connection: {}", e)))?;
            f(&conn)
        })
        .await
        .map_err(|e| BugtrackError::Internal(format!("Database task panicked: {}", e)))?
    }

    /// Execute a database operation within a transaction
    ///
    /// The transaction is automatically committed if the closure returns Ok,
    /// or rolled back if it returns Err.
    pub async fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&rusqlite::Transaction) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();

        task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|e| BugtrackError::Internal(format!("Failed to get connection: {}", e)))?;

            let tx = conn.transaction().map_err(BugtrackError::DatabaseError)?;
            let result = f(&tx)?;
            tx.commit().map_err(BugtrackError::DatabaseError)?;

            Ok(result)
        })
        .await
        .map_err(|e| BugtrackError::Internal(format!("Transaction task panicked: {}", e)))?
    }

    /// Execute database migrations
    pub fn migrate(&self) -> Result<()> {
        let conn = self.get_connection()?;
        crate::db::migrations::run_migrations(&conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = DatabaseManager::new_in_memory().expect("in-memory database");

        let count: i64 = db
            .execute(|conn| {
                conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
                    .map_err(BugtrackError::DatabaseError)
            })
            .await
            .expect("query users table");

        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_transaction_rolls_back_on_error() {
        let db = DatabaseManager::new_in_memory().expect("in-memory database");

        let result: Result<()> = db
            .transaction(|tx| {
                tx.execute(
                    "INSERT INTO roles (id, name, description) VALUES ('x', 'temp', NULL)",
                    [],
                )
                .map_err(BugtrackError::DatabaseError)?;
                Err(BugtrackError::Internal("forced rollback".to_string()))
            })
            .await;
        assert!(result.is_err());

        let count: i64 = db
            .execute(|conn| {
                conn.query_row("SELECT COUNT(*) FROM roles WHERE name = 'temp'", [], |row| {
                    row.get(0)
                })
                .map_err(BugtrackError::DatabaseError)
            })
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
