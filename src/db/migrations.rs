//! Database migrations
//!
//! Versioned schema migrations plus seed data for the fixed role set and
//! the default subscription plan. Migrations run at startup inside
//! `DatabaseManager::new` and are idempotent.

use crate::core::error::{BugtrackError, Result};
use rusqlite::Connection;
use tracing::info;

/// Migration version tracking table
const MIGRATION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    applied_at DATETIME DEFAULT CURRENT_TIMESTAMP
)
"#;

/// Initial schema migration (version 1)
const MIGRATION_V1: &str = r#"
-- Roles table (fixed capability buckets plus any custom roles)
CREATE TABLE IF NOT EXISTS roles (
    id TEXT PRIMARY KEY,
    name TEXT UNIQUE NOT NULL,
    description TEXT
);

-- Subscription plans
CREATE TABLE IF NOT EXISTS plans (
    id TEXT PRIMARY KEY,
    name TEXT UNIQUE NOT NULL,
    description TEXT
);

-- Users table (authentication identities)
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT UNIQUE NOT NULL,
    password_hash TEXT NOT NULL,
    first_name TEXT,
    last_name TEXT,
    domain TEXT,
    timezone TEXT,
    role_id TEXT REFERENCES roles(id),
    plan_id TEXT REFERENCES plans(id),
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);
"#;

/// The system-recognized role names, in the order they are seeded.
pub const SYSTEM_ROLES: [(&str, &str); 4] = [
    ("admin", "Administrator with full access"),
    ("developer", "Developer who can manage bugs and projects"),
    ("tester", "Tester who can create and update bugs"),
    ("viewer", "Viewer with read-only access"),
];

const DEFAULT_PLAN: (&str, &str) = ("free", "Free plan for small teams");

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(MIGRATION_TABLE)
        .map_err(BugtrackError::DatabaseError)?;

    let current_version = current_version(conn)?;

    if current_version < 1 {
        info!("Applying migration v1 (initial schema)");
        conn.execute_batch(MIGRATION_V1)
            .map_err(BugtrackError::DatabaseError)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])
            .map_err(BugtrackError::DatabaseError)?;
    }

    // Seed data is applied on every run; inserts are no-ops once present
    seed_roles(conn)?;
    seed_default_plan(conn)?;

    Ok(())
}

fn current_version(conn: &Connection) -> Result<i64> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )
    .map_err(BugtrackError::DatabaseError)
}

/// Seed the fixed set of system roles
fn seed_roles(conn: &Connection) -> Result<()> {
    for (name, description) in SYSTEM_ROLES {
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO roles (id, name, description) VALUES (?, ?, ?)",
                rusqlite::params![uuid::Uuid::new_v4().to_string(), name, description],
            )
            .map_err(BugtrackError::DatabaseError)?;

        if inserted > 0 {
            info!(role = name, "Created role");
        }
    }
    Ok(())
}

/// Seed the default subscription plan
fn seed_default_plan(conn: &Connection) -> Result<()> {
    let (name, description) = DEFAULT_PLAN;
    let inserted = conn
        .execute(
            "INSERT OR IGNORE INTO plans (id, name, description) VALUES (?, ?, ?)",
            rusqlite::params![uuid::Uuid::new_v4().to_string(), name, description],
        )
        .map_err(BugtrackError::DatabaseError)?;

    if inserted > 0 {
        info!(plan = name, "Created plan");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        conn
    }

    #[test]
    fn test_migrations_create_schema() {
        let conn = test_conn();
        run_migrations(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = test_conn();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let role_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM roles", [], |row| row.get(0))
            .unwrap();
        assert_eq!(role_count, SYSTEM_ROLES.len() as i64);

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn test_system_roles_seeded() {
        let conn = test_conn();
        run_migrations(&conn).unwrap();

        for (name, _) in SYSTEM_ROLES {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM roles WHERE name = ?",
                    [name],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "role {} should be seeded", name);
        }
    }

    #[test]
    fn test_email_uniqueness_enforced() {
        let conn = test_conn();
        run_migrations(&conn).unwrap();

        conn.execute(
            "INSERT INTO users (id, email, password_hash) VALUES ('u1', 'a@x.com', 'h1')",
            [],
        )
        .unwrap();

        let duplicate = conn.execute(
            "INSERT INTO users (id, email, password_hash) VALUES ('u2', 'a@x.com', 'h2')",
            [],
        );
        assert!(duplicate.is_err());
    }
}
