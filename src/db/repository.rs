//! Repository pattern implementation for data access layer
//!
//! Repositories own all SQL for their entity. Constraint violations are
//! translated into the error taxonomy here (unique email -> AlreadyExists)
//! so callers never see raw database error codes.

use crate::core::error::{BugtrackError, Result};
use crate::db::manager::DatabaseManager;
use crate::db::models::{NewUser, Plan, Role, User};
use async_trait::async_trait;
use rusqlite::{OptionalExtension, Row};
use std::sync::Arc;

/// Generic repository trait for read operations
#[async_trait]
pub trait Repository<T>: Send + Sync {
    /// Find an entity by its ID
    async fn find_by_id(&self, id: &str) -> Result<Option<T>>;

    /// Find all entities
    async fn find_all(&self) -> Result<Vec<T>>;
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

const USER_SELECT: &str = "SELECT u.id, u.email, u.password_hash, u.first_name, u.last_name, \
     u.domain, u.timezone, r.name, p.name, u.created_at, u.updated_at \
     FROM users u \
     LEFT JOIN roles r ON u.role_id = r.id \
     LEFT JOIN plans p ON u.plan_id = p.id";

fn map_user_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        domain: row.get(5)?,
        timezone: row.get(6)?,
        role: row.get(7)?,
        plan: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

/// Repository for User entities
pub struct UserRepository {
    db: Arc<DatabaseManager>,
}

impl UserRepository {
    /// Create a new UserRepository
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }

    /// Find a user by email (case-sensitive, as stored)
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.to_string();
        self.db
            .execute(move |conn| {
                conn.query_row(
                    &format!("{} WHERE u.email = ?", USER_SELECT),
                    [&email],
                    map_user_row,
                )
                .optional()
                .map_err(BugtrackError::DatabaseError)
            })
            .await
    }

    /// Insert a new user. A unique-constraint violation on email surfaces
    /// as AlreadyExists, which also covers the concurrent-registration race.
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        let user = new_user.clone();
        let id = new_user.id.clone();

        self.db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO users (id, email, password_hash, first_name, last_name, \
                     domain, timezone, role_id, plan_id) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                    rusqlite::params![
                        &user.id,
                        &user.email,
                        &user.password_hash,
                        &user.first_name,
                        &user.last_name,
                        &user.domain,
                        &user.timezone,
                        &user.role_id,
                        &user.plan_id,
                    ],
                )
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        BugtrackError::AlreadyExists("User already exists".to_string())
                    } else {
                        BugtrackError::DatabaseError(e)
                    }
                })?;

                conn.query_row(
                    &format!("{} WHERE u.id = ?", USER_SELECT),
                    [&id],
                    map_user_row,
                )
                .map_err(BugtrackError::DatabaseError)
            })
            .await
    }

    /// Find users with pagination, newest first. The offset is 64-bit so
    /// an out-of-range page selects an empty result rather than wrapping.
    pub async fn find_page(&self, limit: u32, offset: u64) -> Result<Vec<User>> {
        self.db
            .execute(move |conn| {
                let mut stmt = conn
                    .prepare(&format!(
                        "{} ORDER BY u.created_at DESC LIMIT ? OFFSET ?",
                        USER_SELECT
                    ))
                    .map_err(BugtrackError::DatabaseError)?;

                let users = stmt
                    .query_map(rusqlite::params![limit, offset], map_user_row)
                    .map_err(BugtrackError::DatabaseError)?
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(BugtrackError::DatabaseError)?;

                Ok(users)
            })
            .await
    }

    /// Count total users
    pub async fn count(&self) -> Result<i64> {
        self.db
            .execute(|conn| {
                conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
                    .map_err(BugtrackError::DatabaseError)
            })
            .await
    }

    /// Update a user's password hash
    pub async fn update_password(&self, user_id: &str, password_hash: &str) -> Result<()> {
        let user_id = user_id.to_string();
        let password_hash = password_hash.to_string();
        self.db
            .execute(move |conn| {
                let updated = conn
                    .execute(
                        "UPDATE users SET password_hash = ?, updated_at = CURRENT_TIMESTAMP \
                         WHERE id = ?",
                        rusqlite::params![&password_hash, &user_id],
                    )
                    .map_err(BugtrackError::DatabaseError)?;

                if updated == 0 {
                    return Err(BugtrackError::NotFound("User not found".to_string()));
                }
                Ok(())
            })
            .await
    }

    /// Update a user's role reference
    pub async fn update_role(&self, user_id: &str, role_id: &str) -> Result<()> {
        let user_id = user_id.to_string();
        let role_id = role_id.to_string();
        self.db
            .execute(move |conn| {
                let updated = conn
                    .execute(
                        "UPDATE users SET role_id = ?, updated_at = CURRENT_TIMESTAMP \
                         WHERE id = ?",
                        rusqlite::params![&role_id, &user_id],
                    )
                    .map_err(BugtrackError::DatabaseError)?;

                if updated == 0 {
                    return Err(BugtrackError::NotFound("User not found".to_string()));
                }
                Ok(())
            })
            .await
    }
}

#[async_trait]
impl Repository<User> for UserRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        let id = id.to_string();
        self.db
            .execute(move |conn| {
                conn.query_row(
                    &format!("{} WHERE u.id = ?", USER_SELECT),
                    [&id],
                    map_user_row,
                )
                .optional()
                .map_err(BugtrackError::DatabaseError)
            })
            .await
    }

    async fn find_all(&self) -> Result<Vec<User>> {
        self.db
            .execute(|conn| {
                let mut stmt = conn
                    .prepare(&format!("{} ORDER BY u.created_at DESC", USER_SELECT))
                    .map_err(BugtrackError::DatabaseError)?;

                let users = stmt
                    .query_map([], map_user_row)
                    .map_err(BugtrackError::DatabaseError)?
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(BugtrackError::DatabaseError)?;

                Ok(users)
            })
            .await
    }
}

/// Repository for Role entities
pub struct RoleRepository {
    db: Arc<DatabaseManager>,
}

impl RoleRepository {
    /// Create a new RoleRepository
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }

    /// Find a role by its unique name
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Role>> {
        let name = name.to_string();
        self.db
            .execute(move |conn| {
                conn.query_row(
                    "SELECT id, name, description FROM roles WHERE name = ?",
                    [&name],
                    |row| {
                        Ok(Role {
                            id: row.get(0)?,
                            name: row.get(1)?,
                            description: row.get(2)?,
                        })
                    },
                )
                .optional()
                .map_err(BugtrackError::DatabaseError)
            })
            .await
    }
}

#[async_trait]
impl Repository<Role> for RoleRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Role>> {
        let id = id.to_string();
        self.db
            .execute(move |conn| {
                conn.query_row(
                    "SELECT id, name, description FROM roles WHERE id = ?",
                    [&id],
                    |row| {
                        Ok(Role {
                            id: row.get(0)?,
                            name: row.get(1)?,
                            description: row.get(2)?,
                        })
                    },
                )
                .optional()
                .map_err(BugtrackError::DatabaseError)
            })
            .await
    }

    async fn find_all(&self) -> Result<Vec<Role>> {
        self.db
            .execute(|conn| {
                let mut stmt = conn
                    .prepare("SELECT id, name, description FROM roles ORDER BY name ASC")
                    .map_err(BugtrackError::DatabaseError)?;

                let roles = stmt
                    .query_map([], |row| {
                        Ok(Role {
                            id: row.get(0)?,
                            name: row.get(1)?,
                            description: row.get(2)?,
                        })
                    })
                    .map_err(BugtrackError::DatabaseError)?
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(BugtrackError::DatabaseError)?;

                Ok(roles)
            })
            .await
    }
}

/// Repository for Plan entities
pub struct PlanRepository {
    db: Arc<DatabaseManager>,
}

impl PlanRepository {
    /// Create a new PlanRepository
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }

    /// Find a plan by its unique name
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Plan>> {
        let name = name.to_string();
        self.db
            .execute(move |conn| {
                conn.query_row(
                    "SELECT id, name, description FROM plans WHERE name = ?",
                    [&name],
                    |row| {
                        Ok(Plan {
                            id: row.get(0)?,
                            name: row.get(1)?,
                            description: row.get(2)?,
                        })
                    },
                )
                .optional()
                .map_err(BugtrackError::DatabaseError)
            })
            .await
    }
}

#[async_trait]
impl Repository<Plan> for PlanRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Plan>> {
        let id = id.to_string();
        self.db
            .execute(move |conn| {
                conn.query_row(
                    "SELECT id, name, description FROM plans WHERE id = ?",
                    [&id],
                    |row| {
                        Ok(Plan {
                            id: row.get(0)?,
                            name: row.get(1)?,
                            description: row.get(2)?,
                        })
                    },
                )
                .optional()
                .map_err(BugtrackError::DatabaseError)
            })
            .await
    }

    async fn find_all(&self) -> Result<Vec<Plan>> {
        self.db
            .execute(|conn| {
                let mut stmt = conn
                    .prepare("SELECT id, name, description FROM plans ORDER BY name ASC")
                    .map_err(BugtrackError::DatabaseError)?;

                let plans = stmt
                    .query_map([], |row| {
                        Ok(Plan {
                            id: row.get(0)?,
                            name: row.get(1)?,
                            description: row.get(2)?,
                        })
                    })
                    .map_err(BugtrackError::DatabaseError)?
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(BugtrackError::DatabaseError)?;

                Ok(plans)
            })
            .await
    }
}
