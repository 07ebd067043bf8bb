//! Database models
//!
//! Data structures representing database tables

use serde::{Deserialize, Serialize};

/// User record in the database, with role and plan names joined out.
///
/// The password hash never leaves the persistence boundary: API-facing
/// representations go through `auth::models::UserInfo`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub domain: Option<String>,
    pub timezone: Option<String>,
    /// Role name resolved via join, None when the reference is null
    pub role: Option<String>,
    /// Plan name resolved via join, None when the reference is null
    pub plan: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields required to insert a new user row
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub domain: Option<String>,
    pub timezone: Option<String>,
    pub role_id: Option<String>,
    pub plan_id: Option<String>,
}

/// Role record in the database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

/// Subscription plan record in the database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}
