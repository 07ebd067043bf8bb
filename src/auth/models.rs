//! Authentication request/response models
//!
//! Every request body is validated explicitly before any workflow logic
//! runs; validation failures carry per-field errors.

use crate::core::error::{BugtrackError, FieldError, Result, ValidationErrors};
use crate::db::models::User;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

const MIN_PASSWORD_LEN: usize = 6;
const MAX_PROFILE_LEN: usize = 100;

fn check_email(errors: &mut Vec<FieldError>, email: &str) {
    if !EMAIL_RE.is_match(email) {
        errors.push(FieldError::new("email", "Must be a valid email address"));
    }
}

fn check_password(errors: &mut Vec<FieldError>, field: &str, password: &str) {
    if password.len() < MIN_PASSWORD_LEN {
        errors.push(FieldError::new(
            field,
            "Must be at least 6 characters long",
        ));
    }
}

fn check_profile_field(errors: &mut Vec<FieldError>, field: &str, value: &Option<String>) {
    if let Some(v) = value {
        if v.len() > MAX_PROFILE_LEN {
            errors.push(FieldError::new(field, "Must be at most 100 characters"));
        }
    }
}

fn check_required(errors: &mut Vec<FieldError>, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(FieldError::new(field, "Is required"));
    }
}

fn finish(errors: Vec<FieldError>) -> Result<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(BugtrackError::ValidationFailed(ValidationErrors(errors)))
    }
}

/// Register request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub domain: Option<String>,
    pub timezone: Option<String>,
    pub role: String,
    pub plan: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        check_email(&mut errors, &self.email);
        check_password(&mut errors, "password", &self.password);
        check_profile_field(&mut errors, "firstName", &self.first_name);
        check_profile_field(&mut errors, "lastName", &self.last_name);
        check_profile_field(&mut errors, "domain", &self.domain);
        check_profile_field(&mut errors, "timezone", &self.timezone);
        check_required(&mut errors, "role", &self.role);
        check_required(&mut errors, "plan", &self.plan);
        finish(errors)
    }
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        check_email(&mut errors, &self.email);
        check_required(&mut errors, "password", &self.password);
        finish(errors)
    }
}

/// Refresh request carrying the long-lived token
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

impl RefreshRequest {
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        check_required(&mut errors, "refreshToken", &self.refresh_token);
        finish(errors)
    }
}

/// Password change request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

impl ChangePasswordRequest {
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        check_required(&mut errors, "currentPassword", &self.current_password);
        check_password(&mut errors, "newPassword", &self.new_password);
        finish(errors)
    }
}

/// Role assignment request
#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: String,
}

impl UpdateRoleRequest {
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        check_required(&mut errors, "role", &self.role);
        finish(errors)
    }
}

/// User info exposed over the API (password hash excluded)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub domain: Option<String>,
    pub timezone: Option<String>,
    pub role: Option<String>,
    pub plan: Option<String>,
    pub created_at: String,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            domain: user.domain,
            timezone: user.timezone,
            role: user.role,
            plan: user.plan,
            created_at: user.created_at,
        }
    }
}

/// Identity plus token pair returned by register and login
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthPayload {
    pub user: UserInfo,
    pub access_token: String,
    pub refresh_token: String,
}

/// Access token returned by refresh
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenPayload {
    pub access_token: String,
}
