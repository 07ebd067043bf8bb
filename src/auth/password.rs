//! Password hashing and verification using bcrypt

use crate::core::error::{BugtrackError, Result};

/// Hash a password using bcrypt with the default cost factor
pub fn hash_password(password: &str) -> Result<String> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| BugtrackError::Internal(format!("Failed to hash password: {}", e)))
}

/// Verify a password against a stored hash.
///
/// A malformed or truncated digest verifies as false rather than erroring,
/// so login failures stay indistinguishable to the caller.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}
