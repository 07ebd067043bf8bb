//! Authentication workflow service
//!
//! Orchestrates registration, login, and token refresh over the
//! repositories, the password hasher, and the token service. Bcrypt work
//! runs on the blocking pool so request tasks are never stalled on it.

use crate::auth::models::{AccessTokenPayload, AuthPayload, LoginRequest, RegisterRequest, UserInfo};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::token::{TokenError, TokenService};
use crate::core::error::{BugtrackError, Result};
use crate::db::models::{NewUser, User};
use crate::db::repository::{PlanRepository, Repository, RoleRepository, UserRepository};
use std::sync::Arc;
use tokio::task;
use uuid::Uuid;

fn signing_failure(e: TokenError) -> BugtrackError {
    BugtrackError::Internal(format!("Token signing failed: {}", e))
}

/// Authentication workflow over users, roles, plans and the token service
pub struct AuthService {
    user_repo: Arc<UserRepository>,
    role_repo: Arc<RoleRepository>,
    plan_repo: Arc<PlanRepository>,
    tokens: Arc<TokenService>,
}

impl AuthService {
    pub fn new(
        user_repo: Arc<UserRepository>,
        role_repo: Arc<RoleRepository>,
        plan_repo: Arc<PlanRepository>,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            user_repo,
            role_repo,
            plan_repo,
            tokens,
        }
    }

    /// Register a new identity and issue its first token pair
    pub async fn register(&self, req: RegisterRequest) -> Result<AuthPayload> {
        req.validate()?;

        // Pre-check for a friendly conflict; the unique constraint still
        // backs this up under concurrent registration.
        if self.user_repo.find_by_email(&req.email).await?.is_some() {
            return Err(BugtrackError::AlreadyExists(
                "User already exists".to_string(),
            ));
        }

        let role = self
            .role_repo
            .find_by_name(&req.role)
            .await?
            .ok_or_else(|| BugtrackError::NotFound("Role not found".to_string()))?;
        let plan = self
            .plan_repo
            .find_by_name(&req.plan)
            .await?
            .ok_or_else(|| BugtrackError::NotFound("Plan not found".to_string()))?;

        let password = req.password.clone();
        let password_hash = task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| BugtrackError::Internal(format!("Hashing task panicked: {}", e)))??;

        let user = self
            .user_repo
            .create(&NewUser {
                id: Uuid::new_v4().to_string(),
                email: req.email,
                password_hash,
                first_name: req.first_name,
                last_name: req.last_name,
                domain: req.domain,
                timezone: req.timezone,
                role_id: Some(role.id),
                plan_id: Some(plan.id),
            })
            .await?;

        tracing::info!(user_id = %user.id, email = %user.email, role = %role.name, "User registered");

        self.issue_pair(user)
    }

    /// Authenticate by email and password.
    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn login(&self, req: LoginRequest) -> Result<AuthPayload> {
        req.validate()?;

        let user = self
            .user_repo
            .find_by_email(&req.email)
            .await?
            .ok_or(BugtrackError::InvalidCredentials)?;

        let password = req.password;
        let hash = user.password_hash.clone();
        let valid = task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| BugtrackError::Internal(format!("Hashing task panicked: {}", e)))?;

        if !valid {
            tracing::warn!(email = %req.email, "Login failed");
            return Err(BugtrackError::InvalidCredentials);
        }

        tracing::info!(user_id = %user.id, email = %user.email, "Login successful");

        self.issue_pair(user)
    }

    /// Mint a fresh access token for an identity. The role comes from the
    /// identity's *current* stored state, so role changes apply immediately.
    /// The caller is responsible for having verified a refresh token first.
    pub async fn refresh_access_token(&self, user_id: &str) -> Result<AccessTokenPayload> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| BugtrackError::NotFound("User not found".to_string()))?;

        let access_token = self
            .tokens
            .issue_access_token(&user.id, &user.email, user.role.as_deref().unwrap_or(""))
            .map_err(signing_failure)?;

        tracing::info!(user_id = %user.id, "Access token refreshed");

        Ok(AccessTokenPayload { access_token })
    }

    fn issue_pair(&self, user: User) -> Result<AuthPayload> {
        let access_token = self
            .tokens
            .issue_access_token(&user.id, &user.email, user.role.as_deref().unwrap_or(""))
            .map_err(signing_failure)?;
        let refresh_token = self
            .tokens
            .issue_refresh_token(&user.id, &user.email)
            .map_err(signing_failure)?;

        Ok(AuthPayload {
            user: UserInfo::from(user),
            access_token,
            refresh_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::manager::DatabaseManager;
    use chrono::Duration;

    struct Fixture {
        service: AuthService,
        tokens: Arc<TokenService>,
        user_repo: Arc<UserRepository>,
        role_repo: Arc<RoleRepository>,
    }

    fn fixture() -> Fixture {
        let db = Arc::new(DatabaseManager::new_in_memory().expect("in-memory database"));
        let user_repo = Arc::new(UserRepository::new(db.clone()));
        let role_repo = Arc::new(RoleRepository::new(db.clone()));
        let plan_repo = Arc::new(PlanRepository::new(db.clone()));
        let tokens = Arc::new(TokenService::new(
            "test-access",
            "test-refresh",
            Duration::minutes(15),
            Duration::days(7),
        ));

        Fixture {
            service: AuthService::new(
                user_repo.clone(),
                role_repo.clone(),
                plan_repo,
                tokens.clone(),
            ),
            tokens,
            user_repo,
            role_repo,
        }
    }

    fn register_req(email: &str, role: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: "s3cret-pass".to_string(),
            first_name: Some("Ada".to_string()),
            last_name: None,
            domain: None,
            timezone: None,
            role: role.to_string(),
            plan: "free".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_issues_verifiable_tokens() {
        let f = fixture();
        let payload = f
            .service
            .register(register_req("ada@x.com", "developer"))
            .await
            .unwrap();

        assert_eq!(payload.user.email, "ada@x.com");
        assert_eq!(payload.user.role.as_deref(), Some("developer"));

        let claims = f.tokens.verify_access_token(&payload.access_token).unwrap();
        assert_eq!(claims.sub, payload.user.id);
        assert_eq!(claims.role, "developer");

        let refresh = f
            .tokens
            .verify_refresh_token(&payload.refresh_token)
            .unwrap();
        assert_eq!(refresh.sub, payload.user.id);
    }

    #[tokio::test]
    async fn test_register_duplicate_email_conflicts() {
        let f = fixture();
        f.service
            .register(register_req("dup@x.com", "viewer"))
            .await
            .unwrap();

        let err = f
            .service
            .register(register_req("dup@x.com", "viewer"))
            .await
            .unwrap_err();
        assert!(matches!(err, BugtrackError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_register_unknown_role_not_found() {
        let f = fixture();
        let err = f
            .service
            .register(register_req("ada@x.com", "superuser"))
            .await
            .unwrap_err();
        assert!(matches!(err, BugtrackError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_register_validates_request() {
        let f = fixture();
        let mut req = register_req("ada@x.com", "viewer");
        req.password = "tiny".to_string();

        let err = f.service.register(req).await.unwrap_err();
        assert!(matches!(err, BugtrackError::ValidationFailed(_)));
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let f = fixture();
        f.service
            .register(register_req("ada@x.com", "viewer"))
            .await
            .unwrap();

        let unknown = f
            .service
            .login(LoginRequest {
                email: "nobody@x.com".to_string(),
                password: "s3cret-pass".to_string(),
            })
            .await
            .unwrap_err();
        let wrong = f
            .service
            .login(LoginRequest {
                email: "ada@x.com".to_string(),
                password: "wrong-pass".to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(unknown.to_string(), wrong.to_string());
        assert!(matches!(unknown, BugtrackError::InvalidCredentials));
        assert!(matches!(wrong, BugtrackError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_login_success() {
        let f = fixture();
        let registered = f
            .service
            .register(register_req("ada@x.com", "tester"))
            .await
            .unwrap();

        let payload = f
            .service
            .login(LoginRequest {
                email: "ada@x.com".to_string(),
                password: "s3cret-pass".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(payload.user.id, registered.user.id);
        let claims = f.tokens.verify_access_token(&payload.access_token).unwrap();
        assert_eq!(claims.role, "tester");
    }

    #[tokio::test]
    async fn test_refresh_reflects_current_role() {
        let f = fixture();
        let registered = f
            .service
            .register(register_req("ada@x.com", "tester"))
            .await
            .unwrap();

        let admin = f.role_repo.find_by_name("admin").await.unwrap().unwrap();
        f.user_repo
            .update_role(&registered.user.id, &admin.id)
            .await
            .unwrap();

        let refreshed = f
            .service
            .refresh_access_token(&registered.user.id)
            .await
            .unwrap();
        let claims = f
            .tokens
            .verify_access_token(&refreshed.access_token)
            .unwrap();
        assert_eq!(claims.role, "admin");
    }

    #[tokio::test]
    async fn test_refresh_unknown_identity_not_found() {
        let f = fixture();
        let err = f
            .service
            .refresh_access_token("no-such-id")
            .await
            .unwrap_err();
        assert!(matches!(err, BugtrackError::NotFound(_)));
    }
}
