//! HTTP server implementation
//!
//! Wires configuration, the database, repositories, and the auth services
//! into an axum router with CORS, request tracing, and graceful shutdown.

use crate::api::handlers::AppState;
use crate::api::routes::build_api_routes;
use crate::auth::service::AuthService;
use crate::auth::token::TokenService;
use crate::core::config::{AuthConfig, ServerConfig};
use crate::core::error::ErrorResponse;
use crate::core::Config;
use crate::db::manager::DatabaseManager;
use crate::db::repository::{PlanRepository, RoleRepository, UserRepository};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// HTTP API Server
pub struct ApiServer {
    router: Router,
    config: ServerConfig,
}

impl ApiServer {
    /// Create a new API server with the given configuration and database manager
    pub fn new(config: &Config, db: Arc<DatabaseManager>) -> Self {
        let state = build_state(&config.auth, db);

        let router = build_api_routes(state)
            .fallback(not_found)
            .layer(TraceLayer::new_for_http())
            .layer(build_cors_layer(&config.server.cors_origin));

        Self {
            router,
            config: config.server.clone(),
        }
    }

    /// Start the HTTP server and listen for requests.
    ///
    /// Blocks until the server is shut down gracefully.
    pub async fn serve(self) -> anyhow::Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let socket_addr: SocketAddr = addr.parse()?;

        let listener = tokio::net::TcpListener::bind(socket_addr).await?;
        info!(addr = %socket_addr, "HTTP server listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("HTTP server shut down gracefully");
        Ok(())
    }

    /// Get a reference to the router
    pub fn router(&self) -> &Router {
        &self.router
    }
}

/// Assemble repositories and auth services into the shared handler state
fn build_state(auth: &AuthConfig, db: Arc<DatabaseManager>) -> AppState {
    let user_repo = Arc::new(UserRepository::new(db.clone()));
    let role_repo = Arc::new(RoleRepository::new(db.clone()));
    let plan_repo = Arc::new(PlanRepository::new(db));

    let token_service = Arc::new(TokenService::from_config(auth));
    let auth_service = Arc::new(AuthService::new(
        user_repo.clone(),
        role_repo.clone(),
        plan_repo.clone(),
        token_service.clone(),
    ));

    AppState {
        user_repo,
        role_repo,
        plan_repo,
        token_service,
        auth_service,
    }
}

fn build_cors_layer(cors_origin: &str) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if cors_origin == "*" {
        cors.allow_origin(Any)
    } else {
        match cors_origin.parse::<axum::http::HeaderValue>() {
            Ok(origin) => cors.allow_origin([origin]),
            Err(_) => {
                tracing::warn!(cors_origin, "Unparseable CORS origin, allowing none");
                cors
            }
        }
    }
}

/// Fallback handler: unknown routes get the standard error envelope
async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new("Resource not found")),
    )
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Initiating graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_router() -> Router {
        let db = Arc::new(DatabaseManager::new_in_memory().expect("in-memory database"));
        let auth = AuthConfig {
            access_secret: "test-access".to_string(),
            refresh_secret: "test-refresh".to_string(),
            access_ttl_minutes: 15,
            refresh_ttl_days: 7,
        };
        build_api_routes(build_state(&auth, db)).fallback(not_found)
    }

    async fn send(
        router: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn register_body(email: &str, role: &str) -> Value {
        json!({
            "email": email,
            "password": "s3cret-pass",
            "firstName": "Test",
            "role": role,
            "plan": "free",
        })
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let router = test_router();
        let (status, body) = send(&router, Method::GET, "/api/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_unknown_route_gets_error_envelope() {
        let router = test_router();
        let (status, body) = send(&router, Method::GET, "/api/nope", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Resource not found");
    }

    #[tokio::test]
    async fn test_auth_lifecycle() {
        let router = test_router();

        // Register a viewer
        let (status, body) = send(
            &router,
            Method::POST,
            "/api/auth/register",
            None,
            Some(register_body("viewer@x.com", "viewer")),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["user"]["role"], "viewer");
        assert!(body["data"]["user"].get("passwordHash").is_none());
        let viewer_token = body["data"]["accessToken"].as_str().unwrap().to_string();
        let viewer_refresh = body["data"]["refreshToken"].as_str().unwrap().to_string();

        // Wrong password is rejected with the generic message
        let (status, body) = send(
            &router,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "viewer@x.com", "password": "wrong-pass" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid email or password");

        // Correct login succeeds
        let (status, body) = send(
            &router,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "viewer@x.com", "password": "s3cret-pass" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["user"]["email"], "viewer@x.com");

        // The caller can see their own identity
        let (status, body) = send(
            &router,
            Method::GET,
            "/api/auth/me",
            Some(&viewer_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["email"], "viewer@x.com");

        // A refresh token redeems for a fresh access token
        let (status, body) = send(
            &router,
            Method::POST,
            "/api/auth/refresh",
            Some(&viewer_token),
            Some(json!({ "refreshToken": viewer_refresh })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"]["accessToken"].as_str().is_some());

        // An access token is not accepted as a refresh token
        let (status, _) = send(
            &router,
            Method::POST,
            "/api/auth/refresh",
            Some(&viewer_token),
            Some(json!({ "refreshToken": viewer_token })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_expired_token_is_unauthorized() {
        let router = test_router();

        // Signed with the right secret but already past its expiry
        let expired = crate::auth::token::TokenService::new(
            "test-access",
            "test-refresh",
            chrono::Duration::minutes(-5),
            chrono::Duration::days(7),
        )
        .issue_access_token("u1", "a@x.com", "admin")
        .unwrap();

        let (status, body) =
            send(&router, Method::GET, "/api/auth/me", Some(&expired), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        // The body does not reveal whether the token was expired or invalid
        assert_eq!(body["message"], "Unauthorized access");
    }

    #[tokio::test]
    async fn test_role_gates() {
        let router = test_router();

        let (_, viewer) = send(
            &router,
            Method::POST,
            "/api/auth/register",
            None,
            Some(register_body("viewer@x.com", "viewer")),
        )
        .await;
        let viewer_token = viewer["data"]["accessToken"].as_str().unwrap().to_string();

        let (_, admin) = send(
            &router,
            Method::POST,
            "/api/auth/register",
            None,
            Some(register_body("admin@x.com", "admin")),
        )
        .await;
        let admin_token = admin["data"]["accessToken"].as_str().unwrap().to_string();

        // No token at all is unauthorized
        let (status, body) = send(&router, Method::GET, "/api/users", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Unauthorized access");

        // A viewer is authenticated but forbidden
        let (status, body) =
            send(&router, Method::GET, "/api/users", Some(&viewer_token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Access forbidden");

        // An admin sees the paginated listing
        let (status, body) =
            send(&router, Method::GET, "/api/users", Some(&admin_token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["pagination"]["totalItems"], 2);
        assert_eq!(body["data"]["items"].as_array().unwrap().len(), 2);

        // Roles listing is open to admin but closed to viewer
        let (status, _) = send(&router, Method::GET, "/api/roles", Some(&admin_token), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) =
            send(&router, Method::GET, "/api/roles", Some(&viewer_token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_user_listing_tolerates_extreme_page() {
        let router = test_router();

        let (_, admin) = send(
            &router,
            Method::POST,
            "/api/auth/register",
            None,
            Some(register_body("admin@x.com", "admin")),
        )
        .await;
        let admin_token = admin["data"]["accessToken"].as_str().unwrap().to_string();

        let (status, body) = send(
            &router,
            Method::GET,
            "/api/users?page=4294967295&pageSize=100",
            Some(&admin_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["items"].as_array().unwrap().len(), 0);
        assert_eq!(body["data"]["pagination"]["currentPage"], 4294967295u32);
        assert_eq!(body["data"]["pagination"]["hasNextPage"], false);
    }

    #[tokio::test]
    async fn test_plans_are_discoverable_when_authenticated() {
        let router = test_router();

        // Not visible without a token
        let (status, _) = send(&router, Method::GET, "/api/plans", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (_, viewer) = send(
            &router,
            Method::POST,
            "/api/auth/register",
            None,
            Some(register_body("viewer@x.com", "viewer")),
        )
        .await;
        let token = viewer["data"]["accessToken"].as_str().unwrap().to_string();

        // Any authenticated caller can list plans (registration needs a
        // plan name, so this is not role-gated)
        let (status, body) = send(&router, Method::GET, "/api/plans", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        let items = body["data"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["name"], "free");

        let plan_id = items[0]["id"].as_str().unwrap().to_string();
        let (status, body) = send(
            &router,
            Method::GET,
            &format!("/api/plans/{}", plan_id),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "free");

        let (status, _) = send(
            &router,
            Method::GET,
            "/api/plans/no-such-plan",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_role_change_applies_on_refresh() {
        let router = test_router();

        let (_, admin) = send(
            &router,
            Method::POST,
            "/api/auth/register",
            None,
            Some(register_body("admin@x.com", "admin")),
        )
        .await;
        let admin_token = admin["data"]["accessToken"].as_str().unwrap().to_string();

        let (_, tester) = send(
            &router,
            Method::POST,
            "/api/auth/register",
            None,
            Some(register_body("tester@x.com", "tester")),
        )
        .await;
        let tester_id = tester["data"]["user"]["id"].as_str().unwrap().to_string();
        let tester_token = tester["data"]["accessToken"].as_str().unwrap().to_string();
        let tester_refresh = tester["data"]["refreshToken"].as_str().unwrap().to_string();

        // Promote the tester to developer
        let (status, body) = send(
            &router,
            Method::PATCH,
            &format!("/api/users/{}/role", tester_id),
            Some(&admin_token),
            Some(json!({ "role": "developer" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["role"], "developer");

        // The old access token still carries the old role
        let (status, _) = send(
            &router,
            Method::GET,
            "/api/roles",
            Some(&tester_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        // Refresh picks up the new role
        let (_, refreshed) = send(
            &router,
            Method::POST,
            "/api/auth/refresh",
            Some(&tester_token),
            Some(json!({ "refreshToken": tester_refresh })),
        )
        .await;
        let new_token = refreshed["data"]["accessToken"].as_str().unwrap();

        let (status, _) = send(&router, Method::GET, "/api/roles", Some(new_token), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_password_change_flow() {
        let router = test_router();

        let (_, user) = send(
            &router,
            Method::POST,
            "/api/auth/register",
            None,
            Some(register_body("ada@x.com", "developer")),
        )
        .await;
        let user_id = user["data"]["user"]["id"].as_str().unwrap().to_string();
        let token = user["data"]["accessToken"].as_str().unwrap().to_string();

        // Wrong current password is rejected
        let (status, _) = send(
            &router,
            Method::PUT,
            &format!("/api/users/{}/password", user_id),
            Some(&token),
            Some(json!({ "currentPassword": "wrong", "newPassword": "new-s3cret" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // Correct current password succeeds
        let (status, body) = send(
            &router,
            Method::PUT,
            &format!("/api/users/{}/password", user_id),
            Some(&token),
            Some(json!({ "currentPassword": "s3cret-pass", "newPassword": "new-s3cret" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        // The new password logs in, the old one does not
        let (status, _) = send(
            &router,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ada@x.com", "password": "s3cret-pass" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(
            &router,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ada@x.com", "password": "new-s3cret" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_validation_failures_carry_field_errors() {
        let router = test_router();

        let (status, body) = send(
            &router,
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "email": "not-an-email",
                "password": "tiny",
                "role": "viewer",
                "plan": "free",
            })),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Validation error");
        let errors = body["errors"].as_array().unwrap();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0]["field"], "email");
    }
}
