/// Integration tests for authentication
///
/// Registration, login, refresh cookie handling, logout and the bearer
/// token guard, driven through the full router.

mod common;

use axum::http::{Method, StatusCode};
use common::{TestContext, PASSWORD};
use serde_json::json;
use taskdesk_shared::models::user::Role;

#[tokio::test]
async fn test_health() {
    let ctx = TestContext::new();
    let response = ctx.request(Method::GET, "/health", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["success"], true);
    assert_eq!(response.body["environment"], "development");
    assert!(response.body["timestamp"].is_string());
}

#[tokio::test]
async fn test_register_sets_cookie_and_returns_user_token() {
    let ctx = TestContext::new();
    let response = ctx.register("a@x.com").await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["success"], true);
    assert_eq!(response.body["data"]["user"]["email"], "a@x.com");
    assert_eq!(response.body["data"]["user"]["role"], "user");
    assert_eq!(response.body["data"]["user"]["isActive"], true);
    assert!(response.body["data"]["user"].get("passwordHash").is_none());
    assert!(response.body["data"].get("refreshToken").is_none());

    let cookie = response.set_cookie().expect("refresh cookie set");
    assert!(cookie.starts_with("refreshToken="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));
    assert!(cookie.contains("Max-Age=604800"));
    assert!(!cookie.contains("Secure"));

    let claims = ctx
        .state
        .tokens
        .verify_access_token(&response.access_token())
        .unwrap();
    assert_eq!(claims.role, Role::User);
    assert_eq!(claims.email, "a@x.com");
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let ctx = TestContext::new();
    assert_eq!(ctx.register("a@x.com").await.status, StatusCode::CREATED);

    let response = ctx.register("a@x.com").await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.code(), "USER_EXISTS");

    // Emails compare case-insensitively
    let response = ctx.register("A@X.COM").await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.code(), "USER_EXISTS");
}

#[tokio::test]
async fn test_register_reports_all_violations() {
    let ctx = TestContext::new();
    let response = ctx
        .post(
            "/api/auth/register",
            None,
            json!({ "name": "R2D2", "email": "not-an-email", "password": "weak" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.code(), "VALIDATION_ERROR");

    let errors = response.body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 3);

    let password_error = errors.iter().find(|e| e["field"] == "password").unwrap();
    assert!(password_error.get("value").is_none());
}

#[tokio::test]
async fn test_register_malformed_json() {
    let ctx = TestContext::new();
    let response = ctx
        .send(
            axum::http::Request::builder()
                .method(Method::POST)
                .uri("/api/auth/register")
                .header("content-type", "application/json")
                .body(axum::body::Body::from("{not json"))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.code(), "VALIDATION_ERROR");
    assert_eq!(response.body["errors"][0]["field"], "body");
}

#[tokio::test]
async fn test_login_errors_do_not_reveal_registered_emails() {
    let ctx = TestContext::new();
    ctx.register("a@x.com").await;

    let wrong_password = ctx
        .post("/api/auth/login", None, json!({ "email": "a@x.com", "password": "Wrong123" }))
        .await;
    let unknown_email = ctx
        .post("/api/auth/login", None, json!({ "email": "nobody@x.com", "password": PASSWORD }))
        .await;

    for response in [&wrong_password, &unknown_email] {
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.code(), "INVALID_CREDENTIALS");
    }
    assert_eq!(wrong_password.body, unknown_email.body);
}

#[tokio::test]
async fn test_login_success() {
    let ctx = TestContext::new();
    ctx.register("a@x.com").await;

    let response = ctx
        .post("/api/auth/login", None, json!({ "email": " A@x.com ", "password": PASSWORD }))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["user"]["email"], "a@x.com");
    assert!(response.set_cookie().is_some());
    assert!(ctx.state.tokens.verify_access_token(&response.access_token()).is_ok());
}

#[tokio::test]
async fn test_login_inactive_account() {
    let ctx = TestContext::new();
    let token = ctx.user_token("a@x.com").await;
    let response = ctx.put("/api/users/deactivate", &token, json!({})).await;
    assert_eq!(response.status, StatusCode::OK);

    let response = ctx
        .post("/api/auth/login", None, json!({ "email": "a@x.com", "password": PASSWORD }))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.code(), "USER_INACTIVE");
}

#[tokio::test]
async fn test_refresh_flow() {
    let ctx = TestContext::new();
    let registered = ctx.register("a@x.com").await;
    let cookie = registered.cookie_pair().unwrap();

    let response = ctx.post_with_cookie("/api/auth/refresh", Some(&cookie)).await;
    assert_eq!(response.status, StatusCode::OK);

    let claims = ctx
        .state
        .tokens
        .verify_access_token(&response.access_token())
        .unwrap();
    assert_eq!(claims.email, "a@x.com");
}

#[tokio::test]
async fn test_refresh_failures() {
    let ctx = TestContext::new();
    let registered = ctx.register("a@x.com").await;

    let response = ctx.post_with_cookie("/api/auth/refresh", None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.code(), "MISSING_REFRESH_TOKEN");

    let response = ctx
        .post_with_cookie("/api/auth/refresh", Some("refreshToken=garbage"))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.code(), "INVALID_REFRESH_TOKEN");

    // An access token is not a refresh token
    let access = registered.access_token();
    let response = ctx
        .post_with_cookie("/api/auth/refresh", Some(&format!("refreshToken={}", access)))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.code(), "INVALID_REFRESH_TOKEN");
}

#[tokio::test]
async fn test_refresh_after_deactivation() {
    let ctx = TestContext::new();
    let registered = ctx.register("a@x.com").await;
    let cookie = registered.cookie_pair().unwrap();

    ctx.put("/api/users/deactivate", &registered.access_token(), json!({}))
        .await;

    let response = ctx.post_with_cookie("/api/auth/refresh", Some(&cookie)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.code(), "USER_NOT_FOUND");
}

#[tokio::test]
async fn test_refresh_reflects_current_role() {
    let ctx = TestContext::new();
    let registered = ctx.register("a@x.com").await;
    let user_id = registered.body["data"]["user"]["id"].as_str().unwrap().to_string();
    let cookie = registered.cookie_pair().unwrap();
    let (_, admin_token) = ctx.admin("admin@x.com").await;

    let response = ctx
        .put(&format!("/api/users/{}", user_id), &admin_token, json!({ "role": "admin" }))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = ctx.post_with_cookie("/api/auth/refresh", Some(&cookie)).await;
    let claims = ctx
        .state
        .tokens
        .verify_access_token(&response.access_token())
        .unwrap();
    assert_eq!(claims.role, Role::Admin);
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let ctx = TestContext::new();
    let response = ctx.post_with_cookie("/api/auth/logout", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "Logout successful");

    let cookie = response.set_cookie().unwrap();
    assert!(cookie.starts_with("refreshToken=;"));
    assert!(cookie.contains("Max-Age=0"));
    assert!(cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn test_profile_requires_valid_access_token() {
    let ctx = TestContext::new();
    let registered = ctx.register("a@x.com").await;

    let response = ctx.request(Method::GET, "/api/auth/profile", None, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.code(), "MISSING_TOKEN");

    let response = ctx.get("/api/auth/profile", "not-a-token").await;
    assert_eq!(response.code(), "INVALID_TOKEN");

    // The refresh token is signed with a different secret
    let refresh = registered.cookie_pair().unwrap().trim_start_matches("refreshToken=").to_string();
    let response = ctx.get("/api/auth/profile", &refresh).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.code(), "INVALID_TOKEN");

    let response = ctx.get("/api/auth/profile", &registered.access_token()).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["user"]["email"], "a@x.com");
}

#[tokio::test]
async fn test_expired_access_token() {
    let ctx = TestContext::with_env(&[("JWT_ACCESS_EXPIRES_IN", "1s")]);
    let token = ctx.user_token("a@x.com").await;

    tokio::time::sleep(std::time::Duration::from_millis(2100)).await;

    let response = ctx.get("/api/auth/profile", &token).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.code(), "TOKEN_EXPIRED");
}

#[tokio::test]
async fn test_token_of_deleted_user() {
    let ctx = TestContext::new();
    let registered = ctx.register("a@x.com").await;
    let user_id = registered.body["data"]["user"]["id"].as_str().unwrap().to_string();
    let (_, admin_token) = ctx.admin("admin@x.com").await;

    let response = ctx.delete(&format!("/api/users/{}", user_id), &admin_token).await;
    assert_eq!(response.status, StatusCode::OK);

    let response = ctx.get("/api/auth/profile", &registered.access_token()).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.code(), "USER_NOT_FOUND");
}

#[tokio::test]
async fn test_production_cookie_and_headers() {
    let ctx = TestContext::with_env(&[
        ("APP_ENV", "production"),
        ("DATABASE_URL", "postgresql://unused/taskdesk"),
    ]);
    let response = ctx.register("a@x.com").await;

    assert!(response.set_cookie().unwrap().contains("Secure"));
    assert!(response.headers.get("strict-transport-security").is_some());
    assert_eq!(response.headers.get("x-content-type-options").unwrap(), "nosniff");
}
