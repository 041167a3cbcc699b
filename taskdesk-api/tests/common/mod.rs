#![allow(dead_code)]

/// Common test utilities for integration tests
///
/// Every test gets its own router over a fresh in-memory store, so tests
/// are independent and need no external services.
///
/// - [`TestContext`]: state, router and request helpers
/// - [`TestResponse`]: status, headers and parsed JSON body

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use taskdesk_api::app::{build_router, AppState};
use taskdesk_api::config::Config;
use taskdesk_shared::auth::password::hash_password;
use taskdesk_shared::models::user::{CreateUser, Role, User};
use taskdesk_shared::store::UserStore;
use tower::ServiceExt;

pub const ACCESS_SECRET: &str = "integration-access-secret-0123456789abcdef";
pub const REFRESH_SECRET: &str = "integration-refresh-secret-0123456789abcdef";

/// Password that satisfies the strength rules
pub const PASSWORD: &str = "Abc123";

/// Test context containing the app and its state
pub struct TestContext {
    pub state: AppState,
    pub app: Router,
}

/// Parsed response
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// Raw `Set-Cookie` header, if any
    pub fn set_cookie(&self) -> Option<String> {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    /// `name=value` part of the `Set-Cookie` header, ready to send back
    pub fn cookie_pair(&self) -> Option<String> {
        self.set_cookie()
            .and_then(|c| c.split(';').next().map(str::to_string))
    }

    pub fn code(&self) -> &str {
        self.body["code"].as_str().unwrap_or_default()
    }

    pub fn access_token(&self) -> String {
        self.body["data"]["accessToken"]
            .as_str()
            .expect("response carries an access token")
            .to_string()
    }
}

impl TestContext {
    /// Development-mode context
    pub fn new() -> Self {
        Self::with_env(&[])
    }

    /// Context with extra configuration variables
    pub fn with_env(vars: &[(&str, &str)]) -> Self {
        let vars: Vec<(String, String)> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let config = Config::from_lookup(|key| {
            if let Some((_, v)) = vars.iter().find(|(k, _)| k == key) {
                return Some(v.clone());
            }
            match key {
                "JWT_ACCESS_SECRET" => Some(ACCESS_SECRET.to_string()),
                "JWT_REFRESH_SECRET" => Some(REFRESH_SECRET.to_string()),
                _ => None,
            }
        })
        .expect("test configuration is valid");

        let state = AppState::in_memory(config);
        let app = build_router(state.clone());
        Self { state, app }
    }

    /// Sends a request and parses the JSON body (Null when empty)
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                panic!("non-JSON body ({}): {}", status, String::from_utf8_lossy(&bytes))
            })
        };

        TestResponse { status, headers, body }
    }

    /// JSON request with an optional bearer token
    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.send(builder.body(body).unwrap()).await
    }

    pub async fn get(&self, uri: &str, token: &str) -> TestResponse {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> TestResponse {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    /// POST with a `Cookie` header and no body
    pub async fn post_with_cookie(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method(Method::POST).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// Registers through the API and returns the response
    pub async fn register(&self, email: &str) -> TestResponse {
        self.post(
            "/api/auth/register",
            None,
            serde_json::json!({ "email": email, "password": PASSWORD }),
        )
        .await
    }

    /// Registers a regular user and returns their access token
    pub async fn user_token(&self, email: &str) -> String {
        let response = self.register(email).await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.access_token()
    }

    /// Inserts an admin directly into the store and returns it with a token
    pub async fn admin(&self, email: &str) -> (User, String) {
        let user = self
            .state
            .users
            .create(CreateUser {
                name: "Admin".to_string(),
                email: email.to_string(),
                password_hash: hash_password(PASSWORD).expect("hash"),
                role: Role::Admin,
            })
            .await
            .expect("admin created");

        let token = self.state.tokens.issue_access_token(&user).expect("token");
        (user, token)
    }

    /// Creates a task as the token's owner and returns its ID
    pub async fn create_task(&self, token: &str, title: &str) -> String {
        let response = self
            .post(
                "/api/tasks",
                Some(token),
                serde_json::json!({ "title": title, "description": format!("{} description", title) }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body["data"]["task"]["id"]
            .as_str()
            .expect("task id")
            .to_string()
    }
}
