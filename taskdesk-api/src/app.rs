/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use taskdesk_api::{app::{build_router, AppState}, config::Config};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::in_memory(config);
/// let app = build_router(state);
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:5000").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    error::{expose_internal_detail, ApiError},
    middleware::{
        auth::{require_admin, require_auth},
        security::SecurityHeadersLayer,
    },
};
use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use taskdesk_shared::auth::jwt::TokenService;
use taskdesk_shared::services::{AccountService, TaskService};
use taskdesk_shared::store::{MemoryStore, PgStore, TaskStore, UserStore};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor. Every
/// field is an `Arc` or wraps one.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub tokens: TokenService,
    pub accounts: AccountService,
    pub task_service: TaskService,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires services over the given stores
    pub fn new(users: Arc<dyn UserStore>, tasks: Arc<dyn TaskStore>, config: Config) -> Self {
        let tokens = TokenService::new(config.token_settings());
        let accounts = AccountService::new(users.clone(), tokens.clone());
        let task_service = TaskService::new(tasks, users.clone());

        Self {
            users,
            tokens,
            accounts,
            task_service,
            config: Arc::new(config),
        }
    }

    /// State over a fresh in-memory store
    pub fn in_memory(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::new(store.clone(), store, config)
    }

    /// State over PostgreSQL
    pub fn postgres(pool: PgPool, config: Config) -> Self {
        let store = Arc::new(PgStore::new(pool));
        Self::new(store.clone(), store, config)
    }

    pub fn is_production(&self) -> bool {
        self.config.api.is_production()
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET /health                        # Liveness (public)
/// └── /api/
///     ├── /auth/
///     │   ├── POST /register             # public
///     │   ├── POST /login                # public
///     │   ├── POST /logout               # public
///     │   ├── POST /refresh              # refresh cookie
///     │   └── GET  /profile              # authenticated
///     ├── /tasks/                        # authenticated
///     │   ├── GET, POST /
///     │   ├── GET /stats
///     │   └── GET, PUT, DELETE /:id
///     └── /users/
///         ├── PUT /profile               # authenticated
///         ├── PUT /change-password       # authenticated
///         ├── PUT /deactivate            # authenticated
///         ├── GET /                      # admin
///         └── GET, PUT, DELETE /:id      # admin
/// ```
///
/// # Middleware Stack
///
/// Applied in order (outermost first):
/// 1. Security headers
/// 2. Logging (tower-http TraceLayer)
/// 3. 500 detail exposure (non-production only)
/// 4. Authentication (per route group, via `route_layer`)
///
/// Unknown paths answer 404 `NOT_FOUND` and known paths hit with the wrong
/// method answer 405 `METHOD_NOT_ALLOWED`, both in the error envelope.
pub fn build_router(state: AppState) -> Router {
    use crate::routes::{auth, health, tasks, users};

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/refresh", post(auth::refresh))
        .merge(
            Router::new()
                .route("/profile", get(auth::profile))
                .route_layer(from_fn_with_state(state.clone(), require_auth)),
        );

    let task_routes = Router::new()
        .route("/", get(tasks::list_tasks).post(tasks::create_task))
        .route("/stats", get(tasks::task_stats))
        .route(
            "/:id",
            get(tasks::get_task)
                .put(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let self_service_routes = Router::new()
        .route("/profile", put(users::update_profile))
        .route("/change-password", put(users::change_password))
        .route("/deactivate", put(users::deactivate))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let admin_routes = Router::new()
        .route("/", get(users::list_users))
        .route(
            "/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route_layer(from_fn_with_state(state.clone(), require_admin));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/tasks", task_routes)
        .nest("/users", self_service_routes.merge(admin_routes));

    let mut router = Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", api_routes)
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(not_found);

    if !state.is_production() {
        router = router.layer(from_fn(expose_internal_detail));
    }

    router
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SecurityHeadersLayer::new(state.is_production()))
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::RouteNotFound
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

#[cfg(test)]
pub(crate) fn test_state() -> AppState {
    let config = Config::from_lookup(|key| match key {
        "JWT_ACCESS_SECRET" => Some("unit-test-access-secret-0123456789abcdef".to_string()),
        "JWT_REFRESH_SECRET" => Some("unit-test-refresh-secret-0123456789abcdef".to_string()),
        _ => None,
    })
    .expect("test configuration is valid");

    AppState::in_memory(config)
}
