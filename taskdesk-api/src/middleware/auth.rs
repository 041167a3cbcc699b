/// Authentication layers
///
/// Each layer builds a [`RequestContext`] from the `Authorization` header,
/// runs it through a guard [`Pipeline`] and stores the result in the
/// request extensions, where [`crate::extract::CurrentUser`] picks it up.
///
/// Attach with `route_layer` so unmatched paths still fall through to the
/// 404 handler:
///
/// ```no_run
/// use axum::{middleware::from_fn_with_state, routing::get, Router};
/// use taskdesk_api::{app::AppState, middleware::auth::require_admin};
///
/// # fn example(state: AppState) -> Router<AppState> {
/// Router::new()
///     .route("/", get(|| async { "admins only" }))
///     .route_layer(from_fn_with_state(state, require_admin))
/// # }
/// ```

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use taskdesk_shared::auth::guard::{Pipeline, RequestContext};
use taskdesk_shared::models::user::Role;
use tracing::debug;

use crate::{app::AppState, error::ApiError};

/// Rejects requests without a valid access token for an active user
pub async fn require_auth(State(state): State<AppState>, req: Request, next: Next) -> Result<Response, ApiError> {
    guard(&state, &Pipeline::required(), req, next).await
}

/// Attaches the principal when a valid token is present, never rejects
pub async fn optional_auth(State(state): State<AppState>, req: Request, next: Next) -> Result<Response, ApiError> {
    guard(&state, &Pipeline::optional(), req, next).await
}

/// Required authentication plus the admin role
pub async fn require_admin(State(state): State<AppState>, req: Request, next: Next) -> Result<Response, ApiError> {
    guard(&state, &Pipeline::roles([Role::Admin]), req, next).await
}

async fn guard(state: &AppState, pipeline: &Pipeline, mut req: Request, next: Next) -> Result<Response, ApiError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let ctx = RequestContext::from_authorization(header);

    let ctx = pipeline
        .run(ctx, &state.tokens, state.users.as_ref())
        .await
        .map_err(|err| {
            debug!(error = %err, path = %req.uri().path(), "Request rejected by auth guard");
            ApiError::from(err)
        })?;

    req.extensions_mut().insert(ctx);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test_state;
    use crate::extract::CurrentUser;
    use axum::{
        body::Body,
        http::StatusCode,
        middleware::from_fn_with_state,
        response::IntoResponse,
        routing::get,
        Extension, Router,
    };
    use taskdesk_shared::models::user::CreateUser;
    use taskdesk_shared::store::UserStore;
    use tower::ServiceExt;

    async fn whoami(Extension(ctx): Extension<RequestContext>) -> impl IntoResponse {
        ctx.principal()
            .map(|u| u.email.clone())
            .unwrap_or_else(|| "anonymous".to_string())
    }

    async fn admin_only(CurrentUser(user): CurrentUser) -> impl IntoResponse {
        user.email
    }

    async fn setup(role: Role) -> (Router, String) {
        let state = test_state();
        let user = state
            .users
            .create(CreateUser {
                name: "Guard Test".to_string(),
                email: "guard@example.com".to_string(),
                password_hash: "hash".to_string(),
                role,
            })
            .await
            .unwrap();
        let token = state.tokens.issue_access_token(&user).unwrap();

        let app = Router::new()
            .route(
                "/optional",
                get(whoami).route_layer(from_fn_with_state(state.clone(), optional_auth)),
            )
            .route(
                "/required",
                get(whoami).route_layer(from_fn_with_state(state.clone(), require_auth)),
            )
            .route(
                "/admin",
                get(admin_only).route_layer(from_fn_with_state(state.clone(), require_admin)),
            )
            .with_state(state);

        (app, token)
    }

    async fn send(app: &Router, uri: &str, auth: Option<&str>) -> (StatusCode, String) {
        let mut builder = axum::http::Request::builder().uri(uri);
        if let Some(value) = auth {
            builder = builder.header(AUTHORIZATION, value);
        }

        let response = app
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8_lossy(&bytes).to_string())
    }

    #[tokio::test]
    async fn test_optional_auth_never_rejects() {
        let (app, token) = setup(Role::User).await;

        let (status, body) = send(&app, "/optional", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "anonymous");

        let (status, body) = send(&app, "/optional", Some("Bearer garbage")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "anonymous");

        let (status, body) = send(&app, "/optional", Some(&format!("Bearer {}", token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "guard@example.com");
    }

    #[tokio::test]
    async fn test_required_auth() {
        let (app, token) = setup(Role::User).await;

        let (status, body) = send(&app, "/required", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("MISSING_TOKEN"));

        let (status, body) = send(&app, "/required", Some(&format!("Basic {}", token))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("MISSING_TOKEN"));

        let (status, body) = send(&app, "/required", Some("Bearer not.a.jwt")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("INVALID_TOKEN"));

        let (status, _) = send(&app, "/required", Some(&format!("Bearer {}", token))).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_admin_layer() {
        let (app, token) = setup(Role::User).await;
        let (status, body) = send(&app, "/admin", Some(&format!("Bearer {}", token))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body.contains("INSUFFICIENT_PERMISSIONS"));

        let (app, token) = setup(Role::Admin).await;
        let (status, body) = send(&app, "/admin", Some(&format!("Bearer {}", token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "guard@example.com");
    }
}
