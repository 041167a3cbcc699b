/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /api/auth/register` - Register and sign in
/// - `POST /api/auth/login` - Sign in
/// - `POST /api/auth/logout` - Clear the refresh cookie
/// - `POST /api/auth/refresh` - Mint an access token from the refresh cookie
/// - `GET /api/auth/profile` - Current user
///
/// # Token delivery
///
/// The access token is returned in the JSON body. The refresh token only
/// ever travels in the `refreshToken` cookie (http-only, SameSite=Strict,
/// Secure in production), never in a body.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{CurrentUser, Normalize, ValidatedJson},
    response::ApiResponse,
};
use axum::extract::State;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use taskdesk_shared::models::user::User;
use taskdesk_shared::services::accounts::{Registration, Session};
use taskdesk_shared::validation::{normalize_email, trimmed, validate_new_password, validate_person_name};
use tracing::debug;
use validator::Validate;

/// Name of the refresh token cookie
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Register request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Optional display name; defaults to the email's local part
    #[validate(
        length(min = 2, max = 50, message = "Name must be between 2 and 50 characters"),
        custom(function = "validate_person_name")
    )]
    pub name: Option<String>,

    #[validate(
        required(message = "Email is required"),
        email(message = "Please provide a valid email"),
        length(max = 100, message = "Email cannot exceed 100 characters")
    )]
    pub email: Option<String>,

    #[validate(
        required(message = "Password is required"),
        custom(function = "validate_new_password")
    )]
    pub password: Option<String>,
}

impl Normalize for RegisterRequest {
    fn normalize(self) -> Self {
        Self {
            name: trimmed(self.name).filter(|n| !n.is_empty()),
            email: normalize_email(self.email),
            password: self.password,
        }
    }
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(
        required(message = "Email is required"),
        email(message = "Please provide a valid email")
    )]
    pub email: Option<String>,

    #[validate(
        required(message = "Password is required"),
        length(min = 1, message = "Password is required")
    )]
    pub password: Option<String>,
}

impl Normalize for LoginRequest {
    fn normalize(self) -> Self {
        Self {
            email: normalize_email(self.email),
            password: self.password,
        }
    }
}

/// Register and login response data
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub user: User,
    pub access_token: String,
}

/// Refresh response data
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenData {
    pub access_token: String,
}

/// Single user response data
#[derive(Debug, Serialize)]
pub struct UserData {
    pub user: User,
}

/// Builds the refresh cookie
pub(crate) fn refresh_cookie(token: String, max_age: Duration, secure: bool) -> Cookie<'static> {
    let max_age = time::Duration::try_from(max_age).unwrap_or(time::Duration::MAX);

    Cookie::build((REFRESH_COOKIE, token))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(max_age)
        .build()
}

/// Same cookie, empty and already expired
pub(crate) fn expired_refresh_cookie(secure: bool) -> Cookie<'static> {
    refresh_cookie(String::new(), Duration::ZERO, secure)
}

fn sign_in(state: &AppState, jar: CookieJar, session: Session) -> (CookieJar, SessionData) {
    let cookie = refresh_cookie(
        session.tokens.refresh_token,
        state.tokens.refresh_ttl(),
        state.is_production(),
    );

    (
        jar.add(cookie),
        SessionData {
            user: session.user,
            access_token: session.tokens.access_token,
        },
    )
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /api/auth/register
/// Content-Type: application/json
///
/// {
///   "name": "Ada Lovelace",
///   "email": "ada@example.com",
///   "password": "Abc123"
/// }
/// ```
///
/// # Response
///
/// `201 Created`, sets the refresh cookie:
///
/// ```json
/// {
///   "success": true,
///   "message": "User registered successfully",
///   "data": { "user": { "id": "uuid", "role": "user", ... }, "accessToken": "eyJ..." }
/// }
/// ```
///
/// # Errors
///
/// - `400 VALIDATION_ERROR`
/// - `409 USER_EXISTS`
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> ApiResult<(CookieJar, ApiResponse<SessionData>)> {
    let session = state
        .accounts
        .register(Registration {
            name: req.name,
            email: req.email.unwrap_or_default(),
            password: req.password.unwrap_or_default(),
        })
        .await?;

    let (jar, data) = sign_in(&state, jar, session);
    Ok((jar, ApiResponse::created("User registered successfully", data)))
}

/// Login endpoint
///
/// # Errors
///
/// - `400 VALIDATION_ERROR`
/// - `401 INVALID_CREDENTIALS`: unknown email or wrong password (same message)
/// - `401 USER_INACTIVE`
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> ApiResult<(CookieJar, ApiResponse<SessionData>)> {
    let email = req.email.unwrap_or_default();
    let password = req.password.unwrap_or_default();

    let session = state.accounts.login(&email, &password).await?;

    let (jar, data) = sign_in(&state, jar, session);
    Ok((jar, ApiResponse::with_message("Login successful", data)))
}

/// Clears the refresh cookie
///
/// Tokens are stateless, so a refresh token captured before logout stays
/// valid until it expires.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, ApiResponse<()>) {
    (
        jar.add(expired_refresh_cookie(state.is_production())),
        ApiResponse::message("Logout successful"),
    )
}

/// Token refresh endpoint
///
/// # Errors
///
/// - `401 MISSING_REFRESH_TOKEN`: no cookie
/// - `401 TOKEN_EXPIRED` / `401 INVALID_REFRESH_TOKEN`
/// - `401 USER_NOT_FOUND`: subject deleted or deactivated
pub async fn refresh(State(state): State<AppState>, jar: CookieJar) -> ApiResult<ApiResponse<AccessTokenData>> {
    let token = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ApiError::MissingRefreshToken)?;

    let (user, access_token) = state.accounts.refresh(&token).await?;
    debug!(user_id = %user.id, "Access token refreshed");

    Ok(ApiResponse::with_message(
        "Token refreshed successfully",
        AccessTokenData { access_token },
    ))
}

/// Current user's profile
pub async fn profile(CurrentUser(user): CurrentUser) -> ApiResponse<UserData> {
    ApiResponse::ok(UserData { user })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_cookie_attributes() {
        let cookie = refresh_cookie("tok".to_string(), Duration::from_secs(7 * 24 * 3600), true);

        assert_eq!(cookie.name(), REFRESH_COOKIE);
        assert_eq!(cookie.value(), "tok");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(time::Duration::days(7)));
    }

    #[test]
    fn test_expired_cookie() {
        let cookie = expired_refresh_cookie(false);
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
        assert_eq!(cookie.secure(), Some(false));
    }

    #[test]
    fn test_register_normalization() {
        let req = RegisterRequest {
            name: Some("   ".to_string()),
            email: Some(" Ada@Example.com ".to_string()),
            password: Some("Abc123".to_string()),
        }
        .normalize();

        assert_eq!(req.name, None);
        assert_eq!(req.email.as_deref(), Some("ada@example.com"));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_register_collects_all_errors() {
        let errors = RegisterRequest {
            name: Some("R2".to_string()),
            email: Some("not-an-email".to_string()),
            password: Some("weak".to_string()),
        }
        .validate()
        .unwrap_err();

        let fields = taskdesk_shared::validation::collect_field_errors(&errors);
        let names: Vec<&str> = fields.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(names, vec!["email", "name", "password"]);
    }
}
