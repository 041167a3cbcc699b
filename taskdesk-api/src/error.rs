/// Error handling for the API server
///
/// This module provides a unified error type that maps to HTTP responses.
/// All handlers return `Result<T, ApiError>`; every variant maps to exactly
/// one status code and one machine-readable `code`, rendered in the
/// standard envelope:
///
/// ```json
/// {
///   "success": false,
///   "message": "Validation failed",
///   "code": "VALIDATION_ERROR",
///   "errors": [{ "field": "dueDate", "message": "Due date must be in the future" }]
/// }
/// ```
///
/// Library errors convert with `?`, so store, token and authorization
/// failures are translated here rather than leaking their own shapes.
///
/// # Internal errors
///
/// 500 responses are logged at `error` level and always render a generic
/// message. The underlying detail rides along as an [`InternalErrorDetail`]
/// response extension; outside production [`expose_internal_detail`]
/// copies it into the body.

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;
use taskdesk_shared::auth::authorization::AuthzError;
use taskdesk_shared::auth::guard::AuthError;
use taskdesk_shared::auth::jwt::JwtError;
use taskdesk_shared::auth::password::PasswordError;
use taskdesk_shared::models::user::Role;
use taskdesk_shared::services::ServiceError;
use taskdesk_shared::store::StoreError;
use taskdesk_shared::validation::FieldError;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// One or more fields failed validation (400)
    Validation(Vec<FieldError>),

    /// Path identifier is not a UUID (400)
    InvalidId,

    /// Wrong current password on password change (400)
    InvalidCurrentPassword,

    /// Admin tried to delete their own account (400)
    CannotDeleteSelf,

    /// No bearer token (401)
    MissingToken,

    /// Bad signature, malformed token or wrong issuer/audience (401)
    InvalidToken,

    /// Token past its expiry (401)
    TokenExpired,

    /// Token subject no longer exists or cannot be used (401)
    PrincipalUnavailable,

    /// Account is deactivated (401)
    UserInactive,

    /// Role check on an anonymous request (401)
    NotAuthenticated,

    /// Unknown email or wrong password (401)
    InvalidCredentials,

    /// No refresh cookie (401)
    MissingRefreshToken,

    /// Refresh cookie failed verification (401)
    InvalidRefreshToken,

    /// Caller lacks the role or ownership required (403)
    Forbidden {
        required_roles: Option<Vec<Role>>,
        user_role: Option<Role>,
    },

    /// Task does not exist (404)
    TaskNotFound,

    /// User does not exist (404)
    UserNotFound,

    /// No route matched (404)
    RouteNotFound,

    /// Route exists but not for this method (405)
    MethodNotAllowed,

    /// Registration with a taken email (409)
    UserExists,

    /// Profile update to a taken email (409)
    EmailInUse,

    /// Any other uniqueness conflict (409)
    Duplicate(String),

    /// Unanticipated failure (500); the detail is never shown in production
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    pub code: &'static str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_roles: Option<Vec<Role>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_role: Option<Role>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Underlying cause of a 500, attached to the response
#[derive(Debug, Clone)]
pub struct InternalErrorDetail(pub String);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::InvalidId
            | ApiError::InvalidCurrentPassword
            | ApiError::CannotDeleteSelf => StatusCode::BAD_REQUEST,
            ApiError::MissingToken
            | ApiError::InvalidToken
            | ApiError::TokenExpired
            | ApiError::PrincipalUnavailable
            | ApiError::UserInactive
            | ApiError::NotAuthenticated
            | ApiError::InvalidCredentials
            | ApiError::MissingRefreshToken
            | ApiError::InvalidRefreshToken => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::TaskNotFound | ApiError::UserNotFound | ApiError::RouteNotFound => {
                StatusCode::NOT_FOUND
            }
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::UserExists | ApiError::EmailInUse | ApiError::Duplicate(_) => {
                StatusCode::CONFLICT
            }
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::InvalidId => "INVALID_ID",
            ApiError::InvalidCurrentPassword => "INVALID_CURRENT_PASSWORD",
            ApiError::CannotDeleteSelf => "CANNOT_DELETE_SELF",
            ApiError::MissingToken => "MISSING_TOKEN",
            ApiError::InvalidToken => "INVALID_TOKEN",
            ApiError::TokenExpired => "TOKEN_EXPIRED",
            ApiError::PrincipalUnavailable | ApiError::UserNotFound => "USER_NOT_FOUND",
            ApiError::UserInactive => "USER_INACTIVE",
            ApiError::NotAuthenticated => "NOT_AUTHENTICATED",
            ApiError::InvalidCredentials => "INVALID_CREDENTIALS",
            ApiError::MissingRefreshToken => "MISSING_REFRESH_TOKEN",
            ApiError::InvalidRefreshToken => "INVALID_REFRESH_TOKEN",
            ApiError::Forbidden { .. } => "INSUFFICIENT_PERMISSIONS",
            ApiError::TaskNotFound => "TASK_NOT_FOUND",
            ApiError::RouteNotFound => "NOT_FOUND",
            ApiError::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            ApiError::UserExists => "USER_EXISTS",
            ApiError::EmailInUse => "EMAIL_IN_USE",
            ApiError::Duplicate(_) => "DUPLICATE_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Client-facing message
    pub fn message(&self) -> String {
        match self {
            ApiError::Validation(_) => "Validation failed".to_string(),
            ApiError::InvalidId => "Invalid ID format".to_string(),
            ApiError::InvalidCurrentPassword => "Current password is incorrect".to_string(),
            ApiError::CannotDeleteSelf => "You cannot delete your own account".to_string(),
            ApiError::MissingToken => "Access token required".to_string(),
            ApiError::InvalidToken => "Invalid token".to_string(),
            ApiError::TokenExpired => "Token expired".to_string(),
            ApiError::PrincipalUnavailable => "User not found or inactive".to_string(),
            ApiError::UserInactive => "Account is deactivated".to_string(),
            ApiError::NotAuthenticated => "User not authenticated".to_string(),
            ApiError::InvalidCredentials => "Invalid email or password".to_string(),
            ApiError::MissingRefreshToken => "Refresh token required".to_string(),
            ApiError::InvalidRefreshToken => "Invalid refresh token".to_string(),
            ApiError::Forbidden { .. } => "Insufficient permissions".to_string(),
            ApiError::TaskNotFound => "Task not found".to_string(),
            ApiError::UserNotFound => "User not found".to_string(),
            ApiError::RouteNotFound => "Route not found".to_string(),
            ApiError::MethodNotAllowed => "Method not allowed".to_string(),
            ApiError::UserExists => "A user with this email already exists".to_string(),
            ApiError::EmailInUse => "Email is already in use".to_string(),
            ApiError::Duplicate(field) => format!("A record with this {} already exists", field),
            ApiError::Internal(_) => "Internal server error".to_string(),
        }
    }

    /// Shorthand for a single-field validation failure
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Validation(vec![FieldError::new(field, message)])
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Validation(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::Internal(detail) => write!(f, "Internal error: {}", detail),
            other => write!(f, "{}: {}", other.code(), other.message()),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let message = self.message();

        let mut internal = None;
        let (errors, required_roles, user_role) = match self {
            ApiError::Validation(errors) => (Some(errors), None, None),
            ApiError::Forbidden {
                required_roles,
                user_role,
            } => (None, required_roles, user_role),
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "Internal error");
                internal = Some(InternalErrorDetail(detail));
                (None, None, None)
            }
            _ => (None, None, None),
        };

        let body = ErrorBody {
            success: false,
            message,
            code,
            errors,
            required_roles,
            user_role,
            detail: None,
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(detail) = internal {
            response.extensions_mut().insert(detail);
        }
        response
    }
}

/// Copies [`InternalErrorDetail`] into 500 response bodies
///
/// Only installed outside production.
pub async fn expose_internal_detail(req: Request, next: Next) -> Response {
    let response = next.run(req).await;

    let Some(InternalErrorDetail(detail)) = response.extensions().get::<InternalErrorDetail>().cloned() else {
        return response;
    };

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(axum::http::header::CONTENT_LENGTH);

    let body = ErrorBody {
        success: false,
        message: ApiError::Internal(String::new()).message(),
        code: "INTERNAL_ERROR",
        errors: None,
        required_roles: None,
        user_role: None,
        detail: Some(detail),
    };

    (parts, Json(body)).into_response()
}

/// Convert store errors to API errors
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { field } => ApiError::Duplicate(field),
            StoreError::Backend(msg) => ApiError::Internal(format!("Store error: {}", msg)),
        }
    }
}

/// Convert guard errors to API errors
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken => ApiError::MissingToken,
            AuthError::InvalidToken => ApiError::InvalidToken,
            AuthError::ExpiredToken => ApiError::TokenExpired,
            AuthError::UserNotFound => ApiError::PrincipalUnavailable,
            AuthError::UserInactive => ApiError::UserInactive,
            AuthError::NotAuthenticated => ApiError::NotAuthenticated,
            AuthError::InsufficientPermissions { required, actual } => ApiError::Forbidden {
                required_roles: Some(required),
                user_role: Some(actual),
            },
            AuthError::Store(e) => e.into(),
        }
    }
}

/// Convert authorization errors to API errors
impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::InsufficientPermissions => ApiError::Forbidden {
                required_roles: None,
                user_role: None,
            },
            AuthzError::CannotDeleteSelf => ApiError::CannotDeleteSelf,
        }
    }
}

/// Convert JWT errors to API errors
impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => ApiError::TokenExpired,
            JwtError::Invalid(_) => ApiError::InvalidToken,
            JwtError::CreateError(msg) => ApiError::Internal(format!("Token creation failed: {}", msg)),
        }
    }
}

/// Convert password errors to API errors
impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::Internal(format!("Password operation failed: {}", err))
    }
}

/// Convert service errors to API errors
impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::UserExists => ApiError::UserExists,
            ServiceError::EmailInUse => ApiError::EmailInUse,
            ServiceError::InvalidCredentials => ApiError::InvalidCredentials,
            ServiceError::UserInactive => ApiError::UserInactive,
            ServiceError::UserNotFound => ApiError::UserNotFound,
            ServiceError::PrincipalUnavailable => ApiError::PrincipalUnavailable,
            ServiceError::TaskNotFound => ApiError::TaskNotFound,
            ServiceError::InvalidCurrentPassword => ApiError::InvalidCurrentPassword,
            ServiceError::RefreshToken(JwtError::Expired) => ApiError::TokenExpired,
            ServiceError::RefreshToken(_) => ApiError::InvalidRefreshToken,
            ServiceError::Authz(e) => e.into(),
            ServiceError::Token(e) => e.into(),
            ServiceError::Password(e) => e.into(),
            ServiceError::Store(e) => e.into(),
        }
    }
}
