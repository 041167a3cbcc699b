/// User endpoints
///
/// Self-service routes act on the authenticated caller only:
///
/// - `PUT /api/users/profile`
/// - `PUT /api/users/change-password`
/// - `PUT /api/users/deactivate`
///
/// Admin routes act on any account by ID:
///
/// - `GET /api/users`
/// - `GET /api/users/:id`
/// - `PUT /api/users/:id`
/// - `DELETE /api/users/:id` (never the caller's own account)

use crate::{
    app::AppState,
    error::ApiResult,
    extract::{CurrentUser, Normalize, ResourceId, ValidatedJson, ValidatedQuery},
    response::ApiResponse,
    routes::auth::{expired_refresh_cookie, UserData},
};
use axum::extract::State;
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use taskdesk_shared::models::page::Pagination;
use taskdesk_shared::models::user::{User, UserFilter};
use taskdesk_shared::services::accounts::{AdminUserUpdate, ProfileUpdate};
use taskdesk_shared::validation::{
    normalize_email, page_request, trimmed, validate_bool, validate_limit, validate_new_password,
    validate_page, validate_person_name, validate_role,
};
use validator::Validate;

/// Self-service profile update
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(
        length(min = 2, max = 50, message = "Name must be between 2 and 50 characters"),
        custom(function = "validate_person_name")
    )]
    pub name: Option<String>,

    #[validate(
        email(message = "Please provide a valid email"),
        length(max = 100, message = "Email cannot exceed 100 characters")
    )]
    pub email: Option<String>,
}

impl Normalize for UpdateProfileRequest {
    fn normalize(self) -> Self {
        Self {
            name: trimmed(self.name),
            email: normalize_email(self.email),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(
        required(message = "Current password is required"),
        length(min = 1, message = "Current password is required")
    )]
    pub current_password: Option<String>,

    #[validate(
        required(message = "New password is required"),
        custom(function = "validate_new_password")
    )]
    pub new_password: Option<String>,
}

impl Normalize for ChangePasswordRequest {
    fn normalize(self) -> Self {
        self
    }
}

/// Admin listing query string
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersQuery {
    #[validate(custom(function = "validate_page"))]
    pub page: Option<String>,

    #[validate(custom(function = "validate_limit"))]
    pub limit: Option<String>,

    #[validate(custom(function = "validate_role"))]
    pub role: Option<String>,

    #[validate(custom(function = "validate_bool"))]
    pub is_active: Option<String>,
}

impl Normalize for ListUsersQuery {
    fn normalize(self) -> Self {
        self
    }
}

impl ListUsersQuery {
    fn filter(&self) -> UserFilter {
        UserFilter {
            role: self.role.as_deref().and_then(|r| r.parse().ok()),
            is_active: self.is_active.as_deref().and_then(|a| a.parse().ok()),
        }
    }
}

/// Admin update of any account
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdminUpdateUserRequest {
    #[validate(
        length(min = 2, max = 50, message = "Name must be between 2 and 50 characters"),
        custom(function = "validate_person_name")
    )]
    pub name: Option<String>,

    #[validate(
        email(message = "Please provide a valid email"),
        length(max = 100, message = "Email cannot exceed 100 characters")
    )]
    pub email: Option<String>,

    #[validate(custom(function = "validate_role"))]
    pub role: Option<String>,

    pub is_active: Option<bool>,
}

impl Normalize for AdminUpdateUserRequest {
    fn normalize(self) -> Self {
        Self {
            name: trimmed(self.name),
            email: normalize_email(self.email),
            ..self
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserListData {
    pub users: Vec<User>,
    pub pagination: Pagination,
}

/// Update the caller's name and/or email
///
/// # Errors
///
/// - `409 EMAIL_IN_USE`
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> ApiResult<ApiResponse<UserData>> {
    let user = state
        .accounts
        .update_profile(
            &user,
            ProfileUpdate {
                name: req.name,
                email: req.email,
            },
        )
        .await?;

    Ok(ApiResponse::with_message("Profile updated successfully", UserData { user }))
}

/// Change the caller's password
///
/// # Errors
///
/// - `400 INVALID_CURRENT_PASSWORD`
pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidatedJson(req): ValidatedJson<ChangePasswordRequest>,
) -> ApiResult<ApiResponse<()>> {
    state
        .accounts
        .change_password(
            &user,
            req.current_password.unwrap_or_default(),
            req.new_password.unwrap_or_default(),
        )
        .await?;

    Ok(ApiResponse::message("Password changed successfully"))
}

/// Deactivate the caller's account and clear the refresh cookie
pub async fn deactivate(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    jar: CookieJar,
) -> ApiResult<(CookieJar, ApiResponse<()>)> {
    state.accounts.deactivate(&user).await?;

    Ok((
        jar.add(expired_refresh_cookie(state.is_production())),
        ApiResponse::message("Account deactivated successfully"),
    ))
}

/// List users (admin)
///
/// # Query
///
/// `page`, `limit` (1-100), `role`, `isActive`
pub async fn list_users(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<ListUsersQuery>,
) -> ApiResult<ApiResponse<UserListData>> {
    let page = page_request(query.page.as_deref(), query.limit.as_deref());
    let result = state.accounts.list_users(&query.filter(), page).await?;

    Ok(ApiResponse::ok(UserListData {
        pagination: Pagination::new(page, result.total),
        users: result.items,
    }))
}

/// Fetch any user (admin)
pub async fn get_user(State(state): State<AppState>, ResourceId(id): ResourceId) -> ApiResult<ApiResponse<UserData>> {
    let user = state.accounts.get_user(id).await?;
    Ok(ApiResponse::ok(UserData { user }))
}

/// Update any user (admin)
///
/// # Errors
///
/// - `404 USER_NOT_FOUND`
/// - `409 EMAIL_IN_USE`
pub async fn update_user(
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
    ValidatedJson(req): ValidatedJson<AdminUpdateUserRequest>,
) -> ApiResult<ApiResponse<UserData>> {
    let user = state
        .accounts
        .admin_update(
            id,
            AdminUserUpdate {
                name: req.name,
                email: req.email,
                role: req.role.and_then(|r| r.parse().ok()),
                is_active: req.is_active,
            },
        )
        .await?;

    Ok(ApiResponse::with_message("User updated successfully", UserData { user }))
}

/// Delete any other user and their tasks (admin)
///
/// # Errors
///
/// - `400 CANNOT_DELETE_SELF`
/// - `404 USER_NOT_FOUND`
pub async fn delete_user(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    ResourceId(id): ResourceId,
) -> ApiResult<ApiResponse<()>> {
    state.accounts.admin_delete(&admin, id).await?;
    Ok(ApiResponse::message("User deleted successfully"))
}
