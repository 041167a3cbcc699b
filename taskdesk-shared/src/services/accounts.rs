/// Account service
///
/// Registration, login, token refresh, self-service profile changes and
/// admin account management.
///
/// # Login Errors
///
/// An unknown email and a wrong password both fail with
/// `InvalidCredentials`, so a caller cannot probe which emails are
/// registered. The inactive-account check runs only after the password
/// has been verified.

use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::ServiceError;
use crate::auth::authorization::ensure_not_self;
use crate::auth::jwt::{TokenPair, TokenService};
use crate::auth::password::{hash_password_async, verify_password_async};
use crate::models::page::{Page, PageRequest};
use crate::models::user::{CreateUser, Role, UpdateUser, User, UserFilter};
use crate::store::{StoreError, UserStore};

/// Longest display name accepted by the users table
const MAX_NAME_LENGTH: usize = 50;

/// Registration input; email already normalized
#[derive(Debug, Clone)]
pub struct Registration {
    /// Defaults to the local part of the email when absent
    pub name: Option<String>,
    pub email: String,
    pub password: String,
}

/// Self-service profile changes
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Admin changes to another account
#[derive(Debug, Clone, Default)]
pub struct AdminUserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// A user together with a freshly issued token pair
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub tokens: TokenPair,
}

/// Account operations over a [`UserStore`]
#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserStore>,
    tokens: TokenService,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserStore>, tokens: TokenService) -> Self {
        Self { users, tokens }
    }

    /// Creates a `user`-role account and signs it in
    ///
    /// # Errors
    ///
    /// `UserExists` if the email is registered, including when a
    /// concurrent registration wins the race at the store.
    pub async fn register(&self, input: Registration) -> Result<Session, ServiceError> {
        if self.users.find_by_email(&input.email).await?.is_some() {
            return Err(ServiceError::UserExists);
        }

        let name = input
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| default_name(&input.email));
        let password_hash = hash_password_async(input.password).await?;

        let user = self
            .users
            .create(CreateUser {
                name,
                email: input.email,
                password_hash,
                role: Role::User,
            })
            .await
            .map_err(|e| match e {
                StoreError::Duplicate { .. } => ServiceError::UserExists,
                other => other.into(),
            })?;

        info!(user_id = %user.id, "User registered");

        let tokens = self.tokens.issue_token_pair(&user)?;
        Ok(Session { user, tokens })
    }

    /// Verifies credentials and signs the user in
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ServiceError> {
        let Some(user) = self.users.find_by_email(email).await? else {
            return Err(ServiceError::InvalidCredentials);
        };

        let valid = verify_password_async(password.to_string(), user.password_hash.clone()).await?;
        if !valid {
            warn!(user_id = %user.id, "Failed login attempt");
            return Err(ServiceError::InvalidCredentials);
        }

        if !user.is_active {
            return Err(ServiceError::UserInactive);
        }

        info!(user_id = %user.id, "User logged in");

        let tokens = self.tokens.issue_token_pair(&user)?;
        Ok(Session { user, tokens })
    }

    /// Mints a new access token from a refresh token
    ///
    /// The token's subject is re-read from the store so the new access
    /// token reflects the current email and role.
    pub async fn refresh(&self, refresh_token: &str) -> Result<(User, String), ServiceError> {
        let claims = self
            .tokens
            .verify_refresh_token(refresh_token)
            .map_err(ServiceError::RefreshToken)?;

        let user = self
            .users
            .find_by_id(claims.sub)
            .await?
            .filter(|u| u.is_active)
            .ok_or(ServiceError::PrincipalUnavailable)?;

        let access_token = self
            .tokens
            .refresh_access_token(refresh_token, &user)
            .map_err(ServiceError::RefreshToken)?;

        Ok((user, access_token))
    }

    /// Updates the caller's own name and/or email
    pub async fn update_profile(&self, principal: &User, input: ProfileUpdate) -> Result<User, ServiceError> {
        self.apply_update(
            principal.id,
            UpdateUser {
                name: input.name,
                email: input.email,
                ..Default::default()
            },
        )
        .await
    }

    /// Replaces the caller's password after checking the current one
    pub async fn change_password(
        &self,
        principal: &User,
        current_password: String,
        new_password: String,
    ) -> Result<(), ServiceError> {
        let current = self
            .users
            .find_by_id(principal.id)
            .await?
            .ok_or(ServiceError::UserNotFound)?;

        if !verify_password_async(current_password, current.password_hash).await? {
            return Err(ServiceError::InvalidCurrentPassword);
        }

        let password_hash = hash_password_async(new_password).await?;
        self.apply_update(
            principal.id,
            UpdateUser {
                password_hash: Some(password_hash),
                ..Default::default()
            },
        )
        .await?;

        info!(user_id = %principal.id, "Password changed");
        Ok(())
    }

    /// Marks the caller's account inactive
    pub async fn deactivate(&self, principal: &User) -> Result<User, ServiceError> {
        let user = self
            .apply_update(
                principal.id,
                UpdateUser {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await?;

        info!(user_id = %principal.id, "Account deactivated");
        Ok(user)
    }

    pub async fn list_users(&self, filter: &UserFilter, page: PageRequest) -> Result<Page<User>, ServiceError> {
        Ok(self.users.list(filter, page).await?)
    }

    pub async fn get_user(&self, id: Uuid) -> Result<User, ServiceError> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or(ServiceError::UserNotFound)
    }

    /// Admin update of any account
    pub async fn admin_update(&self, id: Uuid, input: AdminUserUpdate) -> Result<User, ServiceError> {
        self.apply_update(
            id,
            UpdateUser {
                name: input.name,
                email: input.email,
                role: input.role,
                is_active: input.is_active,
                ..Default::default()
            },
        )
        .await
    }

    /// Admin delete of another account and all its tasks
    ///
    /// The store removes the user and their tasks in one step.
    ///
    /// # Errors
    ///
    /// `CannotDeleteSelf` when `id` is the caller, checked before anything
    /// else; `UserNotFound` when no such account exists.
    pub async fn admin_delete(&self, principal: &User, id: Uuid) -> Result<(), ServiceError> {
        ensure_not_self(principal, id)?;

        if !self.users.delete(id).await? {
            return Err(ServiceError::UserNotFound);
        }

        info!(user_id = %id, deleted_by = %principal.id, "User and their tasks deleted");
        Ok(())
    }

    async fn apply_update(&self, id: Uuid, update: UpdateUser) -> Result<User, ServiceError> {
        if let Some(ref email) = update.email {
            if self.users.email_taken_by_other(email, id).await? {
                return Err(ServiceError::EmailInUse);
            }
        }

        self.users
            .update(id, update)
            .await
            .map_err(|e| match e {
                StoreError::Duplicate { .. } => ServiceError::EmailInUse,
                other => other.into(),
            })?
            .ok_or(ServiceError::UserNotFound)
    }
}

/// Local part of an email, capped to the name column width
fn default_name(email: &str) -> String {
    email
        .split('@')
        .next()
        .unwrap_or(email)
        .chars()
        .take(MAX_NAME_LENGTH)
        .collect()
}
