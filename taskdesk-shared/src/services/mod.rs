/// Resource services
///
/// Services sit between the HTTP edge and the stores. They apply the
/// ownership rules from [`crate::auth::authorization`], hash passwords,
/// mint tokens and join owners onto tasks. Inputs arrive already
/// validated and normalized.
///
/// - [`accounts::AccountService`]: registration, login, refresh, self-service
///   and admin account management
/// - [`tasks::TaskService`]: task CRUD, listing and statistics

pub mod accounts;
pub mod tasks;

pub use accounts::AccountService;
pub use tasks::TaskService;

use crate::auth::authorization::AuthzError;
use crate::auth::jwt::JwtError;
use crate::auth::password::PasswordError;
use crate::store::StoreError;

/// Error type for service operations
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Registration with an email that is already registered
    #[error("A user with this email already exists")]
    UserExists,

    /// Profile or admin update to an email owned by someone else
    #[error("Email is already in use")]
    EmailInUse,

    /// Unknown email or wrong password; deliberately indistinguishable
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is deactivated")]
    UserInactive,

    #[error("User not found")]
    UserNotFound,

    /// Refresh token subject is gone or deactivated
    #[error("User not found or inactive")]
    PrincipalUnavailable,

    #[error("Task not found")]
    TaskNotFound,

    #[error("Current password is incorrect")]
    InvalidCurrentPassword,

    /// Refresh token failed verification
    #[error("Invalid refresh token: {0}")]
    RefreshToken(JwtError),

    #[error(transparent)]
    Authz(#[from] AuthzError),

    #[error(transparent)]
    Token(#[from] JwtError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
