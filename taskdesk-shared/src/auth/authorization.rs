/// Ownership and role rules for resources
///
/// # Permission Model
///
/// 1. **Admins** may read, update and delete any task or account.
/// 2. **Users** may only touch resources whose owner is themselves.
/// 3. **Listings** by non-admins are always scoped to their own resources;
///    any owner filter they send is replaced, never trusted.
/// 4. **Self-deletion** through the admin by-id path is refused, even for
///    admins.
///
/// These checks are pure functions over the already-authenticated
/// principal. Authentication itself happens in [`super::guard`].

use uuid::Uuid;

use crate::models::user::User;

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// Principal is neither the owner nor an admin
    #[error("Insufficient permissions")]
    InsufficientPermissions,

    /// Admin tried to delete their own account by ID
    #[error("Cannot delete your own account")]
    CannotDeleteSelf,
}

/// Whether `principal` may act on a resource owned by `owner_id`
pub fn can_access(principal: &User, owner_id: Uuid) -> bool {
    principal.is_admin() || principal.id == owner_id
}

/// Fails with `InsufficientPermissions` unless [`can_access`] holds
///
/// # Example
///
/// ```
/// use taskdesk_shared::auth::authorization::{require_access, AuthzError};
/// # use taskdesk_shared::models::user::{Role, User};
/// # use chrono::Utc;
/// # use uuid::Uuid;
/// # let user = User {
/// #     id: Uuid::new_v4(),
/// #     name: "Ada".to_string(),
/// #     email: "ada@example.com".to_string(),
/// #     password_hash: String::new(),
/// #     role: Role::User,
/// #     is_active: true,
/// #     created_at: Utc::now(),
/// #     updated_at: Utc::now(),
/// # };
///
/// assert!(require_access(&user, user.id).is_ok());
/// assert_eq!(
///     require_access(&user, Uuid::new_v4()),
///     Err(AuthzError::InsufficientPermissions)
/// );
/// ```
pub fn require_access(principal: &User, owner_id: Uuid) -> Result<(), AuthzError> {
    if can_access(principal, owner_id) {
        Ok(())
    } else {
        Err(AuthzError::InsufficientPermissions)
    }
}

/// Owner scope to apply to a listing
///
/// Non-admins always get their own ID regardless of `requested`.
/// Admins get `requested` as-is (`None` = every owner).
pub fn scoped_owner(principal: &User, requested: Option<Uuid>) -> Option<Uuid> {
    if principal.is_admin() {
        requested
    } else {
        Some(principal.id)
    }
}

/// Refuses an admin-path delete that targets the caller
pub fn ensure_not_self(principal: &User, target_id: Uuid) -> Result<(), AuthzError> {
    if principal.id == target_id {
        return Err(AuthzError::CannotDeleteSelf);
    }
    Ok(())
}
