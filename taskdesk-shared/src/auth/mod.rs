/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id hashing and password strength rules
/// - [`jwt`]: Access/refresh token issuance and verification
/// - [`guard`]: Per-request authentication pipeline
/// - [`authorization`]: Ownership and self-deletion rules
///
/// # Example
///
/// ```no_run
/// use taskdesk_shared::auth::jwt::{TokenService, TokenSettings};
/// use taskdesk_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Secret123")?;
/// assert!(verify_password("Secret123", &hash)?);
///
/// let tokens = TokenService::new(TokenSettings::new(
///     std::env::var("JWT_ACCESS_SECRET")?,
///     std::env::var("JWT_REFRESH_SECRET")?,
/// ));
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod guard;
pub mod jwt;
pub mod password;
