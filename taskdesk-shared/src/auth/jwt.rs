/// Access and refresh token service
///
/// Tokens are HS256 JWTs. The two kinds are signed with **different**
/// secrets, so a refresh token can never verify as an access token and
/// vice versa; expiry alone is not what tells them apart.
///
/// # Token Kinds
///
/// - **Access token**: short-lived (default 15 minutes). Carries the user ID,
///   email and role. Sent as `Authorization: Bearer <token>`.
/// - **Refresh token**: long-lived (default 7 days). Carries the user ID only.
///   Delivered exclusively through an http-only cookie.
///
/// Both carry a fixed issuer (`task-manager-api`) and audience
/// (`task-manager-client`) which are checked on every verification.
/// Nothing is persisted: validity is a function of signature and claims.
///
/// # Example
///
/// ```
/// use taskdesk_shared::auth::jwt::{TokenService, TokenSettings};
/// use taskdesk_shared::models::user::{Role, User};
/// use chrono::Utc;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let tokens = TokenService::new(TokenSettings::new(
///     "access-secret-that-is-at-least-32-bytes",
///     "refresh-secret-that-is-at-least-32-bytes",
/// ));
///
/// let user = User {
///     id: Uuid::new_v4(),
///     name: "Ada".to_string(),
///     email: "ada@example.com".to_string(),
///     password_hash: String::new(),
///     role: Role::User,
///     is_active: true,
///     created_at: Utc::now(),
///     updated_at: Utc::now(),
/// };
///
/// let pair = tokens.issue_token_pair(&user)?;
/// let claims = tokens.verify_access_token(&pair.access_token)?;
/// assert_eq!(claims.sub, user.id);
///
/// // Kinds never cross-validate
/// assert!(tokens.verify_access_token(&pair.refresh_token).is_err());
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

use crate::models::user::{Role, User};

/// Issuer claim on every token
pub const ISSUER: &str = "task-manager-api";

/// Audience claim on every token
pub const AUDIENCE: &str = "task-manager-client";

/// Default access-token lifetime (15 minutes)
pub const DEFAULT_ACCESS_TTL: Duration = Duration::from_secs(15 * 60);

/// Default refresh-token lifetime (7 days)
pub const DEFAULT_REFRESH_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Error type for token operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to sign a token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Token is past its `exp`
    #[error("Token has expired")]
    Expired,

    /// Bad signature, malformed token, wrong issuer/audience or subject mismatch
    #[error("Invalid token: {0}")]
    Invalid(String),
}

/// Claims carried by an access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// User ID
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// Claims carried by a refresh token
///
/// Deliberately minimal: no email, no role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// User ID
    pub sub: Uuid,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// A freshly minted access/refresh pair
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Secrets and lifetimes for [`TokenService`]
#[derive(Clone)]
pub struct TokenSettings {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl TokenSettings {
    /// Settings with the default lifetimes
    pub fn new(access_secret: impl Into<String>, refresh_secret: impl Into<String>) -> Self {
        Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            access_ttl: DEFAULT_ACCESS_TTL,
            refresh_ttl: DEFAULT_REFRESH_TTL,
        }
    }
}

impl fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSettings")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

/// Signing keys for one token kind
#[derive(Clone)]
struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// Mints and verifies access and refresh tokens
///
/// Cheap to clone; share one instance across the application.
#[derive(Clone)]
pub struct TokenService {
    access: KeyPair,
    refresh: KeyPair,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(settings: TokenSettings) -> Self {
        Self {
            access: KeyPair::from_secret(&settings.access_secret),
            refresh: KeyPair::from_secret(&settings.refresh_secret),
            access_ttl: settings.access_ttl,
            refresh_ttl: settings.refresh_ttl,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Issues an access token and a refresh token for `user`
    ///
    /// # Errors
    ///
    /// Returns `JwtError::CreateError` if signing fails
    pub fn issue_token_pair(&self, user: &User) -> Result<TokenPair, JwtError> {
        Ok(TokenPair {
            access_token: self.issue_access_token(user)?,
            refresh_token: self.issue_refresh_token(user.id)?,
        })
    }

    /// Issues an access token from the user's current email and role
    pub fn issue_access_token(&self, user: &User) -> Result<String, JwtError> {
        self.access_token_with_lifetime(user, ttl_seconds(self.access_ttl))
    }

    /// Issues a refresh token for `user_id`
    pub fn issue_refresh_token(&self, user_id: Uuid) -> Result<String, JwtError> {
        self.refresh_token_with_lifetime(user_id, ttl_seconds(self.refresh_ttl))
    }

    /// Verifies an access token and returns its claims
    ///
    /// # Errors
    ///
    /// - `JwtError::Expired` if the token is past `exp`
    /// - `JwtError::Invalid` for any other failure (signature, format,
    ///   issuer, audience)
    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, JwtError> {
        verify(token, &self.access.decoding)
    }

    /// Verifies a refresh token and returns its claims
    ///
    /// Same failure modes as [`verify_access_token`](Self::verify_access_token),
    /// checked against the refresh secret.
    pub fn verify_refresh_token(&self, token: &str) -> Result<RefreshClaims, JwtError> {
        verify(token, &self.refresh.decoding)
    }

    /// Mints a new access token from a refresh token
    ///
    /// `user` must be the current state of the principal the refresh token
    /// was issued to, re-read from the store by the caller. The new token
    /// carries that current email and role, never values cached from an
    /// earlier token.
    ///
    /// # Errors
    ///
    /// Verification errors from [`verify_refresh_token`](Self::verify_refresh_token),
    /// or `JwtError::Invalid` if `user` is not the token's subject.
    pub fn refresh_access_token(&self, refresh_token: &str, user: &User) -> Result<String, JwtError> {
        let claims = self.verify_refresh_token(refresh_token)?;
        if claims.sub != user.id {
            return Err(JwtError::Invalid(
                "refresh token subject does not match user".to_string(),
            ));
        }
        self.issue_access_token(user)
    }

    fn access_token_with_lifetime(&self, user: &User, lifetime_secs: i64) -> Result<String, JwtError> {
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            iss: ISSUER.to_string(),
            aud: AUDIENCE.to_string(),
            iat: now,
            exp: now + lifetime_secs,
        };
        sign(&claims, &self.access.encoding)
    }

    fn refresh_token_with_lifetime(&self, user_id: Uuid, lifetime_secs: i64) -> Result<String, JwtError> {
        let now = Utc::now().timestamp();
        let claims = RefreshClaims {
            sub: user_id,
            iss: ISSUER.to_string(),
            aud: AUDIENCE.to_string(),
            iat: now,
            exp: now + lifetime_secs,
        };
        sign(&claims, &self.refresh.encoding)
    }
}

fn ttl_seconds(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX / 2)
}

fn sign<C: Serialize>(claims: &C, key: &EncodingKey) -> Result<String, JwtError> {
    encode(&Header::new(Algorithm::HS256), claims, key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

fn verify<C: DeserializeOwned>(token: &str, key: &DecodingKey) -> Result<C, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.set_audience(&[AUDIENCE]);
    validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
    validation.leeway = 0;
    validation.validate_exp = true;

    decode::<C>(token, key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => JwtError::Expired,
            _ => JwtError::Invalid(e.to_string()),
        })
}
