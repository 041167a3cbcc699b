/// Request authentication pipeline
///
/// A [`RequestContext`] is built from the incoming `Authorization` header
/// and passed through an ordered list of [`Stage`]s. Each stage takes the
/// context by value and either returns it (possibly enriched) or fails.
/// The runner stops at the first failure.
///
/// # Stages
///
/// - `Authenticate(Required)`: verifies the bearer token, loads the user
///   and attaches both. Missing token, bad token, unknown user and inactive
///   user all fail with a 401-class error.
/// - `Authenticate(Optional)`: same checks, but any failure leaves the
///   context anonymous instead of failing.
/// - `RequireRoles(roles)`: fails unless the attached user holds one of
///   `roles`. Fails `NotAuthenticated` when no user is attached, so it is
///   only meaningful after a required authentication stage.
///
/// The guard makes no ownership decisions; that is
/// [`super::authorization`]'s job.
///
/// # Example
///
/// ```no_run
/// use taskdesk_shared::auth::guard::{Pipeline, RequestContext};
/// use taskdesk_shared::auth::jwt::TokenService;
/// use taskdesk_shared::models::user::Role;
/// use taskdesk_shared::store::UserStore;
///
/// # async fn example(
/// #     tokens: &TokenService,
/// #     users: &dyn UserStore,
/// #     header: Option<&str>,
/// # ) -> Result<(), Box<dyn std::error::Error>> {
/// let ctx = RequestContext::from_authorization(header);
/// let ctx = Pipeline::roles([Role::Admin]).run(ctx, tokens, users).await?;
///
/// let admin = ctx.principal().expect("authenticated by the pipeline");
/// println!("admin {}", admin.email);
/// # Ok(())
/// # }
/// ```

use tracing::debug;

use super::jwt::{AccessClaims, JwtError, TokenService};
use crate::models::user::{Role, User};
use crate::store::{StoreError, UserStore};

/// How strictly an authentication stage treats failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Any failure rejects the request
    Required,

    /// Any failure leaves the request anonymous
    Optional,
}

/// One step of a [`Pipeline`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Authenticate(AuthMode),
    RequireRoles(Vec<Role>),
}

/// Per-request authentication state
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Raw bearer token, if the header carried one
    pub bearer: Option<String>,

    /// User loaded by an authentication stage
    pub current_principal: Option<User>,

    /// Claims of the verified access token
    pub claims: Option<AccessClaims>,
}

impl RequestContext {
    /// Builds a context from an `Authorization` header value
    ///
    /// Only the `Bearer <token>` form is recognized; anything else is
    /// treated as no token at all.
    pub fn from_authorization(header: Option<&str>) -> Self {
        let bearer = header
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string);

        Self {
            bearer,
            ..Default::default()
        }
    }

    pub fn principal(&self) -> Option<&User> {
        self.current_principal.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_principal.is_some()
    }
}

/// Error type for the guard pipeline
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Access token required")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    ExpiredToken,

    /// Token was valid but its subject no longer exists
    #[error("User not found")]
    UserNotFound,

    /// Token was valid but the account is deactivated
    #[error("Account is deactivated")]
    UserInactive,

    /// A role check ran on an anonymous context
    #[error("Authentication required")]
    NotAuthenticated,

    #[error("Insufficient permissions: requires one of {required:?}, has {actual}")]
    InsufficientPermissions { required: Vec<Role>, actual: Role },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::ExpiredToken,
            JwtError::Invalid(_) | JwtError::CreateError(_) => AuthError::InvalidToken,
        }
    }
}

/// Ordered list of stages run against a [`RequestContext`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Empty pipeline; every context passes
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage
    pub fn then(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Required authentication
    pub fn required() -> Self {
        Self::new().then(Stage::Authenticate(AuthMode::Required))
    }

    /// Optional authentication
    pub fn optional() -> Self {
        Self::new().then(Stage::Authenticate(AuthMode::Optional))
    }

    /// Required authentication followed by a role check
    pub fn roles(roles: impl IntoIterator<Item = Role>) -> Self {
        Self::required().then(Stage::RequireRoles(roles.into_iter().collect()))
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Runs every stage in order, stopping at the first failure
    pub async fn run(
        &self,
        mut ctx: RequestContext,
        tokens: &TokenService,
        users: &dyn UserStore,
    ) -> Result<RequestContext, AuthError> {
        for stage in &self.stages {
            ctx = match stage {
                Stage::Authenticate(mode) => authenticate(ctx, *mode, tokens, users).await?,
                Stage::RequireRoles(roles) => require_roles(ctx, roles)?,
            };
        }
        Ok(ctx)
    }
}

/// Verifies the bearer token and attaches the current user
///
/// In `Optional` mode every failure, including a store failure, yields the
/// context back unchanged.
pub async fn authenticate(
    ctx: RequestContext,
    mode: AuthMode,
    tokens: &TokenService,
    users: &dyn UserStore,
) -> Result<RequestContext, AuthError> {
    match (load_principal(&ctx, tokens, users).await, mode) {
        (Ok((user, claims)), _) => Ok(RequestContext {
            current_principal: Some(user),
            claims: Some(claims),
            ..ctx
        }),
        (Err(e), AuthMode::Optional) => {
            debug!(error = %e, "Optional authentication failed, continuing anonymously");
            Ok(ctx)
        }
        (Err(e), AuthMode::Required) => {
            debug!(error = %e, "Authentication failed");
            Err(e)
        }
    }
}

async fn load_principal(
    ctx: &RequestContext,
    tokens: &TokenService,
    users: &dyn UserStore,
) -> Result<(User, AccessClaims), AuthError> {
    let token = ctx.bearer.as_deref().ok_or(AuthError::MissingToken)?;
    let claims = tokens.verify_access_token(token)?;

    let user = users
        .find_by_id(claims.sub)
        .await?
        .ok_or(AuthError::UserNotFound)?;

    if !user.is_active {
        return Err(AuthError::UserInactive);
    }

    Ok((user, claims))
}

/// Fails unless the attached user's role is one of `roles`
pub fn require_roles(ctx: RequestContext, roles: &[Role]) -> Result<RequestContext, AuthError> {
    let actual = ctx
        .principal()
        .map(|user| user.role)
        .ok_or(AuthError::NotAuthenticated)?;

    if !roles.contains(&actual) {
        debug!(role = %actual, "Role check failed");
        return Err(AuthError::InsufficientPermissions {
            required: roles.to_vec(),
            actual,
        });
    }

    Ok(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::TokenSettings;
    use crate::models::user::{CreateUser, UpdateUser};
    use crate::store::MemoryStore;

    fn tokens() -> TokenService {
        TokenService::new(TokenSettings::new(
            "guard-test-access-secret-32-bytes-long",
            "guard-test-refresh-secret-32-bytes-long",
        ))
    }

    async fn seeded(role: Role) -> (MemoryStore, User) {
        let store = MemoryStore::new();
        let user = UserStore::create(
            &store,
            CreateUser {
                name: "Guard Test".to_string(),
                email: "guard@example.com".to_string(),
                password_hash: "hash".to_string(),
                role,
            },
        )
        .await
        .unwrap();
        (store, user)
    }

    fn bearer(token: &str) -> RequestContext {
        RequestContext::from_authorization(Some(&format!("Bearer {token}")))
    }

    #[test]
    fn test_from_authorization() {
        assert_eq!(
            RequestContext::from_authorization(Some("Bearer abc")).bearer.as_deref(),
            Some("abc")
        );
        assert!(RequestContext::from_authorization(Some("Basic abc")).bearer.is_none());
        assert!(RequestContext::from_authorization(Some("Bearer ")).bearer.is_none());
        assert!(RequestContext::from_authorization(None).bearer.is_none());
    }

    #[tokio::test]
    async fn test_required_missing_token() {
        let (store, _) = seeded(Role::User).await;
        let result = Pipeline::required()
            .run(RequestContext::default(), &tokens(), &store)
            .await;
        assert!(matches!(result, Err(AuthError::MissingToken)));
    }

    #[tokio::test]
    async fn test_required_attaches_principal_and_claims() {
        let (store, user) = seeded(Role::User).await;
        let tokens = tokens();
        let token = tokens.issue_access_token(&user).unwrap();

        let ctx = Pipeline::required()
            .run(bearer(&token), &tokens, &store)
            .await
            .unwrap();

        assert_eq!(ctx.principal().map(|u| u.id), Some(user.id));
        assert_eq!(ctx.claims.map(|c| c.sub), Some(user.id));
    }

    #[tokio::test]
    async fn test_required_invalid_token() {
        let (store, _) = seeded(Role::User).await;
        let result = Pipeline::required()
            .run(bearer("garbage"), &tokens(), &store)
            .await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_required_refresh_token_rejected() {
        let (store, user) = seeded(Role::User).await;
        let tokens = tokens();
        let pair = tokens.issue_token_pair(&user).unwrap();

        let result = Pipeline::required()
            .run(bearer(&pair.refresh_token), &tokens, &store)
            .await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_required_unknown_user() {
        let (store, user) = seeded(Role::User).await;
        let tokens = tokens();
        let token = tokens.issue_access_token(&user).unwrap();
        UserStore::delete(&store, user.id).await.unwrap();

        let result = Pipeline::required().run(bearer(&token), &tokens, &store).await;
        assert!(matches!(result, Err(AuthError::UserNotFound)));
    }

    #[tokio::test]
    async fn test_required_inactive_user() {
        let (store, user) = seeded(Role::User).await;
        let tokens = tokens();
        let token = tokens.issue_access_token(&user).unwrap();
        UserStore::update(
            &store,
            user.id,
            UpdateUser {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let result = Pipeline::required().run(bearer(&token), &tokens, &store).await;
        assert!(matches!(result, Err(AuthError::UserInactive)));
    }

    #[tokio::test]
    async fn test_optional_swallows_failures() {
        let (store, _) = seeded(Role::User).await;
        let ctx = Pipeline::optional()
            .run(bearer("garbage"), &tokens(), &store)
            .await
            .unwrap();
        assert!(!ctx.is_authenticated());

        let ctx = Pipeline::optional()
            .run(RequestContext::default(), &tokens(), &store)
            .await
            .unwrap();
        assert!(!ctx.is_authenticated());
    }

    #[tokio::test]
    async fn test_optional_attaches_when_valid() {
        let (store, user) = seeded(Role::User).await;
        let tokens = tokens();
        let token = tokens.issue_access_token(&user).unwrap();

        let ctx = Pipeline::optional()
            .run(bearer(&token), &tokens, &store)
            .await
            .unwrap();
        assert!(ctx.is_authenticated());
    }

    #[tokio::test]
    async fn test_roles_rejects_wrong_role() {
        let (store, user) = seeded(Role::User).await;
        let tokens = tokens();
        let token = tokens.issue_access_token(&user).unwrap();

        let result = Pipeline::roles([Role::Admin])
            .run(bearer(&token), &tokens, &store)
            .await;

        match result {
            Err(AuthError::InsufficientPermissions { required, actual }) => {
                assert_eq!(required, vec![Role::Admin]);
                assert_eq!(actual, Role::User);
            }
            other => panic!("expected InsufficientPermissions, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_roles_accepts_admin() {
        let (store, admin) = seeded(Role::Admin).await;
        let tokens = tokens();
        let token = tokens.issue_access_token(&admin).unwrap();

        let ctx = Pipeline::roles([Role::Admin])
            .run(bearer(&token), &tokens, &store)
            .await
            .unwrap();
        assert!(ctx.principal().map_or(false, User::is_admin));
    }

    #[tokio::test]
    async fn test_roles_check_runs_after_authentication() {
        // No token: the authentication stage fails first
        let (store, _) = seeded(Role::Admin).await;
        let result = Pipeline::roles([Role::Admin])
            .run(RequestContext::default(), &tokens(), &store)
            .await;
        assert!(matches!(result, Err(AuthError::MissingToken)));
    }

    #[test]
    fn test_require_roles_without_principal() {
        let result = require_roles(RequestContext::default(), &[Role::User]);
        assert!(matches!(result, Err(AuthError::NotAuthenticated)));
    }

    #[test]
    fn test_pipeline_builder_order() {
        let pipeline = Pipeline::roles([Role::Admin, Role::User]);
        assert_eq!(
            pipeline.stages(),
            &[
                Stage::Authenticate(AuthMode::Required),
                Stage::RequireRoles(vec![Role::Admin, Role::User]),
            ]
        );
    }
}
