/// Request extractors
///
/// - [`ValidatedJson`]: JSON body, normalized then validated. Every field
///   is checked and all failures are reported together, including fields
///   whose JSON type is wrong. Only a body that is not a JSON object fails
///   as a whole, on field `body`.
/// - [`ValidatedQuery`]: the same for query strings.
/// - [`ResourceId`]: a UUID path parameter (`INVALID_ID` otherwise).
/// - [`CurrentUser`]: the principal attached by the auth layer.

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use taskdesk_shared::auth::guard::RequestContext;
use taskdesk_shared::models::user::User;
use taskdesk_shared::validation::{collect_field_errors, FieldError};
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;

/// Input cleanup applied before validation (trimming, lowercasing)
pub trait Normalize {
    fn normalize(self) -> Self;
}

/// Normalizes and validates `value`, merging in errors found earlier
///
/// A field that already has an error keeps only that one.
fn check<T: Normalize + Validate>(value: T, mut errors: Vec<FieldError>) -> Result<T, ApiError> {
    let value = value.normalize();

    if let Err(found) = value.validate() {
        let found: Vec<FieldError> = collect_field_errors(&found)
            .into_iter()
            .filter(|e| !errors.iter().any(|known| known.field == e.field))
            .collect();
        errors.extend(found);
    }

    if errors.is_empty() {
        return Ok(value);
    }
    errors.sort_by(|a, b| a.field.cmp(&b.field));
    Err(ApiError::Validation(errors))
}

/// Removes the members whose value does not fit their field in `T`
///
/// Each member is tried on its own, so the remaining object deserializes
/// cleanly as long as every field of `T` is optional.
fn take_mistyped_fields<T: DeserializeOwned>(fields: &mut Map<String, Value>) -> Vec<FieldError> {
    let mistyped: Vec<String> = fields
        .iter()
        .filter(|(key, value)| {
            let single: Map<String, Value> = std::iter::once(((*key).clone(), (*value).clone())).collect();
            serde_json::from_value::<T>(Value::Object(single)).is_err()
        })
        .map(|(key, _)| key.clone())
        .collect();

    mistyped
        .into_iter()
        .filter_map(|key| {
            let value = fields.remove(&key)?;
            let mut error = FieldError::new(key.clone(), format!("Invalid type for {}", key));
            if !key.to_lowercase().contains("password") {
                error.value = Some(value);
            }
            Some(error)
        })
        .collect()
}

/// JSON body that passed validation
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Normalize + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::field("body", rejection.body_text()))?;

        let Value::Object(mut fields) = body else {
            return Err(ApiError::field("body", "Request body must be a JSON object"));
        };

        let mistyped = take_mistyped_fields::<T>(&mut fields);
        let value = serde_json::from_value::<T>(Value::Object(fields))
            .map_err(|e| ApiError::field("body", e.to_string()))?;

        Ok(Self(check(value, mistyped)?))
    }
}

/// Query string that passed validation
#[derive(Debug)]
pub struct ValidatedQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ValidatedQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Normalize + Validate,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::field("query", rejection.body_text()))?;

        Ok(Self(check(value, Vec::new())?))
    }
}

/// `:id` path parameter parsed as a UUID
#[derive(Debug, Clone, Copy)]
pub struct ResourceId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for ResourceId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::InvalidId)?;

        Uuid::parse_str(&raw)
            .map(ResourceId)
            .map_err(|_| ApiError::InvalidId)
    }
}

/// Authenticated principal
///
/// Fails `NOT_AUTHENTICATED` on routes that ran no auth layer or ran it in
/// optional mode without a valid token.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .and_then(RequestContext::principal)
            .cloned()
            .map(CurrentUser)
            .ok_or(ApiError::NotAuthenticated)
    }
}
