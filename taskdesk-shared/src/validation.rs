/// Field validation rules
///
/// Custom rules for `validator`'s `#[validate(custom(function = ...))]`
/// attribute, input normalization helpers, and the conversion from
/// `validator::ValidationErrors` into a flat, sorted list of
/// [`FieldError`]s with camelCase field names.
///
/// Validation never short-circuits: every field is checked and every
/// failure is reported.
///
/// # Example
///
/// ```
/// use taskdesk_shared::validation::{collect_field_errors, validate_person_name};
/// use validator::Validate;
///
/// #[derive(Validate)]
/// struct Signup {
///     #[validate(custom(function = "validate_person_name"))]
///     display_name: String,
///
///     #[validate(email(message = "Please provide a valid email"))]
///     email: String,
/// }
///
/// let errors = Signup {
///     display_name: "R2D2".to_string(),
///     email: "nope".to_string(),
/// }
/// .validate()
/// .unwrap_err();
///
/// let fields: Vec<_> = collect_field_errors(&errors)
///     .into_iter()
///     .map(|e| e.field)
///     .collect();
/// assert_eq!(fields, vec!["displayName", "email"]);
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::borrow::Cow;
use uuid::Uuid;
use validator::{ValidationError, ValidationErrors};

use crate::auth::password::validate_password_strength;
use crate::models::page::PageRequest;
use crate::models::task::{TaskPriority, TaskStatus};
use crate::models::user::Role;

/// One field-level validation failure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    /// camelCase field name as it appears on the wire
    pub field: String,
    pub message: String,

    /// Offending value, when it is safe to echo back
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            value: None,
        }
    }
}

/// Flattens `validator` output into one entry per failed rule
///
/// Entries are sorted by field name. Values of password fields are never
/// echoed.
pub fn collect_field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            let field = to_camel_case(&field.to_string());
            errs.iter()
                .map(|err| {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for {}", field));
                    let value = if field.to_lowercase().contains("password") {
                        None
                    } else {
                        err.params.get("value").cloned().filter(|v| !v.is_null())
                    };
                    FieldError {
                        field: field.clone(),
                        message,
                        value,
                    }
                })
                .collect::<Vec<_>>()
        })
        .collect();

    out.sort_by(|a, b| a.field.cmp(&b.field));
    out
}

/// `due_date` -> `dueDate`
pub fn to_camel_case(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut upper = false;
    for c in snake.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn invalid(code: &'static str, message: &'static str, value: &str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err.add_param(Cow::Borrowed("value"), &value);
    err
}

/// Trims a string, mapping whitespace-only input to an empty string
pub fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string())
}

/// Trims and lowercases an email address
pub fn normalize_email(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_lowercase())
}

/// Letters and spaces only. Length is checked separately.
pub fn validate_person_name(name: &str) -> Result<(), ValidationError> {
    if name.chars().all(|c| c.is_alphabetic() || c == ' ') {
        Ok(())
    } else {
        Err(invalid(
            "name_charset",
            "Name can only contain letters and spaces",
            name,
        ))
    }
}

/// Password strength rule for new passwords
pub fn validate_new_password(password: &str) -> Result<(), ValidationError> {
    validate_password_strength(password).map_err(|message| {
        let mut err = ValidationError::new("password_strength");
        err.message = Some(Cow::Borrowed(message));
        err
    })
}

pub fn validate_role(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<Role>()
        .map(|_| ())
        .map_err(|_| invalid("role", "Role must be either user or admin", value))
}

pub fn validate_status(value: &str) -> Result<(), ValidationError> {
    value.parse::<TaskStatus>().map(|_| ()).map_err(|_| {
        invalid(
            "status",
            "Status must be pending, in-progress, or completed",
            value,
        )
    })
}

pub fn validate_priority(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<TaskPriority>()
        .map(|_| ())
        .map_err(|_| invalid("priority", "Priority must be low, medium, or high", value))
}

/// Parses an ISO-8601 instant
///
/// Accepts RFC 3339 (`2030-01-31T12:00:00Z`) or a bare date
/// (`2030-01-31`, read as midnight UTC).
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Any parseable ISO-8601 date
pub fn validate_iso_date(value: &str) -> Result<(), ValidationError> {
    parse_datetime(value)
        .map(|_| ())
        .ok_or_else(|| invalid("date", "Date must be a valid ISO 8601 date", value))
}

/// Parseable and strictly after the current instant
pub fn validate_future_date(value: &str) -> Result<(), ValidationError> {
    match parse_datetime(value) {
        None => Err(invalid(
            "date",
            "Due date must be a valid ISO 8601 date",
            value,
        )),
        Some(dt) if dt <= Utc::now() => Err(invalid(
            "future_date",
            "Due date must be in the future",
            value,
        )),
        Some(_) => Ok(()),
    }
}

pub fn validate_uuid(value: &str) -> Result<(), ValidationError> {
    Uuid::parse_str(value)
        .map(|_| ())
        .map_err(|_| invalid("uuid", "Invalid ID format", value))
}

pub fn validate_bool(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<bool>()
        .map(|_| ())
        .map_err(|_| invalid("bool", "Value must be true or false", value))
}

/// Integer >= 1
pub fn validate_page(value: &str) -> Result<(), ValidationError> {
    match value.parse::<u32>() {
        Ok(n) if n >= 1 => Ok(()),
        _ => Err(invalid("page", "Page must be a positive integer", value)),
    }
}

/// Integer in 1..=100
pub fn validate_limit(value: &str) -> Result<(), ValidationError> {
    match value.parse::<u32>() {
        Ok(n) if (1..=PageRequest::MAX_LIMIT).contains(&n) => Ok(()),
        _ => Err(invalid("limit", "Limit must be between 1 and 100", value)),
    }
}

/// Builds a [`PageRequest`] from already-validated query strings
pub fn page_request(page: Option<&str>, limit: Option<&str>) -> PageRequest {
    PageRequest {
        page: page
            .and_then(|p| p.parse().ok())
            .unwrap_or(PageRequest::DEFAULT_PAGE),
        limit: limit
            .and_then(|l| l.parse().ok())
            .unwrap_or(PageRequest::DEFAULT_LIMIT),
    }
}
