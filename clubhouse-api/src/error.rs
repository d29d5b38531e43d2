/// Error handling for the API server
///
/// This module provides a unified error type that maps to HTTP responses.
/// All handlers return `Result<T, ApiError>`, which renders as
///
/// ```json
/// { "error": "Validation failed", "messages": { "title": ["..."] } }
/// ```
///
/// `messages` is present only for validation failures.
///
/// # Example
///
/// ```
/// use clubhouse_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::{json, Value};
///
/// async fn handler(found: bool) -> ApiResult<Json<Value>> {
///     if !found {
///         return Err(ApiError::not_found("Player not found"));
///     }
///     Ok(Json(json!({ "ok": true })))
/// }
/// ```

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use clubhouse_shared::{
    auth::{jwt::JwtError, password::PasswordError, policy::AuthzError, revocation::RevocationError},
    error::DomainError,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Field name to the messages describing what is wrong with it
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Unified API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Payload failed validation (400 with per-field messages)
    #[error("Validation failed: {} fields", .0.len())]
    Validation(FieldErrors),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate or dangling reference (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Logged, never shown to clients (500)
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<FieldErrors>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }

    /// Validation error on a single field
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.into()]);
        ApiError::Validation(errors)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match self {
            ApiError::Validation(errors) => ErrorResponse {
                error: "Validation failed".to_string(),
                messages: Some(errors),
            },
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "Internal error");
                ErrorResponse {
                    error: "Internal server error".to_string(),
                    messages: None,
                }
            }
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg) => ErrorResponse {
                error: msg,
                messages: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Message for a unique violation, keyed by constraint name
fn duplicate_message(constraint: Option<&str>) -> String {
    match constraint {
        Some("users_username_key") => "Username already exists",
        Some("users_email_key") => "Email already exists",
        Some("players_user_id_key") => "User already has a player profile",
        Some("players_jersey_number_key") => "Jersey number already taken",
        Some("finances_reference_number_key") => "Reference number already exists",
        Some("news_slug_key") => "An article with this slug already exists",
        _ => "Record already exists",
    }
    .to_string()
}

/// Message for a check violation, keyed by constraint name
fn check_message(constraint: Option<&str>) -> String {
    match constraint {
        Some("trainings_time_window") => "Start time must be before end time",
        Some("players_jersey_number_check") => "Jersey number must be between 1 and 99",
        Some("finances_amount_check") => "Amount must be greater than 0",
        _ => "Invalid value",
    }
    .to_string()
}

/// Convert sqlx errors to API errors
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::not_found("Resource not found"),
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                Some("23505") => ApiError::Conflict(duplicate_message(db_err.constraint())),
                Some("23503") => ApiError::Conflict("Referenced record does not exist".to_string()),
                Some("23514") => ApiError::BadRequest(check_message(db_err.constraint())),
                _ => ApiError::Internal(format!("Database error: {}", db_err)),
            },
            other => ApiError::Internal(format!("Database error: {}", other)),
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Invalid { field, message } => ApiError::field(field, message),
            DomainError::InvalidState(message) => ApiError::BadRequest(message),
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        ApiError::Forbidden(err.0.to_string())
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => ApiError::unauthorized("Token has expired"),
            JwtError::CreateError(detail) => ApiError::Internal(detail),
            JwtError::WrongType { expected } => {
                ApiError::Unauthorized(format!("Expected {} token", expected))
            }
            JwtError::ValidationError(_) | JwtError::InvalidIssuer { .. } => {
                ApiError::unauthorized("Invalid token")
            }
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::Internal(format!("Password operation failed: {}", err))
    }
}

impl From<RevocationError> for ApiError {
    fn from(err: RevocationError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

fn describe(error: &validator::ValidationError) -> String {
    if let Some(message) = &error.message {
        return message.to_string();
    }
    let param = |name: &str| error.params.get(name).map(|v| v.to_string());

    match error.code.as_ref() {
        "length" => match (param("min"), param("max")) {
            (Some(min), Some(max)) => format!("Length must be between {} and {}", min, max),
            (Some(min), None) => format!("Length must be at least {}", min),
            (None, Some(max)) => format!("Length must be at most {}", max),
            (None, None) => "Invalid length".to_string(),
        },
        "range" => match (param("min"), param("max")) {
            (Some(min), Some(max)) => format!("Must be between {} and {}", min, max),
            (Some(min), None) => format!("Must be at least {}", min),
            (None, Some(max)) => format!("Must be at most {}", max),
            (None, None) => "Out of range".to_string(),
        },
        "email" => "Not a valid email address".to_string(),
        _ => "Invalid value".to_string(),
    }
}

/// Flattens validator output into `field -> [messages]`
pub fn field_errors(errors: &validator::ValidationErrors) -> FieldErrors {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| (field.to_string(), errs.iter().map(describe).collect()))
        .collect()
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::Validation(field_errors(&errors))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::field("body", rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Payload {
        #[validate(length(min = 5, max = 200))]
        title: String,
        #[validate(range(min = 1, max = 99, message = "Jersey number must be between 1 and 99"))]
        jersey_number: i32,
    }

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::bad_request("Invalid input");
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::not_found("Player not found");
        assert_eq!(err.to_string(), "Not found: Player not found");
    }

    #[test]
    fn test_validation_messages() {
        let payload = Payload {
            title: "Hey".to_string(),
            jersey_number: 120,
        };
        let err: ApiError = payload.validate().unwrap_err().into();

        let ApiError::Validation(fields) = err else {
            panic!("expected validation error");
        };
        assert_eq!(fields["title"], vec!["Length must be between 5 and 200"]);
        assert_eq!(
            fields["jersey_number"],
            vec!["Jersey number must be between 1 and 99"]
        );
    }

    #[test]
    fn test_constraint_messages() {
        assert_eq!(
            duplicate_message(Some("players_jersey_number_key")),
            "Jersey number already taken"
        );
        assert_eq!(duplicate_message(Some("users_email_key")), "Email already exists");
        assert_eq!(duplicate_message(None), "Record already exists");
        assert_eq!(
            check_message(Some("trainings_time_window")),
            "Start time must be before end time"
        );
    }

    #[test]
    fn test_domain_and_policy_mapping() {
        let err: ApiError = DomainError::state("Transaction is not pending approval").into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err: ApiError =
            DomainError::invalid("category", "Invalid category for income transaction").into();
        assert!(matches!(err, ApiError::Validation(ref f) if f.contains_key("category")));

        let err: ApiError = AuthzError("Admin access required").into();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let err: ApiError = JwtError::Expired.into();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

        let err: ApiError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_response_envelope() {
        let (status, body) = body_json(ApiError::Forbidden("Admin access required".into())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body, serde_json::json!({ "error": "Admin access required" }));

        let (status, body) = body_json(ApiError::field("title", "Too short")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Validation failed");
        assert_eq!(body["messages"]["title"][0], "Too short");
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let (status, body) = body_json(ApiError::internal("connection reset by peer")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
        assert!(!body.to_string().contains("connection reset"));
    }
}
