//! API error types with HTTP response mapping.
//!
//! Every error renders into the `{success: false, message, ...}` envelope.
//! Detailed error text is only included when `APP_ENV=development`.

use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use domain::DomainError;
use serde::Serialize;
use store::StoreError;

use crate::gateway::GatewayError;
use crate::mailer::MailerError;

/// A single field-level validation violation.
#[derive(Debug, Clone, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Request body failed validation; carries field-level detail.
    Validation(Vec<FieldViolation>),
    /// Malformed request (bad JSON, bad parameter).
    BadRequest(String),
    /// Authentication failure. Only the two generic messages are ever used
    /// so a caller cannot tell which check failed.
    Unauthorized(&'static str),
    /// Resource not found.
    NotFound(String),
    /// Duplicate resource (e.g. email already registered).
    Conflict(String),
    /// Operation not permitted in the resource's current state.
    StateConflict(String),
    /// Upstream payment gateway failure.
    Gateway(String),
    /// Internal server error.
    Internal(String),
}

fn development_mode() -> bool {
    std::env::var("APP_ENV").is_ok_and(|v| v == "development")
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "success": false, "errors": errors }),
            ),
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "success": false, "message": message }),
            ),
            ApiError::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                serde_json::json!({ "success": false, "message": message }),
            ),
            ApiError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                serde_json::json!({ "success": false, "message": message }),
            ),
            ApiError::Conflict(message) => (
                StatusCode::CONFLICT,
                serde_json::json!({ "success": false, "message": message }),
            ),
            ApiError::StateConflict(message) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "success": false, "message": message }),
            ),
            ApiError::Gateway(detail) => {
                tracing::error!(error = %detail, "payment gateway error");
                (
                    StatusCode::BAD_GATEWAY,
                    envelope_with_detail("Payment gateway error", &detail),
                )
            }
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    envelope_with_detail("Internal server error", &detail),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

fn envelope_with_detail(message: &str, detail: &str) -> serde_json::Value {
    if development_mode() {
        serde_json::json!({ "success": false, "message": message, "error": detail })
    } else {
        serde_json::json!({ "success": false, "message": message })
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotCancellable { .. } => {
                ApiError::StateConflict("Cannot cancel order in current status".to_string())
            }
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail(_) => {
                ApiError::Conflict("Email already registered".to_string())
            }
            StoreError::DuplicateSlug(slug) => {
                ApiError::Conflict(format!("Course slug already exists: {slug}"))
            }
            StoreError::NotFound(kind) => ApiError::NotFound(format!("{kind} not found")),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<crate::auth::AuthError> for ApiError {
    fn from(err: crate::auth::AuthError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        ApiError::Gateway(err.to_string())
    }
}

impl From<MailerError> for ApiError {
    fn from(err: MailerError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut violations = Vec::new();
        flatten_violations(&errors, "", &mut violations);
        ApiError::Validation(violations)
    }
}

fn flatten_violations(
    errors: &validator::ValidationErrors,
    prefix: &str,
    out: &mut Vec<FieldViolation>,
) {
    use validator::ValidationErrorsKind;

    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for err in field_errors {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{field} is invalid"));
                    out.push(FieldViolation {
                        field: path.clone(),
                        message,
                    });
                }
            }
            ValidationErrorsKind::Struct(nested) => flatten_violations(nested, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    flatten_violations(nested, &format!("{path}[{index}]"), out);
                }
            }
        }
    }
}

/// JSON extractor that maps deserialization failures into the API's error
/// envelope instead of axum's default rejection.
pub struct AppJson<T>(pub T);

impl<T, S> FromRequest<S> for AppJson<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Probe {
        #[validate(length(min = 1, message = "First name is required"))]
        first_name: String,
        #[validate(email(message = "Valid email is required"))]
        email: String,
    }

    #[test]
    fn validation_errors_flatten_to_field_list() {
        let probe = Probe {
            first_name: String::new(),
            email: "not-an-email".to_string(),
        };
        let err: ApiError = probe.validate().unwrap_err().into();
        let ApiError::Validation(violations) = err else {
            panic!("expected validation error");
        };

        assert_eq!(violations.len(), 2);
        assert!(violations.iter().any(|v| v.field == "first_name"));
        assert!(violations
            .iter()
            .any(|v| v.message == "Valid email is required"));
    }

    #[test]
    fn duplicate_email_maps_to_conflict() {
        let err: ApiError = StoreError::DuplicateEmail("a@b.com".to_string()).into();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[test]
    fn not_cancellable_maps_to_state_conflict() {
        let err: ApiError = DomainError::NotCancellable {
            current: domain::OrderStatus::Completed,
        }
        .into();
        assert!(matches!(err, ApiError::StateConflict(_)));
    }
}
