use axum::response::{IntoResponse, Response};
use domain::acl::AccessError;
use domain::DomainError;
use thiserror::Error;
use tracing::{debug, error};
use validator::ValidationErrors;

use crate::response::Envelope;
use crate::schemas::ErrorResponse;

pub const LOGIN_FAILED: &str = "These credentials do not match our records.";

/// Failures of an API request. Each one renders as the envelope with
/// `success: false` and `data: null`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// One or more fields failed validation
    #[error("{}", validation_message(.0))]
    Validation(ValidationErrors),

    /// Malformed body or a failed operation on a missing record
    #[error("{0}")]
    BadRequest(String),

    #[error("Unauthenticated.")]
    Unauthenticated,

    /// Rejected login, including throttled ones
    #[error("{0}")]
    LoginFailed(String),

    #[error("This action is unauthorized.")]
    Forbidden,

    #[error("The route {0} could not be found.")]
    RouteNotFound(String),

    #[error("The {method} method is not supported for route {path}.")]
    MethodNotAllowed { method: String, path: String },

    #[error("The request timed out.")]
    RequestTimeout,

    /// Details are logged, never sent
    #[error("Server Error")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> u16 {
        match self {
            // Unauthenticated requests to protected routes report 400
            ApiError::Validation(_) | ApiError::BadRequest(_) | ApiError::Unauthenticated => 400,
            ApiError::LoginFailed(_) => 401,
            ApiError::Forbidden => 403,
            ApiError::RouteNotFound(_) => 404,
            ApiError::MethodNotAllowed { .. } => 405,
            ApiError::RequestTimeout => 408,
            ApiError::Internal(_) => 500,
        }
    }
}

/// First field message, followed by a count of the remaining ones.
fn validation_message(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    let mut messages = fields.into_iter().flat_map(|(name, errors)| {
        errors.iter().map(move |error| match &error.message {
            Some(message) => message.to_string(),
            None => format!("The {} field is invalid.", name),
        })
    });

    let Some(first) = messages.next() else {
        return "The given data was invalid.".to_string();
    };
    match messages.count() {
        0 => first,
        1 => format!("{} (and 1 more error)", first),
        more => format!("{} (and {} more errors)", first, more),
    }
}

impl From<DomainError> for ApiError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::Validation(errors) => ApiError::Validation(errors),
            DomainError::NotFound(what) => ApiError::BadRequest(format!("{} not found.", what)),
            DomainError::Database(e) => ApiError::Internal(e.to_string()),
            DomainError::Password(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<AccessError> for ApiError {
    fn from(error: AccessError) -> Self {
        match error {
            AccessError::Unauthenticated => ApiError::Unauthenticated,
            AccessError::Forbidden => ApiError::Forbidden,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Internal(details) => error!("Internal error: {}", details),
            other => debug!("Request failed with {}: {}", other.status(), other),
        }

        Envelope(ErrorResponse {
            success: false,
            message: self.to_string(),
            status: self.status(),
            data: None,
        })
        .into_response()
    }
}
