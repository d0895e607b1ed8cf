use thiserror::Error;
use validator::{ValidationError, ValidationErrors};

/// Error types for the domain layer
#[derive(Error, Debug)]
pub enum DomainError {
    /// Error from the database operations
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Input failed validation; carries the per-field messages
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),

    /// Error from password hashing
    #[error("Password hashing error: {0}")]
    Password(#[from] bcrypt::BcryptError),

    /// A referenced record does not exist
    #[error("{0} not found")]
    NotFound(String),
}

impl DomainError {
    /// Validation failure on a single field.
    pub fn field(field: &'static str, code: &'static str, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(field, field_error(code, message));
        DomainError::Validation(errors)
    }
}

pub(crate) fn field_error(code: &'static str, message: impl Into<String>) -> ValidationError {
    let message: String = message.into();
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

/// Type alias for Result with DomainError
pub type Result<T> = std::result::Result<T, DomainError>;
